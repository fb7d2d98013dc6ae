//! Severity scoring -- explainable 0-100 scores for hazard events.
//!
//! Pure functions, no I/O. Each adapter feeds raw physical attributes in and
//! stores the resulting score/level pair on the normalized event, so the
//! dashboard can rank a magnitude-6 quake against a flash flood warning on
//! one axis.

use crate::model::SeverityLevel;

/// Score an earthquake from magnitude and depth.
///
/// Base score comes from the magnitude bracket; shallow quakes (<20 km) get
/// +10, deep ones (>70 km) -10. A missing magnitude scores as 0.0, a missing
/// depth applies no adjustment. Returns the clamped score and its level.
pub fn score_earthquake(magnitude: Option<f64>, depth_km: Option<f64>) -> (u8, SeverityLevel) {
    let mag = magnitude.unwrap_or(0.0);

    let mut score: i32 = if mag < 4.0 {
        10
    } else if mag < 5.0 {
        25
    } else if mag < 6.0 {
        45
    } else if mag < 7.0 {
        70
    } else {
        90
    };

    // Depth adjustment: shallow quakes reach the surface harder.
    if let Some(depth) = depth_km {
        if depth < 20.0 {
            score += 10;
        } else if depth > 70.0 {
            score -= 10;
        }
    }

    let score = score.clamp(0, 100) as u8;
    (score, level_from_score(score))
}

/// Map a clamped 0-100 score to its severity band.
pub fn level_from_score(score: u8) -> SeverityLevel {
    match score {
        0..=24 => SeverityLevel::Low,
        25..=49 => SeverityLevel::Medium,
        50..=74 => SeverityLevel::High,
        _ => SeverityLevel::Critical,
    }
}

/// Score a flood alert from its normalized level plus provider hints.
///
/// The level sets the base (low=20, medium=45, high=70, critical=90).
/// Event-name matches add on top: "flash" +10, "coastal" +5, both
/// case-insensitive substrings. A recognized UK numeric code (1-4) then
/// *replaces* the accumulated score outright; unrecognized codes leave it
/// alone. Result is clamped to [0, 100].
pub fn score_flood(
    level: SeverityLevel,
    event_name: Option<&str>,
    uk_severity_code: Option<i64>,
) -> u8 {
    let mut score: i32 = match level {
        SeverityLevel::Low => 20,
        SeverityLevel::Medium => 45,
        SeverityLevel::High => 70,
        SeverityLevel::Critical => 90,
    };

    if let Some(name) = event_name {
        let name = name.to_ascii_lowercase();
        if name.contains("flash") {
            score += 10;
        }
        if name.contains("coastal") {
            score += 5;
        }
    }

    if let Some(code) = uk_severity_code {
        score = match code {
            1 => 90,
            2 => 70,
            3 => 45,
            4 => 25,
            _ => score,
        };
    }

    score.clamp(0, 100) as u8
}
