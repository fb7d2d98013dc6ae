//! Shared domain model -- the normalized event schema every source produces.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream feed an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "usgs")]
    Usgs,
    #[serde(rename = "nws")]
    Nws,
    #[serde(rename = "uk_ea")]
    UkEa,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Usgs => write!(f, "usgs"),
            Source::Nws => write!(f, "nws"),
            Source::UkEa => write!(f, "uk_ea"),
        }
    }
}

/// Top-level hazard category -- both the stream a caller requests and the
/// `event_type` tag on every normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hazard {
    Earthquake,
    Flood,
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hazard::Earthquake => write!(f, "earthquake"),
            Hazard::Flood => write!(f, "flood"),
        }
    }
}

impl std::str::FromStr for Hazard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earthquake" => Ok(Hazard::Earthquake),
            "flood" => Ok(Hazard::Flood),
            other => Err(format!(
                "unknown hazard '{other}' (expected 'earthquake' or 'flood')"
            )),
        }
    }
}

/// Four-tier severity band, ordered low to critical.
///
/// The derived ordering is load-bearing: the aggregator's severity floor
/// compares bands directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityLevel::Low => write!(f, "low"),
            SeverityLevel::Medium => write!(f, "medium"),
            SeverityLevel::High => write!(f, "high"),
            SeverityLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(SeverityLevel::Low),
            "medium" => Ok(SeverityLevel::Medium),
            "high" => Ok(SeverityLevel::High),
            "critical" => Ok(SeverityLevel::Critical),
            other => Err(format!(
                "unknown severity level '{other}' (expected low, medium, high, or critical)"
            )),
        }
    }
}

/// One hazard event in the common shape every adapter emits.
///
/// Field names are the wire contract with the dashboard. Optional fields
/// serialize as `null` when the provider did not supply them -- never as a
/// fabricated default (a missing position is *not* (0, 0), a missing
/// timestamp is *not* "now").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub source: Source,
    pub event_type: Hazard,
    /// Provider-native identifier; unique within one adapter fetch, not
    /// across providers.
    pub source_event_id: String,
    /// ISO-8601 UTC timestamp, if the provider supplied one.
    pub time_utc: Option<String>,
    /// Human-readable location label. Never empty -- each adapter has a
    /// fallback chain ending in a fixed literal.
    pub place: String,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    /// Derived 0-100 score, see the severity module.
    pub severity_score: u8,
    pub severity_level: SeverityLevel,
    pub url: Option<String>,
    /// Provider subtype label, e.g. "Flash Flood Warning".
    pub hazard_subtype: Option<String>,
}

impl NormalizedEvent {
    /// Parse `time_utc` into a UTC instant.
    ///
    /// Accepts RFC 3339 (what the USGS and NWS paths carry) plus the UK
    /// feed's offset-less `YYYY-MM-DDTHH:MM:SS`, which is taken as UTC.
    /// Anything else is `None`; callers decide what absence means.
    pub fn parsed_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.time_utc.as_deref()?;
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Some(t.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_time(time_utc: Option<&str>) -> NormalizedEvent {
        NormalizedEvent {
            source: Source::Usgs,
            event_type: Hazard::Earthquake,
            source_event_id: "test1".into(),
            time_utc: time_utc.map(|s| s.to_string()),
            place: "somewhere".into(),
            magnitude: None,
            depth_km: None,
            lon: None,
            lat: None,
            severity_score: 10,
            severity_level: SeverityLevel::Low,
            url: None,
            hazard_subtype: None,
        }
    }

    #[test]
    fn test_parses_rfc3339_with_offset() {
        let e = event_with_time(Some("2024-05-01T12:00:00-05:00"));
        let t = e.parsed_time().unwrap();
        assert_eq!(t.to_rfc3339(), "2024-05-01T17:00:00+00:00");
    }

    #[test]
    fn test_parses_rfc3339_zulu() {
        let e = event_with_time(Some("2024-05-01T12:00:00Z"));
        assert!(e.parsed_time().is_some());
    }

    #[test]
    fn test_parses_naive_timestamp_as_utc() {
        // UK EA timeRaised has no offset.
        let e = event_with_time(Some("2024-05-01T12:00:00"));
        let t = e.parsed_time().unwrap();
        assert_eq!(t.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_garbage_timestamp_is_none() {
        assert!(event_with_time(Some("not a time")).parsed_time().is_none());
        assert!(event_with_time(None).parsed_time().is_none());
    }

    #[test]
    fn test_severity_levels_are_ordered() {
        assert!(SeverityLevel::Low < SeverityLevel::Medium);
        assert!(SeverityLevel::Medium < SeverityLevel::High);
        assert!(SeverityLevel::High < SeverityLevel::Critical);
    }

    #[test]
    fn test_wire_field_names_and_nulls() {
        let value = serde_json::to_value(event_with_time(None)).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["source"], "usgs");
        assert_eq!(obj["event_type"], "earthquake");
        assert_eq!(obj["severity_level"], "low");
        // Absent optionals are explicit nulls, and every key is present.
        assert!(obj["time_utc"].is_null());
        assert!(obj["magnitude"].is_null());
        assert!(obj["lon"].is_null());
        assert_eq!(obj.len(), 13);
    }

    #[test]
    fn test_hazard_and_level_round_trip_from_str() {
        assert_eq!("flood".parse::<Hazard>().unwrap(), Hazard::Flood);
        assert!("volcano".parse::<Hazard>().is_err());
        assert_eq!(
            "critical".parse::<SeverityLevel>().unwrap(),
            SeverityLevel::Critical
        );
        assert!("extreme".parse::<SeverityLevel>().is_err());
    }
}
