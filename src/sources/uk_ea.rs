//! UK Environment Agency flood alert adapter.
//!
//! One listing endpoint covers every current warning, so this adapter is the
//! simplest of the three: no category walk, no geometry resolution. The
//! numeric `severityLevel` code is authoritative for both the severity level
//! and the score, overriding the generic flood bands entirely.

use serde::Deserialize;
use tracing::debug;

use crate::model::{Hazard, NormalizedEvent, SeverityLevel, Source};
use crate::severity::score_flood;

use super::{get_json, nonempty, FloodSource, SourceError};

#[derive(Debug, Deserialize)]
struct FloodListing {
    #[serde(default)]
    items: Vec<FloodItem>,
}

#[derive(Debug, Deserialize)]
struct FloodItem {
    #[serde(default, rename = "@id")]
    at_id: Option<String>,
    /// 1 = severe warning, 2 = warning, 3 = alert, 4 = no longer in force.
    #[serde(default, rename = "severityLevel")]
    severity_level: Option<i64>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "timeRaised")]
    time_raised: Option<String>,
    #[serde(default, rename = "floodAreaID")]
    flood_area_id: Option<String>,
    #[serde(default, rename = "floodArea")]
    flood_area: Option<FloodArea>,
}

#[derive(Debug, Default, Deserialize)]
struct FloodArea {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    long: Option<f64>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "areaName")]
    area_name: Option<String>,
}

/// Client for the Environment Agency flood-monitoring API.
pub struct UkEaClient {
    client: reqwest::Client,
    floods_url: String,
}

impl UkEaClient {
    pub fn new(client: reqwest::Client, floods_url: impl Into<String>) -> Self {
        Self {
            client,
            floods_url: floods_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl FloodSource for UkEaClient {
    fn source(&self) -> Source {
        Source::UkEa
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<NormalizedEvent>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let payload: FloodListing =
            get_json(Source::UkEa, self.client.get(&self.floods_url)).await?;
        let events = normalize_listing(payload, limit);
        debug!(count = events.len(), "uk environment agency floods normalized");
        Ok(events)
    }
}

fn normalize_listing(payload: FloodListing, limit: usize) -> Vec<NormalizedEvent> {
    payload.items.into_iter().take(limit).map(normalize).collect()
}

fn normalize(item: FloodItem) -> NormalizedEvent {
    let code = item.severity_level;
    let level = level_from_code(code);
    let severity_score = score_flood(level, None, code);

    let area = item.flood_area.unwrap_or_default();
    let place = nonempty(area.label)
        .or_else(|| nonempty(area.area_name))
        .or_else(|| nonempty(item.description))
        .unwrap_or_else(|| "UK Flood Alert".to_string());
    let source_event_id = nonempty(item.at_id.clone())
        .or_else(|| nonempty(item.flood_area_id))
        .unwrap_or_else(|| place.clone());

    NormalizedEvent {
        source: Source::UkEa,
        event_type: Hazard::Flood,
        source_event_id,
        time_utc: nonempty(item.time_raised),
        place,
        magnitude: None,
        depth_km: None,
        lon: area.long,
        lat: area.lat,
        severity_score,
        severity_level: level,
        url: nonempty(item.at_id),
        hazard_subtype: nonempty(item.severity),
    }
}

fn level_from_code(code: Option<i64>) -> SeverityLevel {
    match code {
        Some(1) => SeverityLevel::Critical,
        Some(2) => SeverityLevel::High,
        Some(3) => SeverityLevel::Medium,
        _ => SeverityLevel::Low,
    }
}
