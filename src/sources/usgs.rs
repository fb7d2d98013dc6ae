//! USGS earthquake feed adapter.
//!
//! Reads the public GeoJSON summary feeds (`all_hour`, `all_day`, ...) and
//! normalizes each feature. The feeds are high-volume and occasionally carry
//! partial records, so every property is optional here; a feature missing its
//! magnitude or geometry still normalizes, it just scores and plots from what
//! is present.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::model::{Hazard, NormalizedEvent, Source};
use crate::severity::score_earthquake;

use super::{get_json, nonempty, SourceError};

#[derive(Debug, Deserialize)]
struct QuakeFeed {
    #[serde(default)]
    features: Vec<QuakeFeature>,
}

#[derive(Debug, Deserialize)]
struct QuakeFeature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: QuakeProperties,
    #[serde(default)]
    geometry: Option<QuakeGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct QuakeProperties {
    #[serde(default)]
    mag: Option<f64>,
    /// Epoch milliseconds in healthy records; anything else is ignored
    /// rather than failing the whole payload.
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuakeGeometry {
    /// `[longitude, latitude, depth_km]`, any slot possibly null.
    #[serde(default)]
    coordinates: Vec<Option<f64>>,
}

/// Client for the USGS earthquake summary feeds.
pub struct UsgsClient {
    client: reqwest::Client,
    base_url: String,
}

impl UsgsClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch one summary feed and return up to `limit` normalized events.
    ///
    /// `min_magnitude` drops quakes below the floor; quakes with no reported
    /// magnitude are kept regardless, so a filter never hides a record the
    /// upstream has not finished reviewing.
    pub async fn fetch(
        &self,
        feed: &str,
        limit: usize,
        min_magnitude: Option<f64>,
    ) -> Result<Vec<NormalizedEvent>, SourceError> {
        let url = format!("{}/{feed}.geojson", self.base_url.trim_end_matches('/'));
        let payload: QuakeFeed = get_json(Source::Usgs, self.client.get(&url)).await?;
        let events = normalize_feed(payload, min_magnitude, limit);
        debug!(count = events.len(), feed, "usgs earthquakes normalized");
        Ok(events)
    }
}

fn normalize_feed(
    payload: QuakeFeed,
    min_magnitude: Option<f64>,
    limit: usize,
) -> Vec<NormalizedEvent> {
    payload
        .features
        .into_iter()
        .filter(|feature| match (min_magnitude, feature.properties.mag) {
            (Some(floor), Some(mag)) => mag >= floor,
            _ => true,
        })
        .take(limit)
        .map(normalize)
        .collect()
}

fn normalize(feature: QuakeFeature) -> NormalizedEvent {
    let coord = |slot: usize| -> Option<f64> {
        feature
            .geometry
            .as_ref()
            .and_then(|g| g.coordinates.get(slot).copied().flatten())
    };
    let (lon, lat, depth_km) = (coord(0), coord(1), coord(2));

    let magnitude = feature.properties.mag;
    let (severity_score, severity_level) = score_earthquake(magnitude, depth_km);

    let place = feature
        .properties
        .place
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "Unknown location".to_string());
    // Rare id-less features borrow the place label, so one fetch never
    // emits a run of colliding empty ids.
    let source_event_id = nonempty(feature.id).unwrap_or_else(|| place.clone());

    NormalizedEvent {
        source: Source::Usgs,
        event_type: Hazard::Earthquake,
        source_event_id,
        time_utc: feature
            .properties
            .time
            .as_ref()
            .and_then(Value::as_f64)
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .map(|t| t.to_rfc3339()),
        place,
        magnitude,
        depth_km,
        lon,
        lat,
        severity_score,
        severity_level,
        url: feature.properties.url,
        hazard_subtype: None,
    }
}
