//! National Weather Service flood alert adapter.
//!
//! The alerts API is queried once per flood event category in a fixed order,
//! warnings ahead of watches within each flood family, so when a caller's
//! limit truncates the list the trailing categories fall off. Alerts carry
//! their geometry inline only sometimes; the rest point at affected-zone
//! resources, which this adapter resolves under a hard per-query lookup
//! budget so one request cannot fan out into hundreds of upstream calls.

use std::collections::HashSet;

use chrono::Utc;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::geo::point_from_geojson;
use crate::model::{Hazard, NormalizedEvent, SeverityLevel, Source};
use crate::severity::score_flood;

use super::{get_json, nonempty, FloodSource, SourceError};

/// Queried most-urgent first.
const FLOOD_EVENTS: [&str; 8] = [
    "Flood Warning",
    "Flood Watch",
    "Flash Flood Warning",
    "Flash Flood Watch",
    "Coastal Flood Warning",
    "Coastal Flood Watch",
    "Coastal Flood Advisory",
    "Flood Advisory",
];

/// Cap on affected-zone resolutions per query.
const ZONE_LOOKUP_BUDGET: u32 = 40;

const GEOJSON_ACCEPT: &str = "application/geo+json";

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
struct AlertProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    sent: Option<String>,
    #[serde(default)]
    effective: Option<String>,
    #[serde(default, rename = "areaDesc")]
    area_desc: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default, rename = "affectedZones")]
    affected_zones: Vec<String>,
    #[serde(default)]
    web: Option<String>,
    #[serde(default, rename = "@id")]
    at_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZoneResource {
    #[serde(default)]
    geometry: Option<Value>,
}

/// A normalized alert plus the zone URL to try if it still lacks a position.
struct PendingAlert {
    event: NormalizedEvent,
    fallback_zone: Option<String>,
}

/// Client for the NWS active-alerts API.
pub struct NwsClient {
    client: reqwest::Client,
    alerts_url: String,
}

impl NwsClient {
    pub fn new(client: reqwest::Client, alerts_url: impl Into<String>) -> Self {
        Self {
            client,
            alerts_url: alerts_url.into(),
        }
    }

    /// Resolve an affected-zone resource to a representative point.
    ///
    /// Zone lookups are best-effort: any failure here is logged and the
    /// alert ships without a position.
    async fn zone_point(&self, zone_url: &str) -> Option<(f64, f64)> {
        let request = self.client.get(zone_url).header(ACCEPT, GEOJSON_ACCEPT);
        match get_json::<ZoneResource>(Source::Nws, request).await {
            Ok(zone) => {
                let point = point_from_geojson(zone.geometry.as_ref());
                if point.is_none() {
                    debug!(zone_url, "zone carries no usable geometry");
                }
                point
            }
            Err(e) => {
                warn!(zone_url, error = %e, "zone lookup failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl FloodSource for NwsClient {
    fn source(&self) -> Source {
        Source::Nws
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<NormalizedEvent>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut pending: Vec<PendingAlert> = Vec::new();

        for event_name in FLOOD_EVENTS {
            let request = self
                .client
                .get(&self.alerts_url)
                .query(&[("event", event_name)])
                .header(ACCEPT, GEOJSON_ACCEPT);
            let payload: AlertCollection = get_json(Source::Nws, request).await?;
            if ingest_payload(payload, &mut seen, &mut pending, limit) {
                break;
            }
        }

        let mut budget = ZONE_LOOKUP_BUDGET;
        for alert in &mut pending {
            let Some(zone_url) = alert.fallback_zone.as_deref() else {
                continue;
            };
            if budget == 0 {
                debug!("zone lookup budget exhausted");
                break;
            }
            budget -= 1;
            if let Some((lon, lat)) = self.zone_point(zone_url).await {
                alert.event.lon = Some(lon);
                alert.event.lat = Some(lat);
            }
        }

        let events: Vec<NormalizedEvent> = pending.into_iter().map(|p| p.event).collect();
        debug!(count = events.len(), "nws flood alerts normalized");
        Ok(events)
    }
}

/// Fold one category's payload into `out`, deduplicating by alert id across
/// categories. Returns true once `out` has reached `limit`.
fn ingest_payload(
    payload: AlertCollection,
    seen: &mut HashSet<String>,
    out: &mut Vec<PendingAlert>,
    limit: usize,
) -> bool {
    for feature in payload.features {
        let AlertFeature {
            id: feature_id,
            geometry,
            properties,
        } = feature;

        // Alerts are keyed by the properties id, falling back to the
        // feature id; with neither there is nothing to deduplicate on.
        let Some(alert_id) = nonempty(properties.id).or_else(|| nonempty(feature_id)) else {
            continue;
        };
        if !seen.insert(alert_id.clone()) {
            continue;
        }

        let level = level_from_severity(properties.severity.as_deref());
        let severity_score = score_flood(level, properties.event.as_deref(), None);

        let position = point_from_geojson(geometry.as_ref());
        let fallback_zone = if position.is_none() {
            properties
                .affected_zones
                .into_iter()
                .next()
                .filter(|z| !z.is_empty())
        } else {
            None
        };
        let (lon, lat) = match position {
            Some((lon, lat)) => (Some(lon), Some(lat)),
            None => (None, None),
        };

        let event_label = nonempty(properties.event);
        let place = nonempty(properties.area_desc)
            .or_else(|| nonempty(properties.headline))
            .or_else(|| event_label.clone())
            .unwrap_or_else(|| "NWS Flood Alert".to_string());
        let time_utc = nonempty(properties.sent)
            .or_else(|| nonempty(properties.effective))
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let url = nonempty(properties.web).or_else(|| nonempty(properties.at_id));

        out.push(PendingAlert {
            event: NormalizedEvent {
                source: Source::Nws,
                event_type: Hazard::Flood,
                source_event_id: alert_id,
                time_utc: Some(time_utc),
                place,
                magnitude: None,
                depth_km: None,
                lon,
                lat,
                severity_score,
                severity_level: level,
                url,
                hazard_subtype: event_label,
            },
            fallback_zone,
        });
        if out.len() >= limit {
            return true;
        }
    }
    false
}

fn level_from_severity(severity: Option<&str>) -> SeverityLevel {
    match severity.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("extreme") => SeverityLevel::Critical,
        Some("severe") => SeverityLevel::High,
        Some("moderate") => SeverityLevel::Medium,
        _ => SeverityLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    fn payload(json: Value) -> AlertCollection {
        serde_json::from_value(json).unwrap()
    }

    fn ingest(json: Value, limit: usize) -> Vec<PendingAlert> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        ingest_payload(payload(json), &mut seen, &mut out, limit);
        out
    }

    /// Loopback stand-in for the alerts API: the first category lists
    /// `alert_count` geometry-less alerts pointing at this server's own zone
    /// resources, the second relists the first `duplicate_count` of them,
    /// the rest are empty. Zones below `failing_zones` answer 500.
    #[derive(Clone)]
    struct StubNws {
        base_url: String,
        categories_hit: Arc<Mutex<Vec<String>>>,
        zone_hits: Arc<AtomicUsize>,
        alert_count: usize,
        duplicate_count: usize,
        failing_zones: usize,
    }

    async fn spawn_stub(
        alert_count: usize,
        duplicate_count: usize,
        failing_zones: usize,
    ) -> StubNws {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stub = StubNws {
            base_url: format!("http://{}", listener.local_addr().unwrap()),
            categories_hit: Arc::new(Mutex::new(Vec::new())),
            zone_hits: Arc::new(AtomicUsize::new(0)),
            alert_count,
            duplicate_count,
            failing_zones,
        };
        let app = Router::new()
            .route("/alerts", get(stub_alerts))
            .route("/zones/{id}", get(stub_zone))
            .with_state(stub.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        stub
    }

    async fn stub_alerts(
        State(stub): State<StubNws>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let event_name = params.get("event").cloned().unwrap_or_default();
        stub.categories_hit.lock().unwrap().push(event_name.clone());

        let features: Vec<Value> = if event_name == FLOOD_EVENTS[0] {
            (0..stub.alert_count)
                .map(|i| {
                    json!({
                        "id": format!("alert-{i}"),
                        "properties": {
                            "event": event_name,
                            "severity": "Moderate",
                            "affectedZones": [format!("{}/zones/{i}", stub.base_url)]
                        }
                    })
                })
                .collect()
        } else if event_name == FLOOD_EVENTS[1] {
            (0..stub.duplicate_count)
                .map(|i| json!({ "id": format!("alert-{i}"), "properties": {} }))
                .collect()
        } else {
            Vec::new()
        };
        Json(json!({ "features": features }))
    }

    async fn stub_zone(
        State(stub): State<StubNws>,
        Path(id): Path<usize>,
    ) -> Result<Json<Value>, StatusCode> {
        stub.zone_hits.fetch_add(1, Ordering::SeqCst);
        if id < stub.failing_zones {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(Json(json!({
            "geometry": { "type": "Point", "coordinates": [-95.0, 30.0] }
        })))
    }

    #[tokio::test]
    async fn test_zone_budget_is_charged_per_attempt_and_capped() {
        let budget = ZONE_LOOKUP_BUDGET as usize;
        let stub = spawn_stub(budget + 5, 5, 3).await;
        let nws = NwsClient::new(
            reqwest::Client::new(),
            format!("{}/alerts", stub.base_url),
        );

        let events = nws.fetch(200).await.unwrap();

        // One query per category, in the documented order.
        assert_eq!(*stub.categories_hit.lock().unwrap(), FLOOD_EVENTS);
        // Relisted alerts collapse into the first category's entries.
        assert_eq!(events.len(), budget + 5);
        // Failed lookups are charged against the budget too.
        assert_eq!(stub.zone_hits.load(Ordering::SeqCst), budget);

        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.source_event_id, format!("alert-{i}"));
            let expect_position = (stub.failing_zones..budget).contains(&i);
            assert_eq!(event.lon.is_some(), expect_position, "alert {i}");
            assert_eq!(event.lat.is_some(), expect_position, "alert {i}");
        }
    }

    #[tokio::test]
    async fn test_category_failure_aborts_the_fetch() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let alerts_url = format!("http://{}/alerts", listener.local_addr().unwrap());
        let app = Router::new()
            .route("/alerts", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let nws = NwsClient::new(reqwest::Client::new(), alerts_url);
        let result = nws.fetch(10).await;

        assert!(matches!(
            result,
            Err(SourceError::Unavailable {
                provider: Source::Nws,
                ..
            })
        ));
    }

    #[test]
    fn test_normalizes_a_full_warning() {
        let pending = ingest(
            json!({
                "features": [{
                    "id": "feature-id",
                    "geometry": { "type": "Point", "coordinates": [-90.2, 29.9] },
                    "properties": {
                        "id": "urn:oid:2.49.0.1.840.0.abc",
                        "event": "Flash Flood Warning",
                        "severity": "Extreme",
                        "sent": "2024-05-01T10:00:00-05:00",
                        "effective": "2024-05-01T10:05:00-05:00",
                        "areaDesc": "Orleans Parish, LA",
                        "headline": "Flash Flood Warning issued",
                        "web": "https://alerts.weather.gov/abc",
                        "affectedZones": ["https://api.weather.gov/zones/county/LAC071"]
                    }
                }]
            }),
            10,
        );

        assert_eq!(pending.len(), 1);
        let event = &pending[0].event;
        assert_eq!(event.source, Source::Nws);
        assert_eq!(event.event_type, Hazard::Flood);
        assert_eq!(event.source_event_id, "urn:oid:2.49.0.1.840.0.abc");
        assert_eq!(event.place, "Orleans Parish, LA");
        assert_eq!(event.time_utc.as_deref(), Some("2024-05-01T10:00:00-05:00"));
        assert_eq!(event.lon, Some(-90.2));
        assert_eq!(event.lat, Some(29.9));
        assert_eq!(event.severity_level, SeverityLevel::Critical);
        assert_eq!(event.severity_score, 100);
        assert_eq!(event.url.as_deref(), Some("https://alerts.weather.gov/abc"));
        assert_eq!(event.hazard_subtype.as_deref(), Some("Flash Flood Warning"));
        // Direct geometry resolved, so no zone fallback is kept.
        assert!(pending[0].fallback_zone.is_none());
    }

    #[test]
    fn test_severity_mapping_ignores_case_and_padding() {
        assert_eq!(level_from_severity(Some("Extreme")), SeverityLevel::Critical);
        assert_eq!(level_from_severity(Some("severe")), SeverityLevel::High);
        assert_eq!(level_from_severity(Some("MODERATE")), SeverityLevel::Medium);
        assert_eq!(level_from_severity(Some("Severe ")), SeverityLevel::High);
        assert_eq!(level_from_severity(Some("\textreme\n")), SeverityLevel::Critical);
        assert_eq!(level_from_severity(Some("Minor")), SeverityLevel::Low);
        assert_eq!(level_from_severity(Some("Unknown")), SeverityLevel::Low);
        assert_eq!(level_from_severity(None), SeverityLevel::Low);
    }

    #[test]
    fn test_alerts_without_any_id_are_skipped() {
        let pending = ingest(
            json!({
                "features": [
                    { "properties": { "event": "Flood Warning" } },
                    { "id": "", "properties": { "id": "" } },
                    { "id": "kept", "properties": {} }
                ]
            }),
            10,
        );

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event.source_event_id, "kept");
    }

    #[test]
    fn test_properties_id_wins_over_feature_id() {
        let pending = ingest(
            json!({
                "features": [{
                    "id": "outer",
                    "properties": { "id": "inner" }
                }]
            }),
            10,
        );
        assert_eq!(pending[0].event.source_event_id, "inner");
    }

    #[test]
    fn test_duplicates_collapse_across_payloads() {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        ingest_payload(
            payload(json!({ "features": [{ "id": "a1" }, { "id": "a2" }] })),
            &mut seen,
            &mut out,
            10,
        );
        ingest_payload(
            payload(json!({ "features": [{ "id": "a2" }, { "id": "a3" }] })),
            &mut seen,
            &mut out,
            10,
        );

        let ids: Vec<&str> = out.iter().map(|p| p.event.source_event_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn test_polygon_geometry_resolves_to_its_centroid() {
        let pending = ingest(
            json!({
                "features": [{
                    "id": "poly",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-91.0, 30.0], [-89.0, 30.0], [-89.0, 32.0], [-91.0, 32.0]]]
                    }
                }]
            }),
            10,
        );

        assert_eq!(pending[0].event.lon, Some(-90.0));
        assert_eq!(pending[0].event.lat, Some(31.0));
        assert!(pending[0].fallback_zone.is_none());
    }

    #[test]
    fn test_geometry_less_alert_keeps_first_zone_for_fallback() {
        let pending = ingest(
            json!({
                "features": [{
                    "id": "zoned",
                    "properties": {
                        "affectedZones": [
                            "https://api.weather.gov/zones/county/A",
                            "https://api.weather.gov/zones/county/B"
                        ]
                    }
                }]
            }),
            10,
        );

        assert_eq!(pending[0].event.lon, None);
        assert_eq!(
            pending[0].fallback_zone.as_deref(),
            Some("https://api.weather.gov/zones/county/A")
        );
    }

    #[test]
    fn test_time_falls_back_from_sent_to_effective_to_now() {
        let pending = ingest(
            json!({
                "features": [
                    { "id": "t1", "properties": { "sent": "", "effective": "2024-05-01T00:00:00+00:00" } },
                    { "id": "t2", "properties": {} }
                ]
            }),
            10,
        );

        assert_eq!(
            pending[0].event.time_utc.as_deref(),
            Some("2024-05-01T00:00:00+00:00")
        );
        // No timestamps at all: stamped with the fetch time, still parseable.
        assert!(pending[1].event.parsed_time().is_some());
    }

    #[test]
    fn test_place_falls_back_through_headline_event_then_label() {
        let pending = ingest(
            json!({
                "features": [
                    { "id": "p1", "properties": { "headline": "Headline only" } },
                    { "id": "p2", "properties": { "event": "Flood Advisory" } },
                    { "id": "p3", "properties": {} }
                ]
            }),
            10,
        );

        assert_eq!(pending[0].event.place, "Headline only");
        assert_eq!(pending[1].event.place, "Flood Advisory");
        assert_eq!(pending[2].event.place, "NWS Flood Alert");
    }

    #[test]
    fn test_url_falls_back_to_the_canonical_id() {
        let pending = ingest(
            json!({
                "features": [{
                    "id": "u1",
                    "properties": { "@id": "https://api.weather.gov/alerts/u1" }
                }]
            }),
            10,
        );
        assert_eq!(
            pending[0].event.url.as_deref(),
            Some("https://api.weather.gov/alerts/u1")
        );
    }

    #[test]
    fn test_limit_stops_mid_payload() {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let filled = ingest_payload(
            payload(json!({ "features": [{ "id": "a" }, { "id": "b" }, { "id": "c" }] })),
            &mut seen,
            &mut out,
            2,
        );

        assert!(filled);
        let ids: Vec<&str> = out.iter().map(|p| p.event.source_event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_watch_scores_below_warning() {
        let pending = ingest(
            json!({
                "features": [
                    { "id": "w1", "properties": { "event": "Flood Warning", "severity": "Severe" } },
                    { "id": "w2", "properties": { "event": "Flood Watch", "severity": "Moderate" } }
                ]
            }),
            10,
        );

        assert_eq!(pending[0].event.severity_score, 70);
        assert_eq!(pending[0].event.severity_level, SeverityLevel::High);
        assert_eq!(pending[1].event.severity_score, 45);
        assert_eq!(pending[1].event.severity_level, SeverityLevel::Medium);
    }
}
