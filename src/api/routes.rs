//! API route definitions.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::aggregate::{EventCollection, EventQuery};
use crate::model::{Hazard, SeverityLevel};

use super::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Raw query parameters, all optional strings so range errors come back as
/// this API's JSON error body instead of the framework's plain-text reject.
#[derive(Debug, Default, Deserialize)]
struct EventParams {
    hazard: Option<String>,
    feed: Option<String>,
    min_magnitude: Option<String>,
    limit: Option<String>,
    since_hours: Option<String>,
    min_severity_level: Option<String>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventParams>,
) -> Result<Json<EventCollection>, (StatusCode, Json<Value>)> {
    let query = parse_params(params)
        .map_err(|message| (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))))?;

    match state.aggregator.list_events(&query).await {
        Ok(collection) => Ok(Json(collection)),
        Err(e) => {
            error!(error = %e, "hazard query failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Validate raw parameters into an [`EventQuery`], applying the documented
/// defaults: hazard `earthquake`, feed `all_day`, limit 50, window 24 hours.
fn parse_params(params: EventParams) -> Result<EventQuery, String> {
    let hazard = match params.hazard.as_deref() {
        None => Hazard::Earthquake,
        Some(raw) => raw.parse::<Hazard>()?,
    };

    let feed = params.feed.unwrap_or_else(|| "all_day".to_string());

    let min_magnitude = match params.min_magnitude.as_deref() {
        None => None,
        Some(raw) => {
            let magnitude: f64 = raw
                .parse()
                .map_err(|_| format!("min_magnitude is not a number: {raw}"))?;
            if !magnitude.is_finite() || magnitude < 0.0 {
                return Err("min_magnitude must be a non-negative number".to_string());
            }
            Some(magnitude)
        }
    };

    let limit = match params.limit.as_deref() {
        None => 50,
        Some(raw) => {
            let limit: usize = raw
                .parse()
                .map_err(|_| format!("limit is not an integer: {raw}"))?;
            if !(1..=200).contains(&limit) {
                return Err("limit must be between 1 and 200".to_string());
            }
            limit
        }
    };

    let since_hours = match params.since_hours.as_deref() {
        None => Some(24),
        Some(raw) => {
            let hours: u32 = raw
                .parse()
                .map_err(|_| format!("since_hours is not an integer: {raw}"))?;
            if !(1..=168).contains(&hours) {
                return Err("since_hours must be between 1 and 168".to_string());
            }
            Some(hours)
        }
    };

    let min_severity = match params.min_severity_level.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<SeverityLevel>()?),
    };

    Ok(EventQuery {
        hazard,
        feed,
        min_magnitude,
        limit,
        since_hours,
        min_severity,
    })
}
