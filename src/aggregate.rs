//! Hazard query orchestration -- routing, merging, filtering, ranking.
//!
//! The aggregator owns the upstream adapters and runs a query end to end:
//! pick the adapter(s) for the requested hazard, merge flood providers in
//! order under one shared limit, then filter and rank the combined list.
//! Filters and ranking take an explicit `now`, so they are exercised in
//! tests without adapters or a live clock.

use std::cmp::Reverse;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::model::{Hazard, NormalizedEvent, SeverityLevel};
use crate::sources::nws::NwsClient;
use crate::sources::uk_ea::UkEaClient;
use crate::sources::usgs::UsgsClient;
use crate::sources::{build_client, FloodSource, SourceError};

/// One fully-validated hazard query.
///
/// Range checks live at the edges (HTTP parameters, CLI flags); by the time
/// a query reaches the aggregator its values are trusted.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub hazard: Hazard,
    /// Provider feed name, earthquake queries only. Opaque passthrough.
    pub feed: String,
    pub min_magnitude: Option<f64>,
    pub limit: usize,
    pub since_hours: Option<u32>,
    pub min_severity: Option<SeverityLevel>,
}

/// The merged, filtered, ranked result of one query.
#[derive(Debug, Serialize)]
pub struct EventCollection {
    pub hazard: Hazard,
    pub count: usize,
    pub events: Vec<NormalizedEvent>,
}

/// Owns the upstream adapters and answers hazard queries.
pub struct Aggregator {
    earthquakes: UsgsClient,
    /// Flood providers in merge order; earlier sources fill the limit first.
    floods: Vec<Box<dyn FloodSource>>,
}

impl Aggregator {
    /// Build the production aggregator: one shared HTTP client, the USGS
    /// earthquake adapter, and the flood sources in merge order (NWS, UK EA).
    pub fn new(upstream: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(Duration::from_secs(upstream.timeout_secs))?;
        let floods: Vec<Box<dyn FloodSource>> = vec![
            Box::new(NwsClient::new(
                client.clone(),
                upstream.nws_alerts_url.clone(),
            )),
            Box::new(UkEaClient::new(
                client.clone(),
                upstream.uk_floods_url.clone(),
            )),
        ];
        Ok(Self {
            earthquakes: UsgsClient::new(client, upstream.usgs_base_url.clone()),
            floods,
        })
    }

    /// Build an aggregator over explicit sources; tests stub the flood
    /// providers through this.
    pub fn with_sources(earthquakes: UsgsClient, floods: Vec<Box<dyn FloodSource>>) -> Self {
        Self {
            earthquakes,
            floods,
        }
    }

    /// Answer one query: fetch, merge, filter, rank.
    ///
    /// Any adapter failure aborts the whole query. There is no partial
    /// success to mistake for a quiet day.
    pub async fn list_events(&self, query: &EventQuery) -> Result<EventCollection, SourceError> {
        let mut events = match query.hazard {
            Hazard::Earthquake => {
                self.earthquakes
                    .fetch(&query.feed, query.limit, query.min_magnitude)
                    .await?
            }
            Hazard::Flood => self.merged_floods(query.limit).await?,
        };

        if let Some(hours) = query.since_hours {
            retain_recent(&mut events, hours, Utc::now());
        }
        if let Some(floor) = query.min_severity {
            retain_at_least(&mut events, floor);
        }
        rank(&mut events);

        Ok(EventCollection {
            hazard: query.hazard,
            count: events.len(),
            events,
        })
    }

    /// Merge flood providers in order, each asked only for the room left
    /// under `limit`.
    async fn merged_floods(&self, limit: usize) -> Result<Vec<NormalizedEvent>, SourceError> {
        let mut merged: Vec<NormalizedEvent> = Vec::new();
        for source in &self.floods {
            let room = limit.saturating_sub(merged.len());
            if room == 0 {
                break;
            }
            let batch = source.fetch(room).await?;
            debug!(source = %source.source(), count = batch.len(), "flood source merged");
            merged.extend(batch);
        }
        Ok(merged)
    }
}

/// Drop events older than `hours` before `now`. Events whose timestamp is
/// absent or unparsable are kept: missing data must not hide an alert.
fn retain_recent(events: &mut Vec<NormalizedEvent>, hours: u32, now: DateTime<Utc>) {
    let cutoff = now - chrono::Duration::hours(i64::from(hours));
    events.retain(|event| match event.parsed_time() {
        Some(t) => t >= cutoff,
        None => true,
    });
}

/// Drop events ranking below `floor`.
fn retain_at_least(events: &mut Vec<NormalizedEvent>, floor: SeverityLevel) {
    events.retain(|event| event.severity_level >= floor);
}

/// Most urgent first: severity score descending, then recency descending.
/// Events with no parseable timestamp rank oldest within their score. The
/// sort is stable, so full ties keep merge order.
fn rank(events: &mut [NormalizedEvent]) {
    events.sort_by_cached_key(|event| {
        let epoch = event
            .parsed_time()
            .map(|t| t.timestamp_millis())
            .unwrap_or(0);
        Reverse((event.severity_score, epoch))
    });
}
