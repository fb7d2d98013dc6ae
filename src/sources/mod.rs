//! Source adapters -- one module per upstream hazard feed.
//!
//! Every adapter turns its provider's native payload into the shared
//! [`NormalizedEvent`] shape; the aggregator never touches provider types,
//! so schema drift in one feed cannot corrupt another's normalization.

pub mod nws;
pub mod uk_ea;
pub mod usgs;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::{NormalizedEvent, Source};

/// Fatal adapter failures. Anything here aborts the whole query -- there is
/// no silent empty-list fallback. Geometry problems are deliberately *not*
/// errors; those events go out with absent positions.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or non-success status from a provider.
    #[error("{provider} unavailable: {detail}")]
    Unavailable { provider: Source, detail: String },

    /// Response body did not match the expected structure.
    #[error("{provider} returned a malformed payload: {detail}")]
    Malformed { provider: Source, detail: String },
}

/// A provider of active flood alerts that the aggregator can merge with its
/// siblings.
///
/// Flood sources are consulted in a fixed order, each asked for at most the
/// room left under the caller's limit.
#[async_trait::async_trait]
pub trait FloodSource: Send + Sync {
    /// Which upstream this adapter speaks for.
    fn source(&self) -> Source;

    /// Fetch and normalize up to `limit` active flood alerts.
    async fn fetch(&self, limit: usize) -> Result<Vec<NormalizedEvent>, SourceError>;
}

/// Build the HTTP client shared by all adapters.
///
/// One client, one timeout: every upstream request inherits it. The NWS API
/// refuses anonymous traffic, so the crate identifies itself.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("hazardhub/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Treat empty strings like absent fields, matching how the upstream feeds
/// blur the two.
pub(crate) fn nonempty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Send a prepared GET and deserialize the JSON body.
///
/// Network errors and non-2xx statuses map to [`SourceError::Unavailable`],
/// undecodable bodies to [`SourceError::Malformed`]. No retries.
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: Source,
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = request.send().await.map_err(|e| SourceError::Unavailable {
        provider,
        detail: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Unavailable {
            provider,
            detail: format!("{} returned status {status}", response.url()),
        });
    }

    response.json::<T>().await.map_err(|e| SourceError::Malformed {
        provider,
        detail: e.to_string(),
    })
}
