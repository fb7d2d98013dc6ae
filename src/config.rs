//! TOML configuration for the HazardHub service.
//!
//! Layered model: an environment variable can point at a config file, a
//! standard system path is tried next, and compiled-in defaults cover the
//! rest. Every field has a default, so a partial file only overrides what it
//! names.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path named by the `HAZARDHUB_CONFIG` environment variable.
    /// 2. `/etc/hazardhub/hazardhub.toml`.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var("HAZARDHUB_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "HAZARDHUB_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new("/etc/hazardhub/hazardhub.toml");
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP API listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API listener.
    pub bind: String,
    /// Origins the CORS layer allows (the dashboard dev servers by default).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream feeds
// ---------------------------------------------------------------------------

/// Endpoints and transport settings for the hazard data providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the USGS earthquake summary feeds.
    pub usgs_base_url: String,
    /// URL of the NWS active-alerts endpoint.
    pub nws_alerts_url: String,
    /// URL of the UK Environment Agency current-floods listing.
    pub uk_floods_url: String,
    /// Per-request timeout applied to every upstream call (seconds).
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            usgs_base_url: "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary"
                .to_string(),
            nws_alerts_url: "https://api.weather.gov/alerts/active".to_string(),
            uk_floods_url: "https://environment.data.gov.uk/flood-monitoring/id/floods"
                .to_string(),
            timeout_secs: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
