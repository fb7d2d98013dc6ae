use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use hazardhub::aggregate::{Aggregator, EventCollection, EventQuery};
use hazardhub::config::Config;
use hazardhub::model::{Hazard, SeverityLevel};

#[derive(Parser)]
#[command(
    name = "hazardhub",
    about = "Live hazard event aggregation (earthquakes, flood alerts)",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API daemon
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run one hazard query and print the results
    Events {
        /// Hazard stream: earthquake or flood
        #[arg(long, default_value = "earthquake")]
        hazard: String,

        /// USGS feed name (earthquakes only), e.g. all_hour, all_day, 4.5_week
        #[arg(long, default_value = "all_day")]
        feed: String,

        /// Drop earthquakes below this magnitude
        #[arg(long)]
        min_magnitude: Option<f64>,

        /// Maximum events to return (1-200)
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Only events from the last N hours (1-168)
        #[arg(long, default_value = "24")]
        since_hours: u32,

        /// Minimum severity level: low, medium, high or critical
        #[arg(long)]
        min_severity: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting HazardHub daemon");
            hazardhub::serve(config).await?;
        }
        Commands::Events {
            hazard,
            feed,
            min_magnitude,
            limit,
            since_hours,
            min_severity,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let query = build_query(
                &hazard,
                feed,
                min_magnitude,
                limit,
                since_hours,
                min_severity.as_deref(),
            )?;

            tracing::info!(hazard = %query.hazard, limit = query.limit, "Running hazard query");
            let aggregator = Aggregator::new(&config.upstream)?;
            let collection = aggregator.list_events(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                print_table(&collection);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Ok(match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    })
}

/// Mirror the HTTP API's range checks so both entry points reject the same
/// inputs with the same wording.
fn build_query(
    hazard: &str,
    feed: String,
    min_magnitude: Option<f64>,
    limit: usize,
    since_hours: u32,
    min_severity: Option<&str>,
) -> Result<EventQuery> {
    let hazard: Hazard = hazard.parse().map_err(anyhow::Error::msg)?;
    anyhow::ensure!(
        (1..=200).contains(&limit),
        "limit must be between 1 and 200"
    );
    anyhow::ensure!(
        (1..=168).contains(&since_hours),
        "since_hours must be between 1 and 168"
    );
    if let Some(magnitude) = min_magnitude {
        anyhow::ensure!(
            magnitude.is_finite() && magnitude >= 0.0,
            "min_magnitude must be a non-negative number"
        );
    }
    let min_severity = match min_severity {
        None => None,
        Some(raw) => Some(raw.parse::<SeverityLevel>().map_err(anyhow::Error::msg)?),
    };

    Ok(EventQuery {
        hazard,
        feed,
        min_magnitude,
        limit,
        since_hours: Some(since_hours),
        min_severity,
    })
}

fn print_table(collection: &EventCollection) {
    println!(
        "\nHazardHub -- {} {} event(s)",
        collection.count, collection.hazard
    );
    if collection.events.is_empty() {
        println!("No events matched the query.\n");
        return;
    }

    println!(
        "{:<5} | {:<8} | {:<6} | {:<5} | {:<25} | Place",
        "Score", "Level", "Source", "Mag", "Time (UTC)"
    );
    println!(
        "{:-<5}-|-{:-<8}-|-{:-<6}-|-{:-<5}-|-{:-<25}-|-{:-<40}",
        "", "", "", "", "", ""
    );
    for event in &collection.events {
        println!(
            "{:<5} | {:<8} | {:<6} | {:<5} | {:<25} | {}",
            event.severity_score,
            event.severity_level.to_string(),
            event.source.to_string(),
            event
                .magnitude
                .map_or_else(|| "-".to_string(), |m| format!("{m:.1}")),
            event.time_utc.as_deref().unwrap_or("-"),
            event.place,
        );
    }
    println!();
}
