//! Point Query
//!
//! Reads weather and climate variables at one location from a store
//! snapshot and prints them as a table or JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use storage::{CachedWeightsStore, InMemoryStore, TimeSeriesStore};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use point_query::{load_config, render, run_query, Dataset, OutputFormat, QueryRequest};

/// Point Query
#[derive(Parser, Debug)]
#[command(name = "point-query")]
#[command(about = "Read point time series from a store snapshot")]
struct Args {
    /// Store snapshot (JSON)
    #[arg(short, long, env = "POINT_QUERY_SNAPSHOT")]
    snapshot: PathBuf,

    /// Dataset, e.g. cerra, cams, bom_access_global or a CMIP6 model name
    #[arg(short, long)]
    domain: String,

    #[arg(long, allow_hyphen_values = true)]
    lat: f32,

    #[arg(long, allow_hyphen_values = true)]
    lon: f32,

    /// Target elevation in metres, the model elevation if not set
    #[arg(long, allow_hyphen_values = true)]
    elevation: Option<f32>,

    /// First timestamp, RFC 3339 or YYYY-MM-DD
    #[arg(long, value_parser = parse_start)]
    start: DateTime<Utc>,

    /// Number of time steps
    #[arg(long, default_value_t = 24)]
    count: usize,

    /// Time step in seconds, the dataset's native step if not set
    #[arg(long)]
    dt: Option<i64>,

    /// Comma separated variable names
    #[arg(short, long, value_delimiter = ',', required = true)]
    variables: Vec<String>,

    /// Reader configuration file (YAML). Environment variables otherwise.
    #[arg(short, long, env = "POINT_QUERY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,
}

fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = s.parse::<DateTime<Utc>>() {
        return Ok(time);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| format!("invalid start time: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = load_config(args.config.as_deref())?;
    let dataset: Dataset = args
        .domain
        .parse()
        .with_context(|| format!("Unknown dataset {}", args.domain))?;

    let store = InMemoryStore::load_json(&args.snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?;
    info!(snapshot = %args.snapshot.display(), stats = ?store.stats(), "Loaded snapshot");

    let store = Arc::new(CachedWeightsStore::new(store, config.weight_cache_entries)?);
    let shared: Arc<dyn TimeSeriesStore> = store.clone();

    let request = QueryRequest {
        latitude: args.lat,
        longitude: args.lon,
        elevation: args.elevation,
        start: args.start,
        count: args.count,
        dt_seconds: args.dt,
        variables: args.variables,
    };
    let result = run_query(&dataset, &request, &config, shared).await?;

    let weights = store.stats().await;
    info!(
        hits = weights.hits,
        misses = weights.misses,
        hit_rate = weights.hit_rate(),
        reads = store.inner().stats().reads,
        "Query finished"
    );

    println!("{}", render(&result, args.format)?);
    Ok(())
}
