//! NWM API Server
//!
//! Serves National Water Model data from BigQuery over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use nwm_api::config::{ApiConfig, ConfigOverrides};
use nwm_api::metrics::install_recorder;
use nwm_api::state::AppState;

/// NWM API Server
#[derive(Parser, Debug)]
#[command(name = "nwm-api")]
#[command(about = "HTTP API for National Water Model data")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "NWM_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "NWM_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config/nwm-api.yaml", env = "NWM_CONFIG")]
    config: PathBuf,

    /// BigQuery project billed for queries
    #[arg(long, env = "NWM_BIGQUERY_PROJECT")]
    bigquery_project: Option<String>,

    /// BigQuery REST endpoint
    #[arg(long, env = "NWM_BIGQUERY_ENDPOINT")]
    bigquery_endpoint: Option<String>,

    /// BigQuery job location
    #[arg(long, env = "NWM_BIGQUERY_LOCATION")]
    bigquery_location: Option<String>,

    /// OAuth bearer token for BigQuery
    #[arg(long, env = "NWM_BIGQUERY_TOKEN", hide_env_values = true)]
    bigquery_token: Option<String>,

    /// HydroShare contents URL template containing `{id}`
    #[arg(long, env = "NWM_HYDROSHARE_URL")]
    hydroshare_url: Option<String>,

    /// Timeout for each upstream call, in seconds
    #[arg(long, env = "NWM_UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bigquery_project: self.bigquery_project.clone(),
            bigquery_endpoint: self.bigquery_endpoint.clone(),
            bigquery_location: self.bigquery_location.clone(),
            bigquery_token: self.bigquery_token.clone(),
            hydroshare_url_template: self.hydroshare_url.clone(),
            upstream_timeout_secs: self.upstream_timeout_secs,
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting NWM API server");

    let config = ApiConfig::load(&args.config)?.with_overrides(args.overrides());
    info!(
        long_range = %config.tables.long_range,
        upstream_timeout_secs = config.upstream_timeout_secs,
        "Loaded configuration"
    );

    let metrics = install_recorder()?;
    let state = AppState::from_config(config)
        .context("Failed to initialize application state")?
        .with_metrics(metrics);

    let app = nwm_api::router(Arc::new(state));

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
