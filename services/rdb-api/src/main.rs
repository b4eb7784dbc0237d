//! aq2rdb server
//!
//! Serves AQUARIUS time series as NWIS RDB files.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use rdb_api::config::ServiceConfig;
use rdb_api::handlers;
use rdb_api::state::{AppState, UpstreamSettings};

/// aq2rdb server
#[derive(Parser, Debug)]
#[command(name = "aq2rdb")]
#[command(about = "AQUARIUS time-series retrieval rendered as NWIS RDB")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8081", env = "AQ2RDB_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "AQ2RDB_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// AQUARIUS server host name
    #[arg(long, env = "AQUARIUS_HOSTNAME")]
    aquarius_hostname: String,

    /// NWIS Web Services host name
    #[arg(long, default_value = "waterservices.usgs.gov", env = "WATERSERVICES_HOSTNAME")]
    waterservices_hostname: String,

    /// AQUARIUS user name
    #[arg(long, env = "AQUARIUS_USER")]
    aquarius_user: String,

    /// AQUARIUS password
    #[arg(long, env = "AQUARIUS_PASSWORD", hide_env_values = true)]
    aquarius_password: String,

    /// Service config file (YAML)
    #[arg(long, default_value = "config/rdb-api.yaml", env = "AQ2RDB_CONFIG")]
    config: String,
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

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting aq2rdb server");

    let config = ServiceConfig::load(&args.config)?;

    let settings = UpstreamSettings {
        aquarius_hostname: args.aquarius_hostname,
        waterservices_hostname: args.waterservices_hostname,
        aquarius_user: args.aquarius_user,
        aquarius_password: args.aquarius_password,
    };

    let state = Arc::new(
        AppState::new(settings, config).context("Failed to initialize application state")?,
    );

    // Build router
    let app = Router::new()
        .route("/aq2rdb", get(handlers::rdb::rdb_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    // Parse listen address
    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("aq2rdb listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
