//! WMS Proxy Server
//!
//! Answers GetFeatureInfo requests by querying the configured backend WMS
//! servers and merging their responses.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Extension};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use wms_proxy::config::ProxyConfig;
use wms_proxy::handlers;
use wms_proxy::state::AppState;

/// WMS Proxy Server
#[derive(Parser, Debug)]
#[command(name = "wms-proxy")]
#[command(about = "WMS proxy aggregating GetFeatureInfo responses from multiple backends")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "WMS_PROXY_LISTEN_ADDR")]
    listen: String,

    /// Layer and source configuration file
    #[arg(short, long, default_value = "config/featureinfo.yaml", env = "WMS_PROXY_CONFIG")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "WMS_PROXY_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

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
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!(config = ?args.config, "Starting WMS proxy");

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let config = ProxyConfig::load(&args.config)?;
    let state = Arc::new(AppState::new(config)?);

    let app = handlers::router(state)
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(address = %args.listen, "WMS proxy listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
