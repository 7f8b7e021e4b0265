//! WPS API Server
//!
//! Hosts the polygon subset and spatial weighted average processes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use wps_api::config::ServerConfig;
use wps_api::outputs::OutputNaming;
use wps_api::state::AppState;

/// WPS API Server
#[derive(Parser, Debug)]
#[command(name = "wps-api")]
#[command(about = "WPS server for polygon operations on NetCDF datasets")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "WPS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "WPS_LISTEN_ADDR")]
    listen: Option<String>,

    /// Geoserver host (and port) serving the WFS features
    #[arg(long, env = "GEOSERVER_HOST")]
    geoserver_host: Option<String>,

    /// Root directory for process outputs
    #[arg(long, env = "WPS_OUTPUT_PATH")]
    output_path: Option<PathBuf>,

    /// Public URL of the output directory
    #[arg(long, env = "WPS_OUTPUT_URL")]
    output_url: Option<String>,

    /// Public URL of the WPS endpoint
    #[arg(long, env = "WPS_SERVICE_URL")]
    service_url: Option<String>,

    /// Output naming policy (deterministic or request_scoped)
    #[arg(long, env = "WPS_OUTPUT_NAMING")]
    output_naming: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "WPS_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) -> Result<()> {
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(host) = &self.geoserver_host {
            config.geoserver_host = host.clone();
        }
        if let Some(path) = &self.output_path {
            config.output_path = path.clone();
        }
        if let Some(url) = &self.output_url {
            config.output_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &self.service_url {
            config.service_url = url.clone();
        }
        if let Some(naming) = &self.output_naming {
            config.output_naming = match naming.as_str() {
                "deterministic" => OutputNaming::Deterministic,
                "request_scoped" => OutputNaming::RequestScoped,
                other => anyhow::bail!("Unknown output naming policy: {}", other),
            };
        }
        Ok(())
    }
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

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting WPS API server");

    let mut config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut config)?;
    config.validate().context("Invalid configuration")?;
    config.prepare_directories()?;

    info!(
        geoserver = %config.geoserver_host,
        output_path = %config.output_path.display(),
        output_url = %config.output_url,
        naming = ?config.output_naming,
        "Configuration loaded"
    );

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen))?;

    let state = Arc::new(AppState::from_config(config)?.with_metrics(prometheus_handle));
    let app = wps_api::router(state);

    info!("WPS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
