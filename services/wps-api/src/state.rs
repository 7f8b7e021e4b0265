//! Application state for the WPS API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::compute::CommandCompute;
use crate::config::ServerConfig;
use crate::download::HttpDownloader;
use crate::geometry::WfsClient;
use crate::materialize::{NcdumpProbe, ResourceMaterializer};
use crate::outputs::OutputLocator;
use crate::processes::{ProcessEnv, ProcessRegistry};

/// Shared application state.
pub struct AppState {
    /// Validated configuration.
    pub config: ServerConfig,

    /// Processes offered by this service.
    pub registry: ProcessRegistry,

    /// Collaborators the processes run against.
    pub env: Arc<ProcessEnv>,

    /// Prometheus recorder handle, when one is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub fn new(config: ServerConfig, registry: ProcessRegistry, env: ProcessEnv) -> Self {
        Self {
            config,
            registry,
            env: Arc::new(env),
            metrics: None,
        }
    }

    /// Attach the handle `/metrics` renders from.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the production state: WFS client, ncdump probe, HTTP
    /// downloader and command backend.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let wfs_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.download.connect_timeout_secs))
            .build()
            .context("Failed to create WFS HTTP client")?;

        let downloader = HttpDownloader::new(&config.download.to_download_config())
            .context("Failed to create download client")?;

        let compute = CommandCompute::new(&config.compute.command)?;

        let env = ProcessEnv {
            features: Arc::new(WfsClient::new(wfs_http, config.wfs_base_url())),
            materializer: ResourceMaterializer::new(
                Arc::new(NcdumpProbe::new(config.probe.command.clone())),
                Arc::new(downloader),
                config.scratch_dir.clone(),
            ),
            compute: Arc::new(compute),
            outputs: OutputLocator::new(
                config.output_path.clone(),
                config.output_url.clone(),
                config.output_naming,
            ),
        };

        Ok(Self::new(config, ProcessRegistry::standard(), env))
    }
}
