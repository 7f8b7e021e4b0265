//! Resource materialization: make sure an input dataset can be opened.
//!
//! The resource is first opened where it is (local path or OPeNDAP URL).
//! If that fails for any reason other than an authorization failure, the
//! resource is downloaded once into the scratch directory and the copy is
//! opened instead. Authorization failures are never retried.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::download::{DownloadError, Downloader};
use crate::error::{ProcessError, ProcessResult};
use crate::outputs::resource_basename;

/// Message the NetCDF library reports when the server refuses access.
const AUTHORIZATION_FAILURE: &str = "Authorization failure";

/// Why a dataset could not be opened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpenError {
    #[error("authorization failure: {0}")]
    AuthorizationFailure(String),

    #[error("{0}")]
    Failed(String),
}

/// Classify a dataset library error message.
pub fn classify_open_failure(message: &str) -> OpenError {
    if message.contains(AUTHORIZATION_FAILURE) {
        OpenError::AuthorizationFailure(message.to_string())
    } else {
        OpenError::Failed(message.to_string())
    }
}

/// Checks whether a resource opens as a dataset.
#[async_trait]
pub trait DatasetProbe: Send + Sync {
    async fn open(&self, resource: &str) -> Result<(), OpenError>;
}

/// Probe that opens the dataset header with `ncdump -h`.
///
/// `ncdump` goes through the NetCDF library, so it understands local files
/// as well as OPeNDAP URLs and reports authorization failures the same way
/// the library does.
pub struct NcdumpProbe {
    command: String,
}

impl NcdumpProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl DatasetProbe for NcdumpProbe {
    async fn open(&self, resource: &str) -> Result<(), OpenError> {
        let output = Command::new(&self.command)
            .arg("-h")
            .arg(resource)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OpenError::Failed(format!("failed to run {}: {}", self.command, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("{} exited with {}", self.command, output.status),
            msg => msg.to_string(),
        };
        Err(classify_open_failure(&message))
    }
}

/// Where the dataset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// The resource opened in place.
    Direct(String),

    /// The resource had to be copied to local scratch storage.
    Downloaded { path: PathBuf },
}

impl Materialized {
    /// Path or URL to hand to the computation backend.
    pub fn location(&self) -> String {
        match self {
            Materialized::Direct(resource) => resource.clone(),
            Materialized::Downloaded { path, .. } => path.to_string_lossy().into_owned(),
        }
    }

    pub fn was_downloaded(&self) -> bool {
        matches!(self, Materialized::Downloaded { .. })
    }
}

/// Opens resources directly or through a one-shot download fallback.
pub struct ResourceMaterializer {
    probe: Arc<dyn DatasetProbe>,
    downloader: Arc<dyn Downloader>,
    scratch_dir: PathBuf,
}

impl ResourceMaterializer {
    pub fn new(
        probe: Arc<dyn DatasetProbe>,
        downloader: Arc<dyn Downloader>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            probe,
            downloader,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Local path a resource is downloaded to.
    pub fn scratch_path(&self, resource: &str) -> PathBuf {
        self.scratch_dir.join(resource_basename(resource))
    }

    /// Ensure `resource` is openable, downloading it if necessary.
    pub async fn materialize(
        &self,
        ctx: &RequestContext,
        resource: &str,
    ) -> ProcessResult<Materialized> {
        let reason = match self.probe.open(resource).await {
            Ok(()) => {
                info!(parent: &ctx.span, resource = %resource, "Resource opened directly");
                return Ok(Materialized::Direct(resource.to_string()));
            }
            Err(OpenError::AuthorizationFailure(msg)) => {
                warn!(parent: &ctx.span, resource = %resource, error = %msg, "Authorization failure");
                return Err(ProcessError::AuthenticationRequired);
            }
            Err(OpenError::Failed(msg)) => msg,
        };

        if resource_basename(resource).is_empty() {
            warn!(parent: &ctx.span, resource = %resource, "No file name to download to");
            return Err(ProcessError::DownloadFailed(format!(
                "no file name in resource '{}'",
                resource
            )));
        }

        let target = self.scratch_path(resource);
        info!(
            parent: &ctx.span,
            resource = %resource,
            target = %target.display(),
            reason = %reason,
            "Direct open failed, downloading"
        );

        match self.downloader.download(resource, &target).await {
            Ok(bytes) => {
                metrics::counter!("wps_downloads_total", "outcome" => "ok").increment(1);
                info!(parent: &ctx.span, bytes = bytes, "Downloaded resource");
            }
            Err(DownloadError::Unauthorized(status)) => {
                metrics::counter!("wps_downloads_total", "outcome" => "unauthorized").increment(1);
                warn!(parent: &ctx.span, status = status, "Download refused");
                return Err(ProcessError::AuthenticationRequired);
            }
            Err(e) => {
                metrics::counter!("wps_downloads_total", "outcome" => "failed").increment(1);
                warn!(parent: &ctx.span, error = %e, "Download failed");
                return Err(ProcessError::DownloadFailed(e.to_string()));
            }
        }

        let local = target.to_string_lossy().into_owned();
        if let Err(e) = self.probe.open(&local).await {
            warn!(parent: &ctx.span, error = %e, "Downloaded copy does not open");
            return Err(ProcessError::DownloadFailed(e.to_string()));
        }

        Ok(Materialized::Downloaded { path: target })
    }
}
