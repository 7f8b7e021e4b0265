//! Process execution errors.

use thiserror::Error;
use wps_protocol::{ExceptionCode, WpsError};

/// Result type for process execution.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors raised while executing a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The dataset server refused access. Never retried.
    #[error("Authentication required.")]
    AuthenticationRequired,

    /// The resource could not be opened directly, and the downloaded copy
    /// could not be fetched or opened either.
    #[error("Failed to download and open file: {0}")]
    DownloadFailed(String),

    /// A required input is absent and declares no default.
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// The feature service failed to produce a geometry.
    #[error("Geometry request failed: {0}")]
    Geometry(String),

    /// The computation backend failed.
    #[error("Computation failed: {0}")]
    Compute(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// OWS exception code reported for this failure.
    pub fn exception_code(&self) -> ExceptionCode {
        match self {
            ProcessError::MissingInput(_) => ExceptionCode::MissingParameterValue,
            _ => ExceptionCode::NoApplicableCode,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::AuthenticationRequired => "authentication_required",
            ProcessError::DownloadFailed(_) => "download_failed",
            ProcessError::MissingInput(_) => "missing_input",
            ProcessError::Geometry(_) => "geometry",
            ProcessError::Compute(_) => "compute",
            ProcessError::Io(_) => "io",
        }
    }
}

impl From<ProcessError> for WpsError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::MissingInput(name) => WpsError::MissingParameter(name),
            other => WpsError::ExecutionFailed(other.to_string()),
        }
    }
}
