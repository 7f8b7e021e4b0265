//! WPS error types and the OWS exception report.

use quick_xml::escape::escape;
use thiserror::Error;

use crate::namespaces;

/// Result type alias using WpsError.
pub type WpsResult<T> = Result<T, WpsError>;

/// OWS exception codes defined for WPS 1.0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    MissingParameterValue,
    InvalidParameterValue,
    OperationNotSupported,
    VersionNegotiationFailed,
    NoApplicableCode,
}

impl ExceptionCode {
    /// The code as written in the `exceptionCode` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionCode::MissingParameterValue => "MissingParameterValue",
            ExceptionCode::InvalidParameterValue => "InvalidParameterValue",
            ExceptionCode::OperationNotSupported => "OperationNotSupported",
            ExceptionCode::VersionNegotiationFailed => "VersionNegotiationFailed",
            ExceptionCode::NoApplicableCode => "NoApplicableCode",
        }
    }
}

/// Errors that can occur while serving a WPS request.
#[derive(Debug, Error)]
pub enum WpsError {
    /// A required parameter is absent.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A parameter has an unusable value.
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// The requested operation is not part of WPS 1.0.0.
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// The requested version is not served.
    #[error("Unsupported version: {0}")]
    VersionNegotiationFailed(String),

    /// No process with this identifier is registered.
    #[error("No such process: {0}")]
    ProcessNotFound(String),

    /// The process failed while executing.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WpsError {
    /// Get the OWS exception code for this error.
    pub fn code(&self) -> ExceptionCode {
        match self {
            WpsError::MissingParameter(_) => ExceptionCode::MissingParameterValue,
            WpsError::InvalidParameter { .. } => ExceptionCode::InvalidParameterValue,
            WpsError::ProcessNotFound(_) => ExceptionCode::InvalidParameterValue,
            WpsError::OperationNotSupported(_) => ExceptionCode::OperationNotSupported,
            WpsError::VersionNegotiationFailed(_) => ExceptionCode::VersionNegotiationFailed,
            WpsError::ExecutionFailed(_) => ExceptionCode::NoApplicableCode,
            WpsError::Internal(_) => ExceptionCode::NoApplicableCode,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self.code() {
            ExceptionCode::NoApplicableCode => 500,
            ExceptionCode::OperationNotSupported => 501,
            _ => 400,
        }
    }

    /// The `locator` attribute for the exception, when one applies.
    pub fn locator(&self) -> Option<&str> {
        match self {
            WpsError::MissingParameter(param) => Some(param),
            WpsError::InvalidParameter { param, .. } => Some(param),
            WpsError::ProcessNotFound(_) => Some("identifier"),
            WpsError::OperationNotSupported(op) => Some(op),
            WpsError::VersionNegotiationFailed(_) => Some("version"),
            _ => None,
        }
    }

    /// Render this error as an OWS ExceptionReport document.
    pub fn to_exception_report(&self) -> String {
        exception_report(self.code(), self.locator(), &self.to_string())
    }
}

/// Generate an OWS 1.1 ExceptionReport XML document.
pub fn exception_report(code: ExceptionCode, locator: Option<&str>, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="{ows}" xmlns:xsi="{xsi}" version="1.0.0" xml:lang="en-US">
  {body}
</ows:ExceptionReport>"#,
        ows = namespaces::OWS,
        xsi = namespaces::XSI,
        body = exception_element(code, locator, message),
    )
}

/// A single `ows:Exception` element, shared with the ProcessFailed status.
pub(crate) fn exception_element(
    code: ExceptionCode,
    locator: Option<&str>,
    message: &str,
) -> String {
    let locator_attr = locator
        .map(|l| format!(r#" locator="{}""#, escape(l)))
        .unwrap_or_default();
    format!(
        r#"<ows:Exception exceptionCode="{}"{}>
    <ows:ExceptionText>{}</ows:ExceptionText>
  </ows:Exception>"#,
        code.as_str(),
        locator_attr,
        escape(message)
    )
}
