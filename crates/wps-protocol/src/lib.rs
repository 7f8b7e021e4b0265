//! OGC Web Processing Service (WPS) Protocol
//!
//! This crate provides the types and documents needed to host processes
//! behind a WPS 1.0.0 endpoint using the KVP (HTTP GET) binding.
//!
//! # Supported Operations
//!
//! - GetCapabilities
//! - DescribeProcess
//! - Execute (synchronous, stored, and stored with status updates)
//!
//! # Example
//!
//! ```rust
//! use wps_protocol::{WpsKvpParams, WpsRequest};
//!
//! let params = WpsKvpParams::from_pairs([
//!     ("service", "WPS"),
//!     ("request", "Execute"),
//!     ("version", "1.0.0"),
//!     ("identifier", "subset_polygon"),
//!     ("DataInputs", "typename=usa:states;featureids=states.4"),
//! ]);
//!
//! let WpsRequest::Execute(execute) = params.into_request().unwrap() else {
//!     panic!("expected an Execute request");
//! };
//! assert_eq!(execute.identifier, "subset_polygon");
//! assert_eq!(execute.values("featureids"), vec!["states.4"]);
//! ```

pub mod errors;
pub mod process;
pub mod request;
pub mod responses;

pub use errors::{ExceptionCode, WpsError, WpsResult};
pub use process::{
    ComplexOutputDescription, Format, LiteralInputDescription, ProcessDescription,
};
pub use request::{
    DataInput, DescribeProcessRequest, ExecuteRequest, GetCapabilitiesRequest, WpsKvpParams,
    WpsRequest,
};
pub use responses::{
    CapabilitiesDocument, ExecuteResponse, ExecutionStatus, OutputReference,
    ProcessDescriptionsDocument,
};

/// WPS protocol version served by this crate.
pub const WPS_VERSION: &str = "1.0.0";

/// Namespace URIs used in WPS 1.0.0 documents.
pub mod namespaces {
    pub const WPS: &str = "http://www.opengis.net/wps/1.0.0";
    pub const OWS: &str = "http://www.opengis.net/ows/1.1";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
}

/// Media types used in WPS responses.
pub mod media_types {
    /// NetCDF media type
    pub const NETCDF: &str = "application/x-netcdf";
    /// XML media type
    pub const XML: &str = "text/xml";
}
