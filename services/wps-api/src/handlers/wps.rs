//! WPS 1.0.0 KVP endpoint.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, warn};
use wps_protocol::{
    media_types, CapabilitiesDocument, DescribeProcessRequest, ProcessDescriptionsDocument,
    WpsError, WpsKvpParams, WpsRequest, WpsResult,
};

use crate::execution;
use crate::state::AppState;

const SERVICE_TITLE: &str = "NetCDF polygon operations";
const SERVICE_ABSTRACT: &str =
    "Polygon subsetting and spatial weighted averaging of NetCDF datasets over WFS features.";
const PROVIDER_NAME: &str = "PAVICS";

/// GET /wps - GetCapabilities, DescribeProcess and Execute
pub async fn wps_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let request = match WpsKvpParams::from_pairs(pairs).into_request() {
        Ok(request) => request,
        Err(e) => return exception_response(&e),
    };

    counter!("wps_requests_total", "request" => request.operation()).increment(1);
    debug!(request = request.operation(), "WPS request");

    let result = match request {
        WpsRequest::GetCapabilities(_) => Ok(capabilities(&state)),
        WpsRequest::DescribeProcess(describe) => describe_process(&state, &describe),
        WpsRequest::Execute(execute) => execution::execute(state.clone(), execute).await,
    };

    match result {
        Ok(xml) => xml_response(StatusCode::OK, xml),
        Err(e) => exception_response(&e),
    }
}

fn capabilities(state: &AppState) -> String {
    CapabilitiesDocument {
        title: SERVICE_TITLE.to_string(),
        abstract_text: SERVICE_ABSTRACT.to_string(),
        provider_name: PROVIDER_NAME.to_string(),
        service_url: state.config.service_url.clone(),
        processes: state.registry.descriptions(),
    }
    .build()
}

fn describe_process(state: &AppState, request: &DescribeProcessRequest) -> WpsResult<String> {
    let descriptions = if request.is_all() {
        state.registry.descriptions()
    } else {
        request
            .identifiers
            .iter()
            .map(|id| {
                state
                    .registry
                    .get(id)
                    .map(|p| p.description().clone())
                    .ok_or_else(|| WpsError::ProcessNotFound(id.clone()))
            })
            .collect::<WpsResult<Vec<_>>>()?
    };

    Ok(ProcessDescriptionsDocument { descriptions }.build())
}

fn exception_response(error: &WpsError) -> Response {
    warn!(code = error.code().as_str(), error = %error, "WPS exception");
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    xml_response(status, error.to_exception_report())
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, media_types::XML)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::processes::test_support::fixture;
    use crate::processes::ProcessRegistry;

    fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture(dir.path(), dir.path());
        let config = ServerConfig {
            geoserver_host: "localhost:8087".to_string(),
            ..ServerConfig::default()
        };
        (dir, AppState::new(config, ProcessRegistry::standard(), fx.env))
    }

    #[test]
    fn test_capabilities_list_both_processes() {
        let (_dir, state) = state();
        let xml = capabilities(&state);

        assert!(xml.contains("spatial_weighted_average"));
        assert!(xml.contains("subset_polygon"));
        assert!(xml.contains("http://localhost:8094/wps"));
    }

    #[test]
    fn test_describe_unknown_process() {
        let (_dir, state) = state();
        let request = DescribeProcessRequest {
            identifiers: vec!["subset_polygon".to_string(), "getpoint".to_string()],
        };

        let err = describe_process(&state, &request).unwrap_err();
        assert!(matches!(err, WpsError::ProcessNotFound(ref id) if id == "getpoint"));
    }

    #[test]
    fn test_describe_all() {
        let (_dir, state) = state();
        let request = DescribeProcessRequest {
            identifiers: vec!["all".to_string()],
        };

        let xml = describe_process(&state, &request).unwrap();
        assert_eq!(xml.matches("<ProcessDescription ").count(), 2);
    }
}
