//! WPS API Service Library
//!
//! HTTP server exposing NetCDF polygon operations (polygon subsetting and
//! spatial weighted averaging) through a WPS 1.0.0 KVP endpoint.

pub mod compute;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod execution;
pub mod geometry;
pub mod handlers;
pub mod materialize;
pub mod outputs;
pub mod processes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_server;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let outputs = ServeDir::new(&state.config.output_path);

    Router::new()
        .route("/wps", get(handlers::wps::wps_handler))
        .route("/wps/", get(handlers::wps::wps_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Produced files and status documents
        .nest_service("/outputs", outputs)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
