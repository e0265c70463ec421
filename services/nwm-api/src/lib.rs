//! NWM API Service Library
//!
//! HTTP server for National Water Model forecast, analysis-assimilation,
//! reach geometry and flood return-period data held in BigQuery.

pub mod config;
pub mod handlers;
pub mod hydroshare;
pub mod metrics;
pub mod resolve;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the service router with its middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Documentation
        .route("/", get(handlers::api::root_handler))
        .route("/docs", get(handlers::api::docs_handler))
        .route("/openapi.json", get(handlers::api::openapi_handler))
        // Data
        .route("/forecast", get(handlers::forecast::forecast_handler))
        .route(
            "/forecast-records",
            get(handlers::forecast::forecast_records_handler),
        )
        .route(
            "/analysis-assim",
            get(handlers::analysis_assim::analysis_assim_handler),
        )
        .route("/geometry", get(handlers::geometry::geometry_handler))
        .route(
            "/return-period",
            get(handlers::return_period::return_period_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
