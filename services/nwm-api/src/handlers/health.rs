//! Health, readiness and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use nwm_protocol::queries::PROBE_QUERY;
use nwm_protocol::responses::{ProbeStatus, ReadinessReport};
use nwm_protocol::media_types;

use crate::metrics::Timer;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Liveness check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Readiness check (runs a trivial warehouse query)
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let timer = Timer::start();
    let result = state.warehouse.query(PROBE_QUERY).await;
    let latency_ms = timer.elapsed().as_millis() as u64;

    let probe = match result {
        Ok(_) => ProbeStatus {
            ok: true,
            latency_ms,
            error: None,
        },
        Err(e) => {
            warn!(warehouse = state.warehouse.name(), error = %e, "Readiness probe failed");
            ProbeStatus {
                ok: false,
                latency_ms,
                error: Some(e.to_string()),
            }
        }
    };

    let report = ReadinessReport::from_probe(probe);
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let json = serde_json::to_string(&report).unwrap_or_default();
    (status, [(header::CONTENT_TYPE, media_types::JSON)], json).into_response()
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "ok");
    }
}
