//! Response plumbing shared by the data endpoints.

use axum::{
    extract::rejection::QueryRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use nwm_protocol::{media_types, ApiError, ApiResult, ErrorKind, ExceptionResponse, Payload};

use crate::metrics::{record_request, Timer};

/// HTTP adapter for [`ApiError`].
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        HttpError(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.0.to_exception())
    }
}

/// Serialize an exception body with the given status.
pub fn error_response(status: StatusCode, exc: ExceptionResponse) -> Response {
    let json = serde_json::to_string(&exc).unwrap_or_default();
    (status, [(header::CONTENT_TYPE, media_types::JSON)], json).into_response()
}

/// Malformed query strings get the same body as any other bad parameter.
pub fn query_rejected(rejection: QueryRejection) -> ApiError {
    ApiError::invalid("query", rejection.body_text())
}

/// Finish a data request: log, count and render the outcome.
pub fn respond(endpoint: &'static str, timer: &Timer, result: ApiResult<Payload>) -> Response {
    let response = match result {
        Ok(payload) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, payload.content_type)],
            payload.body,
        )
            .into_response(),
        Err(err) => {
            match err.kind() {
                ErrorKind::Input => {
                    warn!(endpoint, error = %err, label = err.label(), "Rejected request")
                }
                ErrorKind::Upstream => {
                    error!(endpoint, error = %err, label = err.label(), "Request failed")
                }
            }
            HttpError(err).into_response()
        }
    };

    record_request(endpoint, response.status().as_u16(), timer.elapsed());
    response
}

/// Treat blank query values as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
