//! NWM API error types.

use thiserror::Error;

use crate::responses::ExceptionResponse;

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

/// Broad error class, mapped to an HTTP status family by the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied something we cannot act on (HTTP 400).
    Input,
    /// A collaborator (warehouse, HydroShare) failed or misbehaved (HTTP 5xx).
    Upstream,
}

/// Errors that can occur while resolving, querying and formatting a request.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    // === Input errors ===
    /// A parameter was supplied but its value is unusable.
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// None of an accepted set of parameters was supplied.
    #[error("{0}")]
    MissingParameter(String),

    /// Unsupported output format.
    #[error("Unsupported output format '{0}'. Supported formats are JSON and CSV.")]
    UnsupportedFormat(String),

    /// A header-requiring format was asked to serialize zero rows.
    #[error("Cannot derive {0} header from zero rows")]
    EmptyResult(String),

    // === Upstream errors ===
    /// The HydroShare resource could not be fetched or decoded.
    #[error("Error retrieving HydroShare data: {0}")]
    IdentifierResolution(String),

    /// The identifier source resolved to an empty set.
    #[error("No feature IDs found in HydroShare data: {0}")]
    NoIdentifiers(String),

    /// The warehouse rejected or failed to execute a query.
    #[error("Warehouse query failed: {0}")]
    Warehouse(String),

    /// The latest reference time lookup found no forecast cycle.
    #[error("No forecast cycle found in {0} during the last 24 hours")]
    NoReferenceTime(String),

    /// An external call exceeded its time budget.
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for an [`ApiError::InvalidParameter`].
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Error class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidParameter { .. }
            | ApiError::MissingParameter(_)
            | ApiError::UnsupportedFormat(_)
            | ApiError::EmptyResult(_) => ErrorKind::Input,

            ApiError::IdentifierResolution(_)
            | ApiError::NoIdentifiers(_)
            | ApiError::Warehouse(_)
            | ApiError::NoReferenceTime(_)
            | ApiError::Timeout(_)
            | ApiError::Internal(_) => ErrorKind::Upstream,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Timeout(_) => 504,
            _ => match self.kind() {
                ErrorKind::Input => 400,
                ErrorKind::Upstream => 500,
            },
        }
    }

    /// Short machine-readable label, used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "invalid_parameter",
            ApiError::MissingParameter(_) => "missing_parameter",
            ApiError::UnsupportedFormat(_) => "unsupported_format",
            ApiError::EmptyResult(_) => "empty_result",
            ApiError::IdentifierResolution(_) => "identifier_resolution",
            ApiError::NoIdentifiers(_) => "no_identifiers",
            ApiError::Warehouse(_) => "warehouse",
            ApiError::NoReferenceTime(_) => "no_reference_time",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        let detail = self.to_string();
        match self.status_code() {
            400 => ExceptionResponse::bad_request(detail),
            504 => ExceptionResponse::gateway_timeout(detail),
            _ => ExceptionResponse::internal_error(detail),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}
