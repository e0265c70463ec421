//! Error types for warehouse access.

use nwm_protocol::ApiError;
use thiserror::Error;

/// Result type alias using WarehouseError.
pub type Result<T> = std::result::Result<T, WarehouseError>;

#[derive(Debug, Error)]
pub enum WarehouseError {
    // === Transport ===
    #[error("Request to warehouse failed: {0}")]
    Transport(String),

    #[error("Warehouse query timed out after {0}s")]
    Timeout(u64),

    // === Service ===
    #[error("Warehouse rejected the query ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Query job did not complete: {0}")]
    Incomplete(String),

    // === Decoding ===
    #[error("Failed to decode warehouse response: {0}")]
    Decode(String),
}

impl WarehouseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WarehouseError::Timeout(_))
    }
}

impl From<reqwest::Error> for WarehouseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WarehouseError::Decode(err.to_string())
        } else {
            WarehouseError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::Decode(format!("JSON error: {}", err))
    }
}

impl From<WarehouseError> for ApiError {
    fn from(err: WarehouseError) -> Self {
        match err {
            WarehouseError::Timeout(_) => ApiError::Timeout(err.to_string()),
            other => ApiError::Warehouse(other.to_string()),
        }
    }
}
