//! Response bodies shared by every endpoint.

use serde::{Deserialize, Serialize};

use crate::problem_types;

/// Problem-details style error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Problem type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Human-readable explanation, safe to show to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Request path that produced the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ExceptionResponse {
    pub fn new(type_: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            title: None,
            status: Some(status),
            detail: Some(detail.into()),
            instance: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// 400 Bad Request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(problem_types::INVALID_PARAMETER, 400, detail).with_title("Bad Request")
    }

    /// 500 Internal Server Error.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(problem_types::UPSTREAM_ERROR, 500, detail)
            .with_title("Internal Server Error")
    }

    /// 504 Gateway Timeout.
    pub fn gateway_timeout(detail: impl Into<String>) -> Self {
        Self::new(problem_types::GATEWAY_TIMEOUT, 504, detail).with_title("Gateway Timeout")
    }
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessReport {
    pub ready: bool,
    pub warehouse: ProbeStatus,
}

/// Outcome of a single dependency probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeStatus {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadinessReport {
    pub fn from_probe(probe: ProbeStatus) -> Self {
        Self {
            ready: probe.ok,
            warehouse: probe,
        }
    }
}
