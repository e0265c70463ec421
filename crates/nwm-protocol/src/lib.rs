//! National Water Model data API protocol.
//!
//! I/O-free core of the NWM API: request parameters are parsed into domain
//! types, resolved into one of a fixed set of warehouse query templates, and
//! the resulting rows are projected into canonical records and serialized as
//! JSON or CSV.
//!
//! # Example
//!
//! ```rust
//! use nwm_protocol::{format, project, OutputFormat, Value, WarehouseRow};
//!
//! let rows = vec![WarehouseRow::new(vec![
//!     ("feature_id".to_string(), Value::Int(101)),
//!     ("return_period_10".to_string(), Value::Float(42.5)),
//! ])];
//!
//! let payload = format(&project(rows), OutputFormat::Csv).unwrap();
//! assert_eq!(payload.body, b"feature_id,return_period_10\n101,42.5\n");
//! ```

pub mod errors;
pub mod formatter;
pub mod identifiers;
pub mod queries;
pub mod records;
pub mod responses;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use errors::{ApiError, ApiResult, ErrorKind};
pub use formatter::{format, Payload};
pub use identifiers::{GeometrySelector, IdentifierSource, ResourceToken};
pub use queries::{GeometryQuery, QueryTemplate, TableConfig};
pub use records::{project, Record, Value, WarehouseRow};
pub use responses::ExceptionResponse;
pub use time::TimeWindow;
pub use types::{
    Coordinates, EnsembleSelector, ForecastType, IdentifierSet, OutputFormat, ReachId,
    ReturnPeriod, RunOffset,
};

/// Media types produced by the API.
pub mod media_types {
    pub const JSON: &str = "application/json";
    pub const CSV: &str = "text/csv";
    pub const HTML: &str = "text/html; charset=utf-8";
}

/// Problem type identifiers carried in [`ExceptionResponse::type_`].
pub mod problem_types {
    pub const INVALID_PARAMETER: &str = "urn:nwm-api:problem:invalid-parameter";
    pub const UPSTREAM_ERROR: &str = "urn:nwm-api:problem:upstream-error";
    pub const GATEWAY_TIMEOUT: &str = "urn:nwm-api:problem:gateway-timeout";
}
