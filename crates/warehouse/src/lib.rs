//! Warehouse access for the NWM data API.
//!
//! Provides the [`Warehouse`] trait the API executes queries through, and a
//! BigQuery implementation speaking the `jobs.query` REST API.

pub mod bigquery;
pub mod error;

pub use bigquery::{BigQueryConfig, BigQueryWarehouse};
pub use error::{Result, WarehouseError};

use async_trait::async_trait;
use nwm_protocol::WarehouseRow;

/// Executes rendered SQL and returns typed rows in result order.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<WarehouseRow>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
