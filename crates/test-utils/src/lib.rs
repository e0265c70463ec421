//! Shared test utilities for the NWM API workspace.
//!
//! This crate provides:
//! - [`RecordingWarehouse`], an in-memory [`warehouse::Warehouse`] that
//!   answers by SQL substring and records every query it receives
//! - Row fixtures shaped like the NWM BigQuery tables
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then in a test:
//!
//! ```ignore
//! use test_utils::{fixtures, RecordingWarehouse};
//!
//! let warehouse = RecordingWarehouse::new()
//!     .on("MAX(reference_time)", vec![fixtures::latest_reference_time(fixtures::ts(2023, 11, 25, 6))]);
//! ```

pub mod fixtures;
mod recording;

pub use recording::RecordingWarehouse;
