//! HTTP request handlers for the NWM API.

pub mod analysis_assim;
pub mod api;
pub mod common;
pub mod forecast;
pub mod geometry;
pub mod health;
pub mod return_period;
