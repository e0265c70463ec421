use std::sync::Mutex;

use async_trait::async_trait;
use nwm_protocol::WarehouseRow;
use warehouse::{Result, Warehouse, WarehouseError};

enum Reply {
    Rows(Vec<WarehouseRow>),
    Reject(String),
    TimedOut(u64),
}

/// In-memory warehouse fake.
///
/// Rules are checked in insertion order; the first whose needle occurs in the
/// SQL decides the reply. Queries matching no rule return zero rows.
#[derive(Default)]
pub struct RecordingWarehouse {
    rules: Vec<(String, Reply)>,
    queries: Mutex<Vec<String>>,
}

impl RecordingWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle` with `rows`.
    pub fn on(mut self, needle: impl Into<String>, rows: Vec<WarehouseRow>) -> Self {
        self.rules.push((needle.into(), Reply::Rows(rows)));
        self
    }

    /// Fail queries containing `needle` as a rejected query.
    pub fn reject(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Reject(message.into())));
        self
    }

    /// Fail queries containing `needle` as if the job outlived its budget.
    pub fn time_out(mut self, needle: impl Into<String>, secs: u64) -> Self {
        self.rules.push((needle.into(), Reply::TimedOut(secs)));
        self
    }

    /// Every SQL string received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn query(&self, sql: &str) -> Result<Vec<WarehouseRow>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(sql.to_string());
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, reply)| reply);

        match reply {
            Some(Reply::Rows(rows)) => Ok(rows.clone()),
            Some(Reply::Reject(message)) => Err(WarehouseError::Rejected {
                status: 400,
                message: message.clone(),
            }),
            Some(Reply::TimedOut(secs)) => Err(WarehouseError::Timeout(*secs)),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
