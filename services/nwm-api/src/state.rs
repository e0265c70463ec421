//! Application state for the NWM API.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use warehouse::{BigQueryConfig, BigQueryWarehouse, Warehouse};

use crate::config::ApiConfig;
use crate::hydroshare::{ComidResolver, HydroShareClient};

/// Source of "now" for default time windows.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared application state.
pub struct AppState {
    pub config: Arc<ApiConfig>,

    /// Executes rendered queries.
    pub warehouse: Arc<dyn Warehouse>,

    /// Resolves HydroShare resource IDs into reach IDs.
    pub resolver: Arc<dyn ComidResolver>,

    pub clock: Clock,

    /// Prometheus handle; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        config: ApiConfig,
        warehouse: Arc<dyn Warehouse>,
        resolver: Arc<dyn ComidResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            warehouse,
            resolver,
            clock: Arc::new(Utc::now),
            metrics: None,
        }
    }

    /// Build the production collaborators (BigQuery, HydroShare) from config.
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let project = config
            .bigquery
            .project
            .clone()
            .filter(|p| !p.trim().is_empty())
            .context("A BigQuery project is required (set NWM_BIGQUERY_PROJECT)")?;

        let warehouse = BigQueryWarehouse::new(BigQueryConfig {
            endpoint: config.bigquery.endpoint.clone(),
            project,
            access_token: config.bigquery.access_token.clone(),
            location: config.bigquery.location.clone(),
            timeout: config.upstream_timeout(),
        })
        .context("Failed to create BigQuery client")?;

        let resolver =
            HydroShareClient::new(
                config.hydroshare_url_template.clone(),
                config.upstream_timeout(),
                config.hydroshare_max_bytes,
            )?;

        Ok(Self::new(config, Arc::new(warehouse), Arc::new(resolver)))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
