//! NWM API configuration loading and types.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use nwm_protocol::time::DEFAULT_EPOCH;
use nwm_protocol::TableConfig;
use serde::{Deserialize, Serialize};

fn default_start_time() -> String {
    DEFAULT_EPOCH.to_string()
}

fn default_hydroshare_url() -> String {
    "https://www.hydroshare.org/resource/{id}/data/contents/nwm_comids.json".to_string()
}

fn default_hydroshare_max_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bigquery_endpoint() -> String {
    warehouse::bigquery::DEFAULT_ENDPOINT.to_string()
}

/// Process-wide settings, immutable once the server starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Warehouse tables and the latest-cycle canary reach.
    #[serde(default)]
    pub tables: TableConfig,

    /// Start of the analysis-assimilation window when none is given.
    #[serde(default = "default_start_time")]
    pub default_start_time: String,

    /// HydroShare contents URL; `{id}` is replaced by the resource ID.
    #[serde(default = "default_hydroshare_url")]
    pub hydroshare_url_template: String,

    /// Largest HydroShare contents file accepted, in bytes.
    #[serde(default = "default_hydroshare_max_bytes")]
    pub hydroshare_max_bytes: u64,

    /// Budget for each warehouse query and HydroShare fetch.
    #[serde(default = "default_timeout_secs")]
    pub upstream_timeout_secs: u64,

    #[serde(default)]
    pub bigquery: BigQuerySettings,
}

/// BigQuery connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigQuerySettings {
    /// Project billed for queries. Required to serve data.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_bigquery_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub location: Option<String>,

    /// Bearer token; only ever supplied from the environment or CLI.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Default for BigQuerySettings {
    fn default() -> Self {
        Self {
            project: None,
            endpoint: default_bigquery_endpoint(),
            location: None,
            access_token: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            tables: TableConfig::default(),
            default_start_time: default_start_time(),
            hydroshare_url_template: default_hydroshare_url(),
            hydroshare_max_bytes: default_hydroshare_max_bytes(),
            upstream_timeout_secs: default_timeout_secs(),
            bigquery: BigQuerySettings::default(),
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bigquery_project: Option<String>,
    pub bigquery_endpoint: Option<String>,
    pub bigquery_location: Option<String>,
    pub bigquery_token: Option<String>,
    pub hydroshare_url_template: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
}

impl ApiConfig {
    /// Load from a YAML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file does not exist, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse: {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply CLI/environment values on top of the file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(project) = overrides.bigquery_project {
            self.bigquery.project = Some(project);
        }
        if let Some(endpoint) = overrides.bigquery_endpoint {
            self.bigquery.endpoint = endpoint;
        }
        if let Some(location) = overrides.bigquery_location {
            self.bigquery.location = Some(location);
        }
        if let Some(token) = overrides.bigquery_token {
            self.bigquery.access_token = Some(token);
        }
        if let Some(template) = overrides.hydroshare_url_template {
            self.hydroshare_url_template = template;
        }
        if let Some(secs) = overrides.upstream_timeout_secs {
            self.upstream_timeout_secs = secs;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(message) = self.tables.validate() {
            bail!("Invalid tables config: {}", message);
        }
        if !self.hydroshare_url_template.contains("{id}") {
            bail!(
                "hydroshare_url_template must contain an {{id}} placeholder: {}",
                self.hydroshare_url_template
            );
        }
        if self.hydroshare_max_bytes == 0 {
            bail!("hydroshare_max_bytes must be greater than zero");
        }
        if self.upstream_timeout_secs == 0 {
            bail!("upstream_timeout_secs must be greater than zero");
        }
        if self.default_start_time.trim().is_empty() {
            bail!("default_start_time must not be empty");
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
