//! HydroShare identifier resolution.
//!
//! A HydroShare resource can publish `nwm_comids.json`, a list of the reaches
//! a study covers. Requests carrying `hydroshare_id` resolve their reach IDs
//! through it instead of listing them directly.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};

use nwm_protocol::identifiers::parse_comid_document;
use nwm_protocol::{ApiError, ApiResult, IdentifierSet, ResourceToken};

/// Resolves a resource token into reach identifiers.
#[async_trait]
pub trait ComidResolver: Send + Sync {
    async fn resolve(&self, token: &ResourceToken) -> ApiResult<IdentifierSet>;
}

/// [`ComidResolver`] that fetches the resource's contents file over HTTP.
pub struct HydroShareClient {
    client: Client,
    url_template: String,
    timeout: Duration,
    max_bytes: u64,
}

impl HydroShareClient {
    /// `max_bytes` caps the contents file; larger bodies fail resolution.
    pub fn new(url_template: impl Into<String>, timeout: Duration, max_bytes: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .pool_max_idle_per_host(4)
            .build()
            .context("Failed to create HydroShare HTTP client")?;

        Ok(Self {
            client,
            url_template: url_template.into(),
            timeout,
            max_bytes,
        })
    }

    pub fn resource_url(&self, token: &ResourceToken) -> String {
        self.url_template.replace("{id}", token.as_str())
    }

    fn request_error(&self, token: &ResourceToken, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(format!(
                "HydroShare resource {} after {}s",
                token.as_str(),
                self.timeout.as_secs()
            ))
        } else {
            ApiError::IdentifierResolution(format!("resource {}: {}", token.as_str(), err))
        }
    }

    fn oversized(&self, token: &ResourceToken) -> ApiError {
        warn!(limit = self.max_bytes, "HydroShare contents file too large");
        ApiError::IdentifierResolution(format!(
            "resource {}: contents exceed {} bytes",
            token.as_str(),
            self.max_bytes
        ))
    }

    /// Read the body in chunks, stopping once it passes `max_bytes`.
    async fn read_body(&self, token: &ResourceToken, mut response: Response) -> ApiResult<Vec<u8>> {
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(self.oversized(token));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(token, e))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.oversized(token));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl ComidResolver for HydroShareClient {
    #[instrument(skip(self), fields(resource = %token.as_str()))]
    async fn resolve(&self, token: &ResourceToken) -> ApiResult<IdentifierSet> {
        let url = self.resource_url(token);
        debug!(url = %url, "Fetching HydroShare comids");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.request_error(token, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "HydroShare returned an error status");
            return Err(ApiError::IdentifierResolution(format!(
                "resource {}: HTTP {}",
                token.as_str(),
                status
            )));
        }

        let body = self.read_body(token, response).await?;

        let ids = parse_comid_document(token, &body)?;
        debug!(count = ids.len(), "Resolved HydroShare comids");
        Ok(ids)
    }
}
