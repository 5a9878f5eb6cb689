//! Remote background removal over HTTP
//!
//! Posts `{"image": "<uri>"}` to the configured endpoint and expects
//! `{"processed_image": "<uri>"}` back.

use crate::{
    config::WorkflowConfig,
    error::{BackZapError, Result},
    removal::{BackgroundRemovalService, RemovalOutput},
    types::ImageRef,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct RemovalRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemovalResponse {
    processed_image: String,
}

/// HTTP client for a remote segmentation service
#[derive(Debug, Clone)]
pub struct RemoteRemovalService {
    client: Client,
    endpoint: String,
}

impl RemoteRemovalService {
    /// # Errors
    /// - Endpoint that is not an http(s) URL
    /// - HTTP client construction failures
    pub fn new<S: Into<String>>(endpoint: S, timeout: Option<std::time::Duration>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(BackZapError::invalid_config(format!(
                "Remote endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }

        let mut builder = Client::builder().user_agent(concat!("backzap/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// # Errors
    /// - No endpoint configured
    /// - See [`RemoteRemovalService::new`]
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let endpoint = config
            .remote_endpoint
            .clone()
            .ok_or_else(|| BackZapError::invalid_config("No remote endpoint configured"))?;
        Self::new(endpoint, config.removal_timeout())
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BackgroundRemovalService for RemoteRemovalService {
    async fn remove(&self, image: &ImageRef) -> Result<RemovalOutput> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemovalRequest { image: image.uri() })
            .send()
            .await
            .map_err(|e| BackZapError::removal(format!("Request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackZapError::removal(format!(
                "HTTP error {} from {}",
                status, self.endpoint
            )));
        }

        let body: RemovalResponse = response
            .json()
            .await
            .map_err(|e| BackZapError::removal(format!("Malformed response from {}: {}", self.endpoint, e)))?;

        if body.processed_image.is_empty() {
            return Err(BackZapError::removal("Service returned an empty processed image"));
        }
        Ok(RemovalOutput::new(ImageRef::new(body.processed_image)))
    }

    fn name(&self) -> &str {
        "remote"
    }
}
