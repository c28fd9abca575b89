//! ComfyUI HTTP API client

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::clients::provider::ImageGenerator;
use crate::config::ComfyUiConfig;

/// ComfyUI API client
pub struct ComfyUiClient {
    client: Client,
    base_url: String,
    client_id: String,
}

#[derive(Debug, Serialize)]
struct QueuePromptRequest<'a> {
    prompt: &'a Value,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct QueuePromptResponse {
    pub prompt_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ComfyUiClient {
    /// Create a new ComfyUI client with timeouts
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn from_config(config: &ComfyUiConfig) -> Self {
        Self::new(config.api_url.clone(), config.client_id.clone())
    }
}

#[async_trait]
impl ImageGenerator for ComfyUiClient {
    async fn submit(&self, workflow: &Value) -> Result<String> {
        let url = format!("{}/prompt", self.base_url);

        let request = QueuePromptRequest {
            prompt: workflow,
            client_id: &self.client_id,
        };

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("ComfyUI HTTP error: {}", e);
                return Err(e).context("Failed to connect to ComfyUI server");
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("ComfyUI rejected prompt: {} - {}", status, body);
        }

        let result: QueuePromptResponse = response
            .json()
            .await
            .context("Failed to parse ComfyUI response")?;

        match result.prompt_id {
            Some(id) if !id.is_empty() => {
                info!("Prompt queued with ComfyUI: {}", id);
                Ok(id)
            }
            _ => anyhow::bail!(
                "ComfyUI did not return a prompt_id. Response: {}",
                Value::Object(result.extra)
            ),
        }
    }

    async fn history(&self, job_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/history/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to poll ComfyUI history")?;

        // Anything but 200 means the job is not visible yet
        if !response.status().is_success() {
            debug!("ComfyUI history for {} returned {}", job_id, response.status());
            return Ok(None);
        }

        let mut body: Value = response
            .json()
            .await
            .context("Failed to parse ComfyUI history")?;

        Ok(body.get_mut(job_id).map(Value::take))
    }

    /// Check if ComfyUI server is running
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/system_stats", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("ComfyUI health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
