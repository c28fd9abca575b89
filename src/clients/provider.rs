//! Backend traits for the language model and image generator

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Text-generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Request a single non-streamed completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Node-graph image generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Queue a workflow graph and return the backend's job id
    async fn submit(&self, workflow: &Value) -> Result<String>;

    /// History entry for a job, or `None` while it is not available yet
    async fn history(&self, job_id: &str) -> Result<Option<Value>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
