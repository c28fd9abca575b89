//! Asset generation pipeline

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::workflow::{output_filename, WorkflowNodes, WorkflowTemplate};
use crate::clients::ImageGenerator;
use crate::db::{AssetRepository, AssetType, PLACEHOLDER_SOURCE};
use crate::events::{Broadcaster, StatusEvent, TaskStatus};

/// Settings for one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workflows_dir: PathBuf,
    pub default_template: String,
    pub nodes: WorkflowNodes,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("workflows"),
            default_template: "workflow_pixel_art".to_string(),
            nodes: WorkflowNodes::default(),
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub task_name: String,
    pub asset_type: AssetType,
    /// Template id; the pipeline default when `None`
    pub template: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, task_name: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: String::new(),
            task_name: task_name.into(),
            asset_type,
            template: None,
        }
    }
}

/// Result of a finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub asset_id: i64,
    pub filename: String,
    pub image_url: String,
}

#[derive(Clone)]
pub struct GenerationPipeline {
    generator: Arc<dyn ImageGenerator>,
    assets: AssetRepository,
    broadcaster: Broadcaster,
    settings: PipelineSettings,
}

impl GenerationPipeline {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        assets: AssetRepository,
        broadcaster: Broadcaster,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            assets,
            broadcaster,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the job in the background; progress is only visible through the
    /// broadcaster.
    pub fn dispatch(&self, request: GenerationRequest) -> JoinHandle<Option<GenerationOutcome>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(request).await.ok() })
    }

    /// Run the job to completion or failure, emitting status events
    /// throughout. Every failure is also broadcast as an `ERROR` event.
    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        let name = request.task_name.clone();
        self.broadcaster.broadcast(StatusEvent::queued(&name));

        let mut asset_id = None;
        let result = self.execute(&request, &mut asset_id).await;

        match &result {
            Ok(outcome) => {
                info!("Generation task '{}' completed: {}", name, outcome.filename);
                self.broadcaster.broadcast(StatusEvent::completed(
                    &name,
                    outcome.asset_id,
                    outcome.image_url.clone(),
                ));
            }
            Err(e) => {
                error!("Generation task '{}' failed: {:#}", name, e);
                self.broadcaster
                    .broadcast(StatusEvent::error(&name, asset_id, format!("{:#}", e)));
            }
        }

        result
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        asset_id: &mut Option<i64>,
    ) -> Result<GenerationOutcome> {
        let asset = self
            .assets
            .create(
                &request.task_name,
                request.asset_type,
                &request.prompt,
                PLACEHOLDER_SOURCE,
            )
            .await
            .context("Failed to log asset creation in the database")?;
        *asset_id = Some(asset.id);

        self.broadcaster.broadcast(StatusEvent::update(
            &request.task_name,
            TaskStatus::Generating,
            asset.id,
        ));

        let template_id = request
            .template
            .as_deref()
            .unwrap_or(&self.settings.default_template);
        let mut workflow = WorkflowTemplate::load(&self.settings.workflows_dir, template_id).await?;
        workflow.inject_prompts(&self.settings.nodes, &request.prompt, &request.negative_prompt)?;

        let job_id = self.generator.submit(&workflow.graph).await?;
        let filename = self.poll_for_result(&job_id).await?;

        self.assets.set_source_path(asset.id, &filename).await?;

        Ok(GenerationOutcome {
            asset_id: asset.id,
            image_url: format!("/output/{}", filename),
            filename,
        })
    }

    /// Poll the history endpoint at a fixed interval until the output node
    /// reports an image or the timeout elapses.
    async fn poll_for_result(&self, job_id: &str) -> Result<String> {
        let deadline = Instant::now() + self.settings.timeout;
        let output_node = &self.settings.nodes.output;

        while Instant::now() < deadline {
            if let Some(entry) = self.generator.history(job_id).await? {
                if let Some(filename) = output_filename(&entry, output_node) {
                    return Ok(filename);
                }
            }
            debug!("Job {} not finished, polling again", job_id);
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        anyhow::bail!(
            "Polling for generation result timed out after {}s",
            self.settings.timeout.as_secs()
        )
    }
}
