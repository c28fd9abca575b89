//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::agent::AgentRelay;
use crate::clients::{ComfyUiClient, ImageGenerator, LanguageModel, OllamaClient};
use crate::config::Config;
use crate::db::{AssetRepository, ConversationRepository, Database};
use crate::events::Broadcaster;
use crate::generation::{GenerationPipeline, PipelineSettings, WorkflowNodes};
use crate::integration::{Integrator, ProjectSettings};

/// Everything a request handler needs, shared behind an `Arc`
pub struct AppState {
    pub db: Database,
    pub assets: AssetRepository,
    pub conversations: ConversationRepository,
    pub relay: AgentRelay,
    pub llm: Arc<dyn LanguageModel>,
    pub generator: Arc<dyn ImageGenerator>,
    pub pipeline: GenerationPipeline,
    pub integrator: Integrator,
    pub broadcaster: Broadcaster,
    pub paths: StaticPaths,
}

/// Directories exposed over HTTP
#[derive(Debug, Clone)]
pub struct StaticPaths {
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
    pub project_assets_dir: PathBuf,
}

impl AppState {
    /// Wire up state against the real Ollama and ComfyUI services
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(OllamaClient::from_config(&config.ollama));
        let generator: Arc<dyn ImageGenerator> =
            Arc::new(ComfyUiClient::from_config(&config.comfyui));

        let pipeline_settings = PipelineSettings {
            workflows_dir: config.workflows_dir()?,
            default_template: config.generation.default_template.clone(),
            nodes: WorkflowNodes::from(&config.generation),
            poll_interval: config.generation.poll_interval(),
            timeout: config.generation.timeout(),
        };

        let project_root = config.project_root()?;
        let project_settings = ProjectSettings {
            output_dir: config.comfyui_output_path()?,
            gbs_cli_path: config.project.gbs_cli_path.clone(),
            emulator_path: config.project.emulator_path.clone(),
            project_root,
        };

        let paths = StaticPaths {
            static_dir: config.static_dir()?,
            output_dir: project_settings.output_dir.clone(),
            project_assets_dir: project_settings.project_root.join("assets"),
        };

        Ok(Self::with_backends(
            db,
            llm,
            generator,
            pipeline_settings,
            project_settings,
            paths,
        ))
    }

    /// Wire up state with explicit backends
    pub fn with_backends(
        db: Database,
        llm: Arc<dyn LanguageModel>,
        generator: Arc<dyn ImageGenerator>,
        pipeline_settings: PipelineSettings,
        project_settings: ProjectSettings,
        paths: StaticPaths,
    ) -> Self {
        let broadcaster = Broadcaster::new();
        let assets = AssetRepository::new(db.clone());
        let conversations = ConversationRepository::new(db.clone());

        Self {
            relay: AgentRelay::new(llm.clone(), conversations.clone()),
            pipeline: GenerationPipeline::new(
                generator.clone(),
                assets.clone(),
                broadcaster.clone(),
                pipeline_settings,
            ),
            integrator: Integrator::new(assets.clone(), broadcaster.clone(), project_settings),
            llm,
            generator,
            db,
            assets,
            conversations,
            broadcaster,
            paths,
        }
    }
}
