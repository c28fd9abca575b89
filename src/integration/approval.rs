//! Human-triggered approval and integration of generated assets

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::descriptor::{add_asset_to_project, DescriptorError, DescriptorOutcome};
use super::project::{compile_project, launch_emulator, move_asset, IntegrationError};
use crate::db::{Asset, AssetError, AssetRepository, AssetStatus, AssetType};
use crate::events::{Broadcaster, StatusEvent, TaskStatus};

#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub project_root: PathBuf,
    /// Where the image generator writes its files
    pub output_dir: PathBuf,
    pub gbs_cli_path: String,
    pub emulator_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Asset not found in database: {0}")]
    NotFound(i64),

    #[error("Asset {0} has no source path to move")]
    NoSource(i64),

    #[error("Asset {id} is {status}, expected {expected}")]
    InvalidState {
        id: i64,
        status: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("Failed to update project file: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<anyhow::Error> for ApprovalError {
    fn from(e: anyhow::Error) -> Self {
        ApprovalError::Database(format!("{:#}", e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    pub moved_assets: Vec<String>,
    pub descriptor_records: usize,
    pub rom_path: PathBuf,
}

#[derive(Clone)]
pub struct Integrator {
    assets: AssetRepository,
    broadcaster: Broadcaster,
    settings: ProjectSettings,
}

impl Integrator {
    pub fn new(assets: AssetRepository, broadcaster: Broadcaster, settings: ProjectSettings) -> Self {
        Self {
            assets,
            broadcaster,
            settings,
        }
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Approve a generated asset: move its file into the project and mark it
    /// `approved`. Assets without a real source file are rejected before
    /// anything on disk changes.
    pub async fn approve(
        &self,
        asset_id: i64,
        requested_type: Option<AssetType>,
    ) -> Result<Asset, ApprovalError> {
        let mut asset = self
            .assets
            .get(asset_id)
            .await?
            .ok_or(ApprovalError::NotFound(asset_id))?;

        if !asset.has_source() {
            return Err(ApprovalError::NoSource(asset_id));
        }

        if !asset.status.can_transition_to(AssetStatus::Approved) {
            return Err(ApprovalError::InvalidState {
                id: asset_id,
                status: asset.status.as_str(),
                expected: AssetStatus::Generated.as_str(),
            });
        }

        if let Some(requested) = requested_type.filter(|t| *t != asset.asset_type) {
            warn!(
                "Approval for asset {} requested type '{}', using stored type '{}'",
                asset_id,
                requested.as_str(),
                asset.asset_type.as_str()
            );
        }

        // file moves and descriptor edits run on the blocking pool
        let source = self.source_file(&asset);
        let project_root = self.settings.project_root.clone();
        let asset_type = asset.asset_type;
        tokio::task::spawn_blocking(move || move_asset(&source, asset_type, &project_root))
            .await??;

        self.assets.update_status(asset_id, AssetStatus::Approved).await?;
        asset.status = AssetStatus::Approved;

        self.broadcaster.broadcast(StatusEvent::update(
            &asset.task_name,
            TaskStatus::Approved,
            asset_id,
        ));

        info!("Asset {} approved and moved", asset_id);
        Ok(asset)
    }

    /// Register every approved asset in the project descriptor, build the
    /// ROM and open it in the emulator. The first failing step aborts the
    /// rest; completed steps are not rolled back.
    pub async fn integrate_and_playtest(&self) -> Result<IntegrationReport, ApprovalError> {
        let approved = self.assets.approved().await?;
        let mut moved_assets = Vec::with_capacity(approved.len());
        let mut descriptor_records = 0;

        for asset in approved {
            let file = self.project_file(&asset);
            let project_root = self.settings.project_root.clone();
            let asset_type = asset.asset_type;
            let name = asset.task_name.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                add_asset_to_project(&project_root, &file, asset_type, &name)
            })
            .await??;

            match outcome {
                DescriptorOutcome::Added { .. } => descriptor_records += 1,
                DescriptorOutcome::Skipped => {}
            }

            self.assets
                .update_status(asset.id, AssetStatus::Integrated)
                .await?;
            self.broadcaster.broadcast(StatusEvent::update(
                &asset.task_name,
                TaskStatus::Integrated,
                asset.id,
            ));
            moved_assets.push(asset.task_name);
        }

        let rom_path =
            compile_project(&self.settings.project_root, &self.settings.gbs_cli_path).await?;
        launch_emulator(&rom_path, &self.settings.emulator_path)?;

        Ok(IntegrationReport {
            moved_assets,
            descriptor_records,
            rom_path,
        })
    }

    fn source_file(&self, asset: &Asset) -> PathBuf {
        self.settings
            .output_dir
            .join(asset.source_path.as_deref().unwrap_or_default())
    }

    /// Location of an approved asset's file inside the project
    fn project_file(&self, asset: &Asset) -> PathBuf {
        let name = Path::new(asset.source_path.as_deref().unwrap_or_default())
            .file_name()
            .map(|f| f.to_os_string())
            .unwrap_or_default();
        let folder = asset.asset_type.project_subfolder().unwrap_or_default();
        self.settings.project_root.join(folder).join(name)
    }
}
