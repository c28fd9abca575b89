//! Moving files into the GB Studio project and driving external tools

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::db::AssetType;

/// ROM written by `build --destination build/web`
pub const ROM_RELATIVE_PATH: &str = "build/web/game.gb";

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("Source file not found at {0:?}")]
    SourceMissing(PathBuf),

    #[error("Asset type '{0}' has no project folder")]
    UnsupportedType(&'static str),

    #[error("Destination already exists: {0:?}")]
    DestinationExists(PathBuf),

    #[error("Failed to move {from:?} into {to:?}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Tool not found: {0}")]
    ToolMissing(String),

    #[error("GB Studio build failed: {0}")]
    BuildFailed(String),

    #[error("ROM not found at {0:?}")]
    RomMissing(PathBuf),

    #[error("Failed to launch emulator: {0}")]
    LaunchFailed(String),
}

/// Move `source` into the type-specific asset folder of `project_root`.
///
/// Nothing under `project_root` is touched unless the source exists, the
/// type has a folder and no file of the same name is already there.
pub fn move_asset(
    source: &Path,
    asset_type: AssetType,
    project_root: &Path,
) -> Result<PathBuf, IntegrationError> {
    if !source.is_file() {
        error!("Asset move failed: Source file not found at {:?}", source);
        return Err(IntegrationError::SourceMissing(source.to_path_buf()));
    }

    let subfolder = asset_type
        .project_subfolder()
        .ok_or(IntegrationError::UnsupportedType(asset_type.as_str()))?;
    let destination_dir = project_root.join(subfolder);

    let file_name = source
        .file_name()
        .ok_or_else(|| IntegrationError::SourceMissing(source.to_path_buf()))?;
    let destination = destination_dir.join(file_name);
    if destination.exists() {
        error!("Asset move failed: {:?} already exists", destination);
        return Err(IntegrationError::DestinationExists(destination));
    }

    let move_err = |e: std::io::Error| IntegrationError::Move {
        from: source.to_path_buf(),
        to: destination_dir.clone(),
        source: e,
    };

    std::fs::create_dir_all(&destination_dir).map_err(move_err)?;

    // rename fails across filesystems; fall back to copy + remove
    if std::fs::rename(source, &destination).is_err() {
        std::fs::copy(source, &destination).map_err(move_err)?;
        std::fs::remove_file(source).map_err(move_err)?;
    }

    info!("Moved {:?} to {:?}", source, destination);
    Ok(destination)
}

/// Resolve a configured tool path, falling back to a PATH lookup
pub fn resolve_tool(configured: &str) -> Result<PathBuf, IntegrationError> {
    if configured.trim().is_empty() {
        return Err(IntegrationError::ToolMissing("(not configured)".to_string()));
    }

    let path = Path::new(configured);
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    which::which(configured).map_err(|_| IntegrationError::ToolMissing(configured.to_string()))
}

/// Build the project with the GB Studio CLI and return the ROM path
pub async fn compile_project(project_root: &Path, gbs_cli: &str) -> Result<PathBuf, IntegrationError> {
    let cli = resolve_tool(gbs_cli)?;

    let output = Command::new(&cli)
        .args(["build", "--destination", "build/web"])
        .current_dir(project_root)
        .output()
        .await
        .map_err(|e| IntegrationError::BuildFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!("GB Studio compilation failed: {}", stderr);
        return Err(IntegrationError::BuildFailed(stderr));
    }

    let rom = project_root.join(ROM_RELATIVE_PATH);
    if !rom.exists() {
        return Err(IntegrationError::RomMissing(rom));
    }

    info!("GB Studio project compiled successfully: {:?}", rom);
    Ok(rom)
}

/// Start the emulator on `rom` without waiting for it to exit. The child is
/// reaped by a background task once the emulator closes, so this must run
/// inside a tokio runtime.
pub fn launch_emulator(rom: &Path, emulator: &str) -> Result<(), IntegrationError> {
    if !rom.exists() {
        return Err(IntegrationError::RomMissing(rom.to_path_buf()));
    }

    let emulator = resolve_tool(emulator)?;

    let mut command = if cfg!(target_os = "macos") && emulator.extension().is_some_and(|e| e == "app") {
        let mut c = Command::new("open");
        c.arg("-a").arg(&emulator).arg(rom);
        c
    } else {
        let mut c = Command::new(&emulator);
        c.arg(rom);
        c
    };

    let mut child = command
        .spawn()
        .map_err(|e| IntegrationError::LaunchFailed(e.to_string()))?;

    info!("Launched {:?} in {:?}", rom, emulator);

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!("Emulator exited with {}", status),
            Err(e) => warn!("Failed to wait for emulator: {}", e),
        }
    });

    Ok(())
}
