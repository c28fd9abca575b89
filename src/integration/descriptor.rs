//! Editing the `.gbsproj` project descriptor

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::AssetType;

/// GB Studio sprite tiles are 16x16
const SPRITE_TILE: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("No .gbsproj file found under {0:?}")]
    NotFound(PathBuf),

    #[error("Asset file not found at {0:?}")]
    AssetMissing(PathBuf),

    #[error("Project file has no '{0}' array")]
    MissingSection(&'static str),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Project file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorOutcome {
    /// Record appended to the named section
    Added { section: &'static str, record: Value },
    /// Asset type has no descriptor section
    Skipped,
}

/// Locate the project's single `.gbsproj` file
pub fn find_project_file(project_root: &Path) -> Result<PathBuf, DescriptorError> {
    // the root is a literal path; only the suffix is a pattern
    let root = glob::Pattern::escape(&project_root.to_string_lossy());
    let pattern = Path::new(&root).join("**").join("*.gbsproj");
    let mut matches: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .collect();
    matches.sort();

    if matches.len() > 1 {
        warn!("Found {} .gbsproj files, using {:?}", matches.len(), matches[0]);
    }

    matches
        .into_iter()
        .next()
        .ok_or_else(|| DescriptorError::NotFound(project_root.to_path_buf()))
}

/// Append a record for `asset_file` (already inside the project) to the
/// descriptor. Sprites and backgrounds get records; other types are skipped.
pub fn add_asset_to_project(
    project_root: &Path,
    asset_file: &Path,
    asset_type: AssetType,
    name: &str,
) -> Result<DescriptorOutcome, DescriptorError> {
    let section = match asset_type {
        AssetType::Sprite => "sprites",
        AssetType::Background => "backgrounds",
        other => {
            warn!(
                "Asset type '{}' has no project descriptor section, skipping",
                other.as_str()
            );
            return Ok(DescriptorOutcome::Skipped);
        }
    };

    let project_file = find_project_file(project_root)?;

    if !asset_file.is_file() {
        return Err(DescriptorError::AssetMissing(asset_file.to_path_buf()));
    }

    let filename = asset_file
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .ok_or_else(|| DescriptorError::AssetMissing(asset_file.to_path_buf()))?;
    let (width, height) = image::image_dimensions(asset_file)?;

    let record = match asset_type {
        AssetType::Sprite => sprite_record(name, &filename, width, height),
        _ => background_record(name, &filename, width, height),
    };

    let mut project: Value = serde_json::from_str(&std::fs::read_to_string(&project_file)?)?;
    project
        .get_mut(section)
        .and_then(Value::as_array_mut)
        .ok_or(DescriptorError::MissingSection(section))?
        .push(record.clone());

    write_with_backup(&project_file, &serde_json::to_string_pretty(&project)?)?;

    info!("Added asset '{}' to {:?}", name, project_file);
    Ok(DescriptorOutcome::Added { section, record })
}

pub fn sprite_record(name: &str, filename: &str, width: u32, height: u32) -> Value {
    let frames = (width / SPRITE_TILE) * (height / SPRITE_TILE);
    json!({
        "id": Uuid::new_v4().to_string(),
        "name": name,
        "filename": filename,
        "width": width,
        "height": height,
        "type": if frames > 1 { "actor_animated" } else { "static" },
        "frames": frames,
        "animations": [],
        "animSpeed": 3,
        "collisionGroup": "",
    })
}

pub fn background_record(name: &str, filename: &str, width: u32, height: u32) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "name": name,
        "filename": filename,
        "width": width,
        "height": height,
        "imageWidth": width,
        "imageHeight": height,
        "autoColor": true,
    })
}

/// Replace `path` with `contents`, keeping a timestamped backup. The write
/// goes through a temp file and rename; on failure the backup is restored.
pub fn write_with_backup(path: &Path, contents: &str) -> Result<PathBuf, DescriptorError> {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let backup = path.with_file_name(format!(
        "{}.{}.bak",
        path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default(),
        stamp
    ));
    std::fs::copy(path, &backup)?;

    let tmp = path.with_extension("gbsproj.tmp");
    let result = std::fs::write(&tmp, contents).and_then(|_| std::fs::rename(&tmp, path));

    if let Err(e) = result {
        warn!("Project file write failed, restoring backup: {}", e);
        let _ = std::fs::remove_file(&tmp);
        std::fs::copy(&backup, path)?;
        return Err(e.into());
    }

    Ok(backup)
}
