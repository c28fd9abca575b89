//! Asset repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::Database;

/// `source_path` value of an asset whose image has not been produced yet
pub const PLACEHOLDER_SOURCE: &str = "placeholder";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub id: i64,
    pub task_name: String,
    pub asset_type: AssetType,
    pub timestamp: DateTime<Utc>,
    pub final_prompt: Option<String>,
    pub source_path: Option<String>,
    pub status: AssetStatus,
}

impl Asset {
    /// True once the generator has reported a real file for this asset
    pub fn has_source(&self) -> bool {
        matches!(self.source_path.as_deref(), Some(p) if !p.trim().is_empty() && p != PLACEHOLDER_SOURCE)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Sprite,
    Background,
    Ui,
    Music,
    Writing,
    Code,
    Sound,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Sprite => "sprite",
            AssetType::Background => "background",
            AssetType::Ui => "ui",
            AssetType::Music => "music",
            AssetType::Writing => "writing",
            AssetType::Code => "code",
            AssetType::Sound => "sound",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sprite" => Ok(AssetType::Sprite),
            "background" => Ok(AssetType::Background),
            "ui" => Ok(AssetType::Ui),
            "music" => Ok(AssetType::Music),
            "writing" => Ok(AssetType::Writing),
            "code" => Ok(AssetType::Code),
            "sound" => Ok(AssetType::Sound),
            _ => anyhow::bail!("Unknown asset type: {}", s),
        }
    }

    /// Guess the asset type from a workflow template id such as
    /// `workflow_background` or `isometric_sprite`
    pub fn infer_from_workflow(template: &str) -> Option<Self> {
        let lower = template.to_ascii_lowercase();
        if lower.contains("background") || lower.contains("scene") {
            Some(AssetType::Background)
        } else if lower.contains("ui") {
            Some(AssetType::Ui)
        } else if lower.contains("sprite") || lower.contains("pixel_art") {
            Some(AssetType::Sprite)
        } else {
            None
        }
    }

    /// Project-relative folder the approved file is moved into
    pub fn project_subfolder(&self) -> Option<&'static str> {
        match self {
            AssetType::Sprite => Some("assets/sprites"),
            AssetType::Background => Some("assets/backgrounds"),
            AssetType::Ui => Some("assets/ui"),
            AssetType::Music => Some("assets/music"),
            AssetType::Sound => Some("assets/sounds"),
            AssetType::Writing | AssetType::Code => None,
        }
    }

    /// Types the image generator can produce
    pub fn is_image(&self) -> bool {
        matches!(self, AssetType::Sprite | AssetType::Background | AssetType::Ui)
    }
}

/// Asset lifecycle. Only forward moves along
/// `generated -> approved -> integrated` are allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Generated,
    Approved,
    Integrated,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Generated => "generated",
            AssetStatus::Approved => "approved",
            AssetStatus::Integrated => "integrated",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "generated" => Ok(AssetStatus::Generated),
            "approved" => Ok(AssetStatus::Approved),
            "integrated" => Ok(AssetStatus::Integrated),
            _ => anyhow::bail!("Unknown asset status: {}", s),
        }
    }

    pub fn can_transition_to(&self, next: AssetStatus) -> bool {
        matches!(
            (self, next),
            (AssetStatus::Generated, AssetStatus::Approved)
                | (AssetStatus::Approved, AssetStatus::Integrated)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(i64),

    #[error("Asset {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: &'static str,
        to: &'static str,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Clone)]
pub struct AssetRepository {
    db: Database,
}

const ASSET_COLUMNS: &str =
    "id, task_name, asset_type, timestamp, final_prompt, source_path, status";

impl AssetRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a newly dispatched asset. New rows always start as `generated`.
    pub async fn create(
        &self,
        task_name: &str,
        asset_type: AssetType,
        final_prompt: &str,
        source_path: &str,
    ) -> Result<Asset> {
        let now = Utc::now();

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO assets (task_name, asset_type, timestamp, final_prompt, source_path, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task_name,
                asset_type.as_str(),
                now.to_rfc3339(),
                final_prompt,
                source_path,
                AssetStatus::Generated.as_str(),
            ],
        )
        .context("Failed to insert asset")?;
        let id = conn.last_insert_rowid();

        tracing::info!("Logged creation of asset '{}' with ID {}", task_name, id);
        Ok(Asset {
            id,
            task_name: task_name.to_string(),
            asset_type,
            timestamp: now,
            final_prompt: Some(final_prompt.to_string()),
            source_path: Some(source_path.to_string()),
            status: AssetStatus::Generated,
        })
    }

    /// Get an asset by ID
    pub async fn get(&self, id: i64) -> Result<Option<Asset>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM assets WHERE id = ?1", ASSET_COLUMNS))?;

        stmt.query_row(params![id], Self::map_row)
            .optional()
            .context("Failed to get asset")
    }

    /// List assets, optionally filtered by status, oldest first
    pub async fn list(&self, status: Option<AssetStatus>) -> Result<Vec<Asset>> {
        let conn = self.db.lock().await;

        let assets = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM assets WHERE status = ?1 ORDER BY id ASC",
                    ASSET_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], Self::map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM assets ORDER BY id ASC", ASSET_COLUMNS))?;
                let rows = stmt.query_map([], Self::map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
        };

        assets.context("Failed to list assets")
    }

    /// All assets waiting for integration
    pub async fn approved(&self) -> Result<Vec<Asset>> {
        self.list(Some(AssetStatus::Approved)).await
    }

    /// Record the generated file for an asset
    pub async fn set_source_path(&self, id: i64, source_path: &str) -> Result<(), AssetError> {
        let conn = self.db.lock().await;
        let changed = conn.execute(
            "UPDATE assets SET source_path = ?1 WHERE id = ?2",
            params![source_path, id],
        )?;

        if changed == 0 {
            tracing::warn!("Attempted to update source path for non-existent asset ID: {}", id);
            return Err(AssetError::NotFound(id));
        }

        tracing::info!("Updated asset {} with source_path '{}'", id, source_path);
        Ok(())
    }

    /// Move an asset to the next lifecycle state
    pub async fn update_status(&self, id: i64, status: AssetStatus) -> Result<(), AssetError> {
        let conn = self.db.lock().await;

        let current: Option<String> = conn
            .query_row("SELECT status FROM assets WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let current = current.ok_or(AssetError::NotFound(id))?;
        let current = AssetStatus::from_str(&current).unwrap_or(AssetStatus::Generated);

        if !current.can_transition_to(status) {
            return Err(AssetError::InvalidTransition {
                id,
                from: current.as_str(),
                to: status.as_str(),
            });
        }

        let changed = conn.execute(
            "UPDATE assets SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            tracing::warn!("Attempted to update status for non-existent asset ID: {}", id);
            return Err(AssetError::NotFound(id));
        }

        tracing::info!("Updated asset {} to status '{}'", id, status.as_str());
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
        let asset_type = row.get::<_, String>(2)?;
        let status = row.get::<_, String>(6)?;

        Ok(Asset {
            id: row.get(0)?,
            task_name: row.get(1)?,
            asset_type: AssetType::from_str(&asset_type).unwrap_or(AssetType::Sprite),
            timestamp: DateTime::parse_from_rfc3339(&row.get::<_, String>(3)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            final_prompt: row.get(4)?,
            source_path: row.get(5)?,
            status: AssetStatus::from_str(&status).unwrap_or(AssetStatus::Generated),
        })
    }
}
