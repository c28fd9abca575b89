//! Conversation log repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    /// Raw JSON text handed back to the caller
    pub agent_response: String,
}

#[derive(Clone)]
pub struct ConversationRepository {
    db: Database,
}

impl ConversationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append one exchange to the log
    pub async fn log(&self, user_message: &str, agent_response: &str) -> Result<ConversationEntry> {
        let now = Utc::now();

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO conversations (timestamp, user_message, agent_response) VALUES (?1, ?2, ?3)",
            params![now.to_rfc3339(), user_message, agent_response],
        )
        .context("Failed to log chat message")?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Logged chat message {}", id);

        Ok(ConversationEntry {
            id,
            timestamp: now,
            user_message: user_message.to_string(),
            agent_response: agent_response.to_string(),
        })
    }

    /// The most recent `limit` entries, oldest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<ConversationEntry>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, user_message, agent_response
             FROM conversations ORDER BY id DESC LIMIT ?1",
        )?;

        let mut entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ConversationEntry {
                    id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    user_message: row.get(2)?,
                    agent_response: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read conversation history")?;

        entries.reverse();
        Ok(entries)
    }

    /// Render recent history the way the PM prompt expects it
    pub async fn history_digest(&self, limit: usize) -> Result<String> {
        let entries = self.recent(limit).await?;
        if entries.is_empty() {
            return Ok("No conversation history found.".to_string());
        }

        Ok(entries
            .iter()
            .map(|e| format!("- User: {}\n  - Agent Response: {}", e.user_message, e.agent_response))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
