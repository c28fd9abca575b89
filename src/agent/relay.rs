//! Agent relay: prompt building, model call and strict reply parsing

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::department::Department;
use super::extract::{extract_json_object, ExtractError};
use super::reply::AgentReply;
use crate::clients::LanguageModel;
use crate::db::ConversationRepository;

/// Conversation rows handed to the PM prompt
pub const HISTORY_LIMIT: usize = 20;

/// A prior message supplied by the browser client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryMessage {
    pub sender: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{department} agent unavailable: {message}")]
    Upstream {
        department: Department,
        message: String,
    },

    #[error("{department} agent returned no JSON object")]
    NoJson { department: Department },

    #[error("{department} agent returned malformed JSON: {source}")]
    Malformed {
        department: Department,
        source: serde_json::Error,
    },

    #[error("{department} agent reply did not match the expected shape: {source}")]
    Schema {
        department: Department,
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct AgentRelay {
    llm: Arc<dyn LanguageModel>,
    conversations: ConversationRepository,
}

impl AgentRelay {
    pub fn new(llm: Arc<dyn LanguageModel>, conversations: ConversationRepository) -> Self {
        Self { llm, conversations }
    }

    /// Ask a department to handle `task` and parse its reply.
    ///
    /// `history` overrides the stored conversation log for departments that
    /// use one.
    pub async fn consult(
        &self,
        department: Department,
        task: &str,
        history: &[HistoryMessage],
    ) -> Result<AgentReply, RelayError> {
        let digest = if !department.wants_history() {
            None
        } else if !history.is_empty() {
            Some(format_history(history))
        } else {
            match self.conversations.history_digest(HISTORY_LIMIT).await {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warn!("Error getting conversation history: {:#}", e);
                    Some("Error retrieving history.".to_string())
                }
            }
        };

        let prompt = build_prompt(department, task, digest.as_deref());
        debug!("Consulting {} agent", department);

        let raw = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| RelayError::Upstream {
                department,
                message: format!("{:#}", e),
            })?;

        parse_reply(department, &raw)
    }
}

/// Concatenate the role instruction, optional history and the task
pub fn build_prompt(department: Department, task: &str, history: Option<&str>) -> String {
    let mut prompt = department.system_prompt().to_string();

    if let Some(history) = history {
        prompt.push_str("\n\nRECENT PROJECT HISTORY:\n");
        prompt.push_str(history);
    }

    prompt.push_str("\n\nUSER TASK: ");
    prompt.push_str(task);
    prompt
}

/// Extract and validate a department reply from raw model text
pub fn parse_reply(department: Department, raw: &str) -> Result<AgentReply, RelayError> {
    let value = extract_json_object(raw).map_err(|e| match e {
        ExtractError::NoObject => RelayError::NoJson { department },
        ExtractError::Malformed(source) => RelayError::Malformed { department, source },
    })?;

    AgentReply::from_value(department, value)
        .map_err(|source| RelayError::Schema { department, source })
}

fn format_history(history: &[HistoryMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.sender, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
