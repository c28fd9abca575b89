//! Typed department replies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::department::Department;
use crate::db::AssetType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ProposeDelegation,
    Clarify,
    Respond,
}

/// One unit of work the PM hands to a department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegation {
    pub department: String,
    pub task: String,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    "general_pixel_art".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PmReply {
    pub response_to_user: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub plan: Vec<Delegation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtReply {
    pub final_prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub asset_type: Option<AssetType>,
}

impl ArtReply {
    /// Image type declared by the model, else inferred from the workflow
    /// name. Declared non-image types are ignored.
    pub fn resolved_asset_type(&self) -> AssetType {
        self.asset_type
            .filter(AssetType::is_image)
            .or_else(|| self.workflow.as_deref().and_then(AssetType::infer_from_workflow))
            .unwrap_or(AssetType::Sprite)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextReply {
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    Pm(PmReply),
    Art(ArtReply),
    Text(TextReply),
}

impl AgentReply {
    /// Deserialize an extracted object into the department's reply shape.
    /// Missing keys or wrong types are an error.
    pub fn from_value(department: Department, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match department {
            Department::Pm => AgentReply::Pm(serde_json::from_value(value)?),
            Department::Art => AgentReply::Art(serde_json::from_value(value)?),
            Department::Writing | Department::Code | Department::Qa | Department::Sound => {
                AgentReply::Text(serde_json::from_value(value)?)
            }
        })
    }

    pub fn to_json(&self) -> Value {
        let value = match self {
            AgentReply::Pm(r) => serde_json::to_value(r),
            AgentReply::Art(r) => serde_json::to_value(r),
            AgentReply::Text(r) => serde_json::to_value(r),
        };
        value.unwrap_or(Value::Null)
    }
}
