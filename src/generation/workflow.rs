//! Workflow templates for the image generator

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::GenerationConfig;

/// The node keys the pipeline relies on. Renumbering the template's nodes
/// silently breaks injection or result lookup, so they are configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowNodes {
    pub positive: String,
    pub negative: String,
    pub output: String,
}

impl Default for WorkflowNodes {
    fn default() -> Self {
        Self {
            positive: "6".to_string(),
            negative: "7".to_string(),
            output: "9".to_string(),
        }
    }
}

impl From<&GenerationConfig> for WorkflowNodes {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            positive: config.positive_node.clone(),
            negative: config.negative_node.clone(),
            output: config.output_node.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    pub id: String,
    pub graph: Value,
}

impl WorkflowTemplate {
    /// Path of template `id` inside `dir`
    pub fn path_for(dir: &Path, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            anyhow::bail!("Invalid workflow template id: {:?}", id);
        }
        Ok(dir.join(format!("{}.json", id)))
    }

    /// Load `<dir>/<id>.json`
    pub async fn load(dir: &Path, id: &str) -> Result<Self> {
        let path = Self::path_for(dir, id)?;
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not load workflow file at {:?}", path))?;
        let graph: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Could not parse workflow file at {:?}", path))?;

        if !graph.is_object() {
            anyhow::bail!("Workflow file {:?} is not a node map", path);
        }

        Ok(Self {
            id: id.to_string(),
            graph,
        })
    }

    /// Write the prompts into the text nodes. The positive node must exist;
    /// the negative node is only filled when the template has one.
    pub fn inject_prompts(&mut self, nodes: &WorkflowNodes, positive: &str, negative: &str) -> Result<()> {
        let text = self
            .graph
            .get_mut(&nodes.positive)
            .and_then(|node| node.get_mut("inputs"))
            .and_then(|inputs| inputs.get_mut("text"))
            .with_context(|| {
                format!(
                    "Workflow '{}' has no text input on node '{}'",
                    self.id, nodes.positive
                )
            })?;
        *text = Value::String(positive.to_string());

        if let Some(text) = self
            .graph
            .get_mut(&nodes.negative)
            .and_then(|node| node.get_mut("inputs"))
            .and_then(|inputs| inputs.get_mut("text"))
        {
            *text = Value::String(negative.to_string());
        }

        Ok(())
    }
}

/// Filename of the first image the output node reported, if any
pub fn output_filename(history_entry: &Value, output_node: &str) -> Option<String> {
    history_entry
        .get("outputs")?
        .get(output_node)?
        .get("images")?
        .get(0)?
        .get("filename")?
        .as_str()
        .map(str::to_string)
}
