// Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use gbstudio_hub::clients::{ImageGenerator, LanguageModel};
use gbstudio_hub::db::Database;
use gbstudio_hub::events::{StatusEvent, Subscription};
use gbstudio_hub::generation::{PipelineSettings, WorkflowNodes};

pub fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    (db, temp_dir)
}

/// Language model that always answers with the same text
pub struct CannedModel {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Image generator that records submitted graphs and replies to history
/// polls with a fixed entry. Events already queued on `observer` when a
/// graph is submitted are captured in `seen_at_submit`.
pub struct FakeGenerator {
    history: Option<Value>,
    pub submitted: Mutex<Vec<Value>>,
    pub observer: Mutex<Option<Subscription>>,
    pub seen_at_submit: Mutex<Vec<StatusEvent>>,
}

impl FakeGenerator {
    /// Generator whose jobs never finish
    pub fn pending() -> Self {
        Self::with_history(None)
    }

    /// Generator whose jobs finish with `filename` on node 9
    pub fn finished(filename: &str) -> Self {
        Self::with_history(Some(json!({
            "outputs": { "9": { "images": [{ "filename": filename, "type": "output" }] } }
        })))
    }

    fn with_history(history: Option<Value>) -> Self {
        Self {
            history,
            submitted: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
            seen_at_submit: Mutex::new(Vec::new()),
        }
    }

    pub fn observe(&self, subscription: Subscription) {
        *self.observer.lock().unwrap() = Some(subscription);
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn submit(&self, workflow: &Value) -> Result<String> {
        if let Some(subscription) = self.observer.lock().unwrap().as_mut() {
            let mut seen = self.seen_at_submit.lock().unwrap();
            while let Ok(event) = subscription.receiver.try_recv() {
                seen.push(event);
            }
        }
        self.submitted.lock().unwrap().push(workflow.clone());
        Ok("job-1".to_string())
    }

    async fn history(&self, _job_id: &str) -> Result<Option<Value>> {
        Ok(self.history.clone())
    }
}

/// Minimal workflow graph with the default prompt and output nodes
pub fn sample_workflow() -> Value {
    json!({
        "3": { "class_type": "KSampler", "inputs": { "seed": 1 } },
        "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
        "7": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
        "9": { "class_type": "SaveImage", "inputs": { "filename_prefix": "hub" } }
    })
}

pub fn write_workflow(dir: &Path, id: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(format!("{}.json", id)),
        serde_json::to_string_pretty(&sample_workflow()).unwrap(),
    )
    .unwrap();
}

/// Pipeline settings with fast polling, templates under `dir`
pub fn fast_settings(dir: &Path) -> PipelineSettings {
    PipelineSettings {
        workflows_dir: dir.to_path_buf(),
        default_template: "workflow_pixel_art".to_string(),
        nodes: WorkflowNodes::default(),
        poll_interval: Duration::from_millis(10),
        timeout: Duration::from_millis(100),
    }
}

/// Drain every event currently queued on a subscription
pub fn drain(subscription: &mut Subscription) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = subscription.receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Write a blank PNG of the given size
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::new(width, height).save(path).unwrap();
}
