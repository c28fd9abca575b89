//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ApiError;
use crate::agent::{AgentReply, ArtReply, Delegation, Department, HistoryMessage};
use crate::core::AppState;
use crate::db::{AssetStatus, AssetType};
use crate::generation::GenerationRequest;

/// Longest task name derived from a chat message
const TASK_NAME_MAX_CHARS: usize = 48;

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub plan: Vec<Delegation>,
}

#[derive(Debug, Serialize)]
pub struct DispatchedTask {
    pub task_name: String,
    pub asset_type: AssetType,
    pub final_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkippedTask {
    pub department: String,
    pub task: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerationBody {
    pub prompt: String,
    #[serde(default = "default_task_name")]
    pub task_name: String,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub workflow: Option<String>,
}

fn default_task_name() -> String {
    "Untitled Asset".to_string()
}

fn default_asset_type() -> String {
    "sprite".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ApprovalBody {
    pub asset_id: i64,
    #[serde(default)]
    pub asset_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn health_check() -> &'static str {
    "ok"
}

/// Reachability of the database and both backends
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (ollama, comfyui) = tokio::join!(state.llm.health_check(), state.generator.health_check());

    Json(json!({
        "database": state.db.health_check().await,
        "ollama": ollama.unwrap_or(false),
        "comfyui": comfyui.unwrap_or(false),
        "subscribers": state.broadcaster.subscriber_count(),
    }))
}

/// Serve `index.html` from the static directory
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let path = state.paths.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Could not read {:?}: {}", path, e);
            (
                StatusCode::NOT_FOUND,
                Html("<h1>GB Studio Hub</h1><p>index.html not found.</p>".to_string()),
            )
                .into_response()
        }
    }
}

/// Ask the PM for a plan
pub async fn prompt(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatMessage>,
) -> Result<Json<Value>, ApiError> {
    let reply = state
        .relay
        .consult(Department::Pm, &body.message, &body.history)
        .await?;
    let payload = reply.to_json();

    log_exchange(&state, &body.message, &payload).await;
    Ok(Json(payload))
}

/// Run the Art agent for every Art delegation of an approved plan
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExecuteRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut dispatched = Vec::new();
    let mut skipped = Vec::new();

    for delegation in body.plan {
        let department = Department::parse(&delegation.department);
        if department != Some(Department::Art) {
            skipped.push(SkippedTask {
                reason: format!("{} tasks are not executable", delegation.department),
                department: delegation.department,
                task: delegation.task,
            });
            continue;
        }

        let task = format!("{} (style: {})", delegation.task, delegation.style);
        match state.relay.consult(Department::Art, &task, &[]).await {
            Ok(AgentReply::Art(reply)) => {
                let name = task_name_from(&delegation.task);
                dispatched.push(dispatch_art(&state, name, reply));
            }
            Ok(_) => skip_non_art(&mut skipped, delegation),
            Err(e) => {
                warn!("Art agent failed for '{}': {}", delegation.task, e);
                skipped.push(SkippedTask {
                    department: delegation.department,
                    task: delegation.task,
                    reason: e.to_string(),
                });
            }
        }
    }

    if dispatched.is_empty() {
        return Err(ApiError::BadRequest(
            "No executable Art tasks in plan".to_string(),
        ));
    }

    Ok(Json(json!({ "dispatched": dispatched, "skipped": skipped })))
}

/// Talk to one department directly
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Json(body): Json<ChatMessage>,
) -> Result<Json<Value>, ApiError> {
    let department = Department::parse(&agent)
        .ok_or_else(|| ApiError::NotFound(format!("Agent not found: {}", agent)))?;

    let reply = state
        .relay
        .consult(department, &body.message, &body.history)
        .await?;
    let mut payload = reply.to_json();
    log_exchange(&state, &body.message, &payload).await;

    if let AgentReply::Art(art) = reply {
        let task = dispatch_art(&state, task_name_from(&body.message), art);
        if let Value::Object(map) = &mut payload {
            map.insert("task".to_string(), serde_json::to_value(task).unwrap_or(Value::Null));
        }
    }

    Ok(Json(payload))
}

/// Start a generation job directly from a prompt
pub async fn execute_generation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerationBody>,
) -> Result<Json<Value>, ApiError> {
    let asset_type =
        AssetType::from_str(&body.asset_type).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut request = GenerationRequest::new(body.prompt, body.task_name, asset_type);
    request.negative_prompt = body.negative_prompt;
    request.template = body.workflow;
    state.pipeline.dispatch(request);

    Ok(Json(json!({ "message": "Generation has started." })))
}

pub async fn approve_asset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ApprovalBody>,
) -> Result<Json<Value>, ApiError> {
    let requested = body
        .asset_type
        .as_deref()
        .map(AssetType::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let asset = state.integrator.approve(body.asset_id, requested).await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("Asset {} approved and moved.", asset.id),
        "asset": asset,
    })))
}

pub async fn integrate_and_playtest(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let report = state.integrator.integrate_and_playtest().await?;
    info!(
        "Integrated {} assets, ROM at {:?}",
        report.moved_assets.len(),
        report.rom_path
    );

    Ok(Json(json!({
        "status": "success",
        "message": "Playtest launched.",
        "moved_assets": report.moved_assets,
        "descriptor_records": report.descriptor_records,
        "rom_path": report.rom_path,
    })))
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AssetQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(AssetStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assets = state.assets.list(status).await?;
    Ok(Json(json!({ "assets": assets })))
}

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let asset = state
        .assets
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset not found: {}", id)))?;
    Ok(Json(json!(asset)))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(crate::agent::HISTORY_LIMIT);
    let entries = state.conversations.recent(limit).await?;
    Ok(Json(json!({ "conversations": entries })))
}

fn dispatch_art(state: &AppState, task_name: String, reply: ArtReply) -> DispatchedTask {
    let asset_type = reply.resolved_asset_type();
    let mut request = GenerationRequest::new(reply.final_prompt.clone(), task_name.clone(), asset_type);
    request.negative_prompt = reply.negative_prompt;
    request.template = reply.workflow.clone();
    state.pipeline.dispatch(request);

    DispatchedTask {
        task_name,
        asset_type,
        final_prompt: reply.final_prompt,
        workflow: reply.workflow,
    }
}

fn skip_non_art(skipped: &mut Vec<SkippedTask>, delegation: Delegation) {
    skipped.push(SkippedTask {
        department: delegation.department,
        task: delegation.task,
        reason: "Art agent returned a non-art reply".to_string(),
    });
}

/// Conversation logging never fails the request
async fn log_exchange(state: &AppState, message: &str, payload: &Value) {
    if let Err(e) = state.conversations.log(message, &payload.to_string()).await {
        warn!("Failed to log conversation: {:#}", e);
    }
}

/// Short display name for a job started from free text
pub fn task_name_from(message: &str) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return default_task_name();
    }
    if collapsed.chars().count() <= TASK_NAME_MAX_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(TASK_NAME_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}
