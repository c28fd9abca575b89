// Router tests driven through tower's oneshot

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use common::{create_test_db, fast_settings, write_workflow, CannedModel, FakeGenerator};
use gbstudio_hub::core::{AppState, StaticPaths};
use gbstudio_hub::db::AssetType;
use gbstudio_hub::events::{StatusEvent, TaskStatus};
use gbstudio_hub::integration::ProjectSettings;
use gbstudio_hub::server::{router, routes::task_name_from};

struct Harness {
    _db_dir: TempDir,
    _root: TempDir,
    state: Arc<AppState>,
    generator: Arc<FakeGenerator>,
}

fn harness(model_reply: &str) -> Harness {
    let (db, db_dir) = create_test_db();
    let root = TempDir::new().unwrap();
    let workflows = root.path().join("workflows");
    write_workflow(&workflows, "workflow_pixel_art");
    write_workflow(&workflows, "workflow_background");

    let static_dir = root.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>hub</h1>").unwrap();

    let generator = Arc::new(FakeGenerator::finished("hub_00001_.png"));
    let project_root = root.path().join("project");
    let output_dir = root.path().join("output");

    let mut settings = fast_settings(&workflows);
    settings.timeout = Duration::from_secs(5);

    let state = Arc::new(AppState::with_backends(
        db,
        Arc::new(CannedModel::new(model_reply)),
        generator.clone(),
        settings,
        ProjectSettings {
            project_root: project_root.clone(),
            output_dir: output_dir.clone(),
            gbs_cli_path: String::new(),
            emulator_path: String::new(),
        },
        StaticPaths {
            static_dir,
            output_dir,
            project_assets_dir: project_root.join("assets"),
        },
    ));

    Harness {
        _db_dir: db_dir,
        _root: root,
        state,
        generator,
    }
}

fn app(h: &Harness) -> Router {
    router(h.state.clone())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Wait for a background job to reach the generator
async fn wait_for_submit(generator: &FakeGenerator) {
    for _ in 0..200 {
        if generator.submit_count() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("generation job never reached the generator");
}

#[tokio::test]
async fn test_health() {
    let h = harness("{}");
    let response = app(&h).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_index_served_from_static_dir() {
    let h = harness("{}");
    let response = app(&h).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<h1>hub</h1>");
}

#[tokio::test]
async fn test_unknown_agent_is_not_found() {
    let h = harness("{}");
    let response = app(&h)
        .oneshot(post_json("/api/v1/chat/Marketing", json!({ "message": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("Agent not found"));
}

#[tokio::test]
async fn test_art_chat_dispatches_background_generation() {
    let h = harness(
        r#"Here you go: {"final_prompt": "castle at dusk", "negative_prompt": "text", "workflow": "workflow_background"}"#,
    );
    h.generator.observe(h.state.broadcaster.subscribe());

    let response = app(&h)
        .oneshot(post_json("/api/v1/chat/Art", json!({ "message": "a castle backdrop" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["final_prompt"], "castle at dusk");
    assert_eq!(json["task"]["asset_type"], "background");

    wait_for_submit(&h.generator).await;

    let assets = h.state.assets.list(None).await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].asset_type, AssetType::Background);
    assert_eq!(assets[0].task_name, "a castle backdrop");

    let seen = h.generator.seen_at_submit.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            StatusEvent::queued("a castle backdrop"),
            StatusEvent::update("a castle backdrop", TaskStatus::Generating, assets[0].id),
        ]
    );

    let conversations = h.state.conversations.recent(10).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].user_message, "a castle backdrop");
}

#[tokio::test]
async fn test_malformed_reply_is_bad_gateway() {
    let h = harness("I would rather not answer in JSON.");
    let response = app(&h)
        .oneshot(post_json("/api/v1/prompt", json!({ "message": "plan the game" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(h.state.conversations.recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_returns_pm_reply() {
    let h = harness(
        r#"{"response_to_user": "Two tasks.", "action_type": "propose_delegation",
            "plan": [{"department": "Art", "task": "hero"}, {"department": "Writing", "task": "intro"}]}"#,
    );
    let response = app(&h)
        .oneshot(post_json("/api/v1/prompt", json!({ "message": "start" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["action_type"], "propose_delegation");
    assert_eq!(json["plan"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_execute_without_art_tasks() {
    let h = harness("{}");
    let plan = json!({ "plan": [{ "department": "Writing", "task": "intro" }] });
    let response = app(&h)
        .oneshot(post_json("/api/v1/execute", plan))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.generator.submit_count(), 0);
}

#[tokio::test]
async fn test_execute_generation_defaults() {
    let h = harness("{}");
    let response = app(&h)
        .oneshot(post_json(
            "/api/v1/execute_generation",
            json!({ "prompt": "a slime" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Generation has started.");

    wait_for_submit(&h.generator).await;
    let assets = h.state.assets.list(None).await.unwrap();
    assert_eq!(assets[0].task_name, "Untitled Asset");
    assert_eq!(assets[0].asset_type, AssetType::Sprite);
}

#[tokio::test]
async fn test_approve_missing_asset() {
    let h = harness("{}");
    let response = app(&h)
        .oneshot(post_json(
            "/api/v1/approve_asset",
            json!({ "asset_id": 12, "asset_type": "sprite" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approve_placeholder_is_bad_request() {
    let h = harness("{}");
    let asset = h
        .state
        .assets
        .create("pending", AssetType::Sprite, "p", "placeholder")
        .await
        .unwrap();

    let response = app(&h)
        .oneshot(post_json("/api/v1/approve_asset", json!({ "asset_id": asset.id })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!h.state.integrator.settings().project_root.exists());
}

#[tokio::test]
async fn test_approve_over_existing_file_is_conflict() {
    let h = harness("{}");
    let settings = h.state.integrator.settings().clone();
    let existing = settings.project_root.join("assets/sprites/hero.png");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"integrated").unwrap();
    std::fs::create_dir_all(&settings.output_dir).unwrap();
    std::fs::write(settings.output_dir.join("hero.png"), b"fresh").unwrap();

    let asset = h
        .state
        .assets
        .create("hero", AssetType::Sprite, "hero", "hero.png")
        .await
        .unwrap();

    let response = app(&h)
        .oneshot(post_json("/api/v1/approve_asset", json!({ "asset_id": asset.id })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["detail"].as_str().unwrap().contains("already exists"));
    assert_eq!(std::fs::read(&existing).unwrap(), b"integrated");
}

#[tokio::test]
async fn test_asset_listing() {
    let h = harness("{}");
    h.state
        .assets
        .create("hero", AssetType::Sprite, "hero", "hero.png")
        .await
        .unwrap();

    let response = app(&h)
        .oneshot(get("/api/v1/assets?status=generated"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["assets"][0]["task_name"], "hero");

    let response = app(&h)
        .oneshot(get("/api/v1/assets?status=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&h).oneshot(get("/api/v1/assets/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_task_name_from_message() {
    assert_eq!(task_name_from("  hero   walk cycle "), "hero walk cycle");
    assert_eq!(task_name_from(""), "Untitled Asset");

    let long = "word ".repeat(30);
    let name = task_name_from(&long);
    assert!(name.ends_with("..."));
    assert!(name.chars().count() <= 51);
}

#[tokio::test]
async fn test_status_reports_backends() {
    let h = harness("{}");
    let _subscription = h.state.broadcaster.subscribe();

    let response = app(&h).oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["database"], true);
    assert_eq!(json["ollama"], true);
    assert_eq!(json["comfyui"], true);
    assert_eq!(json["subscribers"], 1);
}
