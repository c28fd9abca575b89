// Tests for the generation pipeline and broadcaster

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{create_test_db, drain, fast_settings, write_workflow, FakeGenerator};
use gbstudio_hub::db::{AssetRepository, AssetType, PLACEHOLDER_SOURCE};
use gbstudio_hub::events::{Broadcaster, StatusEvent, TaskStatus};
use gbstudio_hub::generation::{GenerationPipeline, GenerationRequest, WorkflowNodes, WorkflowTemplate};

fn pipeline_with(
    generator: Arc<FakeGenerator>,
    assets: AssetRepository,
    broadcaster: Broadcaster,
    workflows: &TempDir,
) -> GenerationPipeline {
    GenerationPipeline::new(generator, assets, broadcaster, fast_settings(workflows.path()))
}

#[tokio::test]
async fn test_generation_success() {
    let (db, _temp) = create_test_db();
    let workflows = TempDir::new().unwrap();
    write_workflow(workflows.path(), "workflow_pixel_art");

    let broadcaster = Broadcaster::new();
    let mut subscription = broadcaster.subscribe();
    let assets = AssetRepository::new(db);
    let generator = Arc::new(FakeGenerator::finished("hub_00001_.png"));
    let pipeline = pipeline_with(generator.clone(), assets.clone(), broadcaster, &workflows);

    let mut request = GenerationRequest::new("a brave knight", "knight", AssetType::Sprite);
    request.negative_prompt = "blurry".to_string();
    let outcome = pipeline.run(request).await.unwrap();

    assert_eq!(outcome.filename, "hub_00001_.png");
    assert_eq!(outcome.image_url, "/output/hub_00001_.png");

    // Prompts landed in the configured nodes
    let submitted = generator.submitted.lock().unwrap();
    assert_eq!(submitted[0]["6"]["inputs"]["text"], "a brave knight");
    assert_eq!(submitted[0]["7"]["inputs"]["text"], "blurry");

    let stored = assets.get(outcome.asset_id).await.unwrap().unwrap();
    assert_eq!(stored.source_path.as_deref(), Some("hub_00001_.png"));
    assert_eq!(stored.final_prompt.as_deref(), Some("a brave knight"));

    let events = drain(&mut subscription);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], StatusEvent::queued("knight"));
    assert_eq!(
        events[1],
        StatusEvent::update("knight", TaskStatus::Generating, outcome.asset_id)
    );
    match &events[2] {
        StatusEvent::Update {
            status: TaskStatus::Completed,
            image_url: Some(url),
            ..
        } => assert_eq!(url, &format!("/output/{}", stored.source_path.unwrap())),
        other => panic!("unexpected final event: {:?}", other),
    }
}

#[tokio::test]
async fn test_generation_timeout_keeps_placeholder() {
    let (db, _temp) = create_test_db();
    let workflows = TempDir::new().unwrap();
    write_workflow(workflows.path(), "workflow_pixel_art");

    let broadcaster = Broadcaster::new();
    let mut subscription = broadcaster.subscribe();
    let assets = AssetRepository::new(db);
    let generator = Arc::new(FakeGenerator::pending());
    let pipeline = pipeline_with(generator, assets.clone(), broadcaster, &workflows);

    let request = GenerationRequest::new("slime", "slime", AssetType::Sprite);
    let err = pipeline.run(request).await.unwrap_err();
    assert!(format!("{:#}", err).contains("timed out"));

    let rows = assets.list(None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_path.as_deref(), Some(PLACEHOLDER_SOURCE));

    let events = drain(&mut subscription);
    match events.last() {
        Some(StatusEvent::Error { asset_id, message, .. }) => {
            assert_eq!(*asset_id, Some(rows[0].id));
            assert!(message.contains("timed out"));
        }
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generation_missing_template() {
    let (db, _temp) = create_test_db();
    let workflows = TempDir::new().unwrap();

    let broadcaster = Broadcaster::new();
    let mut subscription = broadcaster.subscribe();
    let generator = Arc::new(FakeGenerator::finished("never.png"));
    let pipeline = pipeline_with(generator.clone(), AssetRepository::new(db), broadcaster, &workflows);

    let mut request = GenerationRequest::new("castle", "castle", AssetType::Background);
    request.template = Some("workflow_background".to_string());
    assert!(pipeline.run(request).await.is_err());
    assert_eq!(generator.submit_count(), 0);

    let events = drain(&mut subscription);
    assert!(matches!(events.last(), Some(StatusEvent::Error { .. })));
}

#[tokio::test]
async fn test_dispatch_runs_in_background() {
    let (db, _temp) = create_test_db();
    let workflows = TempDir::new().unwrap();
    write_workflow(workflows.path(), "workflow_pixel_art");

    let generator = Arc::new(FakeGenerator::finished("bg.png"));
    let pipeline = pipeline_with(
        generator,
        AssetRepository::new(db),
        Broadcaster::new(),
        &workflows,
    );

    let handle = pipeline.dispatch(GenerationRequest::new("sky", "sky", AssetType::Background));
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.filename, "bg.png");
}

#[tokio::test]
async fn test_template_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    assert!(WorkflowTemplate::load(dir.path(), "../secrets").await.is_err());
}

#[tokio::test]
async fn test_inject_requires_positive_node() {
    let dir = TempDir::new().unwrap();
    write_workflow(dir.path(), "custom");
    let mut template = WorkflowTemplate::load(dir.path(), "custom").await.unwrap();

    let nodes = WorkflowNodes {
        positive: "12".to_string(),
        ..WorkflowNodes::default()
    };
    assert!(template.inject_prompts(&nodes, "a", "b").is_err());
}

#[test]
fn test_broadcast_reaches_every_subscriber_in_order() {
    let broadcaster = Broadcaster::new();
    let mut first = broadcaster.subscribe();
    let mut second = broadcaster.subscribe();

    assert_eq!(broadcaster.broadcast(StatusEvent::queued("one")), 2);
    assert_eq!(broadcaster.broadcast(StatusEvent::queued("two")), 2);

    for subscription in [&mut first, &mut second] {
        let names: Vec<_> = drain(subscription)
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }
}

#[test]
fn test_broadcast_drops_closed_subscribers() {
    let broadcaster = Broadcaster::new();
    let closed = broadcaster.subscribe();
    let mut open = broadcaster.subscribe();
    drop(closed);

    assert_eq!(broadcaster.broadcast(StatusEvent::queued("x")), 1);
    assert_eq!(broadcaster.subscriber_count(), 1);
    assert_eq!(drain(&mut open).len(), 1);
}

#[test]
fn test_status_event_wire_format() {
    let event = StatusEvent::update("hero", TaskStatus::Generating, 3);
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({ "event": "UPDATE", "name": "hero", "status": "GENERATING", "asset_id": 3 })
    );
}
