use std::sync::Arc;

use ariadne_core::anchor::{AnchorTracker, TextRange};
use ariadne_core::export::import_project;
use ariadne_core::llm::GeminiProvider;
use ariadne_core::orchestrator::Orchestrator;
use ariadne_core::store::CanvasStore;
use ariadne_core::stream::{StreamOutcome, StreamingPipeline, is_error_response};
use ariadne_core::types::Position;
use ariadne_test::{MockEndpoint, ScriptedBackend, TestWorkspace, orchestrator_with};

// ── Root creation ────────────────────────────────────────────────

#[tokio::test]
async fn root_node_starts_empty_at_origin() {
    let backend = Arc::new(ScriptedBackend::answering(&[]).hanging());
    let orchestrator = orchestrator_with(backend);
    let created = orchestrator.create_root("What is entropy?").unwrap();

    let store = orchestrator.store();
    assert_eq!(store.len(), 1);
    let node = store.node(&created.id).unwrap();
    assert_eq!(node.parent_id, None);
    assert_eq!(node.position, Position::ORIGIN);
    assert_eq!(node.content.user_prompt, "What is entropy?");
    assert!(node.content.ai_response.is_empty());

    created.stream.cancel();
    assert_eq!(created.stream.join().await, StreamOutcome::Cancelled);
}

// ── Streaming, follow-up, delete ─────────────────────────────────

#[tokio::test]
async fn ask_follow_up_then_delete_root() {
    let backend = Arc::new(ScriptedBackend::answering(&["Entropy ", "is disorder."]));
    let orchestrator = orchestrator_with(Arc::clone(&backend));
    let store = Arc::clone(orchestrator.store());

    // Streamed chunks accumulate into the answer.
    let root = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = root.stream.join().await;
    assert!(outcome.is_completed(), "{outcome:?}");
    let answer = store.node(&root.id).unwrap().content.ai_response;
    assert_eq!(answer, "Entropy is disorder.");

    // Follow up on "disorder" in that answer.
    let tracker = AnchorTracker::new(Arc::clone(&store));
    let range = TextRange::locate(&answer, "disorder").unwrap();
    assert_eq!(range, TextRange { start: 11, end: 19 });
    tracker.capture(&root.id, " disorder ", range, None).unwrap();

    let child = orchestrator.follow_up("Why is it called disorder?").unwrap();
    let node = store.node(&child.id).unwrap();
    assert_eq!(node.parent_id.as_ref(), Some(&root.id));
    assert_eq!(node.source_anchor.as_ref().unwrap().text, "disorder");
    assert_eq!(node.position, Position::new(550.0, 0.0));
    assert_eq!(store.edge_count(), 1);
    assert_eq!(store.edges()[0].source, root.id);
    assert_eq!(store.edges()[0].target, child.id);
    assert!(tracker.current().is_none());
    assert_eq!(store.detail_node(), Some(child.id.clone()));
    child.stream.join().await;

    // The follow-up request carried the anchor and the parent's answer.
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].prompt, "Why is it called disorder?");
    assert!(requests[1].system_instruction.contains("highlighted \"disorder\""));
    assert!(requests[1].system_instruction.ends_with("Entropy is disorder."));
    assert!(!requests[0].system_instruction.contains("highlighted"));

    // Deleting the root takes the child with it.
    let removed = orchestrator.delete_node(&root.id);
    assert_eq!(removed.len(), 2);
    assert_eq!(store.len(), 0);
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.detail_node(), None);
}

#[tokio::test]
async fn follow_up_without_selection_is_rejected() {
    let orchestrator = orchestrator_with(Arc::new(ScriptedBackend::answering(&["x"])));
    let err = orchestrator.follow_up("Why?").unwrap_err();
    assert!(err.to_string().contains("No active selection"));
    assert!(orchestrator.store().is_empty());
}

// ── Import cleanup ───────────────────────────────────────────────

#[test]
fn import_with_only_dangling_edge_leaves_canvas_empty() {
    let workspace = TestWorkspace::new();
    let file = workspace.write(
        "dangling.ariadne",
        r#"{"version":"1.0","nodes":[],"edges":[{"id":"e1","source":"x","target":"y"}]}"#,
    );

    let store = workspace.open_store();
    let summary = import_project(&store, &file).unwrap();
    assert_eq!(summary.nodes, 0);
    assert_eq!(summary.edges, 0);
    assert_eq!(summary.dropped_edges, 1);
    assert!(store.nodes().is_empty());
    assert!(store.edges().is_empty());

    let reopened = workspace.open_store();
    assert!(reopened.is_empty());
    assert_eq!(reopened.edge_count(), 0);
}

// ── Endpoint failure ─────────────────────────────────────────────

#[tokio::test]
async fn http_500_writes_error_text_into_node() {
    let endpoint = MockEndpoint::error(500, "<html>upstream exploded</html>").await;
    let provider = GeminiProvider::new("test-key".into(), "gemini-2.5-pro".into())
        .with_base_url(endpoint.base_url.clone());
    let store = Arc::new(CanvasStore::in_memory());
    let orchestrator = Orchestrator::new(StreamingPipeline::new(Arc::new(provider), Arc::clone(&store)));

    let created = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = created.stream.join().await;
    assert!(matches!(outcome, StreamOutcome::Failed { .. }), "{outcome:?}");
    endpoint.received().await;

    let answer = store.node(&created.id).unwrap().content.ai_response;
    assert!(answer.contains("Failed to generate response."));
    assert!(answer.contains("API error: 500"));
    assert!(is_error_response(&answer));
}

#[tokio::test]
async fn unreachable_endpoint_error_omits_api_key() {
    let provider = GeminiProvider::new("SUPERSECRETKEY".into(), "gemini-2.5-pro".into())
        .with_base_url("http://127.0.0.1:1".into());
    let store = Arc::new(CanvasStore::in_memory());
    let orchestrator = Orchestrator::new(StreamingPipeline::new(Arc::new(provider), Arc::clone(&store)));

    let created = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = created.stream.join().await;
    match &outcome {
        StreamOutcome::Failed { message } => assert!(!message.contains("SUPERSECRETKEY")),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let answer = store.node(&created.id).unwrap().content.ai_response;
    assert!(is_error_response(&answer));
    assert!(!answer.contains("SUPERSECRETKEY"));
    assert!(!answer.contains("key="));
}
