use std::sync::{Arc, Mutex};

use ariadne_core::config::PromptSection;
use ariadne_core::llm::GeminiProvider;
use ariadne_core::orchestrator::Orchestrator;
use ariadne_core::store::{CanvasStore, SnapshotPersistence};
use ariadne_core::stream::{StreamOutcome, StreamingPipeline};
use ariadne_core::types::{CanvasSnapshot, NodeId};
use ariadne_test::{MockEndpoint, ScriptedBackend, sse_body, sse_data};

/// Persistence that keeps every snapshot the store writes, in order.
#[derive(Debug, Clone, Default)]
struct Recording(Arc<Mutex<Vec<CanvasSnapshot>>>);

impl Recording {
    fn answers(&self, id: &NodeId) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| s.node(id).map(|n| n.content.ai_response.clone()))
            .collect()
    }
}

impl SnapshotPersistence for Recording {
    fn load(&self) -> ariadne_core::error::Result<Option<CanvasSnapshot>> {
        Ok(None)
    }

    fn save(&self, snapshot: &CanvasSnapshot) -> ariadne_core::error::Result<()> {
        self.0.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

fn gemini(endpoint: &MockEndpoint) -> Arc<GeminiProvider> {
    Arc::new(
        GeminiProvider::new("test-key".into(), "gemini-2.5-pro".into())
            .with_base_url(endpoint.base_url.clone()),
    )
}

#[tokio::test]
async fn gemini_stream_accumulates_split_body() {
    let body = sse_body(&["Entropy ", "is ", "a measure of disorder ", "(ΔS ≥ 0)."], 42);
    let endpoint = MockEndpoint::sse(body, 7).await;
    let store = Arc::new(CanvasStore::in_memory());
    let orchestrator = Orchestrator::new(StreamingPipeline::new(gemini(&endpoint), Arc::clone(&store)))
        .with_prompt(PromptSection {
            custom_instruction: Some("Answer like a physicist.".into()),
            include_project_context: false,
        });

    let created = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = created.stream.join().await;
    assert_eq!(
        outcome,
        StreamOutcome::Completed {
            chunks: 5,
            malformed: 0,
            chars: "Entropy is a measure of disorder (ΔS ≥ 0).".chars().count(),
        }
    );

    let node = store.node(&created.id).unwrap();
    assert_eq!(node.content.ai_response, "Entropy is a measure of disorder (ΔS ≥ 0).");
    assert_eq!(node.content.tokens_used, Some(42));
    assert_eq!(node.content.model.as_deref(), Some("gemini-2.5-pro-test"));

    let request = endpoint.received().await;
    assert!(request.request_line.starts_with("POST /v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse "));
    assert!(!request.request_line.contains("test-key"));
    assert_eq!(request.header("x-goog-api-key"), Some("test-key"));
    assert_eq!(request.body["contents"][0]["parts"][0]["text"], "What is entropy?");
    assert_eq!(request.body["generationConfig"]["temperature"], 0.7);
    let system = request.body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
    assert!(system.contains("Answer like a physicist."));
}

#[tokio::test]
async fn gemini_api_error_message_is_surfaced() {
    let endpoint = MockEndpoint::error(
        400,
        r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#,
    )
    .await;
    let store = Arc::new(CanvasStore::in_memory());
    let orchestrator = Orchestrator::new(StreamingPipeline::new(gemini(&endpoint), Arc::clone(&store)));

    let created = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = created.stream.join().await;
    assert_eq!(
        outcome,
        StreamOutcome::Failed {
            message: "API key not valid. Please pass a valid API key.".into()
        }
    );
    let answer = store.node(&created.id).unwrap().content.ai_response;
    assert!(answer.ends_with("Details: API key not valid. Please pass a valid API key."));
}

#[tokio::test]
async fn every_write_extends_the_previous_answer() {
    let recording = Recording::default();
    let store = Arc::new(CanvasStore::open(Box::new(recording.clone())).unwrap());
    let mut chunks: Vec<String> = ["Entropy", " is", " the", " number", " of", " microstates."]
        .iter()
        .map(|t| sse_data(t))
        .collect();
    chunks.insert(3, "data: {not json}\n\n".into());
    let backend = Arc::new(ScriptedBackend::from_chunks(chunks));
    let orchestrator = Orchestrator::new(StreamingPipeline::new(backend, Arc::clone(&store)));

    let created = orchestrator.create_root("What is entropy?").unwrap();
    let outcome = created.stream.join().await;
    assert!(matches!(outcome, StreamOutcome::Completed { chunks: 6, malformed: 1, .. }), "{outcome:?}");

    let answers = recording.answers(&created.id);
    assert!(answers.len() >= 7, "{answers:?}");
    assert_eq!(answers.first().map(String::as_str), Some(""));
    for pair in answers.windows(2) {
        assert!(pair[1].starts_with(&pair[0]), "{:?} does not extend {:?}", pair[1], pair[0]);
    }
    assert_eq!(answers.last().unwrap(), "Entropy is the number of microstates.");
}

#[tokio::test]
async fn error_replaces_partial_answer_once() {
    let recording = Recording::default();
    let store = Arc::new(CanvasStore::open(Box::new(recording.clone())).unwrap());
    let backend = Arc::new(ScriptedBackend::failing(503, "overloaded"));
    let orchestrator = Orchestrator::new(StreamingPipeline::new(backend, Arc::clone(&store)));

    let created = orchestrator.create_root("What is entropy?").unwrap();
    created.stream.join().await;

    let answers = recording.answers(&created.id);
    assert_eq!(answers.len(), 2, "{answers:?}");
    assert!(answers[1].contains("Failed to generate response."));
    assert!(answers[1].ends_with("Details: overloaded"));
}

#[tokio::test]
async fn reset_cancels_in_flight_streams() {
    let backend = Arc::new(ScriptedBackend::answering(&["partial"]).hanging());
    let orchestrator = ariadne_test::orchestrator_with(backend);

    let a = orchestrator.create_root("First?").unwrap();
    let b = orchestrator.create_root("Second?").unwrap();
    assert_eq!(orchestrator.active_streams(), 2);

    orchestrator.reset();
    assert_eq!(a.stream.join().await, StreamOutcome::Cancelled);
    assert_eq!(b.stream.join().await, StreamOutcome::Cancelled);
    assert!(orchestrator.store().is_empty());
    assert_eq!(orchestrator.active_streams(), 0);

    // Streams started after a reset are not born cancelled.
    let c = orchestrator.create_root("Third?").unwrap();
    assert!(!c.stream.is_cancelled());
    c.stream.cancel();
    c.stream.join().await;
}

#[tokio::test]
async fn deleting_a_node_cancels_only_its_stream() {
    let backend = Arc::new(ScriptedBackend::answering(&["partial"]).hanging());
    let orchestrator = ariadne_test::orchestrator_with(backend);

    let keep = orchestrator.create_root("Keep?").unwrap();
    let gone = orchestrator.create_root("Gone?").unwrap();
    orchestrator.delete_node(&gone.id);

    assert_eq!(gone.stream.join().await, StreamOutcome::Cancelled);
    assert!(!keep.stream.is_cancelled());
    assert_eq!(orchestrator.active_streams(), 1);
    keep.stream.cancel();
    keep.stream.join().await;
}
