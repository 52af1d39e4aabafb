//! Streaming ingestion: turn an endpoint's SSE body into store updates.
//!
//! Each spawned stream owns a [`CancellationToken`]. The token is raced
//! against every network read and checked before every store write, so a
//! cancelled stream never touches its node again.
//!
//! Per node the content moves `empty → streaming → complete`, or ends in
//! `error` (one replacement write) or `cancelled` (no further writes).

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AriadneError, LlmError};
use crate::llm::sse::{SseDecoder, SseEvent};
use crate::llm::{GenerationBackend, GenerationRequest};
use crate::store::CanvasStore;
use crate::types::{ContentPatch, NodeId};

/// Temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

const ERROR_PREFIX: &str = "### Error\n\nFailed to generate response.";

/// Text written into a node whose stream failed.
pub fn error_response(details: &str) -> String {
    format!("{ERROR_PREFIX}\n\nDetails: {details}")
}

/// Whether an answer is the text [`error_response`] produces.
pub fn is_error_response(answer: &str) -> bool {
    answer.starts_with(ERROR_PREFIX)
}

/// The human-facing part of a stream failure: the endpoint's own message for
/// API errors, the bare LLM error otherwise.
fn failure_details(err: &AriadneError) -> String {
    match err {
        AriadneError::Llm(LlmError::ApiError { message, .. }) => message.clone(),
        AriadneError::Llm(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

/// One answer to generate into an existing node.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub node_id: NodeId,
    pub prompt: String,
    pub system_instruction: String,
}

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed {
        /// Parsed `data:` payloads applied to the node.
        chunks: usize,
        /// `data:` lines skipped because they were not valid JSON.
        malformed: usize,
        /// Length of the final answer in chars.
        chars: usize,
    },
    /// The node now holds the error text.
    Failed { message: String },
    Cancelled,
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A running stream. Dropping the handle does not stop the stream.
#[derive(Debug)]
pub struct StreamHandle {
    node_id: NodeId,
    cancel: CancellationToken,
    task: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Stop the stream. The task checks the token before each store write.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the stream's token, for cancelling from elsewhere.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Observes the task without owning it.
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Wait for the stream to end.
    pub async fn join(self) -> StreamOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => StreamOutcome::Cancelled,
            Err(e) => StreamOutcome::Failed {
                message: format!("stream task failed: {e}"),
            },
        }
    }
}

/// Spawns streams against one backend and writes their output into one store.
#[derive(Debug, Clone)]
pub struct StreamingPipeline {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<CanvasStore>,
    temperature: f64,
}

impl StreamingPipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, store: Arc<CanvasStore>) -> Self {
        Self {
            backend,
            store,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn store(&self) -> &Arc<CanvasStore> {
        &self.store
    }

    /// Start streaming into `request.node_id` on the current tokio runtime.
    pub fn spawn(&self, request: StreamRequest) -> StreamHandle {
        self.spawn_with_token(request, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), with a caller-supplied token (e.g. a
    /// child of a canvas-wide token).
    pub fn spawn_with_token(&self, request: StreamRequest, cancel: CancellationToken) -> StreamHandle {
        let node_id = request.node_id.clone();
        let pipeline = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { pipeline.run(request, token).await });
        StreamHandle {
            node_id,
            cancel,
            task,
        }
    }

    /// Drive one stream to its end on the current task.
    pub async fn run(&self, request: StreamRequest, cancel: CancellationToken) -> StreamOutcome {
        let generation = GenerationRequest {
            prompt: request.prompt,
            system_instruction: request.system_instruction,
            temperature: self.temperature,
        };
        let mut ingest = Ingest::new(&self.store, request.node_id, &cancel);

        debug!(
            node = %ingest.node_id,
            backend = self.backend.name(),
            model = self.backend.model_id(),
            "Opening answer stream"
        );

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamOutcome::Cancelled,
            opened = self.backend.open_stream(&generation) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => return ingest.fail(&e),
        };

        let mut decoder = SseDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return StreamOutcome::Cancelled,
                next = body.next() => next,
            };
            match next {
                Some(Ok(bytes)) => {
                    for event in decoder.push(&bytes) {
                        if !ingest.apply(event) {
                            return StreamOutcome::Cancelled;
                        }
                    }
                }
                Some(Err(e)) => return ingest.fail(&e),
                None => break,
            }
        }
        if let Some(event) = decoder.finish() {
            if !ingest.apply(event) {
                return StreamOutcome::Cancelled;
            }
        }

        ingest.complete(self.backend.model_id())
    }
}

/// Accumulator and counters for one stream.
struct Ingest<'a> {
    store: &'a CanvasStore,
    node_id: NodeId,
    cancel: &'a CancellationToken,
    answer: String,
    chunks: usize,
    malformed: usize,
    total_tokens: Option<u64>,
    model_version: Option<String>,
}

impl<'a> Ingest<'a> {
    fn new(store: &'a CanvasStore, node_id: NodeId, cancel: &'a CancellationToken) -> Self {
        Self {
            store,
            node_id,
            cancel,
            answer: String::new(),
            chunks: 0,
            malformed: 0,
            total_tokens: None,
            model_version: None,
        }
    }

    /// Apply one decoded event. Returns `false` once cancelled.
    fn apply(&mut self, event: SseEvent) -> bool {
        match event {
            SseEvent::Chunk(chunk) => {
                self.answer.push_str(&chunk.text);
                self.chunks += 1;
                if chunk.total_tokens.is_some() {
                    self.total_tokens = chunk.total_tokens;
                }
                if chunk.model_version.is_some() {
                    self.model_version = chunk.model_version;
                }
                if self.cancel.is_cancelled() {
                    return false;
                }
                self.store
                    .update_node_content(&self.node_id, ContentPatch::response(self.answer.clone()));
            }
            SseEvent::Malformed(line) => {
                self.malformed += 1;
                debug!(node = %self.node_id, bytes = line.len(), "Skipping malformed SSE payload");
            }
        }
        !self.cancel.is_cancelled()
    }

    fn complete(self, backend_model: &str) -> StreamOutcome {
        if self.cancel.is_cancelled() {
            return StreamOutcome::Cancelled;
        }
        if self.chunks == 0 && self.malformed > 0 {
            warn!(
                node = %self.node_id,
                malformed = self.malformed,
                "Stream ended without a single parseable payload"
            );
        }
        self.store.update_node_content(
            &self.node_id,
            ContentPatch {
                ai_response: None,
                model: Some(
                    self.model_version
                        .unwrap_or_else(|| backend_model.to_string()),
                ),
                tokens_used: self.total_tokens,
            },
        );
        debug!(node = %self.node_id, chunks = self.chunks, chars = self.answer.chars().count(), "Answer stream complete");
        StreamOutcome::Completed {
            chunks: self.chunks,
            malformed: self.malformed,
            chars: self.answer.chars().count(),
        }
    }

    fn fail(self, err: &AriadneError) -> StreamOutcome {
        if self.cancel.is_cancelled() {
            return StreamOutcome::Cancelled;
        }
        let message = failure_details(err);
        warn!(node = %self.node_id, error = %err, "Answer stream failed");
        self.store
            .update_node_content(&self.node_id, ContentPatch::response(error_response(&message)));
        StreamOutcome::Failed { message }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
