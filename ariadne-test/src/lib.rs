// Integration test utilities and fixtures for Ariadne.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ariadne_core::error::{AriadneError, LlmError};
use ariadne_core::llm::{ByteStream, GenerationBackend, GenerationRequest};
use ariadne_core::orchestrator::Orchestrator;
use ariadne_core::store::{CanvasStore, JsonFilePersistence};
use ariadne_core::stream::StreamingPipeline;

/// One SSE `data:` line carrying `text` as the first candidate's first part.
pub fn sse_data(text: &str) -> String {
    let payload = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    });
    format!("data: {payload}\n\n")
}

/// A full SSE body: one line per text, then a usage line.
pub fn sse_body(texts: &[&str], total_tokens: u64) -> String {
    let mut body: String = texts.iter().map(|t| sse_data(t)).collect();
    let usage = serde_json::json!({
        "candidates": [],
        "usageMetadata": { "totalTokenCount": total_tokens },
        "modelVersion": "gemini-2.5-pro-test"
    });
    body.push_str(&format!("data: {usage}\n\n"));
    body
}

// ── Scripted backend ────────────────────────────────────────────────

/// A [`GenerationBackend`] that replays canned body chunks and records
/// every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    chunks: Vec<Bytes>,
    open_error: Option<(u16, String)>,
    /// Keep the body open after the last chunk until cancelled.
    hang: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Answer every request with one SSE line per text.
    pub fn answering(texts: &[&str]) -> Self {
        Self::from_chunks(texts.iter().map(|t| sse_data(t)).collect::<Vec<_>>())
    }

    /// Replay raw body chunks exactly as given.
    pub fn from_chunks<T: Into<Bytes>>(chunks: Vec<T>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Refuse to open, as an endpoint answering with a non-success status.
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            open_error: Some((status, message.to_string())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> ariadne_core::error::Result<ByteStream> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request.clone());
        if let Some((status, message)) = &self.open_error {
            return Err(AriadneError::Llm(LlmError::ApiError {
                status: *status,
                message: message.clone(),
            }));
        }
        let body = futures::stream::iter(self.chunks.clone().into_iter().map(Ok));
        if self.hang {
            Ok(body.chain(futures::stream::pending()).boxed())
        } else {
            Ok(body.boxed())
        }
    }
}

/// An orchestrator over an in-memory store driven by `backend`.
pub fn orchestrator_with(backend: Arc<ScriptedBackend>) -> Orchestrator {
    let store = Arc::new(CanvasStore::in_memory());
    Orchestrator::new(StreamingPipeline::new(backend, store))
}

// ── Mock HTTP endpoint ──────────────────────────────────────────────

/// What the mock endpoint received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    /// Header names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A local HTTP server that answers exactly one request and then closes.
#[derive(Debug)]
pub struct MockEndpoint {
    pub base_url: String,
    task: JoinHandle<RecordedRequest>,
}

impl MockEndpoint {
    /// Serve `body` as `text/event-stream` with status 200, written in
    /// `split` pieces so the client sees several reads.
    pub async fn sse(body: String, split: usize) -> Self {
        let bytes = body.into_bytes();
        let piece = bytes.len().div_ceil(split.max(1)).max(1);
        let chunks = bytes.chunks(piece).map(<[u8]>::to_vec).collect();
        Self::serve(200, "text/event-stream", chunks).await
    }

    /// Serve `body` with a non-success `status`.
    pub async fn error(status: u16, body: &str) -> Self {
        Self::serve(status, "application/json", vec![body.as_bytes().to_vec()]).await
    }

    async fn serve(status: u16, content_type: &'static str, chunks: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock endpoint");
        let addr = listener.local_addr().expect("mock endpoint address");
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            let recorded = read_request(&mut socket).await;

            let length: usize = chunks.iter().map(Vec::len).sum();
            let head = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: {content_type}\r\ncontent-length: {length}\r\nconnection: close\r\n\r\n",
                reason(status)
            );
            socket.write_all(head.as_bytes()).await.expect("write head");
            for chunk in chunks {
                socket.write_all(&chunk).await.expect("write body");
                socket.flush().await.expect("flush body");
                tokio::task::yield_now().await;
            }
            let _ = socket.shutdown().await;
            recorded
        });
        Self {
            base_url: format!("http://{addr}"),
            task,
        }
    }

    /// Wait for the request to be served and return what was received.
    pub async fn received(self) -> RecordedRequest {
        self.task.await.expect("mock endpoint task")
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> RecordedRequest {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut buf).await.expect("read request");
        assert!(n > 0, "connection closed before headers ended");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let headers: Vec<(String, String)> = head
        .lines()
        .skip(1)
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let n = socket.read(&mut buf).await.expect("read body");
        assert!(n > 0, "connection closed before body ended");
        raw.extend_from_slice(&buf[..n]);
    }
    let body = &raw[header_end..header_end + content_length];
    RecordedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        headers,
        body: serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
    }
}

// ── Workspace on disk ───────────────────────────────────────────────

/// A temporary directory holding a file-backed canvas.
#[derive(Debug)]
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn canvas_path(&self) -> PathBuf {
        self.path().join("canvas.json")
    }

    /// Open (or reopen) the store backed by `canvas.json`.
    pub fn open_store(&self) -> CanvasStore {
        CanvasStore::open(Box::new(JsonFilePersistence::new(self.canvas_path())))
            .expect("open canvas store")
    }

    /// Write `contents` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
