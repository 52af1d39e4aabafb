// Gemini streaming provider: `streamGenerateContent` with `alt=sse`.
// The key travels in the `x-goog-api-key` header so it never appears in a URL.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AriadneError, LlmError};

use super::{ByteStream, GenerationBackend, GenerationRequest};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        // reqwest is built without a bundled crypto provider; the first
        // install wins and later calls are no-ops.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

/// reqwest errors render their URL; strip it before the text reaches a node.
fn network_error(e: reqwest::Error) -> AriadneError {
    AriadneError::Llm(LlmError::Network(e.without_url().to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    system_instruction: GeminiInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

impl<'a> GeminiRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: GeminiInstruction {
                parts: vec![GeminiPart {
                    text: &request.system_instruction,
                }],
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: Option<GeminiErrorDetail>,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

/// Pull `error.message` out of an error body, falling back to the status.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<GeminiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("API error: {status}"))
}

#[async_trait::async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl GenerationBackend for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, request: &GenerationRequest) -> crate::error::Result<ByteStream> {
        let body = GeminiRequest::from_request(request);

        debug!(model = %self.model, prompt_chars = request.prompt.len(), "Calling Gemini streaming API");

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AriadneError::Llm(LlmError::ApiError {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &text),
            }));
        }

        if resp.content_length() == Some(0) {
            return Err(AriadneError::Llm(LlmError::MissingBody));
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(network_error));
        Ok(stream.boxed())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
