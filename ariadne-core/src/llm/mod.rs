pub mod gemini;
pub mod prompt;
pub mod sse;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::config::ModelSection;
use crate::error::{AriadneError, LlmError};

pub use gemini::GeminiProvider;

/// Raw response body, chunk by chunk, as it arrives from the endpoint.
pub type ByteStream = BoxStream<'static, crate::error::Result<Bytes>>;

/// Everything the endpoint needs for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: String,
    pub temperature: f64,
}

/// Common interface for text-generation endpoints that answer with an
/// SSE-formatted byte stream.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync + std::fmt::Debug {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// The model ID being used.
    fn model_id(&self) -> &str;

    /// Send the request and hand back the response body as a byte stream.
    ///
    /// Non-success statuses and a missing body are errors here; transport
    /// failures mid-body surface as `Err` items in the stream.
    async fn open_stream(&self, request: &GenerationRequest) -> crate::error::Result<ByteStream>;
}

/// Create a backend from the `[model]` config section and an API key.
pub fn create_backend(
    model: &ModelSection,
    api_key: &str,
) -> crate::error::Result<Box<dyn GenerationBackend>> {
    if api_key.trim().is_empty() {
        return Err(AriadneError::Llm(LlmError::Config(format!(
            "api_key not set (export {})",
            model.api_key_env
        ))));
    }
    match model.provider.as_str() {
        "gemini" => {
            let mut provider = GeminiProvider::new(api_key.to_string(), model.name.clone());
            if let Some(url) = &model.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Ok(Box::new(provider))
        }
        other => Err(AriadneError::Llm(LlmError::Config(format!(
            "Unknown provider: {other}. Use: gemini"
        )))),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_backend_factory() {
        let model = ModelSection::default();
        let backend = create_backend(&model, "key").unwrap();
        assert_eq!(backend.name(), "gemini");
        assert_eq!(backend.model_id(), "gemini-2.5-pro");

        let custom = ModelSection {
            base_url: Some("http://localhost:8080".into()),
            ..ModelSection::default()
        };
        assert!(create_backend(&custom, "key").is_ok());

        let unknown = ModelSection {
            provider: "acme".into(),
            ..ModelSection::default()
        };
        assert!(create_backend(&unknown, "key").is_err());
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = create_backend(&ModelSection::default(), "  ").unwrap_err();
        assert!(matches!(err, AriadneError::Llm(LlmError::Config(_))));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
