//! Incremental decoder for the endpoint's server-sent-events body.
//!
//! Bytes arrive in arbitrary chunks: a UTF-8 sequence or an SSE line may be
//! split across reads. [`SseDecoder`] holds back incomplete input until the
//! rest arrives and yields one [`SseEvent`] per complete `data: ` line.

use serde::Deserialize;

const DATA_PREFIX: &str = "data: ";

/// One decoded `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A payload that parsed as a generation chunk.
    Chunk(GenerationChunk),
    /// A payload that was not valid JSON. Skipped by consumers.
    Malformed(String),
}

/// The parts of a streamed payload Ariadne cares about. Every level is
/// optional; a missing level yields an empty delta rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationChunk {
    pub text: String,
    pub total_tokens: Option<u64>,
    pub model_version: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ChunkPayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

/// Parse the JSON after `data: ` into a [`GenerationChunk`].
///
/// Only the first candidate's first part is read.
pub fn parse_payload(payload: &str) -> Result<GenerationChunk, serde_json::Error> {
    let parsed: ChunkPayload = serde_json::from_str(payload)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .unwrap_or_default();
    Ok(GenerationChunk {
        text,
        total_tokens: parsed.usage_metadata.and_then(|u| u.total_token_count),
        model_version: parsed.model_version,
    })
}

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns events for every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete.split('\n').filter_map(decode_line).collect()
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.buffer.push_str(&tail);
            self.pending.clear();
        }
        decode_line(&self.buffer)
    }

    /// Move the longest valid UTF-8 prefix of `pending` into `buffer`,
    /// replacing invalid sequences with U+FFFD and keeping an incomplete
    /// trailing sequence for the next chunk.
    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // `valid_up_to` is a char boundary.
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn decode_line(line: &str) -> Option<SseEvent> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(match parse_payload(payload) {
        Ok(chunk) => SseEvent::Chunk(chunk),
        Err(_) => SseEvent::Malformed(payload.to_string()),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
