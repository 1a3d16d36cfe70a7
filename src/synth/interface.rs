use crate::audio::Blob;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use thiserror::Error;

// ── Error Types ────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis request failed: {0}")]
    Network(String),

    #[error("Synthesis endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Failed to read synthesized audio: {0}")]
    Body(String),
}

// ── Request / Response ─────────────────────────────────

/// Snapshot of the form at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynthesisRequest {
    /// Named parameter fields in form order.
    pub fields: Vec<(String, String)>,
    pub text: String,
    /// Send the text as phonetic input, skipping server-side conversion.
    pub native: bool,
}

impl SynthesisRequest {
    /// Form entries in submission order. `native` is only present when set,
    /// like an unchecked checkbox.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::with_capacity(self.fields.len() + 2);
        entries.push(("text".to_string(), self.text.clone()));
        if self.native {
            entries.push(("native".to_string(), "1".to_string()));
        }
        entries.extend(self.fields.iter().cloned());
        entries
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub headers: HeaderMap,
    pub audio: Blob,
}

// ── Synthesizer Trait ──────────────────────────────────

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Submit the form once. No retries.
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError>;
}
