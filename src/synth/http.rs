use super::interface::{SynthesisError, SynthesisOutput, SynthesisRequest, Synthesizer};
use crate::audio::Blob;
use crate::config::ConsoleConfig;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::Client;

const DEFAULT_AUDIO_MIME: &str = "audio/wav";

/// Posts the parameter form to the synthesis endpoint as multipart data.
pub struct HttpSynthesizer {
    client: Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: &str, timeout: std::time::Duration) -> Self {
        Self::with_client(
            Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint,
        )
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(&config.endpoint, config.request_timeout())
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        let form = request
            .entries()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        tracing::debug!(
            "[Synth] POST {} ({} chars, native={})",
            self.endpoint,
            request.text.chars().count(),
            request.native
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CACHE_CONTROL, "no-store")
            .multipart(form)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Status(status.as_u16()));
        }

        let headers = response.headers().clone();
        let mime = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Body(e.to_string()))?;

        tracing::debug!("[Synth] Received {} bytes ({})", bytes.len(), mime);
        Ok(SynthesisOutput {
            headers,
            audio: Blob::new(bytes.to_vec(), &mime),
        })
    }
}
