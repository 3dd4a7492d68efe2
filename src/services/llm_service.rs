//! HTTP client for Ollama's `/api/generate` endpoint.
//!
//! Two modes are supported: a single blocking JSON reply (used for image
//! transcription) and a newline-delimited JSON stream whose fragments are
//! accumulated and periodically pushed to the page. Failures never escape
//! this module as errors; [`TextGenerator`] turns them into reply text.

use std::fmt::Display;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use ollama_rs::Ollama;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config;

pub const CONNECTION_ERROR: &str = "⚠️ Error connecting to Ollama";
pub const NO_RESPONSE: &str = "⚠️ No response from Ollama.";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(error.to_string())
        }
    }
}

/// Reply text shown in place of an answer when the backend call failed.
pub fn error_reply(error: &LlmError) -> String {
    format!("{}: {}", CONNECTION_ERROR, error)
}

/// Body of a `POST /api/generate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl GenerateRequest {
    /// A chat turn, framed with the document context when there is one.
    pub fn chat(model: &str, prompt: &str, context: &str, stream: bool) -> Self {
        GenerateRequest {
            model: model.to_string(),
            prompt: build_prompt(prompt, context),
            stream,
            images: Vec::new(),
        }
    }

    /// A non-streaming request carrying one base64-encoded image.
    pub fn image(model: &str, prompt: &str, image: &[u8]) -> Self {
        GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            images: vec![STANDARD.encode(image)],
        }
    }
}

pub fn build_prompt(prompt: &str, context: &str) -> String {
    if context.is_empty() {
        return prompt.to_string();
    }
    format!(
        "Use the following document context to answer questions accurately:\n\n{}\n\nUser: {}\n\nAssistant:",
        context, prompt
    )
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Raw result of consuming a stream: everything received, untrimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub text: String,
    pub stopped: bool,
}

/// Appends one NDJSON line to `acc`. Returns `true` on the final chunk.
fn apply_line(line: &[u8], acc: &mut String) -> bool {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => {
            acc.push_str(&chunk.response);
            chunk.done
        }
        Err(e) => {
            debug!("Skipping malformed stream line ({}): {}", e, line);
            false
        }
    }
}

/// Reads NDJSON chunks from `stream` until it ends, a `done` chunk arrives or
/// `stop` fires. The accumulated text is sent to `updates` at most once per
/// `refresh` and always once at the end.
pub async fn consume_stream<S, E>(
    stream: S,
    stop: &CancellationToken,
    refresh: Duration,
    updates: &mpsc::Sender<String>,
) -> Result<StreamOutcome, LlmError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();
    let mut acc = String::new();
    let mut last_publish = Instant::now();
    let mut stopped = false;

    'read: loop {
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            if stop.is_cancelled() {
                stopped = true;
                break 'read;
            }
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if apply_line(&line, &mut acc) {
                break 'read;
            }
            if last_publish.elapsed() >= refresh {
                let _ = updates.send(acc.clone()).await;
                last_publish = Instant::now();
            }
        }

        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                stopped = true;
                break 'read;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
            Some(Err(e)) => return Err(LlmError::Network(format!("stream error: {}", e))),
            None => {
                if !stop.is_cancelled() {
                    apply_line(&buffer, &mut acc);
                }
                stopped = stop.is_cancelled();
                break;
            }
        }
    }

    let _ = updates.send(acc.clone()).await;
    Ok(StreamOutcome { text: acc, stopped })
}

/// The seam between chat handling and the model backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One blocking request; the reply or an error text.
    async fn generate(&self, request: GenerateRequest) -> String;

    /// Streams a reply, pushing partial text to `updates`. Returns the final
    /// reply or an error text.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
        stop: CancellationToken,
        updates: mpsc::Sender<String>,
    ) -> String;
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
    refresh: Duration,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, refresh: Duration) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(OllamaClient {
            http,
            endpoint: endpoint.into(),
            timeout,
            refresh,
        })
    }

    pub fn from_config() -> Result<Self, LlmError> {
        Self::new(
            config::generate_endpoint(),
            config::ollama_timeout(),
            config::stream_refresh_interval(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::Status { status: status.as_u16(), body })
    }

    /// Single request bounded by the full timeout.
    pub async fn generate_once(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(chunk.response.trim().to_string())
    }

    /// Streams a reply. The timeout covers connecting and receiving headers
    /// only; a stop before or during the body drops the connection.
    pub async fn generate_streaming(
        &self,
        request: &GenerateRequest,
        stop: &CancellationToken,
        updates: &mpsc::Sender<String>,
    ) -> Result<StreamOutcome, LlmError> {
        let send = self.http.post(&self.endpoint).json(request).send();
        let response = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                return Ok(StreamOutcome { text: String::new(), stopped: true });
            }
            sent = tokio::time::timeout(self.timeout, send) => {
                sent.map_err(|_| LlmError::Timeout)??
            }
        };
        let response = Self::check_status(response).await?;
        consume_stream(response.bytes_stream(), stop, self.refresh, updates).await
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> String {
        match self.generate_once(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Generation with {} failed: {}", request.model, e);
                format!("⚠️ Error: {}", e)
            }
        }
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        stop: CancellationToken,
        updates: mpsc::Sender<String>,
    ) -> String {
        match self.generate_streaming(&request, &stop, &updates).await {
            Ok(outcome) => {
                if outcome.stopped {
                    info!("Generation stopped after {} bytes", outcome.text.len());
                }
                let text = outcome.text.trim();
                if text.is_empty() {
                    NO_RESPONSE.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(e) => {
                warn!("Streaming generation with {} failed: {}", request.model, e);
                error_reply(&e)
            }
        }
    }
}

/// Names of the models installed on the Ollama server.
pub async fn list_models(ollama: &Ollama) -> Vec<String> {
    match ollama.list_local_models().await {
        Ok(models) => models.into_iter().map(|m| m.name).collect(),
        Err(e) => {
            warn!("Failed to list Ollama models: {}", e);
            Vec::new()
        }
    }
}
