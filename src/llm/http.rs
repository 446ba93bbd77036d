//! OpenAI-compatible chat-completions backend over HTTP.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ConvoFlowError, Result};
use crate::llm::backend::{GenerationBackend, GenerationReply, GenerationRequest};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, DeepSeek,
/// and lookalikes). Streaming requests are accumulated into a single reply.
#[derive(Clone)]
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatBackend {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to build HTTP client with custom config");
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1/chat/completions", api_key)
    }

    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("https://api.deepseek.com/v1/chat/completions", api_key)
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": request.model,
            "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": request.stream,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        })
    }

    async fn complete(&self, body: Value) -> Result<GenerationReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConvoFlowError::GenerationFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ConvoFlowError::GenerationFailed(format!(
                "backend returned {status}: {detail}"
            )));
        }
        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ConvoFlowError::GenerationFailed(e.to_string()))?;
        Ok(GenerationReply {
            content: extract_content(&parsed),
            metadata: Some(parsed),
        })
    }

    async fn complete_stream(&self, body: Value) -> Result<GenerationReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConvoFlowError::GenerationFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ConvoFlowError::GenerationFailed(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let mut stream = response.bytes_stream();
        let mut accumulator = SseAccumulator::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ConvoFlowError::GenerationFailed(e.to_string()))?;
            accumulator.push(&chunk);
            if accumulator.done {
                break;
            }
        }
        debug!(chars = accumulator.content.len(), "stream accumulated");
        Ok(GenerationReply {
            content: accumulator.content,
            metadata: None,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply> {
        if self.endpoint.is_empty() {
            return Err(ConvoFlowError::Other(anyhow!(
                "generation backend endpoint is not configured"
            )));
        }
        let body = self.build_body(&request);
        if request.stream {
            self.complete_stream(body).await
        } else {
            self.complete(body).await
        }
    }
}

/// First generated message's text, or empty string when the structure is
/// absent. Callers never need null-checks.
pub(crate) fn extract_content(response: &Value) -> String {
    response["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .and_then(|choice| choice["message"]["content"].as_str())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Accumulates `data:`-framed SSE chunks into one response string.
///
/// Handles both streaming `delta` objects and the non-streaming `message`
/// fallback some providers emit mid-stream.
struct SseAccumulator {
    buffer: String,
    content: String,
    done: bool,
}

impl SseAccumulator {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            content: String::new(),
            done: false,
        }
    }

    fn push(&mut self, data: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(data));
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            self.consume_line(line.trim());
        }
    }

    fn consume_line(&mut self, line: &str) {
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return;
        }
        let Ok(parsed) = serde_json::from_str::<Value>(data) else {
            // malformed chunks are skipped, matching the lenient SSE handling
            return;
        };
        let choice = &parsed["choices"][0];
        if let Some(delta) = choice["delta"]["content"].as_str() {
            self.content.push_str(delta);
        } else if let Some(message) = choice["message"]["content"].as_str() {
            self.content.push_str(message);
        }
    }
}
