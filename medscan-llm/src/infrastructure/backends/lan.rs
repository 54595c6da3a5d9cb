//! LAN server backend
//!
//! Talks to a caller-operated inference server on the local network. The
//! request shape follows the de-facto chat-completions convention that LAN
//! inference servers (Ollama, vLLM, llama.cpp server) expose, but response
//! parsing is deliberately lenient: no provider-specific schema is assumed,
//! and both chat-completions-shaped and generate-shaped payloads are
//! accepted.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use medscan_core::config::LanBackendConfig;

use crate::domain::{Backend, BackendError, BackendInfo, GenerationRequest, RawResponse, TokenUsage};

const DEFAULT_CONTEXT_WINDOW: usize = 8_192;
const DEFAULT_MAX_OUTPUT_TOKENS: usize = 2_048;

/// Adapter for LAN inference servers
#[derive(Debug)]
pub struct LanBackend {
    client: Client,
    config: LanBackendConfig,
}

impl LanBackend {
    pub fn new(config: LanBackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build HTTP client with custom timeout, using default client");
                Client::new()
            });

        Self { client, config }
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.server_url.trim_end_matches('/')
        )
    }

    /// Pull the generated text out of whatever shape the server returned.
    ///
    /// Tries, in order: chat-completions (`choices[0].message.content`),
    /// bare message (`message.content`), generate-style (`response`).
    fn extract_text(payload: &Value) -> Option<String> {
        if let Some(text) = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            return Some(text.to_string());
        }

        if let Some(text) = payload
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            return Some(text.to_string());
        }

        payload
            .get("response")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
    }

    fn extract_usage(payload: &Value) -> Option<TokenUsage> {
        let usage = payload.get("usage")?;
        Some(TokenUsage {
            prompt_tokens: usage.get("prompt_tokens")?.as_u64()? as u32,
            completion_tokens: usage.get("completion_tokens")?.as_u64()? as u32,
            total_tokens: usage.get("total_tokens")?.as_u64()? as u32,
        })
    }
}

#[async_trait]
impl Backend for LanBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "lan",
            name: "LAN Server",
            model: self.config.model.clone(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    async fn send(&self, request: GenerationRequest) -> Result<RawResponse, BackendError> {
        let url = self.chat_url();

        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(WireMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        let wire_request = WireRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        debug!(server = %self.config.server_url, model = %wire_request.model, "Sending request to LAN server");
        let started = Instant::now();

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.json(&wire_request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => BackendError::auth(body),
                429 => BackendError::rate_limited(body),
                500..=599 => BackendError::transient(body),
                _ => BackendError::malformed(format!("Server error {}: {}", status, body)),
            });
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(format!("Unparseable server response: {}", e)))?;

        let text = Self::extract_text(&payload).ok_or_else(|| {
            BackendError::malformed("Server response carried no recognizable text field")
        })?;

        let model = payload
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.model)
            .to_string();

        Ok(RawResponse {
            backend: "lan".to_string(),
            model,
            text,
            usage: Self::extract_usage(&payload),
            latency_ms,
        })
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_url() {
        let backend = LanBackend::new(LanBackendConfig {
            server_url: "http://192.168.1.20:11434/".to_string(),
            model: "llama3".to_string(),
            ..Default::default()
        });
        assert_eq!(
            backend.chat_url(),
            "http://192.168.1.20:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_text_chat_completions_shape() {
        let payload = json!({
            "choices": [{"message": {"content": "the analysis"}}]
        });
        assert_eq!(
            LanBackend::extract_text(&payload).as_deref(),
            Some("the analysis")
        );
    }

    #[test]
    fn test_extract_text_bare_message_shape() {
        let payload = json!({"message": {"content": "hello"}});
        assert_eq!(LanBackend::extract_text(&payload).as_deref(), Some("hello"));
    }

    #[test]
    fn test_extract_text_generate_shape() {
        let payload = json!({"response": "generated"});
        assert_eq!(
            LanBackend::extract_text(&payload).as_deref(),
            Some("generated")
        );
    }

    #[test]
    fn test_extract_text_unrecognized_shape() {
        let payload = json!({"output": "nope"});
        assert!(LanBackend::extract_text(&payload).is_none());
    }

    #[test]
    fn test_extract_usage_partial_is_none() {
        let payload = json!({"usage": {"prompt_tokens": 5}});
        assert!(LanBackend::extract_usage(&payload).is_none());
    }
}
