//! Hosted API backend
//!
//! Talks to a provider-operated chat-completions API over HTTPS with
//! bearer authentication. Authentication failures are surfaced as
//! [`BackendError::Auth`], distinct from transient network failures, so a
//! bad credential is never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use medscan_core::config::HostedBackendConfig;

use crate::domain::{Backend, BackendError, BackendInfo, GenerationRequest, RawResponse, TokenUsage};

const DEFAULT_CONTEXT_WINDOW: usize = 128_000;
const DEFAULT_MAX_OUTPUT_TOKENS: usize = 4_096;

/// Adapter for hosted chat-completions APIs
#[derive(Debug)]
pub struct HostedBackend {
    client: Client,
    config: HostedBackendConfig,
}

impl HostedBackend {
    pub fn new(config: HostedBackendConfig) -> Self {
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
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn to_wire_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.prompt.clone()),
        });

        ChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_wire_response(&self, response: ChatResponse, latency_ms: u64) -> RawResponse {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        RawResponse {
            backend: "hosted".to_string(),
            model: response.model,
            text,
            usage,
            latency_ms,
        }
    }

    fn map_error_status(status: reqwest::StatusCode, body: String, retry_after: Option<u64>) -> BackendError {
        match status.as_u16() {
            401 | 403 => BackendError::auth(body),
            429 => match retry_after {
                Some(secs) => BackendError::rate_limited_with_retry(body, secs),
                None => BackendError::rate_limited(body),
            },
            500..=599 => BackendError::transient(body),
            _ => BackendError::malformed(format!("API error {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl Backend for HostedBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "hosted",
            name: "Hosted API",
            model: self.config.model.clone(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    async fn send(&self, request: GenerationRequest) -> Result<RawResponse, BackendError> {
        let url = self.chat_url();
        let wire_request = self.to_wire_request(&request);

        debug!(model = %wire_request.model, "Sending request to hosted API");
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();

            error!(status = %status, "Hosted API error: {}", body);
            return Err(Self::map_error_status(status, body, retry_after));
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let wire_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(format!("Unparseable API response: {}", e)))?;

        Ok(self.parse_wire_response(wire_response, latency_ms))
    }
}

// === Wire types ===

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> HostedBackendConfig {
        HostedBackendConfig {
            api_key: "test-key".to_string(),
            model: "gpt-4o".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_chat_url() {
        let backend = HostedBackend::new(test_config());
        assert_eq!(
            backend.chat_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let mut config = test_config();
        config.base_url = "http://gateway.internal/v1/".to_string();
        let backend = HostedBackend::new(config);
        assert_eq!(backend.chat_url(), "http://gateway.internal/v1/chat/completions");
    }

    #[test]
    fn test_wire_request_includes_system() {
        let backend = HostedBackend::new(test_config());
        let request = GenerationRequest::new("analyze").with_system("auditor");
        let wire = backend.to_wire_request(&request);

        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.model, "gpt-4o");
    }

    #[test]
    fn test_auth_errors_are_distinct_from_transient() {
        let err = HostedBackend::map_error_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key".to_string(),
            None,
        );
        assert!(matches!(err, BackendError::Auth(_)));
        assert!(!err.is_retryable());

        let err = HostedBackend::map_error_status(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down".to_string(),
            None,
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let err = HostedBackend::map_error_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
            Some(12),
        );
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(12)));
    }
}
