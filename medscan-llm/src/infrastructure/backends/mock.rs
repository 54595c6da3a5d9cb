//! Mock backend
//!
//! Deterministic canned responses for testing the orchestration stack
//! without a real model. Never fails unless a failure is scripted in the
//! configuration; the failure script exists so orchestrator failure paths
//! (retry exhaustion, non-retryable short-circuit, all-chunks-failed) can
//! be exercised deterministically.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use medscan_core::config::{MockBackendConfig, MockFailureKind, MockKeying};

use crate::domain::{Backend, BackendError, BackendInfo, GenerationRequest, RawResponse, TokenUsage};

const MOCK_CONTEXT_WINDOW: usize = 8_192;
const MOCK_MAX_OUTPUT_TOKENS: usize = 2_048;

/// Deterministic test adapter
#[derive(Debug)]
pub struct MockBackend {
    config: MockBackendConfig,
    /// Total `send` calls over the adapter's lifetime, failures included
    calls: AtomicU32,
    /// Successful responses handed out; drives rotation keying
    rotation: AtomicUsize,
    /// Prompts seen, for assertions in tests
    captured_prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(config: MockBackendConfig) -> Self {
        Self {
            config,
            calls: AtomicU32::new(0),
            rotation: AtomicUsize::new(0),
            captured_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Total calls made so far, failures included.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts captured from every call, in call order.
    pub async fn captured_prompts(&self) -> Vec<String> {
        self.captured_prompts.lock().await.clone()
    }

    fn scripted_error(&self) -> BackendError {
        match self.config.failure_kind {
            MockFailureKind::Transient => BackendError::transient("scripted transient failure"),
            MockFailureKind::Timeout => BackendError::timeout(1),
            MockFailureKind::Auth => BackendError::auth("scripted auth failure"),
            MockFailureKind::ResourceExhausted => {
                BackendError::resource_exhausted("scripted resource exhaustion")
            }
        }
    }

    fn select_response(&self, prompt: &str) -> String {
        let responses = &self.config.responses;
        let index = match self.config.keying {
            MockKeying::Rotation => self.rotation.fetch_add(1, Ordering::SeqCst) % responses.len(),
            MockKeying::InputHash => {
                let mut hasher = DefaultHasher::new();
                prompt.hash(&mut hasher);
                (hasher.finish() as usize) % responses.len()
            }
        };
        responses[index].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "mock",
            name: "Mock Backend",
            model: "mock".to_string(),
            context_window: MOCK_CONTEXT_WINDOW,
            max_output_tokens: MOCK_MAX_OUTPUT_TOKENS,
        }
    }

    async fn send(&self, request: GenerationRequest) -> Result<RawResponse, BackendError> {
        let started = Instant::now();
        self.captured_prompts
            .lock()
            .await
            .push(request.prompt.clone());

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_always || call_index < self.config.fail_first_calls {
            return Err(self.scripted_error());
        }

        let text = self.select_response(&request.prompt);
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (text.len() / 4) as u32;

        Ok(RawResponse {
            backend: "mock".to_string(),
            model: "mock".to_string(),
            text,
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(responses: Vec<&str>) -> MockBackendConfig {
        MockBackendConfig {
            responses: responses.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rotation_cycles_responses() {
        let backend = MockBackend::new(config_with(vec!["a", "b"]));

        let first = backend.send(GenerationRequest::new("x")).await.unwrap();
        let second = backend.send(GenerationRequest::new("y")).await.unwrap();
        let third = backend.send(GenerationRequest::new("z")).await.unwrap();

        assert_eq!(first.text, "a");
        assert_eq!(second.text, "b");
        assert_eq!(third.text, "a");
    }

    #[tokio::test]
    async fn test_input_hash_is_stable() {
        let mut config = config_with(vec!["a", "b", "c"]);
        config.keying = MockKeying::InputHash;
        let backend = MockBackend::new(config);

        let first = backend
            .send(GenerationRequest::new("same prompt"))
            .await
            .unwrap();
        let second = backend
            .send(GenerationRequest::new("same prompt"))
            .await
            .unwrap();

        assert_eq!(first.text, second.text);
    }

    #[tokio::test]
    async fn test_fail_first_calls_then_succeed() {
        let mut config = config_with(vec!["ok"]);
        config.fail_first_calls = 2;
        let backend = MockBackend::new(config);

        assert!(backend.send(GenerationRequest::new("p")).await.is_err());
        assert!(backend.send(GenerationRequest::new("p")).await.is_err());
        let response = backend.send(GenerationRequest::new("p")).await.unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fail_always_never_succeeds() {
        let mut config = MockBackendConfig::default();
        config.fail_always = true;
        let backend = MockBackend::new(config);

        for _ in 0..5 {
            assert!(backend.send(GenerationRequest::new("p")).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_scripted_auth_failure_is_not_retryable() {
        let mut config = config_with(vec!["ok"]);
        config.fail_always = true;
        config.failure_kind = MockFailureKind::Auth;
        let backend = MockBackend::new(config);

        let err = backend.send(GenerationRequest::new("p")).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_captures_prompts() {
        let backend = MockBackend::new(config_with(vec!["ok"]));
        backend
            .send(GenerationRequest::new("first"))
            .await
            .unwrap();
        backend
            .send(GenerationRequest::new("second"))
            .await
            .unwrap();

        let prompts = backend.captured_prompts().await;
        assert_eq!(prompts, vec!["first".to_string(), "second".to_string()]);
    }
}
