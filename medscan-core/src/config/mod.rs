//! Configuration descriptors
//!
//! These types describe *what* the analysis core should talk to; parsing
//! them out of files or UI state is the host application's job. A
//! descriptor is immutable once constructed and is validated eagerly
//! before any adapter is built from it.

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend descriptor, discriminated by `backend_type`.
///
/// Each variant carries exactly the fields its transport needs. Unknown
/// `backend_type` values fail at deserialization time, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend_type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Hosted API over the network (authenticated, provider-operated)
    Hosted(HostedBackendConfig),
    /// Caller-operated server on the local network
    Lan(LanBackendConfig),
    /// In-process inference from a file-backed model
    Local(LocalBackendConfig),
    /// Deterministic canned responses for testing
    Mock(MockBackendConfig),
}

impl BackendConfig {
    /// Short identifier for the variant, used in logs and adapter info.
    pub fn backend_type(&self) -> &'static str {
        match self {
            Self::Hosted(_) => "hosted",
            Self::Lan(_) => "lan",
            Self::Local(_) => "local",
            Self::Mock(_) => "mock",
        }
    }
}

impl Validate for BackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Hosted(c) => c.validate(),
            Self::Lan(c) => c.validate(),
            Self::Local(c) => c.validate(),
            Self::Mock(c) => c.validate(),
        }
    }
}

/// Hosted API backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedBackendConfig {
    /// API key for bearer authentication
    pub api_key: String,
    /// Model name to request
    pub model: String,
    /// Embedding model name, if the deployment exposes one
    pub embedding_model: Option<String>,
    /// Base URL of the chat-completions API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HostedBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            embedding_model: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Validate for HostedBackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::hosted("api_key is required"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::hosted("model is required"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::hosted("base_url must not be empty"));
        }
        if self.timeout_seconds == 0 {
            return Err(ValidationError::hosted("timeout_seconds must be positive"));
        }
        Ok(())
    }
}

/// LAN server backend configuration
///
/// Points at a caller-operated inference server. Unlike [`HostedBackendConfig`]
/// the API key is optional and no provider-specific response schema is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanBackendConfig {
    /// Server URL, e.g. `http://192.168.1.20:11434`
    pub server_url: String,
    /// Optional API key; sent as a bearer token when present
    pub api_key: Option<String>,
    /// Model name to request
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LanBackendConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_key: None,
            model: String::new(),
            timeout_seconds: 120,
        }
    }
}

impl Validate for LanBackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.server_url.trim().is_empty() {
            return Err(ValidationError::lan("server_url is required"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::lan("model is required"));
        }
        if self.timeout_seconds == 0 {
            return Err(ValidationError::lan("timeout_seconds must be positive"));
        }
        Ok(())
    }
}

/// Local in-process backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalBackendConfig {
    /// Path to the GGUF model file
    pub model_path: String,
    /// Path to the tokenizer definition (tokenizer.json)
    pub tokenizer_path: String,
    /// Tokens fed per forward pass during prompt prefill
    pub batch_size: usize,
    /// Context window in tokens; prompts are truncated to fit
    pub context_window: usize,
    /// Maximum tokens to generate per request
    pub max_output_tokens: usize,
    /// Sampling temperature
    pub temperature: f64,
    /// Sampling seed for reproducible runs
    pub seed: u64,
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            tokenizer_path: String::new(),
            batch_size: 64,
            context_window: 4096,
            max_output_tokens: 1024,
            temperature: 0.3,
            seed: 299792458,
        }
    }
}

impl Validate for LocalBackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.model_path.trim().is_empty() {
            return Err(ValidationError::local("model_path is required"));
        }
        if self.tokenizer_path.trim().is_empty() {
            return Err(ValidationError::local("tokenizer_path is required"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::local("batch_size must be positive"));
        }
        if self.context_window == 0 {
            return Err(ValidationError::local("context_window must be positive"));
        }
        if self.max_output_tokens == 0 {
            return Err(ValidationError::local("max_output_tokens must be positive"));
        }
        Ok(())
    }
}

/// How the mock backend selects a canned response for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockKeying {
    /// Cycle through the configured responses in order
    #[default]
    Rotation,
    /// Pick a response by hashing the request prompt
    InputHash,
}

/// Which error the mock backend simulates when a scripted failure fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockFailureKind {
    /// Retryable transient failure
    #[default]
    Transient,
    /// Retryable timeout
    Timeout,
    /// Non-retryable authentication failure
    Auth,
    /// Non-retryable resource exhaustion
    ResourceExhausted,
}

/// Mock backend configuration
///
/// The mock never fails unless a failure is scripted here; the failure
/// script exists so orchestrator failure paths can be exercised
/// deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MockBackendConfig {
    /// Canned response payloads
    pub responses: Vec<String>,
    /// Response selection mode
    pub keying: MockKeying,
    /// Fail the first N calls (counted across the adapter's lifetime)
    pub fail_first_calls: u32,
    /// Fail every call
    pub fail_always: bool,
    /// Error kind used for scripted failures
    pub failure_kind: MockFailureKind,
    /// Simulated latency per call in milliseconds
    pub latency_ms: u64,
}

impl Validate for MockBackendConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.responses.is_empty() && !self.fail_always {
            return Err(ValidationError::mock(
                "responses must not be empty unless fail_always is set",
            ));
        }
        Ok(())
    }
}

/// Orchestration policy: retries, concurrency, timeouts, deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum retries per chunk for retryable failures
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Maximum chunk calls in flight at once
    pub concurrency: usize,
    /// Per-call timeout in seconds, independent of the request deadline
    pub request_timeout_seconds: u64,
    /// Request-level deadline in seconds; no new chunk is dispatched after it
    pub deadline_seconds: Option<u64>,
    /// Grace period for in-flight calls once the deadline has passed
    pub grace_period_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            concurrency: 4,
            request_timeout_seconds: 60,
            deadline_seconds: None,
            grace_period_seconds: 5,
        }
    }
}

impl OrchestratorConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Request-level deadline as a [`Duration`], if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }

    /// Grace period as a [`Duration`].
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }
}

impl Validate for OrchestratorConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.concurrency == 0 {
            return Err(ValidationError::orchestrator("concurrency must be positive"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::orchestrator(
                "request_timeout_seconds must be positive",
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::orchestrator(
                "initial_backoff_ms must not exceed max_backoff_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_tags() {
        let config = BackendConfig::Mock(MockBackendConfig {
            responses: vec!["ok".to_string()],
            ..Default::default()
        });
        assert_eq!(config.backend_type(), "mock");
    }

    #[test]
    fn test_backend_config_round_trip() {
        let config = BackendConfig::Lan(LanBackendConfig {
            server_url: "http://10.0.0.5:8080".to_string(),
            api_key: None,
            model: "llama3".to_string(),
            timeout_seconds: 30,
        });

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""backend_type":"lan""#));

        let parsed: BackendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.backend_type(), "lan");
    }

    #[test]
    fn test_unknown_backend_type_rejected() {
        let json = r#"{"backend_type":"quantum","model":"q1"}"#;
        assert!(serde_json::from_str::<BackendConfig>(json).is_err());
    }

    #[test]
    fn test_hosted_requires_api_key() {
        let config = HostedBackendConfig {
            model: "gpt-4o".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_requires_model_path() {
        let config = LocalBackendConfig {
            tokenizer_path: "/models/tokenizer.json".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mock_allows_empty_responses_when_failing() {
        let config = MockBackendConfig {
            fail_always: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_orchestrator_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.concurrency, 4);
        assert!(config.validate().is_ok());
    }
}
