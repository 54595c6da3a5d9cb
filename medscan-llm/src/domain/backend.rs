//! Backend trait
//!
//! The single contract every transport variant implements. The trait is
//! object-safe and used with dynamic dispatch via `Arc<dyn Backend>`.

use async_trait::async_trait;

use super::error::BackendError;
use super::messages::{GenerationRequest, RawResponse};

/// Metadata about a backend adapter
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Variant identifier ("hosted", "lan", "local", "mock")
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Model this adapter is configured for
    pub model: String,
    /// Context window in tokens; the chunker budgets against this
    pub context_window: usize,
    /// Maximum tokens the adapter will generate per call
    pub max_output_tokens: usize,
}

/// Core contract for LLM backends.
///
/// Each variant implements exactly this and nothing more; capability
/// differences (auth, local resources, determinism) show up only in which
/// [`BackendError`] variants `send` can return.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Adapter metadata
    fn info(&self) -> BackendInfo;

    /// Send one generation request and wait for the full response.
    ///
    /// Fails with `Timeout`, `Auth`, `Transient`, `RateLimited`,
    /// `ResourceExhausted` or `Malformed`; of these only `Timeout`,
    /// `Transient` and `RateLimited` are retryable.
    async fn send(&self, request: GenerationRequest) -> Result<RawResponse, BackendError>;

    /// Check that the backend can accept requests.
    async fn health_check(&self) -> Result<(), BackendError> {
        // Default: a minimal one-token generation
        let request = GenerationRequest::new("ping").with_max_tokens(1);
        self.send(request).await.map(|_| ())
    }
}
