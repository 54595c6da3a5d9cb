//! Request and response shapes shared by all backends
//!
//! These are transport-agnostic; each adapter translates them to and from
//! its own wire or in-process format.

use serde::{Deserialize, Serialize};

/// A single generation request for one chunk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationRequest {
    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User prompt (the chunk content wrapped in an analysis template)
    pub prompt: String,

    /// Model override; adapters fall back to their configured model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token usage statistics, when the backend reports them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Raw backend output for one chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    /// Identifier of the adapter that produced this response
    pub backend: String,
    /// Model that generated the response
    pub model: String,
    /// Generated text, unparsed
    pub text: String,
    /// Token usage, if the backend reported it
    pub usage: Option<TokenUsage>,
    /// Wall-clock latency of the call in milliseconds
    pub latency_ms: u64,
}

impl RawResponse {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("Assess this code.")
            .with_system("You are a medical software auditor.")
            .with_max_tokens(512)
            .with_temperature(0.2);

        assert_eq!(request.prompt, "Assess this code.");
        assert!(request.system.is_some());
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.model.is_none());
    }

    #[test]
    fn test_response_is_empty() {
        let response = RawResponse {
            backend: "mock".to_string(),
            model: "test".to_string(),
            text: "   \n".to_string(),
            usage: None,
            latency_ms: 1,
        };
        assert!(response.is_empty());
    }
}
