//! Backend error taxonomy
//!
//! Every adapter failure is one of these variants. Only `Timeout`,
//! `Transient` and `RateLimited` are retryable; everything else
//! short-circuits the affected chunk. Per-chunk failures are recorded in
//! the ledger by the orchestrator, never raised past the pipeline;
//! `Configuration` is the one variant that fails an `analyze` call outright.

use std::fmt;

/// Failure of a backend operation
#[derive(Debug, Clone)]
pub enum BackendError {
    /// The call exceeded its per-request timeout
    Timeout {
        /// Timeout that was exceeded, in seconds
        seconds: u64,
    },

    /// Authentication failed (invalid or missing API key).
    ///
    /// Kept distinct from `Transient` so callers can tell a
    /// misconfigured credential from a flaky network.
    Auth(String),

    /// Transient failure worth retrying (connection reset, 5xx, ...)
    Transient(String),

    /// Rate limited by the backend
    RateLimited {
        /// Seconds to wait before retrying, if the backend said
        retry_after: Option<u64>,
        message: String,
    },

    /// A local resource ran out (memory, inference slots)
    ResourceExhausted(String),

    /// A file-backed model could not be loaded
    ModelLoad(String),

    /// The backend produced output the interpreter could not accept
    Malformed(String),

    /// The backend descriptor is invalid or incomplete
    Configuration(String),

    /// The request was cancelled by the caller; a normal terminal state,
    /// not a defect
    Cancelled,
}

impl BackendError {
    /// Whether the orchestrator should retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transient(_) | Self::RateLimited { .. }
        )
    }

    /// Backend-suggested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => {
                retry_after.map(std::time::Duration::from_secs)
            }
            _ => None,
        }
    }

    /// Short machine-readable kind, used in ledger reasons and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Auth(_) => "auth",
            Self::Transient(_) => "transient",
            Self::RateLimited { .. } => "rate_limited",
            Self::ResourceExhausted(_) => "resource_exhausted",
            Self::ModelLoad(_) => "model_load",
            Self::Malformed(_) => "malformed",
            Self::Configuration(_) => "configuration",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn rate_limited_with_retry(message: impl Into<String>, seconds: u64) -> Self {
        Self::RateLimited {
            retry_after: Some(seconds),
            message: message.into(),
        }
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted(message.into())
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoad(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { seconds } => write!(f, "Request timed out after {}s", seconds),
            Self::Auth(msg) => write!(f, "Authentication failed: {}", msg),
            Self::Transient(msg) => write!(f, "Transient failure: {}", msg),
            Self::RateLimited {
                message,
                retry_after,
            } => {
                if let Some(secs) = retry_after {
                    write!(f, "Rate limited: {} (retry after {}s)", message, secs)
                } else {
                    write!(f, "Rate limited: {}", message)
                }
            }
            Self::ResourceExhausted(msg) => write!(f, "Resource exhausted: {}", msg),
            Self::ModelLoad(msg) => write!(f, "Model load failed: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed backend output: {}", msg),
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Self::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { seconds: 0 }
        } else if err.is_connect() {
            Self::Transient(format!("Connection failed: {}", err))
        } else {
            Self::Transient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("JSON parse error: {}", err))
    }
}

impl From<medscan_core::config::ValidationError> for BackendError {
    fn from(err: medscan_core::config::ValidationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(BackendError::timeout(30).is_retryable());
        assert!(BackendError::transient("connection reset").is_retryable());
        assert!(BackendError::rate_limited("quota").is_retryable());

        assert!(!BackendError::auth("bad key").is_retryable());
        assert!(!BackendError::resource_exhausted("oom").is_retryable());
        assert!(!BackendError::malformed("no json").is_retryable());
        assert!(!BackendError::Cancelled.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = BackendError::rate_limited_with_retry("quota", 60);
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(60)));

        assert_eq!(BackendError::transient("x").retry_after(), None);
    }

    #[test]
    fn test_display() {
        let err = BackendError::auth("invalid key");
        assert_eq!(err.to_string(), "Authentication failed: invalid key");

        let err = BackendError::rate_limited_with_retry("too many requests", 30);
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_validation_error_maps_to_configuration() {
        let err: BackendError =
            medscan_core::config::ValidationError::hosted("api_key is required").into();
        assert_eq!(err.kind(), "configuration");
    }
}
