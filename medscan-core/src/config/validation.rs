//! Configuration validation module

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Hosted backend configuration error: {message}")]
    Hosted { message: String },

    #[error("LAN backend configuration error: {message}")]
    Lan { message: String },

    #[error("Local backend configuration error: {message}")]
    Local { message: String },

    #[error("Mock backend configuration error: {message}")]
    Mock { message: String },

    #[error("Orchestrator configuration error: {message}")]
    Orchestrator { message: String },
}

impl ValidationError {
    pub fn hosted(message: impl Into<String>) -> Self {
        Self::Hosted {
            message: message.into(),
        }
    }

    pub fn lan(message: impl Into<String>) -> Self {
        Self::Lan {
            message: message.into(),
        }
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::Local {
            message: message.into(),
        }
    }

    pub fn mock(message: impl Into<String>) -> Self {
        Self::Mock {
            message: message.into(),
        }
    }

    pub fn orchestrator(message: impl Into<String>) -> Self {
        Self::Orchestrator {
            message: message.into(),
        }
    }
}
