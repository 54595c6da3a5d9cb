//! Structured logging bootstrap
//!
//! The host application decides *whether* and *when* to initialize logging;
//! the core only provides the bootstrap so every surface uses the same
//! subscriber configuration.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// `default_level` is used when `RUST_LOG` is not set (e.g. `"info"`,
/// `"medscan_llm=debug"`). Returns an error if a global subscriber is
/// already installed.
pub fn init_tracing(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()?;

    Ok(())
}
