//! MedScan Core - Foundation crate for the MedScan analysis platform
//!
//! This crate provides shared functionality used by the analysis core:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed backend and orchestration descriptors with validation
//! - [`domain`] — Core domain models: projects, chunks, analysis artifacts, results
//! - [`logging`] — Structured logging with tracing
//!
//! # Configuration
//!
//! The core consumes already-parsed configuration descriptors; reading and
//! validating configuration *files* is the host application's job. Every
//! descriptor section implements [`config::Validate`] and is checked eagerly
//! before any adapter is constructed:
//!
//! ```rust,ignore
//! use medscan_core::config::{BackendConfig, Validate};
//!
//! let config: BackendConfig = serde_json::from_str(descriptor_json)?;
//! config.validate()?;
//! ```
//!
//! # Logging
//!
//! Initialize structured logging:
//!
//! ```rust,ignore
//! use medscan_core::init_tracing;
//!
//! init_tracing("info")?;
//! ```

pub mod config;
pub mod domain;
pub mod logging;

pub use logging::init_tracing;
