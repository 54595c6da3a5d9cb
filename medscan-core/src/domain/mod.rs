//! Core domain models

pub mod analysis;
pub mod project;

pub use analysis::*;
pub use project::{ProjectSnapshot, SourceUnit};
