//! Project representation
//!
//! The project snapshot is supplied by a collaborator (UI, CLI, database
//! layer); the core treats it as an opaque ordered set of source units and
//! never reads the filesystem itself.

use serde::{Deserialize, Serialize};

/// One source unit of a project: a file path and its full content.
///
/// A source unit is the atomic chunking boundary; the chunker never splits
/// a unit that fits inside the backend's context window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path relative to the project root
    pub path: String,
    /// Full text content
    pub content: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Structured snapshot of a project under analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectSnapshot {
    /// Human-readable project name
    pub name: String,
    /// Ordered source units
    pub units: Vec<SourceUnit>,
}

impl ProjectSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
        }
    }

    /// Add a source unit, builder-style.
    pub fn with_unit(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.units.push(SourceUnit::new(path, content));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
