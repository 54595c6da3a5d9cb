//! Analysis value objects

use serde::{Deserialize, Serialize};

use super::entities::{ComplianceFinding, GeneratedTest, RiskItem};

/// Kind of analysis requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Check project content against a caller-supplied regulatory schema
    ComplianceCheck,
    /// Identify hazards and assess their risk
    RiskAssessment,
    /// Generate test cases for the analyzed content
    TestGeneration,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComplianceCheck => "compliance_check",
            Self::RiskAssessment => "risk_assessment",
            Self::TestGeneration => "test_generation",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of an analysis artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Parse a severity from model output.
    ///
    /// Case-insensitive; anything outside the defined domain is rejected so
    /// the interpreter can flag the response as malformed.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" | "informational" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Confidence attached to an analysis artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Parse a confidence level from model output; out-of-domain values are
    /// rejected as malformed.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// One step lower, saturating at [`Confidence::Low`].
    ///
    /// Applied to artifacts derived from truncated chunks.
    pub fn downgraded(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

/// Stable identifier for a chunk within one analysis request.
///
/// Identifiers are zero-padded ordinals, so lexicographic order equals the
/// chunker's production order; the orchestrator relies on this when sorting
/// artifacts and ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(ordinal: usize) -> Self {
        Self(format!("chunk-{:05}", ordinal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location a chunk was cut from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Source unit path
    pub path: String,
    /// First line of the chunk (1-indexed)
    pub start_line: u32,
    /// Last line of the chunk (1-indexed, inclusive)
    pub end_line: u32,
}

/// Overall status of an analysis result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every chunk succeeded
    Complete,
    /// At least one chunk succeeded
    Partial,
    /// No chunk succeeded
    Failed,
}

/// One typed output of analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "artifact_type", rename_all = "snake_case")]
pub enum AnalysisArtifact {
    ComplianceFinding(ComplianceFinding),
    RiskItem(RiskItem),
    GeneratedTest(GeneratedTest),
}

impl AnalysisArtifact {
    /// Chunk identifiers this artifact was derived from.
    ///
    /// Invariant: non-empty, and every id exists in the originating request.
    pub fn chunk_ids(&self) -> &[ChunkId] {
        match self {
            Self::ComplianceFinding(a) => &a.chunk_ids,
            Self::RiskItem(a) => &a.chunk_ids,
            Self::GeneratedTest(a) => &a.chunk_ids,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ComplianceFinding(a) => a.severity,
            Self::RiskItem(a) => a.severity,
            Self::GeneratedTest(a) => a.severity,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            Self::ComplianceFinding(a) => a.confidence,
            Self::RiskItem(a) => a.confidence,
            Self::GeneratedTest(a) => a.confidence,
        }
    }

    /// Textual rationale accompanying the artifact.
    pub fn rationale(&self) -> &str {
        match self {
            Self::ComplianceFinding(a) => &a.rationale,
            Self::RiskItem(a) => &a.rationale,
            Self::GeneratedTest(a) => &a.rationale,
        }
    }
}
