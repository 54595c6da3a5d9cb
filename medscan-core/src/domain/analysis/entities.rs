//! Analysis entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{
    AnalysisArtifact, AnalysisKind, AnalysisStatus, ChunkId, Confidence, Severity, SourceSpan,
};

/// One logical analysis request.
///
/// Immutable; created per invocation of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Unique request identifier
    pub id: Uuid,
    /// Requested analysis kind
    pub kind: AnalysisKind,
    /// Caller-supplied regulatory requirement schema, embedded into the
    /// compliance prompt verbatim
    pub requirement_schema: Option<String>,
    /// Caller-supplied prompt template overriding the built-in one for this kind
    pub template_override: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            requirement_schema: None,
            template_override: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_requirement_schema(mut self, schema: impl Into<String>) -> Self {
        self.requirement_schema = Some(schema.into());
        self
    }

    pub fn with_template_override(mut self, template: impl Into<String>) -> Self {
        self.template_override = Some(template.into());
        self
    }
}

/// An ordered unit of project content sized to a backend's context window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, unique within one request
    pub id: ChunkId,
    /// Where this chunk was cut from
    pub source: SourceSpan,
    /// Chunk text
    pub content: String,
    /// True when the source unit exceeded the window and had to be split;
    /// the interpreter downgrades confidence for artifacts from such chunks
    pub truncated: bool,
}

/// A compliance finding against a regulatory requirement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceFinding {
    /// Finding identifier
    pub id: String,
    /// Requirement reference the finding relates to (e.g. a clause number)
    pub requirement: String,
    /// Whether the analyzed content satisfies the requirement
    pub compliant: bool,
    pub severity: Severity,
    pub confidence: Confidence,
    /// Why the model reached this conclusion
    pub rationale: String,
    /// Suggested remediation, when non-compliant
    pub recommendation: Option<String>,
    /// Chunks this finding traces back to
    pub chunk_ids: Vec<ChunkId>,
}

/// A hazard identified during risk assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    /// Risk identifier
    pub id: String,
    /// Short hazard description
    pub hazard: String,
    pub severity: Severity,
    pub confidence: Confidence,
    /// Why the model considers this a hazard
    pub rationale: String,
    /// Suggested mitigation
    pub mitigation: Option<String>,
    /// Chunks this risk traces back to
    pub chunk_ids: Vec<ChunkId>,
}

/// A generated test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTest {
    /// Test identifier
    pub id: String,
    /// Test name
    pub name: String,
    /// What the test verifies
    pub description: String,
    /// Test body
    pub test_code: String,
    /// Priority of the behavior under test
    pub severity: Severity,
    pub confidence: Confidence,
    /// Why this test was generated
    pub rationale: String,
    /// Chunks this test traces back to
    pub chunk_ids: Vec<ChunkId>,
}

/// Terminal outcome of one chunk in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChunkOutcome {
    /// Backend call and interpretation both succeeded
    Succeeded,
    /// Failed after exhausting retries, or on a non-retryable error
    Failed {
        /// Machine-readable error kind ("timeout", "auth", ...)
        kind: String,
        reason: String,
    },
    /// Never dispatched: cancellation or deadline fired first
    Skipped { reason: String },
}

impl ChunkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// The failure kind, when this outcome is a failure.
    pub fn failure_kind(&self) -> Option<&str> {
        match self {
            Self::Failed { kind, .. } => Some(kind.as_str()),
            _ => None,
        }
    }
}

/// Per-chunk record accumulated during orchestration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: ChunkId,
    /// Total backend calls made for this chunk
    pub attempts: u32,
    /// Retries beyond the first attempt
    pub retries: u32,
    /// Wall-clock time spent on this chunk in milliseconds
    pub latency_ms: u64,
    pub outcome: ChunkOutcome,
}

/// Aggregate result of one analysis request.
///
/// Always returned to the caller, even when every chunk failed; per-chunk
/// failures live in the ledger, never in a propagated error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Identifier of the originating request
    pub request_id: Uuid,
    pub kind: AnalysisKind,
    /// Artifacts sorted by their first chunk identifier
    pub artifacts: Vec<AnalysisArtifact>,
    /// One record per chunk, sorted by chunk identifier
    pub ledger: Vec<ChunkRecord>,
    pub status: AnalysisStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Derive the overall status from a ledger.
    ///
    /// `Complete` iff all chunks succeeded (vacuously true for an empty
    /// project), `Partial` iff at least one did, `Failed` otherwise.
    pub fn status_from_ledger(ledger: &[ChunkRecord]) -> AnalysisStatus {
        let succeeded = ledger.iter().filter(|r| r.outcome.is_success()).count();
        if succeeded == ledger.len() {
            AnalysisStatus::Complete
        } else if succeeded > 0 {
            AnalysisStatus::Partial
        } else {
            AnalysisStatus::Failed
        }
    }

    pub fn succeeded_chunks(&self) -> usize {
        self.ledger
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn failed_chunks(&self) -> usize {
        self.ledger.len() - self.succeeded_chunks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ordinal: usize, outcome: ChunkOutcome) -> ChunkRecord {
        ChunkRecord {
            chunk_id: ChunkId::new(ordinal),
            attempts: 1,
            retries: 0,
            latency_ms: 10,
            outcome,
        }
    }

    #[test]
    fn test_status_complete() {
        let ledger = vec![record(0, ChunkOutcome::Succeeded), record(1, ChunkOutcome::Succeeded)];
        assert_eq!(
            AnalysisResult::status_from_ledger(&ledger),
            AnalysisStatus::Complete
        );
    }

    #[test]
    fn test_status_partial() {
        let ledger = vec![
            record(0, ChunkOutcome::Succeeded),
            record(
                1,
                ChunkOutcome::Failed {
                    kind: "auth".to_string(),
                    reason: "bad key".to_string(),
                },
            ),
        ];
        assert_eq!(
            AnalysisResult::status_from_ledger(&ledger),
            AnalysisStatus::Partial
        );
    }

    #[test]
    fn test_status_failed() {
        let ledger = vec![record(
            0,
            ChunkOutcome::Failed {
                kind: "timeout".to_string(),
                reason: "60s elapsed".to_string(),
            },
        )];
        assert_eq!(
            AnalysisResult::status_from_ledger(&ledger),
            AnalysisStatus::Failed
        );
    }

    #[test]
    fn test_status_empty_ledger_is_complete() {
        assert_eq!(
            AnalysisResult::status_from_ledger(&[]),
            AnalysisStatus::Complete
        );
    }

    #[test]
    fn test_request_builder() {
        let request = AnalysisRequest::new(AnalysisKind::ComplianceCheck)
            .with_requirement_schema("IEC 62304 §5.1: documented development plan");

        assert_eq!(request.kind, AnalysisKind::ComplianceCheck);
        assert!(request.requirement_schema.is_some());
        assert!(request.template_override.is_none());
    }
}
