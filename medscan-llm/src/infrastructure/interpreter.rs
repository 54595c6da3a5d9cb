//! Result interpreter
//!
//! Parses raw backend output into typed analysis artifacts. Models wrap
//! JSON in markdown fences or narrative text more often than not, so
//! extraction tries several strategies before giving up:
//!
//! 1) the full trimmed text as JSON,
//! 2) a ```json fenced code block,
//! 3) any fenced code block,
//! 4) the first embedded JSON object/array in the text.
//!
//! Reordered fields, extra fields and surrounding whitespace are
//! tolerated. Missing required fields or severity/confidence values
//! outside the defined domain fail with [`BackendError::Malformed`], which
//! the orchestrator records as a chunk failure rather than raising.

use serde::Deserialize;
use serde_json::Value;

use medscan_core::domain::{
    AnalysisArtifact, AnalysisKind, Chunk, ComplianceFinding, Confidence, GeneratedTest, RiskItem,
    Severity,
};

use crate::domain::{BackendError, RawResponse};

/// Parses backend output against the schema implied by the analysis kind
#[derive(Debug, Clone, Default)]
pub struct ResultInterpreter;

impl ResultInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Interpret one response into one artifact.
    pub fn interpret(
        &self,
        response: &RawResponse,
        chunk: &Chunk,
        kind: AnalysisKind,
    ) -> Result<AnalysisArtifact, BackendError> {
        if response.is_empty() {
            return Err(BackendError::malformed("Empty backend response"));
        }

        let value = extract_json_value(&response.text).ok_or_else(|| {
            BackendError::malformed("No JSON value found in backend response")
        })?;

        match kind {
            AnalysisKind::ComplianceCheck => self.to_compliance_finding(value, chunk),
            AnalysisKind::RiskAssessment => self.to_risk_item(value, chunk),
            AnalysisKind::TestGeneration => self.to_generated_test(value, chunk),
        }
    }

    fn to_compliance_finding(
        &self,
        value: Value,
        chunk: &Chunk,
    ) -> Result<AnalysisArtifact, BackendError> {
        let dto: ComplianceDto = parse_fields(value)?;
        let (severity, confidence) = parse_domains(&dto.severity, &dto.confidence)?;
        let (confidence, rationale) = apply_truncation(chunk, confidence, dto.rationale);

        Ok(AnalysisArtifact::ComplianceFinding(ComplianceFinding {
            id: format!("cf-{}", chunk.id),
            requirement: dto.requirement,
            compliant: dto.compliant,
            severity,
            confidence,
            rationale,
            recommendation: dto.recommendation,
            chunk_ids: vec![chunk.id.clone()],
        }))
    }

    fn to_risk_item(&self, value: Value, chunk: &Chunk) -> Result<AnalysisArtifact, BackendError> {
        let dto: RiskDto = parse_fields(value)?;
        let (severity, confidence) = parse_domains(&dto.severity, &dto.confidence)?;
        let (confidence, rationale) = apply_truncation(chunk, confidence, dto.rationale);

        Ok(AnalysisArtifact::RiskItem(RiskItem {
            id: format!("risk-{}", chunk.id),
            hazard: dto.hazard,
            severity,
            confidence,
            rationale,
            mitigation: dto.mitigation,
            chunk_ids: vec![chunk.id.clone()],
        }))
    }

    fn to_generated_test(
        &self,
        value: Value,
        chunk: &Chunk,
    ) -> Result<AnalysisArtifact, BackendError> {
        let dto: TestDto = parse_fields(value)?;
        let (severity, confidence) = parse_domains(&dto.severity, &dto.confidence)?;
        let (confidence, rationale) = apply_truncation(chunk, confidence, dto.rationale);

        Ok(AnalysisArtifact::GeneratedTest(GeneratedTest {
            id: format!("test-{}", chunk.id),
            name: dto.name,
            description: dto.description,
            test_code: dto.test_code,
            severity,
            confidence,
            rationale,
            chunk_ids: vec![chunk.id.clone()],
        }))
    }
}

fn parse_fields<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value)
        .map_err(|e| BackendError::malformed(format!("Response missing required fields: {}", e)))
}

fn parse_domains(severity: &str, confidence: &str) -> Result<(Severity, Confidence), BackendError> {
    let severity = Severity::parse(severity).ok_or_else(|| {
        BackendError::malformed(format!("Severity '{}' outside the defined domain", severity))
    })?;
    let confidence = Confidence::parse(confidence).ok_or_else(|| {
        BackendError::malformed(format!(
            "Confidence '{}' outside the defined domain",
            confidence
        ))
    })?;
    Ok((severity, confidence))
}

/// Truncated chunks yield reduced-confidence artifacts, flagged in the
/// rationale so report readers see why.
fn apply_truncation(chunk: &Chunk, confidence: Confidence, rationale: String) -> (Confidence, String) {
    if chunk.truncated {
        (
            confidence.downgraded(),
            format!("{} [source chunk truncated; confidence reduced]", rationale),
        )
    } else {
        (confidence, rationale)
    }
}

// === Expected JSON shapes per analysis kind ===

#[derive(Debug, Deserialize)]
struct ComplianceDto {
    requirement: String,
    compliant: bool,
    severity: String,
    confidence: String,
    rationale: String,
    #[serde(default)]
    recommendation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RiskDto {
    hazard: String,
    severity: String,
    confidence: String,
    rationale: String,
    #[serde(default)]
    mitigation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestDto {
    name: String,
    description: String,
    test_code: String,
    severity: String,
    confidence: String,
    rationale: String,
}

// === JSON extraction ===

/// Extract a JSON value from model output using the strategy order
/// documented at module level.
pub fn extract_json_value(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    for language in [Some("json"), None] {
        if let Some(block) = extract_fenced_block(trimmed, language)
            && let Ok(value) = serde_json::from_str(&block)
        {
            return Some(value);
        }
    }

    extract_embedded_value(trimmed)
}

/// Extract a fenced code block, optionally requiring a language tag.
fn extract_fenced_block(content: &str, language: Option<&str>) -> Option<String> {
    let fence = "```";
    let mut search = content;

    loop {
        let start = search.find(fence)?;
        let after_start = &search[start + fence.len()..];

        let line_end = after_start.find('\n')?;
        let tag = after_start[..line_end].trim();
        let rest = &after_start[line_end + 1..];

        if let Some(expected) = language
            && !tag.eq_ignore_ascii_case(expected)
        {
            search = after_start;
            continue;
        }

        let end = rest.find(fence)?;
        return Some(rest[..end].trim().to_string());
    }
}

/// Find the first parseable JSON object or array embedded in free text.
fn extract_embedded_value(content: &str) -> Option<Value> {
    for (idx, ch) in content.char_indices() {
        if ch == '{' || ch == '[' {
            let candidate = &content[idx..];
            let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
            if let Some(Ok(value)) = stream.next() {
                return Some(value);
            }
        }
    }
    None
}
