use medscan_core::domain::{AnalysisKind, AnalysisRequest, Chunk};

pub const COMPLIANCE_SYSTEM_PROMPT: &str = r#"You are a regulatory auditor for medical-device software. You assess source code and project artifacts against the regulatory requirements supplied to you. You respond with a single JSON object and nothing else."#;

pub const COMPLIANCE_PROMPT: &str = r#"Assess the following source excerpt against the requirement schema.

## Requirement schema
{schema}

## Source ({path}, lines {start_line}-{end_line})
```
{content}
```

Respond with a JSON object:
{
    "requirement": "The requirement reference this finding relates to.",
    "compliant": true or false,
    "severity": "Critical | High | Medium | Low | Info",
    "confidence": "High | Medium | Low",
    "rationale": "Why the excerpt does or does not satisfy the requirement.",
    "recommendation": "How to reach compliance, when non-compliant."
}
"#;

pub const RISK_SYSTEM_PROMPT: &str = r#"You are a risk analyst for medical-device software. You identify hazards in source code and assess their severity. You respond with a single JSON object and nothing else."#;

pub const RISK_PROMPT: &str = r#"Identify the most significant hazard in the following source excerpt.

## Source ({path}, lines {start_line}-{end_line})
```
{content}
```

Respond with a JSON object:
{
    "hazard": "Short description of the hazard.",
    "severity": "Critical | High | Medium | Low | Info",
    "confidence": "High | Medium | Low",
    "rationale": "Why this is a hazard and what could go wrong for the patient or operator.",
    "mitigation": "How to mitigate the hazard."
}
"#;

pub const TEST_SYSTEM_PROMPT: &str = r#"You are a verification engineer for medical-device software. You write targeted test cases for safety-relevant behavior. You respond with a single JSON object and nothing else."#;

pub const TEST_PROMPT: &str = r#"Write one test case for the most safety-relevant untested behavior in the following source excerpt.

## Source ({path}, lines {start_line}-{end_line})
```
{content}
```

Respond with a JSON object:
{
    "name": "snake_case test name",
    "description": "What the test verifies.",
    "test_code": "The complete test body.",
    "severity": "Criticality of the behavior under test: Critical | High | Medium | Low | Info",
    "confidence": "High | Medium | Low",
    "rationale": "Why this behavior needs a test."
}
"#;

/// Builds per-chunk prompts for each analysis kind.
pub struct PromptBuilder;

impl PromptBuilder {
    /// System prompt for an analysis kind.
    pub fn system_prompt(kind: AnalysisKind) -> &'static str {
        match kind {
            AnalysisKind::ComplianceCheck => COMPLIANCE_SYSTEM_PROMPT,
            AnalysisKind::RiskAssessment => RISK_SYSTEM_PROMPT,
            AnalysisKind::TestGeneration => TEST_SYSTEM_PROMPT,
        }
    }

    /// User prompt for one chunk.
    ///
    /// The request's template override takes precedence over the built-in
    /// template; both are filled with the same placeholders.
    pub fn build_prompt(request: &AnalysisRequest, chunk: &Chunk) -> String {
        let template = match request.template_override {
            Some(ref template) => template.as_str(),
            None => match request.kind {
                AnalysisKind::ComplianceCheck => COMPLIANCE_PROMPT,
                AnalysisKind::RiskAssessment => RISK_PROMPT,
                AnalysisKind::TestGeneration => TEST_PROMPT,
            },
        };

        let schema = request
            .requirement_schema
            .as_deref()
            .unwrap_or("No explicit schema supplied; use the general safety lifecycle expectations for medical-device software.");

        template
            .replace("{schema}", schema)
            .replace("{path}", &chunk.source.path)
            .replace("{start_line}", &chunk.source.start_line.to_string())
            .replace("{end_line}", &chunk.source.end_line.to_string())
            .replace("{content}", &chunk.content)
    }
}
