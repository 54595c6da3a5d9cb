//! Common test fixtures: mock descriptors and sample projects

#![allow(dead_code)]

use medscan_core::config::{BackendConfig, MockBackendConfig, MockFailureKind, MockKeying};
use medscan_core::domain::ProjectSnapshot;

pub const RISK_RESPONSE: &str = r#"{
    "hazard": "Dose accumulator can overflow",
    "severity": "High",
    "confidence": "High",
    "rationale": "The accumulator is a 16-bit counter with no saturation.",
    "mitigation": "Use saturating arithmetic and alarm on ceiling."
}"#;

pub const COMPLIANCE_RESPONSE: &str = r#"{
    "requirement": "IEC 62304 5.5.3",
    "compliant": false,
    "severity": "Medium",
    "confidence": "High",
    "rationale": "No documented acceptance criteria for this unit.",
    "recommendation": "Add unit verification acceptance criteria."
}"#;

pub const TEST_RESPONSE: &str = r#"{
    "name": "alarm_fires_on_ceiling",
    "description": "Alarm must fire when dose reaches the configured ceiling",
    "test_code": "dose_set(DOSE_CEILING); assert(alarm_active());",
    "severity": "Critical",
    "confidence": "Medium",
    "rationale": "Ceiling behavior is safety-relevant and untested."
}"#;

/// Mock descriptor answering every call with the given payloads in rotation.
pub fn mock_config(responses: &[&str]) -> BackendConfig {
    BackendConfig::Mock(MockBackendConfig {
        responses: responses.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    })
}

/// Mock descriptor selecting responses by prompt hash.
pub fn hashed_mock_config(responses: &[&str]) -> BackendConfig {
    BackendConfig::Mock(MockBackendConfig {
        responses: responses.iter().map(|s| s.to_string()).collect(),
        keying: MockKeying::InputHash,
        ..Default::default()
    })
}

/// Mock descriptor failing every call with the given error kind.
pub fn failing_mock_config(kind: MockFailureKind) -> BackendConfig {
    BackendConfig::Mock(MockBackendConfig {
        fail_always: true,
        failure_kind: kind,
        ..Default::default()
    })
}

/// Mock descriptor failing the first `n` calls, then answering normally.
pub fn flaky_mock_config(n: u32, kind: MockFailureKind, response: &str) -> BackendConfig {
    BackendConfig::Mock(MockBackendConfig {
        responses: vec![response.to_string()],
        fail_first_calls: n,
        failure_kind: kind,
        ..Default::default()
    })
}

/// Three small firmware files; fits any realistic window untruncated.
pub fn sample_project() -> ProjectSnapshot {
    ProjectSnapshot::new("infusion-pump-fw")
        .with_unit(
            "src/dosing.c",
            "static uint16_t accumulator;\nvoid dose_step(uint16_t units) { accumulator += units; }\n",
        )
        .with_unit(
            "src/alarm.c",
            "void alarm_check(void) { if (accumulator > DOSE_CEILING) alarm_raise(); }\n",
        )
        .with_unit(
            "src/comm.c",
            "int comm_send(const uint8_t *buf, size_t len) { return uart_write(buf, len); }\n",
        )
}
