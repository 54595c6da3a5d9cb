//! Orchestrator resilience tests: deadlines, cancellation, retry behavior

use std::sync::Arc;
use std::time::{Duration, Instant};

use medscan_core::config::{
    MockBackendConfig, MockFailureKind, OrchestratorConfig,
};
use medscan_core::domain::{AnalysisKind, AnalysisRequest, AnalysisStatus, ChunkOutcome};
use medscan_llm::application::RequestOrchestrator;
use medscan_llm::infrastructure::backends::MockBackend;
use medscan_llm::split_project;
use tokio_util::sync::CancellationToken;

mod common;

use common::{RISK_RESPONSE, sample_project};

fn mock_backend(config: MockBackendConfig) -> Arc<MockBackend> {
    Arc::new(MockBackend::new(config))
}

#[tokio::test]
async fn test_deadline_skips_undispatched_chunks() {
    let config = OrchestratorConfig {
        deadline_seconds: Some(0),
        grace_period_seconds: 0,
        ..Default::default()
    };
    let orchestrator = RequestOrchestrator::new(config);

    let backend = mock_backend(MockBackendConfig {
        responses: vec![RISK_RESPONSE.to_string()],
        ..Default::default()
    });
    let chunks = split_project(&sample_project(), 4096);
    let request = AnalysisRequest::new(AnalysisKind::RiskAssessment);

    let result = orchestrator
        .execute(&request, backend, chunks, CancellationToken::new())
        .await;

    assert_eq!(result.status, AnalysisStatus::Failed);
    for record in &result.ledger {
        match &record.outcome {
            ChunkOutcome::Skipped { reason } => assert!(reason.contains("deadline")),
            other => panic!("Expected Skipped outcome, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_cancellation_during_backoff_ends_promptly() {
    // Every call fails with a transient error and the backoff is long;
    // cancelling must cut the wait short instead of sleeping it out.
    let config = OrchestratorConfig {
        initial_backoff_ms: 5_000,
        max_backoff_ms: 10_000,
        ..Default::default()
    };
    let orchestrator = RequestOrchestrator::new(config);

    let backend = mock_backend(MockBackendConfig {
        fail_always: true,
        failure_kind: MockFailureKind::Transient,
        ..Default::default()
    });
    let chunks = split_project(&sample_project(), 4096);
    let request = AnalysisRequest::new(AnalysisKind::RiskAssessment);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = orchestrator.execute(&request, backend, chunks, cancel).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.status, AnalysisStatus::Failed);
    assert!(result.ledger.iter().all(|r| matches!(
        r.outcome,
        ChunkOutcome::Skipped { .. } | ChunkOutcome::Failed { .. }
    )));
}

#[tokio::test]
async fn test_cancellation_mid_run_yields_partial_result() {
    // One chunk completes before cancellation fires; the rest never
    // dispatch. Serial execution makes the split deterministic.
    let config = OrchestratorConfig {
        concurrency: 1,
        ..Default::default()
    };
    let orchestrator = RequestOrchestrator::new(config);

    let backend = mock_backend(MockBackendConfig {
        responses: vec![RISK_RESPONSE.to_string()],
        latency_ms: 50,
        ..Default::default()
    });
    let chunks = split_project(&sample_project(), 4096);
    assert_eq!(chunks.len(), 3);
    let request = AnalysisRequest::new(AnalysisKind::RiskAssessment);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        canceller.cancel();
    });

    let result = orchestrator.execute(&request, backend, chunks, cancel).await;

    assert_eq!(result.status, AnalysisStatus::Partial);
    assert!(result.succeeded_chunks() >= 1);
    assert!(result.failed_chunks() >= 1);
}

#[tokio::test]
async fn test_nonretryable_failure_makes_single_attempt() {
    let orchestrator = RequestOrchestrator::default();

    let backend = mock_backend(MockBackendConfig {
        fail_always: true,
        failure_kind: MockFailureKind::ResourceExhausted,
        ..Default::default()
    });
    let chunks = split_project(&sample_project(), 4096);
    let request = AnalysisRequest::new(AnalysisKind::RiskAssessment);

    let result = orchestrator
        .execute(&request, backend.clone(), chunks, CancellationToken::new())
        .await;

    assert_eq!(result.status, AnalysisStatus::Failed);
    for record in &result.ledger {
        assert_eq!(record.attempts, 1);
        assert_eq!(record.retries, 0);
    }
    // Three chunks, one call each, no retries
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn test_ledger_latency_is_recorded() {
    let orchestrator = RequestOrchestrator::default();

    let backend = mock_backend(MockBackendConfig {
        responses: vec![RISK_RESPONSE.to_string()],
        latency_ms: 20,
        ..Default::default()
    });
    let chunks = split_project(&sample_project(), 4096);
    let request = AnalysisRequest::new(AnalysisKind::RiskAssessment);

    let result = orchestrator
        .execute(&request, backend, chunks, CancellationToken::new())
        .await;

    for record in &result.ledger {
        assert!(record.latency_ms >= 20);
    }
}
