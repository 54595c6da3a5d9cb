//! Request orchestrator
//!
//! Drives one logical analysis request across its chunks: dispatches
//! backend calls concurrently up to a bounded limit, retries retryable
//! failures with exponential backoff, and absorbs every per-chunk failure
//! into the ledger. No single chunk failure ever aborts the request; a
//! regulated-domain tool must report what it *could* determine rather than
//! discard everything on one transient error.
//!
//! Cancellation and the request-level deadline are normal terminal states:
//! chunks that never dispatched are recorded as skipped, in-flight calls
//! get a bounded grace period, and the result status degrades to partial
//! or failed instead of raising.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use medscan_core::config::OrchestratorConfig;
use medscan_core::domain::{
    AnalysisArtifact, AnalysisRequest, AnalysisResult, Chunk, ChunkOutcome, ChunkRecord,
};

use crate::domain::{Backend, BackendError, GenerationRequest};
use crate::infrastructure::interpreter::ResultInterpreter;
use crate::infrastructure::prompts::PromptBuilder;

/// Executes one analysis request against one backend
pub struct RequestOrchestrator {
    config: OrchestratorConfig,
    interpreter: ResultInterpreter,
}

impl Default for RequestOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl RequestOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            interpreter: ResultInterpreter::new(),
        }
    }

    /// Process every chunk through the backend and aggregate the outcome.
    ///
    /// Always returns a result; per-chunk failures live in the ledger.
    /// The artifact sequence and ledger are sorted by chunk identifier, so
    /// the output is deterministic regardless of completion order.
    pub async fn execute(
        &self,
        request: &AnalysisRequest,
        backend: Arc<dyn Backend>,
        chunks: Vec<Chunk>,
        cancel: CancellationToken,
    ) -> AnalysisResult {
        let started_at = Utc::now();
        let deadline = self.config.deadline().map(|d| Instant::now() + d);
        let total = chunks.len();

        info!(
            request_id = %request.id,
            kind = %request.kind,
            chunks = total,
            backend = backend.info().id,
            "Starting analysis orchestration"
        );

        let outcomes: Vec<(ChunkRecord, Option<AnalysisArtifact>)> =
            stream::iter(chunks.into_iter().map(|chunk| {
                let backend = backend.clone();
                let cancel = cancel.clone();
                async move {
                    self.process_chunk(request, backend, chunk, cancel, deadline)
                        .await
                }
            }))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        let mut ledger = Vec::with_capacity(total);
        let mut artifacts = Vec::new();
        for (record, artifact) in outcomes {
            ledger.push(record);
            if let Some(artifact) = artifact {
                artifacts.push(artifact);
            }
        }

        // Completion order is nondeterministic; identifier order is the contract.
        ledger.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));
        artifacts.sort_by(|a, b| a.chunk_ids().first().cmp(&b.chunk_ids().first()));

        let status = AnalysisResult::status_from_ledger(&ledger);
        info!(
            request_id = %request.id,
            status = ?status,
            artifacts = artifacts.len(),
            failed_chunks = ledger.iter().filter(|r| !r.outcome.is_success()).count(),
            "Analysis orchestration finished"
        );

        AnalysisResult {
            request_id: request.id,
            kind: request.kind,
            artifacts,
            ledger,
            status,
            started_at,
            completed_at: Utc::now(),
        }
    }

    async fn process_chunk(
        &self,
        request: &AnalysisRequest,
        backend: Arc<dyn Backend>,
        chunk: Chunk,
        cancel: CancellationToken,
        deadline: Option<Instant>,
    ) -> (ChunkRecord, Option<AnalysisArtifact>) {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return (
                skipped_record(&chunk, "cancelled before dispatch"),
                None,
            );
        }
        if deadline.is_some_and(|dl| Instant::now() >= dl) {
            return (
                skipped_record(&chunk, "request deadline reached before dispatch"),
                None,
            );
        }

        let generation = GenerationRequest::new(PromptBuilder::build_prompt(request, &chunk))
            .with_system(PromptBuilder::system_prompt(request.kind));

        let mut attempts: u32 = 0;
        let mut backoff_ms = self.config.initial_backoff_ms;

        loop {
            attempts += 1;
            let call_timeout = self.call_timeout(deadline);
            debug!(chunk_id = %chunk.id, attempt = attempts, "Dispatching chunk");

            let result = tokio::select! {
                outcome = tokio::time::timeout(call_timeout, backend.send(generation.clone())) => {
                    match outcome {
                        Ok(inner) => inner,
                        Err(_) => Err(BackendError::timeout(call_timeout.as_secs())),
                    }
                }
                _ = cancel.cancelled() => Err(BackendError::Cancelled),
            };

            match result {
                Ok(raw) => {
                    return match self.interpreter.interpret(&raw, &chunk, request.kind) {
                        Ok(artifact) => (
                            chunk_record(&chunk, attempts, started, ChunkOutcome::Succeeded),
                            Some(artifact),
                        ),
                        Err(e) => {
                            warn!(chunk_id = %chunk.id, error = %e, "Uninterpretable backend output");
                            (
                                chunk_record(
                                    &chunk,
                                    attempts,
                                    started,
                                    ChunkOutcome::Failed {
                                        kind: e.kind().to_string(),
                                        reason: e.to_string(),
                                    },
                                ),
                                None,
                            )
                        }
                    };
                }
                Err(BackendError::Cancelled) => {
                    return (
                        chunk_record(
                            &chunk,
                            attempts,
                            started,
                            ChunkOutcome::Skipped {
                                reason: "cancelled in flight".to_string(),
                            },
                        ),
                        None,
                    );
                }
                Err(e) if e.is_retryable() && attempts <= self.config.max_retries => {
                    if deadline.is_some_and(|dl| Instant::now() >= dl) {
                        warn!(chunk_id = %chunk.id, attempts = attempts, "Deadline reached during retries");
                        return (
                            chunk_record(
                                &chunk,
                                attempts,
                                started,
                                ChunkOutcome::Failed {
                                    kind: "deadline".to_string(),
                                    reason: format!("deadline exceeded after: {}", e),
                                },
                            ),
                            None,
                        );
                    }

                    // Honor a backend-suggested wait when it fits the cap
                    let delay_ms = e
                        .retry_after()
                        .map(|d| d.as_millis() as u64)
                        .filter(|&d| d <= self.config.max_backoff_ms)
                        .unwrap_or(backoff_ms);

                    debug!(
                        chunk_id = %chunk.id,
                        attempt = attempts,
                        backoff_ms = delay_ms,
                        "Retrying chunk after retryable failure"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                        _ = cancel.cancelled() => {
                            return (
                                chunk_record(
                                    &chunk,
                                    attempts,
                                    started,
                                    ChunkOutcome::Skipped {
                                        reason: "cancelled during backoff".to_string(),
                                    },
                                ),
                                None,
                            );
                        }
                    }

                    backoff_ms = std::cmp::min(
                        backoff_ms * 2 + backoff_jitter(backoff_ms / 4),
                        self.config.max_backoff_ms,
                    );
                }
                Err(e) => {
                    warn!(chunk_id = %chunk.id, attempts = attempts, error = %e, "Chunk failed");
                    return (
                        chunk_record(
                            &chunk,
                            attempts,
                            started,
                            ChunkOutcome::Failed {
                                kind: e.kind().to_string(),
                                reason: e.to_string(),
                            },
                        ),
                        None,
                    );
                }
            }
        }
    }

    /// Per-call timeout, shortened once the deadline approaches so
    /// in-flight calls are bounded by the grace period.
    fn call_timeout(&self, deadline: Option<Instant>) -> Duration {
        let per_call = self.config.request_timeout();
        match deadline {
            Some(dl) => {
                let remaining =
                    dl.saturating_duration_since(Instant::now()) + self.config.grace_period();
                per_call.min(remaining)
            }
            None => per_call,
        }
    }
}

fn chunk_record(
    chunk: &Chunk,
    attempts: u32,
    started: Instant,
    outcome: ChunkOutcome,
) -> ChunkRecord {
    ChunkRecord {
        chunk_id: chunk.id.clone(),
        attempts,
        retries: attempts.saturating_sub(1),
        latency_ms: started.elapsed().as_millis() as u64,
        outcome,
    }
}

fn skipped_record(chunk: &Chunk, reason: &str) -> ChunkRecord {
    ChunkRecord {
        chunk_id: chunk.id.clone(),
        attempts: 0,
        retries: 0,
        latency_ms: 0,
        outcome: ChunkOutcome::Skipped {
            reason: reason.to_string(),
        },
    }
}

/// Some randomness on top of the exponential curve to avoid thundering herd
fn backoff_jitter(max_ms: u64) -> u64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as u64) % max_ms.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_jitter_bounded() {
        assert!(backoff_jitter(100) < 100);
        // Zero max must not panic
        let _ = backoff_jitter(0);
    }

    #[test]
    fn test_call_timeout_without_deadline() {
        let orchestrator = RequestOrchestrator::default();
        assert_eq!(orchestrator.call_timeout(None), Duration::from_secs(60));
    }

    #[test]
    fn test_call_timeout_capped_near_deadline() {
        let mut config = OrchestratorConfig::default();
        config.grace_period_seconds = 2;
        let orchestrator = RequestOrchestrator::new(config);

        let deadline = Instant::now() + Duration::from_secs(1);
        let timeout = orchestrator.call_timeout(Some(deadline));
        assert!(timeout <= Duration::from_secs(3));
    }
}
