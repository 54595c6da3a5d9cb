//! Analysis pipeline
//!
//! The single entry point external collaborators (UI, CLI, export) call.
//! Composes registry → chunker → orchestrator: resolve the backend, split
//! the project under its context budget, run every chunk through the
//! backend and interpreter, hand back the aggregated result.
//!
//! Only configuration problems (including a failed local model load) fail
//! the call; every per-chunk failure is absorbed into the result's ledger,
//! so callers always receive a result object that explains what could and
//! could not be determined.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use medscan_core::config::{BackendConfig, OrchestratorConfig};
use medscan_core::domain::{AnalysisKind, AnalysisRequest, AnalysisResult, ProjectSnapshot};

use crate::application::orchestrator::RequestOrchestrator;
use crate::domain::BackendError;
use crate::infrastructure::chunker::split_project;
use crate::infrastructure::registry::BackendRegistry;

/// Tokens reserved for the prompt template around each chunk
const PROMPT_OVERHEAD_TOKENS: usize = 512;
/// Smallest chunk window the pipeline will work with
const MIN_CHUNK_WINDOW_TOKENS: usize = 256;

/// Top-level coordinator for analysis requests
pub struct AnalysisPipeline {
    registry: Arc<BackendRegistry>,
    orchestrator: RequestOrchestrator,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPipeline {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self {
            registry: Arc::new(BackendRegistry::new()),
            orchestrator: RequestOrchestrator::new(config),
        }
    }

    /// Share an existing registry (and its adapter cache) across pipelines.
    pub fn with_registry(registry: Arc<BackendRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            orchestrator: RequestOrchestrator::new(config),
        }
    }

    /// The registry backing this pipeline.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Run one analysis over a project.
    pub async fn analyze(
        &self,
        project: &ProjectSnapshot,
        kind: AnalysisKind,
        config: &BackendConfig,
    ) -> Result<AnalysisResult, BackendError> {
        self.analyze_request(
            project,
            AnalysisRequest::new(kind),
            config,
            CancellationToken::new(),
        )
        .await
    }

    /// Run one analysis with caller-controlled cancellation.
    ///
    /// Cancelling mid-run yields a partial (or failed) result, not an error.
    pub async fn analyze_with_cancellation(
        &self,
        project: &ProjectSnapshot,
        kind: AnalysisKind,
        config: &BackendConfig,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult, BackendError> {
        self.analyze_request(project, AnalysisRequest::new(kind), config, cancel)
            .await
    }

    /// Run a fully-specified request (custom schema or template override).
    pub async fn analyze_request(
        &self,
        project: &ProjectSnapshot,
        request: AnalysisRequest,
        config: &BackendConfig,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult, BackendError> {
        let backend = self.registry.resolve(config).await?;
        let info = backend.info();

        let window = info
            .context_window
            .saturating_sub(info.max_output_tokens + PROMPT_OVERHEAD_TOKENS)
            .max(MIN_CHUNK_WINDOW_TOKENS);

        let chunks = split_project(project, window);
        debug!(
            project = %project.name,
            backend = info.id,
            window_tokens = window,
            chunks = chunks.len(),
            "Project chunked"
        );

        let result = self
            .orchestrator
            .execute(&request, backend, chunks, cancel)
            .await;

        // Per-chunk failures stay in the ledger, with one exception: when
        // every chunk died of resource exhaustion before anything
        // succeeded, the run as a whole was impossible and the caller must
        // hear it as an error, not a quietly empty result.
        if Self::exhausted_before_any_success(&result) {
            return Err(BackendError::resource_exhausted(
                "backend resources exhausted before any chunk succeeded",
            ));
        }

        info!(
            request_id = %result.request_id,
            status = ?result.status,
            artifacts = result.artifacts.len(),
            "Analysis complete"
        );

        Ok(result)
    }

    fn exhausted_before_any_success(result: &AnalysisResult) -> bool {
        !result.ledger.is_empty()
            && result
                .ledger
                .iter()
                .all(|r| r.outcome.failure_kind() == Some("resource_exhausted"))
    }
}
