//! Local in-process backend
//!
//! Runs inference against a file-backed GGUF model inside the process; no
//! network failure modes exist here. The model is loaded eagerly at
//! construction so a bad path or corrupt file surfaces as
//! [`BackendError::ModelLoad`] from `resolve`, not on first use. The model
//! is not concurrency-safe, so access is serialized behind an async mutex:
//! concurrent requests queue fairly instead of contending.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;
use tracing::{debug, info};

use medscan_core::config::LocalBackendConfig;

use crate::domain::{Backend, BackendError, BackendInfo, GenerationRequest, RawResponse, TokenUsage};

/// End-of-sequence markers across common chat model families
const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<|end|>", "<|eot_id|>", "<|im_end|>"];

/// Adapter for in-process GGUF inference
pub struct LocalBackend {
    model: Arc<Mutex<GgufModel>>,
    config: LocalBackendConfig,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The loaded model (candle weights, tokenizer, device) is not
        // `Debug`; expose only the configuration descriptor.
        f.debug_struct("LocalBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocalBackend {
    /// Load the model and tokenizer from disk.
    ///
    /// Blocking file and tensor work runs on the blocking pool; the
    /// returned adapter holds the fully-initialized model.
    pub async fn load(config: LocalBackendConfig) -> Result<Self, BackendError> {
        let load_config = config.clone();
        let model = tokio::task::spawn_blocking(move || GgufModel::load(&load_config))
            .await
            .map_err(|e| BackendError::model_load(format!("Model load task failed: {}", e)))??;

        info!(
            model_path = %config.model_path,
            context_window = config.context_window,
            "Local model loaded"
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
        })
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "local",
            name: "Local Model",
            model: self.config.model_path.clone(),
            context_window: self.config.context_window,
            max_output_tokens: self.config.max_output_tokens,
        }
    }

    async fn send(&self, request: GenerationRequest) -> Result<RawResponse, BackendError> {
        let started = Instant::now();

        let params = SamplingParams {
            max_output_tokens: request
                .max_tokens
                .map(|t| t as usize)
                .unwrap_or(self.config.max_output_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            seed: self.config.seed,
            context_window: self.config.context_window,
            batch_size: self.config.batch_size,
        };

        let prompt = match request.system {
            Some(ref system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        // Serialize model access; later requests queue on the mutex.
        let mut guard = self.model.clone().lock_owned().await;
        debug!(prompt_len = prompt.len(), "Starting local inference");

        let generation = tokio::task::spawn_blocking(move || guard.generate(&prompt, &params))
            .await
            .map_err(|e| {
                BackendError::resource_exhausted(format!("Inference task failed: {}", e))
            })??;

        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            latency_ms = latency_ms,
            completion_tokens = generation.completion_tokens,
            "Local inference finished"
        );

        Ok(RawResponse {
            backend: "local".to_string(),
            model: self.config.model_path.clone(),
            text: generation.text,
            usage: Some(TokenUsage {
                prompt_tokens: generation.prompt_tokens as u32,
                completion_tokens: generation.completion_tokens as u32,
                total_tokens: (generation.prompt_tokens + generation.completion_tokens) as u32,
            }),
            latency_ms,
        })
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        // The model is loaded eagerly; reachability is not a concern here.
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SamplingParams {
    max_output_tokens: usize,
    temperature: f64,
    seed: u64,
    context_window: usize,
    batch_size: usize,
}

struct GenerationOutput {
    text: String,
    prompt_tokens: usize,
    completion_tokens: usize,
}

/// The loaded model plus everything generation needs
struct GgufModel {
    weights: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
}

impl GgufModel {
    fn load(config: &LocalBackendConfig) -> Result<Self, BackendError> {
        let model_path = Path::new(&config.model_path);
        if !model_path.is_file() {
            return Err(BackendError::model_load(format!(
                "Model file not found: {}",
                config.model_path
            )));
        }

        let device = Device::Cpu;

        let mut file = std::fs::File::open(model_path)
            .map_err(|e| BackendError::model_load(format!("Cannot open model file: {}", e)))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| BackendError::model_load(format!("Invalid GGUF file: {}", e)))?;
        let weights = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| BackendError::model_load(format!("Cannot load model weights: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| BackendError::model_load(format!("Cannot load tokenizer: {}", e)))?;

        let eos_token = EOS_CANDIDATES
            .iter()
            .find_map(|t| tokenizer.token_to_id(t));

        Ok(Self {
            weights,
            tokenizer,
            device,
            eos_token,
        })
    }

    fn generate(
        &mut self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<GenerationOutput, BackendError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| BackendError::malformed(format!("Tokenization failed: {}", e)))?;
        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
        if tokens.is_empty() {
            return Err(BackendError::malformed("Empty prompt after tokenization"));
        }

        // Keep the prompt inside the window, reserving room for the output.
        let prompt_budget = params
            .context_window
            .saturating_sub(params.max_output_tokens)
            .max(1);
        if tokens.len() > prompt_budget {
            tokens.truncate(prompt_budget);
        }
        let prompt_tokens = tokens.len();

        let temperature = if params.temperature > 0.0 {
            Some(params.temperature)
        } else {
            None
        };
        let mut logits_processor = LogitsProcessor::new(params.seed, temperature, None);

        // Prefill in batches; the KV cache advances with index_pos.
        let mut index_pos = 0;
        let mut last_logits = None;
        for batch in tokens.chunks(params.batch_size.max(1)) {
            let input = Tensor::new(batch, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(map_inference_error)?;
            let logits = self
                .weights
                .forward(&input, index_pos)
                .map_err(map_inference_error)?;
            index_pos += batch.len();
            last_logits = Some(logits);
        }

        let mut logits = last_logits
            .ok_or_else(|| BackendError::malformed("Prompt produced no prefill batches"))?
            .squeeze(0)
            .map_err(map_inference_error)?;

        let mut generated: Vec<u32> = Vec::new();
        for _ in 0..params.max_output_tokens {
            let next = logits_processor
                .sample(&logits)
                .map_err(map_inference_error)?;
            if Some(next) == self.eos_token {
                break;
            }
            generated.push(next);

            let input = Tensor::new(&[next][..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(map_inference_error)?;
            logits = self
                .weights
                .forward(&input, index_pos)
                .and_then(|l| l.squeeze(0))
                .map_err(map_inference_error)?;
            index_pos += 1;
        }

        let completion_tokens = generated.len();
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| BackendError::malformed(format!("Detokenization failed: {}", e)))?;

        Ok(GenerationOutput {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }
}

/// Candle surfaces allocation and kernel failures through one error type;
/// at inference time they all mean the local resource gave out.
fn map_inference_error(e: candle_core::Error) -> BackendError {
    BackendError::resource_exhausted(e.to_string())
}
