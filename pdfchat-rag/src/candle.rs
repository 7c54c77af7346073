//! In-process sentence embeddings with Candle.
//!
//! Runs `sentence-transformers/all-MiniLM-L6-v2` locally:
//! - 384 dimensions
//! - BERT architecture, mean pooled over the attention mask
//! - L2-normalised output
//!
//! Weights, config and tokenizer are fetched from the Hugging Face Hub on
//! first use and cached on disk.

use std::path::PathBuf;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Model identifier on the Hugging Face Hub.
pub const MINILM_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding dimension of all-MiniLM-L6-v2.
pub const MINILM_DIMENSIONS: usize = 384;

/// Longer inputs are truncated to this many tokens.
const MAX_TOKENS: usize = 256;

const PROVIDER: &str = "candle";

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// Local all-MiniLM-L6-v2 [`EmbeddingProvider`].
///
/// Construction is cheap; the model is downloaded and loaded by the first
/// call to [`embed`](EmbeddingProvider::embed) or [`init`](Self::init).
/// Each text is encoded on its own, without padding, so a text always maps
/// to the same vector regardless of how it was batched.
pub struct CandleEmbeddingProvider {
    device: Device,
    cache_dir: Option<PathBuf>,
    loaded: OnceCell<LoadedModel>,
}

impl CandleEmbeddingProvider {
    /// Create a provider using the default Hugging Face cache.
    pub fn new() -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        debug!(?device, "candle embedder device selected");
        Self { device, cache_dir: None, loaded: OnceCell::new() }
    }

    /// Store downloaded model files under `dir` instead of the default cache.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Run on a specific device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Download (if needed) and load the model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the files cannot be fetched or
    /// the model cannot be built from them.
    pub async fn init(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&LoadedModel> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedModel> {
        info!(model = MINILM_MODEL_ID, "loading embedding model");

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build().map_err(|e| embed_error(format!("failed to create hub client: {e}")))?;
        let repo = api.repo(Repo::new(MINILM_MODEL_ID.to_string(), RepoType::Model));

        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| embed_error(format!("failed to download tokenizer: {e}")))?;
        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| embed_error(format!("failed to download config: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| embed_error(format!("failed to download weights: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embed_error(format!("failed to load tokenizer: {e}")))?;
        let config_text = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| embed_error(format!("failed to read config: {e}")))?;
        let config: Config = serde_json::from_str(&config_text)
            .map_err(|e| embed_error(format!("failed to parse config: {e}")))?;

        // SAFETY: the safetensors file is only read, through a read-only mapping.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| embed_error(format!("failed to map weights: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| embed_error(format!("failed to build BERT model: {e}")))?;

        info!(model = MINILM_MODEL_ID, "embedding model ready");
        Ok(LoadedModel { model, tokenizer })
    }

    fn encode(&self, loaded: &LoadedModel, text: &str) -> Result<Vec<f32>> {
        let encoding = loaded
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_error(format!("tokenization failed: {e}")))?;
        let ids = encoding.get_ids();
        let ids = &ids[..ids.len().min(MAX_TOKENS)];
        let len = ids.len();

        let input_ids = Tensor::new(ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference)?;
        let token_type_ids = input_ids.zeros_like().map_err(inference)?;
        let attention_mask = input_ids.ones_like().map_err(inference)?;

        let output = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference)?;

        let pooled = mean_pool(&output, &attention_mask).map_err(inference)?;
        let normalized = l2_normalize(&pooled).map_err(inference)?;
        let vector = normalized.squeeze(0).and_then(|t| t.to_vec1::<f32>()).map_err(inference)?;

        debug!(tokens = len, "encoded text");
        Ok(vector)
    }
}

impl Default for CandleEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CandleEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbeddingProvider")
            .field("model", &MINILM_MODEL_ID)
            .field("device", &self.device)
            .field("cache_dir", &self.cache_dir)
            .field("loaded", &self.loaded.initialized())
            .finish()
    }
}

/// Mean of the token embeddings, counting only unmasked tokens.
fn mean_pool(token_embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask
        .unsqueeze(2)?
        .broadcast_as(token_embeddings.shape())?
        .to_dtype(DType::F32)?;
    let sum = token_embeddings.mul(&mask)?.sum(1)?;
    let count = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    sum.div(&count)
}

fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norm = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
    embeddings.broadcast_div(&norm)
}

fn embed_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.to_string(), message }
}

fn inference(e: candle_core::Error) -> RagError {
    embed_error(format!("inference failed: {e}"))
}

#[async_trait]
impl EmbeddingProvider for CandleEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let loaded = self.model().await?;
        self.encode(loaded, text)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let loaded = self.model().await?;
        debug!(count = texts.len(), "embedding batch");
        texts.iter().map(|text| self.encode(loaded, text)).collect()
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }

    fn model_id(&self) -> &str {
        MINILM_MODEL_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn construction_does_not_load_the_model() {
        let provider = CandleEmbeddingProvider::new().with_device(Device::Cpu);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.model_id(), "sentence-transformers/all-MiniLM-L6-v2");
        assert!(!provider.loaded.initialized());
    }

    #[test]
    fn mean_pool_ignores_masked_tokens() {
        let tokens = Tensor::new(&[[[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();

        let pooled = mean_pool(&tokens, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn normalized_rows_have_unit_length() {
        let rows = Tensor::new(&[[3.0f32, 4.0]], &Device::Cpu).unwrap();
        let out = l2_normalize(&rows).unwrap().to_vec2::<f32>().unwrap();
        assert!((out[0][0] - 0.6).abs() < 1e-6);
        assert!((out[0][1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn related_sentences_score_higher() {
        let cache = tempfile::tempdir().unwrap();
        let provider = CandleEmbeddingProvider::new().with_cache_dir(cache.path());
        provider.init().await.unwrap();

        let query = provider.embed("In what region of the world is this nation located?").await.unwrap();
        let region = provider.embed("Nepal is a country in South Asia.").await.unwrap();
        let capital = provider.embed("Kathmandu is the capital of Nepal.").await.unwrap();
        assert_eq!(query.len(), 384);
        assert!((dot(&query, &query).sqrt() - 1.0).abs() < 1e-3);
        assert!(dot(&query, &region) > dot(&query, &capital));

        let batch = provider.embed_batch(&["Nepal is a country in South Asia."]).await.unwrap();
        assert_eq!(batch[0], region);
    }
}
