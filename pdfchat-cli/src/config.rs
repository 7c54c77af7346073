//! Turning parsed arguments into library configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pdfchat_chat::GeneratorConfig;
use pdfchat_model::groq::GroqConfig;
use pdfchat_rag::{
    CandleEmbeddingProvider, DEFAULT_HASH_DIMENSIONS, EmbeddingProvider, HashEmbeddingProvider,
    IndexLocation, OpenAIEmbeddingProvider, RagConfig,
};

use crate::cli::{EmbedderKind, EmbeddingArgs, IndexArgs, ModelArgs};

impl IndexArgs {
    pub fn location(&self) -> IndexLocation {
        IndexLocation::new(&self.folder, &self.name)
    }

    pub fn rag_config(&self) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .metric(self.metric);
        if let Some(max) = self.max_distance {
            builder = builder.max_distance(max);
        }
        Ok(builder.build()?)
    }
}

impl EmbeddingArgs {
    /// Build the configured embedder.
    pub fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.embedder {
            EmbedderKind::Candle => {
                let mut provider = CandleEmbeddingProvider::new();
                if let Some(dir) = &self.model_cache {
                    provider = provider.with_cache_dir(dir);
                }
                Ok(Arc::new(provider))
            }
            EmbedderKind::Hash => {
                let dims = self.embedding_dimensions.unwrap_or(DEFAULT_HASH_DIMENSIONS);
                Ok(Arc::new(HashEmbeddingProvider::new(dims)?))
            }
            EmbedderKind::Openai => {
                let mut provider = match &self.embedding_api_key {
                    Some(key) => OpenAIEmbeddingProvider::new(key.as_str())?,
                    None => OpenAIEmbeddingProvider::from_env()
                        .context("the openai embedder needs PDFCHAT_EMBEDDING_API_KEY or OPENAI_API_KEY")?,
                };
                if let Some(url) = &self.embedding_url {
                    provider = provider.with_base_url(url.as_str());
                }
                if let Some(model) = &self.embedding_model {
                    provider = provider.with_model(model.as_str());
                }
                if let Some(dims) = self.embedding_dimensions {
                    provider = provider.with_native_dimensions(dims);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

impl ModelArgs {
    pub fn groq_config(&self) -> Result<GroqConfig> {
        let key = self
            .groq_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("GROQ_API_KEY must be set to answer questions")?;

        let mut config = GroqConfig::new(key, self.model.as_str())
            .with_temperature(self.temperature)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(url) = &self.llm_url {
            config = config.with_base_url(url.as_str());
        }
        if let Some(max) = self.max_tokens {
            config = config.with_max_tokens(max);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::default().with_mode(self.mode);
        if let Some(prompt) = &self.system_prompt {
            config = config.with_system_prompt(prompt.as_str());
        }
        config
    }
}
