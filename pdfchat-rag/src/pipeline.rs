//! Document ingestion pipeline.
//!
//! The [`IngestPipeline`] turns a source document into a persisted vector
//! index: load pages → chunk → embed → build → save.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfchat_rag::{IngestPipeline, IndexLocation, RagConfig, HashEmbeddingProvider};
//!
//! let pipeline = IngestPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .build()?;
//!
//! let report = pipeline
//!     .ingest_path("data/Constitution-of-Nepal.pdf", &IndexLocation::new("data/vectorstores", "vector_space"))
//!     .await?;
//! println!("vector store created: {}", report.location);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, Page};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{FlatIndex, IndexEntry};
use crate::loader::{DocumentLoader, PdfLoader};
use crate::storage::IndexLocation;

/// Chunks sent to the embedder per request.
const EMBED_BATCH_SIZE: usize = 64;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Where the index was written.
    pub location: IndexLocation,
    /// Pages extracted from the document.
    pub pages: usize,
    /// Chunks embedded and stored.
    pub chunks: usize,
    /// Vector dimensionality of the index.
    pub dimensions: usize,
}

/// The ingest pipeline orchestrator.
///
/// Construct one via [`IngestPipeline::builder()`].
pub struct IngestPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    loader: Arc<dyn DocumentLoader>,
}

impl IngestPipeline {
    /// Create a new [`IngestPipelineBuilder`].
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Read the file at `path` and ingest it.
    ///
    /// # Errors
    ///
    /// See [`ingest`](Self::ingest).
    pub async fn ingest_path(
        &self,
        path: impl AsRef<Path>,
        location: &IndexLocation,
    ) -> Result<IngestReport> {
        let document = Document::read(path).await?;
        self.ingest(&document, location).await
    }

    /// Ingest a document: load → chunk → embed → build → save.
    ///
    /// Nothing is written unless every step before saving succeeds.
    ///
    /// # Errors
    ///
    /// - [`RagError::ExtractionError`] if the document cannot be read as pages.
    /// - [`RagError::PipelineError`] if no text was extracted.
    /// - [`RagError::EmbeddingError`] from the provider, unchanged, if embedding fails.
    /// - [`RagError::Io`] if the index cannot be written.
    pub async fn ingest(&self, document: &Document, location: &IndexLocation) -> Result<IngestReport> {
        // 1. Extract pages
        let pages = self.loader.load(document).await?;

        // 2. Chunk, embed and build
        let index = self.build_index(&pages).await.map_err(|e| {
            error!(path = %document.path.display(), error = %e, "ingestion failed");
            match e {
                RagError::PipelineError(message) => RagError::PipelineError(format!(
                    "{message} (document '{}')",
                    document.path.display()
                )),
                other => other,
            }
        })?;

        // 3. Persist
        index.save(location).await?;

        let report = IngestReport {
            location: location.clone(),
            pages: pages.len(),
            chunks: index.len(),
            dimensions: index.dimensions(),
        };
        info!(
            path = %document.path.display(),
            pages = report.pages,
            chunk_count = report.chunks,
            location = %location,
            "ingested document"
        );
        Ok(report)
    }

    /// Chunk and embed pages into an in-memory index without saving it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the pages hold no text and
    /// propagates the provider's [`RagError::EmbeddingError`].
    pub async fn build_index(&self, pages: &[Page]) -> Result<FlatIndex> {
        let chunks = self.chunker.chunk(pages);
        if chunks.is_empty() {
            return Err(RagError::PipelineError("no text could be extracted".to_string()));
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let entries = vectors.into_iter().zip(chunks).map(|(v, c)| IndexEntry::new(v, c)).collect();

        Ok(FlatIndex::build(entries, self.config.metric)?
            .with_embedding_model(self.embedding_provider.model_id()))
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(error = %e, "embedding failed during ingestion");
                e
            })?;
            if embeddings.len() != texts.len() {
                return Err(RagError::PipelineError(format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    texts.len()
                )));
            }
            vectors.extend(embeddings);
        }
        Ok(vectors)
    }
}

/// Builder for constructing an [`IngestPipeline`].
///
/// `config` and `embedding_provider` are required. The chunker defaults to a
/// [`RecursiveChunker`] sized from the config, the loader to [`PdfLoader`].
#[derive(Default)]
pub struct IngestPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<Arc<dyn DocumentLoader>>,
}

impl IngestPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the [`IngestPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<IngestPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(RecursiveChunker::from_config(&config)));
        let loader = self.loader.unwrap_or_else(|| Arc::new(PdfLoader::new()));

        Ok(IngestPipeline { config, embedding_provider, chunker, loader })
    }
}
