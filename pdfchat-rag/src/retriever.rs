//! Query-time retrieval over a loaded [`FlatIndex`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::storage::IndexLocation;

/// Embeds a question and returns the nearest chunks from an index.
///
/// The embedder must be the one the index was built with; a dimension
/// mismatch is rejected up front and a model-name mismatch is logged.
pub struct Retriever {
    index: Arc<FlatIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    max_distance: Option<f32>,
}

impl Retriever {
    /// Wrap an already loaded index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedder's dimensionality
    /// differs from the index's.
    pub fn new(
        index: Arc<FlatIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RagConfig,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(RagError::ConfigError(format!(
                "embedder '{}' produces {} dimensions but the index holds {}",
                embedder.model_id(),
                embedder.dimensions(),
                index.dimensions()
            )));
        }
        if !index.embedding_model().is_empty() && index.embedding_model() != embedder.model_id() {
            warn!(
                index_model = index.embedding_model(),
                embedder_model = embedder.model_id(),
                "index was built with a different embedding model"
            );
        }
        Ok(Self { index, embedder, top_k: config.top_k, max_distance: config.max_distance })
    }

    /// Load the index at `location` and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates [`FlatIndex::load`] errors and the checks of [`Retriever::new`].
    pub async fn load(
        location: &IndexLocation,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RagConfig,
    ) -> Result<Self> {
        let index = FlatIndex::load(location).await.map_err(|e| {
            error!(location = %location, error = %e, "failed to load vector index");
            e
        })?;
        Self::new(Arc::new(index), embedder, config)
    }

    /// The wrapped index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Number of chunks returned per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return up to `top_k` nearest chunks, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the embedder fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        let results = self.search_by_vector(&query_embedding)?;
        info!(result_count = results.len(), top_k = self.top_k, "retrieval completed");
        Ok(results)
    }

    /// Search with a precomputed query vector.
    pub fn search_by_vector(&self, query: &[f32]) -> Result<Vec<SearchResult>> {
        let results = self.index.search(query, self.top_k)?;
        Ok(match self.max_distance {
            Some(max) => results.into_iter().filter(|r| r.distance <= max).collect(),
            None => results,
        })
    }
}
