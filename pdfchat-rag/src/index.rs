//! Exact nearest-neighbour vector index.
//!
//! [`FlatIndex`] keeps every (vector, chunk) entry in insertion order and
//! answers queries by scanning all of them. It is built once from a batch,
//! never mutated, and persisted as a unit (see [`crate::storage`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Distance function used to rank entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine similarity`; `1.0` when either vector is zero.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    /// Lower-case name used in manifests and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(RagError::ConfigError(format!("unknown distance metric '{other}'"))),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A vector and the chunk it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The chunk embedding.
    pub vector: Vec<f32>,
    /// The embedded chunk.
    pub chunk: Chunk,
}

impl IndexEntry {
    /// Pair a vector with its chunk.
    pub fn new(vector: Vec<f32>, chunk: Chunk) -> Self {
        Self { vector, chunk }
    }
}

/// An immutable, exhaustively searched vector index.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{DistanceMetric, FlatIndex, IndexEntry};
///
/// let index = FlatIndex::build(entries, DistanceMetric::L2)?;
/// let hits = index.search(&query_vector, 5)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    metric: DistanceMetric,
    dimensions: usize,
    embedding_model: String,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Build an index from a batch of entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if `entries` is empty, a vector is
    /// zero-length, or vectors differ in dimension.
    pub fn build(entries: Vec<IndexEntry>, metric: DistanceMetric) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Err(RagError::IndexError("cannot build an index with no entries".to_string()));
        };
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(RagError::IndexError("vectors must not be empty".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(RagError::IndexError(format!(
                "chunk '{}' has {} dimensions, expected {dimensions}",
                bad.chunk.id,
                bad.vector.len()
            )));
        }

        debug!(entries = entries.len(), dimensions, %metric, "built flat index");
        Ok(Self { metric, dimensions, embedding_model: String::new(), entries })
    }

    /// Record which embedding model produced the vectors.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// The metric results are ranked by.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Dimensionality shared by every vector in the index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embedding model recorded at build time; empty if unknown.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Return the `k` entries closest to `query`.
    ///
    /// Results are ordered by non-decreasing distance; equal distances keep
    /// insertion order. At most `min(k, len)` results are returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if `query` has the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(RagError::IndexError(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.metric.distance(&entry.vector, query)))
            .collect();

        // Stable sort, so ties stay in insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, distance))| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                distance,
                rank,
            })
            .collect())
    }

    pub(crate) fn from_parts(
        metric: DistanceMetric,
        dimensions: usize,
        embedding_model: String,
        entries: Vec<IndexEntry>,
    ) -> Self {
        Self { metric, dimensions, embedding_model, entries }
    }
}
