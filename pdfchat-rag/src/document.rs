//! Data types for documents, pages, chunks, and search results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// A source file awaiting ingestion.
///
/// Holds the raw bytes so extraction never touches the filesystem twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the bytes came from.
    pub path: PathBuf,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Wrap bytes that were obtained elsewhere (an upload, a test fixture).
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { path: path.into(), bytes: bytes.into() }
    }

    /// Read a document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ExtractionError`] if the file cannot be read.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| RagError::ExtractionError {
            path: path.to_path_buf(),
            message: format!("failed to read file: {e}"),
        })?;
        Ok(Self { path: path.to_path_buf(), bytes })
    }

    /// The path rendered for metadata and citations.
    pub fn source(&self) -> String {
        self.path.display().to_string()
    }
}

/// One page of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// The text content of the page.
    pub text: String,
    /// The source document path.
    pub source: String,
    /// Zero-based page number.
    pub page: usize,
    /// Number of pages in the source document.
    pub total_pages: usize,
    /// Extra key-value metadata propagated to every chunk of this page.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Page {
    /// Create a page with empty extra metadata.
    pub fn new(
        source: impl Into<String>,
        page: usize,
        total_pages: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
            total_pages,
            metadata: HashMap::new(),
        }
    }

    /// File stem of the source, used as the prefix of chunk IDs.
    pub fn stem(&self) -> String {
        Path::new(&self.source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// A bounded span of page text; the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{stem}_{page}_{position}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The source document path.
    pub source: String,
    /// Zero-based page the chunk was cut from.
    pub page: usize,
    /// Sequence position within the whole document.
    pub position: usize,
    /// Byte offset of `text` within its page.
    pub start_index: usize,
    /// Key-value metadata inherited from the page plus chunk-specific fields.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Distance to the query vector (lower is closer).
    pub distance: f32,
    /// Zero-based rank in the result list.
    pub rank: usize,
}
