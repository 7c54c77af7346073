//! Error types for the `pdfchat-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting documents or querying an index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Text could not be extracted from a source document.
    #[error("Extraction error ({}): {message}", path.display())]
    ExtractionError {
        /// The document that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An invalid operation on an in-memory vector index.
    #[error("Index error: {0}")]
    IndexError(String),

    /// No persisted index exists at the requested location.
    #[error("Vector index not found at {}", path.display())]
    IndexNotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// A persisted index exists but cannot be decoded.
    #[error("Vector index at {} is corrupt: {message}", path.display())]
    IndexCorrupt {
        /// The file that failed to decode.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the ingest pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem failure while persisting an index.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
