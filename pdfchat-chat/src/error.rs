//! Error types for the `pdfchat-chat` crate.

use pdfchat_model::ModelError;
use pdfchat_rag::RagError;
use thiserror::Error;

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Embedding the question or searching the index failed.
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RagError),

    /// The language model call failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
