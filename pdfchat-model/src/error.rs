//! Error types for the `pdfchat-model` crate.

use thiserror::Error;

/// Errors returned by [`Llm`](crate::Llm) implementations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("Request error ({provider}): {message}")]
    RequestError {
        /// The model provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("API error ({provider}, status {status}): {message}")]
    ApiError {
        /// The model provider.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// The provider's error message, or the raw body.
        message: String,
    },

    /// The provider answered successfully but the body was unusable.
    #[error("Response error ({provider}): {message}")]
    ResponseError {
        /// The model provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for model calls.
pub type Result<T> = std::result::Result<T, ModelError>;
