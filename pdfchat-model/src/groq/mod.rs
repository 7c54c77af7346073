//! Groq provider.
//!
//! Groq serves open models (Llama 3, Mixtral, Gemma) behind an
//! OpenAI-compatible `chat/completions` endpoint. Requests are sent
//! non-streaming; the whole reply is returned at once.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfchat_model::groq::{GroqClient, GroqConfig};
//!
//! let client = GroqClient::new(GroqConfig::from_env()?.with_max_tokens(512))?;
//! ```
//!
//! This module is only available when the `groq` feature is enabled.

mod client;
mod config;

pub use client::GroqClient;
pub use config::{DEFAULT_GROQ_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, GROQ_API_BASE, GroqConfig};
