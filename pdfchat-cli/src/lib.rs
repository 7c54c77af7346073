//! # pdfchat-cli
//!
//! The `pdfchat` binary: build a vector store from a PDF, then ask about it.
//!
//! ```text
//! pdfchat ingest data/Constitution-of-Nepal.pdf
//! pdfchat ask "What does the preamble say about sovereignty?"
//! pdfchat chat --sources
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;

pub use cli::{Cli, Command};
pub use commands::run;
