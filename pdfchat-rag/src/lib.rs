//! # pdfchat-rag
//!
//! Document side of pdfchat: extract pages from a PDF, split them into
//! overlapping chunks, embed the chunks and keep them in a flat vector index
//! that is saved to and loaded from a folder.
//!
//! ## Overview
//!
//! - [`PdfLoader`] / [`TextLoader`]: [`Document`] → [`Page`]s
//! - [`RecursiveChunker`] / [`FixedSizeChunker`]: [`Page`]s → [`Chunk`]s
//! - [`candle::CandleEmbeddingProvider`] (all-MiniLM-L6-v2, in process),
//!   [`openai::OpenAIEmbeddingProvider`] and the offline [`HashEmbeddingProvider`]: text → vector
//! - [`FlatIndex`]: build, search, [`save`](FlatIndex::save), [`load`](FlatIndex::load)
//! - [`Retriever`]: question → nearest chunks
//! - [`IngestPipeline`]: document → persisted index

#[cfg(feature = "candle")]
pub mod candle;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod storage;

#[cfg(feature = "candle")]
pub use candle::{CandleEmbeddingProvider, MINILM_DIMENSIONS, MINILM_MODEL_ID};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Page, SearchResult};
pub use embedding::{DEFAULT_HASH_DIMENSIONS, EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use index::{DistanceMetric, FlatIndex, IndexEntry};
pub use loader::{DocumentLoader, PdfLoader, TextLoader};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{IngestPipeline, IngestPipelineBuilder, IngestReport};
pub use retriever::Retriever;
pub use storage::IndexLocation;
