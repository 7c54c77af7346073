//! Command-line arguments.
//!
//! Every option can also be set through a `PDFCHAT_*` environment variable
//! (or a `.env` file in the working directory).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pdfchat_chat::ConversationMode;
use pdfchat_model::groq::{DEFAULT_GROQ_MODEL, DEFAULT_TEMPERATURE};
use pdfchat_rag::DistanceMetric;
use pdfchat_telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "pdfchat", version, about = "Ask questions about a PDF document")]
pub struct Cli {
    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    /// Log output format on stderr (pretty, compact or json)
    #[arg(long, global = true, env = "PDFCHAT_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract, chunk and embed a document, then save the vector store
    Ingest {
        /// PDF to ingest (`.txt` files are read as plain text, form feeds as page breaks)
        document: PathBuf,
    },

    /// Answer a single question
    Ask {
        #[command(flatten)]
        model: ModelArgs,

        /// Print the answer and its sources as JSON
        #[arg(long)]
        json: bool,

        /// Do not print source excerpts
        #[arg(long)]
        no_sources: bool,

        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start an interactive conversation
    Chat {
        #[command(flatten)]
        model: ModelArgs,

        /// Print source excerpts under each answer
        #[arg(long)]
        sources: bool,
    },
}

impl Command {
    /// Log directives used when `RUST_LOG` is unset. Interactive commands
    /// keep the terminal quiet.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Command::Ingest { .. } => pdfchat_telemetry::DEFAULT_FILTER,
            Command::Ask { .. } | Command::Chat { .. } => "warn",
        }
    }
}

/// Where the vector store lives and how it is built and searched.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Folder holding the vector store
    #[arg(long, global = true, env = "PDFCHAT_INDEX_FOLDER", default_value = "data/vectorstores")]
    pub folder: PathBuf,

    /// Vector store name
    #[arg(long, global = true, env = "PDFCHAT_INDEX_NAME", default_value = "vector_space")]
    pub name: String,

    /// Maximum characters per chunk
    #[arg(long, global = true, env = "PDFCHAT_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, env = "PDFCHAT_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, global = true, env = "PDFCHAT_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Distance metric for new vector stores (l2 or cosine)
    #[arg(long, global = true, env = "PDFCHAT_METRIC", default_value = "l2")]
    pub metric: DistanceMetric,

    /// Drop retrieved chunks farther than this from the question
    #[arg(long, global = true, env = "PDFCHAT_MAX_DISTANCE")]
    pub max_distance: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// all-MiniLM-L6-v2 run locally (downloaded on first use)
    Candle,
    /// Offline feature-hashing embedder, lexical only
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint
    Openai,
}

/// Which embedder turns text into vectors. Must match between ingest and query.
#[derive(Args, Debug, Clone)]
pub struct EmbeddingArgs {
    /// Embedding backend
    #[arg(long, global = true, env = "PDFCHAT_EMBEDDER", value_enum, default_value_t = EmbedderKind::Candle)]
    pub embedder: EmbedderKind,

    /// Directory for downloaded model files (defaults to the Hugging Face cache)
    #[arg(long, global = true, env = "PDFCHAT_MODEL_CACHE")]
    pub model_cache: Option<PathBuf>,

    /// Base URL of the embeddings API (e.g. a text-embeddings-inference server)
    #[arg(long, global = true, env = "PDFCHAT_EMBEDDING_URL")]
    pub embedding_url: Option<String>,

    /// Embedding model name
    #[arg(long, global = true, env = "PDFCHAT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Vector dimensions produced by the embedder
    #[arg(long, global = true, env = "PDFCHAT_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// API key for the embeddings API (falls back to OPENAI_API_KEY)
    #[arg(long, global = true, env = "PDFCHAT_EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,
}

/// The answering model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Chat model
    #[arg(long, env = "PDFCHAT_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub model: String,

    /// Base URL of the chat completions API
    #[arg(long, env = "PDFCHAT_LLM_URL")]
    pub llm_url: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "PDFCHAT_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens per answer
    #[arg(long, env = "PDFCHAT_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, env = "PDFCHAT_LLM_TIMEOUT", default_value_t = 120)]
    pub timeout_secs: u64,

    /// How earlier turns are used (condense, transcript or stateless)
    #[arg(long, env = "PDFCHAT_CONVERSATION_MODE", default_value = "condense")]
    pub mode: ConversationMode,

    /// System message sent before every prompt
    #[arg(long, env = "PDFCHAT_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,
}
