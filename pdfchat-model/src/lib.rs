//! # pdfchat-model
//!
//! Chat model integrations for pdfchat.
//!
//! ## Overview
//!
//! - [`Llm`] - the provider-neutral chat trait
//! - [`GroqClient`] - Groq's hosted models (Llama 3 and friends)
//! - [`MockLlm`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pdfchat_model::{GroqClient, GroqConfig, Llm, LlmRequest, Message};
//!
//! let model = GroqClient::new(GroqConfig::from_env()?)?;
//! let reply = model
//!     .generate(LlmRequest::new(vec![Message::user("Where is Nepal?")]))
//!     .await?;
//! println!("{}", reply.text);
//! ```
//!
//! ## Supported Models
//!
//! | Model | Description |
//! |-------|-------------|
//! | `llama3-8b-8192` | Default; fast and cheap |
//! | `llama3-70b-8192` | Larger Llama 3 |
//! | `mixtral-8x7b-32768` | Long context |

pub mod error;
#[cfg(feature = "groq")]
pub mod groq;
pub mod llm;
pub mod mock;

pub use error::{ModelError, Result};
#[cfg(feature = "groq")]
pub use groq::{GroqClient, GroqConfig};
pub use llm::{GenerationConfig, Llm, LlmRequest, LlmResponse, Message, Role, Usage};
pub use mock::MockLlm;
