//! # pdfchat-chat
//!
//! Conversational question answering over an index built by `pdfchat-rag`.
//!
//! A [`ChatSession`] embeds each question, retrieves the nearest chunks,
//! prompts the model with them and remembers the turn. Follow-up questions
//! are rewritten into standalone questions first (see [`ConversationMode`]).
//!
//! ```rust,ignore
//! use pdfchat_chat::{ChatSession, GeneratorConfig, Readiness};
//!
//! let mut session = match ChatSession::initialize(&location, embedder, llm, &rag, GeneratorConfig::default()).await {
//!     Readiness::Ready(session) => session,
//!     Readiness::NotReady(e) => return Err(e.into()),
//! };
//! if let Some(answer) = session.ask("Where is Nepal?").await? {
//!     println!("{}", answer.text);
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod session;

pub use conversation::{Conversation, ConversationState, Turn};
pub use error::{ChatError, Result};
pub use generator::{AnswerGenerator, ConversationMode, GeneratorConfig};
pub use session::{Answer, ChatSession, Readiness};
