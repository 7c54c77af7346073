//! The query flow: question → retrieval → answer, with memory.

use std::fmt;
use std::sync::Arc;

use pdfchat_model::Llm;
use pdfchat_rag::{EmbeddingProvider, IndexLocation, RagConfig, RagError, Retriever, SearchResult};
use serde::Serialize;
use tracing::{error, info};

use crate::conversation::Conversation;
use crate::error::Result;
use crate::generator::{AnswerGenerator, GeneratorConfig};

/// The reply to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// The model's answer.
    pub text: String,
    /// Chunks the answer was generated from, closest first.
    pub sources: Vec<SearchResult>,
    /// The rewritten question used for retrieval, when the question was condensed.
    pub standalone_question: Option<String>,
}

/// Outcome of [`ChatSession::initialize`].
#[derive(Debug)]
pub enum Readiness {
    /// The index loaded; questions can be asked.
    Ready(ChatSession),
    /// The index is missing, corrupt or incompatible with the embedder.
    NotReady(RagError),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    /// Convert into a `Result`, for callers that propagate with `?`.
    pub fn into_result(self) -> std::result::Result<ChatSession, RagError> {
        match self {
            Readiness::Ready(session) => Ok(session),
            Readiness::NotReady(e) => Err(e),
        }
    }
}

/// A conversation over one vector index.
///
/// Each session owns its memory; `ask` and `clear_history` take `&mut self`,
/// so a session serves one user at a time.
pub struct ChatSession {
    retriever: Retriever,
    generator: AnswerGenerator,
    conversation: Conversation,
}

impl ChatSession {
    /// Assemble a session from parts that are already loaded.
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self { retriever, generator, conversation: Conversation::new() }
    }

    /// Load the index at `location` and prepare a session over it.
    ///
    /// Never fails outright: a missing or unusable index is reported as
    /// [`Readiness::NotReady`].
    pub async fn initialize(
        location: &IndexLocation,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn Llm>,
        rag_config: &RagConfig,
        generator_config: GeneratorConfig,
    ) -> Readiness {
        match Retriever::load(location, embedder, rag_config).await {
            Ok(retriever) => {
                info!(
                    location = %location,
                    entries = retriever.index().len(),
                    model = llm.name(),
                    mode = %generator_config.mode,
                    "chat session ready"
                );
                Readiness::Ready(Self::new(retriever, AnswerGenerator::new(llm, generator_config)))
            }
            Err(e) => {
                error!(location = %location, error = %e, "chat session not ready");
                Readiness::NotReady(e)
            }
        }
    }

    /// Answer `question` from the index, remembering the turn.
    ///
    /// A blank question is a no-op and returns `Ok(None)` without touching
    /// the model or the index.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Retrieval`](crate::ChatError::Retrieval) if the
    /// question cannot be embedded or searched, and
    /// [`ChatError::Model`](crate::ChatError::Model) if a model call fails.
    /// The conversation is unchanged on error.
    pub async fn ask(&mut self, question: &str) -> Result<Option<Answer>> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let standalone = self.generator.condense_question(question, &self.conversation).await?;
        let search_question = standalone.as_deref().unwrap_or(question);

        let sources = self.retriever.retrieve(search_question).await?;
        let text = self
            .generator
            .answer(question, search_question, &sources, &mut self.conversation)
            .await?;

        info!(
            question_len = question.len(),
            condensed = standalone.is_some(),
            source_count = sources.len(),
            history_turns = self.conversation.len(),
            "answered question"
        );
        Ok(Some(Answer { text, sources, standalone_question: standalone }))
    }

    /// Forget the conversation; the next question is answered without history.
    pub fn clear_history(&mut self) {
        self.conversation.reset();
        info!("conversation cleared");
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("entries", &self.retriever.index().len())
            .field("top_k", &self.retriever.top_k())
            .field("model", &self.generator.model_name())
            .field("mode", &self.generator.config().mode)
            .field("turns", &self.conversation.len())
            .finish()
    }
}
