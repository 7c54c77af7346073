//! Answer generation over retrieved chunks.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use pdfchat_model::{GenerationConfig, Llm, LlmRequest, Message};
use pdfchat_rag::SearchResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::conversation::Conversation;
use crate::error::{ChatError, Result};
use crate::prompt;

/// How prior turns influence the next answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    /// Rewrite follow-ups into standalone questions before retrieval.
    #[default]
    Condense,
    /// Send prior turns as chat messages ahead of the prompt.
    Transcript,
    /// Ignore prior turns.
    Stateless,
}

impl ConversationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationMode::Condense => "condense",
            ConversationMode::Transcript => "transcript",
            ConversationMode::Stateless => "stateless",
        }
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationMode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "condense" => Ok(ConversationMode::Condense),
            "transcript" => Ok(ConversationMode::Transcript),
            "stateless" => Ok(ConversationMode::Stateless),
            other => Err(ChatError::ConfigError(format!("unknown conversation mode '{other}'"))),
        }
    }
}

/// Settings for [`AnswerGenerator`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorConfig {
    /// How history is used.
    pub mode: ConversationMode,
    /// Per-request sampling overrides; unset fields use the model's defaults.
    pub generation: GenerationConfig,
    /// Optional system message sent before everything else.
    pub system_prompt: Option<String>,
}

impl GeneratorConfig {
    pub fn with_mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
}

/// Builds prompts from retrieved chunks and asks the model.
pub struct AnswerGenerator {
    llm: Arc<dyn Llm>,
    config: GeneratorConfig,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn Llm>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.llm.name()
    }

    /// Rewrite `question` into a standalone question using the conversation.
    ///
    /// Returns `None` without calling the model unless the mode is
    /// [`ConversationMode::Condense`] and the conversation has turns. A blank
    /// rewrite also yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Model`] if the model call fails.
    pub async fn condense_question(
        &self,
        question: &str,
        conversation: &Conversation,
    ) -> Result<Option<String>> {
        if self.config.mode != ConversationMode::Condense || conversation.is_empty() {
            return Ok(None);
        }

        let prompt = prompt::condense_prompt(&conversation.format_history(), question);
        let reply = self.complete(vec![Message::user(prompt)]).await?;
        let standalone = reply.trim();

        debug!(question, standalone, "condensed follow-up question");
        Ok((!standalone.is_empty()).then(|| standalone.to_string()))
    }

    /// Answer from `results` and record the turn.
    ///
    /// `prompt_question` goes into the prompt (the standalone form when one
    /// was produced); `question` is what gets recorded. Nothing is recorded
    /// if the model call fails.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Model`] if the model call fails.
    pub async fn answer(
        &self,
        question: &str,
        prompt_question: &str,
        results: &[SearchResult],
        conversation: &mut Conversation,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        if self.config.mode == ConversationMode::Transcript {
            messages.extend(conversation.to_messages());
        }
        messages.push(Message::user(prompt::qa_prompt(prompt_question, results)));

        let text = self.complete(messages).await?;
        conversation.record(question, text.as_str());
        Ok(text)
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = LlmRequest::new(messages).with_config(self.config.generation.clone());
        let response = self.llm.generate(request).await.map_err(|e| {
            error!(model = self.llm.name(), error = %e, "model call failed");
            ChatError::Model(e)
        })?;
        Ok(response.text)
    }
}
