//! Conversation memory.

use pdfchat_model::Message;
use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The question as the user asked it.
    pub question: String,
    /// The model's answer.
    pub answer: String,
}

/// Whether a conversation has any memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No turns recorded.
    Uninitialized,
    /// At least one turn recorded.
    Active,
}

/// Ordered question/answer turns of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// An empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`ConversationState::Active`] once a turn has been recorded.
    pub fn state(&self) -> ConversationState {
        if self.turns.is_empty() {
            ConversationState::Uninitialized
        } else {
            ConversationState::Active
        }
    }

    /// Recorded turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn { question: question.into(), answer: answer.into() });
    }

    /// Forget every turn.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// History as plain text, one `Human:`/`Assistant:` pair per turn, each
    /// line preceded by a newline.
    pub fn format_history(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("\nHuman: {}\nAssistant: {}", t.question, t.answer))
            .collect()
    }

    /// History as alternating user and assistant messages.
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .flat_map(|t| [Message::user(t.question.as_str()), Message::assistant(t.answer.as_str())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pdfchat_model::Role;

    use super::*;

    #[test]
    fn record_and_reset_drive_the_state() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.state(), ConversationState::Uninitialized);

        conversation.record("Where is Nepal?", "South Asia.");
        assert_eq!(conversation.state(), ConversationState::Active);
        assert_eq!(conversation.len(), 1);

        conversation.reset();
        assert_eq!(conversation.state(), ConversationState::Uninitialized);
        assert!(conversation.format_history().is_empty());
    }

    #[test]
    fn history_text_format() {
        let mut conversation = Conversation::new();
        conversation.record("q1", "a1");
        conversation.record("q2", "a2");
        assert_eq!(conversation.format_history(), "\nHuman: q1\nAssistant: a1\nHuman: q2\nAssistant: a2");
    }

    #[test]
    fn messages_alternate_roles() {
        let mut conversation = Conversation::new();
        conversation.record("q1", "a1");
        let roles: Vec<Role> = conversation.to_messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }
}
