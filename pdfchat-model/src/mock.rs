//! Scripted [`Llm`] for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ModelError, Result};
use crate::llm::{Llm, LlmRequest, LlmResponse};

/// An [`Llm`] that replays queued replies and records every request.
///
/// Replies are consumed in order. Once the queue is empty the mock echoes
/// the last user message, so a test that only cares about prompts need not
/// script anything.
///
/// ```rust,ignore
/// let llm = MockLlm::new("mock").with_response("Kathmandu").with_error("rate limited");
/// ```
pub struct MockLlm {
    name: String,
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    /// Create a mock with an empty queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), replies: Mutex::default(), requests: Mutex::default() }
    }

    /// Queue a successful reply.
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.replies.get_mut().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure, surfaced as a `503` [`ModelError::ApiError`].
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.replies.get_mut().push_back(Err(message.into()));
        self
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls to [`generate`](Llm::generate).
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let echo = request.last_user_message().unwrap_or_default().to_string();
        self.requests.lock().await.push(request);

        match self.replies.lock().await.pop_front() {
            Some(Ok(text)) => Ok(LlmResponse::text(text)),
            Some(Err(message)) => {
                Err(ModelError::ApiError { provider: self.name.clone(), status: 503, message })
            }
            None => Ok(LlmResponse::text(echo)),
        }
    }
}
