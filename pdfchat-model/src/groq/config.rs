//! Groq client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{ModelError, Result};

/// The Groq OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default chat model.
pub const DEFAULT_GROQ_MODEL: &str = "llama3-8b-8192";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for [`GroqClient`](super::GroqClient).
#[derive(Clone)]
pub struct GroqConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Base URL (everything before `/chat/completions`).
    pub base_url: String,
    /// Sampling temperature; requests may override it.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens; requests may override it.
    pub max_tokens: Option<u32>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl GroqConfig {
    /// Configuration for `model` with the default base URL, temperature and timeout.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_API_BASE.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for `llama3-8b-8192`.
    pub fn llama3(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_GROQ_MODEL)
    }

    /// Read the API key from `GROQ_API_KEY` and use the default model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var("GROQ_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::llama3(key)),
            _ => Err(ModelError::ConfigError("GROQ_API_KEY is not set".to_string())),
        }
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the configuration can produce valid requests.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] for an empty key or model, or a
    /// temperature outside `0.0..=2.0`.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ModelError::ConfigError("Groq API key must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ModelError::ConfigError("model must not be empty".to_string()));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ModelError::ConfigError(format!(
                    "temperature must be between 0 and 2, got {t}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hosted_setup() {
        let config = GroqConfig::llama3("gsk_test");
        assert_eq!(config.model, "llama3-8b-8192");
        assert_eq!(config.base_url, GROQ_API_BASE);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(GroqConfig::llama3("  ").validate().is_err());
        assert!(GroqConfig::new("key", "").validate().is_err());
        assert!(GroqConfig::llama3("key").with_temperature(3.5).validate().is_err());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let rendered = format!("{:?}", GroqConfig::llama3("gsk_secret"));
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("llama3-8b-8192"));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let config = GroqConfig::llama3("key").with_base_url("http://127.0.0.1:9000/v1/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000/v1");
    }
}
