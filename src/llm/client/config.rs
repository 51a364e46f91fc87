//! Classification client configuration.

use std::fmt;
use std::time::Duration;

use crate::config::{require, ConfigError};

/// Characters of document text sent per request.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 2000;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the chat-completion endpoint.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// Full chat-completions URL, e.g. `https://api.openai.com/v1/chat/completions`.
    pub endpoint: String,
    /// Bearer credential.
    pub api_key: String,
    pub model: String,
    /// Maximum characters of document text sent to the model.
    pub max_content_chars: usize,
    pub request_timeout: Duration,
}

impl LlmConfig {
    /// Build a config from the three required settings.
    ///
    /// Endpoint, key and model have no defaults; a missing or blank one is an
    /// error.
    pub fn from_parts(
        endpoint: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ConfigError> {
        let endpoint = require(endpoint, "LLM_ENDPOINT")?;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "LLM_ENDPOINT",
                reason: format!("expected an http(s) URL, got '{}'", endpoint),
            });
        }

        Ok(Self {
            endpoint,
            api_key: require(api_key, "LLM_API_KEY")?,
            model: require(model, "LLM_MODEL")?,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

// Keep the credential out of logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_content_chars", &self.max_content_chars)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
