//! Chat-completion client for document classification.
//!
//! Works with any OpenAI-compatible `/chat/completions` endpoint (OpenAI,
//! Groq, Together.ai, a local gateway). Requests are retried with
//! exponential backoff until they succeed, unless an attempt limit is set or
//! shutdown is signalled.

mod config;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::rate_limit::BackoffPolicy;
use crate::utils::{shutdown_requested, FALLBACK_TITLE};

pub use config::{LlmConfig, DEFAULT_MAX_CONTENT_CHARS};
pub use prompts::CLASSIFY_INSTRUCTION;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Classification cancelled by shutdown")]
    Cancelled,

    #[error("Classification gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl ClassificationError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Api { .. } | Self::Parse(_)
        )
    }
}

/// Result of a successful classification.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Trimmed model answer, or `Untitled` for an empty answer.
    pub title: String,
    /// Requests sent, including the successful one.
    pub attempts: u32,
    /// Delays waited before attempts, in order.
    pub waits: Vec<Duration>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}

/// Anything that can turn document text into a canonical title.
#[async_trait]
pub trait TitleClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError>;
}

/// Truncate to at most `max` characters (UTF-8 safe).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Classification client with built-in backoff.
pub struct ClassificationClient {
    config: LlmConfig,
    retry: BackoffPolicy,
    client: Client,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ClassificationClient {
    /// Create a new client.
    pub fn new(config: LlmConfig, retry: BackoffPolicy) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClassificationError::Connection(e.to_string()))?;

        Ok(Self {
            config,
            retry,
            client,
            shutdown: None,
        })
    }

    /// Abort backoff waits once `shutdown` flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Derive a canonical title for a document's text.
    ///
    /// Retries every retryable failure according to the backoff policy.
    pub async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let content = truncate_chars(text, self.config.max_content_chars);
        let mut backoff = self.retry.start();
        let mut waits = Vec::new();

        loop {
            let Some(wait) = backoff.next_attempt() else {
                return Err(ClassificationError::Exhausted {
                    attempts: backoff.attempts(),
                });
            };
            let attempt = backoff.attempts();

            if !wait.is_zero() {
                if attempt == 1 {
                    info!("Waiting {:?} before classification request", wait);
                } else {
                    warn!(
                        "Waiting {:?} before classification attempt {}",
                        wait, attempt
                    );
                }
                self.pause(wait).await?;
                waits.push(wait);
            }

            match self.request(content).await {
                Ok(title) => {
                    debug!("Classified after {} attempt(s): {}", attempt, title);
                    return Ok(Classification {
                        title,
                        attempts: attempt,
                        waits,
                    });
                }
                Err(e) if e.is_retryable() => {
                    warn!("Classification attempt {} failed: {}", attempt, e);
                    backoff.record_failure();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep for `wait`, returning early with `Cancelled` on shutdown.
    async fn pause(&self, wait: Duration) -> Result<(), ClassificationError> {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(wait).await;
            return Ok(());
        };

        let mut shutdown = shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = shutdown_requested(&mut shutdown) => Err(ClassificationError::Cancelled),
        }
    }

    /// Send one classification request.
    async fn request(&self, content: &str) -> Result<String, ClassificationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CLASSIFY_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassificationError::Connection(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ClassificationError::Connection(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassificationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

#[async_trait]
impl TitleClassifier for ClassificationClient {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        ClassificationClient::classify(self, text).await
    }
}

/// Extract the title from a chat-completion response body.
fn parse_response(body: &str) -> Result<String, ClassificationError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ClassificationError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(ClassificationError::Api {
            status: 200,
            body: error.message,
        });
    }

    let title = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if title.is_empty() {
        Ok(FALLBACK_TITLE.to_string())
    } else {
        Ok(title)
    }
}
