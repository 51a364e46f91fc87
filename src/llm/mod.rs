//! Document classification through a chat-completion API.
//!
//! Sends the first part of a document's text to an OpenAI-compatible
//! endpoint and gets back a canonical `YYYY-MM-DD - Sender - Title` string.

mod client;

pub use client::{
    truncate_chars, Classification, ClassificationClient, ClassificationError, LlmConfig,
    TitleClassifier, CLASSIFY_INSTRUCTION, DEFAULT_MAX_CONTENT_CHARS,
};
