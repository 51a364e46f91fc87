//! paperintake - watch-folder document intake.
//!
//! Picks up PDFs dropped into an intake directory, normalizes and OCRs them
//! with external tools, asks a chat-completion API for a canonical
//! `YYYY-MM-DD - Sender - Title` name and files the result into `out/`.

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod rate_limit;
pub mod repository;
pub mod services;
pub mod utils;
