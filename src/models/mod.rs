//! Data models for paperintake.

mod document;
mod title;

pub use document::{Document, DocumentState, ProcessingMode, QueueItem, Stage};
pub use title::CanonicalTitle;
