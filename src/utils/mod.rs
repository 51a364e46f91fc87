//! Shared utility functions.
//!
//! - `filename`: mapping classification strings to safe path components
//! - `shutdown`: waiting on the Ctrl-C shutdown flag

mod filename;
mod shutdown;

pub use filename::{has_pdf_extension, sanitize_title, FALLBACK_TITLE, MAX_TITLE_BYTES};
pub use shutdown::shutdown_requested;
