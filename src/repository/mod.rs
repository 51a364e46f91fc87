//! Persistence layer.
//!
//! The only durable state besides the stage directories is the title ledger.

mod titles;

pub use titles::{LedgerError, TitleLedger};
