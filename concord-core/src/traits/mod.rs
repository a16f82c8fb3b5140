//! Core trait definitions.
//!
//! - ledger - Paginated access to the external trade ledger

mod ledger;

pub use ledger::{InMemoryLedger, TradeLedger, fetch_all};
