//! Ledger data structures.

mod file;
mod trade;

pub use file::{parse_ledger, read_ledger_file};
pub use trade::{TradeRecord, filter_learn_mode, sort_canonical};
