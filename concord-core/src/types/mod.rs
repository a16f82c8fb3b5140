//! NewType wrappers and context enums.
//!
//! # Types
//!
//! - [`AgentId`] / [`StrategyId`] - Agent and strategy identifiers
//! - [`Instrument`] - Traded instrument
//! - [`Timestamp`] - Unix millisecond timestamps
//! - [`Direction`], [`TradeEnvironment`], [`LearnMode`] - Trade context
//! - [`Regime`], [`RegimeAffinity`] - Regime labels and per-strategy fitness
//! - [`EnvironmentSignature`], [`SignatureQuery`] - Statistics keys

mod ids;
mod market;
mod signature;
mod timestamp;

pub use ids::{AgentId, Instrument, StrategyId};
pub use market::{Direction, LearnMode, Regime, RegimeAffinity, TradeEnvironment};
pub use signature::{EnvironmentSignature, SignatureQuery};
pub use timestamp::Timestamp;

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Agent ID is empty
    #[error("agent ID cannot be empty")]
    EmptyAgentId,

    /// Instrument is empty
    #[error("instrument cannot be empty")]
    EmptyInstrument,

    /// Timestamp is invalid (negative)
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Price is zero or negative
    #[error("price must be positive: {0}")]
    NonPositivePrice(rust_decimal::Decimal),

    /// Return does not fit the decimal range
    #[error("return overflows for entry {entry} and exit {exit}")]
    ReturnOverflow {
        /// Entry price.
        entry: rust_decimal::Decimal,
        /// Exit price.
        exit: rust_decimal::Decimal,
    },

    /// Label does not name a known variant
    #[error("unknown {kind}: {value}")]
    UnknownLabel {
        /// What kind of label was parsed.
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}
