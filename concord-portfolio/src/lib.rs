//! # Concord Portfolio
//!
//! Multi-strategy portfolio construction for Concord.
//!
//! This crate provides:
//! - Equity streams per agent built from the trade ledger
//! - Pairwise Pearson correlation with a minimum-observation floor
//! - Greedy Sharpe-ranked decorrelation under a correlation ceiling
//! - Inverse-volatility (risk-parity) weighting
//! - Regime routing that blends risk parity with regime affinity
//! - A synthesized portfolio curve with return, drawdown, Sharpe and volatility
//! - Atomic snapshot publication
//!
//! Degenerate input never produces NaN or ∞: short series correlate at 0,
//! thin streams use a fallback volatility, and an empty strategy set
//! yields an empty portfolio.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod builder;
pub mod correlation;
pub mod decorrelation;
pub mod error;
pub mod publisher;
pub mod regime_router;
pub mod risk_parity;
pub mod stream;
pub mod synthesizer;

pub use builder::{Diagnostic, PortfolioBuilder, PortfolioMember, PortfolioResult};
pub use correlation::{CorrelationEntry, CorrelationMatrix, pearson};
pub use decorrelation::{Rejection, Selection, select};
pub use error::PortfolioError;
pub use publisher::{PublishedPortfolio, SnapshotPublisher};
pub use regime_router::{RoutedWeights, concentration_for, route};
pub use risk_parity::{VolatilityEstimate, estimate_volatility, inverse_volatility_weights};
pub use stream::{StrategyStream, StreamStats, build_streams};
pub use synthesizer::{PortfolioMetrics, Synthesis, synthesize};
