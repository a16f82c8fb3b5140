//! # Concord Core
//!
//! Core types, traits, and interfaces for the Concord allocation and
//! agent-governance engine.
//!
//! This crate provides:
//! - `NewType` identifiers for agents and strategies
//! - Market-context enums (`Regime`, `Direction`, `TradeEnvironment`, `LearnMode`)
//! - The canonical [`types::EnvironmentSignature`] used to key durable statistics
//! - The [`data::TradeRecord`] ledger row
//! - Error types and handling framework
//! - The paginated [`traits::TradeLedger`] interface
//! - Configuration management with YAML/TOML/JSON support and environment variable overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![cfg_attr(test, allow(clippy::float_cmp))]

/// Core type definitions and `NewType` wrappers
pub mod types;

/// Trade ledger records
pub mod data;

/// Error types and handling
pub mod error;

/// Core trait definitions
pub mod traits;

/// Configuration management
pub mod config;

/// Numeric helpers shared by the statistics code
pub mod stats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::traits::*;
    pub use crate::types::*;
}
