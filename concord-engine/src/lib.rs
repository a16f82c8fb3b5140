//! # Concord Engine
//!
//! Construction cycle runner for Concord.
//!
//! This crate provides:
//! - [`ConcordConfig`], the top-level configuration with `CONCORD_*`
//!   environment overrides
//! - [`CycleRunner`], which fetches the ledger under a timeout, builds the
//!   portfolio, refreshes agent statistics and authority, walks the
//!   deployment ladder and publishes the result atomically
//! - Collaboration decisions and outcome tracking against the runner's
//!   current governance state

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod config;
pub mod cycle;
pub mod error;

pub use config::{ConcordConfig, ENV_PREFIX};
pub use cycle::{CycleInput, CycleReport, CycleRunner};
pub use error::CycleError;
