//! Configuration management module.
//!
//! This module provides:
//! - YAML, TOML and JSON configuration files, detected by extension
//! - Validation that reports every invalid field with its dotted path
//! - Environment variable overrides (`CONCORD_<SECTION>_<FIELD>`)
//! - The domain sections consumed by the portfolio and governance crates
//!
//! # Example
//!
//! ```rust,ignore
//! use concord_core::config::{ConfigLoader, ConfigFormat};
//!
//! let config: ConcordConfig = ConfigLoader::new().load_file("concord.yaml")?;
//! let ledger: LedgerConfig = ConfigLoader::new().load_str(toml_content, ConfigFormat::Toml)?;
//! ```

mod loader;
mod sections;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use sections::{
    AuthorityConfig, DeploymentConfig, FallbackConfig, LIVE_MIN_TRADES_FLOOR, LedgerConfig,
    LoggingConfig, MAX_FALSE_VETO_RATE_CEILING, MIN_PAIR_TRADES_FLOOR, MIN_VETO_PRECISION_FLOOR,
    PortfolioConfig, PromotionCriteria, UNLOCK_MIN_TRADES_FLOOR, VoterConfig,
};
pub use traits::{ConfigSection, Validatable};
pub use validation::{EnvOverride, ValidationContext, ValidationResult, Validator};
