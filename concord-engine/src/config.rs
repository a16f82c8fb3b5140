//! Top-level Concord configuration.
//!
//! Aggregates every domain section from `concord_core::config` under one
//! document. Each section defaults independently, so a file only needs the
//! keys it changes.

use std::path::Path;

use concord_core::config::{
    AuthorityConfig, ConfigLoader, ConfigSection, DeploymentConfig, FallbackConfig, LedgerConfig,
    LoggingConfig, PortfolioConfig, Validatable, ValidationContext, VoterConfig,
};
use concord_core::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for every override.
pub const ENV_PREFIX: &str = "CONCORD";

/// Main Concord configuration.
///
/// # Example YAML
///
/// ```yaml
/// portfolio:
///   correlation_ceiling: 0.4
///   shock_concentration: 0.8
///
/// authority:
///   min_pair_trades: 40
///   pairing_window: 15m
///
/// ledger:
///   page_size: 1000
///   fetch_timeout: 30s
///   learn_mode: live_practice
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcordConfig {
    /// Portfolio construction.
    #[serde(default)]
    pub portfolio: PortfolioConfig,

    /// Authority classification and multipliers.
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Collaboration voting.
    #[serde(default)]
    pub voter: VoterConfig,

    /// Fallback guardian.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Deployment ladder.
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Trade ledger access.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigSection for ConcordConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        ctx.enter("portfolio");
        self.portfolio.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("authority");
        self.authority.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("voter");
        self.voter.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("fallback");
        self.fallback.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("deployment");
        self.deployment.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("ledger");
        self.ledger.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("logging");
        self.logging.validate_with_context(ctx);
        ctx.exit();
    }

    /// Applies `{prefix}_<SECTION>_<FIELD>` overrides.
    ///
    /// # Examples
    ///
    /// - `CONCORD_PORTFOLIO_CORRELATION_CEILING=0.3` overrides `portfolio.correlation_ceiling`
    /// - `CONCORD_LEDGER_FETCH_TIMEOUT=10s` overrides `ledger.fetch_timeout`
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.portfolio
            .apply_env_overrides(&format!("{prefix}_PORTFOLIO"));
        self.authority
            .apply_env_overrides(&format!("{prefix}_AUTHORITY"));
        self.voter.apply_env_overrides(&format!("{prefix}_VOTER"));
        self.fallback
            .apply_env_overrides(&format!("{prefix}_FALLBACK"));
        self.deployment
            .apply_env_overrides(&format!("{prefix}_DEPLOYMENT"));
        self.ledger.apply_env_overrides(&format!("{prefix}_LEDGER"));
        self.logging
            .apply_env_overrides(&format!("{prefix}_LOGGING"));
    }
}

impl ConcordConfig {
    /// Loads the configuration from `path` (or defaults when `None`),
    /// applies `CONCORD_*` overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed, or if
    /// any field is out of range after overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = match path {
            Some(path) => ConfigLoader::new().load_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(ENV_PREFIX);
        config.validate()?;
        Ok(config)
    }
}
