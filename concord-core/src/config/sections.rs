//! Domain configuration sections.
//!
//! Every field has a serde default, so an empty document deserializes to
//! [`Default`]. Sections validate into a shared [`ValidationContext`] and
//! read `{prefix}_{FIELD}` environment overrides.
//!
//! # Example YAML
//!
//! ```yaml
//! portfolio:
//!   correlation_ceiling: 0.4
//!   shock_concentration: 0.8
//! authority:
//!   pairing_window: 15m
//! ledger:
//!   page_size: 1000
//!   fetch_timeout: 30s
//!   learn_mode: live_practice
//! ```

use super::traits::ConfigSection;
use super::validation::{EnvOverride, ValidationContext, Validator};
use crate::types::LearnMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Paired trades below which a relationship is never classified.
pub const MIN_PAIR_TRADES_FLOOR: u64 = 40;

/// Lowest veto precision a predictive veto may be configured to accept.
pub const MIN_VETO_PRECISION_FLOOR: f64 = 0.60;

/// Highest false-veto rate a predictive veto may be configured to accept.
pub const MAX_FALSE_VETO_RATE_CEILING: f64 = 0.40;

/// Shadow trades required before any unlock.
pub const UNLOCK_MIN_TRADES_FLOOR: u64 = 150;

/// Reduced-live trades required before promotion to live.
pub const LIVE_MIN_TRADES_FLOOR: u64 = 100;

/// Portfolio construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Maximum |correlation| between any two accepted strategies.
    #[serde(default = "default_correlation_ceiling")]
    pub correlation_ceiling: f64,

    /// Fewer paired observations than this yields a correlation of 0.
    #[serde(default = "default_min_correlation_observations")]
    pub min_correlation_observations: usize,

    /// Lower bound applied to annualized volatility before inversion.
    #[serde(default = "default_volatility_floor")]
    pub volatility_floor: f64,

    /// Return periods per year used for annualization.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    /// Weight given to regime affinity in trend and range regimes.
    #[serde(default = "default_concentration")]
    pub concentration: f64,

    /// Weight given to regime affinity in shock regimes.
    #[serde(default = "default_shock_concentration")]
    pub shock_concentration: f64,

    /// Starting value of the synthesized curve.
    #[serde(default = "default_nominal_base")]
    pub nominal_base: f64,
}

fn default_correlation_ceiling() -> f64 {
    0.4
}

fn default_min_correlation_observations() -> usize {
    10
}

fn default_volatility_floor() -> f64 {
    0.001
}

fn default_periods_per_year() -> f64 {
    252.0
}

fn default_concentration() -> f64 {
    0.60
}

fn default_shock_concentration() -> f64 {
    0.80
}

fn default_nominal_base() -> f64 {
    10_000.0
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            correlation_ceiling: default_correlation_ceiling(),
            min_correlation_observations: default_min_correlation_observations(),
            volatility_floor: default_volatility_floor(),
            periods_per_year: default_periods_per_year(),
            concentration: default_concentration(),
            shock_concentration: default_shock_concentration(),
            nominal_base: default_nominal_base(),
        }
    }
}

impl ConfigSection for PortfolioConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .unit_fraction("correlation_ceiling", self.correlation_ceiling)
            .in_range(
                "min_correlation_observations",
                &self.min_correlation_observations,
                &2,
                &usize::MAX,
            )
            .positive("volatility_floor", &self.volatility_floor)
            .positive("periods_per_year", &self.periods_per_year)
            .in_range("concentration", &self.concentration, &0.0, &1.0)
            .in_range("shock_concentration", &self.shock_concentration, &0.0, &1.0)
            .positive("nominal_base", &self.nominal_base);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(
            &format!("{prefix}_CORRELATION_CEILING"),
            &mut self.correlation_ceiling,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_CORRELATION_OBSERVATIONS"),
            &mut self.min_correlation_observations,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_VOLATILITY_FLOOR"),
            &mut self.volatility_floor,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_PERIODS_PER_YEAR"),
            &mut self.periods_per_year,
        );
        EnvOverride::apply_number(&format!("{prefix}_CONCENTRATION"), &mut self.concentration);
        EnvOverride::apply_number(
            &format!("{prefix}_SHOCK_CONCENTRATION"),
            &mut self.shock_concentration,
        );
        EnvOverride::apply_number(&format!("{prefix}_NOMINAL_BASE"), &mut self.nominal_base);
    }
}

/// Authority adjustment thresholds and relationship effects.
///
/// The authority clamp range itself is not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Paired trades required before a pair can be classified at all.
    #[serde(default = "default_min_pair_trades")]
    pub min_pair_trades: u64,

    /// Minimum veto precision for a predictive veto.
    #[serde(default = "default_min_veto_precision")]
    pub min_veto_precision: f64,

    /// Maximum false-veto rate for a predictive veto.
    #[serde(default = "default_max_false_veto_rate")]
    pub max_false_veto_rate: f64,

    /// Two trades on the same instrument within this window form a pair.
    #[serde(default = "default_pairing_window", with = "humantime_serde")]
    pub pairing_window: Duration,

    /// Solo trades required before the base multiplier departs from 1.0.
    #[serde(default = "default_min_solo_trades")]
    pub min_solo_trades: u64,

    /// Authority added per predictive-veto relationship.
    #[serde(default = "default_veto_bonus")]
    pub veto_bonus: f64,

    /// Authority added per synergy relationship.
    #[serde(default = "default_synergy_bonus")]
    pub synergy_bonus: f64,

    /// Authority removed per conflict relationship.
    #[serde(default = "default_conflict_penalty")]
    pub conflict_penalty: f64,
}

fn default_min_pair_trades() -> u64 {
    MIN_PAIR_TRADES_FLOOR
}

fn default_min_veto_precision() -> f64 {
    MIN_VETO_PRECISION_FLOOR
}

fn default_max_false_veto_rate() -> f64 {
    MAX_FALSE_VETO_RATE_CEILING
}

fn default_pairing_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_min_solo_trades() -> u64 {
    20
}

fn default_veto_bonus() -> f64 {
    0.10
}

fn default_synergy_bonus() -> f64 {
    0.05
}

fn default_conflict_penalty() -> f64 {
    0.10
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            min_pair_trades: default_min_pair_trades(),
            min_veto_precision: default_min_veto_precision(),
            max_false_veto_rate: default_max_false_veto_rate(),
            pairing_window: default_pairing_window(),
            min_solo_trades: default_min_solo_trades(),
            veto_bonus: default_veto_bonus(),
            synergy_bonus: default_synergy_bonus(),
            conflict_penalty: default_conflict_penalty(),
        }
    }
}

impl ConfigSection for AuthorityConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .at_least("min_pair_trades", &self.min_pair_trades, &MIN_PAIR_TRADES_FLOOR)
            .in_range(
                "min_veto_precision",
                &self.min_veto_precision,
                &MIN_VETO_PRECISION_FLOOR,
                &1.0,
            )
            .in_range(
                "max_false_veto_rate",
                &self.max_false_veto_rate,
                &0.0,
                &MAX_FALSE_VETO_RATE_CEILING,
            )
            .non_zero_duration("pairing_window", self.pairing_window)
            .in_range("veto_bonus", &self.veto_bonus, &0.0, &1.0)
            .in_range("synergy_bonus", &self.synergy_bonus, &0.0, &1.0)
            .in_range("conflict_penalty", &self.conflict_penalty, &0.0, &1.0);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_PAIR_TRADES"),
            &mut self.min_pair_trades,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_VETO_PRECISION"),
            &mut self.min_veto_precision,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MAX_FALSE_VETO_RATE"),
            &mut self.max_false_veto_rate,
        );
        EnvOverride::apply_duration(
            &format!("{prefix}_PAIRING_WINDOW"),
            &mut self.pairing_window,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_SOLO_TRADES"),
            &mut self.min_solo_trades,
        );
        EnvOverride::apply_number(&format!("{prefix}_VETO_BONUS"), &mut self.veto_bonus);
        EnvOverride::apply_number(&format!("{prefix}_SYNERGY_BONUS"), &mut self.synergy_bonus);
        EnvOverride::apply_number(
            &format!("{prefix}_CONFLICT_PENALTY"),
            &mut self.conflict_penalty,
        );
    }
}

/// Collaboration voter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterConfig {
    /// Number of contributing agents listed in a decision log.
    #[serde(default = "default_top_factors")]
    pub top_factors: usize,
}

fn default_top_factors() -> usize {
    3
}

impl Default for VoterConfig {
    fn default() -> Self {
        Self {
            top_factors: default_top_factors(),
        }
    }
}

impl ConfigSection for VoterConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx).in_range("top_factors", &self.top_factors, &1, &64);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(&format!("{prefix}_TOP_FACTORS"), &mut self.top_factors);
    }
}

/// Fallback guardian settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Relative degradation of weighted vs. baseline expectancy that
    /// activates fallback.
    #[serde(default = "default_degradation_threshold")]
    pub degradation_threshold: f64,

    /// Outcomes required before automatic evaluation runs.
    #[serde(default = "default_min_outcomes")]
    pub min_outcomes: usize,

    /// Most recent outcomes kept for evaluation; older ones roll off.
    #[serde(default = "default_outcome_window")]
    pub outcome_window: usize,
}

fn default_degradation_threshold() -> f64 {
    0.20
}

fn default_min_outcomes() -> usize {
    20
}

fn default_outcome_window() -> usize {
    100
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            degradation_threshold: default_degradation_threshold(),
            min_outcomes: default_min_outcomes(),
            outcome_window: default_outcome_window(),
        }
    }
}

impl ConfigSection for FallbackConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .unit_fraction("degradation_threshold", self.degradation_threshold)
            .positive("min_outcomes", &self.min_outcomes)
            .at_least("outcome_window", &self.outcome_window, &self.min_outcomes);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(
            &format!("{prefix}_DEGRADATION_THRESHOLD"),
            &mut self.degradation_threshold,
        );
        EnvOverride::apply_number(&format!("{prefix}_MIN_OUTCOMES"), &mut self.min_outcomes);
        EnvOverride::apply_number(
            &format!("{prefix}_OUTCOME_WINDOW"),
            &mut self.outcome_window,
        );
    }
}

/// Requirements for one promotion step on the deployment ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCriteria {
    /// Trades required in the current state.
    pub min_trades: u64,
    /// Required expectancy as a multiple of baseline expectancy.
    pub expectancy_multiple: f64,
    /// Drawdown ratio must be strictly below this.
    pub max_drawdown_ratio: f64,
    /// Distinct sessions with positive total return.
    pub min_profitable_sessions: usize,
    /// Consecutive days without detected drift.
    pub min_drift_free_days: u32,
}

impl PromotionCriteria {
    fn validate_with_context(&self, ctx: &mut ValidationContext, min_trades_floor: u64) {
        Validator::new(ctx)
            .at_least("min_trades", &self.min_trades, &min_trades_floor)
            .positive("expectancy_multiple", &self.expectancy_multiple)
            .positive("max_drawdown_ratio", &self.max_drawdown_ratio);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(&format!("{prefix}_MIN_TRADES"), &mut self.min_trades);
        EnvOverride::apply_number(
            &format!("{prefix}_EXPECTANCY_MULTIPLE"),
            &mut self.expectancy_multiple,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MAX_DRAWDOWN_RATIO"),
            &mut self.max_drawdown_ratio,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_PROFITABLE_SESSIONS"),
            &mut self.min_profitable_sessions,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_MIN_DRIFT_FREE_DAYS"),
            &mut self.min_drift_free_days,
        );
    }
}

/// Deployment ladder thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Shadow to reduced-live.
    #[serde(default = "default_unlock")]
    pub unlock: PromotionCriteria,

    /// Reduced-live to live.
    #[serde(default = "default_promote_live")]
    pub promote_live: PromotionCriteria,

    /// Drawdown ratio at or above which an executing agent is demoted.
    #[serde(default = "default_demote_drawdown_ratio")]
    pub demote_drawdown_ratio: f64,

    /// Drawdown ratio at or above which an agent is disabled outright.
    #[serde(default = "default_disable_drawdown_ratio")]
    pub disable_drawdown_ratio: f64,
}

fn default_unlock() -> PromotionCriteria {
    PromotionCriteria {
        min_trades: UNLOCK_MIN_TRADES_FLOOR,
        expectancy_multiple: 1.2,
        max_drawdown_ratio: 0.8,
        min_profitable_sessions: 3,
        min_drift_free_days: 7,
    }
}

fn default_promote_live() -> PromotionCriteria {
    PromotionCriteria {
        min_trades: LIVE_MIN_TRADES_FLOOR,
        expectancy_multiple: 1.0,
        max_drawdown_ratio: 0.8,
        min_profitable_sessions: 0,
        min_drift_free_days: 14,
    }
}

fn default_demote_drawdown_ratio() -> f64 {
    1.5
}

fn default_disable_drawdown_ratio() -> f64 {
    3.0
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            unlock: default_unlock(),
            promote_live: default_promote_live(),
            demote_drawdown_ratio: default_demote_drawdown_ratio(),
            disable_drawdown_ratio: default_disable_drawdown_ratio(),
        }
    }
}

impl ConfigSection for DeploymentConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        ctx.enter("unlock");
        self.unlock.validate_with_context(ctx, UNLOCK_MIN_TRADES_FLOOR);
        ctx.exit();

        ctx.enter("promote_live");
        self.promote_live.validate_with_context(ctx, LIVE_MIN_TRADES_FLOOR);
        ctx.exit();

        let (demote, disable) = (self.demote_drawdown_ratio, self.disable_drawdown_ratio);
        Validator::new(ctx)
            .positive("demote_drawdown_ratio", &demote)
            .custom(
                "disable_drawdown_ratio",
                || disable >= demote,
                "must be at least demote_drawdown_ratio",
            );
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        self.unlock.apply_env_overrides(&format!("{prefix}_UNLOCK"));
        self.promote_live
            .apply_env_overrides(&format!("{prefix}_PROMOTE_LIVE"));
        EnvOverride::apply_number(
            &format!("{prefix}_DEMOTE_DRAWDOWN_RATIO"),
            &mut self.demote_drawdown_ratio,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_DISABLE_DRAWDOWN_RATIO"),
            &mut self.disable_drawdown_ratio,
        );
    }
}

/// Trade ledger access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Rows requested per page; a shorter page ends the fetch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on the whole paginated fetch.
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,

    /// Which trade environments count toward statistics.
    #[serde(default)]
    pub learn_mode: LearnMode,
}

fn default_page_size() -> usize {
    1000
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            fetch_timeout: default_fetch_timeout(),
            learn_mode: LearnMode::default(),
        }
    }
}

impl ConfigSection for LedgerConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .in_range("page_size", &self.page_size, &1, &100_000)
            .non_zero_duration("fetch_timeout", self.fetch_timeout);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(&format!("{prefix}_PAGE_SIZE"), &mut self.page_size);
        EnvOverride::apply_duration(&format!("{prefix}_FETCH_TIMEOUT"), &mut self.fetch_timeout);
        EnvOverride::apply_number(&format!("{prefix}_LEARN_MODE"), &mut self.learn_mode);
    }
}

/// Logging settings consumed by the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; no file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Whether to also log to stdout.
    #[serde(default = "default_stdout_enabled")]
    pub stdout_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_stdout_enabled() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
            stdout_enabled: default_stdout_enabled(),
        }
    }
}

impl ConfigSection for LoggingConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let format = self.format.clone();
        Validator::new(ctx).custom(
            "format",
            || matches!(format.as_str(), "json" | "pretty"),
            "must be 'json' or 'pretty'",
        );
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_LEVEL"), &mut self.level);
        EnvOverride::apply_string(&format!("{prefix}_FORMAT"), &mut self.format);
        if let Ok(dir) = std::env::var(format!("{prefix}_DIRECTORY")) {
            self.directory = Some(dir);
        }
        EnvOverride::apply_bool(
            &format!("{prefix}_STDOUT_ENABLED"),
            &mut self.stdout_enabled,
        );
    }
}
