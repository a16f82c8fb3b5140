//! Market-context enums: trade direction, environment, learn mode and regime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Side of a trade or vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Long / buy.
    Long,
    /// Short / sell.
    Short,
}

impl Direction {
    /// Returns `1.0` for long and `-1.0` for short.
    #[must_use]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Returns the direction as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment a trade was executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeEnvironment {
    /// Real capital.
    Live,
    /// Paper trading against live prices (shadow mode).
    Practice,
    /// Historical simulation.
    Backtest,
}

impl TradeEnvironment {
    /// Returns the environment as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Practice => "practice",
            Self::Backtest => "backtest",
        }
    }
}

impl fmt::Display for TradeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects which trade environments count toward learned statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnMode {
    /// Live and practice trades.
    #[default]
    LivePractice,
    /// Backtest trades only.
    Backtest,
    /// Every environment.
    All,
}

impl LearnMode {
    /// Returns true if trades from `env` count under this mode.
    #[must_use]
    pub const fn includes(&self, env: TradeEnvironment) -> bool {
        match self {
            Self::LivePractice => {
                matches!(env, TradeEnvironment::Live | TradeEnvironment::Practice)
            }
            Self::Backtest => matches!(env, TradeEnvironment::Backtest),
            Self::All => true,
        }
    }

    /// Returns the mode as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LivePractice => "live_practice",
            Self::Backtest => "backtest",
            Self::All => "all",
        }
    }
}

impl fmt::Display for LearnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearnMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live_practice" | "live+practice" | "live" => Ok(Self::LivePractice),
            "backtest" => Ok(Self::Backtest),
            "all" => Ok(Self::All),
            other => Err(ValidationError::UnknownLabel {
                kind: "learn mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Coarse market-condition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Directional market.
    Trend,
    /// Mean-reverting, range-bound market.
    Range,
    /// Stress event; cross-asset correlation spikes.
    Shock,
}

impl Regime {
    /// All regimes in canonical order.
    pub const ALL: [Self; 3] = [Self::Trend, Self::Range, Self::Shock];

    /// Returns the regime as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Range => "range",
            Self::Shock => "shock",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trend" | "trending" => Ok(Self::Trend),
            "range" | "ranging" => Ok(Self::Range),
            "shock" => Ok(Self::Shock),
            other => Err(ValidationError::UnknownLabel {
                kind: "regime",
                value: other.to_string(),
            }),
        }
    }
}

/// Unnormalized per-regime fitness scores for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeAffinity {
    /// Score in trending markets.
    pub trend: f64,
    /// Score in ranging markets.
    pub range: f64,
    /// Score in shock regimes.
    pub shock: f64,
}

impl Default for RegimeAffinity {
    fn default() -> Self {
        Self {
            trend: 1.0,
            range: 1.0,
            shock: 1.0,
        }
    }
}

impl RegimeAffinity {
    /// Creates a new affinity triple.
    #[must_use]
    pub const fn new(trend: f64, range: f64, shock: f64) -> Self {
        Self {
            trend,
            range,
            shock,
        }
    }

    /// Returns the score for `regime`, with negative or non-finite scores read as 0.
    #[must_use]
    pub fn score(&self, regime: Regime) -> f64 {
        let raw = match regime {
            Regime::Trend => self.trend,
            Regime::Range => self.range,
            Regime::Shock => self.shock,
        };
        sanitize(raw)
    }

    /// Sum of all sanitized scores.
    #[must_use]
    pub fn total(&self) -> f64 {
        Regime::ALL.iter().map(|r| self.score(*r)).sum()
    }

    /// Share of the total attributable to `regime`, or 0 when the total is 0.
    #[must_use]
    pub fn share(&self, regime: Regime) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.score(regime) / total
        } else {
            0.0
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
