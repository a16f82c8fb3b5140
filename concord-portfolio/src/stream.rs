//! Per-strategy equity streams derived from the trade ledger.

use std::collections::BTreeMap;

use concord_core::data::{TradeRecord, filter_learn_mode};
use concord_core::stats;
use concord_core::types::{Instrument, LearnMode, StrategyId};
use serde::{Deserialize, Serialize};

/// Summary statistics of one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    /// Total return of the normalized curve, in percent.
    pub total_return: f64,
    /// Peak-to-trough decline, in percent.
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio of per-period returns.
    pub sharpe: f64,
    /// Fraction of winning periods.
    pub win_rate: f64,
    /// Gross gains over gross losses; `None` without any loss.
    pub profit_factor: Option<f64>,
    /// Number of trades (or periods) behind the curve.
    pub trade_count: usize,
}

/// An ordered equity curve for one strategy or agent, with derived returns.
///
/// Streams are rebuilt from the ledger every cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStream {
    id: StrategyId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instrument: Option<Instrument>,
    curve: Vec<f64>,
    returns: Vec<f64>,
    stats: StreamStats,
}

impl StrategyStream {
    /// Builds a stream from raw curve samples.
    ///
    /// Returns are the first differences of the curve normalized to start
    /// at 1.0. Win rate and profit factor are taken over those returns.
    #[must_use]
    pub fn from_curve(
        id: StrategyId,
        name: impl Into<String>,
        instrument: Option<Instrument>,
        curve: Vec<f64>,
        periods_per_year: f64,
    ) -> Self {
        let returns = stats::first_differences(&stats::normalize_to_unit(&curve));
        let outcomes = returns.clone();
        Self::assemble(id, name.into(), instrument, curve, returns, &outcomes, periods_per_year)
    }

    /// Builds a stream by compounding each trade's fractional return onto a
    /// curve that starts at 1.0.
    ///
    /// `trades` must already be in canonical order.
    #[must_use]
    pub fn from_trades(id: StrategyId, trades: &[&TradeRecord], periods_per_year: f64) -> Self {
        let mut curve = Vec::with_capacity(trades.len() + 1);
        let mut equity = 1.0_f64;
        curve.push(equity);
        let mut outcomes = Vec::with_capacity(trades.len());
        for trade in trades {
            let r = trade.return_fraction();
            outcomes.push(r);
            equity = stats::finite_or_zero(equity * (1.0 + r));
            curve.push(equity);
        }

        let instrument = match trades.first() {
            Some(first) if trades.iter().all(|t| t.instrument == first.instrument) => {
                Some(first.instrument.clone())
            }
            _ => None,
        };

        let returns = stats::first_differences(&curve);
        let name = id.to_string();
        Self::assemble(id, name, instrument, curve, returns, &outcomes, periods_per_year)
    }

    fn assemble(
        id: StrategyId,
        name: String,
        instrument: Option<Instrument>,
        curve: Vec<f64>,
        returns: Vec<f64>,
        outcomes: &[f64],
        periods_per_year: f64,
    ) -> Self {
        let normalized = stats::normalize_to_unit(&curve);
        let total_return = normalized
            .last()
            .map_or(0.0, |last| stats::finite_or_zero((last - 1.0) * 100.0));

        let wins = outcomes.iter().filter(|r| **r > 0.0).count();
        let win_rate = if outcomes.is_empty() {
            0.0
        } else {
            wins as f64 / outcomes.len() as f64
        };
        let gains: f64 = outcomes.iter().filter(|r| **r > 0.0).sum();
        let losses: f64 = outcomes.iter().filter(|r| **r < 0.0).map(|r| -r).sum();
        let profit_factor = (losses > 0.0).then(|| stats::finite_or_zero(gains / losses));

        let stats = StreamStats {
            total_return,
            max_drawdown: stats::max_drawdown(&normalized) * 100.0,
            sharpe: stats::annualized_sharpe(&returns, periods_per_year),
            win_rate,
            profit_factor,
            trade_count: outcomes.len(),
        };

        Self {
            id,
            name,
            instrument,
            curve,
            returns,
            stats,
        }
    }

    /// Strategy identifier.
    #[must_use]
    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instrument, when every trade was on the same one.
    #[must_use]
    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    /// Raw equity curve samples.
    #[must_use]
    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    /// Per-period returns of the normalized curve.
    #[must_use]
    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    /// Summary statistics.
    #[must_use]
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Annualized Sharpe ratio.
    #[must_use]
    pub fn sharpe(&self) -> f64 {
        self.stats.sharpe
    }
}

/// Builds one stream per agent from the learn-mode-filtered ledger.
///
/// Streams are returned in agent id order so that identical ledgers always
/// produce identical output.
#[must_use]
pub fn build_streams(
    trades: &[TradeRecord],
    mode: LearnMode,
    periods_per_year: f64,
) -> Vec<StrategyStream> {
    let kept = filter_learn_mode(trades, mode);
    let mut by_agent: BTreeMap<&StrategyId, Vec<&TradeRecord>> = BTreeMap::new();
    for trade in &kept {
        by_agent.entry(&trade.agent_id).or_default().push(trade);
    }
    by_agent
        .into_iter()
        .map(|(id, trades)| StrategyStream::from_trades(id.clone(), &trades, periods_per_year))
        .collect()
}
