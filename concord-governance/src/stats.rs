//! Durable per-agent and per-pair trade statistics.
//!
//! Trades are turned into observations keyed by [`SoloKey`] and [`PairKey`]
//! and applied to a [`StatsRepository`](crate::repository::StatsRepository).
//! Observations carry the originating trade id so re-ingesting the same
//! ledger is a no-op.

use std::collections::BTreeMap;
use std::time::Duration;

use concord_core::data::{TradeRecord, filter_learn_mode};
use concord_core::types::{AgentId, EnvironmentSignature, LearnMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::authority::PairEvidence;
use crate::repository::StatsRepository;

/// Key for single-agent statistics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoloKey {
    /// Agent.
    pub agent: AgentId,
    /// Environment of the trade.
    pub signature: EnvironmentSignature,
}

/// Key for directed pair statistics: how `partner` relates to `subject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairKey {
    /// Agent whose trades are being judged.
    pub subject: AgentId,
    /// Agent whose concurrent trades agree with or veto the subject.
    pub partner: AgentId,
    /// Environment of the subject's trade.
    pub signature: EnvironmentSignature,
}

/// Streaming count / mean / variance accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningStats {
    count: u64,
    sum: f64,
    sum_sq: f64,
    wins: u64,
}

impl RunningStats {
    /// Adds one return.
    pub fn record(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        if value > 0.0 {
            self.wins += 1;
        }
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.wins += other.wins;
    }

    /// Number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of positive observations.
    #[must_use]
    pub fn wins(&self) -> u64 {
        self.wins
    }

    /// Mean return; 0 when empty.
    #[must_use]
    pub fn expectancy(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Fraction of positive observations; 0 when empty.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.wins as f64 / self.count as f64
        }
    }

    /// Per-trade Sharpe (mean over sample deviation); 0 below two
    /// observations or on zero variance.
    #[must_use]
    pub fn sharpe(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0);
        let sd = variance.sqrt();
        if sd > 0.0 { self.expectancy() / sd } else { 0.0 }
    }
}

/// Read-side view of one agent's solo statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSoloStats {
    /// Trades counted.
    pub trade_count: u64,
    /// Mean fractional return per trade.
    pub expectancy: f64,
    /// Share of winning trades.
    pub win_rate: f64,
    /// Per-trade Sharpe.
    pub sharpe: f64,
}

impl From<&RunningStats> for AgentSoloStats {
    fn from(stats: &RunningStats) -> Self {
        Self {
            trade_count: stats.count(),
            expectancy: stats.expectancy(),
            win_rate: stats.win_rate(),
            sharpe: stats.sharpe(),
        }
    }
}

/// Accumulated pair evidence for one [`PairKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairAccumulator {
    /// Subject returns on every paired trade.
    pub paired: RunningStats,
    /// Subject returns where the partner traded the same way.
    pub agreement: RunningStats,
    /// Partner traded the opposite way.
    pub vetoes: u64,
    /// Vetoes where the subject's trade lost.
    pub correct_vetoes: u64,
    /// Vetoes where the subject's trade won.
    pub false_vetoes: u64,
}

impl PairAccumulator {
    /// Adds one observation.
    pub fn record(&mut self, observation: &PairObservation) {
        let ret = observation.subject_return;
        self.paired.record(ret);
        if observation.veto {
            self.vetoes += 1;
            if ret > 0.0 {
                self.false_vetoes += 1;
            } else {
                self.correct_vetoes += 1;
            }
        } else {
            self.agreement.record(ret);
        }
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.paired.merge(&other.paired);
        self.agreement.merge(&other.agreement);
        self.vetoes += other.vetoes;
        self.correct_vetoes += other.correct_vetoes;
        self.false_vetoes += other.false_vetoes;
    }
}

/// Read-side view of one directed pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPairStats {
    /// Subject trades with a partner trade in the window.
    pub paired_trades: u64,
    /// Opposite-direction pairings.
    pub veto_count: u64,
    /// Correct vetoes / vetoes.
    pub veto_precision: f64,
    /// False vetoes / subject's winning paired trades.
    pub false_veto_rate: f64,
    /// Subject expectancy when the partner agreed.
    pub agreement_expectancy: f64,
    /// Subject expectancy over all paired trades.
    pub paired_expectancy: f64,
}

impl AgentPairStats {
    /// Evidence used for relationship classification.
    #[must_use]
    pub fn evidence(&self) -> PairEvidence {
        PairEvidence {
            paired_trades: self.paired_trades,
            veto_precision: self.veto_precision,
            false_veto_rate: self.false_veto_rate,
            synergy_edge: self.agreement_expectancy - self.paired_expectancy,
        }
    }
}

impl From<&PairAccumulator> for AgentPairStats {
    fn from(acc: &PairAccumulator) -> Self {
        let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        Self {
            paired_trades: acc.paired.count(),
            veto_count: acc.vetoes,
            veto_precision: ratio(acc.correct_vetoes, acc.vetoes),
            false_veto_rate: ratio(acc.false_vetoes, acc.paired.wins()),
            agreement_expectancy: acc.agreement.expectancy(),
            paired_expectancy: acc.paired.expectancy(),
        }
    }
}

/// One trade's contribution to its agent's solo stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoloObservation {
    /// Originating trade.
    pub trade_id: String,
    /// Target key.
    pub key: SoloKey,
    /// Fractional return.
    pub subject_return: f64,
}

/// One subject trade paired with the nearest partner trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairObservation {
    /// Subject trade.
    pub trade_id: String,
    /// Target key.
    pub key: PairKey,
    /// Subject's fractional return.
    pub subject_return: f64,
    /// Partner traded the opposite direction.
    pub veto: bool,
}

/// Observations derived from one ledger snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsBatch {
    /// Solo observations, one per trade.
    pub solo: Vec<SoloObservation>,
    /// Pair observations, at most one per (trade, partner agent).
    pub pairs: Vec<PairObservation>,
}

/// Outcome of applying a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// New solo observations stored.
    pub solo_applied: usize,
    /// Solo observations already present.
    pub solo_skipped: usize,
    /// New pair observations stored.
    pub pair_applied: usize,
    /// Pair observations already present.
    pub pair_skipped: usize,
}

impl StatsBatch {
    /// Builds observations from `trades`.
    ///
    /// Only environments counted by `mode` contribute. Each subject trade is
    /// paired, per partner agent, with that agent's nearest trade on the same
    /// instrument within `window`; equal distances go to the earlier trade in
    /// `(created_at, trade_id)` order.
    #[must_use]
    pub fn from_trades(trades: &[TradeRecord], mode: LearnMode, window: Duration) -> Self {
        let trades = filter_learn_mode(trades, mode);
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);

        let solo = trades
            .iter()
            .map(|t| SoloObservation {
                trade_id: t.trade_id.clone(),
                key: SoloKey {
                    agent: t.agent_id.clone(),
                    signature: t.signature(),
                },
                subject_return: t.return_fraction(),
            })
            .collect();

        let mut by_instrument: BTreeMap<&str, Vec<&TradeRecord>> = BTreeMap::new();
        for trade in &trades {
            by_instrument
                .entry(trade.instrument.as_str())
                .or_default()
                .push(trade);
        }

        let mut pairs = Vec::new();
        for group in by_instrument.values() {
            for (i, subject) in group.iter().enumerate() {
                let mut nearest: BTreeMap<&AgentId, (u64, usize)> = BTreeMap::new();
                let mut consider = |j: usize| {
                    let distance = subject.created_at.abs_diff_millis(group[j].created_at);
                    let best = nearest.entry(&group[j].agent_id).or_insert((distance, j));
                    if distance < best.0 || (distance == best.0 && j < best.1) {
                        *best = (distance, j);
                    }
                };

                for j in (0..i).rev() {
                    let partner = group[j];
                    if subject.created_at.abs_diff_millis(partner.created_at) > window_ms {
                        break;
                    }
                    if partner.agent_id != subject.agent_id {
                        consider(j);
                    }
                }
                for (j, partner) in group.iter().enumerate().skip(i + 1) {
                    if subject.created_at.abs_diff_millis(partner.created_at) > window_ms {
                        break;
                    }
                    if partner.agent_id != subject.agent_id {
                        consider(j);
                    }
                }

                for (partner_id, (_, j)) in nearest {
                    pairs.push(PairObservation {
                        trade_id: subject.trade_id.clone(),
                        key: PairKey {
                            subject: subject.agent_id.clone(),
                            partner: partner_id.clone(),
                            signature: subject.signature(),
                        },
                        subject_return: subject.return_fraction(),
                        veto: group[j].direction != subject.direction,
                    });
                }
            }
        }

        debug!(
            trades = trades.len(),
            solo = trades.len(),
            pairs = pairs.len(),
            "Built statistics batch"
        );
        Self { solo, pairs }
    }
}

/// Derives observations from `trades` and applies them to `repository`.
pub fn ingest(
    repository: &dyn StatsRepository,
    trades: &[TradeRecord],
    mode: LearnMode,
    window: Duration,
) -> IngestReport {
    repository.apply(&StatsBatch::from_trades(trades, mode, window))
}
