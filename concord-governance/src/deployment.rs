//! Deployment ladder: shadow → reduced-live → live, with disabled reachable
//! from anywhere.
//!
//! Promotion needs every criterion of the next step. Demotion goes one step
//! down. A severe drawdown disables outright, and only an operator can bring
//! a disabled agent back (to shadow). Every transition is appended to the
//! agent's history with the caller's `as_of` time.

use std::collections::BTreeMap;
use std::fmt;

use concord_core::config::{DeploymentConfig, PromotionCriteria};
use concord_core::data::TradeRecord;
use concord_core::stats::{finite_or_zero, max_drawdown, mean};
use concord_core::types::{AgentId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GovernanceError, Result};
use crate::repository::{DeploymentRepository, InMemoryDeploymentRepository};
use crate::voter::ExecutionGate;

/// Size multiplier while in reduced-live.
pub const REDUCED_LIVE_MULTIPLIER: f64 = 0.35;

/// Default live size multiplier.
pub const DEFAULT_LIVE_MULTIPLIER: f64 = 1.0;

/// Floor on the baseline drawdown used as the ratio denominator.
const BASELINE_DRAWDOWN_FLOOR: f64 = 1e-4;

/// Deployment state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentState {
    /// Observed only; never executes.
    #[default]
    Shadow,
    /// Executes at reduced size.
    ReducedLive,
    /// Executes at the live multiplier.
    Live,
    /// Never executes until reinstated.
    Disabled,
}

impl DeploymentState {
    /// Returns the state as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::ReducedLive => "reduced-live",
            Self::Live => "live",
            Self::Disabled => "disabled",
        }
    }

    /// True for the executing states.
    #[must_use]
    pub const fn can_execute(&self) -> bool {
        matches!(self, Self::ReducedLive | Self::Live)
    }

    /// Next state up the ladder.
    #[must_use]
    pub const fn promotion(&self) -> Option<Self> {
        match self {
            Self::Shadow => Some(Self::ReducedLive),
            Self::ReducedLive => Some(Self::Live),
            Self::Live | Self::Disabled => None,
        }
    }

    /// Next state down the ladder.
    #[must_use]
    pub const fn demotion(&self) -> Option<Self> {
        match self {
            Self::Live => Some(Self::ReducedLive),
            Self::ReducedLive => Some(Self::Shadow),
            Self::Shadow | Self::Disabled => None,
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fleet reference figures an agent is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineFigures {
    /// Mean fractional return per trade.
    pub expectancy: f64,
    /// Max drawdown of the compounded curve, as a fraction.
    pub max_drawdown: f64,
}

impl BaselineFigures {
    /// Derives baseline figures from a set of trades in canonical order.
    #[must_use]
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a TradeRecord>) -> Self {
        let returns: Vec<f64> = trades.into_iter().map(TradeRecord::return_fraction).collect();
        Self {
            expectancy: mean(&returns),
            max_drawdown: max_drawdown(&compound(&returns)),
        }
    }
}

fn compound(returns: &[f64]) -> Vec<f64> {
    let mut value = 1.0;
    let mut curve = Vec::with_capacity(returns.len() + 1);
    curve.push(value);
    for r in returns {
        value *= 1.0 + r;
        curve.push(value);
    }
    curve
}

/// Evidence for one agent's position on the ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentMetrics {
    /// Trades taken in the current state.
    pub trade_count: u64,
    /// Mean fractional return per trade.
    pub expectancy: f64,
    /// Baseline expectancy the agent is compared with.
    pub baseline_expectancy: f64,
    /// Agent max drawdown over baseline max drawdown.
    pub drawdown_ratio: f64,
    /// Distinct sessions with positive summed return.
    pub profitable_sessions: usize,
    /// Consecutive days without detected drift; `None` when the drift
    /// detector has no reading for the agent.
    pub drift_free_days: Option<u32>,
}

impl DeploymentMetrics {
    /// Derives metrics from the agent's trades in canonical order.
    #[must_use]
    pub fn from_trades(
        trades: &[&TradeRecord],
        baseline: &BaselineFigures,
        drift_free_days: Option<u32>,
    ) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_fraction()).collect();
        let drawdown = max_drawdown(&compound(&returns));
        let denominator = baseline.max_drawdown.max(BASELINE_DRAWDOWN_FLOOR);

        let mut sessions: BTreeMap<String, f64> = BTreeMap::new();
        for (trade, r) in trades.iter().zip(&returns) {
            *sessions
                .entry(trade.session_label.trim().to_lowercase())
                .or_default() += r;
        }

        Self {
            trade_count: trades.len() as u64,
            expectancy: mean(&returns),
            baseline_expectancy: finite_or_zero(baseline.expectancy),
            drawdown_ratio: finite_or_zero(drawdown / denominator),
            profitable_sessions: sessions.values().filter(|total| **total > 0.0).count(),
            drift_free_days,
        }
    }
}

/// Which requirement a criterion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    /// Trades taken in the current state.
    MinTrades,
    /// Expectancy against a multiple of baseline.
    ExpectancyMultiple,
    /// Drawdown ratio strictly below a ceiling.
    DrawdownRatio,
    /// Distinct profitable sessions.
    ProfitableSessions,
    /// Drift-free days.
    DriftFreeDays,
    /// Agent is disabled; only an operator can reinstate it.
    NotDisabled,
}

/// One failed requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetCriterion {
    /// Requirement.
    pub criterion: Criterion,
    /// Threshold.
    pub required: f64,
    /// Observed value.
    pub actual: f64,
    /// Human-readable description.
    pub message: String,
}

/// Every criterion of `criteria` that `metrics` fails.
#[must_use]
pub fn unmet_criteria(criteria: &PromotionCriteria, metrics: &DeploymentMetrics) -> Vec<UnmetCriterion> {
    let mut unmet = Vec::new();

    if metrics.trade_count < criteria.min_trades {
        unmet.push(UnmetCriterion {
            criterion: Criterion::MinTrades,
            required: criteria.min_trades as f64,
            actual: metrics.trade_count as f64,
            message: format!(
                "needs {} trades, has {}",
                criteria.min_trades, metrics.trade_count
            ),
        });
    }

    let required_expectancy = criteria.expectancy_multiple * metrics.baseline_expectancy;
    if metrics.expectancy < required_expectancy {
        unmet.push(UnmetCriterion {
            criterion: Criterion::ExpectancyMultiple,
            required: required_expectancy,
            actual: metrics.expectancy,
            message: format!(
                "expectancy {:.6} below {}x baseline ({required_expectancy:.6})",
                metrics.expectancy, criteria.expectancy_multiple
            ),
        });
    }

    if metrics.drawdown_ratio >= criteria.max_drawdown_ratio {
        unmet.push(UnmetCriterion {
            criterion: Criterion::DrawdownRatio,
            required: criteria.max_drawdown_ratio,
            actual: metrics.drawdown_ratio,
            message: format!(
                "drawdown ratio {:.3} not below {}",
                metrics.drawdown_ratio, criteria.max_drawdown_ratio
            ),
        });
    }

    if metrics.profitable_sessions < criteria.min_profitable_sessions {
        unmet.push(UnmetCriterion {
            criterion: Criterion::ProfitableSessions,
            required: criteria.min_profitable_sessions as f64,
            actual: metrics.profitable_sessions as f64,
            message: format!(
                "needs {} profitable sessions, has {}",
                criteria.min_profitable_sessions, metrics.profitable_sessions
            ),
        });
    }

    match metrics.drift_free_days {
        None => unmet.push(UnmetCriterion {
            criterion: Criterion::DriftFreeDays,
            required: f64::from(criteria.min_drift_free_days),
            actual: 0.0,
            message: format!(
                "needs {} drift-free days, no drift reading",
                criteria.min_drift_free_days
            ),
        }),
        Some(days) if days < criteria.min_drift_free_days => unmet.push(UnmetCriterion {
            criterion: Criterion::DriftFreeDays,
            required: f64::from(criteria.min_drift_free_days),
            actual: f64::from(days),
            message: format!(
                "needs {} drift-free days, has {days}",
                criteria.min_drift_free_days
            ),
        }),
        Some(_) => {}
    }

    unmet
}

fn disabled_criterion() -> UnmetCriterion {
    UnmetCriterion {
        criterion: Criterion::NotDisabled,
        required: 0.0,
        actual: 1.0,
        message: "agent is disabled; operator reinstatement required".to_string(),
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// All criteria for the next step met.
    Promoted,
    /// A demotion condition fired.
    Demoted,
    /// Drawdown ratio reached the disable level.
    AutoDisabled,
    /// Operator disabled the agent.
    OperatorDisabled,
    /// Operator reinstated the agent to shadow.
    Reinstated,
}

/// One entry in an agent's transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// State before.
    pub from: DeploymentState,
    /// State after.
    pub to: DeploymentState,
    /// Caller-supplied time.
    pub at: Timestamp,
    /// Cause.
    pub trigger: TransitionTrigger,
    /// Details.
    pub reason: String,
}

/// Durable ladder state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Agent.
    pub agent_id: AgentId,
    /// Current state.
    pub state: DeploymentState,
    /// When the current state was entered.
    pub since: Timestamp,
    /// Size multiplier used while live.
    pub live_multiplier: f64,
    /// Metrics from the latest evaluation in this state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DeploymentMetrics>,
    /// Criteria blocking the next promotion at the latest evaluation.
    pub unmet_criteria: Vec<UnmetCriterion>,
    /// Transitions, oldest first.
    pub history: Vec<Transition>,
}

impl DeploymentRecord {
    /// Fresh shadow record.
    #[must_use]
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            state: DeploymentState::Shadow,
            since: Timestamp::ZERO,
            live_multiplier: DEFAULT_LIVE_MULTIPLIER,
            metrics: None,
            unmet_criteria: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Execution size multiplier for the current state.
    #[must_use]
    pub fn size_multiplier(&self) -> f64 {
        match self.state {
            DeploymentState::Shadow | DeploymentState::Disabled => 0.0,
            DeploymentState::ReducedLive => REDUCED_LIVE_MULTIPLIER,
            DeploymentState::Live => self.live_multiplier,
        }
    }

    /// Published view.
    #[must_use]
    pub fn snapshot(&self) -> DeploymentSnapshot {
        let unmet_criteria = if self.state == DeploymentState::Disabled {
            vec![disabled_criterion()]
        } else {
            self.unmet_criteria.clone()
        };
        DeploymentSnapshot {
            agent_id: self.agent_id.clone(),
            state: self.state,
            size_multiplier: self.size_multiplier(),
            can_execute: self.state.can_execute(),
            unmet_criteria,
        }
    }

    fn transition(
        &mut self,
        to: DeploymentState,
        trigger: TransitionTrigger,
        reason: String,
        at: Timestamp,
    ) -> Transition {
        let transition = Transition {
            from: self.state,
            to,
            at,
            trigger,
            reason,
        };
        self.state = to;
        self.since = at;
        self.metrics = None;
        self.unmet_criteria.clear();
        if to == DeploymentState::Live {
            self.live_multiplier = DEFAULT_LIVE_MULTIPLIER;
        }
        self.history.push(transition.clone());
        transition
    }
}

/// Published per-agent ladder view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSnapshot {
    /// Agent.
    pub agent_id: AgentId,
    /// Current state.
    pub state: DeploymentState,
    /// Execution size multiplier.
    pub size_multiplier: f64,
    /// Whether the agent may execute.
    pub can_execute: bool,
    /// Criteria blocking the next promotion.
    pub unmet_criteria: Vec<UnmetCriterion>,
}

/// Read-only promotion check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCheck {
    /// State checked from.
    pub current: DeploymentState,
    /// State a promotion would reach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<DeploymentState>,
    /// Failed requirements.
    pub unmet: Vec<UnmetCriterion>,
}

impl UnlockCheck {
    /// True if a promotion would happen.
    #[must_use]
    pub fn can_unlock(&self) -> bool {
        self.target.is_some() && self.unmet.is_empty()
    }
}

/// Operator request to change the live size multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetuneProposal {
    /// Agent.
    pub agent_id: AgentId,
    /// Requested multiplier, in (0, 1].
    pub size_multiplier: f64,
    /// Why.
    pub reason: String,
}

/// Moves agents between deployment states.
#[derive(Debug)]
pub struct DeploymentLadder<R = InMemoryDeploymentRepository> {
    config: DeploymentConfig,
    repository: R,
}

impl DeploymentLadder<InMemoryDeploymentRepository> {
    /// Creates a ladder over an in-memory repository.
    #[must_use]
    pub fn new(config: DeploymentConfig) -> Self {
        Self::with_repository(config, InMemoryDeploymentRepository::new())
    }
}

impl<R: DeploymentRepository> DeploymentLadder<R> {
    /// Creates a ladder over `repository`.
    #[must_use]
    pub fn with_repository(config: DeploymentConfig, repository: R) -> Self {
        Self { config, repository }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Returns the agent's record, creating a shadow record on first reference.
    pub fn record(&self, agent: &AgentId) -> DeploymentRecord {
        let mut out = None;
        self.repository
            .update(agent, &mut |record| out = Some(record.clone()));
        out.unwrap_or_else(|| DeploymentRecord::new(agent.clone()))
    }

    /// Published view of one agent.
    pub fn snapshot(&self, agent: &AgentId) -> DeploymentSnapshot {
        self.record(agent).snapshot()
    }

    /// Published view of every known agent.
    #[must_use]
    pub fn snapshots(&self) -> BTreeMap<AgentId, DeploymentSnapshot> {
        self.repository
            .agents()
            .into_iter()
            .filter_map(|agent| {
                self.repository
                    .get(&agent)
                    .map(|record| (agent, record.snapshot()))
            })
            .collect()
    }

    fn criteria_for(&self, state: DeploymentState) -> Option<&PromotionCriteria> {
        match state {
            DeploymentState::Shadow => Some(&self.config.unlock),
            DeploymentState::ReducedLive => Some(&self.config.promote_live),
            DeploymentState::Live | DeploymentState::Disabled => None,
        }
    }

    fn check_state(&self, state: DeploymentState, metrics: &DeploymentMetrics) -> UnlockCheck {
        if state == DeploymentState::Disabled {
            return UnlockCheck {
                current: state,
                target: None,
                unmet: vec![disabled_criterion()],
            };
        }
        UnlockCheck {
            current: state,
            target: state.promotion(),
            unmet: self
                .criteria_for(state)
                .map(|c| unmet_criteria(c, metrics))
                .unwrap_or_default(),
        }
    }

    /// Checks whether `metrics` would promote the agent, without changing it.
    pub fn check_unlock(&self, agent: &AgentId, metrics: &DeploymentMetrics) -> UnlockCheck {
        self.check_state(self.record(agent).state, metrics)
    }

    fn demotion_reason(&self, metrics: &DeploymentMetrics) -> Option<String> {
        if metrics.expectancy < 0.0 {
            Some(format!("negative expectancy {:.6}", metrics.expectancy))
        } else if metrics.drawdown_ratio >= self.config.demote_drawdown_ratio {
            Some(format!(
                "drawdown ratio {:.3} at or above {}",
                metrics.drawdown_ratio, self.config.demote_drawdown_ratio
            ))
        } else if metrics.drift_free_days == Some(0) {
            Some("fresh drift detected".to_string())
        } else {
            None
        }
    }

    /// Applies one evaluation: auto-disable, demotion, or promotion.
    ///
    /// Returns the transition taken, if any. Disabled agents only have their
    /// metrics recorded.
    pub fn evaluate(
        &self,
        agent: &AgentId,
        metrics: DeploymentMetrics,
        at: Timestamp,
    ) -> Option<Transition> {
        self.evaluate_with(agent, at, |_| Some(metrics))
    }

    /// Like [`Self::evaluate`], with metrics derived from the record as it
    /// stands under the entry lock.
    ///
    /// Evidence keyed on the record's `since` therefore always matches the
    /// state being evaluated. When `derive` returns `None` the record is left
    /// untouched.
    pub fn evaluate_with(
        &self,
        agent: &AgentId,
        at: Timestamp,
        mut derive: impl FnMut(&DeploymentRecord) -> Option<DeploymentMetrics>,
    ) -> Option<Transition> {
        let mut taken = None;
        self.repository.update(agent, &mut |record| {
            let Some(metrics) = derive(record) else {
                return;
            };
            let state = record.state;
            if state == DeploymentState::Disabled {
                record.metrics = Some(metrics);
                return;
            }

            if metrics.drawdown_ratio >= self.config.disable_drawdown_ratio {
                let reason = format!(
                    "drawdown ratio {:.3} at or above {}",
                    metrics.drawdown_ratio, self.config.disable_drawdown_ratio
                );
                taken = Some(record.transition(
                    DeploymentState::Disabled,
                    TransitionTrigger::AutoDisabled,
                    reason,
                    at,
                ));
                return;
            }

            if state.can_execute()
                && let Some(reason) = self.demotion_reason(&metrics)
                && let Some(to) = state.demotion()
            {
                taken = Some(record.transition(to, TransitionTrigger::Demoted, reason, at));
                return;
            }

            let check = self.check_state(state, &metrics);
            if check.can_unlock()
                && let Some(to) = check.target
            {
                let reason = format!(
                    "{} trades, expectancy {:.6}, drawdown ratio {:.3}",
                    metrics.trade_count, metrics.expectancy, metrics.drawdown_ratio
                );
                taken = Some(record.transition(to, TransitionTrigger::Promoted, reason, at));
            } else {
                record.metrics = Some(metrics);
                record.unmet_criteria = check.unmet;
            }
        });

        match &taken {
            Some(t) if t.to == DeploymentState::Disabled => {
                warn!(agent = %agent, from = %t.from, reason = %t.reason, "AGENT AUTO-DISABLED");
            }
            Some(t) => {
                info!(agent = %agent, from = %t.from, to = %t.to, trigger = ?t.trigger, "Deployment transition");
            }
            None => debug!(agent = %agent, "Deployment state unchanged"),
        }
        taken
    }

    /// Operator disables an agent. Returns `None` if it was already disabled.
    pub fn disable(&self, agent: &AgentId, reason: &str, at: Timestamp) -> Option<Transition> {
        let mut taken = None;
        self.repository.update(agent, &mut |record| {
            if record.state != DeploymentState::Disabled {
                taken = Some(record.transition(
                    DeploymentState::Disabled,
                    TransitionTrigger::OperatorDisabled,
                    reason.to_string(),
                    at,
                ));
            }
        });
        if taken.is_some() {
            warn!(agent = %agent, reason, "Agent disabled by operator");
        }
        taken
    }

    /// Operator returns a disabled agent to shadow.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidTransition`] if the agent is not
    /// disabled.
    pub fn reinstate(&self, agent: &AgentId, reason: &str, at: Timestamp) -> Result<Transition> {
        let mut outcome = None;
        self.repository.update(agent, &mut |record| {
            outcome = Some(if record.state == DeploymentState::Disabled {
                Ok(record.transition(
                    DeploymentState::Shadow,
                    TransitionTrigger::Reinstated,
                    reason.to_string(),
                    at,
                ))
            } else {
                Err(GovernanceError::InvalidTransition {
                    agent: agent.clone(),
                    state: record.state,
                    action: "reinstate",
                })
            });
        });
        let transition = outcome.unwrap_or_else(|| {
            Err(GovernanceError::InvalidTransition {
                agent: agent.clone(),
                state: DeploymentState::Shadow,
                action: "reinstate",
            })
        })?;
        info!(agent = %agent, reason, "Agent reinstated to shadow");
        Ok(transition)
    }

    /// Applies a live size retune.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::RetuneRejected`] unless the agent is live
    /// and the multiplier is in (0, 1].
    pub fn retune(&self, proposal: &RetuneProposal) -> Result<f64> {
        let agent = &proposal.agent_id;
        let value = proposal.size_multiplier;
        let mut outcome = Err(GovernanceError::RetuneRejected {
            agent: agent.clone(),
            reason: "no record".to_string(),
        });
        self.repository.update(agent, &mut |record| {
            outcome = if record.state != DeploymentState::Live {
                Err(GovernanceError::RetuneRejected {
                    agent: agent.clone(),
                    reason: format!("agent is {}, not live", record.state),
                })
            } else if !(value.is_finite() && value > 0.0 && value <= 1.0) {
                Err(GovernanceError::RetuneRejected {
                    agent: agent.clone(),
                    reason: format!("multiplier {value} outside (0, 1]"),
                })
            } else {
                record.live_multiplier = value;
                Ok(value)
            };
        });
        match &outcome {
            Ok(v) => info!(agent = %agent, multiplier = v, reason = %proposal.reason, "Live size retuned"),
            Err(e) => warn!(agent = %agent, error = %e, "Retune rejected"),
        }
        outcome
    }
}

impl<R: DeploymentRepository> ExecutionGate for DeploymentLadder<R> {
    fn can_execute(&self, agent: &AgentId) -> bool {
        self.repository
            .get(agent)
            .is_some_and(|record| record.state.can_execute())
    }
}
