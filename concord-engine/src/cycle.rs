//! One construction cycle: fetch, compute, publish.
//!
//! The ledger fetch is the only I/O and finishes (or times out) before any
//! computation starts. The compute stage is synchronous and runs under a
//! runner-wide lock, so concurrent cycles apply their effects one at a time.
//! Statistics are staged on a fork of the store; portfolio construction and
//! authority computation both finish before the fork is committed, so a
//! failing cycle changes no durable state and never replaces the published
//! snapshot or the published authorities.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use concord_core::data::TradeRecord;
use concord_core::traits::{TradeLedger, fetch_all};
use concord_core::types::{AgentId, Regime, RegimeAffinity, SignatureQuery, StrategyId, Timestamp};
use concord_governance::{
    AgentVote, AuthorityAdjuster, AuthorityAdjustment, BaselineFigures, CollaborationVoter,
    DecisionLog, DecisionOutcome, DeploymentLadder, DeploymentMetrics, DeploymentSnapshot,
    ExecutionGate,
    FallbackGuardian, GuardianVerdict, IngestReport, InMemoryStatsRepository, OutcomeTracker,
    SafetyController, Transition, ingest,
};
use concord_portfolio::{PortfolioBuilder, PublishedPortfolio, SnapshotPublisher, build_streams};
use concord_telemetry::spans::{cycle_span, governance_span, ledger_fetch_span, portfolio_span};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{Instrument, error, info, warn};

use crate::config::ConcordConfig;
use crate::error::CycleError;

/// Per-cycle inputs supplied by external collaborators.
#[derive(Debug, Clone)]
pub struct CycleInput {
    /// Current regime from the regime classifier.
    pub regime: Regime,
    /// Per-strategy regime affinities; missing strategies are neutral.
    pub affinities: BTreeMap<StrategyId, RegimeAffinity>,
    /// Drift-free days per agent from the drift detector. Agents without an
    /// entry cannot meet a drift-free requirement and are never demoted for
    /// drift.
    pub drift_free_days: BTreeMap<AgentId, u32>,
    /// Cycle time, used for publication and ladder transitions.
    pub as_of: Timestamp,
}

impl CycleInput {
    /// Input with neutral affinities and no drift detector readings.
    #[must_use]
    pub fn new(regime: Regime, as_of: Timestamp) -> Self {
        Self {
            regime,
            affinities: BTreeMap::new(),
            drift_free_days: BTreeMap::new(),
            as_of,
        }
    }
}

/// Everything one successful cycle produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Cycle counter for this runner, starting at 1.
    pub cycle: u64,
    /// Cycle time.
    pub as_of: Timestamp,
    /// The published portfolio.
    pub portfolio: Arc<PublishedPortfolio>,
    /// Authority per agent.
    pub authorities: BTreeMap<AgentId, AuthorityAdjustment>,
    /// Ladder view per agent after evaluation.
    pub deployments: BTreeMap<AgentId, DeploymentSnapshot>,
    /// Ladder transitions taken this cycle.
    pub transitions: Vec<Transition>,
    /// Statistics ingestion outcome.
    pub ingest: IngestReport,
    /// Rows returned by the ledger.
    pub trades_fetched: usize,
}

/// Runs construction cycles against one ledger and owns the durable
/// governance state between them.
pub struct CycleRunner {
    config: ConcordConfig,
    ledger: Arc<dyn TradeLedger>,
    stats: InMemoryStatsRepository,
    ladder: DeploymentLadder,
    safety: SafetyController,
    publisher: SnapshotPublisher,
    authorities: RwLock<Arc<BTreeMap<AgentId, AuthorityAdjustment>>>,
    outcomes: OutcomeTracker,
    guardian: FallbackGuardian,
    cycles: AtomicU64,
    compute_lock: Mutex<()>,
}

impl std::fmt::Debug for CycleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleRunner")
            .field("ledger", &self.ledger.name())
            .field("cycles", &self.cycles.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CycleRunner {
    /// Creates a runner with empty governance state.
    #[must_use]
    pub fn new(config: ConcordConfig, ledger: Arc<dyn TradeLedger>) -> Self {
        Self {
            ladder: DeploymentLadder::new(config.deployment.clone()),
            guardian: FallbackGuardian::new(config.fallback.clone()),
            outcomes: OutcomeTracker::with_window(config.fallback.outcome_window),
            config,
            ledger,
            stats: InMemoryStatsRepository::new(),
            safety: SafetyController::new(),
            publisher: SnapshotPublisher::new(),
            authorities: RwLock::new(Arc::new(BTreeMap::new())),
            cycles: AtomicU64::new(0),
            compute_lock: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ConcordConfig {
        &self.config
    }

    /// Safety switches shared with operator tooling.
    #[must_use]
    pub fn safety(&self) -> &SafetyController {
        &self.safety
    }

    /// Deployment ladder shared with operator tooling.
    #[must_use]
    pub fn ladder(&self) -> &DeploymentLadder {
        &self.ladder
    }

    /// Latest published portfolio, if any cycle has succeeded.
    #[must_use]
    pub fn current_portfolio(&self) -> Option<Arc<PublishedPortfolio>> {
        self.publisher.current()
    }

    /// Authorities published by the latest successful cycle.
    #[must_use]
    pub fn authorities(&self) -> Arc<BTreeMap<AgentId, AuthorityAdjustment>> {
        Arc::clone(&self.authorities.read())
    }

    /// Runs one cycle.
    ///
    /// # Errors
    ///
    /// Returns `CycleError::Timeout` or `CycleError::Fetch` if the ledger
    /// fetch does not complete, and the portfolio or governance error if
    /// computation fails. Published state is unchanged in every case.
    pub async fn run_cycle(&self, input: CycleInput) -> Result<CycleReport, CycleError> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let span = cycle_span(cycle, input.regime.as_str(), &input.as_of.to_string());

        let ledger_cfg = &self.config.ledger;
        let fetch = fetch_all(self.ledger.as_ref(), ledger_cfg.page_size).instrument(
            ledger_fetch_span(self.ledger.name(), ledger_cfg.page_size),
        );
        let trades = match tokio::time::timeout(ledger_cfg.fetch_timeout, fetch).await {
            Ok(Ok(trades)) => trades,
            Ok(Err(e)) => {
                span.in_scope(|| warn!(error = %e, "Ledger fetch failed; keeping previous snapshot"));
                return Err(CycleError::Fetch(e));
            }
            Err(_) => {
                span.in_scope(|| {
                    warn!(
                        timeout = ?ledger_cfg.fetch_timeout,
                        "Ledger fetch timed out; keeping previous snapshot"
                    );
                });
                return Err(CycleError::Timeout {
                    after: ledger_cfg.fetch_timeout,
                });
            }
        };

        span.in_scope(|| self.compute(cycle, &input, &trades))
    }

    fn compute(
        &self,
        cycle: u64,
        input: &CycleInput,
        trades: &[TradeRecord],
    ) -> Result<CycleReport, CycleError> {
        let _serial = self.compute_lock.lock();
        let learn_mode = self.config.ledger.learn_mode;

        let streams = build_streams(trades, learn_mode, self.config.portfolio.periods_per_year);
        let portfolio = {
            let _span = portfolio_span(input.regime.as_str(), streams.len()).entered();
            PortfolioBuilder::new(self.config.portfolio.clone())
                .build(streams, &input.affinities, input.regime)
                .inspect_err(|e| error!(error = %e, "Portfolio construction failed"))?
        };

        let mut filtered: Vec<&TradeRecord> = trades
            .iter()
            .filter(|t| learn_mode.includes(t.environment))
            .collect();
        filtered.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.trade_id.cmp(&b.trade_id))
        });
        let agents: BTreeSet<&AgentId> = filtered.iter().map(|t| &t.agent_id).collect();

        let _governance =
            governance_span(learn_mode.as_str(), agents.len()).entered();

        let staged = self.stats.fork();
        let ingest_report = ingest(
            &staged,
            trades,
            learn_mode,
            self.config.authority.pairing_window,
        );
        let authorities = AuthorityAdjuster::new(self.config.authority.clone())
            .compute_all(&staged, &SignatureQuery::any())
            .inspect_err(|e| error!(error = %e, "Authority computation failed"))?;
        self.stats.commit(staged);

        let baseline = BaselineFigures::from_trades(filtered.iter().copied());
        let mut transitions = Vec::new();
        for agent in agents {
            let drift_free_days = input.drift_free_days.get(agent).copied();
            let taken = self.ladder.evaluate_with(agent, input.as_of, |record| {
                let window: Vec<&TradeRecord> = filtered
                    .iter()
                    .copied()
                    .filter(|t| &t.agent_id == agent && t.created_at >= record.since)
                    .collect();
                (!window.is_empty())
                    .then(|| DeploymentMetrics::from_trades(&window, &baseline, drift_free_days))
            });
            transitions.extend(taken);
        }

        let portfolio = self.publisher.publish(portfolio, input.as_of);
        *self.authorities.write() = Arc::new(authorities.clone());

        info!(
            cycle,
            trades = trades.len(),
            accepted = portfolio.result.accepted_count,
            agents = authorities.len(),
            transitions = transitions.len(),
            "Cycle complete"
        );

        Ok(CycleReport {
            cycle,
            as_of: input.as_of,
            portfolio,
            authorities,
            deployments: self.ladder.snapshots(),
            transitions,
            ingest: ingest_report,
            trades_fetched: trades.len(),
        })
    }

    /// Runs the collaboration vote with the latest authorities, the ladder
    /// as execution gate and the current safety state.
    #[must_use]
    pub fn decide(&self, votes: &[AgentVote]) -> DecisionLog {
        self.decide_with_gate(votes, &self.ladder)
    }

    /// Like [`Self::decide`] but with a caller-supplied gate, for what-if
    /// analysis outside the ladder.
    #[must_use]
    pub fn decide_with_gate(&self, votes: &[AgentVote], gate: &dyn ExecutionGate) -> DecisionLog {
        let authorities = self.authorities();
        CollaborationVoter::new(self.config.voter.clone()).decide(
            votes,
            &authorities,
            &self.safety.state(),
            gate,
        )
    }

    /// Records how a decision played out and lets the guardian react.
    ///
    /// `long_return` is the realized return of the long side.
    pub fn record_outcome(
        &self,
        log: &DecisionLog,
        long_return: f64,
        at: Timestamp,
    ) -> GuardianVerdict {
        self.guardian.record(
            &self.outcomes,
            &self.safety,
            DecisionOutcome::from_decision(log, long_return),
            at,
        )
    }
}
