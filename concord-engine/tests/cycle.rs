//! End-to-end cycle tests against in-memory and misbehaving ledgers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use concord_core::data::TradeRecord;
use concord_core::error::StorageError;
use concord_core::traits::{InMemoryLedger, TradeLedger};
use concord_core::types::{
    AgentId, Direction, Instrument, Regime, RegimeAffinity, Timestamp, TradeEnvironment,
};
use concord_engine::{ConcordConfig, CycleError, CycleInput, CycleRunner};
use concord_governance::{
    AgentVote, Criterion, DeploymentState, GuardianVerdict, OpenGate, VotingResult,
};
use rust_decimal::Decimal;

const DAY_MS: i64 = 86_400_000;

fn trade(n: i64, agent: &str, direction: Direction, bps: i64, minute: i64) -> TradeRecord {
    TradeRecord {
        trade_id: format!("{agent}-{n}"),
        agent_id: AgentId::from(agent),
        instrument: Instrument::new("EUR_USD").unwrap(),
        direction,
        entry_price: Decimal::new(100_0000, 4),
        exit_price: Decimal::new(100_0000 + bps * 100, 4),
        session_label: if n % 2 == 0 { "london" } else { "new_york" }.to_string(),
        regime_label: Regime::Trend,
        environment: TradeEnvironment::Live,
        created_at: Timestamp::new_unchecked(n * DAY_MS / 4 + minute * 60_000),
    }
}

fn fixture() -> Vec<TradeRecord> {
    let mut trades = Vec::new();
    for n in 0..40 {
        // gamma shorts the inverse of alpha's move, so their returns match.
        let alpha = if n % 4 == 3 { -4 } else { 6 };
        let beta = if n % 2 == 0 { 5 } else { -3 };
        trades.push(trade(n, "alpha", Direction::Long, alpha, 0));
        trades.push(trade(n, "beta", Direction::Long, beta, 3));
        trades.push(trade(n, "gamma", Direction::Short, -alpha, 5));
    }
    trades
}

/// `star` wins every trade across three sessions; `steady` alternates.
fn ladder_fixture() -> Vec<TradeRecord> {
    const SESSIONS: [&str; 3] = ["london", "new_york", "tokyo"];
    let mut trades = Vec::new();
    for n in 0..160 {
        let mut star = trade(n, "star", Direction::Long, 6, 0);
        star.session_label = SESSIONS[(n % 3) as usize].to_string();
        trades.push(star);
        let steady = if n % 2 == 0 { 5 } else { -3 };
        trades.push(trade(n, "steady", Direction::Long, steady, 3));
    }
    trades
}

fn ladder_input(star_drift_free_days: Option<u32>) -> CycleInput {
    let mut input = CycleInput::new(Regime::Trend, Timestamp::new_unchecked(41 * DAY_MS));
    if let Some(days) = star_drift_free_days {
        input.drift_free_days.insert(AgentId::from("star"), days);
    }
    input
}

fn input() -> CycleInput {
    let mut input = CycleInput::new(Regime::Trend, Timestamp::new_unchecked(20 * DAY_MS));
    input.affinities.insert(
        AgentId::from("alpha"),
        RegimeAffinity {
            trend: 3.0,
            range: 1.0,
            shock: 0.0,
        },
    );
    input
}

fn runner(ledger: Arc<dyn TradeLedger>, timeout: Duration) -> CycleRunner {
    let mut config = ConcordConfig::default();
    config.ledger.page_size = 16;
    config.ledger.fetch_timeout = timeout;
    CycleRunner::new(config, ledger)
}

const HEALTHY: u8 = 0;
const FAILING: u8 = 1;
const STALLED: u8 = 2;

/// Ledger whose behavior can be switched between cycles.
struct SwitchableLedger {
    inner: InMemoryLedger,
    mode: AtomicU8,
}

impl SwitchableLedger {
    fn new(records: Vec<TradeRecord>) -> Self {
        Self {
            inner: InMemoryLedger::new(records),
            mode: AtomicU8::new(HEALTHY),
        }
    }

    fn set(&self, mode: u8) {
        self.mode.store(mode, Ordering::SeqCst);
    }
}

#[async_trait]
impl TradeLedger for SwitchableLedger {
    fn name(&self) -> &str {
        "switchable"
    }

    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StorageError> {
        match self.mode.load(Ordering::SeqCst) {
            FAILING if offset > 0 => Err(StorageError::Unavailable {
                reason: "connection reset".to_string(),
            }),
            STALLED => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                self.inner.fetch_page(offset, limit).await
            }
            _ => self.inner.fetch_page(offset, limit).await,
        }
    }
}

#[tokio::test]
async fn test_cycle_publishes_portfolio_and_governance() {
    let ledger = Arc::new(InMemoryLedger::new(fixture()));
    let runner = runner(ledger.clone(), Duration::from_secs(5));

    let report = runner.run_cycle(input()).await.unwrap();

    assert_eq!(report.cycle, 1);
    assert_eq!(report.trades_fetched, 120);
    assert!(ledger.pages_served() >= 8);
    assert_eq!(report.portfolio.sequence, 1);

    let result = &report.portfolio.result;
    assert_eq!(result.members.len(), 3);
    assert!(result.accepted_count >= 1);
    let total: f64 = result.members.iter().map(|m| m.final_weight).sum();
    assert!((total - 1.0).abs() < 1e-9);

    assert_eq!(report.authorities.len(), 3);
    for adjustment in report.authorities.values() {
        assert!((0.1..=2.0).contains(&adjustment.value));
    }

    // 40 trades each: every agent is known to the ladder but none unlocks.
    assert_eq!(report.deployments.len(), 3);
    for snapshot in report.deployments.values() {
        assert_eq!(snapshot.state, DeploymentState::Shadow);
        assert!(!snapshot.can_execute);
        assert!(!snapshot.unmet_criteria.is_empty());
    }
    assert!(report.transitions.is_empty());

    assert!(runner.current_portfolio().is_some());
    assert_eq!(runner.authorities().len(), 3);
}

#[tokio::test]
async fn test_identical_input_is_byte_identical() {
    let first = runner(Arc::new(InMemoryLedger::new(fixture())), Duration::from_secs(5));
    let second = runner(Arc::new(InMemoryLedger::new(fixture())), Duration::from_secs(5));

    let a = serde_json::to_string(&first.run_cycle(input()).await.unwrap()).unwrap();
    let b = serde_json::to_string(&second.run_cycle(input()).await.unwrap()).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_rerun_does_not_double_count() {
    let runner = runner(Arc::new(InMemoryLedger::new(fixture())), Duration::from_secs(5));

    let first = runner.run_cycle(input()).await.unwrap();
    let second = runner.run_cycle(input()).await.unwrap();

    assert_eq!(second.cycle, 2);
    assert_eq!(second.portfolio.sequence, 2);
    assert_eq!(second.ingest.solo_applied, 0);
    assert_eq!(second.ingest.solo_skipped, first.ingest.solo_applied);
    assert_eq!(
        serde_json::to_string(&first.authorities).unwrap(),
        serde_json::to_string(&second.authorities).unwrap()
    );
}

#[tokio::test]
async fn test_fetch_error_keeps_previous_snapshot() {
    let ledger = Arc::new(SwitchableLedger::new(fixture()));
    let runner = runner(ledger.clone(), Duration::from_secs(5));
    let published = runner.run_cycle(input()).await.unwrap().portfolio;

    ledger.set(FAILING);
    let err = runner.run_cycle(input()).await.unwrap_err();

    assert_eq!(
        err,
        CycleError::Fetch(StorageError::Unavailable {
            reason: "connection reset".to_string(),
        })
    );
    assert!(err.is_upstream());
    let current = runner.current_portfolio().unwrap();
    assert!(Arc::ptr_eq(&current, &published));
}

#[tokio::test]
async fn test_timeout_aborts_before_compute() {
    let ledger = Arc::new(SwitchableLedger::new(fixture()));
    let runner = runner(ledger.clone(), Duration::from_millis(50));
    let published = runner.run_cycle(input()).await.unwrap().portfolio;
    let authorities = runner.authorities();

    ledger.set(STALLED);
    let err = runner.run_cycle(input()).await.unwrap_err();

    assert_eq!(
        err,
        CycleError::Timeout {
            after: Duration::from_millis(50)
        }
    );
    assert!(Arc::ptr_eq(&runner.current_portfolio().unwrap(), &published));
    assert!(Arc::ptr_eq(&runner.authorities(), &authorities));
}

#[tokio::test]
async fn test_empty_ledger_publishes_empty_portfolio() {
    let runner = runner(Arc::new(InMemoryLedger::new(Vec::new())), Duration::from_secs(5));
    let report = runner.run_cycle(input()).await.unwrap();

    assert!(report.portfolio.result.members.is_empty());
    assert!(report.authorities.is_empty());
    assert!(report.deployments.is_empty());
}

#[tokio::test]
async fn test_decide_excludes_shadow_agents() {
    let runner = runner(Arc::new(InMemoryLedger::new(fixture())), Duration::from_secs(5));
    runner.run_cycle(input()).await.unwrap();

    let votes = [
        AgentVote {
            agent_id: AgentId::from("alpha"),
            direction: Direction::Long,
            confidence: 0.9,
        },
        AgentVote {
            agent_id: AgentId::from("beta"),
            direction: Direction::Short,
            confidence: 0.4,
        },
    ];
    let log = runner.decide(&votes);

    // Everyone is still in shadow.
    assert!(log.participating_agents.is_empty());
    assert_eq!(log.excluded_agents.len(), 2);
    assert_eq!(log.final_result, VotingResult::Abstain);
    assert!(!log.outcome_changed);
}

#[tokio::test]
async fn test_outcomes_feed_the_guardian() {
    let runner = runner(Arc::new(InMemoryLedger::new(fixture())), Duration::from_secs(5));
    runner.run_cycle(input()).await.unwrap();

    let votes = [
        AgentVote {
            agent_id: AgentId::from("alpha"),
            direction: Direction::Long,
            confidence: 0.9,
        },
        AgentVote {
            agent_id: AgentId::from("beta"),
            direction: Direction::Short,
            confidence: 0.4,
        },
    ];
    let log = runner.decide_with_gate(&votes, &OpenGate);
    assert_eq!(log.baseline_voting_result, VotingResult::Long);

    let at = Timestamp::new_unchecked(1_000);
    for _ in 0..19 {
        assert!(matches!(
            runner.record_outcome(&log, 0.01, at),
            GuardianVerdict::InsufficientOutcomes { need: 20, .. }
        ));
    }

    let verdict = runner.record_outcome(&log, 0.01, at);
    if log.weighted_voting_result == VotingResult::Long {
        assert_eq!(verdict, GuardianVerdict::Healthy { degradation: Some(0.0) });
        assert!(!runner.safety().is_fallback_active());
    } else {
        assert!(matches!(verdict, GuardianVerdict::Triggered { .. }));
        assert!(runner.safety().is_fallback_active());
    }
}

#[tokio::test]
async fn test_missing_drift_reading_blocks_unlock() {
    let runner = runner(Arc::new(InMemoryLedger::new(ladder_fixture())), Duration::from_secs(5));
    let star = AgentId::from("star");

    let report = runner.run_cycle(ladder_input(None)).await.unwrap();
    assert!(report.transitions.is_empty());
    let snapshot = &report.deployments[&star];
    assert_eq!(snapshot.state, DeploymentState::Shadow);
    let unmet: Vec<Criterion> = snapshot.unmet_criteria.iter().map(|u| u.criterion).collect();
    assert_eq!(unmet, vec![Criterion::DriftFreeDays]);

    let report = runner.run_cycle(ladder_input(Some(10))).await.unwrap();
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(report.deployments[&star].state, DeploymentState::ReducedLive);
    assert_eq!(
        report.deployments[&AgentId::from("steady")].state,
        DeploymentState::Shadow
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_cycles_take_each_step_once() {
    let runner = Arc::new(runner(
        Arc::new(InMemoryLedger::new(ladder_fixture())),
        Duration::from_secs(5),
    ));

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run_cycle(ladder_input(Some(10))).await })
        })
        .collect();
    let mut transitions = 0;
    let mut solo_applied = 0;
    for task in tasks {
        let report = task.await.unwrap().unwrap();
        transitions += report.transitions.len();
        solo_applied += report.ingest.solo_applied;
    }

    assert_eq!(transitions, 1);
    assert_eq!(solo_applied, 320);
    let record = runner.ladder().record(&AgentId::from("star"));
    assert_eq!(record.state, DeploymentState::ReducedLive);
    assert_eq!(record.history.len(), 1);
    assert_eq!(runner.current_portfolio().unwrap().sequence, 2);
}

#[tokio::test]
async fn test_failed_compute_changes_no_governance_state() {
    let ledger = Arc::new(InMemoryLedger::new(ladder_fixture()));
    let mut config = ConcordConfig::default();
    config.ledger.page_size = 64;
    // A flat stream then has zero volatility and cannot be weighted.
    config.portfolio.volatility_floor = 0.0;
    let runner = CycleRunner::new(config, ledger.clone());
    let star = AgentId::from("star");

    let first = runner.run_cycle(ladder_input(Some(10))).await.unwrap();
    assert_eq!(first.transitions.len(), 1);
    let published = runner.current_portfolio().unwrap();
    let authorities = runner.authorities();
    let record = runner.ladder().record(&star);

    for n in 0..40 {
        ledger.push(trade(n, "flat", Direction::Long, 0, 7));
    }
    let err = runner.run_cycle(ladder_input(Some(10))).await.unwrap_err();

    assert!(matches!(err, CycleError::Portfolio(_)));
    assert!(err.is_invariant_violation());
    assert!(Arc::ptr_eq(&runner.current_portfolio().unwrap(), &published));
    assert!(Arc::ptr_eq(&runner.authorities(), &authorities));
    assert_eq!(runner.ladder().record(&star), record);
    assert!(!runner.ladder().snapshots().contains_key(&AgentId::from("flat")));
}
