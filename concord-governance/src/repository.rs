//! Storage seams for durable governance state.
//!
//! The in-memory implementations are what the engine and the CLI use; a
//! persistent backend implements the same traits.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::types::{AgentId, SignatureQuery};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::deployment::DeploymentRecord;
use crate::stats::{
    AgentPairStats, AgentSoloStats, IngestReport, PairAccumulator, PairKey, RunningStats, SoloKey,
    StatsBatch,
};

/// Solo and pair statistics store.
pub trait StatsRepository: Send + Sync {
    /// Applies every observation not seen before, as one atomic update.
    fn apply(&self, batch: &StatsBatch) -> IngestReport;

    /// Aggregated solo stats of `agent` over signatures matching `query`.
    fn solo(&self, agent: &AgentId, query: &SignatureQuery) -> AgentSoloStats;

    /// Aggregated pair stats of `subject` against `partner`.
    fn pair(&self, subject: &AgentId, partner: &AgentId, query: &SignatureQuery)
    -> AgentPairStats;

    /// Every agent with solo stats, sorted.
    fn agents(&self) -> Vec<AgentId>;

    /// Every partner recorded against `subject`, sorted.
    fn partners(&self, subject: &AgentId) -> Vec<AgentId>;
}

#[derive(Debug, Clone, Default)]
struct StatsTables {
    solo: BTreeMap<SoloKey, RunningStats>,
    pairs: BTreeMap<PairKey, PairAccumulator>,
    seen_solo: BTreeSet<String>,
    seen_pairs: BTreeSet<(String, AgentId)>,
}

/// [`StatsRepository`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    tables: RwLock<StatsTables>,
}

impl InMemoryStatsRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of solo keys stored.
    #[must_use]
    pub fn solo_key_count(&self) -> usize {
        self.tables.read().solo.len()
    }

    /// Number of pair keys stored.
    #[must_use]
    pub fn pair_key_count(&self) -> usize {
        self.tables.read().pairs.len()
    }

    /// Independent copy of the current tables.
    ///
    /// Writes to the fork stay invisible here until [`Self::commit`].
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            tables: RwLock::new(self.tables.read().clone()),
        }
    }

    /// Replaces the tables with those of a fork.
    ///
    /// Callers serialize fork and commit; a commit discards anything applied
    /// here after the fork was taken.
    pub fn commit(&self, staged: Self) {
        *self.tables.write() = staged.tables.into_inner();
    }
}

impl StatsRepository for InMemoryStatsRepository {
    fn apply(&self, batch: &StatsBatch) -> IngestReport {
        let mut report = IngestReport::default();
        let mut tables = self.tables.write();

        for obs in &batch.solo {
            if tables.seen_solo.insert(obs.trade_id.clone()) {
                tables
                    .solo
                    .entry(obs.key.clone())
                    .or_default()
                    .record(obs.subject_return);
                report.solo_applied += 1;
            } else {
                report.solo_skipped += 1;
            }
        }

        for obs in &batch.pairs {
            let marker = (obs.trade_id.clone(), obs.key.partner.clone());
            if tables.seen_pairs.insert(marker) {
                tables.pairs.entry(obs.key.clone()).or_default().record(obs);
                report.pair_applied += 1;
            } else {
                report.pair_skipped += 1;
            }
        }
        drop(tables);

        debug!(
            solo_applied = report.solo_applied,
            solo_skipped = report.solo_skipped,
            pair_applied = report.pair_applied,
            pair_skipped = report.pair_skipped,
            "Applied statistics batch"
        );
        report
    }

    fn solo(&self, agent: &AgentId, query: &SignatureQuery) -> AgentSoloStats {
        let tables = self.tables.read();
        let mut total = RunningStats::default();
        for (key, stats) in &tables.solo {
            if key.agent == *agent && query.matches(&key.signature) {
                total.merge(stats);
            }
        }
        AgentSoloStats::from(&total)
    }

    fn pair(
        &self,
        subject: &AgentId,
        partner: &AgentId,
        query: &SignatureQuery,
    ) -> AgentPairStats {
        let tables = self.tables.read();
        let mut total = PairAccumulator::default();
        for (key, acc) in &tables.pairs {
            if key.subject == *subject && key.partner == *partner && query.matches(&key.signature)
            {
                total.merge(acc);
            }
        }
        AgentPairStats::from(&total)
    }

    fn agents(&self) -> Vec<AgentId> {
        let tables = self.tables.read();
        let agents: BTreeSet<&AgentId> = tables.solo.keys().map(|k| &k.agent).collect();
        agents.into_iter().cloned().collect()
    }

    fn partners(&self, subject: &AgentId) -> Vec<AgentId> {
        let tables = self.tables.read();
        let partners: BTreeSet<&AgentId> = tables
            .pairs
            .keys()
            .filter(|k| k.subject == *subject)
            .map(|k| &k.partner)
            .collect();
        partners.into_iter().cloned().collect()
    }
}

/// Per-agent deployment record store.
pub trait DeploymentRepository: Send + Sync {
    /// Returns a copy of the record, if one exists.
    fn get(&self, agent: &AgentId) -> Option<DeploymentRecord>;

    /// Runs `update` on the agent's record under its entry lock, creating a
    /// shadow record first if none exists.
    fn update(&self, agent: &AgentId, update: &mut dyn FnMut(&mut DeploymentRecord));

    /// Every agent with a record, sorted.
    fn agents(&self) -> Vec<AgentId>;
}

/// [`DeploymentRepository`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryDeploymentRepository {
    records: DashMap<AgentId, DeploymentRecord>,
}

impl InMemoryDeploymentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeploymentRepository for InMemoryDeploymentRepository {
    fn get(&self, agent: &AgentId) -> Option<DeploymentRecord> {
        self.records.get(agent).map(|r| r.value().clone())
    }

    fn update(&self, agent: &AgentId, update: &mut dyn FnMut(&mut DeploymentRecord)) {
        let mut entry = self
            .records
            .entry(agent.clone())
            .or_insert_with(|| DeploymentRecord::new(agent.clone()));
        update(entry.value_mut());
    }

    fn agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = self.records.iter().map(|r| r.key().clone()).collect();
        agents.sort();
        agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{PairObservation, SoloObservation};
    use concord_core::types::{Direction, EnvironmentSignature, Instrument, Regime};

    fn signature(regime: Regime) -> EnvironmentSignature {
        EnvironmentSignature::new(
            "london",
            regime,
            Instrument::new("EUR_USD").unwrap(),
            Direction::Long,
        )
    }

    fn batch() -> StatsBatch {
        let solo = |id: &str, regime, ret| SoloObservation {
            trade_id: id.to_string(),
            key: SoloKey {
                agent: AgentId::from("alpha"),
                signature: signature(regime),
            },
            subject_return: ret,
        };
        StatsBatch {
            solo: vec![
                solo("t1", Regime::Trend, 0.02),
                solo("t2", Regime::Range, -0.01),
            ],
            pairs: vec![PairObservation {
                trade_id: "t1".to_string(),
                key: PairKey {
                    subject: AgentId::from("alpha"),
                    partner: AgentId::from("beta"),
                    signature: signature(Regime::Trend),
                },
                subject_return: 0.02,
                veto: false,
            }],
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let repo = InMemoryStatsRepository::new();
        let first = repo.apply(&batch());
        assert_eq!(first.solo_applied, 2);
        assert_eq!(first.pair_applied, 1);

        let second = repo.apply(&batch());
        assert_eq!(second.solo_applied, 0);
        assert_eq!(second.solo_skipped, 2);
        assert_eq!(second.pair_skipped, 1);

        let alpha = AgentId::from("alpha");
        assert_eq!(repo.solo(&alpha, &SignatureQuery::any()).trade_count, 2);
    }

    #[test]
    fn test_query_filters_signatures() {
        let repo = InMemoryStatsRepository::new();
        repo.apply(&batch());
        let alpha = AgentId::from("alpha");
        let trend = repo.solo(&alpha, &SignatureQuery::any().with_regime(Regime::Trend));
        assert_eq!(trend.trade_count, 1);
        assert!((trend.expectancy - 0.02).abs() < 1e-12);

        assert_eq!(repo.agents(), vec![alpha.clone()]);
        assert_eq!(repo.partners(&alpha), vec![AgentId::from("beta")]);
        assert_eq!(
            repo.pair(&alpha, &AgentId::from("beta"), &SignatureQuery::any())
                .paired_trades,
            1
        );
        assert_eq!(repo.solo_key_count(), 2);
        assert_eq!(repo.pair_key_count(), 1);
    }

    #[test]
    fn test_fork_stays_isolated_until_commit() {
        let repo = InMemoryStatsRepository::new();
        let staged = repo.fork();
        staged.apply(&batch());
        assert_eq!(staged.solo_key_count(), 2);
        assert_eq!(repo.solo_key_count(), 0);

        // Dropping the fork leaves the repository as it was.
        drop(staged);
        assert!(repo.agents().is_empty());

        let staged = repo.fork();
        staged.apply(&batch());
        repo.commit(staged);
        assert_eq!(repo.solo_key_count(), 2);
        assert_eq!(repo.apply(&batch()).solo_skipped, 2);
    }

    #[test]
    fn test_deployment_update_creates_shadow() {
        let repo = InMemoryDeploymentRepository::new();
        let agent = AgentId::from("gamma");
        assert!(repo.get(&agent).is_none());

        let mut seen = None;
        repo.update(&agent, &mut |record| seen = Some(record.state));
        assert_eq!(seen, Some(crate::deployment::DeploymentState::Shadow));
        assert_eq!(repo.agents(), vec![agent]);
    }
}
