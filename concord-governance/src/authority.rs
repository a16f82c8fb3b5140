//! Agent authority: solo performance against the fleet, nudged by how each
//! agent's signals relate to its peers' trades.
//!
//! A directed pair (subject, partner) is classified from the partner's
//! point of view: a predictive veto means the partner's opposing trades
//! foreshadow the subject's losses, synergy means the subject does better
//! when the partner agrees, conflict means it does worse. The resulting
//! effect is credited to the partner.

use std::collections::BTreeMap;
use std::fmt;

use concord_core::config::{
    AuthorityConfig, MAX_FALSE_VETO_RATE_CEILING, MIN_PAIR_TRADES_FLOOR, MIN_VETO_PRECISION_FLOOR,
};
use concord_core::error::InvariantViolation;
use concord_core::stats::finite_or_zero;
use concord_core::types::{AgentId, SignatureQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::repository::StatsRepository;
use crate::stats::AgentSoloStats;

/// Lowest authority an agent can carry.
pub const MIN_AUTHORITY: f64 = 0.1;

/// Highest authority an agent can carry.
pub const MAX_AUTHORITY: f64 = 2.0;

/// Floor on the fleet expectancy used to scale the relative edge.
const EXPECTANCY_SCALE_FLOOR: f64 = 1e-4;

/// Classified relationship of a directed agent pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// Partner's opposing trades reliably precede subject losses.
    #[serde(rename = "PREDICTIVE-VETO")]
    PredictiveVeto,
    /// Subject does worse when the partner agrees.
    #[serde(rename = "CONFLICT")]
    Conflict,
    /// Subject does at least as well when the partner agrees.
    #[serde(rename = "SYNERGY")]
    Synergy,
    /// Too few paired trades to say.
    #[serde(rename = "INSUFFICIENT_DATA")]
    InsufficientData,
}

impl Relationship {
    /// Returns the label as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PredictiveVeto => "PREDICTIVE-VETO",
            Self::Conflict => "CONFLICT",
            Self::Synergy => "SYNERGY",
            Self::InsufficientData => "INSUFFICIENT_DATA",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The figures relationship classification looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairEvidence {
    /// Subject trades with a partner trade in the pairing window.
    pub paired_trades: u64,
    /// Correct vetoes / vetoes.
    pub veto_precision: f64,
    /// False vetoes / subject's winning paired trades.
    pub false_veto_rate: f64,
    /// Agreement expectancy minus overall paired expectancy.
    pub synergy_edge: f64,
}

/// Classifies one directed pair.
///
/// Below the paired-trade floor the answer is always
/// [`Relationship::InsufficientData`], however good the rates look. A
/// configuration looser than the fixed veto thresholds is held to them.
#[must_use]
pub fn classify(evidence: &PairEvidence, config: &AuthorityConfig) -> Relationship {
    if evidence.paired_trades < config.min_pair_trades.max(MIN_PAIR_TRADES_FLOOR) {
        return Relationship::InsufficientData;
    }
    if evidence.veto_precision >= config.min_veto_precision.max(MIN_VETO_PRECISION_FLOOR)
        && evidence.false_veto_rate <= config.max_false_veto_rate.min(MAX_FALSE_VETO_RATE_CEILING)
    {
        return Relationship::PredictiveVeto;
    }
    if evidence.synergy_edge >= 0.0 {
        Relationship::Synergy
    } else {
        Relationship::Conflict
    }
}

/// Fleet-wide reference figures for the base multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetBaseline {
    /// Mean per-trade Sharpe of qualifying agents.
    pub sharpe: f64,
    /// Mean expectancy of qualifying agents.
    pub expectancy: f64,
    /// Number of agents that qualified.
    pub agents: usize,
}

impl FleetBaseline {
    /// Averages agents with at least `min_trades` trades; zeros when none do.
    #[must_use]
    pub fn from_stats<'a>(
        stats: impl IntoIterator<Item = &'a AgentSoloStats>,
        min_trades: u64,
    ) -> Self {
        let (mut sharpe, mut expectancy, mut agents) = (0.0, 0.0, 0usize);
        for s in stats.into_iter().filter(|s| s.trade_count >= min_trades) {
            sharpe += finite_or_zero(s.sharpe);
            expectancy += finite_or_zero(s.expectancy);
            agents += 1;
        }
        if agents == 0 {
            return Self::default();
        }
        Self {
            sharpe: sharpe / agents as f64,
            expectancy: expectancy / agents as f64,
            agents,
        }
    }
}

/// Authority of one agent, with its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityAdjustment {
    /// Agent.
    pub agent_id: AgentId,
    /// Component from solo performance.
    pub base: f64,
    /// Net effect of classified relationships.
    pub relational: f64,
    /// Clamped multiplier.
    pub value: f64,
    /// Relationship per counterpart agent.
    pub relationships: BTreeMap<AgentId, Relationship>,
}

impl AuthorityAdjustment {
    /// Neutral authority for an agent without history.
    #[must_use]
    pub fn neutral(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            base: 1.0,
            relational: 0.0,
            value: 1.0,
            relationships: BTreeMap::new(),
        }
    }
}

/// Clamps `raw` into the authority range and re-checks the result.
///
/// # Errors
///
/// Returns [`InvariantViolation::AuthorityOutOfRange`] if the clamped value
/// is still outside the range, which only happens for NaN input.
pub fn clamp_authority(agent: &AgentId, raw: f64) -> std::result::Result<f64, InvariantViolation> {
    check_authority(agent, raw.clamp(MIN_AUTHORITY, MAX_AUTHORITY))
}

/// Checks that an authority value already lies in the authority range.
///
/// # Errors
///
/// Returns [`InvariantViolation::AuthorityOutOfRange`] for a value outside
/// `[MIN_AUTHORITY, MAX_AUTHORITY]`, including NaN.
pub fn check_authority(agent: &AgentId, value: f64) -> std::result::Result<f64, InvariantViolation> {
    if (MIN_AUTHORITY..=MAX_AUTHORITY).contains(&value) {
        Ok(value)
    } else {
        error!(agent = %agent, value, "Authority outside clamp range");
        Err(InvariantViolation::AuthorityOutOfRange {
            agent: agent.to_string(),
            value,
            min: MIN_AUTHORITY,
            max: MAX_AUTHORITY,
        })
    }
}

/// Computes authority multipliers.
#[derive(Debug, Clone, Default)]
pub struct AuthorityAdjuster {
    config: AuthorityConfig,
}

impl AuthorityAdjuster {
    /// Creates an adjuster.
    #[must_use]
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    /// `1 + 0.5·tanh(Δsharpe) + 0.5·tanh(relative expectancy edge)`, or 1.0
    /// for agents below the solo-trade floor.
    #[must_use]
    pub fn base_multiplier(&self, solo: &AgentSoloStats, fleet: &FleetBaseline) -> f64 {
        if solo.trade_count < self.config.min_solo_trades {
            return 1.0;
        }
        let sharpe_gap = finite_or_zero(solo.sharpe - fleet.sharpe);
        let scale = fleet.expectancy.abs().max(EXPECTANCY_SCALE_FLOOR);
        let edge = finite_or_zero((solo.expectancy - fleet.expectancy) / scale);
        1.0 + 0.5 * sharpe_gap.tanh() + 0.5 * edge.tanh()
    }

    /// Sum of relationship effects.
    #[must_use]
    pub fn relational_effect(&self, relationships: &BTreeMap<AgentId, Relationship>) -> f64 {
        relationships
            .values()
            .map(|r| match r {
                Relationship::PredictiveVeto => self.config.veto_bonus,
                Relationship::Synergy => self.config.synergy_bonus,
                Relationship::Conflict => -self.config.conflict_penalty,
                Relationship::InsufficientData => 0.0,
            })
            .sum()
    }

    /// Combines the parts for one agent and clamps the result.
    pub fn adjust(
        &self,
        agent: &AgentId,
        solo: &AgentSoloStats,
        fleet: &FleetBaseline,
        relationships: BTreeMap<AgentId, Relationship>,
    ) -> Result<AuthorityAdjustment> {
        let base = self.base_multiplier(solo, fleet);
        let relational = self.relational_effect(&relationships);
        let value = clamp_authority(agent, base + relational)?;
        debug!(agent = %agent, base, relational, value, "Authority computed");
        Ok(AuthorityAdjustment {
            agent_id: agent.clone(),
            base,
            relational,
            value,
            relationships,
        })
    }

    /// Computes authority for every agent in `repository`.
    pub fn compute_all(
        &self,
        repository: &dyn StatsRepository,
        query: &SignatureQuery,
    ) -> Result<BTreeMap<AgentId, AuthorityAdjustment>> {
        let agents = repository.agents();
        let solo: BTreeMap<AgentId, AgentSoloStats> = agents
            .iter()
            .map(|a| (a.clone(), repository.solo(a, query)))
            .collect();
        let fleet = FleetBaseline::from_stats(solo.values(), self.config.min_solo_trades);

        let mut relationships: BTreeMap<AgentId, BTreeMap<AgentId, Relationship>> =
            BTreeMap::new();
        for subject in &agents {
            for partner in repository.partners(subject) {
                let evidence = repository.pair(subject, &partner, query).evidence();
                let relationship = classify(&evidence, &self.config);
                relationships
                    .entry(partner)
                    .or_default()
                    .insert(subject.clone(), relationship);
            }
        }

        let mut out = BTreeMap::new();
        for (agent, stats) in &solo {
            let rels = relationships.remove(agent).unwrap_or_default();
            out.insert(agent.clone(), self.adjust(agent, stats, &fleet, rels)?);
        }

        info!(
            agents = out.len(),
            fleet_sharpe = fleet.sharpe,
            fleet_expectancy = fleet.expectancy,
            "Authorities computed"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(paired_trades: u64, precision: f64, false_rate: f64) -> PairEvidence {
        PairEvidence {
            paired_trades,
            veto_precision: precision,
            false_veto_rate: false_rate,
            synergy_edge: 0.0,
        }
    }

    #[test]
    fn test_predictive_veto_classification() {
        let cfg = AuthorityConfig::default();
        assert_eq!(
            classify(&evidence(50, 0.65, 0.35), &cfg),
            Relationship::PredictiveVeto
        );
        assert_eq!(
            classify(&evidence(30, 0.65, 0.35), &cfg),
            Relationship::InsufficientData
        );
        assert_ne!(
            classify(&evidence(50, 0.65, 0.50), &cfg),
            Relationship::PredictiveVeto
        );
    }

    #[test]
    fn test_loose_config_held_to_fixed_thresholds() {
        let loose = AuthorityConfig {
            min_pair_trades: 1,
            min_veto_precision: 0.1,
            max_false_veto_rate: 0.9,
            ..AuthorityConfig::default()
        };
        assert_eq!(
            classify(&evidence(1, 0.65, 0.35), &loose),
            Relationship::InsufficientData
        );
        assert_ne!(
            classify(&evidence(50, 0.5, 0.35), &loose),
            Relationship::PredictiveVeto
        );
        assert_ne!(
            classify(&evidence(50, 0.65, 0.5), &loose),
            Relationship::PredictiveVeto
        );
    }

    #[test]
    fn test_synergy_and_conflict() {
        let cfg = AuthorityConfig::default();
        let mut e = evidence(60, 0.2, 0.9);
        e.synergy_edge = 0.001;
        assert_eq!(classify(&e, &cfg), Relationship::Synergy);
        e.synergy_edge = -0.001;
        assert_eq!(classify(&e, &cfg), Relationship::Conflict);
    }

    #[test]
    fn test_relationship_labels() {
        assert_eq!(
            serde_json::to_string(&Relationship::PredictiveVeto).unwrap(),
            "\"PREDICTIVE-VETO\""
        );
        assert_eq!(Relationship::InsufficientData.to_string(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_base_multiplier() {
        let adjuster = AuthorityAdjuster::default();
        let fleet = FleetBaseline {
            sharpe: 0.1,
            expectancy: 0.001,
            agents: 3,
        };
        let thin = AgentSoloStats {
            trade_count: 5,
            expectancy: 0.05,
            win_rate: 1.0,
            sharpe: 3.0,
        };
        assert_eq!(adjuster.base_multiplier(&thin, &fleet), 1.0);

        let average = AgentSoloStats {
            trade_count: 100,
            expectancy: 0.001,
            win_rate: 0.5,
            sharpe: 0.1,
        };
        assert!((adjuster.base_multiplier(&average, &fleet) - 1.0).abs() < 1e-12);

        let strong = AgentSoloStats {
            sharpe: 0.9,
            expectancy: 0.004,
            ..average
        };
        assert!(adjuster.base_multiplier(&strong, &fleet) > 1.5);
    }

    #[test]
    fn test_adjust_clamps() {
        let adjuster = AuthorityAdjuster::default();
        let agent = AgentId::from("alpha");
        let weak = AgentSoloStats {
            trade_count: 100,
            expectancy: -1.0,
            win_rate: 0.0,
            sharpe: -50.0,
        };
        let fleet = FleetBaseline {
            sharpe: 1.0,
            expectancy: 0.01,
            agents: 2,
        };
        let rels: BTreeMap<AgentId, Relationship> = (0..5)
            .map(|i| (AgentId::from(format!("p{i}").as_str()), Relationship::Conflict))
            .collect();
        let adj = adjuster.adjust(&agent, &weak, &fleet, rels).unwrap();
        assert_eq!(adj.value, MIN_AUTHORITY);
        assert!(adj.relational < 0.0);
    }

    #[test]
    fn test_clamp_rejects_nan() {
        let err = clamp_authority(&AgentId::from("x"), f64::NAN).unwrap_err();
        assert!(matches!(err, InvariantViolation::AuthorityOutOfRange { .. }));
        assert_eq!(clamp_authority(&AgentId::from("x"), 9.0).unwrap(), MAX_AUTHORITY);
    }

    #[test]
    fn test_check_authority_does_not_clamp() {
        let agent = AgentId::from("x");
        assert_eq!(check_authority(&agent, 1.3).unwrap(), 1.3);
        assert!(check_authority(&agent, 50.0).is_err());
        assert!(check_authority(&agent, 0.05).is_err());
        assert!(check_authority(&agent, f64::NAN).is_err());
    }

    #[test]
    fn test_fleet_baseline_skips_thin_agents() {
        let stats = [
            AgentSoloStats {
                trade_count: 30,
                expectancy: 0.002,
                win_rate: 0.5,
                sharpe: 0.4,
            },
            AgentSoloStats {
                trade_count: 2,
                expectancy: 1.0,
                win_rate: 1.0,
                sharpe: 9.0,
            },
        ];
        let fleet = FleetBaseline::from_stats(&stats, 20);
        assert_eq!(fleet.agents, 1);
        assert!((fleet.sharpe - 0.4).abs() < 1e-12);
        assert_eq!(FleetBaseline::from_stats(&stats, 1000), FleetBaseline::default());
    }
}
