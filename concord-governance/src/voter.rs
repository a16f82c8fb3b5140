//! Collaboration voting.
//!
//! Every decision is computed twice, once with each agent at authority 1.0
//! and once weighted by authority, and both results are logged. The weighted
//! result is acted on only while the safety state allows it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use concord_core::config::VoterConfig;
use concord_core::types::{AgentId, Direction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::authority::{AuthorityAdjustment, check_authority};
use crate::safety::CollaborationSafetyState;

/// Decides which agents may take part in executed decisions.
pub trait ExecutionGate {
    /// True if `agent` may influence execution.
    fn can_execute(&self, agent: &AgentId) -> bool;
}

/// Gate that lets every agent through.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl ExecutionGate for OpenGate {
    fn can_execute(&self, _agent: &AgentId) -> bool {
        true
    }
}

/// One agent's vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVote {
    /// Voting agent.
    pub agent_id: AgentId,
    /// Side voted for.
    pub direction: Direction,
    /// Confidence, clamped to [0, 1] when counted.
    pub confidence: f64,
}

/// Result of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingResult {
    /// Long side won.
    Long,
    /// Short side won.
    Short,
    /// Tie or no participants.
    Abstain,
}

impl VotingResult {
    /// Signed exposure: +1 long, -1 short, 0 abstain.
    #[must_use]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
            Self::Abstain => 0.0,
        }
    }

    fn from_totals(totals: &SideTotals) -> Self {
        if totals.long > totals.short {
            Self::Long
        } else if totals.short > totals.long {
            Self::Short
        } else {
            Self::Abstain
        }
    }
}

impl fmt::Display for VotingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Abstain => "abstain",
        })
    }
}

/// Summed support per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideTotals {
    /// Long support.
    pub long: f64,
    /// Short support.
    pub short: f64,
}

impl SideTotals {
    fn add(&mut self, direction: Direction, amount: f64) {
        match direction {
            Direction::Long => self.long += amount,
            Direction::Short => self.short += amount,
        }
    }
}

/// One agent's share of the weighted vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationFactor {
    /// Agent.
    pub agent_id: AgentId,
    /// Side it supported.
    pub direction: Direction,
    /// Counted confidence.
    pub confidence: f64,
    /// Authority applied.
    pub authority: f64,
    /// Signed contribution (`confidence × authority × side`).
    pub contribution: f64,
}

/// Full record of one collaboration decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionLog {
    /// Agents whose votes were counted, in input order.
    pub participating_agents: Vec<AgentId>,
    /// Agents left out because they cannot execute.
    pub excluded_agents: Vec<AgentId>,
    /// Result with every agent at authority 1.0.
    pub baseline_voting_result: VotingResult,
    /// Result with authority weighting.
    pub weighted_voting_result: VotingResult,
    /// Result acted on.
    pub final_result: VotingResult,
    /// Baseline and weighted results differ.
    pub outcome_changed: bool,
    /// The weighted result was the one acted on.
    pub weighting_applied: bool,
    /// Human-readable justification.
    pub final_decision_reason: String,
    /// Largest weighted contributors.
    pub top_collaboration_factors: Vec<CollaborationFactor>,
    /// Baseline side totals.
    pub baseline_totals: SideTotals,
    /// Weighted side totals.
    pub weighted_totals: SideTotals,
}

/// Runs baseline and weighted votes.
#[derive(Debug, Clone, Default)]
pub struct CollaborationVoter {
    config: VoterConfig,
}

impl CollaborationVoter {
    /// Creates a voter.
    #[must_use]
    pub fn new(config: VoterConfig) -> Self {
        Self { config }
    }

    /// Decides one vote.
    ///
    /// Agents the gate refuses are excluded from both tallies, as are agents
    /// whose stored authority lies outside the authority range. Agents
    /// without an authority entry count at 1.0. A repeated agent id counts
    /// once, first vote wins.
    #[must_use]
    pub fn decide(
        &self,
        votes: &[AgentVote],
        authorities: &BTreeMap<AgentId, AuthorityAdjustment>,
        safety: &CollaborationSafetyState,
        gate: &dyn ExecutionGate,
    ) -> DecisionLog {
        let mut seen = BTreeSet::new();
        let mut participating = Vec::new();
        let mut excluded = Vec::new();
        let mut baseline = SideTotals::default();
        let mut weighted = SideTotals::default();
        let mut factors = Vec::new();

        for vote in votes {
            if !seen.insert(&vote.agent_id) {
                warn!(agent = %vote.agent_id, "Duplicate vote ignored");
                continue;
            }
            if !gate.can_execute(&vote.agent_id) {
                debug!(agent = %vote.agent_id, "Vote excluded: agent cannot execute");
                excluded.push(vote.agent_id.clone());
                continue;
            }
            let confidence = if vote.confidence.is_finite() {
                vote.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            let authority = match authorities.get(&vote.agent_id) {
                None => 1.0,
                Some(adjustment) => match check_authority(&vote.agent_id, adjustment.value) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            agent = %vote.agent_id,
                            error = %e,
                            "Vote excluded: authority out of range"
                        );
                        excluded.push(vote.agent_id.clone());
                        continue;
                    }
                },
            };
            let contribution = confidence * authority;

            baseline.add(vote.direction, confidence);
            weighted.add(vote.direction, contribution);
            participating.push(vote.agent_id.clone());
            factors.push(CollaborationFactor {
                agent_id: vote.agent_id.clone(),
                direction: vote.direction,
                confidence,
                authority,
                contribution: contribution * vote.direction.sign(),
            });
        }

        factors.sort_by(|a, b| {
            b.contribution
                .abs()
                .total_cmp(&a.contribution.abs())
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        factors.truncate(self.config.top_factors);

        let baseline_result = VotingResult::from_totals(&baseline);
        let weighted_result = VotingResult::from_totals(&weighted);
        let outcome_changed = baseline_result != weighted_result;
        let suppression = safety.suppression_reason();
        let weighting_applied = suppression.is_none();
        let final_result = if weighting_applied {
            weighted_result
        } else {
            baseline_result
        };

        let final_decision_reason = match suppression {
            Some(why) => format!(
                "{why}: using baseline {baseline_result} (weighted would be {weighted_result})"
            ),
            None if participating.is_empty() => "no eligible votes: abstain".to_string(),
            None if outcome_changed => format!(
                "authority weighting changed {baseline_result} to {weighted_result}"
            ),
            None => format!("baseline and weighted agree on {weighted_result}"),
        };

        info!(
            participants = participating.len(),
            excluded = excluded.len(),
            baseline = %baseline_result,
            weighted = %weighted_result,
            final_result = %final_result,
            weighting_applied,
            "Collaboration decision"
        );

        DecisionLog {
            participating_agents: participating,
            excluded_agents: excluded,
            baseline_voting_result: baseline_result,
            weighted_voting_result: weighted_result,
            final_result,
            outcome_changed,
            weighting_applied,
            final_decision_reason,
            top_collaboration_factors: factors,
            baseline_totals: baseline,
            weighted_totals: weighted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(agent: &str, direction: Direction, confidence: f64) -> AgentVote {
        AgentVote {
            agent_id: AgentId::from(agent),
            direction,
            confidence,
        }
    }

    fn authorities(entries: &[(&str, f64)]) -> BTreeMap<AgentId, AuthorityAdjustment> {
        entries
            .iter()
            .map(|(id, value)| {
                let mut adj = AuthorityAdjustment::neutral(AgentId::from(*id));
                adj.value = *value;
                (AgentId::from(*id), adj)
            })
            .collect()
    }

    struct Deny(&'static str);

    impl ExecutionGate for Deny {
        fn can_execute(&self, agent: &AgentId) -> bool {
            agent.as_str() != self.0
        }
    }

    fn contested() -> Vec<AgentVote> {
        vec![
            vote("a", Direction::Long, 0.6),
            vote("b", Direction::Long, 0.5),
            vote("c", Direction::Short, 0.8),
        ]
    }

    #[test]
    fn test_weighting_flips_outcome() {
        let auth = authorities(&[("a", 0.5), ("b", 0.5), ("c", 2.0)]);
        let log = CollaborationVoter::default().decide(
            &contested(),
            &auth,
            &CollaborationSafetyState::default(),
            &OpenGate,
        );
        assert_eq!(log.baseline_voting_result, VotingResult::Long);
        assert_eq!(log.weighted_voting_result, VotingResult::Short);
        assert_eq!(log.final_result, VotingResult::Short);
        assert!(log.outcome_changed);
        assert!(log.weighting_applied);
        assert_eq!(log.top_collaboration_factors[0].agent_id, AgentId::from("c"));
    }

    #[test]
    fn test_disabled_weighting_uses_baseline() {
        let auth = authorities(&[("a", 0.5), ("b", 0.5), ("c", 2.0)]);
        let safety = CollaborationSafetyState {
            weighting_enabled: false,
            ..CollaborationSafetyState::default()
        };
        let log = CollaborationVoter::default().decide(&contested(), &auth, &safety, &OpenGate);
        assert_eq!(log.final_result, VotingResult::Long);
        assert!(!log.weighting_applied);
        assert!(log.outcome_changed);
        assert!(log.final_decision_reason.starts_with("weighting disabled"));
    }

    #[test]
    fn test_fallback_uses_baseline() {
        let auth = authorities(&[("c", 2.0)]);
        let safety = CollaborationSafetyState {
            fallback_active: true,
            ..CollaborationSafetyState::default()
        };
        let log = CollaborationVoter::default().decide(&contested(), &auth, &safety, &OpenGate);
        assert_eq!(log.final_result, log.baseline_voting_result);
    }

    #[test]
    fn test_tie_abstains_and_gate_excludes() {
        let votes = vec![
            vote("a", Direction::Long, 0.5),
            vote("b", Direction::Short, 0.5),
            vote("shadow", Direction::Long, 1.0),
        ];
        let log = CollaborationVoter::default().decide(
            &votes,
            &BTreeMap::new(),
            &CollaborationSafetyState::default(),
            &Deny("shadow"),
        );
        assert_eq!(log.baseline_voting_result, VotingResult::Abstain);
        assert_eq!(log.excluded_agents, vec![AgentId::from("shadow")]);
        assert_eq!(log.participating_agents.len(), 2);
    }

    #[test]
    fn test_confidence_clamped_and_factor_ties_by_id() {
        let votes = vec![
            vote("z", Direction::Long, 3.0),
            vote("y", Direction::Short, 1.0),
            vote("x", Direction::Long, -1.0),
            vote("w", Direction::Long, 0.2),
        ];
        let log = CollaborationVoter::default().decide(
            &votes,
            &BTreeMap::new(),
            &CollaborationSafetyState::default(),
            &OpenGate,
        );
        assert!((log.baseline_totals.long - 1.2).abs() < 1e-12);
        assert_eq!(log.baseline_voting_result, VotingResult::Long);
        let ids: Vec<&str> = log
            .top_collaboration_factors
            .iter()
            .map(|f| f.agent_id.as_str())
            .collect();
        assert_eq!(ids, vec!["y", "z", "w"]);
    }

    #[test]
    fn test_out_of_range_authority_is_excluded() {
        let votes = vec![
            vote("loud", Direction::Long, 0.1),
            vote("broken", Direction::Long, 0.5),
            vote("quiet", Direction::Short, 1.0),
        ];
        let auth = authorities(&[("loud", 50.0), ("broken", f64::NAN), ("quiet", 1.0)]);
        let log = CollaborationVoter::default().decide(
            &votes,
            &auth,
            &CollaborationSafetyState::default(),
            &OpenGate,
        );
        assert_eq!(
            log.excluded_agents,
            vec![AgentId::from("loud"), AgentId::from("broken")]
        );
        assert_eq!(log.participating_agents, vec![AgentId::from("quiet")]);
        assert!(log.weighted_totals.long.abs() < 1e-12);
        assert!(log.weighted_totals.short.is_finite());
        assert_eq!(log.weighted_voting_result, VotingResult::Short);
    }

    #[test]
    fn test_empty_vote_abstains() {
        let log = CollaborationVoter::default().decide(
            &[],
            &BTreeMap::new(),
            &CollaborationSafetyState::default(),
            &OpenGate,
        );
        assert_eq!(log.final_result, VotingResult::Abstain);
        assert!(!log.outcome_changed);

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["baselineVotingResult"], "abstain");
        assert!(json["participatingAgents"].as_array().unwrap().is_empty());
        assert!(json["topCollaborationFactors"].is_array());
    }
}
