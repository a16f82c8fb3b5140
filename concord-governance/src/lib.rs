//! # Concord Governance
//!
//! Agent governance for Concord.
//!
//! This crate provides:
//! - Durable solo and pair statistics keyed by environment signature
//! - Authority multipliers from solo performance and pair relationships
//! - Collaboration voting with a baseline and an authority-weighted tally
//! - Process-wide safety switches with an audit log
//! - A fallback guardian that disables weighting when it underperforms
//! - The shadow → reduced-live → live deployment ladder
//!
//! Authority is always within [`MIN_AUTHORITY`, `MAX_AUTHORITY`]. A disabled
//! agent never executes, whatever its metrics or retune requests say.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod authority;
pub mod deployment;
pub mod error;
pub mod fallback;
pub mod repository;
pub mod safety;
pub mod stats;
pub mod voter;

pub use authority::{
    AuthorityAdjuster, AuthorityAdjustment, FleetBaseline, MAX_AUTHORITY, MIN_AUTHORITY,
    PairEvidence, Relationship, check_authority, clamp_authority, classify,
};
pub use deployment::{
    BaselineFigures, Criterion, DeploymentLadder, DeploymentMetrics, DeploymentRecord,
    DeploymentSnapshot, DeploymentState, REDUCED_LIVE_MULTIPLIER, RetuneProposal, Transition,
    TransitionTrigger, UnlockCheck, UnmetCriterion, unmet_criteria,
};
pub use error::GovernanceError;
pub use fallback::{
    DecisionOutcome, FallbackGuardian, GuardianVerdict, OutcomeTracker, degradation,
    should_trigger,
};
pub use repository::{
    DeploymentRepository, InMemoryDeploymentRepository, InMemoryStatsRepository, StatsRepository,
};
pub use safety::{Actor, CollaborationSafetyState, SafetyAction, SafetyController, SafetyEvent};
pub use stats::{
    AgentPairStats, AgentSoloStats, IngestReport, PairKey, SoloKey, StatsBatch, ingest,
};
pub use voter::{
    AgentVote, CollaborationFactor, CollaborationVoter, DecisionLog, ExecutionGate, OpenGate,
    VotingResult,
};
