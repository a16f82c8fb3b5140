//! Process-wide collaboration safety switches.
//!
//! The controller is created once and passed by reference to the voter, the
//! fallback guardian and operator tooling. Every state change is appended to
//! an audit log that is never truncated.

use concord_core::types::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Switches read by every voting decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationSafetyState {
    /// Authority weighting may be applied.
    pub weighting_enabled: bool,
    /// Agents route independently; no collaborative weighting.
    pub independent_routing_mode: bool,
    /// The fallback guardian has tripped.
    pub fallback_active: bool,
    /// When the fallback tripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_since: Option<Timestamp>,
}

impl Default for CollaborationSafetyState {
    fn default() -> Self {
        Self {
            weighting_enabled: true,
            independent_routing_mode: false,
            fallback_active: false,
            fallback_since: None,
        }
    }
}

impl CollaborationSafetyState {
    /// True when weighted outcomes may be acted on.
    #[must_use]
    pub fn weighting_effective(&self) -> bool {
        self.weighting_enabled && !self.independent_routing_mode && !self.fallback_active
    }

    /// Why weighting is suppressed, if it is.
    #[must_use]
    pub fn suppression_reason(&self) -> Option<&'static str> {
        if self.fallback_active {
            Some("fallback active")
        } else if self.independent_routing_mode {
            Some("independent routing mode")
        } else if !self.weighting_enabled {
            Some("weighting disabled")
        } else {
            None
        }
    }
}

/// Who changed the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Actor {
    /// A named human operator.
    Operator(String),
    /// The automatic fallback guardian.
    Guardian,
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SafetyAction {
    /// Weighting switched on or off.
    WeightingSet {
        /// New value.
        enabled: bool,
    },
    /// Independent routing switched on or off.
    IndependentRoutingSet {
        /// New value.
        enabled: bool,
    },
    /// Fallback tripped.
    FallbackActivated {
        /// Baseline expectancy at trigger time.
        baseline_expectancy: f64,
        /// Weighted expectancy at trigger time.
        weighted_expectancy: f64,
        /// Relative degradation that tripped it.
        degradation: f64,
    },
    /// Fallback cleared by an operator.
    FallbackCleared,
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyEvent {
    /// When it happened.
    pub at: Timestamp,
    /// Who did it.
    pub actor: Actor,
    /// What was done.
    pub action: SafetyAction,
    /// Free-form reason.
    pub reason: String,
    /// State after the change.
    pub state_after: CollaborationSafetyState,
}

#[derive(Debug, Default)]
struct SafetyInner {
    state: CollaborationSafetyState,
    history: Vec<SafetyEvent>,
    fallback_clears: u64,
}

/// Owner of [`CollaborationSafetyState`] and its audit log.
#[derive(Debug, Default)]
pub struct SafetyController {
    inner: RwLock<SafetyInner>,
}

impl SafetyController {
    /// Creates a controller with weighting on, routing collaborative and no
    /// fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CollaborationSafetyState {
        self.inner.read().state
    }

    /// True when the fallback is active.
    #[must_use]
    pub fn is_fallback_active(&self) -> bool {
        self.inner.read().state.fallback_active
    }

    /// Number of times an operator has cleared the fallback.
    ///
    /// Outcome trackers compare this to drop evidence gathered before the
    /// latest clear.
    #[must_use]
    pub fn fallback_clears(&self) -> u64 {
        self.inner.read().fallback_clears
    }

    /// Audit log, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<SafetyEvent> {
        self.inner.read().history.clone()
    }

    /// Operator toggles authority weighting.
    pub fn set_weighting_enabled(
        &self,
        enabled: bool,
        operator: &str,
        reason: &str,
        at: Timestamp,
    ) {
        self.mutate(
            Actor::Operator(operator.to_string()),
            SafetyAction::WeightingSet { enabled },
            reason,
            at,
            |s| s.weighting_enabled = enabled,
        );
        info!(enabled, operator, reason, "Collaboration weighting set");
    }

    /// Operator toggles independent routing.
    pub fn set_independent_routing(
        &self,
        enabled: bool,
        operator: &str,
        reason: &str,
        at: Timestamp,
    ) {
        self.mutate(
            Actor::Operator(operator.to_string()),
            SafetyAction::IndependentRoutingSet { enabled },
            reason,
            at,
            |s| s.independent_routing_mode = enabled,
        );
        info!(enabled, operator, reason, "Independent routing set");
    }

    /// Trips the fallback. Returns false if it was already active.
    pub fn activate_fallback(
        &self,
        baseline_expectancy: f64,
        weighted_expectancy: f64,
        degradation: f64,
        at: Timestamp,
    ) -> bool {
        let mut inner = self.inner.write();
        if inner.state.fallback_active {
            return false;
        }
        inner.state.fallback_active = true;
        inner.state.fallback_since = Some(at);
        let event = SafetyEvent {
            at,
            actor: Actor::Guardian,
            action: SafetyAction::FallbackActivated {
                baseline_expectancy,
                weighted_expectancy,
                degradation,
            },
            reason: format!("weighted expectancy degraded {:.1}%", degradation * 100.0),
            state_after: inner.state,
        };
        inner.history.push(event);
        drop(inner);

        warn!(
            baseline_expectancy,
            weighted_expectancy,
            degradation,
            "COLLABORATION FALLBACK ACTIVATED"
        );
        true
    }

    /// Operator clears an active fallback. Returns false if none was active.
    pub fn clear_fallback(&self, operator: &str, reason: &str, at: Timestamp) -> bool {
        let mut inner = self.inner.write();
        if !inner.state.fallback_active {
            return false;
        }
        inner.state.fallback_active = false;
        inner.state.fallback_since = None;
        inner.fallback_clears += 1;
        let event = SafetyEvent {
            at,
            actor: Actor::Operator(operator.to_string()),
            action: SafetyAction::FallbackCleared,
            reason: reason.to_string(),
            state_after: inner.state,
        };
        inner.history.push(event);
        drop(inner);

        info!(operator, reason, "Collaboration fallback cleared");
        true
    }

    fn mutate(
        &self,
        actor: Actor,
        action: SafetyAction,
        reason: &str,
        at: Timestamp,
        apply: impl FnOnce(&mut CollaborationSafetyState),
    ) {
        let mut inner = self.inner.write();
        apply(&mut inner.state);
        let event = SafetyEvent {
            at,
            actor,
            action,
            reason: reason.to_string(),
            state_after: inner.state,
        };
        inner.history.push(event);
    }
}
