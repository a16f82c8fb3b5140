//! Fallback guardian: turns collaboration weighting off when it makes
//! things worse.
//!
//! The guardian only ever activates the fallback. Clearing it is an operator
//! action on [`SafetyController`].

use std::collections::VecDeque;

use concord_core::config::FallbackConfig;
use concord_core::stats::mean;
use concord_core::types::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::safety::SafetyController;
use crate::voter::DecisionLog;

/// Relative degradation of weighted against baseline expectancy.
///
/// `None` when the baseline is not positive or either input is non-finite,
/// in which case the fallback can never trigger.
#[must_use]
pub fn degradation(baseline_expectancy: f64, weighted_expectancy: f64) -> Option<f64> {
    if !baseline_expectancy.is_finite() || !weighted_expectancy.is_finite() {
        return None;
    }
    if baseline_expectancy <= 0.0 {
        return None;
    }
    Some((baseline_expectancy - weighted_expectancy) / baseline_expectancy)
}

/// True when the degradation reaches `threshold`.
#[must_use]
pub fn should_trigger(baseline_expectancy: f64, weighted_expectancy: f64, threshold: f64) -> bool {
    degradation(baseline_expectancy, weighted_expectancy).is_some_and(|d| d >= threshold)
}

/// Realized returns the two voting results would have earned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    /// Return of the baseline result.
    pub baseline_return: f64,
    /// Return of the weighted result.
    pub weighted_return: f64,
}

impl DecisionOutcome {
    /// Scores a decision against the realized move of the long side.
    #[must_use]
    pub fn from_decision(log: &DecisionLog, long_return: f64) -> Self {
        Self {
            baseline_return: log.baseline_voting_result.sign() * long_return,
            weighted_return: log.weighted_voting_result.sign() * long_return,
        }
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    outcomes: VecDeque<DecisionOutcome>,
    clears_seen: u64,
}

/// Rolling window of decision outcomes.
///
/// Only outcomes gathered since the latest operator clear of the fallback
/// count; [`Self::sync`] drops anything older.
#[derive(Debug)]
pub struct OutcomeTracker {
    window: usize,
    state: RwLock<TrackerState>,
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        Self::with_window(FallbackConfig::default().outcome_window)
    }
}

impl OutcomeTracker {
    /// Creates an empty tracker with the default window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tracker keeping at most `window` outcomes.
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            state: RwLock::new(TrackerState::default()),
        }
    }

    /// Records one outcome; non-finite returns are dropped. The oldest
    /// outcome rolls off once the window is full.
    pub fn record(&self, outcome: DecisionOutcome) {
        if !(outcome.baseline_return.is_finite() && outcome.weighted_return.is_finite()) {
            return;
        }
        let mut state = self.state.write();
        if state.outcomes.len() == self.window {
            state.outcomes.pop_front();
        }
        state.outcomes.push_back(outcome);
    }

    /// Drops every outcome if the fallback has been cleared since the last
    /// sync. Returns true when outcomes were dropped.
    pub fn sync(&self, fallback_clears: u64) -> bool {
        let mut state = self.state.write();
        if state.clears_seen == fallback_clears {
            return false;
        }
        state.clears_seen = fallback_clears;
        let dropped = !state.outcomes.is_empty();
        state.outcomes.clear();
        dropped
    }

    /// Number of outcomes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().outcomes.len()
    }

    /// True when nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().outcomes.is_empty()
    }

    /// Mean baseline and weighted return.
    #[must_use]
    pub fn expectancies(&self) -> (f64, f64) {
        let state = self.state.read();
        let baseline: Vec<f64> = state.outcomes.iter().map(|o| o.baseline_return).collect();
        let weighted: Vec<f64> = state.outcomes.iter().map(|o| o.weighted_return).collect();
        (mean(&baseline), mean(&weighted))
    }
}

/// Result of one guardian evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GuardianVerdict {
    /// Not enough outcomes yet.
    InsufficientOutcomes {
        /// Outcomes recorded.
        have: usize,
        /// Outcomes required.
        need: usize,
    },
    /// Fallback already active; nothing evaluated.
    AlreadyActive,
    /// Weighting is within tolerance.
    Healthy {
        /// Relative degradation, if defined.
        degradation: Option<f64>,
    },
    /// Fallback was activated by this evaluation.
    Triggered {
        /// Relative degradation that tripped it.
        degradation: f64,
    },
}

/// Watches weighted against baseline expectancy.
#[derive(Debug, Clone, Default)]
pub struct FallbackGuardian {
    config: FallbackConfig,
}

impl FallbackGuardian {
    /// Creates a guardian.
    #[must_use]
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Compares the two expectancies and trips the fallback if warranted.
    pub fn evaluate(
        &self,
        safety: &SafetyController,
        baseline_expectancy: f64,
        weighted_expectancy: f64,
        at: Timestamp,
    ) -> GuardianVerdict {
        if safety.is_fallback_active() {
            return GuardianVerdict::AlreadyActive;
        }
        let degraded = degradation(baseline_expectancy, weighted_expectancy);
        match degraded {
            Some(d) if d >= self.config.degradation_threshold => {
                if safety.activate_fallback(baseline_expectancy, weighted_expectancy, d, at) {
                    GuardianVerdict::Triggered { degradation: d }
                } else {
                    GuardianVerdict::AlreadyActive
                }
            }
            _ => {
                debug!(
                    baseline_expectancy,
                    weighted_expectancy,
                    degradation = ?degraded,
                    "Collaboration weighting within tolerance"
                );
                GuardianVerdict::Healthy {
                    degradation: degraded,
                }
            }
        }
    }

    /// Records one outcome, then evaluates.
    ///
    /// Outcomes gathered before the latest operator clear are dropped first,
    /// so a cleared fallback is judged on fresh evidence only.
    pub fn record(
        &self,
        tracker: &OutcomeTracker,
        safety: &SafetyController,
        outcome: DecisionOutcome,
        at: Timestamp,
    ) -> GuardianVerdict {
        self.sync(tracker, safety);
        tracker.record(outcome);
        self.observe(tracker, safety, at)
    }

    /// Evaluates the tracker's expectancies once it holds enough outcomes.
    pub fn observe(
        &self,
        tracker: &OutcomeTracker,
        safety: &SafetyController,
        at: Timestamp,
    ) -> GuardianVerdict {
        self.sync(tracker, safety);
        let have = tracker.len();
        if have < self.config.min_outcomes {
            return GuardianVerdict::InsufficientOutcomes {
                have,
                need: self.config.min_outcomes,
            };
        }
        let (baseline, weighted) = tracker.expectancies();
        self.evaluate(safety, baseline, weighted, at)
    }

    fn sync(&self, tracker: &OutcomeTracker, safety: &SafetyController) {
        if tracker.sync(safety.fallback_clears()) {
            info!("Fallback cleared; outcome history restarted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_thresholds() {
        assert!(should_trigger(1.1, 0.8, 0.20));
        assert!(!should_trigger(1.1, 0.95, 0.20));
        assert!(!should_trigger(0.0, -5.0, 0.20));
        assert!(!should_trigger(-1.0, -5.0, 0.20));
        assert!(!should_trigger(f64::NAN, 0.0, 0.20));
    }

    #[test]
    fn test_evaluate_trips_once_and_never_clears() {
        let guardian = FallbackGuardian::default();
        let safety = SafetyController::new();
        let at = Timestamp::new_unchecked(10);

        assert!(matches!(
            guardian.evaluate(&safety, 1.1, 0.95, at),
            GuardianVerdict::Healthy { .. }
        ));
        assert!(matches!(
            guardian.evaluate(&safety, 1.1, 0.8, at),
            GuardianVerdict::Triggered { .. }
        ));
        // Recovery does not clear it.
        assert_eq!(
            guardian.evaluate(&safety, 1.1, 1.5, at),
            GuardianVerdict::AlreadyActive
        );
        assert!(safety.is_fallback_active());
    }

    #[test]
    fn test_observe_waits_for_min_outcomes() {
        let guardian = FallbackGuardian::default();
        let safety = SafetyController::new();
        let tracker = OutcomeTracker::new();
        let at = Timestamp::new_unchecked(1);

        for _ in 0..19 {
            tracker.record(DecisionOutcome {
                baseline_return: 0.01,
                weighted_return: -0.01,
            });
        }
        assert_eq!(
            guardian.observe(&tracker, &safety, at),
            GuardianVerdict::InsufficientOutcomes { have: 19, need: 20 }
        );

        tracker.record(DecisionOutcome {
            baseline_return: 0.01,
            weighted_return: -0.01,
        });
        assert!(matches!(
            guardian.observe(&tracker, &safety, at),
            GuardianVerdict::Triggered { .. }
        ));
    }

    fn losing() -> DecisionOutcome {
        DecisionOutcome {
            baseline_return: 0.01,
            weighted_return: -0.01,
        }
    }

    #[test]
    fn test_clear_restarts_evidence() {
        let guardian = FallbackGuardian::default();
        let safety = SafetyController::new();
        let tracker = OutcomeTracker::new();
        let at = Timestamp::new_unchecked(1);

        let mut verdict = GuardianVerdict::AlreadyActive;
        for _ in 0..20 {
            verdict = guardian.record(&tracker, &safety, losing(), at);
        }
        assert!(matches!(verdict, GuardianVerdict::Triggered { .. }));

        assert!(safety.clear_fallback("ops", "reviewed", Timestamp::new_unchecked(2)));
        let favorable = DecisionOutcome {
            baseline_return: 0.01,
            weighted_return: 0.02,
        };
        assert_eq!(
            guardian.record(&tracker, &safety, favorable, at),
            GuardianVerdict::InsufficientOutcomes { have: 1, need: 20 }
        );
        assert!(!safety.is_fallback_active());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_tracker_window_rolls() {
        let tracker = OutcomeTracker::with_window(3);
        for _ in 0..5 {
            tracker.record(losing());
        }
        tracker.record(DecisionOutcome {
            baseline_return: 0.04,
            weighted_return: 0.04,
        });
        assert_eq!(tracker.len(), 3);
        let (baseline, weighted) = tracker.expectancies();
        assert!((baseline - 0.02).abs() < 1e-12);
        assert!((weighted - (0.02 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_tracker_drops_non_finite() {
        let tracker = OutcomeTracker::new();
        tracker.record(DecisionOutcome {
            baseline_return: f64::INFINITY,
            weighted_return: 0.0,
        });
        assert!(tracker.is_empty());
    }
}
