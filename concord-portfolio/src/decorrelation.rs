//! Greedy decorrelation filter.
//!
//! Candidates are ranked by Sharpe (descending) with a stable sort, so equal
//! Sharpe ratios keep their input order. Each candidate is accepted only if
//! its |correlation| with every already-accepted member is within the
//! ceiling. This is a single deterministic pass, not an optimal subset
//! search.

use concord_core::types::StrategyId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::CorrelationMatrix;
use crate::stream::StrategyStream;

/// Why a candidate was left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// First accepted member that exceeded the ceiling.
    pub correlated_with: StrategyId,
    /// Their correlation coefficient.
    pub coefficient: f64,
}

/// Outcome of the filter, as indices into the input slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Accepted candidates, in acceptance (ranking) order.
    pub accepted: Vec<usize>,
    /// Rejected candidates with their reasons, in ranking order.
    pub rejected: Vec<(usize, Rejection)>,
}

impl Selection {
    /// Returns the rejection for input index `index`, if any.
    #[must_use]
    pub fn rejection(&self, index: usize) -> Option<&Rejection> {
        self.rejected
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, r)| r)
    }
}

/// Runs the greedy filter.
#[must_use]
pub fn select(streams: &[StrategyStream], matrix: &CorrelationMatrix, ceiling: f64) -> Selection {
    let mut order: Vec<usize> = (0..streams.len()).collect();
    order.sort_by(|&a, &b| streams[b].sharpe().total_cmp(&streams[a].sharpe()));

    let mut selection = Selection::default();
    for idx in order {
        let candidate = &streams[idx];
        let conflict = selection.accepted.iter().find_map(|&kept| {
            let coefficient = matrix.get(candidate.id(), streams[kept].id());
            (coefficient.abs() > ceiling).then(|| Rejection {
                correlated_with: streams[kept].id().clone(),
                coefficient,
            })
        });

        match conflict {
            None => {
                debug!(strategy = %candidate.id(), sharpe = candidate.sharpe(), "Accepted");
                selection.accepted.push(idx);
            }
            Some(rejection) => {
                debug!(
                    strategy = %candidate.id(),
                    correlated_with = %rejection.correlated_with,
                    coefficient = rejection.coefficient,
                    "Rejected for correlation"
                );
                selection.rejected.push((idx, rejection));
            }
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::types::AgentId;

    fn stream(id: &str, curve: Vec<f64>) -> StrategyStream {
        StrategyStream::from_curve(AgentId::from(id), id, None, curve, 252.0)
    }

    fn wave(n: usize, phase: f64, drift: f64) -> Vec<f64> {
        let mut v = 100.0;
        (0..n)
            .map(|i| {
                v += drift + ((i as f64) * 0.9 + phase).sin();
                v
            })
            .collect()
    }

    #[test]
    fn test_clone_is_rejected_with_reason() {
        let base = wave(40, 0.0, 0.5);
        let streams = vec![stream("a", base.clone()), stream("b", base)];
        let matrix = CorrelationMatrix::compute(&streams, 10);
        let selection = select(&streams, &matrix, 0.4);

        assert_eq!(selection.accepted, vec![0]);
        let rejection = selection.rejection(1).unwrap();
        assert_eq!(rejection.correlated_with.as_str(), "a");
        assert!(rejection.coefficient > 0.99);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let flat = vec![1.0; 5];
        let streams = vec![stream("b", flat.clone()), stream("a", flat)];
        let matrix = CorrelationMatrix::compute(&streams, 10);
        let selection = select(&streams, &matrix, 0.4);
        assert_eq!(selection.accepted, vec![0, 1]);
    }

    #[test]
    fn test_higher_sharpe_wins() {
        let weak = wave(40, 0.0, 0.1);
        let strong: Vec<f64> = weak.iter().enumerate().map(|(i, v)| v + i as f64).collect();
        let streams = vec![stream("weak", weak), stream("strong", strong)];
        assert!(streams[1].sharpe() > streams[0].sharpe());

        let matrix = CorrelationMatrix::compute(&streams, 10);
        let selection = select(&streams, &matrix, 0.4);
        assert_eq!(selection.accepted[0], 1);
    }

    #[test]
    fn test_empty_input() {
        let selection = select(&[], &CorrelationMatrix::default(), 0.4);
        assert!(selection.accepted.is_empty());
        assert!(selection.rejected.is_empty());
    }
}
