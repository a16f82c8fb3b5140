//! Pairwise Pearson correlation of strategy return streams.

use std::collections::BTreeMap;

use concord_core::types::StrategyId;
use serde::{Deserialize, Serialize};

use crate::stream::StrategyStream;

/// One unordered pair and its coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEntry {
    /// First strategy, in input order.
    pub id_a: StrategyId,
    /// Second strategy, in input order.
    pub id_b: StrategyId,
    /// Pearson coefficient in [-1, 1].
    pub coefficient: f64,
}

/// Pearson correlation over the common prefix of `a` and `b`.
///
/// Returns 0 when the common prefix has fewer than `min_observations`
/// samples or either side has zero variance.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64], min_observations: usize) -> f64 {
    let n = a.len().min(b.len());
    if n < min_observations.max(2) {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let n_f = n as f64;
    let mean_a = a.iter().sum::<f64>() / n_f;
    let mean_b = b.iter().sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if !(denom.is_finite() && denom > 0.0) {
        return 0.0;
    }
    let r = cov / denom;
    if r.is_finite() { r.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Correlations for every unordered pair of a strategy set.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMatrix {
    entries: Vec<CorrelationEntry>,
    lookup: BTreeMap<(StrategyId, StrategyId), f64>,
    thin_pairs: usize,
}

impl CorrelationMatrix {
    /// Computes one entry per unordered pair, in input order.
    #[must_use]
    pub fn compute(streams: &[StrategyStream], min_observations: usize) -> Self {
        let mut matrix = Self::default();
        for (i, a) in streams.iter().enumerate() {
            for b in &streams[i + 1..] {
                if a.returns().len().min(b.returns().len()) < min_observations {
                    matrix.thin_pairs += 1;
                }
                let coefficient = pearson(a.returns(), b.returns(), min_observations);
                matrix.insert(a.id().clone(), b.id().clone(), coefficient);
            }
        }
        matrix
    }

    fn insert(&mut self, id_a: StrategyId, id_b: StrategyId, coefficient: f64) {
        let key = if id_a <= id_b {
            (id_a.clone(), id_b.clone())
        } else {
            (id_b.clone(), id_a.clone())
        };
        self.lookup.insert(key, coefficient);
        self.entries.push(CorrelationEntry {
            id_a,
            id_b,
            coefficient,
        });
    }

    /// Coefficient for a pair in either order; 1 for a strategy with itself
    /// and 0 for an unknown pair.
    #[must_use]
    pub fn get(&self, a: &StrategyId, b: &StrategyId) -> f64 {
        if a == b {
            return 1.0;
        }
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.lookup.get(&key).copied().unwrap_or(0.0)
    }

    /// Entries in computation order.
    #[must_use]
    pub fn entries(&self) -> &[CorrelationEntry] {
        &self.entries
    }

    /// Number of pairs that fell back to 0 for lack of observations.
    #[must_use]
    pub fn thin_pairs(&self) -> usize {
        self.thin_pairs
    }

    /// Consumes the matrix, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<CorrelationEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::types::AgentId;

    fn series(n: usize, f: impl Fn(usize) -> f64) -> Vec<f64> {
        (0..n).map(f).collect()
    }

    #[test]
    fn test_perfect_correlation() {
        let a = series(20, |i| (i as f64).sin());
        let b: Vec<f64> = a.iter().map(|x| 2.0 * x + 1.0).collect();
        let c: Vec<f64> = a.iter().map(|x| -x).collect();
        assert!((pearson(&a, &b, 10) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c, 10) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_observations_is_zero() {
        let a = series(9, |i| i as f64);
        assert_eq!(pearson(&a, &a, 10), 0.0);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let flat = vec![0.01; 30];
        let moving = series(30, |i| i as f64);
        assert_eq!(pearson(&flat, &moving, 10), 0.0);
    }

    #[test]
    fn test_truncates_to_common_prefix() {
        let a = series(12, |i| i as f64);
        let mut b = a.clone();
        b.extend([100.0, -100.0, 50.0]);
        assert!((pearson(&a, &b, 10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let make = |id: &str, k: f64| {
            StrategyStream::from_curve(
                AgentId::from(id),
                id,
                None,
                series(15, |i| 100.0 + k * (i as f64 * 0.7).sin() + i as f64),
                252.0,
            )
        };
        let streams = vec![make("a", 1.0), make("b", -1.0), make("c", 3.0)];
        let matrix = CorrelationMatrix::compute(&streams, 10);

        assert_eq!(matrix.entries().len(), 3);
        let a = AgentId::from("a");
        let b = AgentId::from("b");
        assert_eq!(matrix.get(&a, &b), matrix.get(&b, &a));
        assert_eq!(matrix.get(&a, &a), 1.0);
        assert_eq!(matrix.thin_pairs(), 0);
    }
}
