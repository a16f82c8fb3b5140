//! Blended equity curve and portfolio metrics.
//!
//! Member curves are truncated to the shortest length (no interpolation),
//! normalized to start at 1.0, summed with the final weights and rescaled
//! to a nominal base.

use concord_core::stats;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Metrics of the synthesized curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    /// Total return, in percent.
    pub total_return: f64,
    /// Peak-to-trough decline, in percent.
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio of per-period returns.
    pub sharpe: f64,
    /// Annualized volatility of per-period returns, in percent.
    pub volatility: f64,
}

impl PortfolioMetrics {
    /// Metrics for a curve sampled `periods_per_year` times a year.
    #[must_use]
    pub fn from_curve(curve: &[f64], periods_per_year: f64) -> Self {
        let normalized = stats::normalize_to_unit(curve);
        let returns = stats::first_differences(&normalized);
        Self {
            total_return: normalized
                .last()
                .map_or(0.0, |last| stats::finite_or_zero((last - 1.0) * 100.0)),
            max_drawdown: stats::max_drawdown(&normalized) * 100.0,
            sharpe: stats::annualized_sharpe(&returns, periods_per_year),
            volatility: stats::annualized_volatility(&returns, periods_per_year) * 100.0,
        }
    }
}

/// A synthesized portfolio curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    /// Blended curve starting at the nominal base.
    pub curve: Vec<f64>,
    /// Metrics derived from `curve`.
    pub metrics: PortfolioMetrics,
}

/// Blends `curves` with `weights`.
///
/// Empty input, or any empty curve, yields an empty synthesis with zero
/// metrics.
///
/// # Errors
///
/// Returns `LengthMismatch` if `weights` and `curves` differ in length.
pub fn synthesize(
    curves: &[&[f64]],
    weights: &[f64],
    nominal_base: f64,
    periods_per_year: f64,
) -> Result<Synthesis> {
    if curves.len() != weights.len() {
        return Err(PortfolioError::LengthMismatch {
            what: "synthesis weights",
            expected: curves.len(),
            actual: weights.len(),
        });
    }
    let len = curves.iter().map(|c| c.len()).min().unwrap_or(0);
    if len == 0 {
        return Ok(Synthesis::default());
    }

    let mut blended = vec![0.0_f64; len];
    for (curve, weight) in curves.iter().zip(weights) {
        let normalized = stats::normalize_to_unit(&curve[..len]);
        for (acc, value) in blended.iter_mut().zip(&normalized) {
            *acc += weight * value;
        }
    }
    let curve: Vec<f64> = blended
        .into_iter()
        .map(|v| stats::finite_or_zero(v * nominal_base))
        .collect();
    let metrics = PortfolioMetrics::from_curve(&curve, periods_per_year);
    Ok(Synthesis { curve, metrics })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_and_rescales() {
        let a = [100.0, 110.0, 121.0, 500.0];
        let b = [50.0, 50.0, 50.0];
        let synthesis = synthesize(&[&a, &b], &[0.5, 0.5], 10_000.0, 252.0).unwrap();

        assert_eq!(synthesis.curve.len(), 3);
        assert!((synthesis.curve[0] - 10_000.0).abs() < 1e-9);
        assert!((synthesis.curve[2] - 11_050.0).abs() < 1e-9);
        assert!((synthesis.metrics.total_return - 10.5).abs() < 1e-9);
        assert_eq!(synthesis.metrics.max_drawdown, 0.0);
    }

    #[test]
    fn test_drawdown_on_blended_curve() {
        let a = [1.0, 2.0, 1.0];
        let synthesis = synthesize(&[&a], &[1.0], 10_000.0, 252.0).unwrap();
        assert!((synthesis.metrics.max_drawdown - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_inputs_are_neutral() {
        let none = synthesize(&[], &[], 10_000.0, 252.0).unwrap();
        assert!(none.curve.is_empty());
        assert_eq!(none.metrics, PortfolioMetrics::default());

        let empty: [f64; 0] = [];
        let some = synthesize(&[&empty], &[1.0], 10_000.0, 252.0).unwrap();
        assert!(some.curve.is_empty());
    }

    #[test]
    fn test_nonpositive_start_is_flat() {
        let bad = [0.0, 5.0, 10.0];
        let synthesis = synthesize(&[&bad], &[1.0], 10_000.0, 252.0).unwrap();
        assert!(synthesis.curve.iter().all(|v| (*v - 10_000.0).abs() < 1e-9));
        assert!(synthesis.metrics.sharpe.is_finite());
    }
}
