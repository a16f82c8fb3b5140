//! Inverse-volatility (risk-parity) weighting.

use concord_core::error::InvariantViolation;
use concord_core::stats;

use crate::error::Result;
use crate::stream::StrategyStream;

/// Tolerance on Σweight after normalization.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Volatility assumed for a stream with fewer than two returns.
pub const FALLBACK_VOLATILITY: f64 = 1.0;

/// Volatility estimate for one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityEstimate {
    /// Annualized volatility after flooring, or the fallback value.
    pub volatility: f64,
    /// True when the stream had too few returns to estimate.
    pub fallback: bool,
}

/// Annualized volatility of a stream's returns, floored at `floor`.
#[must_use]
pub fn estimate_volatility(
    stream: &StrategyStream,
    periods_per_year: f64,
    floor: f64,
) -> VolatilityEstimate {
    if stream.returns().len() < 2 {
        return VolatilityEstimate {
            volatility: FALLBACK_VOLATILITY,
            fallback: true,
        };
    }
    VolatilityEstimate {
        volatility: stats::annualized_volatility(stream.returns(), periods_per_year).max(floor),
        fallback: false,
    }
}

/// Weights proportional to `1 / volatility`, normalized to sum to 1.
///
/// An empty input yields an empty vector.
///
/// # Errors
///
/// Returns an invariant violation if the normalized weights do not sum to
/// 1 within [`WEIGHT_SUM_TOLERANCE`] or any weight is non-finite.
pub fn inverse_volatility_weights(volatilities: &[f64]) -> Result<Vec<f64>> {
    if volatilities.is_empty() {
        return Ok(Vec::new());
    }
    let inverse: Vec<f64> = volatilities.iter().map(|v| 1.0 / v).collect();
    let total: f64 = inverse.iter().sum();
    let weights: Vec<f64> = inverse.iter().map(|w| w / total).collect();
    check_weights(&weights)?;
    Ok(weights)
}

/// Verifies that `weights` are finite, non-negative and sum to 1.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn check_weights(weights: &[f64]) -> std::result::Result<(), InvariantViolation> {
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(InvariantViolation::InvalidWeight {
            id: i.to_string(),
            value: *w,
        });
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(InvariantViolation::WeightSum {
            sum,
            tolerance: WEIGHT_SUM_TOLERANCE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::types::AgentId;

    #[test]
    fn test_weights_sum_to_one_and_favor_low_vol() {
        let weights = inverse_volatility_weights(&[0.1, 0.2, 0.4]).unwrap();
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(weights[0] > weights[1] && weights[1] > weights[2]);
        assert!((weights[0] / weights[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_weights() {
        assert!(inverse_volatility_weights(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_observation_uses_fallback() {
        let stream =
            StrategyStream::from_curve(AgentId::from("s"), "s", None, vec![1.0, 1.1], 252.0);
        let estimate = estimate_volatility(&stream, 252.0, 0.001);
        assert!(estimate.fallback);
        assert_eq!(estimate.volatility, 1.0);
    }

    #[test]
    fn test_flat_stream_is_floored() {
        let stream = StrategyStream::from_curve(AgentId::from("s"), "s", None, vec![1.0; 30], 252.0);
        let estimate = estimate_volatility(&stream, 252.0, 0.001);
        assert!(!estimate.fallback);
        assert_eq!(estimate.volatility, 0.001);
    }

    #[test]
    fn test_check_weights_rejects_bad_sum() {
        assert!(matches!(
            check_weights(&[0.5, 0.4]),
            Err(InvariantViolation::WeightSum { .. })
        ));
        assert!(matches!(
            check_weights(&[1.5, -0.5]),
            Err(InvariantViolation::InvalidWeight { .. })
        ));
    }
}
