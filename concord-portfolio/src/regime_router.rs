//! Regime-aware blending of risk-parity and affinity weights.
//!
//! For the current regime `r`:
//!
//! ```text
//! affinity_i = score_i[r] / Σ score_i[*]
//! final_i    = c · affinity_i / Σ affinity + (1 − c) · riskParity_i
//! ```
//!
//! with `c` the shock concentration in shock regimes and the ordinary
//! concentration otherwise. When every affinity is zero the affinity term
//! falls back to the risk-parity vector.

use concord_core::config::PortfolioConfig;
use concord_core::types::{Regime, RegimeAffinity};
use tracing::{debug, error};

use crate::error::{PortfolioError, Result};
use crate::risk_parity::check_weights;

/// Concentration applied in `regime`.
#[must_use]
pub fn concentration_for(regime: Regime, config: &PortfolioConfig) -> f64 {
    match regime {
        Regime::Shock => config.shock_concentration,
        Regime::Trend | Regime::Range => config.concentration,
    }
}

/// Routed weights plus whether the affinity term had to fall back.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedWeights {
    /// Final weights, index-aligned with the inputs.
    pub weights: Vec<f64>,
    /// True when every affinity share was zero.
    pub affinity_fallback: bool,
}

/// Blends `risk_parity` with each member's affinity for `regime`.
///
/// # Errors
///
/// Returns `LengthMismatch` if the inputs are not index-aligned, and an
/// invariant violation if the renormalized weights fail the sum check.
pub fn route(
    regime: Regime,
    affinities: &[RegimeAffinity],
    risk_parity: &[f64],
    config: &PortfolioConfig,
) -> Result<RoutedWeights> {
    if affinities.len() != risk_parity.len() {
        return Err(PortfolioError::LengthMismatch {
            what: "regime affinities",
            expected: risk_parity.len(),
            actual: affinities.len(),
        });
    }
    if risk_parity.is_empty() {
        return Ok(RoutedWeights {
            weights: Vec::new(),
            affinity_fallback: false,
        });
    }

    let shares: Vec<f64> = affinities.iter().map(|a| a.share(regime)).collect();
    let share_total: f64 = shares.iter().sum();
    let affinity_fallback = !(share_total > 0.0 && share_total.is_finite());
    let affinity: Vec<f64> = if affinity_fallback {
        risk_parity.to_vec()
    } else {
        shares.iter().map(|s| s / share_total).collect()
    };

    let c = concentration_for(regime, config);
    let blended: Vec<f64> = affinity
        .iter()
        .zip(risk_parity)
        .map(|(a, rp)| c * a + (1.0 - c) * rp)
        .collect();
    let total: f64 = blended.iter().sum();
    let weights: Vec<f64> = blended.iter().map(|w| w / total).collect();

    if let Err(violation) = check_weights(&weights) {
        error!(regime = %regime, %violation, "Regime-routed weights failed invariant");
        return Err(violation.into());
    }

    debug!(regime = %regime, concentration = c, affinity_fallback, "Routed weights");
    Ok(RoutedWeights {
        weights,
        affinity_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PortfolioConfig {
        PortfolioConfig::default()
    }

    #[test]
    fn test_shock_concentrates_more() {
        let affinities = [
            RegimeAffinity::new(0.0, 0.0, 1.0),
            RegimeAffinity::new(1.0, 1.0, 0.0),
        ];
        let rp = [0.5, 0.5];
        let shock = route(Regime::Shock, &affinities, &rp, &config()).unwrap();
        let trend = route(Regime::Trend, &affinities, &rp, &config()).unwrap();

        assert!((shock.weights[0] - 0.9).abs() < 1e-12);
        assert!((trend.weights[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_affinity_returns_risk_parity() {
        let affinities = [RegimeAffinity::new(0.0, 0.0, 0.0); 3];
        let rp = [0.2, 0.3, 0.5];
        let routed = route(Regime::Range, &affinities, &rp, &config()).unwrap();
        assert!(routed.affinity_fallback);
        for (w, r) in routed.weights.iter().zip(rp) {
            assert!((w - r).abs() < 1e-12);
        }
    }

    #[test]
    fn test_default_affinity_is_neutral() {
        let affinities = [RegimeAffinity::default(); 2];
        let routed = route(Regime::Trend, &affinities, &[0.25, 0.75], &config()).unwrap();
        assert!((routed.weights[0] - (0.6 * 0.5 + 0.4 * 0.25)).abs() < 1e-12);
        assert!((routed.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch() {
        let err = route(Regime::Trend, &[RegimeAffinity::default()], &[0.5, 0.5], &config())
            .unwrap_err();
        assert!(matches!(err, PortfolioError::LengthMismatch { .. }));
    }
}
