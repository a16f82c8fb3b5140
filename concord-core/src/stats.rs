//! Finite-safe descriptive statistics over `f64` series.
//!
//! Every function here returns a finite number for any input, including
//! empty slices and constant series.

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1); 0 with fewer than two observations.
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    finite_or_zero((ss / (values.len() - 1) as f64).sqrt())
}

/// Annualized Sharpe ratio of per-period returns (zero risk-free rate).
///
/// Returns 0 when the standard deviation is 0 or there are fewer than two
/// observations.
#[must_use]
pub fn annualized_sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    let sd = sample_std(returns);
    if sd <= 0.0 {
        return 0.0;
    }
    finite_or_zero(mean(returns) / sd * periods_per_year.max(0.0).sqrt())
}

/// Annualized volatility of per-period returns.
#[must_use]
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    finite_or_zero(sample_std(returns) * periods_per_year.max(0.0).sqrt())
}

/// Maximum peak-to-trough decline of an equity curve, as a positive
/// fraction of the peak (`0.25` = 25%).
#[must_use]
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in curve {
        if !value.is_finite() {
            continue;
        }
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    finite_or_zero(worst)
}

/// First differences of `curve`.
#[must_use]
pub fn first_differences(curve: &[f64]) -> Vec<f64> {
    curve.windows(2).map(|w| finite_or_zero(w[1] - w[0])).collect()
}

/// Rescales `curve` so that its first sample is 1.0.
///
/// A curve whose first sample is non-positive or non-finite becomes flat at
/// 1.0 for its whole length.
#[must_use]
pub fn normalize_to_unit(curve: &[f64]) -> Vec<f64> {
    match curve.first() {
        Some(&first) if first.is_finite() && first > 0.0 => {
            curve.iter().map(|v| finite_or_zero(v / first)).collect()
        }
        Some(_) => vec![1.0; curve.len()],
        None => Vec::new(),
    }
}

/// Replaces NaN and ±∞ with 0.
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
