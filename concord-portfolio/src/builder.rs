//! End-to-end portfolio construction.
//!
//! streams → correlation → decorrelation → risk parity → regime routing →
//! synthesis. The whole pass is synchronous and pure; it either returns a
//! complete [`PortfolioResult`] or an error, never a partial result.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::config::PortfolioConfig;
use concord_core::types::{Regime, RegimeAffinity, StrategyId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::correlation::{CorrelationEntry, CorrelationMatrix};
use crate::decorrelation::{Rejection, select};
use crate::error::{PortfolioError, Result};
use crate::regime_router::route;
use crate::risk_parity::{estimate_volatility, inverse_volatility_weights};
use crate::stream::StrategyStream;
use crate::synthesizer::{PortfolioMetrics, synthesize};

/// A stream joined with its weights and acceptance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMember {
    /// The underlying stream.
    #[serde(flatten)]
    pub stream: StrategyStream,
    /// Affinity used for routing.
    pub regime_affinity: RegimeAffinity,
    /// Volatility used for risk parity; `None` when rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    /// Inverse-volatility weight; 0 when rejected.
    pub risk_parity_weight: f64,
    /// Regime-blended weight; 0 when rejected.
    pub final_weight: f64,
    /// Whether the decorrelation filter kept this member.
    pub accepted: bool,
    /// Why it was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

/// Conservative defaults applied during construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// No strategies were supplied; the portfolio is empty.
    EmptyStrategySet,
    /// Some pairs had too few observations and were treated as uncorrelated.
    InsufficientObservations {
        /// Number of affected pairs.
        pairs: usize,
        /// Minimum observations required.
        minimum: usize,
    },
    /// A member had fewer than two returns and used the fallback volatility.
    VolatilityFallback {
        /// Affected strategy.
        strategy: StrategyId,
    },
    /// No member had any affinity for the regime; risk parity was used.
    AffinityFallback {
        /// Current regime.
        regime: Regime,
    },
}

/// Published output of one construction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResult {
    /// Regime the weights were routed for.
    pub regime_label: Regime,
    /// Every candidate, in input order.
    pub members: Vec<PortfolioMember>,
    /// Final weight per accepted strategy.
    pub allocations: BTreeMap<StrategyId, f64>,
    /// Blended equity curve.
    pub synthesized_curve: Vec<f64>,
    /// Metrics of the blended curve.
    pub metrics: PortfolioMetrics,
    /// One entry per unordered candidate pair.
    pub correlation_matrix: Vec<CorrelationEntry>,
    /// Members kept by the decorrelation filter.
    pub accepted_count: usize,
    /// Members dropped by the decorrelation filter.
    pub rejected_count: usize,
    /// Conservative defaults applied along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl PortfolioResult {
    /// The neutral portfolio for an empty strategy set.
    #[must_use]
    pub fn empty(regime: Regime) -> Self {
        Self {
            regime_label: regime,
            members: Vec::new(),
            allocations: BTreeMap::new(),
            synthesized_curve: Vec::new(),
            metrics: PortfolioMetrics::default(),
            correlation_matrix: Vec::new(),
            accepted_count: 0,
            rejected_count: 0,
            diagnostics: vec![Diagnostic::EmptyStrategySet],
        }
    }

    /// Sum of final weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.allocations.values().sum()
    }
}

/// Runs the construction pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct PortfolioBuilder {
    config: PortfolioConfig,
}

impl PortfolioBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(config: PortfolioConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Builds a portfolio for `regime`.
    ///
    /// Strategies missing from `affinities` use the neutral affinity.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::DuplicateStrategy` if two streams share an
    /// id, and otherwise only invariant violations; thin or empty input
    /// resolves to conservative defaults listed in
    /// [`PortfolioResult::diagnostics`].
    pub fn build(
        &self,
        streams: Vec<StrategyStream>,
        affinities: &BTreeMap<StrategyId, RegimeAffinity>,
        regime: Regime,
    ) -> Result<PortfolioResult> {
        if streams.is_empty() {
            warn!(regime = %regime, "No strategies supplied; publishing empty portfolio");
            return Ok(PortfolioResult::empty(regime));
        }
        let mut ids = BTreeSet::new();
        if let Some(dup) = streams.iter().map(StrategyStream::id).find(|id| !ids.insert(*id)) {
            warn!(strategy = %dup, "Duplicate strategy id; refusing to build");
            return Err(PortfolioError::DuplicateStrategy(dup.clone()));
        }
        let cfg = &self.config;
        let mut diagnostics = Vec::new();

        let matrix = CorrelationMatrix::compute(&streams, cfg.min_correlation_observations);
        if matrix.thin_pairs() > 0 {
            diagnostics.push(Diagnostic::InsufficientObservations {
                pairs: matrix.thin_pairs(),
                minimum: cfg.min_correlation_observations,
            });
        }

        let selection = select(&streams, &matrix, cfg.correlation_ceiling);

        let estimates: Vec<_> = selection
            .accepted
            .iter()
            .map(|&i| estimate_volatility(&streams[i], cfg.periods_per_year, cfg.volatility_floor))
            .collect();
        for (&i, estimate) in selection.accepted.iter().zip(&estimates) {
            if estimate.fallback {
                diagnostics.push(Diagnostic::VolatilityFallback {
                    strategy: streams[i].id().clone(),
                });
            }
        }
        let vols: Vec<f64> = estimates.iter().map(|e| e.volatility).collect();
        let risk_parity = inverse_volatility_weights(&vols)?;

        let affinity_of = |i: usize| {
            affinities
                .get(streams[i].id())
                .copied()
                .unwrap_or_default()
        };
        let accepted_affinities: Vec<RegimeAffinity> =
            selection.accepted.iter().map(|&i| affinity_of(i)).collect();
        let routed = route(regime, &accepted_affinities, &risk_parity, cfg)?;
        if routed.affinity_fallback {
            diagnostics.push(Diagnostic::AffinityFallback { regime });
        }

        let curves: Vec<&[f64]> = selection
            .accepted
            .iter()
            .map(|&i| streams[i].curve())
            .collect();
        let synthesis = synthesize(
            &curves,
            &routed.weights,
            cfg.nominal_base,
            cfg.periods_per_year,
        )?;

        let mut slots: Vec<Option<(f64, f64, f64)>> = vec![None; streams.len()];
        for (k, &i) in selection.accepted.iter().enumerate() {
            slots[i] = Some((vols[k], risk_parity[k], routed.weights[k]));
        }

        let accepted_count = selection.accepted.len();
        let rejected_count = selection.rejected.len();
        let mut allocations = BTreeMap::new();
        let members: Vec<PortfolioMember> = streams
            .into_iter()
            .enumerate()
            .map(|(i, stream)| {
                let regime_affinity = affinities.get(stream.id()).copied().unwrap_or_default();
                let rejection = selection.rejection(i).cloned();
                match slots[i] {
                    Some((vol, rp, weight)) => {
                        allocations.insert(stream.id().clone(), weight);
                        PortfolioMember {
                            stream,
                            regime_affinity,
                            volatility: Some(vol),
                            risk_parity_weight: rp,
                            final_weight: weight,
                            accepted: true,
                            rejection,
                        }
                    }
                    None => PortfolioMember {
                        stream,
                        regime_affinity,
                        volatility: None,
                        risk_parity_weight: 0.0,
                        final_weight: 0.0,
                        accepted: false,
                        rejection,
                    },
                }
            })
            .collect();

        info!(
            regime = %regime,
            accepted = accepted_count,
            rejected = rejected_count,
            sharpe = synthesis.metrics.sharpe,
            total_return = synthesis.metrics.total_return,
            "Portfolio constructed"
        );

        Ok(PortfolioResult {
            regime_label: regime,
            members,
            allocations,
            synthesized_curve: synthesis.curve,
            metrics: synthesis.metrics,
            correlation_matrix: matrix.into_entries(),
            accepted_count,
            rejected_count,
            diagnostics,
        })
    }
}
