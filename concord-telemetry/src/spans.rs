//! Span definitions for cycle tracing.
//!
//! One span per stage of a construction cycle:
//! - the cycle itself
//! - the paginated ledger fetch
//! - portfolio construction
//! - governance (statistics, authority, ladder)

use tracing::{Span, info_span};

/// Create a span for one construction cycle.
///
/// # Example
///
/// ```
/// use concord_telemetry::spans::cycle_span;
///
/// let span = cycle_span(42, "trend", "2024-01-01T00:00:00+00:00");
/// let _guard = span.enter();
/// // ... run the cycle
/// ```
#[must_use]
pub fn cycle_span(cycle: u64, regime: &str, as_of: &str) -> Span {
    info_span!(
        "cycle",
        cycle = cycle,
        regime = %regime,
        as_of = %as_of
    )
}

/// Create a span for the paginated ledger fetch.
#[must_use]
pub fn ledger_fetch_span(ledger: &str, page_size: usize) -> Span {
    info_span!(
        "ledger.fetch",
        ledger = %ledger,
        page_size = page_size
    )
}

/// Create a span for portfolio construction.
#[must_use]
pub fn portfolio_span(regime: &str, candidates: usize) -> Span {
    info_span!(
        "portfolio",
        regime = %regime,
        candidates = candidates
    )
}

/// Create a span for the governance stage.
#[must_use]
pub fn governance_span(learn_mode: &str, agents: usize) -> Span {
    info_span!(
        "governance",
        learn_mode = %learn_mode,
        agents = agents
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    fn init_test_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    }

    #[test]
    fn test_cycle_span() {
        init_test_subscriber();
        let span = cycle_span(1, "shock", "1970-01-01T00:00:00+00:00");
        let _guard = span.enter();
    }

    #[test]
    fn test_nested_stage_spans() {
        init_test_subscriber();
        let cycle = cycle_span(2, "trend", "now");
        let _cycle = cycle.enter();
        {
            let fetch = ledger_fetch_span("memory", 1000);
            let _guard = fetch.enter();
        }
        let portfolio = portfolio_span("trend", 3);
        let _portfolio = portfolio.enter();
        let governance = governance_span("live_practice", 3);
        let _governance = governance.enter();
    }
}
