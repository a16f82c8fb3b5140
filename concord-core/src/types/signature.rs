//! Canonical environment signature used to key durable statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Direction, Instrument, Regime};

/// Session × regime × instrument × direction.
///
/// The `Display` form (`session|regime|instrument|direction`) is stable and
/// is what persistence layers should use when they need a flat key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSignature {
    /// Trading session label (e.g. `london`, `asia`).
    pub session: String,
    /// Regime at trade entry.
    pub regime: Regime,
    /// Instrument traded.
    pub instrument: Instrument,
    /// Trade direction.
    pub direction: Direction,
}

impl EnvironmentSignature {
    /// Creates a new signature; the session label is lower-cased.
    #[must_use]
    pub fn new(
        session: impl AsRef<str>,
        regime: Regime,
        instrument: Instrument,
        direction: Direction,
    ) -> Self {
        Self {
            session: session.as_ref().trim().to_lowercase(),
            regime,
            instrument,
            direction,
        }
    }
}

impl fmt::Display for EnvironmentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.session, self.regime, self.instrument, self.direction
        )
    }
}

/// Partial signature; `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureQuery {
    /// Session filter.
    pub session: Option<String>,
    /// Regime filter.
    pub regime: Option<Regime>,
    /// Instrument filter.
    pub instrument: Option<Instrument>,
    /// Direction filter.
    pub direction: Option<Direction>,
}

impl SignatureQuery {
    /// Query matching every signature.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts the query to one regime.
    #[must_use]
    pub fn with_regime(mut self, regime: Regime) -> Self {
        self.regime = Some(regime);
        self
    }

    /// Restricts the query to one instrument.
    #[must_use]
    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = Some(instrument);
        self
    }

    /// Restricts the query to one session (case-insensitive).
    #[must_use]
    pub fn with_session(mut self, session: impl AsRef<str>) -> Self {
        self.session = Some(session.as_ref().trim().to_lowercase());
        self
    }

    /// Restricts the query to one direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Returns true if `signature` satisfies every populated field.
    #[must_use]
    pub fn matches(&self, signature: &EnvironmentSignature) -> bool {
        self.session.as_ref().is_none_or(|s| *s == signature.session)
            && self.regime.is_none_or(|r| r == signature.regime)
            && self
                .instrument
                .as_ref()
                .is_none_or(|i| *i == signature.instrument)
            && self.direction.is_none_or(|d| d == signature.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> EnvironmentSignature {
        EnvironmentSignature::new(
            "London",
            Regime::Trend,
            Instrument::new("eur_usd").unwrap(),
            Direction::Long,
        )
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(signature().to_string(), "london|trend|EUR_USD|long");
    }

    #[test]
    fn test_query_wildcards() {
        let sig = signature();
        assert!(SignatureQuery::any().matches(&sig));
        assert!(SignatureQuery::any().with_regime(Regime::Trend).matches(&sig));
        assert!(!SignatureQuery::any().with_regime(Regime::Shock).matches(&sig));
        assert!(SignatureQuery::any().with_session("LONDON").matches(&sig));
        assert!(
            SignatureQuery::any()
                .with_instrument(Instrument::new("EUR_USD").unwrap())
                .matches(&sig)
        );
        assert!(
            !SignatureQuery::any()
                .with_instrument(Instrument::new("GBP_USD").unwrap())
                .matches(&sig)
        );
        assert!(
            !SignatureQuery::any()
                .with_direction(Direction::Short)
                .matches(&sig)
        );
    }
}
