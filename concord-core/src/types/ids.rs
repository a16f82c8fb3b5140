//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Unique identifier for a trading agent.
///
/// Each agent produces one trade stream, so the portfolio side of the
/// engine uses the same identifier for the strategy built from that stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a new `AgentId`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyAgentId` for blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyAgentId);
        }
        Ok(Self(id))
    }

    /// Creates a new `AgentId` without validation.
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strategies are identified by the agent whose trades produce them.
pub type StrategyId = AgentId;

/// Traded instrument (e.g. `EUR_USD`, `BTC-USDT`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    /// Creates a new instrument, normalizing to upper case.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyInstrument` for blank input.
    pub fn new(symbol: impl AsRef<str>) -> Result<Self, ValidationError> {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(ValidationError::EmptyInstrument);
        }
        Ok(Self(symbol.to_uppercase()))
    }

    /// Returns the instrument as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_rejects_blank() {
        assert!(AgentId::new("  ").is_err());
        assert_eq!(AgentId::new("trend-1").unwrap().as_str(), "trend-1");
    }

    #[test]
    fn test_instrument_normalizes_case() {
        let inst = Instrument::new(" eur_usd ").unwrap();
        assert_eq!(inst.as_str(), "EUR_USD");
        assert!(Instrument::new("").is_err());
    }

    #[test]
    fn test_agent_id_ordering_is_lexicographic() {
        let mut ids = vec![AgentId::from("b"), AgentId::from("a"), AgentId::from("c")];
        ids.sort();
        assert_eq!(ids, vec![AgentId::from("a"), AgentId::from("b"), AgentId::from("c")]);
    }
}
