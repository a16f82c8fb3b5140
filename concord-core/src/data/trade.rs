//! Closed-trade ledger record.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{
    AgentId, Direction, EnvironmentSignature, Instrument, LearnMode, Regime, Timestamp,
    TradeEnvironment, ValidationError,
};

/// One closed trade as delivered by the trade ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    /// Ledger-unique trade identifier.
    pub trade_id: String,
    /// Agent that took the trade.
    pub agent_id: AgentId,
    /// Instrument traded.
    #[serde(rename = "pair")]
    pub instrument: Instrument,
    /// Trade direction.
    pub direction: Direction,
    /// Entry fill price.
    pub entry_price: Decimal,
    /// Exit fill price.
    pub exit_price: Decimal,
    /// Session label at entry.
    pub session_label: String,
    /// Regime label at entry.
    pub regime_label: Regime,
    /// Environment the trade ran in.
    pub environment: TradeEnvironment,
    /// Ledger insertion time.
    pub created_at: Timestamp,
}

impl TradeRecord {
    /// Checks price sanity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositivePrice` if either price is not
    /// positive, and `ValidationError::ReturnOverflow` if the return does not
    /// fit the decimal range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.checked_return().map(|_| ())
    }

    /// Signed fractional return of the trade (`0.01` = +1%).
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate`].
    pub fn checked_return(&self) -> Result<f64, ValidationError> {
        if self.entry_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(self.entry_price));
        }
        if self.exit_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(self.exit_price));
        }
        let overflow = || ValidationError::ReturnOverflow {
            entry: self.entry_price,
            exit: self.exit_price,
        };
        let raw = self
            .exit_price
            .checked_sub(self.entry_price)
            .and_then(|diff| diff.checked_div(self.entry_price))
            .ok_or_else(overflow)?;
        let raw = raw.to_f64().ok_or_else(overflow)?;
        Ok(raw * self.direction.sign())
    }

    /// Signed fractional return of the trade (`0.01` = +1%).
    ///
    /// Returns 0 for a record that fails [`Self::validate`].
    #[must_use]
    pub fn return_fraction(&self) -> f64 {
        self.checked_return().unwrap_or(0.0)
    }

    /// True if the trade made money.
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.return_fraction() > 0.0
    }

    /// Canonical statistics key for this trade.
    #[must_use]
    pub fn signature(&self) -> EnvironmentSignature {
        EnvironmentSignature::new(
            &self.session_label,
            self.regime_label,
            self.instrument.clone(),
            self.direction,
        )
    }
}

/// Keeps only trades whose environment counts under `mode`, ordered by
/// `(created_at, trade_id)`.
#[must_use]
pub fn filter_learn_mode(trades: &[TradeRecord], mode: LearnMode) -> Vec<TradeRecord> {
    let mut kept: Vec<TradeRecord> = trades
        .iter()
        .filter(|t| mode.includes(t.environment))
        .cloned()
        .collect();
    sort_canonical(&mut kept);
    kept
}

/// Sorts trades by `(created_at, trade_id)` so downstream folds are deterministic.
pub fn sort_canonical(trades: &mut [TradeRecord]) {
    trades.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.trade_id.cmp(&b.trade_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(direction: Direction, entry: Decimal, exit: Decimal) -> TradeRecord {
        TradeRecord {
            trade_id: "t-1".to_string(),
            agent_id: AgentId::from("alpha"),
            instrument: Instrument::new("EUR_USD").unwrap(),
            direction,
            entry_price: entry,
            exit_price: exit,
            session_label: "London".to_string(),
            regime_label: Regime::Trend,
            environment: TradeEnvironment::Live,
            created_at: Timestamp::new_unchecked(1_000),
        }
    }

    #[test]
    fn test_long_and_short_returns() {
        let long = trade(Direction::Long, dec!(100), dec!(110));
        assert!((long.return_fraction() - 0.10).abs() < 1e-12);
        assert!(long.is_win());

        let short = trade(Direction::Short, dec!(100), dec!(110));
        assert!((short.return_fraction() + 0.10).abs() < 1e-12);
        assert!(!short.is_win());
    }

    #[test]
    fn test_validate_rejects_zero_price() {
        let bad = trade(Direction::Long, dec!(0), dec!(1));
        assert!(bad.validate().is_err());
        assert_eq!(bad.return_fraction(), 0.0);
    }

    #[test]
    fn test_extreme_prices_do_not_panic() {
        let tiny = Decimal::new(1, 28);
        let blowup = trade(Direction::Long, tiny, Decimal::MAX);
        assert!(matches!(
            blowup.validate(),
            Err(ValidationError::ReturnOverflow { .. })
        ));
        assert!(blowup.checked_return().is_err());
        assert_eq!(blowup.return_fraction(), 0.0);

        let wide = trade(Direction::Short, Decimal::MAX, dec!(1));
        assert!((wide.checked_return().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_uses_ledger_field_names() {
        let json = serde_json::to_value(trade(Direction::Long, dec!(1.1), dec!(1.2))).unwrap();
        assert_eq!(json["pair"], "EUR_USD");
        assert_eq!(json["agentId"], "alpha");
        assert_eq!(json["regimeLabel"], "trend");
    }

    #[test]
    fn test_filter_learn_mode_orders_canonically() {
        let mut a = trade(Direction::Long, dec!(1), dec!(2));
        a.trade_id = "b".to_string();
        a.created_at = Timestamp::new_unchecked(5);
        let mut b = a.clone();
        b.trade_id = "a".to_string();
        let mut c = a.clone();
        c.trade_id = "c".to_string();
        c.environment = TradeEnvironment::Backtest;

        let kept = filter_learn_mode(&[a, b, c], LearnMode::LivePractice);
        let ids: Vec<_> = kept.iter().map(|t| t.trade_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
