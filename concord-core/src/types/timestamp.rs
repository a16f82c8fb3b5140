//! Timestamp type for ledger rows and audit history.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Unix millisecond timestamp.
///
/// Cycle code never reads the wall clock on its own: the caller supplies an
/// `as_of` timestamp so that two runs over the same input produce the same
/// output.
///
/// # Examples
///
/// ```
/// use concord_core::types::Timestamp;
///
/// let ts = Timestamp::new(1_704_067_200_000).unwrap();
/// assert_eq!(ts.as_secs(), 1_704_067_200);
/// assert!(Timestamp::new(-1).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Zero timestamp constant.
    pub const ZERO: Self = Self(0);

    /// Creates a new `Timestamp` from milliseconds since Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimestamp` if the value is negative.
    pub fn new(millis: i64) -> Result<Self, ValidationError> {
        if millis < 0 {
            return Err(ValidationError::InvalidTimestamp(millis));
        }
        Ok(Self(millis))
    }

    /// Creates a new `Timestamp` without validation.
    ///
    /// The caller must ensure the value is non-negative.
    #[must_use]
    pub const fn new_unchecked(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a `Timestamp` from seconds since Unix epoch.
    pub fn from_secs(secs: i64) -> Result<Self, ValidationError> {
        Self::new(secs * 1000)
    }

    /// Returns the timestamp as milliseconds since Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0 / 1000
    }

    /// Returns the UTC calendar day index (days since epoch).
    #[must_use]
    pub const fn day_index(&self) -> i64 {
        self.0.div_euclid(MILLIS_PER_DAY)
    }

    /// Absolute distance to another timestamp in milliseconds.
    #[must_use]
    pub const fn abs_diff_millis(&self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Converts to a `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    /// Accepts either integer milliseconds or an RFC 3339 string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(millis) = s.parse::<i64>() {
            return Self::new(millis);
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|_| ValidationError::InvalidTimestamp(0))
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.to_datetime()
    }
}
