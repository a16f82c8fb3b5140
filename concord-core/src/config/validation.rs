//! Configuration validation utilities.
//!
//! Validation collects every failure along with its dotted path
//! (`portfolio.correlation_ceiling`) rather than stopping at the first one.

use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Tracks the current path in the configuration tree and the errors found.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<String>,
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new section in the configuration.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Exits the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Adds a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Consumes the context.
    ///
    /// A single failure is returned as-is; several are folded into one
    /// `ValidationFailed` listing all of them.
    pub fn into_result(mut self) -> ValidationResult {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ConfigError::ValidationFailed {
                reason: self
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }

    /// Creates an invalid value error with the current path context.
    #[must_use]
    pub fn invalid_value(&self, field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
        let field_name = field.into();
        let full_field = if self.path.is_empty() {
            field_name
        } else {
            format!("{}.{}", self.current_path(), field_name)
        };
        ConfigError::InvalidValue {
            field: full_field,
            reason: reason.into(),
        }
    }
}

/// Fluent validator over a [`ValidationContext`].
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator with the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Validates that a value lies within `[min, max]`.
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        if !(value >= min && value <= max) {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("Value {value} must be between {min} and {max}"),
            ));
        }
        self
    }

    /// Validates that a fraction lies in the half-open interval `(0, 1]`.
    pub fn unit_fraction(&mut self, field: &str, value: f64) -> &mut Self {
        if !(value > 0.0 && value <= 1.0) {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be in (0, 1]")),
            );
        }
        self
    }

    /// Validates that a numeric value is positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if !(*value > T::default()) {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be positive")),
            );
        }
        self
    }

    /// Validates that a value is not below a fixed floor.
    pub fn at_least<T: PartialOrd + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
        floor: &T,
    ) -> &mut Self {
        if !(value >= floor) {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be at least {floor}")),
            );
        }
        self
    }

    /// Validates that a duration is non-zero.
    pub fn non_zero_duration(&mut self, field: &str, value: Duration) -> &mut Self {
        if value.is_zero() {
            self.ctx
                .add_error(self.ctx.invalid_value(field, "Duration must be non-zero"));
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.ctx.add_error(self.ctx.invalid_value(field, error_msg));
        }
        self
    }
}

/// Reads `{PREFIX}_{FIELD}` overrides into configuration fields.
///
/// An unset variable leaves the field alone. A value that does not parse
/// also leaves it alone and is logged at warn level.
///
/// # Example
///
/// ```rust
/// use concord_core::config::EnvOverride;
///
/// let mut page_size = 1000_usize;
/// EnvOverride::apply_number("CONCORD_DOC_UNSET_PAGE_SIZE", &mut page_size);
/// assert_eq!(page_size, 1000);
/// ```
pub struct EnvOverride;

impl EnvOverride {
    /// Replaces `target` with the raw variable value.
    pub fn apply_string(var_name: &str, target: &mut String) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value;
        }
    }

    /// Parses any `FromStr` value (numbers, enums such as `LearnMode`).
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        Self::apply_parsed(var_name, target, |raw| raw.parse().ok());
    }

    /// Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn apply_bool(var_name: &str, target: &mut bool) {
        Self::apply_parsed(var_name, target, |raw| match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        });
    }

    /// Parses a humantime duration such as `"30s"` or `"15m"`.
    pub fn apply_duration(var_name: &str, target: &mut Duration) {
        Self::apply_parsed(var_name, target, |raw| {
            humantime_serde::re::humantime::parse_duration(raw).ok()
        });
    }

    fn apply_parsed<T>(var_name: &str, target: &mut T, parse: impl FnOnce(&str) -> Option<T>) {
        let Ok(raw) = std::env::var(var_name) else {
            return;
        };
        match parse(raw.trim()) {
            Some(value) => *target = value,
            None => warn!(variable = var_name, value = %raw, "Ignoring unparseable override"),
        }
    }
}
