//! Configuration traits for validation and environment overrides.

use super::validation::ValidationContext;
use crate::error::ConfigError;

/// Trait for types that can be validated as a whole.
///
/// # Example
///
/// ```rust
/// use concord_core::config::{FallbackConfig, Validatable};
///
/// assert!(FallbackConfig::default().validate().is_ok());
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// A configuration section that validates into a shared context and reads
/// `{prefix}_{FIELD}` environment overrides.
pub trait ConfigSection {
    /// Records every invalid field under the context's current path.
    fn validate_with_context(&self, ctx: &mut ValidationContext);

    /// Applies environment variable overrides.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The environment variable prefix (e.g., "`CONCORD_PORTFOLIO`")
    fn apply_env_overrides(&mut self, prefix: &str);
}

impl<T: ConfigSection> Validatable for T {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        self.validate_with_context(&mut ctx);
        ctx.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Validator;

    struct Window {
        minutes: i64,
    }

    impl ConfigSection for Window {
        fn validate_with_context(&self, ctx: &mut ValidationContext) {
            Validator::new(ctx).positive("minutes", &self.minutes);
        }

        fn apply_env_overrides(&mut self, _prefix: &str) {}
    }

    #[test]
    fn test_blanket_validatable() {
        assert!(Window { minutes: 15 }.validate().is_ok());
        let err = Window { minutes: -1 }.validate().unwrap_err();
        assert!(err.to_string().contains("minutes"));
    }
}
