//! Engine configuration
//!
//! The default currency every monetary amount is normalized into. It is an
//! explicit value threaded into each component that converts currencies.

use crate::error::{FluxAllocError, Result};
use crate::types::CurrencyCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Currency used when neither the CLI nor the environment names one
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Configuration shared by the allocation components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Currency all values are reported in
    pub default_currency: CurrencyCode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::new(DEFAULT_CURRENCY),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from an optional currency argument
    ///
    /// # Errors
    ///
    /// Returns [`FluxAllocError::Config`] when the code is not three ASCII letters.
    ///
    /// # Examples
    /// ```
    /// use fluxalloc_core::config::EngineConfig;
    ///
    /// let config = EngineConfig::from_cli(Some("usd")).unwrap();
    /// assert_eq!(config.default_currency.as_str(), "USD");
    /// assert!(EngineConfig::from_cli(Some("dollars")).is_err());
    /// ```
    pub fn from_cli(currency: Option<&str>) -> Result<Self> {
        let Some(raw) = currency else {
            return Ok(Self::default());
        };

        let code = CurrencyCode::new(raw);
        if code.as_str().len() != 3 || !code.as_str().chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(FluxAllocError::Config(format!(
                "'{raw}' is not a currency code. Use a three-letter code like 'EUR' or 'USD'"
            )));
        }

        debug!("Using default currency {}", code);
        Ok(Self {
            default_currency: code,
        })
    }

    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.default_currency = currency;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_currency() {
        let config = EngineConfig::from_cli(None).unwrap();
        assert_eq!(config.default_currency.as_str(), DEFAULT_CURRENCY);
    }

    #[test]
    fn test_invalid_currency_rejected() {
        let err = EngineConfig::from_cli(Some("E1R")).unwrap_err();
        assert!(matches!(err, FluxAllocError::Config(_)));
        assert!(EngineConfig::from_cli(Some("")).is_err());
    }

    #[test]
    fn test_with_currency() {
        let config = EngineConfig::default().with_currency(CurrencyCode::new("chf"));
        assert_eq!(config.default_currency.as_str(), "CHF");
    }
}
