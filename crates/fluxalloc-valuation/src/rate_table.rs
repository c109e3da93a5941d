//! In-memory exchange rate table
//!
//! Rates are looked up directly, then through the inverse pair. Converting a
//! currency into itself always yields one.

use fluxalloc_core::error::{FluxAllocError, Result};
use fluxalloc_core::provider::CurrencyExchanger;
use fluxalloc_core::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One known conversion: `amount_in_from × rate = amount_in_to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
}

/// Table of exchange rates implementing [`CurrencyExchanger`]
///
/// # Examples
/// ```
/// use fluxalloc_core::provider::CurrencyExchanger;
/// use fluxalloc_core::types::CurrencyCode;
/// use fluxalloc_valuation::RateTable;
/// use rust_decimal_macros::dec;
///
/// let mut table = RateTable::new();
/// table.add_rate(CurrencyCode::new("USD"), CurrencyCode::new("EUR"), dec!(0.5));
///
/// let eur = CurrencyCode::new("EUR");
/// let usd = CurrencyCode::new("USD");
/// assert_eq!(table.rate(&usd, &eur).unwrap(), dec!(0.5));
/// assert_eq!(table.rate(&eur, &usd).unwrap(), dec!(2));
/// assert_eq!(table.rate(&eur, &eur).unwrap(), dec!(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of rates; later entries win
    pub fn from_rates(rates: impl IntoIterator<Item = ExchangeRate>) -> Self {
        let mut table = Self::new();
        for rate in rates {
            table.add_rate(rate.from, rate.to, rate.rate);
        }
        table
    }

    pub fn add_rate(&mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) {
        self.rates.insert((from, to), rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl CurrencyExchanger for RateTable {
    fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }

        if let Some(inverse) = self.rates.get(&(to.clone(), from.clone())) {
            if !inverse.is_zero() {
                debug!("Using inverse rate for {} -> {}", from, to);
                return Ok(Decimal::ONE / *inverse);
            }
        }

        Err(FluxAllocError::MissingExchangeRate {
            from: from.clone(),
            to: to.clone(),
        })
    }
}
