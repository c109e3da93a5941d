//! Value calculator for logged work
//!
//! Computes the monetary value of a worklog, `rate × minutes / 60 × exchange_rate`,
//! and converts it into the requested currency through the injected
//! [`CurrencyExchanger`].
//!
//! # Examples
//!
//! ```
//! use fluxalloc_valuation::{RateTable, ValueCalculator};
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let calculator = ValueCalculator::new(Arc::new(RateTable::new()));
//!
//! // 90 minutes at 40/h with an exchange multiplier of 1.5
//! let value = ValueCalculator::value_at_rate(dec!(40), dec!(90), dec!(1.5));
//! assert_eq!(value, dec!(90));
//! ```

use fluxalloc_core::error::Result;
use fluxalloc_core::provider::CurrencyExchanger;
use fluxalloc_core::types::{CurrencyCode, MINUTES_PER_HOUR, WorkLog};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::trace;

/// Calculates worklog values in a target currency
#[derive(Clone)]
pub struct ValueCalculator {
    exchanger: Arc<dyn CurrencyExchanger>,
}

impl ValueCalculator {
    /// Create a new ValueCalculator backed by an exchange collaborator
    pub fn new(exchanger: Arc<dyn CurrencyExchanger>) -> Self {
        Self { exchanger }
    }

    /// Value of a worklog in `target`
    ///
    /// A `custom_value` on the log replaces the rate computation. Either way
    /// the amount is converted from the log's currency into `target`.
    ///
    /// # Errors
    ///
    /// Propagates the exchange collaborator's failure unchanged.
    pub fn log_value(&self, log: &WorkLog, target: &CurrencyCode) -> Result<Decimal> {
        self.value_for_minutes(log, Decimal::from(log.billed_time), target)
    }

    /// Value of `minutes` of a worklog in `target`
    ///
    /// `minutes` may be fractional, as for the part of a log that fits an
    /// allotment. A `custom_value` is used as is.
    pub fn value_for_minutes(
        &self,
        log: &WorkLog,
        minutes: Decimal,
        target: &CurrencyCode,
    ) -> Result<Decimal> {
        let native = match log.custom_value {
            Some(custom) => custom,
            None => Self::value_at_rate(log.rate, minutes, log.exchange_rate),
        };

        let value = self.convert(native, log.currency.as_ref(), target)?;
        trace!(
            "Valued {} minutes of user {} at {} {}",
            minutes, log.user_id, value, target
        );
        Ok(value)
    }

    /// Pure value computation: `rate × minutes / 60 × exchange_rate`
    pub fn value_at_rate(rate: Decimal, minutes: Decimal, exchange_rate: Decimal) -> Decimal {
        rate * minutes / MINUTES_PER_HOUR * exchange_rate
    }

    /// Convert `amount` from `from` (default: `to`) into `to`
    pub fn convert(
        &self,
        amount: Decimal,
        from: Option<&CurrencyCode>,
        to: &CurrencyCode,
    ) -> Result<Decimal> {
        Ok(amount * self.conversion_rate(from, to)?)
    }

    /// Multiplier from `from` (default: `to`) into `to`
    pub fn conversion_rate(&self, from: Option<&CurrencyCode>, to: &CurrencyCode) -> Result<Decimal> {
        match from {
            Some(from) if from != to => self.exchanger.rate(from, to),
            _ => Ok(Decimal::ONE),
        }
    }
}

impl std::fmt::Debug for ValueCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCalculator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateTable;
    use fluxalloc_core::error::FluxAllocError;
    use fluxalloc_core::types::{BillingMonth, BillingType, EntityId, FluxId};
    use rust_decimal_macros::dec;

    fn log(rate: Decimal, minutes: u32) -> WorkLog {
        WorkLog {
            flux_id: FluxId::new(1),
            project_id: EntityId::new(1),
            user_id: EntityId::new(1),
            activity_id: None,
            owner_id: None,
            invoice_month: BillingMonth::from_ym(2024, 1).unwrap(),
            billing_type: BillingType::Billable,
            billed_time: minutes,
            billable: None,
            rate,
            exchange_rate: Decimal::ONE,
            currency: None,
            custom_value: None,
            included_in_value: false,
            value: Decimal::ZERO,
        }
    }

    fn calculator() -> ValueCalculator {
        let mut table = RateTable::new();
        table.add_rate(CurrencyCode::new("USD"), CurrencyCode::new("EUR"), dec!(0.8));
        ValueCalculator::new(Arc::new(table))
    }

    #[test]
    fn test_value_in_same_currency() {
        let eur = CurrencyCode::new("EUR");
        let value = calculator().log_value(&log(dec!(60), 30), &eur).unwrap();
        assert_eq!(value, dec!(30));
    }

    #[test]
    fn test_value_converted() {
        let eur = CurrencyCode::new("EUR");
        let mut usd_log = log(dec!(100), 60);
        usd_log.currency = Some(CurrencyCode::new("USD"));
        usd_log.exchange_rate = dec!(2);

        // 100/h × 1h × 2 = 200 USD -> 160 EUR
        let value = calculator().log_value(&usd_log, &eur).unwrap();
        assert_eq!(value, dec!(160));
    }

    #[test]
    fn test_custom_value_overrides_rate() {
        let eur = CurrencyCode::new("EUR");
        let mut custom = log(dec!(100), 600);
        custom.custom_value = Some(dec!(42));
        assert_eq!(calculator().log_value(&custom, &eur).unwrap(), dec!(42));
    }

    #[test]
    fn test_missing_rate_propagates() {
        let eur = CurrencyCode::new("EUR");
        let mut gbp_log = log(dec!(10), 60);
        gbp_log.currency = Some(CurrencyCode::new("GBP"));
        let err = calculator().log_value(&gbp_log, &eur).unwrap_err();
        assert!(matches!(err, FluxAllocError::MissingExchangeRate { .. }));
    }

    #[test]
    fn test_fractional_minutes() {
        let eur = CurrencyCode::new("EUR");
        let value = calculator()
            .value_for_minutes(&log(dec!(60), 60), dec!(7.5), &eur)
            .unwrap();
        assert_eq!(value, dec!(7.5));

        let mut custom = log(dec!(60), 60);
        custom.custom_value = Some(dec!(3));
        let value = calculator().value_for_minutes(&custom, dec!(0.5), &eur).unwrap();
        assert_eq!(value, dec!(3));
    }

    #[test]
    fn test_zero_minutes() {
        assert_eq!(
            ValueCalculator::value_at_rate(dec!(75), Decimal::ZERO, Decimal::ONE),
            Decimal::ZERO
        );
    }
}
