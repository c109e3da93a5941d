//! Worklog valuation and currency exchange for fluxalloc
//!
//! This crate turns logged time into monetary value and converts amounts
//! between currencies using a table of known exchange rates.

pub mod rate_table;
pub mod value_calculator;

pub use rate_table::{ExchangeRate, RateTable};
pub use value_calculator::ValueCalculator;
