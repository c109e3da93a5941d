//! JSON output for allocation results
//!
//! Monetary amounts are emitted as decimal strings so no precision is lost.
//!
//! # Examples
//!
//! ```
//! use fluxalloc::output::get_formatter;
//! use fluxalloc_core::MonthlyTotals;
//!
//! let formatter = get_formatter(false);
//! let json = formatter.format_totals(&MonthlyTotals::default());
//! assert!(json.contains("\"months\""));
//! ```

use crate::category::CategoryKey;
use fluxalloc_core::aggregation_types::{Allocation, MonthlyAmounts, MonthlyTotals};
use fluxalloc_core::types::FluxId;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Income and costs per month with their totals
    fn format_totals(&self, totals: &MonthlyTotals) -> String;

    /// Income allocated to a category
    fn format_income(
        &self,
        key: CategoryKey,
        allocation: &Allocation,
        failed_fluxes: &BTreeSet<FluxId>,
    ) -> String;

    /// Costs per month and id under `label`
    fn format_costs(&self, label: &str, costs: &MonthlyAmounts) -> String;
}

/// JSON formatter
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    compact: bool,
}

impl JsonFormatter {
    pub fn new(compact: bool) -> Self {
        Self { compact }
    }

    fn render(&self, output: &Value) -> String {
        if self.compact {
            return output.to_string();
        }
        serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_totals(&self, totals: &MonthlyTotals) -> String {
        let months: BTreeSet<_> = totals.income.keys().chain(totals.costs.keys()).collect();
        let rows: Vec<Value> = months
            .into_iter()
            .map(|month| {
                let income = totals.income.get(month).copied().unwrap_or(Decimal::ZERO);
                let costs = totals.costs.get(month).copied().unwrap_or(Decimal::ZERO);
                json!({
                    "month": month,
                    "income": income,
                    "costs": costs,
                    "net": income - costs,
                })
            })
            .collect();

        let output = json!({
            "months": rows,
            "totals": {
                "income": totals.total_income(),
                "costs": totals.total_costs(),
                "net": totals.total_income() - totals.total_costs(),
            }
        });
        self.render(&output)
    }

    fn format_income(
        &self,
        key: CategoryKey,
        allocation: &Allocation,
        failed_fluxes: &BTreeSet<FluxId>,
    ) -> String {
        let output = json!({
            "category": key,
            "months": allocation.amounts,
            "contributors": allocation.contributors,
            "totals": allocation.amounts.category_totals(),
            "total": allocation.amounts.total(),
            "failed_fluxes": failed_fluxes,
        });
        self.render(&output)
    }

    fn format_costs(&self, label: &str, costs: &MonthlyAmounts) -> String {
        let output = json!({
            "category": label,
            "months": costs,
            "totals": costs.category_totals(),
            "total": costs.total(),
        });
        self.render(&output)
    }
}

/// Get the JSON formatter, pretty-printed unless `compact`
pub fn get_formatter(compact: bool) -> Box<dyn OutputFormatter> {
    Box::new(JsonFormatter::new(compact))
}
