//! Category income allocation
//!
//! Two ways of turning billed value into per-month, per-category income:
//!
//! - [`CategoryIncomeAllocator`] splits each flux's billed value across the
//!   categories that logged work on it, proportionally to their logged value.
//! - [`BilledValueAllocator`] passes invoice rows through for the dimensions
//!   billed wholesale (project, owner).

use crate::category::CategoryKey;
use fluxalloc_core::aggregation_types::Allocation;
use fluxalloc_core::error::{FluxAllocError, Result};
use fluxalloc_core::filters::IdFilter;
use fluxalloc_core::types::{BilledFlux, EntityId, FluxId, InvoiceRow, PaymentStructure, WorkLog};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Splits flux billed values by logged-value share
///
/// Fixed-sum fluxes are skipped; they are allocated by
/// [`crate::fixed_sum`]. Subscription fluxes whose logged value falls short
/// of their billed value are floored at the billed value, so the missing
/// share is not attributed to anyone.
///
/// # Examples
///
/// ```
/// use fluxalloc::category::CategoryKey;
/// use fluxalloc::category_income::CategoryIncomeAllocator;
/// use fluxalloc_core::filters::IdFilter;
/// use std::collections::BTreeMap;
///
/// let fluxes = BTreeMap::new();
/// let allocator = CategoryIncomeAllocator::new(&fluxes);
/// let allocation = allocator.allocate(&[], CategoryKey::User, &IdFilter::All).unwrap();
/// assert!(allocation.amounts.is_empty());
/// ```
pub struct CategoryIncomeAllocator<'a> {
    fluxes: &'a BTreeMap<FluxId, BilledFlux>,
}

impl<'a> CategoryIncomeAllocator<'a> {
    pub fn new(fluxes: &'a BTreeMap<FluxId, BilledFlux>) -> Self {
        Self { fluxes }
    }

    /// Allocate every non-fixed-sum flux referenced by `logs` to `key`
    ///
    /// Only ids accepted by `allowed` receive income.
    ///
    /// # Errors
    ///
    /// [`FluxAllocError::MissingFlux`] when a log references a flux that is
    /// not in the billed flux map.
    pub fn allocate(
        &self,
        logs: &[WorkLog],
        key: CategoryKey,
        allowed: &IdFilter,
    ) -> Result<Allocation> {
        let mut logged: BTreeMap<FluxId, BTreeMap<EntityId, Decimal>> = BTreeMap::new();
        for log in logs {
            *logged
                .entry(log.flux_id)
                .or_default()
                .entry(key.log_id(log))
                .or_insert(Decimal::ZERO) += log.value;
        }

        let mut allocation = Allocation::new();
        for (flux_id, categories) in logged {
            let flux = self
                .fluxes
                .get(&flux_id)
                .ok_or(FluxAllocError::MissingFlux(flux_id))?;
            if flux.payment_structure == PaymentStructure::FixedSum {
                continue;
            }

            let mut total: Decimal = categories.values().copied().sum();
            if flux.is_subscription() && total < flux.billed_value {
                debug!(
                    "Flux {} logged {} below its subscription value {}",
                    flux_id, total, flux.billed_value
                );
                total = flux.billed_value;
            }

            allocation.amounts.touch_month(flux.invoice_month);
            for (category_id, value) in categories {
                if !allowed.contains(category_id) {
                    continue;
                }
                let percentage = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    value / total
                };
                allocation.add(flux.invoice_month, category_id, flux.billed_value * percentage);
            }
        }

        Ok(allocation)
    }
}

/// Aggregates invoice rows by a wholesale-billed dimension
pub struct BilledValueAllocator<'a> {
    rows: &'a [InvoiceRow],
}

impl<'a> BilledValueAllocator<'a> {
    pub fn new(rows: &'a [InvoiceRow]) -> Self {
        Self { rows }
    }

    /// Sum invoice rows carrying `key` by month and id
    ///
    /// # Errors
    ///
    /// [`FluxAllocError::UnsupportedCategory`] for dimensions invoice rows do
    /// not carry (user, activity).
    pub fn allocate(&self, key: CategoryKey, allowed: &IdFilter) -> Result<Allocation> {
        if !key.is_billed_wholesale() {
            return Err(FluxAllocError::UnsupportedCategory(key.to_string()));
        }

        let mut allocation = Allocation::new();
        for row in self.rows {
            let Some(category_id) = key.row_id(row) else {
                continue;
            };
            if allowed.contains(category_id) {
                allocation.add(row.invoice_month, category_id, row.billed_value);
            }
        }
        Ok(allocation)
    }
}
