//! Aggregation data types for fluxalloc
//!
//! Pure data structures returned by the allocators. Every allocator hands back
//! its per-month amounts together with the set of category ids that received
//! a contribution, and callers compose results with [`Allocation::merge`].

use crate::types::{BillingMonth, EntityId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Amounts keyed by month, then by category id
///
/// # Examples
/// ```
/// use fluxalloc_core::aggregation_types::MonthlyAmounts;
/// use fluxalloc_core::types::{BillingMonth, EntityId};
/// use rust_decimal_macros::dec;
///
/// let jan = BillingMonth::from_ym(2024, 1).unwrap();
/// let mut amounts = MonthlyAmounts::new();
/// amounts.add(jan, EntityId::new(1), dec!(10));
/// amounts.add(jan, EntityId::new(1), dec!(5));
/// assert_eq!(amounts.get(jan, EntityId::new(1)), Some(dec!(15)));
/// assert_eq!(amounts.total(), dec!(15));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyAmounts(BTreeMap<BillingMonth, BTreeMap<EntityId, Decimal>>);

impl MonthlyAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `amount` into `month`/`id`
    pub fn add(&mut self, month: BillingMonth, id: EntityId, amount: Decimal) {
        *self
            .0
            .entry(month)
            .or_default()
            .entry(id)
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Make sure `month` exists even if nothing is added to it
    pub fn touch_month(&mut self, month: BillingMonth) {
        self.0.entry(month).or_default();
    }

    pub fn get(&self, month: BillingMonth, id: EntityId) -> Option<Decimal> {
        self.0.get(&month).and_then(|ids| ids.get(&id)).copied()
    }

    pub fn month(&self, month: BillingMonth) -> Option<&BTreeMap<EntityId, Decimal>> {
        self.0.get(&month)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BillingMonth, &BTreeMap<EntityId, Decimal>)> {
        self.0.iter()
    }

    /// Flattened `(month, id, amount)` triples in month then id order
    pub fn entries(&self) -> impl Iterator<Item = (BillingMonth, EntityId, Decimal)> + '_ {
        self.0
            .iter()
            .flat_map(|(month, ids)| ids.iter().map(move |(id, amount)| (*month, *id, *amount)))
    }

    pub fn months(&self) -> impl Iterator<Item = &BillingMonth> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Add every amount of `other` into `self`
    pub fn merge(&mut self, other: &MonthlyAmounts) {
        for (month, id, amount) in other.entries() {
            self.add(month, id, amount);
        }
        for month in other.months() {
            self.touch_month(*month);
        }
    }

    pub fn total(&self) -> Decimal {
        self.entries().map(|(_, _, amount)| amount).sum()
    }

    pub fn month_totals(&self) -> BTreeMap<BillingMonth, Decimal> {
        self.0
            .iter()
            .map(|(month, ids)| (*month, ids.values().copied().sum()))
            .collect()
    }

    /// Total per category id across all months
    pub fn category_totals(&self) -> BTreeMap<EntityId, Decimal> {
        let mut totals = BTreeMap::new();
        for (_, id, amount) in self.entries() {
            *totals.entry(id).or_insert(Decimal::ZERO) += amount;
        }
        totals
    }
}

/// Allocator output: amounts plus the ids that received a contribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub amounts: MonthlyAmounts,
    pub contributors: BTreeSet<EntityId>,
}

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate and record `id` as a contributor
    pub fn add(&mut self, month: BillingMonth, id: EntityId, amount: Decimal) {
        self.amounts.add(month, id, amount);
        self.contributors.insert(id);
    }

    pub fn merge(&mut self, other: &Allocation) {
        self.amounts.merge(&other.amounts);
        self.contributors.extend(other.contributors.iter().copied());
    }

    /// Builder-style merge
    pub fn merged(mut self, other: &Allocation) -> Self {
        self.merge(other);
        self
    }
}

/// Company-wide income and cost totals per month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub income: BTreeMap<BillingMonth, Decimal>,
    pub costs: BTreeMap<BillingMonth, Decimal>,
}

impl MonthlyTotals {
    pub fn total_income(&self) -> Decimal {
        self.income.values().copied().sum()
    }

    pub fn total_costs(&self) -> Decimal {
        self.costs.values().copied().sum()
    }
}
