//! Fixed-sum project income
//!
//! Fixed-sum invoices are not tied to logged value, so they are allocated to
//! users separately from [`crate::category_income`]:
//!
//! - projects with logged work split the invoice by each user's logged-value
//!   share, after scaling it by how much of the project's hours were logged;
//! - projects without logged work split it over their assigned roster by
//!   hourly rate.

use fluxalloc_core::aggregation_types::{Allocation, MonthlyAmounts};
use fluxalloc_core::error::Result;
use fluxalloc_core::types::{
    CurrencyCode, EntityId, FixedSumProject, InvoiceRow, InvoiceRowType, MINUTES_PER_HOUR,
    UserRate, WorkLog,
};
use fluxalloc_valuation::ValueCalculator;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Allocates fixed-sum invoices of projects that have logs
pub struct FixedSumWithLogsAllocator<'a> {
    rows: &'a [InvoiceRow],
    projects: &'a BTreeMap<EntityId, FixedSumProject>,
}

impl<'a> FixedSumWithLogsAllocator<'a> {
    pub fn new(rows: &'a [InvoiceRow], projects: &'a BTreeMap<EntityId, FixedSumProject>) -> Self {
        Self { rows, projects }
    }

    /// Share of each project's hours covered by logged time, in [0, 1]
    ///
    /// Forced to 1 for projects without an hours budget, without logged
    /// minutes, or that bill extra hours without weighting logs.
    pub fn logged_time_ratios(&self, logs: &[WorkLog]) -> BTreeMap<EntityId, Decimal> {
        let mut logged_minutes: BTreeMap<EntityId, Decimal> = BTreeMap::new();
        for log in logs {
            if self.projects.contains_key(&log.project_id) {
                *logged_minutes.entry(log.project_id).or_insert(Decimal::ZERO) +=
                    Decimal::from(log.billed_time);
            }
        }

        logged_minutes
            .into_iter()
            .filter_map(|(project_id, minutes)| {
                let project = self.projects.get(&project_id)?;
                let ratio = if project.project_hours.is_zero()
                    || minutes.is_zero()
                    || project.ignores_logged_time()
                {
                    Decimal::ONE
                } else {
                    (minutes / MINUTES_PER_HOUR / project.project_hours).min(Decimal::ONE)
                };
                Some((project_id, ratio))
            })
            .collect()
    }

    /// Income per month and user from fixed-sum projects with logs
    pub fn allocate(&self, logs: &[WorkLog]) -> Allocation {
        let ratios = self.logged_time_ratios(logs);

        let mut project_income: BTreeMap<_, BTreeMap<EntityId, Decimal>> = BTreeMap::new();
        for row in self.rows {
            let Some(project_id) = row.project_id else {
                continue;
            };
            if !self.projects.contains_key(&project_id) {
                continue;
            }
            let ratio = ratios.get(&project_id).copied().unwrap_or(Decimal::ONE);
            *project_income
                .entry(row.invoice_month)
                .or_default()
                .entry(project_id)
                .or_insert(Decimal::ZERO) += row.billed_value * ratio;
        }

        let user_ratios = self.user_ratios(logs);

        let mut allocation = Allocation::new();
        for (month, projects) in project_income {
            for (project_id, income) in projects {
                let Some(users) = user_ratios.get(&project_id) else {
                    continue;
                };
                for (user_id, ratio) in users {
                    allocation.add(month, *user_id, *ratio * income);
                }
            }
        }
        allocation
    }

    /// Logged-value share of each user per project, equal split when the
    /// project's logged value is zero
    pub fn user_ratios(&self, logs: &[WorkLog]) -> BTreeMap<EntityId, BTreeMap<EntityId, Decimal>> {
        let mut user_values: BTreeMap<EntityId, BTreeMap<EntityId, Decimal>> = BTreeMap::new();
        for log in logs {
            if !self.projects.contains_key(&log.project_id) {
                continue;
            }
            let value = if log.included_in_value {
                log.value
            } else {
                log.raw_rate_value()
            };
            *user_values
                .entry(log.project_id)
                .or_default()
                .entry(log.user_id)
                .or_insert(Decimal::ZERO) += value;
        }

        user_values
            .into_iter()
            .map(|(project_id, users)| {
                let total: Decimal = users.values().copied().sum();
                let user_count = Decimal::from(users.len());
                let ratios = users
                    .into_iter()
                    .map(|(user_id, value)| {
                        let ratio = if total.is_zero() {
                            Decimal::ONE / user_count
                        } else {
                            value / total
                        };
                        (user_id, ratio)
                    })
                    .collect();
                debug!("Fixed-sum project {} user ratios computed", project_id);
                (project_id, ratios)
            })
            .collect()
    }
}

/// Allocates fixed-sum invoices of projects without logs over their roster
pub struct FixedSumNoLogsAllocator<'a> {
    rows: &'a [InvoiceRow],
    rosters: &'a BTreeMap<EntityId, Vec<UserRate>>,
    calculator: &'a ValueCalculator,
    currency: &'a CurrencyCode,
}

impl<'a> FixedSumNoLogsAllocator<'a> {
    pub fn new(
        rows: &'a [InvoiceRow],
        rosters: &'a BTreeMap<EntityId, Vec<UserRate>>,
        calculator: &'a ValueCalculator,
        currency: &'a CurrencyCode,
    ) -> Self {
        Self {
            rows,
            rosters,
            calculator,
            currency,
        }
    }

    /// Income per month and user, split by hourly rate
    ///
    /// Only fixed-sum invoice rows count. Users' rates are converted into the
    /// configured currency first; a roster whose rates sum to zero is split
    /// equally, an empty roster is skipped.
    ///
    /// # Errors
    ///
    /// Propagates exchange failures while normalizing rates.
    pub fn allocate(&self) -> Result<Allocation> {
        let mut project_values = MonthlyAmounts::new();
        for row in self.rows {
            if row.row_type != InvoiceRowType::FixedSum {
                continue;
            }
            let Some(project_id) = row.project_id else {
                continue;
            };
            if self.rosters.contains_key(&project_id) {
                project_values.add(row.invoice_month, project_id, row.billed_value);
            }
        }

        let billed_projects = project_values.category_totals();
        let mut normalized: BTreeMap<EntityId, Vec<(EntityId, Decimal)>> = BTreeMap::new();
        for (project_id, roster) in self.rosters {
            if !billed_projects.contains_key(project_id) {
                continue;
            }
            let rates = roster
                .iter()
                .map(|user| {
                    let rate = self
                        .calculator
                        .convert(user.rate, user.currency.as_ref(), self.currency)?;
                    Ok((user.user_id, rate))
                })
                .collect::<Result<Vec<_>>>()?;
            normalized.insert(*project_id, rates);
        }

        let mut allocation = Allocation::new();
        for (month, project_id, billed_value) in project_values.entries() {
            let Some(rates) = normalized.get(&project_id) else {
                continue;
            };
            if rates.is_empty() {
                warn!("Fixed-sum project {} has no assigned users, skipping", project_id);
                continue;
            }

            let total_rate: Decimal = rates.iter().map(|(_, rate)| *rate).sum();
            let equal_share = Decimal::ONE / Decimal::from(rates.len());
            for (user_id, rate) in rates {
                let ratio = if total_rate > Decimal::ZERO {
                    *rate / total_rate
                } else {
                    equal_share
                };
                allocation.add(month, *user_id, ratio * billed_value);
            }
        }
        Ok(allocation)
    }
}
