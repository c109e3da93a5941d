//! Operating cost aggregation and attribution
//!
//! Raw cost records become per-month user costs ([`UserCostAggregator`]),
//! which are then apportioned to the filtered projects by income share
//! ([`CostAttributor`]) or spread over categories by logged-value share
//! ([`category_costs_by_logs`]).

use crate::category::CategoryKey;
use fluxalloc_core::aggregation_types::{MonthlyAmounts, MonthlyTotals};
use fluxalloc_core::filters::IdFilter;
use fluxalloc_core::types::{CostRecord, EntityId, InvoiceRow, WorkLog};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Turns user and team cost records into per-month user costs
pub struct UserCostAggregator<'a> {
    users_by_team: &'a BTreeMap<EntityId, Vec<EntityId>>,
}

impl<'a> UserCostAggregator<'a> {
    pub fn new(users_by_team: &'a BTreeMap<EntityId, Vec<EntityId>>) -> Self {
        Self { users_by_team }
    }

    /// Aggregate `records` by month and user
    ///
    /// Team costs are divided equally among the team's current members. Teams
    /// that are unknown or empty contribute nothing. A record naming neither a
    /// user nor a team is charged to [`EntityId::UNASSIGNED`]. Only users
    /// accepted by `users` are kept.
    pub fn aggregate(&self, records: &[CostRecord], users: &IdFilter) -> MonthlyAmounts {
        let mut costs = MonthlyAmounts::new();
        for record in records {
            let Some(team_id) = record.team_id else {
                let user_id = EntityId::or_unassigned(record.user_id);
                if users.contains(user_id) {
                    costs.add(record.cost_month, user_id, record.value);
                }
                continue;
            };

            let members = match self.users_by_team.get(&team_id) {
                Some(members) if !members.is_empty() => members,
                Some(_) => {
                    warn!("Team {} has no members, its cost is not attributed", team_id);
                    continue;
                }
                None => {
                    warn!("Team {} is unknown, its cost is not attributed", team_id);
                    continue;
                }
            };

            let share = record.value / Decimal::from(members.len());
            for member in members {
                if users.contains(*member) {
                    costs.add(record.cost_month, *member, share);
                }
            }
        }
        costs
    }
}

/// Apportions user costs between the filtered projects and all projects
#[derive(Debug, Default, Clone, Copy)]
pub struct CostAttributor;

impl CostAttributor {
    pub fn new() -> Self {
        Self
    }

    /// Ratio of a user's monthly cost attributed to the filtered projects
    ///
    /// 1 when the user has no income across all projects (the cost is not
    /// related to any project), otherwise filtered over all-project income,
    /// clamped to [0, 1].
    pub fn cost_ratio(filtered_income: Option<Decimal>, all_income: Option<Decimal>) -> Decimal {
        let all = match all_income {
            Some(all) if !all.is_zero() => all,
            _ => return Decimal::ONE,
        };
        match filtered_income {
            Some(filtered) if filtered > Decimal::ZERO => {
                (filtered / all).clamp(Decimal::ZERO, Decimal::ONE)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Attribute every raw user cost by its cost ratio
    pub fn attribute(
        &self,
        raw_costs: &MonthlyAmounts,
        filtered_income: &MonthlyAmounts,
        all_projects_income: &MonthlyAmounts,
    ) -> MonthlyAmounts {
        let mut attributed = MonthlyAmounts::new();
        for (month, user_id, cost) in raw_costs.entries() {
            let ratio = Self::cost_ratio(
                filtered_income.get(month, user_id),
                all_projects_income.get(month, user_id),
            );
            attributed.add(month, user_id, cost * ratio);
        }
        attributed
    }
}

/// Spread user costs over categories by each user's logged-value share
///
/// For every month and user, a category receives
/// `user cost × category logged value / user logged value`. Users without a
/// cost, or without logged value, contribute nothing.
pub fn category_costs_by_logs(
    logs: &[WorkLog],
    key: CategoryKey,
    user_costs: &MonthlyAmounts,
) -> MonthlyAmounts {
    let mut user_values: BTreeMap<_, BTreeMap<EntityId, (Decimal, BTreeMap<EntityId, Decimal>)>> =
        BTreeMap::new();
    for log in logs {
        let (total, categories) = user_values
            .entry(log.invoice_month)
            .or_default()
            .entry(log.user_id)
            .or_default();
        *total += log.value;
        *categories.entry(key.log_id(log)).or_insert(Decimal::ZERO) += log.value;
    }

    let mut costs = MonthlyAmounts::new();
    for (month, users) in user_values {
        for (user_id, (total, categories)) in users {
            let user_cost = user_costs.get(month, user_id).unwrap_or(Decimal::ZERO);
            for (category_id, value) in categories {
                let share = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    value / total
                };
                costs.add(month, category_id, user_cost * share);
            }
        }
    }
    debug!("Spread user costs over {} months by {}", costs.months().count(), key);
    costs
}

/// Company-wide income and costs per month
///
/// Income is every invoice row's billed value, costs the sum of the
/// per-user monthly costs.
pub fn totals_by_month(rows: &[InvoiceRow], user_costs: &MonthlyAmounts) -> MonthlyTotals {
    let mut totals = MonthlyTotals::default();
    for row in rows {
        *totals
            .income
            .entry(row.invoice_month)
            .or_insert(Decimal::ZERO) += row.billed_value;
    }
    totals.costs = user_costs.month_totals();
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxalloc_core::types::{BillingMonth, BillingType, FluxId, InvoiceRowType};
    use rust_decimal_macros::dec;

    fn month(m: u32) -> BillingMonth {
        BillingMonth::from_ym(2024, m).unwrap()
    }

    fn user_cost(user: i64, value: Decimal) -> CostRecord {
        CostRecord {
            user_id: Some(EntityId::new(user)),
            team_id: None,
            cost_month: month(1),
            value,
        }
    }

    fn team_cost(team: i64, value: Decimal) -> CostRecord {
        CostRecord {
            user_id: None,
            team_id: Some(EntityId::new(team)),
            cost_month: month(1),
            value,
        }
    }

    fn teams() -> BTreeMap<EntityId, Vec<EntityId>> {
        let mut teams = BTreeMap::new();
        teams.insert(
            EntityId::new(1),
            vec![EntityId::new(10), EntityId::new(11), EntityId::new(12)],
        );
        teams.insert(EntityId::new(2), Vec::new());
        teams
    }

    #[test]
    fn test_team_cost_split_equally() {
        let teams = teams();
        let costs = UserCostAggregator::new(&teams)
            .aggregate(&[team_cost(1, dec!(300)), user_cost(10, dec!(50))], &IdFilter::All);

        assert_eq!(costs.get(month(1), EntityId::new(10)), Some(dec!(150)));
        assert_eq!(costs.get(month(1), EntityId::new(11)), Some(dec!(100)));
        assert_eq!(costs.get(month(1), EntityId::new(12)), Some(dec!(100)));
    }

    #[test]
    fn test_empty_and_unknown_teams_contribute_nothing() {
        let teams = teams();
        let costs = UserCostAggregator::new(&teams)
            .aggregate(&[team_cost(2, dec!(300)), team_cost(9, dec!(300))], &IdFilter::All);
        assert!(costs.is_empty());
        assert_eq!(costs.total(), Decimal::ZERO);
    }

    #[test]
    fn test_record_without_owner_is_unassigned() {
        let teams = teams();
        let record = CostRecord {
            user_id: None,
            team_id: None,
            cost_month: month(1),
            value: dec!(20),
        };
        let costs = UserCostAggregator::new(&teams).aggregate(&[record], &IdFilter::All);
        assert_eq!(costs.get(month(1), EntityId::UNASSIGNED), Some(dec!(20)));
    }

    #[test]
    fn test_user_filter_applies_after_team_split() {
        let teams = teams();
        let costs = UserCostAggregator::new(&teams).aggregate(
            &[team_cost(1, dec!(300))],
            &IdFilter::only([EntityId::new(11)]),
        );
        assert_eq!(costs.total(), dec!(100));
    }

    #[test]
    fn test_cost_ratio_fallbacks() {
        assert_eq!(CostAttributor::cost_ratio(None, None), Decimal::ONE);
        assert_eq!(
            CostAttributor::cost_ratio(Some(dec!(50)), Some(Decimal::ZERO)),
            Decimal::ONE
        );
        assert_eq!(CostAttributor::cost_ratio(None, Some(dec!(100))), Decimal::ZERO);
        assert_eq!(
            CostAttributor::cost_ratio(Some(dec!(-5)), Some(dec!(100))),
            Decimal::ZERO
        );
        assert_eq!(
            CostAttributor::cost_ratio(Some(dec!(25)), Some(dec!(100))),
            dec!(0.25)
        );
        assert_eq!(
            CostAttributor::cost_ratio(Some(dec!(200)), Some(dec!(100))),
            Decimal::ONE
        );
    }

    #[test]
    fn test_attribute_costs() {
        let mut raw = MonthlyAmounts::new();
        raw.add(month(1), EntityId::new(1), dec!(1000));
        raw.add(month(1), EntityId::new(2), dec!(400));

        let mut filtered = MonthlyAmounts::new();
        filtered.add(month(1), EntityId::new(1), dec!(30));
        let mut all = MonthlyAmounts::new();
        all.add(month(1), EntityId::new(1), dec!(120));

        let attributed = CostAttributor::new().attribute(&raw, &filtered, &all);
        assert_eq!(attributed.get(month(1), EntityId::new(1)), Some(dec!(250)));
        // no income anywhere: full cost
        assert_eq!(attributed.get(month(1), EntityId::new(2)), Some(dec!(400)));
    }

    fn log(user: i64, project: i64, value: Decimal) -> WorkLog {
        WorkLog {
            flux_id: FluxId::new(1),
            project_id: EntityId::new(project),
            user_id: EntityId::new(user),
            activity_id: None,
            owner_id: None,
            invoice_month: month(1),
            billing_type: BillingType::Billable,
            billed_time: 60,
            billable: None,
            rate: value,
            exchange_rate: Decimal::ONE,
            currency: None,
            custom_value: None,
            included_in_value: false,
            value,
        }
    }

    #[test]
    fn test_category_costs_by_logs() {
        let logs = vec![
            log(1, 100, dec!(30)),
            log(1, 200, dec!(10)),
            log(2, 100, dec!(0)),
            log(3, 200, dec!(5)),
        ];
        let mut user_costs = MonthlyAmounts::new();
        user_costs.add(month(1), EntityId::new(1), dec!(400));
        user_costs.add(month(1), EntityId::new(2), dec!(999));

        let costs = category_costs_by_logs(&logs, CategoryKey::Project, &user_costs);
        assert_eq!(costs.get(month(1), EntityId::new(100)), Some(dec!(300)));
        assert_eq!(costs.get(month(1), EntityId::new(200)), Some(dec!(100)));

        let by_owner = category_costs_by_logs(&logs, CategoryKey::Owner, &user_costs);
        assert_eq!(by_owner.get(month(1), EntityId::UNASSIGNED), Some(dec!(400)));
    }

    #[test]
    fn test_totals_by_month() {
        let rows = vec![
            InvoiceRow {
                project_id: Some(EntityId::new(1)),
                owner_id: None,
                billed_value: dec!(100),
                invoice_month: month(1),
                row_type: InvoiceRowType::Hourly,
            },
            InvoiceRow {
                project_id: None,
                owner_id: Some(EntityId::new(2)),
                billed_value: dec!(40),
                invoice_month: month(2),
                row_type: InvoiceRowType::Subscription,
            },
        ];
        let mut costs = MonthlyAmounts::new();
        costs.add(month(1), EntityId::new(1), dec!(10));
        costs.add(month(1), EntityId::new(2), dec!(15));

        let totals = totals_by_month(&rows, &costs);
        assert_eq!(totals.income[&month(1)], dec!(100));
        assert_eq!(totals.income[&month(2)], dec!(40));
        assert_eq!(totals.costs[&month(1)], dec!(25));
        assert_eq!(totals.total_income(), dec!(140));
    }
}
