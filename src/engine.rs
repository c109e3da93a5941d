//! Allocation engine
//!
//! [`AllocationEngine`] reads everything it needs from a [`Repository`] once,
//! derives the subscription-adjusted worklog views, and then answers every
//! income and cost query from those in-memory snapshots.
//!
//! # Examples
//!
//! ```
//! use fluxalloc::category::CategoryKey;
//! use fluxalloc::engine::AllocationEngine;
//! use fluxalloc::snapshot::{Snapshot, SnapshotRepository};
//! use fluxalloc_core::{EngineConfig, IdFilter, ReportFilters, TracingReporter};
//! use fluxalloc_valuation::{RateTable, ValueCalculator};
//! use std::sync::Arc;
//!
//! let repository = SnapshotRepository::new(Snapshot::default());
//! let calculator = Arc::new(ValueCalculator::new(Arc::new(RateTable::new())));
//! let engine = AllocationEngine::new(
//!     &repository,
//!     ReportFilters::new(),
//!     EngineConfig::default(),
//!     calculator,
//!     &TracingReporter,
//! )
//! .unwrap();
//!
//! let income = engine.income_by_logs(CategoryKey::User, &IdFilter::All).unwrap();
//! assert!(income.amounts.is_empty());
//! ```

use crate::category::CategoryKey;
use crate::category_income::{BilledValueAllocator, CategoryIncomeAllocator};
use crate::costs::{self, CostAttributor, UserCostAggregator};
use crate::fixed_sum::{FixedSumNoLogsAllocator, FixedSumWithLogsAllocator};
use crate::overage::{AdjustedWorklogs, SubscriptionOverageSplitter};
use fluxalloc_core::aggregation_types::{Allocation, MonthlyAmounts, MonthlyTotals};
use fluxalloc_core::config::EngineConfig;
use fluxalloc_core::error::Result;
use fluxalloc_core::filters::{IdFilter, ReportFilters};
use fluxalloc_core::provider::{ErrorReporter, Repository};
use fluxalloc_core::types::{
    BilledFlux, CostRecord, EntityId, FixedSumProject, FluxId, InvoiceRow, UserRate, WorkLog,
};
use fluxalloc_valuation::ValueCalculator;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Fixed-sum projects relevant to one project scope
#[derive(Debug, Clone)]
struct FixedSumScope {
    with_logs: BTreeMap<EntityId, FixedSumProject>,
    without_logs: BTreeMap<EntityId, Vec<UserRate>>,
}

impl FixedSumScope {
    fn load<R: Repository + ?Sized>(
        repository: &R,
        billed_projects: &BTreeSet<EntityId>,
        projects: &IdFilter,
    ) -> Result<Self> {
        Ok(Self {
            with_logs: repository.fixed_sum_projects_with_logs(&projects.intersect(billed_projects))?,
            without_logs: repository.fixed_sum_projects_without_logs(projects)?,
        })
    }
}

/// Income and cost allocation over one set of filters
#[derive(Debug)]
pub struct AllocationEngine {
    filters: ReportFilters,
    config: EngineConfig,
    calculator: Arc<ValueCalculator>,
    fluxes: BTreeMap<FluxId, BilledFlux>,
    invoice_rows: Vec<InvoiceRow>,
    filtered_logs: AdjustedWorklogs,
    all_projects_logs: AdjustedWorklogs,
    filtered_fixed_sum: FixedSumScope,
    all_fixed_sum: FixedSumScope,
    cost_records: Vec<CostRecord>,
    users_by_team: BTreeMap<EntityId, Vec<EntityId>>,
}

impl AllocationEngine {
    /// Load every snapshot from `repository` and run the overage stage
    ///
    /// # Errors
    ///
    /// Propagates repository failures. Overage failures are sent to
    /// `reporter` instead and listed by [`Self::overage_failures`].
    pub fn new<R: Repository + ?Sized>(
        repository: &R,
        filters: ReportFilters,
        config: EngineConfig,
        calculator: Arc<ValueCalculator>,
        reporter: &dyn ErrorReporter,
    ) -> Result<Self> {
        let fluxes = repository.billed_fluxes(&filters)?;
        let invoice_rows = repository.invoice_rows(&filters)?;
        let flux_ids: Vec<FluxId> = fluxes.keys().copied().collect();

        let filtered = repository.billed_logs(&flux_ids, &filters.projects)?;
        let all_projects = repository.billed_logs(&flux_ids, &IdFilter::All)?;

        let billed_projects: BTreeSet<EntityId> =
            invoice_rows.iter().filter_map(|row| row.project_id).collect();
        let filtered_fixed_sum = FixedSumScope::load(repository, &billed_projects, &filters.projects)?;
        let all_fixed_sum = FixedSumScope::load(repository, &billed_projects, &IdFilter::All)?;

        let cost_records = repository.user_and_team_costs(&filters)?;
        let users_by_team = repository.users_by_team()?;

        let splitter =
            SubscriptionOverageSplitter::new(calculator.clone(), config.default_currency.clone());
        let (filtered_logs, all_projects_logs) =
            splitter.adjust_worklog_views(&filtered, &all_projects, &fluxes, reporter);

        info!(
            "Loaded {} billed fluxes, {} invoice rows, {} worklogs ({} after project filter)",
            fluxes.len(),
            invoice_rows.len(),
            all_projects_logs.logs().len(),
            filtered_logs.logs().len()
        );

        Ok(Self {
            filters,
            config,
            calculator,
            fluxes,
            invoice_rows,
            filtered_logs,
            all_projects_logs,
            filtered_fixed_sum,
            all_fixed_sum,
            cost_records,
            users_by_team,
        })
    }

    pub fn filters(&self) -> &ReportFilters {
        &self.filters
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Worklogs of the filtered projects after the overage stage
    pub fn filtered_worklogs(&self) -> &[WorkLog] {
        self.filtered_logs.logs()
    }

    /// Worklogs of every project after the overage stage
    pub fn all_projects_worklogs(&self) -> &[WorkLog] {
        self.all_projects_logs.logs()
    }

    /// Fluxes whose overage split failed, in either worklog view
    pub fn overage_failures(&self) -> BTreeSet<FluxId> {
        self.filtered_logs
            .failed_fluxes()
            .iter()
            .chain(self.all_projects_logs.failed_fluxes())
            .copied()
            .collect()
    }

    /// Company-wide income and costs per month
    pub fn totals_by_month(&self) -> MonthlyTotals {
        costs::totals_by_month(&self.invoice_rows, &self.user_costs())
    }

    /// Filtered flux income split by logged-value share
    pub fn income_by_logs(&self, key: CategoryKey, allowed: &IdFilter) -> Result<Allocation> {
        CategoryIncomeAllocator::new(&self.fluxes).allocate(self.filtered_logs.logs(), key, allowed)
    }

    /// Invoice row values by a wholesale-billed dimension
    pub fn income_by_billed_value(&self, key: CategoryKey, allowed: &IdFilter) -> Result<Allocation> {
        BilledValueAllocator::new(&self.invoice_rows).allocate(key, allowed)
    }

    /// User income from filtered fixed-sum projects with logs
    pub fn fixed_sum_income(&self) -> Allocation {
        FixedSumWithLogsAllocator::new(&self.invoice_rows, &self.filtered_fixed_sum.with_logs)
            .allocate(self.filtered_logs.logs())
    }

    /// User income from filtered fixed-sum projects without logs
    pub fn fixed_sum_no_logs_income(&self) -> Result<Allocation> {
        self.no_logs_income(&self.filtered_fixed_sum)
    }

    /// Total user income over the filtered projects
    pub fn user_income(&self) -> Result<Allocation> {
        self.compose_user_income(&self.filtered_logs, &self.filtered_fixed_sum)
    }

    /// Total user income over every project
    pub fn all_projects_user_income(&self) -> Result<Allocation> {
        self.compose_user_income(&self.all_projects_logs, &self.all_fixed_sum)
    }

    /// Raw per-month user costs
    pub fn user_costs(&self) -> MonthlyAmounts {
        UserCostAggregator::new(&self.users_by_team).aggregate(&self.cost_records, &self.filters.users)
    }

    /// User costs apportioned to the filtered projects
    pub fn attributed_costs(&self) -> Result<MonthlyAmounts> {
        let filtered = self.user_income()?;
        let all_projects = self.all_projects_user_income()?;
        Ok(CostAttributor::new().attribute(
            &self.user_costs(),
            &filtered.amounts,
            &all_projects.amounts,
        ))
    }

    /// User costs spread over `key` by logged-value share across all projects
    pub fn category_costs_by_logs(&self, key: CategoryKey) -> MonthlyAmounts {
        costs::category_costs_by_logs(self.all_projects_logs.logs(), key, &self.user_costs())
    }

    fn no_logs_income(&self, scope: &FixedSumScope) -> Result<Allocation> {
        FixedSumNoLogsAllocator::new(
            &self.invoice_rows,
            &scope.without_logs,
            &self.calculator,
            &self.config.default_currency,
        )
        .allocate()
    }

    fn compose_user_income(&self, logs: &AdjustedWorklogs, scope: &FixedSumScope) -> Result<Allocation> {
        let by_logs = CategoryIncomeAllocator::new(&self.fluxes).allocate(
            logs.logs(),
            CategoryKey::User,
            &self.filters.users,
        )?;
        let fixed_sum =
            FixedSumWithLogsAllocator::new(&self.invoice_rows, &scope.with_logs).allocate(logs.logs());
        let no_logs = self.no_logs_income(scope)?;

        let income = by_logs.merged(&fixed_sum).merged(&no_logs);
        debug!(
            "User income over {} months from {} contributors",
            income.amounts.months().count(),
            income.contributors.len()
        );
        Ok(income)
    }
}
