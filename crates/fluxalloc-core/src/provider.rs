//! Collaborator traits consumed by the allocation engine
//!
//! The engine never talks to a database, an exchange-rate service, or an
//! alerting system directly. It is handed implementations of these traits,
//! reads everything it needs once at construction, and then works on
//! in-memory snapshots.

use crate::error::{FluxAllocError, Result};
use crate::filters::{IdFilter, ReportFilters};
use crate::types::{
    BilledFlux, CostRecord, CurrencyCode, EntityId, FixedSumProject, FluxId, InvoiceRow,
    UserRate, WorkLog,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tracing::error;

/// Read access to billed fluxes, worklogs, invoices and costs
///
/// Implementations apply `filters` the way their store does; the engine only
/// relies on the shapes returned here.
pub trait Repository {
    /// Billed fluxes matching the filters, keyed by flux id
    fn billed_fluxes(&self, filters: &ReportFilters) -> Result<BTreeMap<FluxId, BilledFlux>>;

    /// Every invoice row matching the filters
    fn invoice_rows(&self, filters: &ReportFilters) -> Result<Vec<InvoiceRow>>;

    /// Worklogs billed under `flux_ids`, optionally restricted to `projects`
    fn billed_logs(&self, flux_ids: &[FluxId], projects: &IdFilter) -> Result<Vec<WorkLog>>;

    /// Fixed-sum projects among `project_ids` that have logged work
    fn fixed_sum_projects_with_logs(
        &self,
        project_ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, FixedSumProject>>;

    /// Fixed-sum projects without logged work, with their assigned users
    fn fixed_sum_projects_without_logs(
        &self,
        projects: &IdFilter,
    ) -> Result<BTreeMap<EntityId, Vec<UserRate>>>;

    /// User and team cost records matching the filters
    fn user_and_team_costs(&self, filters: &ReportFilters) -> Result<Vec<CostRecord>>;

    /// Current members of every team
    fn users_by_team(&self) -> Result<BTreeMap<EntityId, Vec<EntityId>>>;
}

/// Currency conversion
pub trait CurrencyExchanger: Send + Sync {
    /// Multiplier converting an amount in `from` into `to`
    fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal>;
}

/// Sink for failures that are isolated instead of aborting a batch
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &FluxAllocError);
}

/// Reports failures through `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, err: &FluxAllocError) {
        error!(context, "{err}");
    }
}

/// Keeps reported failures in memory
///
/// Useful for callers that want to surface isolated failures alongside the
/// results instead of only logging them.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(context, message)` pairs in report order
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &str, error: &FluxAllocError) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((context.to_string(), error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.report("first", &FluxAllocError::MissingFlux(FluxId::new(1)));
        reporter.report(
            "second",
            &FluxAllocError::InvalidArgument("bad".to_string()),
        );

        let reports = reporter.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, "first");
        assert!(reports[1].1.contains("bad"));
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        TracingReporter.report("context", &FluxAllocError::MissingFlux(FluxId::new(3)));
    }
}
