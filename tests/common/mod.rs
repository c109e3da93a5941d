//! Common test utilities and helpers for fluxalloc tests
//!
//! This module provides builders for the engine's input records, a snapshot
//! builder, and approximate comparison for decimal amounts.

#![allow(dead_code)]

use fluxalloc::{
    engine::AllocationEngine,
    snapshot::{Snapshot, SnapshotRepository},
};
use fluxalloc_core::{
    EngineConfig, RecordingReporter, ReportFilters,
    types::{
        BilledFlux, BillingMonth, BillingType, CostRecord, CurrencyCode, EntityId,
        FixedSumProject, FluxId, InvoiceRow, InvoiceRowType, PaymentStructure, UserRate, WorkLog,
    },
};
use fluxalloc_valuation::{RateTable, ValueCalculator};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Tolerance used when reconciling sums
pub const TOLERANCE: Decimal = dec!(0.000001);

pub fn month(year: i32, month: u32) -> BillingMonth {
    BillingMonth::from_ym(year, month).unwrap()
}

pub fn jan() -> BillingMonth {
    month(2024, 1)
}

pub fn id(raw: i64) -> EntityId {
    EntityId::new(raw)
}

/// Builder for creating test BilledFlux instances
pub struct FluxBuilder {
    flux: BilledFlux,
}

impl FluxBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            flux: BilledFlux {
                id: FluxId::new(id),
                project_id: EntityId::new(id),
                payment_structure: PaymentStructure::HourlyMonthly,
                billed_value: dec!(100),
                billed_extra_value: None,
                invoice_month: jan(),
                project_hours: Decimal::ZERO,
            },
        }
    }

    pub fn project(mut self, project: i64) -> Self {
        self.flux.project_id = EntityId::new(project);
        self
    }

    pub fn structure(mut self, structure: PaymentStructure) -> Self {
        self.flux.payment_structure = structure;
        self
    }

    pub fn billed(mut self, value: Decimal) -> Self {
        self.flux.billed_value = value;
        self
    }

    pub fn extra(mut self, value: Decimal) -> Self {
        self.flux.billed_extra_value = Some(value);
        self
    }

    pub fn hours(mut self, hours: Decimal) -> Self {
        self.flux.project_hours = hours;
        self
    }

    pub fn month(mut self, month: BillingMonth) -> Self {
        self.flux.invoice_month = month;
        self
    }

    pub fn build(self) -> BilledFlux {
        self.flux
    }
}

/// Builder for creating test WorkLog instances
///
/// `value` defaults to `rate × minutes / 60`, the base value a store would hold.
pub struct WorkLogBuilder {
    log: WorkLog,
    explicit_value: bool,
}

impl WorkLogBuilder {
    pub fn new(flux: i64, user: i64) -> Self {
        Self {
            log: WorkLog {
                flux_id: FluxId::new(flux),
                project_id: EntityId::new(flux),
                user_id: EntityId::new(user),
                activity_id: None,
                owner_id: None,
                invoice_month: jan(),
                billing_type: BillingType::Billable,
                billed_time: 60,
                billable: None,
                rate: dec!(60),
                exchange_rate: Decimal::ONE,
                currency: None,
                custom_value: None,
                included_in_value: false,
                value: Decimal::ZERO,
            },
            explicit_value: false,
        }
    }

    pub fn project(mut self, project: i64) -> Self {
        self.log.project_id = EntityId::new(project);
        self
    }

    pub fn activity(mut self, activity: i64) -> Self {
        self.log.activity_id = Some(EntityId::new(activity));
        self
    }

    pub fn owner(mut self, owner: i64) -> Self {
        self.log.owner_id = Some(EntityId::new(owner));
        self
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.log.billed_time = minutes;
        self
    }

    pub fn rate(mut self, rate: Decimal) -> Self {
        self.log.rate = rate;
        self
    }

    pub fn currency(mut self, code: &str) -> Self {
        self.log.currency = Some(CurrencyCode::new(code));
        self
    }

    pub fn value(mut self, value: Decimal) -> Self {
        self.log.value = value;
        self.explicit_value = true;
        self
    }

    pub fn billing_type(mut self, billing_type: BillingType) -> Self {
        self.log.billing_type = billing_type;
        self
    }

    pub fn month(mut self, month: BillingMonth) -> Self {
        self.log.invoice_month = month;
        self
    }

    pub fn build(mut self) -> WorkLog {
        if !self.explicit_value {
            self.log.value = self.log.raw_rate_value() * self.log.exchange_rate;
        }
        self.log
    }
}

pub fn invoice_row(project: i64, value: Decimal, row_type: InvoiceRowType) -> InvoiceRow {
    InvoiceRow {
        project_id: Some(EntityId::new(project)),
        owner_id: None,
        billed_value: value,
        invoice_month: jan(),
        row_type,
    }
}

pub fn user_cost(user: i64, value: Decimal) -> CostRecord {
    CostRecord {
        user_id: Some(EntityId::new(user)),
        team_id: None,
        cost_month: jan(),
        value,
    }
}

pub fn team_cost(team: i64, value: Decimal) -> CostRecord {
    CostRecord {
        user_id: None,
        team_id: Some(EntityId::new(team)),
        cost_month: jan(),
        value,
    }
}

pub fn fixed_sum_project(project: i64, hours: Decimal) -> FixedSumProject {
    FixedSumProject {
        project_id: EntityId::new(project),
        project_hours: hours,
        include_extra_hours: false,
        logs_relative_value: Decimal::ZERO,
    }
}

pub fn user_rate(user: i64, rate: Decimal) -> UserRate {
    UserRate {
        user_id: EntityId::new(user),
        rate,
        currency: None,
    }
}

pub fn calculator() -> Arc<ValueCalculator> {
    Arc::new(ValueCalculator::new(Arc::new(RateTable::new())))
}

/// Build an engine over `snapshot`, returning the reporter it reported to
pub fn engine(snapshot: Snapshot, filters: ReportFilters) -> (AllocationEngine, RecordingReporter) {
    let calculator = Arc::new(ValueCalculator::new(Arc::new(snapshot.rate_table())));
    let repository = SnapshotRepository::new(snapshot);
    let reporter = RecordingReporter::new();
    let engine = AllocationEngine::new(
        &repository,
        filters,
        EngineConfig::default(),
        calculator,
        &reporter,
    )
    .unwrap();
    (engine, reporter)
}

/// Assert that two decimal amounts are approximately equal
pub fn assert_approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) {
    assert!(
        (a - b).abs() <= tolerance,
        "Values are not approximately equal: {} != {} (tolerance: {})",
        a,
        b,
        tolerance
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklog_builder_base_value() {
        let log = WorkLogBuilder::new(1, 2).minutes(90).rate(dec!(40)).build();
        assert_eq!(log.value, dec!(60));

        let log = WorkLogBuilder::new(1, 2).value(dec!(5)).build();
        assert_eq!(log.value, dec!(5));
    }

    #[test]
    fn test_approx_eq() {
        assert_approx_eq(dec!(1.0), dec!(1.0000001), TOLERANCE);
    }

    #[test]
    #[should_panic(expected = "Values are not approximately equal")]
    fn test_approx_eq_fails() {
        assert_approx_eq(dec!(1.0), dec!(2.0), dec!(0.9));
    }
}
