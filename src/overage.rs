//! Subscription overage split
//!
//! Monthly subscriptions bill an included-hours allotment at a flat fee and
//! any overage at the users' own rates. Before category allocation, every
//! subscription flux's logs are revalued: minutes inside the allotment at a
//! rate scaled to the included value, minutes beyond it at the log's own
//! rate, with the log that straddles the boundary split across both.
//!
//! This stage is pure. [`SubscriptionOverageSplitter::adjust_worklogs`]
//! returns new [`WorkLog`] values and never touches its input.

use fluxalloc_core::error::{FluxAllocError, Result};
use fluxalloc_core::provider::ErrorReporter;
use fluxalloc_core::types::{BilledFlux, CurrencyCode, FluxId, MINUTES_PER_HOUR, WorkLog};
use fluxalloc_valuation::ValueCalculator;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Context string sent to the [`ErrorReporter`] when a flux fails
pub const OVERAGE_ERROR_CONTEXT: &str = "subscription overage split";

/// Worklogs after the overage stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustedWorklogs {
    logs: Vec<WorkLog>,
    failed_fluxes: Vec<FluxId>,
}

impl AdjustedWorklogs {
    /// Logs in their original order
    pub fn logs(&self) -> &[WorkLog] {
        &self.logs
    }

    pub fn into_logs(self) -> Vec<WorkLog> {
        self.logs
    }

    /// Fluxes whose logs kept their base values because revaluation failed
    pub fn failed_fluxes(&self) -> &[FluxId] {
        &self.failed_fluxes
    }
}

/// Revalues subscription flux logs around the included-hours boundary
#[derive(Debug, Clone)]
pub struct SubscriptionOverageSplitter {
    calculator: Arc<ValueCalculator>,
    currency: CurrencyCode,
}

impl SubscriptionOverageSplitter {
    pub fn new(calculator: Arc<ValueCalculator>, currency: CurrencyCode) -> Self {
        Self {
            calculator,
            currency,
        }
    }

    /// Derive the adjusted view of `logs`
    ///
    /// Logs of non-subscription fluxes, and logs whose flux is missing from
    /// `fluxes`, pass through unchanged. A failing flux is reported to
    /// `reporter` and its logs keep their base values; the other fluxes are
    /// still processed.
    pub fn adjust_worklogs(
        &self,
        logs: &[WorkLog],
        fluxes: &BTreeMap<FluxId, BilledFlux>,
        reporter: &dyn ErrorReporter,
    ) -> AdjustedWorklogs {
        let (adjusted, failures) = self.adjust(logs, fluxes);
        for (_, err) in &failures {
            reporter.report(OVERAGE_ERROR_CONTEXT, err);
        }
        adjusted
    }

    /// Derive the project-filtered and all-projects views together
    ///
    /// A flux failing in both views is reported once.
    pub fn adjust_worklog_views(
        &self,
        filtered: &[WorkLog],
        all_projects: &[WorkLog],
        fluxes: &BTreeMap<FluxId, BilledFlux>,
        reporter: &dyn ErrorReporter,
    ) -> (AdjustedWorklogs, AdjustedWorklogs) {
        let (filtered, filtered_failures) = self.adjust(filtered, fluxes);
        let (all_projects, all_failures) = self.adjust(all_projects, fluxes);

        let mut reported = BTreeSet::new();
        for (flux_id, err) in filtered_failures.iter().chain(&all_failures) {
            if reported.insert(*flux_id) {
                reporter.report(OVERAGE_ERROR_CONTEXT, err);
            }
        }

        (filtered, all_projects)
    }

    fn adjust(
        &self,
        logs: &[WorkLog],
        fluxes: &BTreeMap<FluxId, BilledFlux>,
    ) -> (AdjustedWorklogs, Vec<(FluxId, FluxAllocError)>) {
        let mut positions: BTreeMap<FluxId, Vec<usize>> = BTreeMap::new();
        for (index, log) in logs.iter().enumerate() {
            positions.entry(log.flux_id).or_default().push(index);
        }

        let mut adjusted = logs.to_vec();
        let mut failed_fluxes = Vec::new();
        let mut failures = Vec::new();

        for (flux_id, indices) in positions {
            let Some(flux) = fluxes.get(&flux_id) else {
                continue;
            };
            if !flux.is_subscription() {
                continue;
            }

            let flux_logs: Vec<WorkLog> = indices.iter().map(|&i| logs[i].clone()).collect();
            match self.split_flux(&flux_logs, flux) {
                Ok(split) => {
                    for (index, log) in indices.into_iter().zip(split) {
                        adjusted[index] = log;
                    }
                }
                Err(err) => {
                    failed_fluxes.push(flux_id);
                    failures.push((flux_id, err));
                }
            }
        }

        let adjusted = AdjustedWorklogs {
            logs: adjusted,
            failed_fluxes,
        };
        (adjusted, failures)
    }

    /// Multiplier turning the users' rates into the included hourly rate
    ///
    /// Walks `logs` in order until the allotment is used up, counting only
    /// the included (possibly fractional) minutes of the log that straddles
    /// it. Returns 1 when the flux has no allotment and 0
    /// when nothing was accumulated.
    pub fn included_rate_ratio(&self, logs: &[WorkLog], flux: &BilledFlux) -> Result<Decimal> {
        if flux.project_hours.is_zero() {
            return Ok(Decimal::ONE);
        }

        let included_minutes = flux.included_minutes();
        let included_hourly_rate = flux.included_value() / flux.project_hours;

        let mut total_minutes = Decimal::ZERO;
        let mut total_value = Decimal::ZERO;
        for log in logs {
            let minutes = Decimal::from(log.billed_time);
            if total_minutes + minutes <= included_minutes {
                total_minutes += minutes;
                total_value += self.calculator.log_value(log, &self.currency)?;
                continue;
            }

            let remaining = included_minutes - total_minutes;
            if remaining > Decimal::ZERO {
                total_minutes += remaining;
                total_value += self
                    .calculator
                    .value_for_minutes(log, remaining, &self.currency)?;
            }
            break;
        }

        if total_minutes.is_zero() || total_value.is_zero() {
            return Ok(Decimal::ZERO);
        }

        Ok(included_hourly_rate * (total_minutes / MINUTES_PER_HOUR) / total_value)
    }

    /// Revalue one subscription flux's logs
    pub fn split_flux(&self, logs: &[WorkLog], flux: &BilledFlux) -> Result<Vec<WorkLog>> {
        let ratio = self.included_rate_ratio(logs, flux)?;
        let included_minutes = flux.included_minutes();
        debug!("Flux {} included rate ratio {}", flux.id, ratio);

        let mut validated = Decimal::ZERO;
        let mut exceeded = false;
        let mut split = Vec::with_capacity(logs.len());

        for log in logs {
            let mut log = log.clone();
            if !log.is_billable() {
                split.push(log);
                continue;
            }

            validated += Decimal::from(log.validated_minutes());
            if validated <= included_minutes {
                log.rate *= ratio;
                log.value = self.calculator.log_value(&log, &self.currency)?;
                split.push(log);
                continue;
            }

            log.value = self.calculator.log_value(&log, &self.currency)?;
            if !exceeded {
                exceeded = true;
                if log.custom_value.is_none() {
                    log.value = self.boundary_value(&log, ratio, validated - included_minutes)?;
                    debug!(
                        "Split log of user {} at the allotment boundary of flux {}",
                        log.user_id, flux.id
                    );
                }
            }
            split.push(log);
        }

        Ok(split)
    }

    /// Value of the log crossing the boundary: the in-allotment minutes at
    /// `rate × ratio`, the overage minutes at `rate`
    fn boundary_value(&self, log: &WorkLog, ratio: Decimal, over_minutes: Decimal) -> Result<Decimal> {
        let initial_minutes = (Decimal::from(log.billed_time) - over_minutes).max(Decimal::ZERO);
        let first = log.rate * ratio * initial_minutes / MINUTES_PER_HOUR;
        let second = log.rate * over_minutes / MINUTES_PER_HOUR;

        self.calculator.convert(
            (first + second) * log.exchange_rate,
            log.currency.as_ref(),
            &self.currency,
        )
    }
}
