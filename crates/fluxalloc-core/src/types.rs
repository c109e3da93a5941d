//! Core domain types for fluxalloc
//!
//! This module contains the records the allocation engine consumes: billed
//! fluxes, worklogs, invoice rows, cost records, and the fixed-sum project
//! descriptors. Identifiers and months are strongly typed so that the
//! per-month, per-category maps built from them stay ordered and comparable.

use chrono::{Datelike, NaiveDate};
use derive_more::{Display, From};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::FluxAllocError;

/// Minutes in one billed hour
pub const MINUTES_PER_HOUR: Decimal = dec!(60);

/// Opaque category identifier (user, project, owner, activity, team)
///
/// Absent identifiers are normalized to [`EntityId::UNASSIGNED`] so that
/// unassigned work still lands in a bucket of its own.
///
/// # Examples
/// ```
/// use fluxalloc_core::types::EntityId;
///
/// let user = EntityId::new(7);
/// assert_eq!(user.to_string(), "7");
/// assert_eq!(EntityId::or_unassigned(None), EntityId::UNASSIGNED);
/// ```
#[derive(
    Debug,
    Display,
    From,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// Bucket for records whose category id is empty
    pub const UNASSIGNED: EntityId = EntityId(-1);

    /// Create a new EntityId
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Normalize an optional id, mapping `None` to the unassigned bucket
    pub fn or_unassigned(id: Option<EntityId>) -> Self {
        id.unwrap_or(Self::UNASSIGNED)
    }
}

impl FromStr for EntityId {
    type Err = FluxAllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| FluxAllocError::InvalidArgument(format!("invalid id '{s}'")))
    }
}

/// Strongly-typed billed flux identifier
#[derive(
    Debug,
    Display,
    From,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct FluxId(i64);

impl FluxId {
    /// Create a new FluxId
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier
    pub fn get(&self) -> i64 {
        self.0
    }
}

/// Calendar month used to bucket income and costs
///
/// Serialized as `YYYY-MM`. Parsing also accepts a full `YYYY-MM-DD` date,
/// which is truncated to its month.
///
/// # Examples
/// ```
/// use fluxalloc_core::types::BillingMonth;
///
/// let month: BillingMonth = "2024-03".parse().unwrap();
/// assert_eq!(month.to_string(), "2024-03");
/// assert_eq!(month, "2024-03-17".parse().unwrap());
/// assert!(month < BillingMonth::from_ym(2024, 4).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BillingMonth(NaiveDate);

impl BillingMonth {
    /// Create from a year and month number (1-12)
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for BillingMonth {
    type Err = FluxAllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| FluxAllocError::InvalidMonth(format!("expected YYYY-MM, got '{s}'")))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| FluxAllocError::InvalidMonth(format!("invalid year in '{s}'")))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| FluxAllocError::InvalidMonth(format!("invalid month in '{s}'")))?;

        Self::from_ym(year, month)
            .ok_or_else(|| FluxAllocError::InvalidMonth(format!("month out of range in '{s}'")))
    }
}

impl Serialize for BillingMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Upper-cased currency code
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// How a project's billing entry is charged
///
/// Serialized in snake case. Parsing is case-insensitive and also accepts
/// the short forms `hourly` and `subscription`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStructure {
    /// Billed per logged time
    HourlyMonthly,
    /// Flat invoiced amount independent of logged time
    FixedSum,
    /// Flat fee covering an included-hours allotment, overage billed separately
    MonthlySubscription,
}

impl fmt::Display for PaymentStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HourlyMonthly => write!(f, "hourly_monthly"),
            Self::FixedSum => write!(f, "fixed_sum"),
            Self::MonthlySubscription => write!(f, "monthly_subscription"),
        }
    }
}

impl FromStr for PaymentStructure {
    type Err = FluxAllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly_monthly" | "hourly" => Ok(Self::HourlyMonthly),
            "fixed_sum" => Ok(Self::FixedSum),
            "monthly_subscription" | "subscription" => Ok(Self::MonthlySubscription),
            _ => Err(FluxAllocError::InvalidArgument(format!(
                "invalid payment structure '{s}'"
            ))),
        }
    }
}

impl Serialize for PaymentStructure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentStructure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Billing classification of a worklog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    #[default]
    Billable,
    NonBillable,
    Internal,
}

/// Kind of invoice line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceRowType {
    #[default]
    Hourly,
    FixedSum,
    Subscription,
}

/// One project's billing entry for a period
///
/// # Examples
/// ```
/// use fluxalloc_core::types::{BillingMonth, BilledFlux, EntityId, FluxId, PaymentStructure};
/// use rust_decimal_macros::dec;
///
/// let flux = BilledFlux {
///     id: FluxId::new(1),
///     project_id: EntityId::new(10),
///     payment_structure: PaymentStructure::MonthlySubscription,
///     billed_value: dec!(1200),
///     billed_extra_value: Some(dec!(200)),
///     invoice_month: BillingMonth::from_ym(2024, 1).unwrap(),
///     project_hours: dec!(10),
/// };
/// assert_eq!(flux.included_value(), dec!(1000));
/// assert_eq!(flux.included_minutes(), dec!(600));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilledFlux {
    pub id: FluxId,
    pub project_id: EntityId,
    pub payment_structure: PaymentStructure,
    pub billed_value: Decimal,
    /// Overage portion of `billed_value`, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_extra_value: Option<Decimal>,
    pub invoice_month: BillingMonth,
    /// Included-hours allotment; zero means no cap
    #[serde(default)]
    pub project_hours: Decimal,
}

impl BilledFlux {
    pub fn is_subscription(&self) -> bool {
        self.payment_structure == PaymentStructure::MonthlySubscription
    }

    pub fn is_fixed_sum(&self) -> bool {
        self.payment_structure == PaymentStructure::FixedSum
    }

    /// Billed value attributable to the included hours
    pub fn included_value(&self) -> Decimal {
        self.billed_value - self.billed_extra_value.unwrap_or(Decimal::ZERO)
    }

    /// Included allotment expressed in minutes
    pub fn included_minutes(&self) -> Decimal {
        self.project_hours * MINUTES_PER_HOUR
    }
}

/// One logged time entry
///
/// `value` is derived: it arrives from the store as a base value and the
/// subscription overage stage may produce adjusted copies with a new
/// `value` (and scaled `rate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub flux_id: FluxId,
    pub project_id: EntityId,
    pub user_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<EntityId>,
    pub invoice_month: BillingMonth,
    #[serde(default)]
    pub billing_type: BillingType,
    /// Logged minutes
    pub billed_time: u32,
    /// Validated minutes overriding `billed_time` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable: Option<u32>,
    /// Hourly rate
    pub rate: Decimal,
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: Decimal,
    /// Currency the exchanged value is expressed in; `None` means the default currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_value: Option<Decimal>,
    #[serde(default)]
    pub included_in_value: bool,
    #[serde(default)]
    pub value: Decimal,
}

fn default_exchange_rate() -> Decimal {
    Decimal::ONE
}

impl WorkLog {
    pub fn is_billable(&self) -> bool {
        self.billing_type == BillingType::Billable
    }

    /// Minutes counted against a subscription allotment
    pub fn validated_minutes(&self) -> u32 {
        self.billable.unwrap_or(self.billed_time)
    }

    /// Value at the log's own rate, before exchange: `rate × minutes / 60`
    pub fn raw_rate_value(&self) -> Decimal {
        self.rate * Decimal::from(self.billed_time) / MINUTES_PER_HOUR
    }
}

/// One invoice line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<EntityId>,
    pub billed_value: Decimal,
    pub invoice_month: BillingMonth,
    #[serde(default)]
    pub row_type: InvoiceRowType,
}

/// Monthly cost attached to a user or to a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<EntityId>,
    pub cost_month: BillingMonth,
    pub value: Decimal,
}

/// Settings of a fixed-sum project that has logged work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSumProject {
    pub project_id: EntityId,
    #[serde(default)]
    pub project_hours: Decimal,
    #[serde(default)]
    pub include_extra_hours: bool,
    #[serde(default)]
    pub logs_relative_value: Decimal,
}

impl FixedSumProject {
    /// Projects that bill extra hours without weighting logs keep the full invoice
    pub fn ignores_logged_time(&self) -> bool {
        self.include_extra_hours && self.logs_relative_value.is_zero()
    }
}

/// A user assigned to a fixed-sum project without logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRate {
    pub user_id: EntityId,
    /// Hourly rate
    pub rate: Decimal,
    /// Currency of `rate`; `None` means the default currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
}
