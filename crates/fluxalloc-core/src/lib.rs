//! Core types, traits, and configuration for fluxalloc
//!
//! This crate provides the domain records (billed fluxes, worklogs, invoice
//! rows, cost records), the error type, the aggregate result types, engine
//! configuration, and the collaborator traits used by all other fluxalloc
//! crates.

pub mod aggregation_types;
pub mod config;
pub mod error;
pub mod filters;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use aggregation_types::{Allocation, MonthlyAmounts, MonthlyTotals};
pub use config::EngineConfig;
pub use error::{FluxAllocError, Result};
pub use filters::{IdFilter, ReportFilters};
pub use provider::{
    CurrencyExchanger, ErrorReporter, RecordingReporter, Repository, TracingReporter,
};
pub use types::{BillingMonth, CurrencyCode, EntityId, FluxId};
