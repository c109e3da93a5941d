//! fluxalloc - Attribute billed project income and operating costs
//!
//! This library provides functionality to:
//! - Revalue subscription worklogs around their included-hours allotment
//! - Split billed flux values across users, activities, projects and owners
//! - Allocate fixed-sum invoices with and without logged work
//! - Aggregate user and team costs and attribute them to filtered projects
//! - Load all inputs from a JSON snapshot and print JSON reports
//!
//! # Examples
//!
//! ```no_run
//! use fluxalloc::{
//!     category::CategoryKey,
//!     engine::AllocationEngine,
//!     snapshot::{SnapshotLoader, SnapshotRepository},
//! };
//! use fluxalloc_core::{EngineConfig, ReportFilters, TracingReporter};
//! use fluxalloc_valuation::ValueCalculator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> fluxalloc::Result<()> {
//!     let snapshot = SnapshotLoader::discover(None)?.load().await?;
//!     let calculator = Arc::new(ValueCalculator::new(Arc::new(snapshot.rate_table())));
//!     let repository = SnapshotRepository::new(snapshot);
//!
//!     let engine = AllocationEngine::new(
//!         &repository,
//!         ReportFilters::new(),
//!         EngineConfig::default(),
//!         calculator,
//!         &TracingReporter,
//!     )?;
//!     let costs = engine.attributed_costs()?;
//!     let by_project = engine.category_costs_by_logs(CategoryKey::Project);
//!
//!     Ok(())
//! }
//! ```

pub mod category;
pub mod category_income;
pub mod cli;
pub mod costs;
pub mod engine;
pub mod fixed_sum;
pub mod output;
pub mod overage;
pub mod snapshot;

// Re-export core modules
pub use fluxalloc_core::{aggregation_types, config, error, filters, provider, types};

// Re-export commonly used types
pub use category::CategoryKey;
pub use engine::AllocationEngine;
pub use fluxalloc_core::{Allocation, EngineConfig, FluxAllocError, MonthlyAmounts, ReportFilters, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
