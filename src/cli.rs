//! CLI interface for fluxalloc
//!
//! This module defines the command-line interface using clap. Filters and the
//! reporting currency are global flags shared by every report.
//!
//! # Example
//!
//! ```bash
//! # Income per user for two projects in the first quarter
//! fluxalloc income --by user --projects 12,14 --since 2024-01 --until 2024-03
//!
//! # Costs attributed to the filtered projects
//! fluxalloc costs --projects 12
//!
//! # Invoiced value per owner
//! fluxalloc billed --by owner
//! ```

use crate::category::CategoryKey;
use clap::{Parser, Subcommand};
use fluxalloc_core::error::Result;
use fluxalloc_core::filters::{IdFilter, ReportFilters};
use fluxalloc_core::types::{BillingMonth, EntityId};
use std::path::PathBuf;

/// Attribute billed income and operating costs to categories
#[derive(Parser, Debug, Clone)]
#[command(name = "fluxalloc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Snapshot file to read (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Currency every amount is reported in
    #[arg(long, env = "FLUXALLOC_CURRENCY", global = true)]
    pub currency: Option<String>,

    /// Restrict to these project ids (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub projects: Option<Vec<EntityId>>,

    /// Restrict to these user ids (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub users: Option<Vec<EntityId>>,

    /// First month included (YYYY-MM or YYYY-MM-DD)
    #[arg(long, global = true)]
    pub since: Option<String>,

    /// Last month included (YYYY-MM or YYYY-MM-DD)
    #[arg(long, global = true)]
    pub until: Option<String>,

    /// Only show warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    pub compact: bool,

    /// Report to produce
    #[command(subcommand)]
    pub command: Command,
}

/// Available reports
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Company-wide income and costs per month
    Totals,

    /// Flux income split by logged-value share
    Income {
        /// Category to split by
        #[arg(long, value_enum, default_value = "user")]
        by: CategoryKey,

        /// Add fixed-sum project income (user category only)
        #[arg(long)]
        with_fixed_sum: bool,
    },

    /// Invoiced value per project or owner
    Billed {
        /// Category to aggregate by
        #[arg(long, value_enum, default_value = "project")]
        by: CategoryKey,
    },

    /// User costs
    Costs {
        /// Report raw costs instead of the share attributed to the filtered projects
        #[arg(long)]
        raw: bool,
    },

    /// User costs spread over a category by logged-value share
    CategoryCosts {
        /// Category to spread costs over
        #[arg(long, value_enum, default_value = "project")]
        by: CategoryKey,
    },
}

impl Cli {
    /// Build report filters from the global flags
    pub fn report_filters(&self) -> Result<ReportFilters> {
        let mut filters = ReportFilters {
            projects: IdFilter::from_ids(self.projects.clone()),
            users: IdFilter::from_ids(self.users.clone()),
            ..ReportFilters::default()
        };
        if let Some(since) = &self.since {
            filters = filters.with_since(parse_month_filter(since)?);
        }
        if let Some(until) = &self.until {
            filters = filters.with_until(parse_month_filter(until)?);
        }
        Ok(filters)
    }
}

/// Parse a month filter argument
///
/// # Examples
///
/// ```
/// use fluxalloc::cli::parse_month_filter;
///
/// let month = parse_month_filter("2024-01-15").unwrap();
/// assert_eq!(month.to_string(), "2024-01");
/// assert!(parse_month_filter("2024-13").is_err());
/// ```
pub fn parse_month_filter(month_str: &str) -> Result<BillingMonth> {
    month_str.parse()
}
