//! Report filters
//!
//! Filters are fixed when the engine is built. They restrict which projects
//! and users take part in an allocation and which months are considered.
//!
//! # Examples
//!
//! ```
//! use fluxalloc_core::filters::{IdFilter, ReportFilters};
//! use fluxalloc_core::types::{BillingMonth, EntityId};
//!
//! let filters = ReportFilters::new()
//!     .with_projects([EntityId::new(1), EntityId::new(2)])
//!     .with_since(BillingMonth::from_ym(2024, 1).unwrap());
//!
//! assert!(filters.projects.contains(EntityId::new(1)));
//! assert!(!filters.projects.contains(EntityId::new(3)));
//! assert!(filters.users.contains(EntityId::new(99)));
//! ```

use crate::types::{BillingMonth, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Allowed set of ids for one dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdFilter {
    /// No restriction
    #[default]
    All,
    /// Only these ids
    Only(BTreeSet<EntityId>),
}

impl IdFilter {
    pub fn only(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self::Only(ids.into_iter().collect())
    }

    /// `None` means unrestricted
    pub fn from_ids(ids: Option<Vec<EntityId>>) -> Self {
        match ids {
            Some(ids) => Self::only(ids),
            None => Self::All,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&id),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Members of `ids` allowed by this filter
    pub fn intersect<'a>(&self, ids: impl IntoIterator<Item = &'a EntityId>) -> BTreeSet<EntityId> {
        ids.into_iter().copied().filter(|id| self.contains(*id)).collect()
    }
}

/// Filter configuration for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    /// Projects considered "filtered"
    #[serde(default)]
    pub projects: IdFilter,
    /// Users whose income is reported
    #[serde(default)]
    pub users: IdFilter,
    /// First month included
    #[serde(default)]
    pub since: Option<BillingMonth>,
    /// Last month included
    #[serde(default)]
    pub until: Option<BillingMonth>,
}

impl ReportFilters {
    /// Create a new filter with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(mut self, projects: impl IntoIterator<Item = EntityId>) -> Self {
        self.projects = IdFilter::only(projects);
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = EntityId>) -> Self {
        self.users = IdFilter::only(users);
        self
    }

    pub fn with_since(mut self, month: BillingMonth) -> Self {
        self.since = Some(month);
        self
    }

    pub fn with_until(mut self, month: BillingMonth) -> Self {
        self.until = Some(month);
        self
    }

    /// Check whether `month` lies in the configured range (inclusive)
    pub fn includes_month(&self, month: BillingMonth) -> bool {
        if let Some(since) = self.since {
            if month < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if month > until {
                return false;
            }
        }
        true
    }
}
