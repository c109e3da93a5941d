//! Category dimensions income and costs are split by
//!
//! Each [`CategoryKey`] variant maps to a field accessor on [`WorkLog`] and,
//! for the dimensions billed wholesale, on [`InvoiceRow`].

use clap::ValueEnum;
use fluxalloc_core::types::{EntityId, InvoiceRow, WorkLog};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension used to split an aggregate value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    User,
    Activity,
    Project,
    Owner,
}

type LogAccessor = fn(&WorkLog) -> Option<EntityId>;
type RowAccessor = fn(&InvoiceRow) -> Option<EntityId>;

fn log_user(log: &WorkLog) -> Option<EntityId> {
    Some(log.user_id)
}

fn log_activity(log: &WorkLog) -> Option<EntityId> {
    log.activity_id
}

fn log_project(log: &WorkLog) -> Option<EntityId> {
    Some(log.project_id)
}

fn log_owner(log: &WorkLog) -> Option<EntityId> {
    log.owner_id
}

fn row_project(row: &InvoiceRow) -> Option<EntityId> {
    row.project_id
}

fn row_owner(row: &InvoiceRow) -> Option<EntityId> {
    row.owner_id
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 4] = [Self::User, Self::Activity, Self::Project, Self::Owner];

    fn log_accessor(self) -> LogAccessor {
        match self {
            Self::User => log_user,
            Self::Activity => log_activity,
            Self::Project => log_project,
            Self::Owner => log_owner,
        }
    }

    fn row_accessor(self) -> Option<RowAccessor> {
        match self {
            Self::Project => Some(row_project),
            Self::Owner => Some(row_owner),
            Self::User | Self::Activity => None,
        }
    }

    /// Category id of a worklog; absent ids land in [`EntityId::UNASSIGNED`]
    pub fn log_id(self, log: &WorkLog) -> EntityId {
        EntityId::or_unassigned((self.log_accessor())(log))
    }

    /// Category id of an invoice row
    ///
    /// `None` when this dimension is not billed on invoice rows or the row
    /// does not carry it.
    pub fn row_id(self, row: &InvoiceRow) -> Option<EntityId> {
        self.row_accessor().and_then(|accessor| accessor(row))
    }

    /// Whether invoice rows carry this dimension
    pub fn is_billed_wholesale(self) -> bool {
        self.row_accessor().is_some()
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Activity => write!(f, "activity"),
            Self::Project => write!(f, "project"),
            Self::Owner => write!(f, "owner"),
        }
    }
}
