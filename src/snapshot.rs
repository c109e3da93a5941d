//! JSON snapshot repository
//!
//! A [`Snapshot`] is a single JSON document holding everything the engine
//! reads: billed fluxes, invoice rows, worklogs, fixed-sum project settings
//! and rosters, cost records, team rosters and exchange rates.
//! [`SnapshotRepository`] serves it through the [`Repository`] trait and
//! [`SnapshotLoader`] finds and reads it from disk.
//!
//! # Examples
//!
//! ```no_run
//! use fluxalloc::snapshot::{SnapshotLoader, SnapshotRepository};
//!
//! # async fn example() -> fluxalloc::Result<()> {
//! let loader = SnapshotLoader::discover(None)?;
//! let snapshot = loader.load().await?;
//! let rates = snapshot.rate_table();
//! let repository = SnapshotRepository::new(snapshot);
//! # Ok(())
//! # }
//! ```

use fluxalloc_core::error::{FluxAllocError, Result};
use fluxalloc_core::filters::{IdFilter, ReportFilters};
use fluxalloc_core::provider::Repository;
use fluxalloc_core::types::{
    BilledFlux, CostRecord, EntityId, FixedSumProject, FluxId, InvoiceRow, UserRate, WorkLog,
};
use fluxalloc_valuation::{ExchangeRate, RateTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the snapshot location
pub const SNAPSHOT_ENV: &str = "FLUXALLOC_SNAPSHOT";

/// Everything the engine reads, as one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub fluxes: Vec<BilledFlux>,
    #[serde(default)]
    pub invoice_rows: Vec<InvoiceRow>,
    #[serde(default)]
    pub worklogs: Vec<WorkLog>,
    /// Settings of fixed-sum projects
    #[serde(default)]
    pub fixed_sum_projects: Vec<FixedSumProject>,
    /// Users assigned to fixed-sum projects, by project id
    #[serde(default)]
    pub fixed_sum_rosters: BTreeMap<EntityId, Vec<UserRate>>,
    #[serde(default)]
    pub costs: Vec<CostRecord>,
    /// Current team members, by team id
    #[serde(default)]
    pub teams: BTreeMap<EntityId, Vec<EntityId>>,
    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRate>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Exchange rates of this snapshot as a [`RateTable`]
    pub fn rate_table(&self) -> RateTable {
        RateTable::from_rates(self.exchange_rates.iter().cloned())
    }

    fn logged_projects(&self) -> BTreeSet<EntityId> {
        self.worklogs.iter().map(|log| log.project_id).collect()
    }
}

/// [`Repository`] over an in-memory [`Snapshot`]
///
/// The month range of the filters applies to fluxes, invoice rows and cost
/// records. Project restrictions come from the explicit arguments of each
/// call.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRepository {
    snapshot: Snapshot,
}

impl SnapshotRepository {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Repository for SnapshotRepository {
    fn billed_fluxes(&self, filters: &ReportFilters) -> Result<BTreeMap<FluxId, BilledFlux>> {
        Ok(self
            .snapshot
            .fluxes
            .iter()
            .filter(|flux| filters.includes_month(flux.invoice_month))
            .map(|flux| (flux.id, flux.clone()))
            .collect())
    }

    fn invoice_rows(&self, filters: &ReportFilters) -> Result<Vec<InvoiceRow>> {
        Ok(self
            .snapshot
            .invoice_rows
            .iter()
            .filter(|row| filters.includes_month(row.invoice_month))
            .cloned()
            .collect())
    }

    fn billed_logs(&self, flux_ids: &[FluxId], projects: &IdFilter) -> Result<Vec<WorkLog>> {
        let flux_ids: BTreeSet<FluxId> = flux_ids.iter().copied().collect();
        Ok(self
            .snapshot
            .worklogs
            .iter()
            .filter(|log| flux_ids.contains(&log.flux_id) && projects.contains(log.project_id))
            .cloned()
            .collect())
    }

    fn fixed_sum_projects_with_logs(
        &self,
        project_ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, FixedSumProject>> {
        let logged = self.snapshot.logged_projects();
        Ok(self
            .snapshot
            .fixed_sum_projects
            .iter()
            .filter(|project| {
                project_ids.contains(&project.project_id) && logged.contains(&project.project_id)
            })
            .map(|project| (project.project_id, project.clone()))
            .collect())
    }

    fn fixed_sum_projects_without_logs(
        &self,
        projects: &IdFilter,
    ) -> Result<BTreeMap<EntityId, Vec<UserRate>>> {
        let logged = self.snapshot.logged_projects();
        Ok(self
            .snapshot
            .fixed_sum_rosters
            .iter()
            .filter(|(project_id, _)| projects.contains(**project_id) && !logged.contains(*project_id))
            .map(|(project_id, roster)| (*project_id, roster.clone()))
            .collect())
    }

    fn user_and_team_costs(&self, filters: &ReportFilters) -> Result<Vec<CostRecord>> {
        Ok(self
            .snapshot
            .costs
            .iter()
            .filter(|cost| filters.includes_month(cost.cost_month))
            .cloned()
            .collect())
    }

    fn users_by_team(&self) -> Result<BTreeMap<EntityId, Vec<EntityId>>> {
        Ok(self.snapshot.teams.clone())
    }
}

/// Finds and reads snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    path: PathBuf,
}

impl SnapshotLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the snapshot file
    ///
    /// Checked in order: `explicit`, the `FLUXALLOC_SNAPSHOT` environment
    /// variable, then `fluxalloc/snapshot.json` under the platform data
    /// directory.
    ///
    /// # Errors
    ///
    /// [`FluxAllocError::SnapshotNotFound`] when the chosen path does not exist.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        let path = explicit
            .or_else(|| std::env::var(SNAPSHOT_ENV).ok().map(PathBuf::from))
            .or_else(Self::default_path)
            .ok_or_else(|| FluxAllocError::SnapshotNotFound(PathBuf::from("snapshot.json")))?;

        if !path.exists() {
            return Err(FluxAllocError::SnapshotNotFound(path));
        }

        debug!("Using snapshot {}", path.display());
        Ok(Self { path })
    }

    /// `<data_dir>/fluxalloc/snapshot.json`, if the platform has a data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("fluxalloc").join("snapshot.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the snapshot
    pub async fn load(&self) -> Result<Snapshot> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = Snapshot::from_json(&content)?;
        debug!(
            "Read {} fluxes and {} worklogs from {}",
            snapshot.fluxes.len(),
            snapshot.worklogs.len(),
            self.path.display()
        );
        Ok(snapshot)
    }
}
