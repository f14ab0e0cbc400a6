use std::sync::{Arc, PoisonError, RwLock};

use analytics::{compute_ranges, compute_thresholds, latest, PageView, Paginator, Ranges, Thresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sources::SourceError;
use staking_model::{HistoryPoint, Snapshot, SnapshotTotals, Staker};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Pending,
    Fresh {
        at: DateTime<Utc>,
    },
    /// Last fetch failed; the data shown is from before `since`.
    Stale {
        since: DateTime<Utc>,
        error: String,
    },
}

impl SourceStatus {
    fn after<T>(&self, outcome: &Result<T, SourceError>, now: DateTime<Utc>) -> Self {
        match (outcome, self) {
            (Ok(_), _) => SourceStatus::Fresh { at: now },
            (Err(err), SourceStatus::Stale { since, .. }) => SourceStatus::Stale {
                since: *since,
                error: err.to_string(),
            },
            (Err(err), _) => SourceStatus::Stale {
                since: now,
                error: err.to_string(),
            },
        }
    }
}

/// Figures for the stats card, read from the newest history sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestStats {
    pub timestamp: String,
    pub staked_amount: f64,
    pub staking_power: f64,
    pub staker_count: u64,
}

impl From<&HistoryPoint> for LatestStats {
    fn from(point: &HistoryPoint) -> Self {
        Self {
            timestamp: point.timestamp.clone(),
            staked_amount: point.staked_amount,
            staking_power: point.staking_power,
            staker_count: point.staker_count,
        }
    }
}

/// Raw data from both sources plus everything derived from it. Always
/// rebuilt whole; never mutated once published.
#[derive(Debug, Clone)]
pub struct DashboardView {
    stakers: Arc<[Staker]>,
    totals: SnapshotTotals,
    history: Arc<[HistoryPoint]>,
    thresholds: Thresholds,
    ranges: Ranges,
    snapshot_status: SourceStatus,
    history_status: SourceStatus,
    snapshot_loaded: bool,
    history_loaded: bool,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::derive(
            Arc::from(Vec::new()),
            SnapshotTotals::default(),
            Arc::from(Vec::new()),
            SourceStatus::Pending,
            SourceStatus::Pending,
            false,
            false,
        )
    }
}

impl DashboardView {
    pub fn new(stakers: Vec<Staker>, totals: SnapshotTotals, history: Vec<HistoryPoint>) -> Self {
        let now = Utc::now();
        Self::derive(
            stakers.into(),
            totals,
            history.into(),
            SourceStatus::Fresh { at: now },
            SourceStatus::Fresh { at: now },
            true,
            true,
        )
    }

    fn derive(
        stakers: Arc<[Staker]>,
        totals: SnapshotTotals,
        history: Arc<[HistoryPoint]>,
        snapshot_status: SourceStatus,
        history_status: SourceStatus,
        snapshot_loaded: bool,
        history_loaded: bool,
    ) -> Self {
        Self {
            thresholds: compute_thresholds(&stakers),
            ranges: compute_ranges(&history),
            stakers,
            totals,
            history,
            snapshot_status,
            history_status,
            snapshot_loaded,
            history_loaded,
        }
    }

    /// Next view after a poll. A failed source keeps its previous data and
    /// is marked stale; a successful one replaces its data wholesale.
    pub fn apply(
        &self,
        snapshot: Result<Snapshot, SourceError>,
        history: Result<Vec<HistoryPoint>, SourceError>,
        now: DateTime<Utc>,
    ) -> Self {
        let snapshot_status = self.snapshot_status.after(&snapshot, now);
        let history_status = self.history_status.after(&history, now);

        let (stakers, totals, snapshot_loaded) = match snapshot {
            Ok(snapshot) => (snapshot.stakers.into(), snapshot.totals, true),
            Err(_) => (
                Arc::clone(&self.stakers),
                self.totals.clone(),
                self.snapshot_loaded,
            ),
        };
        let (history, history_loaded) = match history {
            Ok(points) => (points.into(), true),
            Err(_) => (Arc::clone(&self.history), self.history_loaded),
        };

        Self::derive(
            stakers,
            totals,
            history,
            snapshot_status,
            history_status,
            snapshot_loaded,
            history_loaded,
        )
    }

    /// True until either source has delivered data once.
    pub fn loading(&self) -> bool {
        !self.snapshot_loaded && !self.history_loaded
    }

    pub fn stakers(&self) -> &[Staker] {
        &self.stakers
    }

    pub fn history(&self) -> &[HistoryPoint] {
        &self.history
    }

    pub fn totals(&self) -> &SnapshotTotals {
        &self.totals
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn ranges(&self) -> &Ranges {
        &self.ranges
    }

    pub fn snapshot_status(&self) -> &SourceStatus {
        &self.snapshot_status
    }

    pub fn history_status(&self) -> &SourceStatus {
        &self.history_status
    }

    pub fn latest(&self) -> Option<LatestStats> {
        latest(&self.history).map(LatestStats::from)
    }

    /// Timestamp shown as "data updated at": newest history sample, else the
    /// snapshot's own timestamp.
    pub fn updated_at(&self) -> Option<&str> {
        latest(&self.history)
            .map(|p| p.timestamp.as_str())
            .or(self.totals.ts.as_deref())
    }

    pub fn page(&self, paginator: &Paginator) -> PageView {
        PageView::build(&self.stakers, paginator)
    }
}

/// Shared handle to the published view. Readers get an `Arc` to a complete
/// view; writers replace it in one step.
#[derive(Clone, Default)]
pub struct ViewStore {
    current: Arc<RwLock<Arc<DashboardView>>>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<DashboardView> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn publish(&self, view: DashboardView) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(view);
    }
}
