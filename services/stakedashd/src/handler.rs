use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use analytics::{Paginator, Percentile};
use anyhow::Result;
use session::{DashboardView, ViewStore};
use staking_model::Metric;
use view_ipc::{
    PageCommand, RangeEntry, SessionStatus, StatsSummary, ThresholdEntry, ViewRequest,
    ViewResponse,
};

/// Answers view requests from the latest published dashboard view. Holds
/// the one page cursor shared by all clients of this session.
pub struct ViewService {
    session_id: String,
    store: ViewStore,
    poll_interval: Duration,
    paginator: Mutex<Paginator>,
}

impl ViewService {
    pub fn new(
        session_id: String,
        store: ViewStore,
        poll_interval: Duration,
        items_per_page: usize,
    ) -> Self {
        Self {
            session_id,
            store,
            poll_interval,
            paginator: Mutex::new(Paginator::new(items_per_page)),
        }
    }

    pub fn handle(&self, req: ViewRequest) -> Result<ViewResponse> {
        let view = self.store.load();
        let resp = match req {
            ViewRequest::Status => ViewResponse::Status(self.status(&view)),
            ViewRequest::Stats => ViewResponse::Stats(StatsSummary {
                latest: view.latest(),
                active_stakers: view.stakers().len(),
                snapshot_totals: view.totals().clone(),
            }),
            ViewRequest::Thresholds => ViewResponse::Thresholds(thresholds(&view)),
            ViewRequest::Ranges => ViewResponse::Ranges(ranges(&view)),
            ViewRequest::Page(cmd) => {
                let mut paginator = self.paginator.lock().unwrap_or_else(PoisonError::into_inner);
                paginator.set_len(view.stakers().len());
                navigate(&mut paginator, cmd);
                ViewResponse::Page(view.page(&paginator))
            }
        };
        Ok(resp)
    }

    fn status(&self, view: &DashboardView) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id.clone(),
            loading: view.loading(),
            poll_interval_secs: self.poll_interval.as_secs(),
            updated_at: view.updated_at().map(str::to_string),
            snapshot: view.snapshot_status().clone(),
            history: view.history_status().clone(),
        }
    }
}

fn navigate(paginator: &mut Paginator, cmd: PageCommand) {
    match cmd {
        PageCommand::Current => {}
        PageCommand::First => paginator.go_to_first(),
        PageCommand::Last => paginator.go_to_last(),
        PageCommand::Next => paginator.next(),
        PageCommand::Previous => paginator.previous(),
        PageCommand::JumpTo(input) => {
            if !paginator.jump_to(&input) {
                tracing::debug!(%input, "ignored page jump");
            }
        }
    }
}

fn thresholds(view: &DashboardView) -> Vec<ThresholdEntry> {
    Percentile::ALL
        .into_iter()
        .map(|percentile| ThresholdEntry {
            percentile,
            label: percentile.label().to_string(),
            staking_power: view.thresholds().get(&percentile).copied().flatten(),
        })
        .collect()
}

fn ranges(view: &DashboardView) -> Vec<RangeEntry> {
    Metric::ALL
        .into_iter()
        .map(|metric| {
            let range = view.ranges().get(&metric).copied().unwrap_or_default();
            RangeEntry {
                metric,
                min: range.min,
                max: range.max,
            }
        })
        .collect()
}
