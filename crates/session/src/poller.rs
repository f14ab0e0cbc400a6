use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use metrics::{MetricsHandle, SOURCE_HISTORY, SOURCE_SNAPSHOT};
use sources::StakingSource;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::view::ViewStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub snapshot_ok: bool,
    pub history_ok: bool,
}

struct Poller {
    source: Arc<dyn StakingSource>,
    store: ViewStore,
    metrics: Option<MetricsHandle>,
    // Serializes polls so each one builds on the view the previous one published.
    in_flight: tokio::sync::Mutex<()>,
}

impl Poller {
    async fn poll(&self) -> PollReport {
        let _guard = self.in_flight.lock().await;
        let (snapshot, history) =
            tokio::join!(self.source.fetch_snapshot(), self.source.fetch_history());
        let now = Utc::now();

        match &snapshot {
            Ok(s) => info!(stakers = s.stakers.len(), "snapshot refreshed"),
            Err(err) => warn!(error = %err, "snapshot fetch failed, keeping previous stakers"),
        }
        match &history {
            Ok(h) => info!(points = h.len(), "history refreshed"),
            Err(err) => warn!(error = %err, "history fetch failed, keeping previous series"),
        }

        let report = PollReport {
            snapshot_ok: snapshot.is_ok(),
            history_ok: history.is_ok(),
        };
        let next = self.store.load().apply(snapshot, history, now);
        if let Some(metrics) = &self.metrics {
            record(metrics, SOURCE_SNAPSHOT, report.snapshot_ok, now.timestamp());
            record(metrics, SOURCE_HISTORY, report.history_ok, now.timestamp());
            metrics.set_stakers(next.stakers().len());
            metrics.set_history_points(next.history().len());
        }
        self.store.publish(next);
        report
    }
}

fn record(metrics: &MetricsHandle, source: &str, ok: bool, ts: i64) {
    if ok {
        metrics.record_success(source, ts);
    } else {
        metrics.record_failure(source);
    }
}

/// A dashboard session: owns the published view and the polling task that
/// keeps it current. The task stops on `stop()` or when the session is dropped.
pub struct Dashboard {
    poller: Arc<Poller>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(source: Arc<dyn StakingSource>, interval: Duration) -> Self {
        Self::build(source, interval, None)
    }

    pub fn with_metrics(
        source: Arc<dyn StakingSource>,
        interval: Duration,
        metrics: MetricsHandle,
    ) -> Self {
        Self::build(source, interval, Some(metrics))
    }

    fn build(
        source: Arc<dyn StakingSource>,
        interval: Duration,
        metrics: Option<MetricsHandle>,
    ) -> Self {
        Self {
            poller: Arc::new(Poller {
                source,
                store: ViewStore::new(),
                metrics,
                in_flight: tokio::sync::Mutex::new(()),
            }),
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn store(&self) -> ViewStore {
        self.poller.store.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetches both sources once and publishes the result.
    pub async fn poll_once(&self) -> PollReport {
        self.poller.poll().await
    }

    /// Spawns the polling task on the current tokio runtime: one poll right
    /// away, then one per interval. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let poller = Arc::clone(&self.poller);
        let period = self.interval.max(Duration::from_millis(1));
        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = poller.poll().await;
                if !report.snapshot_ok || !report.history_ok {
                    warn!(
                        snapshot_ok = report.snapshot_ok,
                        history_ok = report.history_ok,
                        retry_in_secs = period.as_secs(),
                        "poll incomplete"
                    );
                }
            }
        }));
        info!(interval_secs = period.as_secs(), "polling started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("polling stopped");
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}
