mod poller;
mod view;

pub use poller::{Dashboard, PollReport, DEFAULT_POLL_INTERVAL};
pub use view::{DashboardView, LatestStats, SourceStatus, ViewStore};
