//! Derived values the dashboard shows: percentile thresholds over the
//! snapshot, padded chart domains over the history series, and pagination
//! of the ranked staker list. Everything here is pure.

mod pagination;
mod ranges;
mod thresholds;

pub use pagination::{
    ranked_rows, total_pages, PageItem, PageView, Paginator, RankedRow, DEFAULT_ITEMS_PER_PAGE,
};
pub use ranges::{compute_ranges, latest, padded_range, Range, Ranges};
pub use thresholds::{compute_thresholds, threshold, Percentile, Thresholds};
