use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use staking_model::{HistoryPoint, Metric};

const LOWER_PAD: f64 = 0.9;
const UPPER_PAD: f64 = 1.1;

/// Chart axis domain, `[min, max]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

pub type Ranges = BTreeMap<Metric, Range>;

/// `[floor(min * 0.9), floor(max * 1.1)]`, or `[0, 0]` when there are no values.
pub fn padded_range<I>(values: I) -> Range
where
    I: IntoIterator<Item = f64>,
{
    let mut values = values.into_iter();
    let Some(first) = values.next() else {
        return Range::default();
    };
    let (lo, hi) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Range {
        min: (lo * LOWER_PAD).floor() as i64,
        max: (hi * UPPER_PAD).floor() as i64,
    }
}

pub fn compute_ranges(history: &[HistoryPoint]) -> Ranges {
    Metric::ALL
        .into_iter()
        .map(|metric| (metric, padded_range(history.iter().map(|p| p.value(metric)))))
        .collect()
}

/// Most recent sample. The history source appends newest last.
pub fn latest(history: &[HistoryPoint]) -> Option<&HistoryPoint> {
    history.last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: &str, stakers: u64, power: f64, staked: f64) -> HistoryPoint {
        HistoryPoint {
            id: None,
            timestamp: ts.into(),
            staker_count: stakers,
            staking_power: power,
            staked_amount: staked,
        }
    }

    #[test]
    fn pads_ten_percent_each_side() {
        assert_eq!(padded_range([10.0, 20.0, 30.0]), Range { min: 9, max: 33 });
        assert_eq!(padded_range([30.0, 10.0, 20.0]), Range { min: 9, max: 33 });
    }

    #[test]
    fn empty_series_is_zero_domain() {
        assert_eq!(padded_range(std::iter::empty()), Range { min: 0, max: 0 });
        let ranges = compute_ranges(&[]);
        assert_eq!(ranges.len(), 3);
        assert!(ranges.values().all(|r| *r == Range::default()));
    }

    #[test]
    fn computes_each_metric_independently() {
        let history = [
            point("2025-02-17", 50112, 1_500_000.0, 200_000_000.0),
            point("2025-02-18", 51063, 1_450_000.0, 210_000_000.0),
        ];
        let ranges = compute_ranges(&history);
        assert_eq!(ranges[&Metric::StakerCount], Range { min: 45100, max: 56169 });
        assert_eq!(ranges[&Metric::StakingPower], Range { min: 1_305_000, max: 1_650_000 });
        assert_eq!(
            ranges[&Metric::StakedAmount],
            Range { min: 180_000_000, max: 231_000_000 }
        );
    }

    #[test]
    fn latest_is_last_element() {
        let history = [point("a", 1, 1.0, 1.0), point("b", 2, 2.0, 2.0)];
        assert_eq!(latest(&history).map(|p| p.timestamp.as_str()), Some("b"));
        assert!(latest(&[]).is_none());
    }
}
