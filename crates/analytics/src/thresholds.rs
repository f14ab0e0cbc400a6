use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use staking_model::Staker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Percentile {
    Top1,
    Top5,
    Top10,
}

impl Percentile {
    pub const ALL: [Percentile; 3] = [Percentile::Top1, Percentile::Top5, Percentile::Top10];

    pub fn fraction(self) -> f64 {
        match self {
            Percentile::Top1 => 0.01,
            Percentile::Top5 => 0.05,
            Percentile::Top10 => 0.1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Percentile::Top1 => "Top 1%",
            Percentile::Top5 => "Top 5%",
            Percentile::Top10 => "Top 10%",
        }
    }
}

/// `None` marks a threshold that cannot be read from the current snapshot.
pub type Thresholds = BTreeMap<Percentile, Option<u64>>;

/// Staking power of the staker sitting at `ceil(len * fraction)` in a list
/// ranked most-powerful first, rounded up.
pub fn threshold(stakers: &[Staker], fraction: f64) -> Option<u64> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return None;
    }
    let index = (stakers.len() as f64 * fraction).ceil() as usize;
    let staker = stakers.get(index)?;
    Some(staker.staking_power.ceil() as u64)
}

pub fn compute_thresholds(stakers: &[Staker]) -> Thresholds {
    Percentile::ALL
        .into_iter()
        .map(|p| (p, threshold(stakers, p.fraction())))
        .collect()
}
