use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("staker {wallet}: {reason}")]
    InvalidStaker { wallet: String, reason: &'static str },
    #[error("history point {index}: {reason}")]
    InvalidHistoryPoint { index: usize, reason: &'static str },
}

/// One staking position from the snapshot source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staker {
    pub wallet: String,
    #[serde(rename = "uiStakingPower")]
    pub staking_power: f64,
    #[serde(rename = "uiAmount")]
    pub amount_staked: f64,
    #[serde(rename = "startTs")]
    pub start_timestamp: i64,
    #[serde(rename = "endTs")]
    pub end_timestamp: i64,
}

impl Staker {
    pub fn duration_days(&self) -> i64 {
        (self.end_timestamp - self.start_timestamp).div_euclid(SECONDS_PER_DAY)
    }

    pub fn staked_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_timestamp, 0)
    }

    pub fn unlocks_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_timestamp, 0)
    }

    /// Positions with exactly zero power are fully unstaked.
    pub fn is_active(&self) -> bool {
        self.staking_power != 0.0
    }

    /// `ABCD...WXYZ` form of the wallet for narrow displays.
    pub fn short_wallet(&self) -> String {
        let chars: Vec<char> = self.wallet.chars().collect();
        if chars.len() <= 8 {
            return self.wallet.clone();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let fail = |reason| SchemaError::InvalidStaker {
            wallet: self.wallet.clone(),
            reason,
        };
        if self.wallet.is_empty() {
            return Err(fail("empty wallet"));
        }
        if !is_non_negative(self.staking_power) {
            return Err(fail("staking power must be a non-negative number"));
        }
        if !is_non_negative(self.amount_staked) {
            return Err(fail("amount staked must be a non-negative number"));
        }
        if self.end_timestamp < self.start_timestamp {
            return Err(fail("end timestamp precedes start timestamp"));
        }
        Ok(())
    }
}

/// One aggregate sample from the history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: String,
    #[serde(rename = "staker")]
    pub staker_count: u64,
    #[serde(rename = "stakingPower")]
    pub staking_power: f64,
    #[serde(rename = "stakedME")]
    pub staked_amount: f64,
}

impl HistoryPoint {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::StakerCount => self.staker_count as f64,
            Metric::StakedAmount => self.staked_amount,
            Metric::StakingPower => self.staking_power,
        }
    }

    /// Best-effort parse of the source's timestamp string. RFC 3339 first,
    /// then a naive `YYYY-MM-DD HH:MM:SS` read as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.timestamp, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    fn validate(&self, index: usize) -> Result<(), SchemaError> {
        let fail = |reason| SchemaError::InvalidHistoryPoint { index, reason };
        if !is_non_negative(self.staking_power) {
            return Err(fail("staking power must be a non-negative number"));
        }
        if !is_non_negative(self.staked_amount) {
            return Err(fail("staked amount must be a non-negative number"));
        }
        Ok(())
    }
}

/// Aggregate series charted from the history source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    StakerCount,
    StakedAmount,
    StakingPower,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::StakerCount,
        Metric::StakedAmount,
        Metric::StakingPower,
    ];
}

/// Totals reported next to the staker list. The source has sent these both
/// as numbers and as numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiAmount {
    Number(f64),
    Text(String),
}

impl UiAmount {
    /// Integer part of the amount, the way the dashboard has always shown it.
    pub fn truncated(&self) -> Option<i64> {
        match self {
            UiAmount::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            UiAmount::Number(_) => None,
            UiAmount::Text(s) => leading_integer(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTotals {
    pub total_staked: Option<i64>,
    pub total_staking_power: Option<i64>,
    pub ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub stakers: Vec<Staker>,
    pub totals: SnapshotTotals,
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    result: EnvelopeResult,
}

#[derive(Deserialize)]
struct EnvelopeResult {
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    json: SnapshotPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotPayload {
    stakers: Vec<Staker>,
    #[serde(default, rename = "totalUIStaked")]
    total_ui_staked: Option<UiAmount>,
    #[serde(default, rename = "totalUIStakingPower")]
    total_ui_staking_power: Option<UiAmount>,
    #[serde(default)]
    ts: Option<String>,
}

/// Parses the snapshot envelope (`result.data.json`), drops unstaked
/// positions and validates the stakers that remain. Source order is kept.
pub fn parse_snapshot(body: &[u8]) -> Result<Snapshot, SchemaError> {
    let envelope: SnapshotEnvelope = serde_json::from_slice(body)?;
    let mut payload = envelope.result.data.json;
    payload.stakers.retain(Staker::is_active);
    for staker in &payload.stakers {
        staker.validate()?;
    }
    Ok(Snapshot {
        stakers: payload.stakers,
        totals: SnapshotTotals {
            total_staked: payload.total_ui_staked.as_ref().and_then(UiAmount::truncated),
            total_staking_power: payload
                .total_ui_staking_power
                .as_ref()
                .and_then(UiAmount::truncated),
            ts: payload.ts,
        },
    })
}

/// Parses the flat history array. Order is kept as sent: oldest first.
pub fn parse_history(body: &[u8]) -> Result<Vec<HistoryPoint>, SchemaError> {
    let points: Vec<HistoryPoint> = serde_json::from_slice(body)?;
    for (index, point) in points.iter().enumerate() {
        point.validate(index)?;
    }
    Ok(points)
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
