// Aggregation levels: the closed ordered set shared with the data service.
// Week/month widths are nominal; calendar-aware bucket boundaries are the
// service's job, the engine only needs the width for gap/tolerance math.

use serde::{Deserialize, Serialize};

/// Bucket width for coarsening raw samples. Ordering is by increasing width,
/// with `None` (raw data) below every aggregated level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AggregationLevel {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "2min")]
    Min2,
    #[serde(rename = "3min")]
    Min3,
    #[serde(rename = "5min")]
    Min5,
    #[serde(rename = "10min")]
    Min10,
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "20min")]
    Min20,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "1hour")]
    Hour1,
    #[serde(rename = "2hour")]
    Hour2,
    #[serde(rename = "3hour")]
    Hour3,
    #[serde(rename = "6hour")]
    Hour6,
    #[serde(rename = "12hour")]
    Hour12,
    #[serde(rename = "1day")]
    Day1,
    #[serde(rename = "1week")]
    Week1,
    #[serde(rename = "1month")]
    Month1,
}

impl AggregationLevel {
    /// Every level, ordered by increasing bucket width.
    pub const ALL: [AggregationLevel; 17] = [
        AggregationLevel::None,
        AggregationLevel::Min1,
        AggregationLevel::Min2,
        AggregationLevel::Min3,
        AggregationLevel::Min5,
        AggregationLevel::Min10,
        AggregationLevel::Min15,
        AggregationLevel::Min20,
        AggregationLevel::Min30,
        AggregationLevel::Hour1,
        AggregationLevel::Hour2,
        AggregationLevel::Hour3,
        AggregationLevel::Hour6,
        AggregationLevel::Hour12,
        AggregationLevel::Day1,
        AggregationLevel::Week1,
        AggregationLevel::Month1,
    ];

    /// Nominal bucket width in minutes; `None` for the unaggregated level.
    pub fn bucket_minutes(self) -> Option<i64> {
        match self {
            AggregationLevel::None => None,
            AggregationLevel::Min1 => Some(1),
            AggregationLevel::Min2 => Some(2),
            AggregationLevel::Min3 => Some(3),
            AggregationLevel::Min5 => Some(5),
            AggregationLevel::Min10 => Some(10),
            AggregationLevel::Min15 => Some(15),
            AggregationLevel::Min20 => Some(20),
            AggregationLevel::Min30 => Some(30),
            AggregationLevel::Hour1 => Some(60),
            AggregationLevel::Hour2 => Some(120),
            AggregationLevel::Hour3 => Some(180),
            AggregationLevel::Hour6 => Some(360),
            AggregationLevel::Hour12 => Some(720),
            AggregationLevel::Day1 => Some(1440),
            AggregationLevel::Week1 => Some(10_080),
            AggregationLevel::Month1 => Some(43_200),
        }
    }

    /// Nominal bucket width in milliseconds; `None` for the unaggregated level.
    pub fn bucket_ms(self) -> Option<i64> {
        self.bucket_minutes().map(|m| m * 60_000)
    }

    /// Wire name as the data service spells it (e.g. "5min", "1hour").
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationLevel::None => "none",
            AggregationLevel::Min1 => "1min",
            AggregationLevel::Min2 => "2min",
            AggregationLevel::Min3 => "3min",
            AggregationLevel::Min5 => "5min",
            AggregationLevel::Min10 => "10min",
            AggregationLevel::Min15 => "15min",
            AggregationLevel::Min20 => "20min",
            AggregationLevel::Min30 => "30min",
            AggregationLevel::Hour1 => "1hour",
            AggregationLevel::Hour2 => "2hour",
            AggregationLevel::Hour3 => "3hour",
            AggregationLevel::Hour6 => "6hour",
            AggregationLevel::Hour12 => "12hour",
            AggregationLevel::Day1 => "1day",
            AggregationLevel::Week1 => "1week",
            AggregationLevel::Month1 => "1month",
        }
    }

    /// Parse a wire name from the data service (e.g. "5min", "1hour").
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == s)
    }
}
