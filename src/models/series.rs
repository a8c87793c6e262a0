// Samples, streams and the unified chart output

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AggregationLevel;

/// One measurable channel of a meter. `EnergyKwh` carries the per-bucket
/// energy delta of the secondary overlay; readings rows never populate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    VoltageRms,
    CurrentRms,
    ActivePower,
    ReactivePower,
    ApparentPower,
    PowerFactor,
    Frequency,
    EnergyKwh,
}

impl Metric {
    /// The instantaneous channels a readings row can carry.
    pub const READINGS: [Metric; 7] = [
        Metric::VoltageRms,
        Metric::CurrentRms,
        Metric::ActivePower,
        Metric::ReactivePower,
        Metric::ApparentPower,
        Metric::PowerFactor,
        Metric::Frequency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::VoltageRms => "voltage_rms",
            Metric::CurrentRms => "current_rms",
            Metric::ActivePower => "active_power",
            Metric::ReactivePower => "reactive_power",
            Metric::ApparentPower => "apparent_power",
            Metric::PowerFactor => "power_factor",
            Metric::Frequency => "frequency",
            Metric::EnergyKwh => "energy_kwh",
        }
    }
}

/// Per-metric values of one sample. Absent means "not reported", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValues {
    #[serde(default)]
    pub voltage_rms: Option<f64>,
    #[serde(default)]
    pub current_rms: Option<f64>,
    #[serde(default)]
    pub active_power: Option<f64>,
    #[serde(default)]
    pub reactive_power: Option<f64>,
    #[serde(default)]
    pub apparent_power: Option<f64>,
    #[serde(default)]
    pub power_factor: Option<f64>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub energy_kwh: Option<f64>,
}

impl MetricValues {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::VoltageRms => self.voltage_rms,
            Metric::CurrentRms => self.current_rms,
            Metric::ActivePower => self.active_power,
            Metric::ReactivePower => self.reactive_power,
            Metric::ApparentPower => self.apparent_power,
            Metric::PowerFactor => self.power_factor,
            Metric::Frequency => self.frequency,
            Metric::EnergyKwh => self.energy_kwh,
        }
    }
}

/// One device reading at one instant (UTC epoch millis). Synthetic samples
/// mark a confirmed absence of data inside a detected gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp_ms: i64,
    #[serde(flatten)]
    pub values: MetricValues,
    #[serde(default)]
    pub synthetic: bool,
}

impl Sample {
    /// A gap marker: every metric null.
    pub fn gap(timestamp_ms: i64) -> Self {
        Sample {
            timestamp_ms,
            values: MetricValues::default(),
            synthetic: true,
        }
    }
}

/// One device's ascending time series, plus the sampling interval the gap
/// and tolerance math must assume. When the service pre-bucketed the rows
/// this is the applied bucket width, not the device's raw poll interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub device_id: String,
    pub expected_interval_ms: i64,
    pub samples: Vec<Sample>,
}

impl Stream {
    pub fn empty(device_id: impl Into<String>, expected_interval_ms: i64) -> Self {
        Stream {
            device_id: device_id.into(),
            expected_interval_ms,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Default alignment tolerance: 1.5 x the expected interval, so polling
    /// jitter does not read as a gap while real absence still comes out null.
    pub fn default_tolerance_ms(&self) -> i64 {
        self.expected_interval_ms + self.expected_interval_ms / 2
    }
}

/// One output column: a (device, metric) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesColumn {
    pub device_id: String,
    pub metric: Metric,
}

/// One row of the aligned output: a shared timestamp plus one value slot per
/// column (null where the device has nothing within tolerance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedFrame {
    pub timestamp_ms: i64,
    pub values: Vec<Option<f64>>,
}

/// The chart-ready merged output. Frame timestamps are strictly increasing
/// and exactly the union of the input streams' timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSeries {
    pub columns: Vec<SeriesColumn>,
    pub frames: Vec<UnifiedFrame>,
}

impl UnifiedSeries {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// The secondary energy overlay: per-bucket kWh deltas aligned across
/// devices, plus each device's raw first-to-last total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyOverlay {
    pub applied_level: AggregationLevel,
    pub series: UnifiedSeries,
    pub raw_total_kwh: BTreeMap<String, f64>,
}
