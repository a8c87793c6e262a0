// Device registry entries and per-range summary statistics

use serde::{Deserialize, Serialize};

/// Registry entry from the data service's device-metadata collaborator.
/// The declared poll intervals size gap and alignment tolerances and drive
/// the live poll loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub poll_interval_secs: f64,
    #[serde(default = "default_energy_poll_interval")]
    pub energy_poll_interval_secs: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_energy_poll_interval() -> f64 {
    30.0
}

impl DeviceInfo {
    pub fn poll_interval_ms(&self) -> i64 {
        (self.poll_interval_secs * 1000.0).round() as i64
    }
}

/// Energy phase filter for the overlay series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    A,
    B,
    C,
    #[default]
    #[serde(rename = "ALL")]
    All,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
            Phase::All => "ALL",
        }
    }
}

/// Summary statistics over one device's fetched range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatistics {
    pub device_id: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub sample_count: usize,
    pub avg_voltage: Option<f64>,
    pub min_voltage: Option<f64>,
    pub max_voltage: Option<f64>,
    pub avg_current: Option<f64>,
    pub max_current: Option<f64>,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub total_energy_kwh: Option<f64>,
}
