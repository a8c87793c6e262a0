// HTTP client for the remote data service (storage + SQL bucket aggregation).
// The engine never talks to meters directly; everything goes through here.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::DataServiceConfig;
use crate::models::{AggregationLevel, DeviceInfo, Phase};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timestamp out of range: {0}")]
    BadTimestamp(i64),
}

/// One readings row as the service serializes it. Timestamps are ISO strings,
/// usually naive (no zone) and always UTC; metric columns may be null in
/// pre-bucketed rows.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingRow {
    pub timestamp: String,
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
}

/// Historical readings response. `aggregation_applied` is what the service
/// actually used (it may coarsen beyond the requested level) and must drive
/// downstream gap/tolerance math. Rows stay raw JSON here so one malformed
/// row is dropped by the normalizer instead of failing the whole fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingsResponse {
    pub readings: Vec<serde_json::Value>,
    pub aggregation_applied: String,
    #[serde(default)]
    pub original_count: Option<u64>,
}

/// One energy bucket: the delta in kWh over the bucket starting at `timestamp`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnergyBucketRow {
    pub timestamp: String,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnergyResponse {
    pub aggregated: Vec<EnergyBucketRow>,
    #[serde(default)]
    pub raw_total_kwh: f64,
    pub aggregation_applied: String,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// Registry row as the service spells it (snake_case meter fields).
#[derive(Debug, Deserialize)]
struct MeterRow {
    meter_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default = "meter_enabled_default")]
    enabled: bool,
    #[serde(default)]
    poll_interval: Option<f64>,
    #[serde(default)]
    energy_poll_interval: Option<f64>,
}

fn meter_enabled_default() -> bool {
    true
}

/// Epoch millis -> RFC 3339 UTC, the timestamp format the service accepts.
fn iso_utc(ms: i64) -> Result<String, ClientError> {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .ok_or(ClientError::BadTimestamp(ms))
}

pub struct DataClient {
    http: reqwest::Client,
    base_url: String,
}

impl DataClient {
    pub fn new(config: &DataServiceConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(DataClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            })
        }
    }

    /// GET /api/meters - the device-metadata collaborator. Declared poll
    /// intervals here size every gap and alignment tolerance downstream.
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>, ClientError> {
        let response = self.http.get(self.url("/api/meters")).send().await?;
        let rows: Vec<MeterRow> = Self::check(response).await?.json().await?;
        Ok(rows
            .into_iter()
            .map(|m| DeviceInfo {
                device_id: m.meter_id,
                name: m.name,
                location: m.location,
                enabled: m.enabled,
                poll_interval_secs: m.poll_interval.unwrap_or(1.0),
                energy_poll_interval_secs: m.energy_poll_interval.unwrap_or(30.0),
            })
            .collect())
    }

    /// POST /api/meters/{id}/count - row count for a range without the data.
    pub async fn count_rows(
        &self,
        device_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<u64, ClientError> {
        let body = json!({
            "start_time": iso_utc(start_ms)?,
            "end_time": iso_utc(end_ms)?,
        });
        let response = self
            .http
            .post(self.url(&format!("/api/meters/{device_id}/count")))
            .json(&body)
            .send()
            .await?;
        let parsed: CountResponse = Self::check(response).await?.json().await?;
        Ok(parsed.count)
    }

    /// POST /api/meters/{id}/historical - raw or pre-bucketed readings.
    /// Rows may arrive most-recent-first; the normalizer reorders them.
    pub async fn fetch_readings(
        &self,
        device_id: &str,
        start_ms: i64,
        end_ms: i64,
        level: AggregationLevel,
    ) -> Result<ReadingsResponse, ClientError> {
        let body = json!({
            "start_time": iso_utc(start_ms)?,
            "end_time": iso_utc(end_ms)?,
            "aggregation": level.as_str(),
        });
        let response = self
            .http
            .post(self.url(&format!("/api/meters/{device_id}/historical")))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /api/meters/{id}/energy/historical - per-bucket kWh deltas for
    /// the secondary overlay.
    pub async fn fetch_energy_buckets(
        &self,
        device_id: &str,
        start_ms: i64,
        end_ms: i64,
        phase: Phase,
        level: AggregationLevel,
    ) -> Result<EnergyResponse, ClientError> {
        let body = json!({
            "start_time": iso_utc(start_ms)?,
            "end_time": iso_utc(end_ms)?,
            "phase": phase.as_str(),
            "aggregation": level.as_str(),
        });
        let response = self
            .http
            .post(self.url(&format!("/api/meters/{device_id}/energy/historical")))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// GET /api/meters/{id}/latest - most recent reading, drives the live poll.
    pub async fn latest_reading(&self, device_id: &str) -> Result<ReadingRow, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/meters/{device_id}/latest")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
