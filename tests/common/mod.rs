// Shared test helpers: an in-process mock of the remote data service,
// served on a real listener so the reqwest client is exercised end-to-end.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

/// Canned responses per device. A device missing from `readings`/`energy`
/// answers 500, which the engine must treat as a per-device failure.
#[derive(Clone, Default)]
pub struct MockService {
    pub meters: Vec<Value>,
    pub counts: HashMap<String, u64>,
    pub readings: HashMap<String, Value>,
    pub energy: HashMap<String, Value>,
    pub latest: HashMap<String, Value>,
    pub readings_hits: Arc<AtomicU64>,
    /// Artificial latency for the historical endpoint, for in-flight tests.
    pub delay_ms: u64,
}

impl MockService {
    pub fn meter(mut self, device_id: &str, poll_interval_secs: f64) -> Self {
        self.meters.push(json!({
            "meter_id": device_id,
            "ip_address": "192.168.1.50",
            "name": device_id,
            "enabled": true,
            "poll_interval": poll_interval_secs,
            "energy_poll_interval": 30.0,
        }));
        self
    }

    pub fn count(mut self, device_id: &str, count: u64) -> Self {
        self.counts.insert(device_id.to_string(), count);
        self
    }

    /// Readings response with rows served most-recent-first, the order the
    /// real service uses.
    pub fn readings(
        mut self,
        device_id: &str,
        aggregation_applied: &str,
        mut rows: Vec<Value>,
    ) -> Self {
        rows.reverse();
        let original_count = rows.len();
        self.readings.insert(
            device_id.to_string(),
            json!({
                "meter_id": device_id,
                "readings": rows,
                "aggregation_applied": aggregation_applied,
                "original_count": original_count,
            }),
        );
        self
    }

    pub fn energy(
        mut self,
        device_id: &str,
        aggregation_applied: &str,
        raw_total_kwh: f64,
        buckets: Vec<Value>,
    ) -> Self {
        self.energy.insert(
            device_id.to_string(),
            json!({
                "meter_id": device_id,
                "aggregated": buckets,
                "raw_total_kwh": raw_total_kwh,
                "aggregation_applied": aggregation_applied,
            }),
        );
        self
    }

    pub fn latest(mut self, device_id: &str, row: Value) -> Self {
        self.latest.insert(device_id.to_string(), row);
        self
    }

    pub fn delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Binds to an ephemeral port and serves the mock; returns the base URL.
    pub async fn serve(self) -> String {
        let app = router(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }
}

fn router(state: MockService) -> Router {
    Router::new()
        .route("/api/meters", get(meters_handler))
        .route("/api/meters/{id}/count", post(count_handler))
        .route("/api/meters/{id}/historical", post(historical_handler))
        .route("/api/meters/{id}/energy/historical", post(energy_handler))
        .route("/api/meters/{id}/latest", get(latest_handler))
        .with_state(state)
}

async fn meters_handler(State(state): State<MockService>) -> impl IntoResponse {
    Json(state.meters.clone())
}

async fn count_handler(
    State(state): State<MockService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let count = state.counts.get(&id).copied().unwrap_or(0);
    Json(json!({ "meter_id": id, "count": count }))
}

async fn historical_handler(
    State(state): State<MockService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .readings_hits
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    if state.delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(state.delay_ms)).await;
    }
    match state.readings.get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn energy_handler(
    State(state): State<MockService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.energy.get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn latest_handler(
    State(state): State<MockService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.latest.get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A readings row as the service serializes it.
pub fn reading_row(timestamp: &str, active_power: f64) -> Value {
    json!({
        "timestamp": timestamp,
        "meter_id": "ignored",
        "voltage_rms": 230.0,
        "current_rms": active_power / 230.0,
        "active_power": active_power,
        "reactive_power": 0.0,
        "apparent_power": active_power,
        "power_factor": 1.0,
        "frequency": 50.0,
    })
}
