// HTTP handlers: version, device registry, per-device stats, chart fetch

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::fetch::{ChartOutcome, ChartRequest, now_epoch_ms};
use crate::models::AggregationLevel;
use crate::pipeline::{normalize, select, stats};
use crate::version::{NAME, VERSION};

/// GET /version - service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/devices - device registry proxy. Declared poll intervals here
/// feed gap/tolerance math and the live poll period.
pub(super) async fn devices_handler(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let devices = state.client.devices().await?;
    Ok(Json(devices))
}

#[derive(Debug, Deserialize)]
pub(super) struct StatsQuery {
    #[serde(default = "default_stats_hours")]
    hours: u32,
}

fn default_stats_hours() -> u32 {
    24
}

/// GET /api/devices/{id}/stats?hours=N - summary statistics over the last
/// N hours, computed from a fetched stream.
pub(super) async fn stats_handler(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> AppResult<impl IntoResponse> {
    if query.hours == 0 {
        return Err(AppError::BadRequest("hours must be > 0".into()));
    }
    let registry = state.client.devices().await?;
    let device = registry
        .iter()
        .find(|d| d.device_id == device_id)
        .ok_or_else(|| AppError::NotFound(format!("unknown device {device_id}")))?;

    let end_ms = now_epoch_ms();
    let start_ms = end_ms - query.hours as i64 * 3_600_000;
    let span_seconds = (end_ms - start_ms) as f64 / 1000.0;

    let count = state.client.count_rows(&device_id, start_ms, end_ms).await?;
    let level = select::select_level(count, span_seconds, state.config.chart.target_points);
    let response = state
        .client
        .fetch_readings(&device_id, start_ms, end_ms, level)
        .await?;
    let applied = AggregationLevel::from_wire(&response.aggregation_applied).unwrap_or(level);
    let expected_ms = applied.bucket_ms().unwrap_or_else(|| device.poll_interval_ms());
    let stream = normalize::normalize_readings(&device_id, &response.readings, expected_ms);
    Ok(Json(stats::summarize(&stream, start_ms, end_ms)))
}

/// POST /api/chart - the historical unified fetch. The refetch controller
/// inside the fetcher decides between a full fetch, an overlay-only fetch
/// and serving the cached result.
pub(super) async fn chart_handler(
    State(state): State<AppState>,
    Json(request): Json<ChartRequest>,
) -> AppResult<impl IntoResponse> {
    if request.device_ids.is_empty() {
        return Err(AppError::BadRequest("deviceIds must be non-empty".into()));
    }
    if request.end_ms <= request.start_ms {
        return Err(AppError::BadRequest("endMs must be after startMs".into()));
    }
    if request.metrics.is_empty() {
        return Err(AppError::BadRequest("metrics must be non-empty".into()));
    }

    let registry = state.client.devices().await?;
    for id in &request.device_ids {
        if !registry.iter().any(|d| d.device_id == *id) {
            return Err(AppError::NotFound(format!("unknown device {id}")));
        }
    }

    let outcome = state
        .fetcher
        .fetch_chart(&request, &registry, now_epoch_ms())
        .await;
    let body = match outcome {
        ChartOutcome::Ready(data) => json!({ "status": "ready", "chart": data.as_ref() }),
        ChartOutcome::ConfirmationRequired { raw_count } => json!({
            "status": "confirmationRequired",
            "rawCount": raw_count,
        }),
        ChartOutcome::Stale => json!({ "status": "stale" }),
    };
    Ok(Json(body))
}
