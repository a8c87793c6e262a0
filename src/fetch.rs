// Fetch orchestration: the pure refetch decision controller and the
// historical chart fetch coordinator. The coordinator waits for every
// requested device before aligning, degrades per-device failures to empty
// streams, and discards results that were superseded while in flight.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::DataClient;
use crate::config::ChartConfig;
use crate::models::{
    AggregationLevel, DeviceInfo, EnergyOverlay, Metric, Phase, Stream, UnifiedSeries,
};
use crate::pipeline::{align, gaps, normalize, select};

/// Current time as UTC epoch millis.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Parameters of one chart fetch. `level: None` means auto-select.
/// `at_ms` is the completion instant on the stored context of the last
/// successful fetch, and the issue instant on a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchContext {
    pub start_ms: i64,
    pub end_ms: i64,
    pub level: Option<AggregationLevel>,
    pub device_ids: BTreeSet<String>,
    pub with_energy: bool,
    pub energy_phase: Phase,
    pub at_ms: i64,
}

impl FetchContext {
    fn primary_eq(&self, other: &Self) -> bool {
        self.start_ms == other.start_ms
            && self.end_ms == other.end_ms
            && self.level == other.level
            && self.device_ids == other.device_ids
    }

    fn secondary_eq(&self, other: &Self) -> bool {
        self.with_energy == other.with_energy && self.energy_phase == other.energy_phase
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    Skip,
    FetchPrimaryAndSecondary,
    FetchSecondaryOnly,
}

/// Pure refetch decision. A changed primary parameter (range, level, device
/// set) or an expired elapsed-time guard forces a full fetch; an unchanged
/// primary with only the secondary overlay toggled re-pulls just the cheap
/// overlay; otherwise the previous result still stands.
pub fn should_fetch(
    current: &FetchContext,
    previous: Option<&FetchContext>,
    min_interval_secs: u64,
) -> FetchDecision {
    let Some(previous) = previous else {
        return FetchDecision::FetchPrimaryAndSecondary;
    };

    if !current.primary_eq(previous) {
        return FetchDecision::FetchPrimaryAndSecondary;
    }
    let elapsed_ms = current.at_ms.saturating_sub(previous.at_ms);
    if elapsed_ms >= min_interval_secs as i64 * 1000 {
        return FetchDecision::FetchPrimaryAndSecondary;
    }
    if !current.secondary_eq(previous) {
        return FetchDecision::FetchSecondaryOnly;
    }
    FetchDecision::Skip
}

/// One historical chart request from the charting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub device_ids: Vec<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Absent = pick automatically from row count and span.
    #[serde(default)]
    pub level: Option<AggregationLevel>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub with_energy: bool,
    #[serde(default)]
    pub energy_phase: Phase,
    /// Caller's explicit go-ahead for an oversized raw fetch.
    #[serde(default)]
    pub confirm_large: bool,
}

fn default_metrics() -> Vec<Metric> {
    Metric::READINGS.to_vec()
}

impl ChartRequest {
    pub fn context(&self, at_ms: i64) -> FetchContext {
        FetchContext {
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            level: self.level,
            device_ids: self.device_ids.iter().cloned().collect(),
            with_energy: self.with_energy,
            energy_phase: self.energy_phase,
            at_ms,
        }
    }

    fn span_seconds(&self) -> f64 {
        (self.end_ms - self.start_ms) as f64 / 1000.0
    }
}

/// The chart-ready result: aligned primary series, optional energy overlay,
/// and per-device failure notes (non-fatal; the devices that succeeded
/// still render).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub applied_level: AggregationLevel,
    pub series: UnifiedSeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyOverlay>,
    pub device_errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum ChartOutcome {
    Ready(Arc<ChartData>),
    /// Raw row count exceeds the configured threshold and the caller has not
    /// confirmed; no data was fetched.
    ConfirmationRequired { raw_count: u64 },
    /// A newer fetch superseded this one while it was in flight.
    Stale,
}

/// Coordinates historical fetches. Holds the last completed FetchContext and
/// its result so `Skip` serves the cache and `FetchSecondaryOnly` reuses the
/// primary series, and a generation counter so superseded in-flight fetches
/// are discarded on arrival instead of merged.
pub struct ChartFetcher {
    client: Arc<DataClient>,
    config: ChartConfig,
    generation: AtomicU64,
    last: Mutex<Option<(FetchContext, Arc<ChartData>)>>,
}

impl ChartFetcher {
    pub fn new(client: Arc<DataClient>, config: ChartConfig) -> Self {
        ChartFetcher {
            client,
            config,
            generation: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    pub async fn fetch_chart(
        &self,
        request: &ChartRequest,
        registry: &[DeviceInfo],
        now_ms: i64,
    ) -> ChartOutcome {
        let current = request.context(now_ms);
        let decision = {
            let last = self.last.lock().await;
            should_fetch(
                &current,
                last.as_ref().map(|(ctx, _)| ctx),
                self.config.min_refetch_interval_secs,
            )
        };

        match decision {
            FetchDecision::Skip => {
                let cached = self.last.lock().await.as_ref().map(|(_, d)| d.clone());
                match cached {
                    Some(data) => {
                        tracing::debug!("chart fetch skipped, serving cached result");
                        ChartOutcome::Ready(data)
                    }
                    None => self.fetch_full(request, registry, &current).await,
                }
            }
            FetchDecision::FetchSecondaryOnly => {
                self.fetch_secondary(request, registry, &current).await
            }
            FetchDecision::FetchPrimaryAndSecondary => {
                self.fetch_full(request, registry, &current).await
            }
        }
    }

    async fn fetch_full(
        &self,
        request: &ChartRequest,
        registry: &[DeviceInfo],
        current: &FetchContext,
    ) -> ChartOutcome {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let span_seconds = request.span_seconds();
        let poll_by_id: BTreeMap<&str, i64> = registry
            .iter()
            .map(|d| (d.device_id.as_str(), d.poll_interval_ms()))
            .collect();

        // One shared level for every device: per-device counts first, summed,
        // then the selector is called exactly once on the total.
        let counts = join_all(request.device_ids.iter().map(|id| async move {
            self.client
                .count_rows(id, request.start_ms, request.end_ms)
                .await
        }))
        .await;
        let mut total_rows: u64 = 0;
        for (id, result) in request.device_ids.iter().zip(&counts) {
            match result {
                Ok(n) => total_rows += n,
                Err(e) => {
                    tracing::warn!(device_id = %id, error = %e, "row count failed; assuming zero");
                }
            }
        }

        let effective_level = request.level.unwrap_or_else(|| {
            select::select_level(total_rows, span_seconds, self.config.target_points)
        });

        if effective_level == AggregationLevel::None
            && total_rows > self.config.large_query_threshold
            && !request.confirm_large
        {
            tracing::info!(
                total_rows,
                threshold = self.config.large_query_threshold,
                "raw fetch needs confirmation"
            );
            return ChartOutcome::ConfirmationRequired {
                raw_count: total_rows,
            };
        }

        let results = join_all(request.device_ids.iter().map(|id| async move {
            self.client
                .fetch_readings(id, request.start_ms, request.end_ms, effective_level)
                .await
        }))
        .await;

        let mut device_errors: BTreeMap<String, String> = BTreeMap::new();
        let mut streams: BTreeMap<String, Stream> = BTreeMap::new();
        let mut applied_level = effective_level;
        for (id, result) in request.device_ids.iter().zip(results) {
            let poll_ms = poll_by_id.get(id.as_str()).copied().unwrap_or(1000);
            match result {
                Ok(response) => {
                    // The service may coarsen beyond the requested level; the
                    // applied level must drive gap spacing and tolerances.
                    let applied = AggregationLevel::from_wire(&response.aggregation_applied)
                        .unwrap_or(effective_level);
                    applied_level = applied_level.max(applied);
                    let expected_ms = applied.bucket_ms().unwrap_or(poll_ms);
                    let stream = normalize::normalize_readings(id, &response.readings, expected_ms);
                    let stream = gaps::insert_gaps(
                        stream,
                        gaps::DEFAULT_THRESHOLD_MULTIPLIER,
                        gaps::MAX_SYNTHETIC_POINTS_PER_GAP,
                    );
                    streams.insert(id.clone(), stream);
                }
                Err(e) => {
                    tracing::warn!(device_id = %id, error = %e, "readings fetch failed");
                    device_errors.insert(id.clone(), e.to_string());
                    let expected_ms = effective_level.bucket_ms().unwrap_or(poll_ms);
                    streams.insert(id.clone(), Stream::empty(id.clone(), expected_ms));
                }
            }
        }

        let tolerances = default_tolerances(&streams);
        let series = align::align(&streams, &request.metrics, &tolerances);

        let energy = if request.with_energy {
            let (overlay, errors) = self.fetch_energy(request, span_seconds).await;
            device_errors.extend(errors);
            overlay
        } else {
            None
        };

        if self.generation.load(Ordering::SeqCst) != issued {
            tracing::debug!("discarding superseded chart fetch result");
            return ChartOutcome::Stale;
        }

        let data = Arc::new(ChartData {
            applied_level,
            series,
            energy,
            device_errors,
        });
        let mut completed = current.clone();
        completed.at_ms = now_epoch_ms();
        *self.last.lock().await = Some((completed, data.clone()));
        ChartOutcome::Ready(data)
    }

    /// Re-pulls only the energy overlay on top of the cached primary series.
    async fn fetch_secondary(
        &self,
        request: &ChartRequest,
        registry: &[DeviceInfo],
        current: &FetchContext,
    ) -> ChartOutcome {
        let cached = self.last.lock().await.as_ref().map(|(_, d)| d.clone());
        let Some(cached) = cached else {
            return self.fetch_full(request, registry, current).await;
        };

        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (energy, errors) = if request.with_energy {
            self.fetch_energy(request, request.span_seconds()).await
        } else {
            // Toggle turned off: nothing to fetch, drop the overlay.
            (None, BTreeMap::new())
        };

        if self.generation.load(Ordering::SeqCst) != issued {
            tracing::debug!("discarding superseded energy fetch result");
            return ChartOutcome::Stale;
        }

        let mut device_errors = cached.device_errors.clone();
        device_errors.extend(errors);
        let data = Arc::new(ChartData {
            applied_level: cached.applied_level,
            series: cached.series.clone(),
            energy,
            device_errors,
        });
        let mut completed = current.clone();
        completed.at_ms = now_epoch_ms();
        *self.last.lock().await = Some((completed, data.clone()));
        ChartOutcome::Ready(data)
    }

    async fn fetch_energy(
        &self,
        request: &ChartRequest,
        span_seconds: f64,
    ) -> (Option<EnergyOverlay>, BTreeMap<String, String>) {
        let requested =
            select::select_level_for_span(span_seconds, self.config.energy_target_buckets);
        let fallback_bucket_ms = requested.bucket_ms().unwrap_or(60_000);

        let results = join_all(request.device_ids.iter().map(|id| async move {
            self.client
                .fetch_energy_buckets(
                    id,
                    request.start_ms,
                    request.end_ms,
                    request.energy_phase,
                    requested,
                )
                .await
        }))
        .await;

        let mut errors: BTreeMap<String, String> = BTreeMap::new();
        let mut streams: BTreeMap<String, Stream> = BTreeMap::new();
        let mut raw_total_kwh: BTreeMap<String, f64> = BTreeMap::new();
        let mut applied_level = requested;
        for (id, result) in request.device_ids.iter().zip(results) {
            match result {
                Ok(response) => {
                    let applied = AggregationLevel::from_wire(&response.aggregation_applied)
                        .unwrap_or(requested);
                    applied_level = applied_level.max(applied);
                    let bucket_ms = applied.bucket_ms().unwrap_or(fallback_bucket_ms);
                    let stream = normalize::normalize_energy(id, &response.aggregated, bucket_ms);
                    let stream = gaps::insert_gaps(
                        stream,
                        gaps::DEFAULT_THRESHOLD_MULTIPLIER,
                        gaps::MAX_SYNTHETIC_POINTS_PER_GAP,
                    );
                    raw_total_kwh.insert(id.clone(), response.raw_total_kwh);
                    streams.insert(id.clone(), stream);
                }
                Err(e) => {
                    tracing::warn!(device_id = %id, error = %e, "energy fetch failed");
                    errors.insert(id.clone(), format!("energy: {e}"));
                    streams.insert(id.clone(), Stream::empty(id.clone(), fallback_bucket_ms));
                }
            }
        }

        let tolerances = default_tolerances(&streams);
        let series = align::align(&streams, &[Metric::EnergyKwh], &tolerances);
        (
            Some(EnergyOverlay {
                applied_level,
                series,
                raw_total_kwh,
            }),
            errors,
        )
    }
}

fn default_tolerances(streams: &BTreeMap<String, Stream>) -> BTreeMap<String, i64> {
    streams
        .iter()
        .map(|(id, s)| (id.clone(), s.default_tolerance_ms()))
        .collect()
}
