// Multi-stream temporal alignment: merge independently-sampled streams onto
// the sorted union of their timestamps via nearest-neighbor matching with a
// per-device tolerance. The aligner never invents timestamps.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Metric, SeriesColumn, Stream, UnifiedFrame, UnifiedSeries};

/// Nearest element by timestamp within `tolerance_ms`, found by binary
/// search over an ascending slice. Equidistant ties prefer the earlier
/// element (already-elapsed data over not-yet-arrived). Shared by the power
/// and energy alignment paths.
pub fn nearest_within<T>(
    items: &[T],
    timestamp_of: impl Fn(&T) -> i64,
    target_ms: i64,
    tolerance_ms: i64,
) -> Option<&T> {
    if items.is_empty() {
        return None;
    }

    let idx = items.partition_point(|item| timestamp_of(item) < target_ms);
    let mut best: Option<(&T, i64)> = None;
    if idx < items.len() {
        let candidate = &items[idx];
        best = Some((candidate, (timestamp_of(candidate) - target_ms).abs()));
    }
    if idx > 0 {
        let candidate = &items[idx - 1];
        let distance = (target_ms - timestamp_of(candidate)).abs();
        // <= so the earlier sample wins an exact tie
        if best.is_none_or(|(_, d)| distance <= d) {
            best = Some((candidate, distance));
        }
    }

    best.and_then(|(item, distance)| (distance <= tolerance_ms).then_some(item))
}

/// Aligns N streams onto one shared axis. Output columns are one
/// (device, metric) pair per requested metric, devices in map order; a
/// device contributes null at an axis timestamp when its nearest sample is
/// farther away than its tolerance. Tolerance falls back to each stream's
/// default (1.5 x expected interval) when the map has no entry.
pub fn align(
    streams: &BTreeMap<String, Stream>,
    metrics: &[Metric],
    tolerances: &BTreeMap<String, i64>,
) -> UnifiedSeries {
    let mut axis: BTreeSet<i64> = BTreeSet::new();
    for stream in streams.values() {
        for sample in &stream.samples {
            axis.insert(sample.timestamp_ms);
        }
    }

    let mut columns = Vec::with_capacity(streams.len() * metrics.len());
    for device_id in streams.keys() {
        for metric in metrics {
            columns.push(SeriesColumn {
                device_id: device_id.clone(),
                metric: *metric,
            });
        }
    }

    let mut frames = Vec::with_capacity(axis.len());
    for timestamp_ms in axis {
        let mut values = Vec::with_capacity(columns.len());
        for (device_id, stream) in streams {
            let tolerance_ms = tolerances
                .get(device_id)
                .copied()
                .unwrap_or_else(|| stream.default_tolerance_ms());
            let nearest = nearest_within(
                &stream.samples,
                |s| s.timestamp_ms,
                timestamp_ms,
                tolerance_ms,
            );
            for metric in metrics {
                values.push(nearest.and_then(|s| s.values.get(*metric)));
            }
        }
        frames.push(UnifiedFrame {
            timestamp_ms,
            values,
        });
    }

    UnifiedSeries { columns, frames }
}
