// Aggregation level selection. Two deliberately distinct heuristics:
// the primary series picks from point count + span, the energy overlay
// picks from span alone.

use crate::models::AggregationLevel;

/// Default rendered-point ceiling for the primary series.
pub const DEFAULT_TARGET_POINTS: u64 = 10_000;

/// Picks the bucket width that keeps the rendered point count under
/// `target_points`: `None` when the raw count already fits, otherwise the
/// smallest level whose bucket is at least `span / target_points`, falling
/// back to the coarsest level. Pure and stable; callers with multiple
/// devices sum their per-device counts and call once.
pub fn select_level(raw_count: u64, span_seconds: f64, target_points: u64) -> AggregationLevel {
    if raw_count <= target_points {
        return AggregationLevel::None;
    }

    let ideal_minutes = (span_seconds / 60.0) / target_points as f64;
    for level in AggregationLevel::ALL {
        if let Some(minutes) = level.bucket_minutes()
            && minutes as f64 >= ideal_minutes
        {
            return level;
        }
    }
    AggregationLevel::Month1
}

/// Span-only heuristic for the energy overlay: aims for `target_buckets`
/// bars across the visible range regardless of how many readings exist.
/// Never returns `None` - energy deltas need bucket boundaries.
pub fn select_level_for_span(span_seconds: f64, target_buckets: u64) -> AggregationLevel {
    let ideal_minutes = (span_seconds / 60.0) / target_buckets.max(1) as f64;
    for level in AggregationLevel::ALL {
        if let Some(minutes) = level.bucket_minutes()
            && minutes as f64 >= ideal_minutes
        {
            return level;
        }
    }
    AggregationLevel::Month1
}
