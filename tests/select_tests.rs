// Aggregation level selection tests: count+span rule for the primary
// series, span-only rule for the energy overlay

use wattline::models::AggregationLevel;
use wattline::pipeline::select::{DEFAULT_TARGET_POINTS, select_level, select_level_for_span};

#[test]
fn small_count_needs_no_aggregation() {
    assert_eq!(
        select_level(5000, 3600.0, DEFAULT_TARGET_POINTS),
        AggregationLevel::None
    );
}

#[test]
fn count_equal_to_target_needs_no_aggregation() {
    assert_eq!(
        select_level(10_000, 3600.0, DEFAULT_TARGET_POINTS),
        AggregationLevel::None
    );
}

#[test]
fn dense_hour_picks_smallest_level() {
    // 50k points over one hour: ideal bucket 0.006 min, smallest level wins.
    assert_eq!(
        select_level(50_000, 3600.0, DEFAULT_TARGET_POINTS),
        AggregationLevel::Min1
    );
}

#[test]
fn month_of_seconds_picks_five_minutes() {
    // 30 days: ideal bucket (43200 min / 10000) = 4.32 -> next level up is 5min.
    let span = 30.0 * 86_400.0;
    assert_eq!(
        select_level(2_000_000, span, DEFAULT_TARGET_POINTS),
        AggregationLevel::Min5
    );
}

#[test]
fn absurd_span_falls_back_to_month() {
    // Ideal bucket wider than a month: the coarsest level caps it.
    let span = 43_200.0 * 60.0 * 10_000.0 * 2.0;
    assert_eq!(
        select_level(20_000, span, DEFAULT_TARGET_POINTS),
        AggregationLevel::Month1
    );
}

#[test]
fn selection_is_stable() {
    let a = select_level(123_456, 86_400.0, DEFAULT_TARGET_POINTS);
    let b = select_level(123_456, 86_400.0, DEFAULT_TARGET_POINTS);
    assert_eq!(a, b);
}

#[test]
fn span_rule_ignores_point_count_and_never_returns_none() {
    // One hour over 60 buckets: exactly 1min, regardless of how many rows exist.
    assert_eq!(select_level_for_span(3600.0, 60), AggregationLevel::Min1);
    // A tiny span still gets the finest aggregated level, never raw.
    assert_eq!(select_level_for_span(60.0, 60), AggregationLevel::Min1);
}

#[test]
fn span_rule_scales_with_range() {
    // One week over 60 buckets: ideal 168 min -> 3hour (180 min).
    assert_eq!(
        select_level_for_span(7.0 * 86_400.0, 60),
        AggregationLevel::Hour3
    );
    // Thirty days over 60 buckets: ideal 720 min -> 12hour.
    assert_eq!(
        select_level_for_span(30.0 * 86_400.0, 60),
        AggregationLevel::Hour12
    );
}

#[test]
fn levels_are_ordered_by_bucket_width() {
    let widths: Vec<i64> = AggregationLevel::ALL
        .iter()
        .filter_map(|l| l.bucket_minutes())
        .collect();
    assert!(widths.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn wire_names_round_trip() {
    for level in AggregationLevel::ALL {
        assert_eq!(AggregationLevel::from_wire(level.as_str()), Some(level));
    }
    assert_eq!(AggregationLevel::from_wire("auto"), None);
}
