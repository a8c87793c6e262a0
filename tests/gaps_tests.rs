// Gap synthesis tests: marker count, spacing, the per-gap cap and pass-through

use wattline::models::{MetricValues, Sample, Stream};
use wattline::pipeline::gaps::{
    DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP, insert_gaps,
};

fn real(timestamp_ms: i64, active_power: f64) -> Sample {
    Sample {
        timestamp_ms,
        values: MetricValues {
            active_power: Some(active_power),
            ..MetricValues::default()
        },
        synthetic: false,
    }
}

fn stream(expected_interval_ms: i64, samples: Vec<Sample>) -> Stream {
    Stream {
        device_id: "meter-a".to_string(),
        expected_interval_ms,
        samples,
    }
}

#[test]
fn ten_minute_outage_at_one_minute_interval_yields_nine_markers() {
    let s = stream(60_000, vec![real(0, 10.0), real(600_000, 20.0)]);
    let out = insert_gaps(s, DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP);

    assert_eq!(out.len(), 11);
    let synthetic: Vec<&Sample> = out.samples.iter().filter(|s| s.synthetic).collect();
    assert_eq!(synthetic.len(), 9);
    for (i, s) in synthetic.iter().enumerate() {
        assert_eq!(s.timestamp_ms, (i as i64 + 1) * 60_000);
        assert_eq!(s.values.active_power, None);
        assert_eq!(s.values.voltage_rms, None);
    }
}

#[test]
fn jitter_below_threshold_inserts_nothing() {
    // 2.4x the expected interval is jitter, not an outage.
    let s = stream(1000, vec![real(0, 1.0), real(2400, 2.0)]);
    let out = insert_gaps(s.clone(), DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP);
    assert_eq!(out, s);
}

#[test]
fn marker_count_is_capped_per_gap() {
    // A day-long hole at 1s sampling would need 86399 markers; the cap holds.
    let s = stream(1000, vec![real(0, 1.0), real(86_400_000, 2.0)]);
    let out = insert_gaps(s, DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP);
    let synthetic = out.samples.iter().filter(|s| s.synthetic).count();
    assert_eq!(synthetic, MAX_SYNTHETIC_POINTS_PER_GAP);
}

#[test]
fn markers_stay_strictly_between_the_real_pair() {
    let s = stream(1000, vec![real(1_000_000, 1.0), real(1_010_000, 2.0)]);
    let out = insert_gaps(s, DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP);
    for sample in out.samples.iter().filter(|s| s.synthetic) {
        assert!(sample.timestamp_ms > 1_000_000);
        assert!(sample.timestamp_ms < 1_010_000);
    }
    let timestamps: Vec<i64> = out.samples.iter().map(|s| s.timestamp_ms).collect();
    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn fewer_than_two_points_pass_through() {
    let empty = stream(1000, vec![]);
    assert_eq!(
        insert_gaps(empty.clone(), DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP),
        empty
    );
    let single = stream(1000, vec![real(42, 1.0)]);
    assert_eq!(
        insert_gaps(single.clone(), DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP),
        single
    );
}

#[test]
fn multiple_gaps_are_each_filled() {
    let s = stream(
        1000,
        vec![real(0, 1.0), real(5000, 2.0), real(6000, 3.0), real(11_000, 4.0)],
    );
    let out = insert_gaps(s, DEFAULT_THRESHOLD_MULTIPLIER, MAX_SYNTHETIC_POINTS_PER_GAP);
    // Each 5s hole at 1s sampling needs ceil(5000/1000)-1 = 4 markers.
    assert_eq!(out.samples.iter().filter(|s| s.synthetic).count(), 8);
    assert_eq!(out.len(), 12);
}
