// Gap synthesis: explicit all-null markers between real points that are
// further apart than the stream's expected interval allows. A synthetic
// point means "known absence", distinguishing an outage from under-sampling.

use crate::models::{Sample, Stream};

/// Jitter tolerance: a gap is only a gap beyond 2.5x the expected interval.
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 2.5;

/// Cap on markers per gap so a week-long outage cannot flood the axis.
pub const MAX_SYNTHETIC_POINTS_PER_GAP: usize = 100;

/// Inserts evenly spaced synthetic null samples strictly between adjacent
/// real points whose spacing exceeds `expected_interval_ms x multiplier`.
/// The stream's expected interval must reflect the aggregation level that
/// was actually applied, not the device's raw poll interval. Streams with
/// fewer than two points pass through unchanged.
pub fn insert_gaps(stream: Stream, threshold_multiplier: f64, max_synthetic_per_gap: usize) -> Stream {
    if stream.samples.len() < 2 {
        return stream;
    }

    let expected = stream.expected_interval_ms.max(1);
    let threshold_ms = (expected as f64 * threshold_multiplier).round() as i64;

    let mut out: Vec<Sample> = Vec::with_capacity(stream.samples.len());
    for pair in stream.samples.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        out.push(prev);

        let gap_ms = next.timestamp_ms - prev.timestamp_ms;
        if gap_ms <= threshold_ms {
            continue;
        }

        let missing = ((gap_ms as u64).div_ceil(expected as u64) as i64 - 1).max(0) as usize;
        let count = missing.min(max_synthetic_per_gap);
        let step = gap_ms as f64 / (count as f64 + 1.0);
        for k in 1..=count {
            out.push(Sample::gap(prev.timestamp_ms + (step * k as f64).round() as i64));
        }
    }
    if let Some(last) = stream.samples.last() {
        out.push(*last);
    }

    Stream {
        samples: out,
        ..stream
    }
}
