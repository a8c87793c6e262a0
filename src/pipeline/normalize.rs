// Per-stream normalization: service rows (any order, possibly malformed)
// into a canonical ascending Stream.

use crate::client::{EnergyBucketRow, ReadingRow};
use crate::models::{MetricValues, Sample, Stream};

/// Parses a service timestamp as a UTC instant in epoch millis. The service
/// emits RFC 3339 or naive "YYYY-MM-DD HH:MM:SS[.fff]" strings; a naive
/// timestamp is UTC, never local time.
pub fn parse_utc_ms(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    Some(naive.and_utc().timestamp_millis())
}

/// Converts one readings row to a Sample; `None` when the timestamp is
/// unparsable (the row is dropped, not the fetch).
pub fn sample_from_row(row: &ReadingRow) -> Option<Sample> {
    let timestamp_ms = parse_utc_ms(&row.timestamp)?;
    Some(Sample {
        timestamp_ms,
        values: MetricValues {
            voltage_rms: row.voltage_rms,
            current_rms: row.current_rms,
            active_power: row.active_power,
            reactive_power: row.reactive_power,
            apparent_power: row.apparent_power,
            power_factor: row.power_factor,
            frequency: row.frequency,
            energy_kwh: None,
        },
        synthetic: false,
    })
}

/// Normalizes historical readings rows into an ascending Stream.
/// Rows usually arrive most-recent-first; every downstream step assumes
/// ascending order, so reordering happens here and nowhere else. A malformed
/// row (missing timestamp, unparsable value) is dropped, not the fetch;
/// duplicate timestamps keep the later row.
pub fn normalize_readings(
    device_id: &str,
    rows: &[serde_json::Value],
    expected_interval_ms: i64,
) -> Stream {
    let samples = rows
        .iter()
        .map(|row| {
            let row: ReadingRow = serde_json::from_value(row.clone()).ok()?;
            sample_from_row(&row)
        })
        .collect::<Vec<_>>();
    let dropped = samples.iter().filter(|s| s.is_none()).count();
    if dropped > 0 {
        tracing::debug!(
            device_id = %device_id,
            dropped,
            "dropped malformed readings rows"
        );
    }
    finish(device_id, samples.into_iter().flatten(), expected_interval_ms)
}

/// Normalizes energy overlay buckets into an ascending Stream carrying only
/// the `energy_kwh` channel, keyed by bucket start.
pub fn normalize_energy(
    device_id: &str,
    buckets: &[EnergyBucketRow],
    bucket_interval_ms: i64,
) -> Stream {
    let samples = buckets.iter().filter_map(|b| {
        let timestamp_ms = parse_utc_ms(&b.timestamp)?;
        Some(Sample {
            timestamp_ms,
            values: MetricValues {
                energy_kwh: Some(b.energy_kwh),
                ..MetricValues::default()
            },
            synthetic: false,
        })
    });
    finish(device_id, samples, bucket_interval_ms)
}

fn finish(
    device_id: &str,
    samples: impl Iterator<Item = Sample>,
    expected_interval_ms: i64,
) -> Stream {
    let mut samples: Vec<Sample> = samples.collect();
    // Stable sort keeps input order among equal timestamps, so keeping the
    // last sample of each run implements later-row-wins.
    samples.sort_by_key(|s| s.timestamp_ms);
    let mut deduped: Vec<Sample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match deduped.last_mut() {
            Some(last) if last.timestamp_ms == sample.timestamp_ms => *last = sample,
            _ => deduped.push(sample),
        }
    }
    Stream {
        device_id: device_id.to_string(),
        expected_interval_ms,
        samples: deduped,
    }
}
