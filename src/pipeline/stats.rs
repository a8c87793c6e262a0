// Summary statistics over one device's fetched range. Synthetic gap markers
// are excluded; energy is a trapezoidal integral of active power, so uneven
// sampling does not skew the total.

use crate::models::{Stream, StreamStatistics};

/// Watt-milliseconds per kWh.
const WMS_PER_KWH: f64 = 3_600_000_000.0;

pub fn summarize(stream: &Stream, start_ms: i64, end_ms: i64) -> StreamStatistics {
    let real: Vec<_> = stream.samples.iter().filter(|s| !s.synthetic).collect();

    let voltages: Vec<f64> = real.iter().filter_map(|s| s.values.voltage_rms).collect();
    let currents: Vec<f64> = real.iter().filter_map(|s| s.values.current_rms).collect();
    let powers: Vec<f64> = real.iter().filter_map(|s| s.values.active_power).collect();

    let mut total_energy_kwh = None;
    for pair in real.windows(2) {
        let (Some(p0), Some(p1)) = (pair[0].values.active_power, pair[1].values.active_power)
        else {
            continue;
        };
        let dt_ms = (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64;
        let kwh = (p0 + p1) / 2.0 * dt_ms / WMS_PER_KWH;
        total_energy_kwh = Some(total_energy_kwh.unwrap_or(0.0) + kwh);
    }

    StreamStatistics {
        device_id: stream.device_id.clone(),
        start_ms,
        end_ms,
        sample_count: real.len(),
        avg_voltage: mean(&voltages),
        min_voltage: fold_min(&voltages),
        max_voltage: fold_max(&voltages),
        avg_current: mean(&currents),
        max_current: fold_max(&currents),
        avg_power: mean(&powers),
        max_power: fold_max(&powers),
        total_energy_kwh,
    }
}

fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    Some(v.iter().sum::<f64>() / v.len() as f64)
}

fn fold_min(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    Some(v.iter().copied().fold(f64::INFINITY, f64::min))
}

fn fold_max(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    Some(v.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}
