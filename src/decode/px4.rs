//! PX4 decoder: ULog topics onto unified channels.
//!
//! Unlike the ArduPilot path, ULog carries no pre-aggregated vibration or
//! clipping fields, so both are derived here from the raw accelerometer
//! stream: vibration as a rolling standard deviation over a fixed trailing
//! window, clipping as threshold crossings deduplicated per axis within a
//! refractory interval.

use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::raw::{ulog, RawLog, RawRecord};
use crate::types::channel::{self, Channel};
use crate::types::{BodyAxis, ClippingEvent, LogFormat};

use super::{DecodedLog, LogDecoder};

/// Optical-flow topic renames across PX4 generations, newest first.
const FLOW_TOPICS: [&str; 2] = ["vehicle_optical_flow", "optical_flow"];

pub struct Px4Decoder;

impl LogDecoder for Px4Decoder {
    fn format(&self) -> LogFormat {
        LogFormat::Px4
    }

    fn decode(&self, data: &[u8], config: &AnalysisConfig) -> Result<DecodedLog> {
        let raw = ulog::read_log(data);

        let mut out = DecodedLog {
            warnings: raw.warnings.clone(),
            ..Default::default()
        };

        map_attitude(&raw, &mut out);
        map_rates(&raw, &mut out);
        map_gps(&raw, &mut out);
        map_local_position(&raw, &mut out);
        map_optical_flow(&raw, &mut out);
        derive_accelerometer_channels(&raw, config, &mut out);

        info!(
            channels = out.channels.len(),
            clipping_events = out.clipping_events.len(),
            "PX4 decode finished"
        );

        Ok(out)
    }
}

fn push_field(records: &[RawRecord], field: &str, name: &str, unit: &'static str) -> Option<Channel> {
    let mut ch = Channel::new(name, unit);
    for record in records {
        if let Some(value) = record.value(field) {
            ch.push(record.time_us, value);
        }
    }
    if ch.is_empty() {
        None
    } else {
        Some(ch)
    }
}

fn push_mapped(
    records: &[RawRecord],
    field: &str,
    name: &str,
    unit: &'static str,
    map: impl Fn(f64) -> f64,
) -> Option<Channel> {
    let mut ch = Channel::new(name, unit);
    for record in records {
        if let Some(value) = record.value(field) {
            ch.push(record.time_us, map(value));
        }
    }
    if ch.is_empty() {
        None
    } else {
        Some(ch)
    }
}

/// vehicle_attitude carries the orientation quaternion; the unified channel
/// set wants Euler angles in degrees.
fn map_attitude(raw: &RawLog, out: &mut DecodedLog) {
    let Some(records) = raw.group("vehicle_attitude") else {
        return;
    };

    let mut roll = Channel::new(channel::ROLL, "deg");
    let mut pitch = Channel::new(channel::PITCH, "deg");
    let mut yaw = Channel::new(channel::YAW, "deg");

    for record in records {
        let (Some(w), Some(x), Some(y), Some(z)) = (
            record.value("q[0]"),
            record.value("q[1]"),
            record.value("q[2]"),
            record.value("q[3]"),
        ) else {
            continue;
        };
        let (r, p, yw) = quaternion_to_euler_deg(w, x, y, z);
        roll.push(record.time_us, r);
        pitch.push(record.time_us, p);
        yaw.push(record.time_us, yw);
    }

    if roll.is_empty() {
        out.warnings
            .push("vehicle_attitude present but quaternion fields missing".to_string());
        return;
    }
    out.channels.extend([roll, pitch, yaw]);
}

fn map_rates(raw: &RawLog, out: &mut DecodedLog) {
    if let Some(records) = raw.group("vehicle_angular_velocity") {
        for (field, name) in [
            ("xyz[0]", channel::RATE_ROLL),
            ("xyz[1]", channel::RATE_PITCH),
            ("xyz[2]", channel::RATE_YAW),
        ] {
            if let Some(ch) = push_mapped(records, field, name, "deg/s", f64::to_degrees) {
                out.channels.push(ch);
            }
        }
    }

    if let Some(records) = raw.group("vehicle_rates_setpoint") {
        for (field, name) in [
            ("roll", channel::RATE_ROLL_DESIRED),
            ("pitch", channel::RATE_PITCH_DESIRED),
            ("yaw", channel::RATE_YAW_DESIRED),
        ] {
            if let Some(ch) = push_mapped(records, field, name, "deg/s", f64::to_degrees) {
                out.channels.push(ch);
            }
        }
    }
}

/// vehicle_gps_position stores lat/lon as degrees * 1e7 and altitude in
/// millimeters.
fn map_gps(raw: &RawLog, out: &mut DecodedLog) {
    let Some(records) = raw.group("vehicle_gps_position") else {
        return;
    };
    for (field, name, unit, scale) in [
        ("lat", channel::GPS_LAT, "deg", 1e-7),
        ("lon", channel::GPS_LON, "deg", 1e-7),
        ("alt", channel::GPS_ALT, "m", 1e-3),
    ] {
        if let Some(ch) = push_mapped(records, field, name, unit, |v| v * scale) {
            out.channels.push(ch);
        }
    }
}

fn map_local_position(raw: &RawLog, out: &mut DecodedLog) {
    let Some(records) = raw.group("vehicle_local_position") else {
        return;
    };
    for (field, name) in [
        ("x", channel::LOCAL_X),
        ("y", channel::LOCAL_Y),
        ("z", channel::LOCAL_Z),
    ] {
        if let Some(ch) = push_field(records, field, name, "m") {
            out.channels.push(ch);
        }
    }
}

/// Flow topics and field names were renamed repeatedly; try the known
/// variants in order and take the first that yields data.
fn map_optical_flow(raw: &RawLog, out: &mut DecodedLog) {
    let Some(records) = FLOW_TOPICS.iter().find_map(|t| raw.group(t)) else {
        return;
    };

    let field_variants: [(&str, &str); 3] = [
        ("pixel_flow[0]", "pixel_flow[1]"),
        ("pixel_flow_x_integral", "pixel_flow_y_integral"),
        ("integrated_x", "integrated_y"),
    ];
    for (x_field, y_field) in field_variants {
        if let Some(ch) = push_field(records, x_field, channel::FLOW_X, "rad") {
            out.channels.push(ch);
            if let Some(ch) = push_field(records, y_field, channel::FLOW_Y, "rad") {
                out.channels.push(ch);
            }
            break;
        }
    }

    if let Some(ch) = push_field(records, "quality", channel::FLOW_QUALITY, "") {
        out.channels.push(ch);
    }
}

/// Vibration and clipping both come from the raw accelerometer stream in
/// sensor_combined.
fn derive_accelerometer_channels(raw: &RawLog, config: &AnalysisConfig, out: &mut DecodedLog) {
    let Some(records) = raw.group("sensor_combined") else {
        return;
    };

    let axes: [(&str, &str, BodyAxis); 3] = [
        ("accelerometer_m_s2[0]", channel::VIBRATION_X, BodyAxis::X),
        ("accelerometer_m_s2[1]", channel::VIBRATION_Y, BodyAxis::Y),
        ("accelerometer_m_s2[2]", channel::VIBRATION_Z, BodyAxis::Z),
    ];

    for (field, vibration_name, axis) in axes {
        let samples: Vec<(u64, f64)> = records
            .iter()
            .filter_map(|r| r.value(field).map(|v| (r.time_us, v)))
            .collect();
        if samples.is_empty() {
            continue;
        }

        let mut ch = Channel::new(vibration_name, "m/s^2");
        for (time_us, dev) in rolling_std(&samples, config.vibration_window_samples) {
            ch.push(time_us, dev);
        }
        if !ch.is_empty() {
            out.channels.push(ch);
        }

        detect_clipping(
            &samples,
            axis,
            config.accel_clip_threshold_ms2,
            config.clip_refractory_us,
            &mut out.clipping_events,
        );
    }

    out.clipping_events.sort_by_key(|e| e.time_us);
}

/// Trailing-window sample standard deviation, emitted once the window is
/// full and stamped with the newest sample's time.
fn rolling_std(samples: &[(u64, f64)], window: usize) -> Vec<(u64, f64)> {
    let mut out = Vec::new();
    if window < 2 || samples.len() < window {
        return out;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for (i, &(time_us, value)) in samples.iter().enumerate() {
        sum += value;
        sum_sq += value * value;
        if i >= window {
            let (_, old) = samples[i - window];
            sum -= old;
            sum_sq -= old * old;
        }
        if i + 1 >= window {
            let n = window as f64;
            let variance = (sum_sq - sum * sum / n) / (n - 1.0);
            out.push((time_us, variance.max(0.0).sqrt()));
        }
    }
    out
}

/// One event per saturation burst: a clipped sample arms the axis, and
/// further clipped samples inside the refractory interval extend the burst
/// without firing again.
fn detect_clipping(
    samples: &[(u64, f64)],
    axis: BodyAxis,
    threshold: f64,
    refractory_us: u64,
    events: &mut Vec<ClippingEvent>,
) {
    let mut last_clip_us: Option<u64> = None;
    for &(time_us, value) in samples {
        if value.abs() < threshold {
            continue;
        }
        let fires = match last_clip_us {
            Some(prev) => time_us.saturating_sub(prev) > refractory_us,
            None => true,
        };
        if fires {
            events.push(ClippingEvent { time_us, axis });
        }
        last_clip_us = Some(time_us);
    }
}

fn quaternion_to_euler_deg(w: f64, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_std_constant_signal_is_zero() {
        let samples: Vec<(u64, f64)> = (0..10).map(|i| (i * 1_000, 9.81)).collect();
        let devs = rolling_std(&samples, 5);
        assert_eq!(devs.len(), 6);
        assert!(devs.iter().all(|(_, d)| d.abs() < 1e-12));
        // Stamped with the newest sample of each window
        assert_eq!(devs[0].0, 4_000);
    }

    #[test]
    fn test_rolling_std_matches_sample_deviation() {
        // std of [1, 2, 3, 4] with ddof 1 is sqrt(5/3)
        let samples = vec![(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)];
        let devs = rolling_std(&samples, 4);
        assert_eq!(devs.len(), 1);
        assert!((devs[0].1 - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_std_short_input_emits_nothing() {
        let samples = vec![(0, 1.0), (1, 2.0)];
        assert!(rolling_std(&samples, 5).is_empty());
    }

    #[test]
    fn test_clipping_burst_collapses_to_one_event() {
        // 5 consecutive saturated samples inside one refractory interval
        let samples: Vec<(u64, f64)> = (0..5).map(|i| (i * 10_000, 160.0)).collect();
        let mut events = Vec::new();
        detect_clipping(&samples, BodyAxis::X, 156.9, 200_000, &mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time_us, 0);
    }

    #[test]
    fn test_clipping_fires_again_after_refractory() {
        let samples = vec![(0, 170.0), (500_000, -170.0)];
        let mut events = Vec::new();
        detect_clipping(&samples, BodyAxis::Z, 156.9, 200_000, &mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_quaternion_identity_is_level() {
        let (r, p, y) = quaternion_to_euler_deg(1.0, 0.0, 0.0, 0.0);
        assert!(r.abs() < 1e-9 && p.abs() < 1e-9 && y.abs() < 1e-9);
    }

    #[test]
    fn test_quaternion_quarter_roll() {
        // 90 degree roll: q = (cos45, sin45, 0, 0)
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let (r, p, y) = quaternion_to_euler_deg(h, h, 0.0, 0.0);
        assert!((r - 90.0).abs() < 1e-9);
        assert!(p.abs() < 1e-9 && y.abs() < 1e-9);
    }
}
