//! Diagnostics over the unified dataset.
//!
//! Pure functions: one immutable dataset in, one report out. Missing
//! channels never raise; every skipped section is recorded as a
//! human-readable omission note instead.

use tracing::info;

use crate::config::AnalysisConfig;
use crate::types::channel;
use crate::types::{
    AlignedColumn, BodyAxis, ClippingEvent, DegradedRun, DiagnosticReport, OpticalFlowQuality,
    RateAxis, TrackingMetric, TrajectorySummary, UnifiedLogDataset, VibrationEvent,
};

/// GPS fixes averaged into the home-altitude baseline.
const HOME_BASELINE_FIXES: usize = 10;

/// Compute the full diagnostic report for one run.
///
/// Clipping events were established at decode time and are carried through
/// verbatim.
pub fn run_diagnostics(
    dataset: &UnifiedLogDataset,
    clipping_events: &[ClippingEvent],
    config: &AnalysisConfig,
) -> DiagnosticReport {
    let mut omissions = Vec::new();

    let vibration_events = scan_vibration(dataset, config, &mut omissions);
    let tracking = tracking_errors(dataset, &mut omissions);
    let optical_flow = flow_quality(dataset, config, &mut omissions);
    let trajectory = trajectory_summary(dataset, &mut omissions);

    info!(
        vibration_events = vibration_events.len(),
        clipping_events = clipping_events.len(),
        tracked_axes = tracking.len(),
        omissions = omissions.len(),
        "diagnostics finished"
    );

    DiagnosticReport {
        duration_s: dataset.duration_seconds(),
        vibration_events,
        clipping_events: clipping_events.to_vec(),
        tracking,
        optical_flow,
        trajectory,
        omissions,
    }
}

/// Flag every cell above the danger threshold and merge flagged cells
/// within the merge gap into one event per axis.
fn scan_vibration(
    dataset: &UnifiedLogDataset,
    config: &AnalysisConfig,
    omissions: &mut Vec<String>,
) -> Vec<VibrationEvent> {
    let axes: [(&str, BodyAxis); 3] = [
        (channel::VIBRATION_X, BodyAxis::X),
        (channel::VIBRATION_Y, BodyAxis::Y),
        (channel::VIBRATION_Z, BodyAxis::Z),
    ];

    let mut events = Vec::new();
    let mut any_channel = false;

    for (name, axis) in axes {
        let Some(column) = dataset.column(name) else {
            continue;
        };
        any_channel = true;

        let mut open: Option<VibrationEvent> = None;
        for (i, cell) in column.values.iter().enumerate() {
            let Some(value) = *cell else { continue };
            if value <= config.vibration_danger_threshold {
                continue;
            }
            let time_us = dataset.timeline_us[i];

            match open.take() {
                Some(mut event)
                    if time_us.saturating_sub(event.end_us) <= config.vibration_merge_gap_us =>
                {
                    event.end_us = time_us;
                    if value > event.peak {
                        event.peak = value;
                    }
                    open = Some(event);
                }
                finished => {
                    if let Some(done) = finished {
                        events.push(done);
                    }
                    open = Some(VibrationEvent {
                        axis,
                        start_us: time_us,
                        end_us: time_us,
                        peak: value,
                    });
                }
            }
        }
        if let Some(done) = open {
            events.push(done);
        }
    }

    if !any_channel {
        omissions.push("vibration diagnostics skipped: no vibration channels decoded".to_string());
    }

    events.sort_by_key(|e| e.start_us);
    events
}

/// Mean absolute error between desired and actual rate, per axis, over
/// rows where both sides have data.
fn tracking_errors(dataset: &UnifiedLogDataset, omissions: &mut Vec<String>) -> Vec<TrackingMetric> {
    let axes: [(RateAxis, &str, &str); 3] = [
        (RateAxis::Roll, channel::RATE_ROLL_DESIRED, channel::RATE_ROLL),
        (RateAxis::Pitch, channel::RATE_PITCH_DESIRED, channel::RATE_PITCH),
        (RateAxis::Yaw, channel::RATE_YAW_DESIRED, channel::RATE_YAW),
    ];

    let mut metrics = Vec::new();
    for (axis, desired_name, actual_name) in axes {
        let (Some(desired), Some(actual)) =
            (dataset.column(desired_name), dataset.column(actual_name))
        else {
            omissions.push(format!(
                "rate tracking ({}) skipped: desired or actual channel missing",
                axis
            ));
            continue;
        };

        let mut total = 0.0f64;
        let mut count = 0usize;
        for (d, a) in desired.values.iter().zip(actual.values.iter()) {
            if let (Some(d), Some(a)) = (d, a) {
                total += (d - a).abs();
                count += 1;
            }
        }

        if count == 0 {
            omissions.push(format!(
                "rate tracking ({}) skipped: no overlapping samples",
                axis
            ));
            continue;
        }

        metrics.push(TrackingMetric {
            axis,
            mean_abs_error: total / count as f64,
            samples: count,
        });
    }

    metrics
}

/// Degraded fraction plus sustained degraded stretches of the flow-quality
/// channel. A "no data" cell ends any open stretch.
fn flow_quality(
    dataset: &UnifiedLogDataset,
    config: &AnalysisConfig,
    omissions: &mut Vec<String>,
) -> Option<OpticalFlowQuality> {
    let Some(column) = dataset.column(channel::FLOW_QUALITY) else {
        omissions
            .push("optical-flow diagnostics skipped: no flow-quality channel decoded".to_string());
        return None;
    };

    let mut samples = 0usize;
    let mut degraded = 0usize;
    let mut runs: Vec<DegradedRun> = Vec::new();
    let mut open: Option<DegradedRun> = None;

    for (i, cell) in column.values.iter().enumerate() {
        match *cell {
            Some(value) if value < config.flow_quality_floor => {
                samples += 1;
                degraded += 1;
                let time_us = dataset.timeline_us[i];
                if let Some(run) = open.as_mut() {
                    run.end_us = time_us;
                } else {
                    open = Some(DegradedRun {
                        start_us: time_us,
                        end_us: time_us,
                    });
                }
            }
            Some(_) => {
                samples += 1;
                close_run(&mut open, &mut runs, config);
            }
            None => close_run(&mut open, &mut runs, config),
        }
    }
    close_run(&mut open, &mut runs, config);

    if samples == 0 {
        omissions.push("optical-flow diagnostics skipped: flow-quality channel empty".to_string());
        return None;
    }

    Some(OpticalFlowQuality {
        degraded_fraction: degraded as f64 / samples as f64,
        degraded_runs: runs,
        samples,
    })
}

fn close_run(open: &mut Option<DegradedRun>, runs: &mut Vec<DegradedRun>, config: &AnalysisConfig) {
    if let Some(run) = open.take() {
        if run.end_us.saturating_sub(run.start_us) >= config.flow_degraded_min_duration_us {
            runs.push(run);
        }
    }
}

fn column_min_max(column: &AlignedColumn) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;
    for value in column.values.iter().flatten() {
        min = min.min(*value);
        max = max.max(*value);
        seen = true;
    }
    seen.then_some((min, max))
}

/// GPS extent when the log has position fixes; local-position (NED) path
/// extent for GPS-denied logs. The two are mutually exclusive per run.
fn trajectory_summary(
    dataset: &UnifiedLogDataset,
    omissions: &mut Vec<String>,
) -> Option<TrajectorySummary> {
    let gps = (
        dataset.column(channel::GPS_LAT).and_then(column_min_max),
        dataset.column(channel::GPS_LON).and_then(column_min_max),
        dataset.column(channel::GPS_ALT),
    );

    if let (Some((lat_min, lat_max)), Some((lon_min, lon_max)), Some(alt_column)) = gps {
        if let Some((alt_min, alt_max)) = column_min_max(alt_column) {
            // Home baseline: mean of the first fixes, as flown altitude
            // references the takeoff point rather than sea level.
            let first_fixes: Vec<f64> = alt_column
                .values
                .iter()
                .flatten()
                .take(HOME_BASELINE_FIXES)
                .copied()
                .collect();
            let home_alt = first_fixes.iter().sum::<f64>() / first_fixes.len() as f64;

            return Some(TrajectorySummary::Gps {
                lat_min,
                lat_max,
                lon_min,
                lon_max,
                alt_min_m: alt_min,
                alt_max_m: alt_max,
                alt_range_m: alt_max - alt_min,
                relative_alt_max_m: alt_max - home_alt,
            });
        }
    }

    let local = (
        dataset.column(channel::LOCAL_X).and_then(column_min_max),
        dataset.column(channel::LOCAL_Y).and_then(column_min_max),
        dataset.column(channel::LOCAL_Z).and_then(column_min_max),
    );
    if let (Some((x_min, x_max)), Some((y_min, y_max)), Some((z_min, z_max))) = local {
        return Some(TrajectorySummary::LocalPath {
            x_min_m: x_min,
            x_max_m: x_max,
            y_min_m: y_min,
            y_max_m: y_max,
            z_min_m: z_min,
            z_max_m: z_max,
        });
    }

    omissions.push("trajectory summary skipped: no GPS or local-position channels".to_string());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_channels;
    use crate::types::channel::Channel;

    fn channel_of(name: &str, samples: &[(u64, f64)]) -> Channel {
        let mut ch = Channel::new(name, "");
        for &(t, v) in samples {
            ch.push(t, v);
        }
        ch
    }

    fn dataset_of(channels: &[Channel]) -> UnifiedLogDataset {
        align_channels(channels, &AnalysisConfig::default())
    }

    #[test]
    fn test_single_vibration_event_with_peak() {
        let vibe = channel_of(
            channel::VIBRATION_X,
            &[(0, 10.0), (100, 35.0), (200, 40.0), (300, 38.0), (400, 12.0)],
        );
        let dataset = dataset_of(&[vibe]);
        let report = run_diagnostics(&dataset, &[], &AnalysisConfig::default());

        assert_eq!(report.vibration_events.len(), 1);
        let event = &report.vibration_events[0];
        assert_eq!(event.start_us, 100);
        assert_eq!(event.end_us, 300);
        assert_eq!(event.peak, 40.0);
        assert_eq!(event.axis, BodyAxis::X);
    }

    #[test]
    fn test_vibration_events_split_across_large_gap() {
        let mut config = AnalysisConfig::default();
        config.vibration_merge_gap_us = 100;
        // Keep held values alive across the whole span
        config.forward_fill_gap_us = 10_000_000;

        let vibe = channel_of(
            channel::VIBRATION_Y,
            &[(0, 50.0), (50, 45.0), (5_000, 60.0)],
        );
        let dataset = align_channels(&[vibe], &config);
        let report = run_diagnostics(&dataset, &[], &config);

        assert_eq!(report.vibration_events.len(), 2);
        assert_eq!(report.vibration_events[0].peak, 50.0);
        assert_eq!(report.vibration_events[1].peak, 60.0);
    }

    #[test]
    fn test_tracking_mae() {
        let desired = channel_of(
            channel::RATE_ROLL_DESIRED,
            &[(0, 0.0), (1, 1.0), (2, 2.0), (3, 3.0)],
        );
        let actual = channel_of(
            channel::RATE_ROLL,
            &[(0, 0.0), (1, 1.0), (2, 1.0), (3, 3.0)],
        );
        let dataset = dataset_of(&[desired, actual]);
        let report = run_diagnostics(&dataset, &[], &AnalysisConfig::default());

        let roll = report
            .tracking
            .iter()
            .find(|m| m.axis == RateAxis::Roll)
            .expect("roll metric");
        assert_eq!(roll.mean_abs_error, 0.25);
        assert_eq!(roll.samples, 4);

        // Pitch and yaw channels absent: omitted, never zero
        assert!(report.tracking.iter().all(|m| m.axis == RateAxis::Roll));
        assert!(report
            .omissions
            .iter()
            .any(|o| o.contains("rate tracking (pitch)")));
    }

    #[test]
    fn test_flow_degraded_fraction_and_runs() {
        let mut config = AnalysisConfig::default();
        config.flow_degraded_min_duration_us = 150;

        let quality = channel_of(
            channel::FLOW_QUALITY,
            &[(0, 80.0), (100, 20.0), (200, 10.0), (300, 30.0), (400, 90.0)],
        );
        let dataset = align_channels(&[quality], &config);
        let flow = run_diagnostics(&dataset, &[], &config)
            .optical_flow
            .expect("flow report");

        assert_eq!(flow.samples, 5);
        assert_eq!(flow.degraded_fraction, 0.6);
        assert_eq!(flow.degraded_runs.len(), 1);
        assert_eq!(flow.degraded_runs[0].start_us, 100);
        assert_eq!(flow.degraded_runs[0].end_us, 300);
    }

    #[test]
    fn test_missing_flow_is_an_omission() {
        let vibe = channel_of(channel::VIBRATION_X, &[(0, 1.0)]);
        let dataset = dataset_of(&[vibe]);
        let report = run_diagnostics(&dataset, &[], &AnalysisConfig::default());

        assert!(report.optical_flow.is_none());
        assert!(report
            .omissions
            .iter()
            .any(|o| o.contains("optical-flow diagnostics skipped")));
    }

    #[test]
    fn test_local_path_used_when_gps_absent() {
        let x = channel_of(channel::LOCAL_X, &[(0, -2.0), (100, 3.0)]);
        let y = channel_of(channel::LOCAL_Y, &[(0, 0.0), (100, 4.0)]);
        let z = channel_of(channel::LOCAL_Z, &[(0, 0.0), (100, -12.0)]);
        let dataset = dataset_of(&[x, y, z]);
        let report = run_diagnostics(&dataset, &[], &AnalysisConfig::default());

        match report.trajectory.expect("trajectory") {
            TrajectorySummary::LocalPath {
                x_min_m, z_min_m, ..
            } => {
                assert_eq!(x_min_m, -2.0);
                assert_eq!(z_min_m, -12.0);
            }
            other => panic!("expected local path, got {:?}", other),
        }
    }

    #[test]
    fn test_gps_trajectory_with_relative_altitude() {
        let lat = channel_of(channel::GPS_LAT, &[(0, 47.0), (100, 47.001)]);
        let lon = channel_of(channel::GPS_LON, &[(0, 8.0), (100, 8.002)]);
        let alt = channel_of(channel::GPS_ALT, &[(0, 100.0), (100, 150.0)]);
        let dataset = dataset_of(&[lat, lon, alt]);
        let report = run_diagnostics(&dataset, &[], &AnalysisConfig::default());

        match report.trajectory.expect("trajectory") {
            TrajectorySummary::Gps {
                alt_range_m,
                relative_alt_max_m,
                ..
            } => {
                assert_eq!(alt_range_m, 50.0);
                // Home baseline is the mean of the first fixes (125 here)
                assert_eq!(relative_alt_max_m, 25.0);
            }
            other => panic!("expected GPS trajectory, got {:?}", other),
        }
    }

    #[test]
    fn test_clipping_events_pass_through() {
        let dataset = dataset_of(&[channel_of(channel::ROLL, &[(0, 0.0)])]);
        let clipping = vec![ClippingEvent {
            time_us: 5,
            axis: BodyAxis::Z,
        }];
        let report = run_diagnostics(&dataset, &clipping, &AnalysisConfig::default());
        assert_eq!(report.clipping_events, clipping);
    }
}
