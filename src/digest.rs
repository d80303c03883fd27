//! Bounded-size summary digest for external report generation.
//!
//! Events are rare and high-value, so every vibration and clipping event is
//! kept verbatim; time-series channels are decimated to a fixed maximum
//! point count by uniform stride. The digest is a pure transformation of a
//! finished run and serializes to JSON.

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{
    ClippingEvent, DiagnosticReport, LogSource, OpticalFlowQuality, TrackingMetric,
    TrajectorySummary, UnifiedLogDataset, VibrationEvent,
};

/// One decimated channel: (seconds from log start, value) points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestChannel {
    pub name: String,
    pub unit: &'static str,
    /// Present cells only; "no data" stretches simply have no points.
    pub points: Vec<(f64, f64)>,
    /// Sample count before decimation.
    pub source_samples: usize,
}

/// The bounded digest handed to the external report generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryDigest {
    pub source: LogSource,
    pub duration_s: f64,
    pub channels: Vec<DigestChannel>,
    pub vibration_events: Vec<VibrationEvent>,
    pub clipping_events: Vec<ClippingEvent>,
    pub tracking: Vec<TrackingMetric>,
    pub optical_flow: Option<OpticalFlowQuality>,
    pub trajectory: Option<TrajectorySummary>,
    pub omissions: Vec<String>,
}

impl SummaryDigest {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalysisError::Export(e.to_string()))
    }
}

/// Reduce one run's dataset and report into a bounded digest.
pub fn build_digest(
    source: &LogSource,
    dataset: &UnifiedLogDataset,
    report: &DiagnosticReport,
    config: &AnalysisConfig,
) -> SummaryDigest {
    let start_us = dataset.timeline_us.first().copied().unwrap_or(0);

    let channels = dataset
        .columns
        .iter()
        .map(|column| {
            let cells: Vec<(f64, f64)> = column
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| {
                    cell.map(|value| {
                        let t = (dataset.timeline_us[i] - start_us) as f64 / 1_000_000.0;
                        (t, value)
                    })
                })
                .collect();

            DigestChannel {
                name: column.name.clone(),
                unit: column.unit,
                source_samples: cells.len(),
                points: decimate(cells, config.digest_max_points),
            }
        })
        .collect();

    SummaryDigest {
        source: source.clone(),
        duration_s: report.duration_s,
        channels,
        vibration_events: report.vibration_events.clone(),
        clipping_events: report.clipping_events.clone(),
        tracking: report.tracking.clone(),
        optical_flow: report.optical_flow.clone(),
        trajectory: report.trajectory.clone(),
        omissions: report.omissions.clone(),
    }
}

/// Uniform-stride selection down to at most `max_points` points.
fn decimate(points: Vec<(f64, f64)>, max_points: usize) -> Vec<(f64, f64)> {
    if points.len() <= max_points {
        return points;
    }
    let stride = (points.len() + max_points - 1) / max_points;
    points.into_iter().step_by(stride).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_channels;
    use crate::diagnostics::run_diagnostics;
    use crate::types::channel::{Channel, VIBRATION_X};
    use crate::types::{DecodeStatus, LogFormat};

    #[test]
    fn test_decimation_respects_cap() {
        let points: Vec<(f64, f64)> = (0..1000).map(|i| (i as f64, i as f64)).collect();
        let out = decimate(points, 200);
        assert!(out.len() <= 200);
        assert_eq!(out[0], (0.0, 0.0));
        // Uniform stride keeps even spacing
        assert_eq!(out[1], (5.0, 5.0));
    }

    #[test]
    fn test_short_series_untouched() {
        let points = vec![(0.0, 1.0), (1.0, 2.0)];
        assert_eq!(decimate(points.clone(), 200), points);
    }

    #[test]
    fn test_events_survive_digest_verbatim() {
        let config = AnalysisConfig {
            digest_max_points: 2,
            ..AnalysisConfig::default()
        };
        let mut vibe = Channel::new(VIBRATION_X, "m/s^2");
        for i in 0..100u64 {
            let value = if i == 50 { 45.0 } else { 5.0 };
            vibe.push(i * 1_000, value);
        }
        let dataset = align_channels(&[vibe], &config);
        let report = run_diagnostics(&dataset, &[], &config);
        assert_eq!(report.vibration_events.len(), 1);

        let source = LogSource {
            name: "test.bin".to_string(),
            format: LogFormat::ArduPilot,
            status: DecodeStatus::Complete,
        };
        let digest = build_digest(&source, &dataset, &report, &config);

        // Channels were decimated hard, events kept in full
        assert!(digest.channels[0].points.len() <= 2);
        assert_eq!(digest.vibration_events, report.vibration_events);
        let json = digest.to_json().unwrap();
        assert!(json.contains("vibration_events"));
    }
}
