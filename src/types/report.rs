//! Derived diagnostic facts and the per-run report.

use serde::Serialize;
use std::fmt;

/// Accelerometer body axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyAxis {
    X,
    Y,
    Z,
}

impl fmt::Display for BodyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyAxis::X => write!(f, "x"),
            BodyAxis::Y => write!(f, "y"),
            BodyAxis::Z => write!(f, "z"),
        }
    }
}

/// Rate-controller axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateAxis {
    Roll,
    Pitch,
    Yaw,
}

impl fmt::Display for RateAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateAxis::Roll => write!(f, "roll"),
            RateAxis::Pitch => write!(f, "pitch"),
            RateAxis::Yaw => write!(f, "yaw"),
        }
    }
}

/// A sustained vibration excursion above the danger threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VibrationEvent {
    pub axis: BodyAxis,
    pub start_us: u64,
    pub end_us: u64,
    /// Largest magnitude observed inside the event, m/s^2.
    pub peak: f64,
}

/// One sensor-saturation occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClippingEvent {
    pub time_us: u64,
    pub axis: BodyAxis,
}

/// Mean absolute tracking error between desired and actual rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingMetric {
    pub axis: RateAxis,
    pub mean_abs_error: f64,
    /// Rows where both desired and actual had data.
    pub samples: usize,
}

/// A stretch of degraded optical-flow quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DegradedRun {
    pub start_us: u64,
    pub end_us: u64,
}

/// Optical-flow quality indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpticalFlowQuality {
    /// Fraction of flow-quality samples below the quality floor.
    pub degraded_fraction: f64,
    /// Sustained degraded stretches, a possible drift indicator.
    pub degraded_runs: Vec<DegradedRun>,
    pub samples: usize,
}

/// Spatial extent of the flight, from whichever position source the log had.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrajectorySummary {
    Gps {
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        alt_min_m: f64,
        alt_max_m: f64,
        alt_range_m: f64,
        /// Peak altitude above the home baseline (mean of the first fixes).
        relative_alt_max_m: f64,
    },
    LocalPath {
        x_min_m: f64,
        x_max_m: f64,
        y_min_m: f64,
        y_max_m: f64,
        z_min_m: f64,
        z_max_m: f64,
    },
}

/// Aggregate diagnostics for one analysis run. Computed once, immutable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub duration_s: f64,
    pub vibration_events: Vec<VibrationEvent>,
    pub clipping_events: Vec<ClippingEvent>,
    pub tracking: Vec<TrackingMetric>,
    pub optical_flow: Option<OpticalFlowQuality>,
    pub trajectory: Option<TrajectorySummary>,
    /// Human-readable notes for every section that was skipped and why.
    pub omissions: Vec<String>,
}
