//! Analysis configuration.
//!
//! Every tuning constant of the pipeline lives here and is passed into each
//! run explicitly; there is no ambient state shared between runs. Values can
//! be loaded from a TOML file or used as compiled-in defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Tuning constants for one analysis run.
///
/// All thresholds are fixed per run, never derived per file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Vibration magnitude above which a sample is flagged, m/s^2.
    /// 30 m/s^2 is the ArduPilot wiki danger level.
    #[serde(default = "default_vibration_danger_threshold")]
    pub vibration_danger_threshold: f64,

    /// Flagged samples closer than this merge into one vibration event, us.
    #[serde(default = "default_vibration_merge_gap_us")]
    pub vibration_merge_gap_us: u64,

    /// Raw accelerometer magnitude treated as sensor saturation, m/s^2 (~16 g).
    #[serde(default = "default_accel_clip_threshold_ms2")]
    pub accel_clip_threshold_ms2: f64,

    /// Per-axis dead time after a clipping event, us. Saturation bursts
    /// inside this interval collapse into a single event.
    #[serde(default = "default_clip_refractory_us")]
    pub clip_refractory_us: u64,

    /// Trailing window for the PX4 rolling-deviation vibration channel,
    /// in raw accelerometer samples.
    #[serde(default = "default_vibration_window_samples")]
    pub vibration_window_samples: usize,

    /// Maximum time a stale value may be held during alignment, us.
    /// Beyond this gap the aligned cell reads "no data".
    #[serde(default = "default_forward_fill_gap_us")]
    pub forward_fill_gap_us: u64,

    /// Optical-flow quality below this floor counts as degraded.
    #[serde(default = "default_flow_quality_floor")]
    pub flow_quality_floor: f64,

    /// Minimum duration of a degraded stretch worth reporting, us.
    #[serde(default = "default_flow_degraded_min_duration_us")]
    pub flow_degraded_min_duration_us: u64,

    /// Maximum samples kept per channel in the summary digest.
    #[serde(default = "default_digest_max_points")]
    pub digest_max_points: usize,
}

fn default_vibration_danger_threshold() -> f64 { 30.0 }
fn default_vibration_merge_gap_us() -> u64 { 500_000 }
fn default_accel_clip_threshold_ms2() -> f64 { 156.9 }
fn default_clip_refractory_us() -> u64 { 200_000 }
fn default_vibration_window_samples() -> usize { 25 }
fn default_forward_fill_gap_us() -> u64 { 1_000_000 }
fn default_flow_quality_floor() -> f64 { 50.0 }
fn default_flow_degraded_min_duration_us() -> u64 { 2_000_000 }
fn default_digest_max_points() -> usize { 200 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            vibration_danger_threshold: default_vibration_danger_threshold(),
            vibration_merge_gap_us: default_vibration_merge_gap_us(),
            accel_clip_threshold_ms2: default_accel_clip_threshold_ms2(),
            clip_refractory_us: default_clip_refractory_us(),
            vibration_window_samples: default_vibration_window_samples(),
            forward_fill_gap_us: default_forward_fill_gap_us(),
            flow_quality_floor: default_flow_quality_floor(),
            flow_degraded_min_duration_us: default_flow_degraded_min_duration_us(),
            digest_max_points: default_digest_max_points(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file. Missing keys fall back to the
    /// compiled-in defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig =
            toml::from_str(&contents).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.vibration_danger_threshold <= 0.0 {
            return Err(AnalysisError::Config(
                "vibration_danger_threshold must be positive".to_string(),
            ));
        }

        if self.accel_clip_threshold_ms2 <= 0.0 {
            return Err(AnalysisError::Config(
                "accel_clip_threshold_ms2 must be positive".to_string(),
            ));
        }

        if self.vibration_window_samples < 2 {
            return Err(AnalysisError::Config(
                "vibration_window_samples must be at least 2".to_string(),
            ));
        }

        if self.forward_fill_gap_us == 0 {
            return Err(AnalysisError::Config(
                "forward_fill_gap_us must be greater than 0".to_string(),
            ));
        }

        if self.flow_quality_floor < 0.0 {
            return Err(AnalysisError::Config(
                "flow_quality_floor must not be negative".to_string(),
            ));
        }

        if self.digest_max_points < 2 {
            return Err(AnalysisError::Config(
                "digest_max_points must be at least 2".to_string(),
            ));
        }

        Ok(())
    }
}
