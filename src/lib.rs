//! UAV Insight Library
//!
//! Telemetry normalization and diagnostics for flight-controller logs.
//! ArduPilot dataflash (`.bin`) and PX4 ULog (`.ulg`) files decode into one
//! unified channel set, align onto a shared timeline, and feed a fixed set
//! of numeric diagnostics: vibration excursions, sensor clipping, rate
//! tracking error, optical-flow quality and trajectory extent.
//!
//! # Features
//!
//! - **`csv`** (default): Export the aligned dataset as CSV
//! - **`cli`** (default): Build the command-line binary
//!
//! # Quick Start
//!
//! Run the full pipeline on a log file:
//! ```rust,no_run
//! use uav_insight::{analyze_log_file, AnalysisConfig};
//! use std::path::Path;
//!
//! let config = AnalysisConfig::default();
//! let run = analyze_log_file(Path::new("flight.ulg"), &config).unwrap();
//! println!("{} rows, {} channels", run.dataset.len(), run.dataset.columns.len());
//! for event in &run.report.vibration_events {
//!     println!("vibration {} peaked at {:.1} m/s^2", event.axis, event.peak);
//! }
//! ```
//!
//! Build the bounded digest for an external report generator:
//! ```rust,no_run
//! use uav_insight::{analyze_log_file, build_digest, AnalysisConfig};
//! use std::path::Path;
//!
//! let config = AnalysisConfig::default();
//! let run = analyze_log_file(Path::new("flight.bin"), &config).unwrap();
//! let digest = build_digest(&run.source, &run.dataset, &run.report, &config);
//! println!("{}", digest.to_json().unwrap());
//! ```
//!
//! # Pipeline
//!
//! Data flows strictly downward: raw file → decoder (picked by
//! [`decode::detect_format`]) → channels → [`align::align_channels`] →
//! [`diagnostics::run_diagnostics`] → [`digest::build_digest`]. Nothing
//! above the decoders knows which format produced the data, and no state
//! is shared between runs.

// Module declarations
pub mod align;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod digest;
pub mod error;
#[cfg(feature = "csv")]
pub mod export;
pub mod pipeline;
pub mod raw;
pub mod types;

// Re-export the pipeline surface for convenience
pub use align::align_channels;
pub use config::AnalysisConfig;
pub use decode::{decoder_for, detect_format, DecodedLog, LogDecoder};
pub use diagnostics::run_diagnostics;
pub use digest::{build_digest, DigestChannel, SummaryDigest};
pub use error::{AnalysisError, Result};
#[cfg(feature = "csv")]
pub use export::export_to_csv;
pub use pipeline::{analyze_log_bytes, analyze_log_file, AnalysisRun};
pub use types::*;
