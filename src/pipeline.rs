//! One-pass analysis pipeline: decode, align, diagnose.
//!
//! Each run owns its channels and dataset exclusively; nothing is retained
//! between runs, so concurrent runs over different files need no
//! coordination and results are bit-identical across repeat runs.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::align::align_channels;
use crate::config::AnalysisConfig;
use crate::decode::{decoder_for, detect_format};
use crate::diagnostics::run_diagnostics;
use crate::error::{AnalysisError, Result};
use crate::types::{DecodeStatus, DiagnosticReport, LogSource, UnifiedLogDataset};

/// The immutable result of one analysis run.
#[derive(Debug)]
pub struct AnalysisRun {
    pub source: LogSource,
    pub dataset: UnifiedLogDataset,
    pub report: DiagnosticReport,
    /// Decode-level warnings, also reflected in the report's omissions
    /// where they removed a diagnostics section.
    pub warnings: Vec<String>,
}

/// Analyze a log file on disk.
pub fn analyze_log_file(path: &Path, config: &AnalysisConfig) -> Result<AnalysisRun> {
    let data = fs::read(path)?;
    analyze_log_bytes(&path.to_string_lossy(), &data, config)
}

/// Analyze a complete log already in memory.
///
/// `name` carries the extension the format selector dispatches on and is
/// used in error messages.
pub fn analyze_log_bytes(name: &str, data: &[u8], config: &AnalysisConfig) -> Result<AnalysisRun> {
    config.validate()?;

    let format = detect_format(name, data)?;
    info!(file = name, %format, bytes = data.len(), "starting analysis run");

    let decoded = decoder_for(format).decode(data, config)?;
    if decoded.channels.is_empty() && decoded.clipping_events.is_empty() {
        return Err(AnalysisError::EmptyLog {
            path: name.to_string(),
        });
    }

    let dataset = align_channels(&decoded.channels, config);
    let report = run_diagnostics(&dataset, &decoded.clipping_events, config);

    let status = if decoded.warnings.is_empty() {
        DecodeStatus::Complete
    } else {
        DecodeStatus::Partial
    };

    Ok(AnalysisRun {
        source: LogSource {
            name: name.to_string(),
            format,
            status,
        },
        dataset,
        report,
        warnings: decoded.warnings,
    })
}
