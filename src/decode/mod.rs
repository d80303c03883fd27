//! Decoder contract and format selection.
//!
//! Each supported format implements [`LogDecoder`]; everything downstream of
//! this module sees only the unified channel set, never the format. Adding a
//! format means adding a decoder here, not touching the aligner or the
//! diagnostics layer.

pub mod ardupilot;
pub mod px4;

pub use ardupilot::ArduPilotDecoder;
pub use px4::Px4Decoder;

use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{Channel, ClippingEvent, LogFormat};

/// Result of decoding one log: unified channels plus decode-time facts.
#[derive(Debug, Default)]
pub struct DecodedLog {
    pub channels: Vec<Channel>,
    /// Sensor-saturation events established at decode time: read from
    /// counters (ArduPilot) or threshold-derived (PX4).
    pub clipping_events: Vec<ClippingEvent>,
    /// Non-fatal problems: missing groups, unrecognized schema variants,
    /// truncation. Surface as omission notes, never as errors.
    pub warnings: Vec<String>,
}

/// Capability contract every format decoder implements.
pub trait LogDecoder {
    fn format(&self) -> LogFormat;

    /// Decode a complete binary log into the unified channel set.
    ///
    /// Truncated or corrupt input yields partial channels with warnings;
    /// only a completely undecodable log is an error, raised by the caller
    /// once it sees zero channels.
    fn decode(&self, data: &[u8], config: &AnalysisConfig) -> Result<DecodedLog>;
}

pub fn decoder_for(format: LogFormat) -> Box<dyn LogDecoder> {
    match format {
        LogFormat::ArduPilot => Box::new(ArduPilotDecoder),
        LogFormat::Px4 => Box::new(Px4Decoder),
    }
}

/// Pick the decoder for a file.
///
/// Extension dispatch comes first. A file with no extension falls back to a
/// signature probe; a file whose extension names neither format is rejected
/// outright (its content is never inspected, so a `.txt` full of ULog bytes
/// still fails closed).
pub fn detect_format(name: &str, data: &[u8]) -> Result<LogFormat> {
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("bin") => Ok(LogFormat::ArduPilot),
        Some("ulg") => Ok(LogFormat::Px4),
        Some(other) => Err(AnalysisError::UnsupportedFormat {
            extension: format!(".{}", other),
        }),
        None => probe_signature(data).ok_or_else(|| AnalysisError::UnsupportedFormat {
            extension: "<none>".to_string(),
        }),
    }
}

fn probe_signature(data: &[u8]) -> Option<LogFormat> {
    if data.len() >= crate::raw::ulog::ULOG_MAGIC.len()
        && data[..crate::raw::ulog::ULOG_MAGIC.len()] == crate::raw::ulog::ULOG_MAGIC
    {
        return Some(LogFormat::Px4);
    }
    if data.len() >= 2
        && data[0] == crate::raw::dataflash::SYNC1
        && data[1] == crate::raw::dataflash::SYNC2
    {
        return Some(LogFormat::ArduPilot);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(
            detect_format("flight.bin", &[]).unwrap(),
            LogFormat::ArduPilot
        );
        assert_eq!(detect_format("flight.ULG", &[]).unwrap(), LogFormat::Px4);
    }

    #[test]
    fn test_unknown_extension_rejected_by_name() {
        let err = detect_format("notes.txt", &crate::raw::ulog::ULOG_MAGIC).unwrap_err();
        match err {
            AnalysisError::UnsupportedFormat { extension } => assert_eq!(extension, ".txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_signature_probe_without_extension() {
        let mut ulog = crate::raw::ulog::ULOG_MAGIC.to_vec();
        ulog.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(detect_format("flightlog", &ulog).unwrap(), LogFormat::Px4);

        let dataflash = [
            crate::raw::dataflash::SYNC1,
            crate::raw::dataflash::SYNC2,
            0x80,
        ];
        assert_eq!(
            detect_format("flightlog", &dataflash).unwrap(),
            LogFormat::ArduPilot
        );

        assert!(detect_format("flightlog", b"plain text").is_err());
    }
}
