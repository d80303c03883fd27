//! Identity of one input log file.

use serde::Serialize;
use std::fmt;

/// Supported log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    ArduPilot,
    Px4,
}

impl LogFormat {
    /// The file extension this format is dispatched on.
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::ArduPilot => "bin",
            LogFormat::Px4 => "ulg",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::ArduPilot => write!(f, "ArduPilot"),
            LogFormat::Px4 => write!(f, "PX4"),
        }
    }
}

/// How completely the source decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStatus {
    /// Every expected group decoded without warnings.
    Complete,
    /// Some groups were missing or corrupt; coverage is reduced.
    Partial,
}

/// One input file, immutable once decoding completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSource {
    pub name: String,
    pub format: LogFormat,
    pub status: DecodeStatus,
}
