//! Error types for the analysis pipeline.
//!
//! Only run-fatal conditions live here. Partial-decode problems are carried
//! as warning strings in [`crate::decode::DecodedLog`] and surface as
//! omission notes in the diagnostic report instead of aborting the run.

use thiserror::Error;

/// Fatal errors for a single analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File extension/signature matched neither supported decoder
    #[error("unsupported log format {extension:?}: expected .bin (ArduPilot) or .ulg (PX4)")]
    UnsupportedFormat { extension: String },

    /// Decoder found zero usable message/record groups
    #[error("no decodable message groups in {path}")]
    EmptyLog { path: String },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export/serialization errors
    #[error("export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
