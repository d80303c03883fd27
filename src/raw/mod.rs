//! Low-level extraction of named message groups from binary logs.
//!
//! This is the decoding capability boundary: each reader turns a complete
//! binary blob into named groups of records, where a record is a per-message
//! timestamp plus named numeric field values. Everything above this module
//! works with groups and fields only and never touches wire bytes.
//!
//! Readers never fail on corrupt input; they extract what they can and
//! describe the rest as warnings.

pub mod dataflash;
pub mod ulog;

use std::collections::HashMap;

/// One decoded record: timestamp plus named numeric fields.
///
/// String-typed wire fields are dropped here; only numeric values are kept.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub time_us: u64,
    pub values: HashMap<String, f64>,
}

impl RawRecord {
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }
}

/// Everything extracted from one log, grouped by message/topic name.
#[derive(Debug, Default)]
pub struct RawLog {
    pub groups: HashMap<String, Vec<RawRecord>>,
    pub warnings: Vec<String>,
}

impl RawLog {
    pub fn group(&self, name: &str) -> Option<&[RawRecord]> {
        self.groups.get(name).map(|v| v.as_slice())
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
