//! The aligned, tabular result of one analysis run.

/// One channel resampled onto the shared reference timeline.
///
/// `None` cells mean "no data at this instant", which is distinct from a
/// value of zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    pub name: String,
    pub unit: &'static str,
    pub values: Vec<Option<f64>>,
}

/// All channels on one shared timeline. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedLogDataset {
    /// Reference timeline, microseconds, strictly increasing.
    pub timeline_us: Vec<u64>,
    /// One column per channel; every column has `timeline_us.len()` cells.
    pub columns: Vec<AlignedColumn>,
}

impl UnifiedLogDataset {
    /// Number of rows (== reference timeline length).
    pub fn len(&self) -> usize {
        self.timeline_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline_us.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&AlignedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn duration_us(&self) -> u64 {
        match (self.timeline_us.first(), self.timeline_us.last()) {
            (Some(first), Some(last)) => last.saturating_sub(*first),
            _ => 0,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }
}
