//! CSV export of the unified dataset.
//!
//! Writes the channel-by-timeline table for external plotting: one
//! `time_us` column plus one column per channel. "No data" cells are left
//! empty, keeping them distinct from zero.

use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::types::UnifiedLogDataset;

/// Write the aligned dataset to a CSV file at `path`.
pub fn export_to_csv(dataset: &UnifiedLogDataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| AnalysisError::Export(e.to_string()))?;

    let mut header = vec!["time_us".to_string()];
    header.extend(dataset.columns.iter().map(|c| c.name.clone()));
    writer
        .write_record(&header)
        .map_err(|e| AnalysisError::Export(e.to_string()))?;

    for (row, time_us) in dataset.timeline_us.iter().enumerate() {
        let mut record = vec![time_us.to_string()];
        for column in &dataset.columns {
            record.push(match column.values[row] {
                Some(value) => value.to_string(),
                None => String::new(),
            });
        }
        writer
            .write_record(&record)
            .map_err(|e| AnalysisError::Export(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| AnalysisError::Export(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_channels;
    use crate::config::AnalysisConfig;
    use crate::types::channel::Channel;
    use tempfile::TempDir;

    #[test]
    fn test_csv_rows_and_empty_cells() {
        let mut a = Channel::new("a", "");
        a.push(0, 1.0);
        a.push(10, 2.0);
        let mut b = Channel::new("b", "");
        b.push(10, 3.5);
        let dataset = align_channels(&[a, b], &AnalysisConfig::default());

        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("out").join("aligned.csv");
        export_to_csv(&dataset, &path).expect("export");

        let content = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "time_us,a,b");
        assert_eq!(lines[1], "0,1,");
        assert_eq!(lines[2], "10,2,3.5");

        // Every row has the same field count as the header
        let header_fields = lines[0].split(',').count();
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), header_fields);
        }
    }
}
