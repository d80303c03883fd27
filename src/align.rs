//! Multi-rate time-series alignment.
//!
//! The reference timeline is the sorted union of every channel's
//! timestamps. Each channel is joined onto it with a nearest-prior match:
//! a cell takes the most recent sample at or before the reference instant,
//! held for at most the configured gap, and reads "no data" otherwise.
//! There is no interpolation between samples; only prior-value hold.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::types::{AlignedColumn, Channel, UnifiedLogDataset};

/// Align all channels onto one shared timeline.
///
/// The returned dataset has exactly one row per reference timestamp, for
/// every column.
pub fn align_channels(channels: &[Channel], config: &AnalysisConfig) -> UnifiedLogDataset {
    let mut timeline_us: Vec<u64> = channels
        .iter()
        .flat_map(|ch| ch.samples().iter().map(|s| s.time_us))
        .collect();
    timeline_us.sort_unstable();
    timeline_us.dedup();

    let columns = channels
        .iter()
        .map(|ch| AlignedColumn {
            name: ch.name.clone(),
            unit: ch.unit,
            values: join_nearest_prior(ch, &timeline_us, config.forward_fill_gap_us),
        })
        .collect();

    debug!(
        rows = timeline_us.len(),
        channels = channels.len(),
        "aligned channels onto union timeline"
    );

    UnifiedLogDataset {
        timeline_us,
        columns,
    }
}

fn join_nearest_prior(channel: &Channel, timeline_us: &[u64], gap_us: u64) -> Vec<Option<f64>> {
    let samples = channel.samples();
    let mut values = Vec::with_capacity(timeline_us.len());
    let mut next = 0usize;
    let mut held: Option<(u64, f64)> = None;

    for &ref_us in timeline_us {
        while next < samples.len() && samples[next].time_us <= ref_us {
            held = Some((samples[next].time_us, samples[next].value));
            next += 1;
        }
        values.push(match held {
            Some((sample_us, value)) if ref_us - sample_us <= gap_us => Some(value),
            _ => None,
        });
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::channel::Channel;

    fn channel(name: &str, samples: &[(u64, f64)]) -> Channel {
        let mut ch = Channel::new(name, "");
        for &(t, v) in samples {
            ch.push(t, v);
        }
        ch
    }

    fn config_with_gap(gap_us: u64) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.forward_fill_gap_us = gap_us;
        config
    }

    #[test]
    fn test_row_count_equals_timeline_length() {
        let a = channel("a", &[(0, 1.0), (10, 2.0), (20, 3.0)]);
        let b = channel("b", &[(5, 4.0), (15, 5.0)]);
        let dataset = align_channels(&[a, b], &AnalysisConfig::default());

        assert_eq!(dataset.timeline_us, vec![0, 5, 10, 15, 20]);
        assert_eq!(dataset.len(), 5);
        for column in &dataset.columns {
            assert_eq!(column.values.len(), dataset.len());
        }
    }

    #[test]
    fn test_nearest_prior_hold() {
        let a = channel("a", &[(0, 1.0), (20, 2.0)]);
        let b = channel("b", &[(10, 7.0)]);
        let dataset = align_channels(&[a, b], &config_with_gap(100));

        let a_col = dataset.column("a").unwrap();
        // At t=10 channel a holds its t=0 value
        assert_eq!(a_col.values, vec![Some(1.0), Some(1.0), Some(2.0)]);

        let b_col = dataset.column("b").unwrap();
        // Before its first sample, b has no data (not zero)
        assert_eq!(b_col.values, vec![None, Some(7.0), Some(7.0)]);
    }

    #[test]
    fn test_gap_bound_expires_held_value() {
        // b's sample grid forces reference timestamps past a's gap bound
        let a = channel("a", &[(0, 1.0)]);
        let b = channel("b", &[(50, 0.0), (100, 0.0), (101, 0.0)]);
        let dataset = align_channels(&[a, b], &config_with_gap(100));

        let a_col = dataset.column("a").unwrap();
        assert_eq!(a_col.values[0], Some(1.0)); // t=0
        assert_eq!(a_col.values[1], Some(1.0)); // t=50, inside gap
        assert_eq!(a_col.values[2], Some(1.0)); // t=100, exactly at bound
        assert_eq!(a_col.values[3], None); // t=101, one past the bound
    }

    #[test]
    fn test_no_interpolation_between_samples() {
        let a = channel("a", &[(0, 0.0), (100, 10.0)]);
        let b = channel("b", &[(50, 0.0)]);
        let dataset = align_channels(&[a, b], &AnalysisConfig::default());

        // t=50 holds the prior value 0.0 rather than interpolating to 5.0
        assert_eq!(dataset.column("a").unwrap().values[1], Some(0.0));
    }

    #[test]
    fn test_empty_input() {
        let dataset = align_channels(&[], &AnalysisConfig::default());
        assert!(dataset.is_empty());
        assert!(dataset.columns.is_empty());
    }
}
