//! Named, timestamped channels produced by the decoders.
//!
//! Channel names are fixed constants so the aligner and diagnostics layers
//! can address columns without knowing which decoder produced them.

/// Attitude, degrees
pub const ROLL: &str = "roll";
pub const PITCH: &str = "pitch";
pub const YAW: &str = "yaw";

/// Body rates, degrees/second
pub const RATE_ROLL: &str = "rate_roll";
pub const RATE_PITCH: &str = "rate_pitch";
pub const RATE_YAW: &str = "rate_yaw";
pub const RATE_ROLL_DESIRED: &str = "rate_roll_desired";
pub const RATE_PITCH_DESIRED: &str = "rate_pitch_desired";
pub const RATE_YAW_DESIRED: &str = "rate_yaw_desired";

/// Vibration magnitude per body axis, m/s^2
pub const VIBRATION_X: &str = "vibration_x";
pub const VIBRATION_Y: &str = "vibration_y";
pub const VIBRATION_Z: &str = "vibration_z";

/// Global position
pub const GPS_LAT: &str = "gps_lat";
pub const GPS_LON: &str = "gps_lon";
pub const GPS_ALT: &str = "gps_alt";

/// Local position (NED), meters
pub const LOCAL_X: &str = "local_x";
pub const LOCAL_Y: &str = "local_y";
pub const LOCAL_Z: &str = "local_z";

/// Optical flow
pub const FLOW_X: &str = "flow_x";
pub const FLOW_Y: &str = "flow_y";
pub const FLOW_QUALITY: &str = "optical_flow_quality";

/// A single timestamped value.
///
/// Timestamps are microseconds on the log's own monotonic clock, never
/// wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_us: u64,
    pub value: f64,
}

/// A named physical quantity with a non-decreasing sample sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub unit: &'static str,
    samples: Vec<Sample>,
}

impl Channel {
    pub fn new(name: impl Into<String>, unit: &'static str) -> Self {
        Self {
            name: name.into(),
            unit,
            samples: Vec::new(),
        }
    }

    /// Append a sample, keeping timestamps non-decreasing.
    ///
    /// A sample at the same timestamp as the last one replaces it
    /// (latest-arriving wins); a sample earlier than the last is dropped.
    pub fn push(&mut self, time_us: u64, value: f64) {
        match self.samples.last() {
            Some(last) if time_us < last.time_us => {}
            Some(last) if time_us == last.time_us => {
                let idx = self.samples.len() - 1;
                self.samples[idx] = Sample { time_us, value };
            }
            _ => self.samples.push(Sample { time_us, value }),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_time_us(&self) -> Option<u64> {
        self.samples.first().map(|s| s.time_us)
    }

    pub fn last_time_us(&self) -> Option<u64> {
        self.samples.last().map(|s| s.time_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut ch = Channel::new(ROLL, "deg");
        ch.push(100, 1.0);
        ch.push(200, 2.0);
        ch.push(150, 9.0); // out of order, dropped
        assert_eq!(ch.len(), 2);
        assert_eq!(ch.last_time_us(), Some(200));
    }

    #[test]
    fn test_duplicate_timestamp_keeps_latest() {
        let mut ch = Channel::new(ROLL, "deg");
        ch.push(100, 1.0);
        ch.push(100, 5.0);
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.samples()[0].value, 5.0);
    }
}
