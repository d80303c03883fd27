//! ArduPilot decoder: dataflash message groups onto unified channels.
//!
//! Everything this decoder reports is read directly from the log: attitude
//! from ATT, body rates from RATE, position from GPS, and vibration plus
//! clipping counters from VIBE. Nothing is recomputed; channels whose
//! messages are absent are simply omitted.

use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::raw::{dataflash, RawRecord};
use crate::types::channel::{self, Channel};
use crate::types::{BodyAxis, ClippingEvent, LogFormat};

use super::{DecodedLog, LogDecoder};

/// Per-group field mapping: candidate field names in schema-variant order,
/// unified channel name, unit.
type FieldMapping = (&'static [&'static str], &'static str, &'static str);

const ATT_FIELDS: &[FieldMapping] = &[
    (&["Roll"], channel::ROLL, "deg"),
    (&["Pitch"], channel::PITCH, "deg"),
    (&["Yaw"], channel::YAW, "deg"),
];

const RATE_FIELDS: &[FieldMapping] = &[
    (&["R", "Roll"], channel::RATE_ROLL, "deg/s"),
    (&["RDes", "DesRoll"], channel::RATE_ROLL_DESIRED, "deg/s"),
    (&["P", "Pitch"], channel::RATE_PITCH, "deg/s"),
    (&["PDes", "DesPitch"], channel::RATE_PITCH_DESIRED, "deg/s"),
    (&["Y", "Yaw"], channel::RATE_YAW, "deg/s"),
    (&["YDes", "DesYaw"], channel::RATE_YAW_DESIRED, "deg/s"),
];

const GPS_FIELDS: &[FieldMapping] = &[
    (&["Lat"], channel::GPS_LAT, "deg"),
    (&["Lng", "Lon"], channel::GPS_LON, "deg"),
    (&["Alt"], channel::GPS_ALT, "m"),
];

const VIBE_FIELDS: &[FieldMapping] = &[
    (&["VibeX"], channel::VIBRATION_X, "m/s^2"),
    (&["VibeY"], channel::VIBRATION_Y, "m/s^2"),
    (&["VibeZ"], channel::VIBRATION_Z, "m/s^2"),
];

pub struct ArduPilotDecoder;

impl LogDecoder for ArduPilotDecoder {
    fn format(&self) -> LogFormat {
        LogFormat::ArduPilot
    }

    fn decode(&self, data: &[u8], _config: &AnalysisConfig) -> Result<DecodedLog> {
        let raw = dataflash::read_log(data);

        let mut out = DecodedLog {
            warnings: raw.warnings.clone(),
            ..Default::default()
        };

        if let Some(records) = raw.group("ATT") {
            map_group(records, ATT_FIELDS, "ATT", &mut out);
        }

        if let Some(records) = raw.group("RATE") {
            map_group(records, RATE_FIELDS, "RATE", &mut out);
        }

        if let Some(records) = raw.group("GPS") {
            map_group(records, GPS_FIELDS, "GPS", &mut out);
        }

        if let Some(records) = raw.group("VIBE") {
            map_group(records, VIBE_FIELDS, "VIBE", &mut out);
            read_clipping_counters(records, &mut out.clipping_events);
        }

        info!(
            channels = out.channels.len(),
            clipping_events = out.clipping_events.len(),
            "ArduPilot decode finished"
        );

        Ok(out)
    }
}

/// Build one channel per mapping entry, trying field names in order
/// (message schemas renamed fields across firmware generations). A group
/// that is present but matches none of a mapping's names gets a warning and
/// decoding continues best-effort.
fn map_group(
    records: &[RawRecord],
    mappings: &[FieldMapping],
    group_name: &str,
    out: &mut DecodedLog,
) {
    for (field_names, channel_name, unit) in mappings {
        let mut ch = Channel::new(*channel_name, *unit);
        for record in records {
            if let Some(value) = field_names.iter().find_map(|f| record.value(f)) {
                ch.push(record.time_us, value);
            }
        }
        if ch.is_empty() {
            out.warnings.push(format!(
                "{} messages present but field {:?} not found, schema variant not recognized",
                group_name, field_names[0]
            ));
        } else {
            out.channels.push(ch);
        }
    }
}

/// VIBE carries cumulative per-axis clip counters. Each counter increment
/// becomes one clipping event at that record's timestamp.
fn read_clipping_counters(records: &[RawRecord], events: &mut Vec<ClippingEvent>) {
    let counters: [(&[&str], BodyAxis); 3] = [
        (&["Clip0", "Clipping0"], BodyAxis::X),
        (&["Clip1", "Clipping1"], BodyAxis::Y),
        (&["Clip2", "Clipping2"], BodyAxis::Z),
    ];

    for (field_names, axis) in counters {
        let mut previous: Option<f64> = None;
        for record in records {
            let Some(count) = field_names.iter().find_map(|f| record.value(f)) else {
                continue;
            };
            if let Some(prev) = previous {
                if count > prev {
                    events.push(ClippingEvent {
                        time_us: record.time_us,
                        axis,
                    });
                }
            }
            previous = Some(count);
        }
    }

    events.sort_by_key(|e| e.time_us);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(time_us: u64, fields: &[(&str, f64)]) -> RawRecord {
        let values: HashMap<String, f64> =
            fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        RawRecord { time_us, values }
    }

    #[test]
    fn test_clip_counter_increments_become_events() {
        let records = vec![
            record(1_000, &[("Clip0", 0.0)]),
            record(2_000, &[("Clip0", 0.0)]),
            record(3_000, &[("Clip0", 2.0)]),
            record(4_000, &[("Clip0", 2.0)]),
            record(5_000, &[("Clip0", 3.0)]),
        ];
        let mut events = Vec::new();
        read_clipping_counters(&records, &mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time_us, 3_000);
        assert_eq!(events[1].time_us, 5_000);
        assert!(events.iter().all(|e| e.axis == BodyAxis::X));
    }

    #[test]
    fn test_field_fallback_names() {
        let records = vec![record(1_000, &[("DesRoll", 5.0), ("Roll", 4.5)])];
        let mut out = DecodedLog::default();
        map_group(
            &records,
            &[
                (&["R", "Roll"], channel::RATE_ROLL, "deg/s"),
                (&["RDes", "DesRoll"], channel::RATE_ROLL_DESIRED, "deg/s"),
            ],
            "RATE",
            &mut out,
        );
        assert_eq!(out.channels.len(), 2);
        assert_eq!(out.channels[0].samples()[0].value, 4.5);
        assert_eq!(out.channels[1].samples()[0].value, 5.0);
    }

    #[test]
    fn test_unrecognized_schema_warns_but_continues() {
        let records = vec![record(1_000, &[("Roll", 1.0)])];
        let mut out = DecodedLog::default();
        map_group(
            &records,
            &[
                (&["Roll"], channel::ROLL, "deg"),
                (&["Pitch"], channel::PITCH, "deg"),
            ],
            "ATT",
            &mut out,
        );
        assert_eq!(out.channels.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("Pitch"));
    }
}
