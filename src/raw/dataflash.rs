//! ArduPilot dataflash (.bin) message extraction.
//!
//! Dataflash logs are self-describing: FMT messages (id 0x80) declare the
//! id, total length, name, field types and field labels of every other
//! message the log writes. Records are framed by two sync bytes and decoded
//! against the FMT schema seen earlier in the stream.
//!
//! Unknown ids and sync garbage are skipped byte-by-byte, so a truncated or
//! partially corrupt log still yields every record that survived.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{RawLog, RawRecord};

pub(crate) const SYNC1: u8 = 0xA3;
pub(crate) const SYNC2: u8 = 0x95;
const FMT_MESSAGE_ID: u8 = 0x80;
/// Header (2 sync + id) plus FMT payload: type, length, name[4],
/// format[16], labels[64].
const FMT_MESSAGE_LEN: usize = 89;
const HEADER_LEN: usize = 3;

#[derive(Debug, Clone)]
struct MessageSchema {
    name: String,
    /// Total record length including the 3-byte header, from the FMT entry.
    length: usize,
    fields: Vec<(String, char)>,
}

/// Size in bytes of one dataflash field type.
fn field_size(kind: char) -> Option<usize> {
    match kind {
        'b' | 'B' | 'M' => Some(1),
        'h' | 'H' | 'c' | 'C' => Some(2),
        'i' | 'I' | 'f' | 'e' | 'E' | 'L' => Some(4),
        'd' | 'q' | 'Q' => Some(8),
        'n' => Some(4),
        'N' => Some(16),
        'Z' => Some(64),
        'a' => Some(64),
        _ => None,
    }
}

/// Decode one field to a numeric value, applying the standard dataflash
/// scale factors (c/C/e/E are hundredths, L is degrees * 1e7).
/// String-typed fields ('n', 'N', 'Z') and int16 arrays ('a') yield None.
fn decode_numeric(kind: char, bytes: &[u8]) -> Option<f64> {
    let le2 = |b: &[u8]| [b[0], b[1]];
    let le4 = |b: &[u8]| [b[0], b[1], b[2], b[3]];
    let le8 = |b: &[u8]| [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
    match kind {
        'b' => Some(bytes[0] as i8 as f64),
        'B' | 'M' => Some(bytes[0] as f64),
        'h' => Some(i16::from_le_bytes(le2(bytes)) as f64),
        'H' => Some(u16::from_le_bytes(le2(bytes)) as f64),
        'i' => Some(i32::from_le_bytes(le4(bytes)) as f64),
        'I' => Some(u32::from_le_bytes(le4(bytes)) as f64),
        'f' => Some(f32::from_le_bytes(le4(bytes)) as f64),
        'd' => Some(f64::from_le_bytes(le8(bytes))),
        'c' => Some(i16::from_le_bytes(le2(bytes)) as f64 / 100.0),
        'C' => Some(u16::from_le_bytes(le2(bytes)) as f64 / 100.0),
        'e' => Some(i32::from_le_bytes(le4(bytes)) as f64 / 100.0),
        'E' => Some(u32::from_le_bytes(le4(bytes)) as f64 / 100.0),
        'L' => Some(i32::from_le_bytes(le4(bytes)) as f64 / 1e7),
        'q' => Some(i64::from_le_bytes(le8(bytes)) as f64),
        'Q' => Some(u64::from_le_bytes(le8(bytes)) as f64),
        _ => None,
    }
}

/// Extract a NUL-padded ASCII name.
fn cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

fn parse_fmt(payload: &[u8], warnings: &mut Vec<String>) -> Option<(u8, MessageSchema)> {
    let msg_id = payload[0];
    let length = payload[1] as usize;
    let name = cstr(&payload[2..6]);
    let format = cstr(&payload[6..22]);
    let labels = cstr(&payload[22..86]);

    if name.is_empty() || format.is_empty() || length < HEADER_LEN {
        warnings.push(format!("malformed FMT entry for message id {}", msg_id));
        return None;
    }

    let kinds: Vec<char> = format.chars().collect();
    let names: Vec<&str> = labels.split(',').collect();
    if kinds.len() != names.len() {
        warnings.push(format!(
            "FMT for {}: {} format chars but {} labels, decoding common prefix",
            name,
            kinds.len(),
            names.len()
        ));
    }

    let fields: Vec<(String, char)> = names
        .iter()
        .zip(kinds.iter())
        .map(|(n, k)| (n.trim().to_string(), *k))
        .collect();

    let payload_size: usize = fields.iter().filter_map(|(_, k)| field_size(*k)).sum();
    if HEADER_LEN + payload_size != length {
        warnings.push(format!(
            "FMT for {} declares length {} but fields occupy {}",
            name,
            length,
            HEADER_LEN + payload_size
        ));
    }

    Some((
        msg_id,
        MessageSchema {
            name,
            length,
            fields,
        },
    ))
}

fn decode_record(schema: &MessageSchema, payload: &[u8]) -> Option<RawRecord> {
    let mut values = HashMap::new();
    let mut offset = 0usize;

    for (name, kind) in &schema.fields {
        let size = field_size(*kind)?;
        if offset + size > payload.len() {
            break;
        }
        if let Some(value) = decode_numeric(*kind, &payload[offset..offset + size]) {
            values.insert(name.clone(), value);
        }
        offset += size;
    }

    // Records without the microsecond counter cannot be placed on a
    // timeline, so they are unusable downstream.
    let time_us = values.get("TimeUS").map(|v| *v as u64)?;
    Some(RawRecord { time_us, values })
}

/// Read every decodable record from a dataflash log.
pub fn read_log(data: &[u8]) -> RawLog {
    let mut schemas: HashMap<u8, MessageSchema> = HashMap::new();
    let mut raw = RawLog::default();
    let mut unknown_ids: HashSet<u8> = HashSet::new();
    let mut resync_bytes = 0usize;
    let mut pos = 0usize;

    while pos + HEADER_LEN <= data.len() {
        if data[pos] != SYNC1 || data[pos + 1] != SYNC2 {
            resync_bytes += 1;
            pos += 1;
            continue;
        }
        let msg_id = data[pos + 2];

        if msg_id == FMT_MESSAGE_ID {
            if pos + FMT_MESSAGE_LEN > data.len() {
                raw.warnings
                    .push("truncated FMT message at end of file".to_string());
                break;
            }
            if let Some((id, schema)) =
                parse_fmt(&data[pos + HEADER_LEN..pos + FMT_MESSAGE_LEN], &mut raw.warnings)
            {
                schemas.insert(id, schema);
            }
            pos += FMT_MESSAGE_LEN;
        } else if let Some(schema) = schemas.get(&msg_id) {
            if pos + schema.length > data.len() {
                raw.warnings.push(format!(
                    "truncated {} record at end of file",
                    schema.name
                ));
                break;
            }
            if let Some(record) =
                decode_record(schema, &data[pos + HEADER_LEN..pos + schema.length])
            {
                raw.groups
                    .entry(schema.name.clone())
                    .or_default()
                    .push(record);
            }
            pos += schema.length;
        } else {
            // No FMT seen for this id; resync one byte at a time.
            unknown_ids.insert(msg_id);
            pos += 1;
        }
    }

    if resync_bytes > 0 {
        debug!(resync_bytes, "skipped bytes outside message framing");
    }
    if !unknown_ids.is_empty() {
        raw.warnings.push(format!(
            "skipped {} message id(s) that had no FMT definition",
            unknown_ids.len()
        ));
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt_message(msg_id: u8, length: u8, name: &str, format: &str, labels: &str) -> Vec<u8> {
        let mut out = vec![SYNC1, SYNC2, FMT_MESSAGE_ID, msg_id, length];
        let pad = |s: &str, width: usize, out: &mut Vec<u8>| {
            let bytes = s.as_bytes();
            out.extend_from_slice(bytes);
            out.extend(std::iter::repeat(0u8).take(width - bytes.len()));
        };
        pad(name, 4, &mut out);
        pad(format, 16, &mut out);
        pad(labels, 64, &mut out);
        assert_eq!(out.len(), FMT_MESSAGE_LEN);
        out
    }

    fn att_message(msg_id: u8, time_us: u64, roll: f32, pitch: f32) -> Vec<u8> {
        let mut out = vec![SYNC1, SYNC2, msg_id];
        out.extend_from_slice(&time_us.to_le_bytes());
        out.extend_from_slice(&roll.to_le_bytes());
        out.extend_from_slice(&pitch.to_le_bytes());
        out
    }

    #[test]
    fn test_fmt_then_records() {
        let mut data = fmt_message(10, 19, "ATT", "Qff", "TimeUS,Roll,Pitch");
        data.extend(att_message(10, 1_000, 1.5, -0.5));
        data.extend(att_message(10, 2_000, 2.5, 0.5));

        let raw = read_log(&data);
        assert!(raw.warnings.is_empty(), "{:?}", raw.warnings);
        let att = raw.group("ATT").expect("ATT group");
        assert_eq!(att.len(), 2);
        assert_eq!(att[0].time_us, 1_000);
        assert_eq!(att[0].value("Roll"), Some(1.5));
        assert_eq!(att[1].value("Pitch"), Some(0.5));
    }

    #[test]
    fn test_resyncs_over_garbage() {
        let mut data = fmt_message(10, 19, "ATT", "Qff", "TimeUS,Roll,Pitch");
        data.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        data.extend(att_message(10, 5_000, 3.0, 4.0));

        let raw = read_log(&data);
        let att = raw.group("ATT").expect("ATT group");
        assert_eq!(att.len(), 1);
        assert_eq!(att[0].time_us, 5_000);
    }

    #[test]
    fn test_truncated_record_warns() {
        let mut data = fmt_message(10, 19, "ATT", "Qff", "TimeUS,Roll,Pitch");
        let full = att_message(10, 1_000, 1.0, 2.0);
        data.extend_from_slice(&full[..full.len() - 4]);

        let raw = read_log(&data);
        assert!(raw.groups.get("ATT").is_none());
        assert!(raw.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn test_latitude_scaling() {
        // 'L' fields carry degrees * 1e7
        let mut data = fmt_message(20, 15, "GPS", "QL", "TimeUS,Lat");
        let mut rec = vec![SYNC1, SYNC2, 20];
        rec.extend_from_slice(&1_000u64.to_le_bytes());
        rec.extend_from_slice(&473_977_420i32.to_le_bytes());
        data.extend(rec);

        let raw = read_log(&data);
        let gps = raw.group("GPS").expect("GPS group");
        assert!((gps[0].value("Lat").unwrap() - 47.397_742).abs() < 1e-9);
    }
}
