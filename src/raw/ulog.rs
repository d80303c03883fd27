//! PX4 ULog (.ulg) message extraction.
//!
//! ULog files are self-describing: 'F' messages declare per-topic field
//! layouts, 'A' messages subscribe a topic under a numeric id, and 'D'
//! messages carry records against a subscription. The reader walks the
//! message stream once, keeps the first instance (multi id 0) of every
//! topic, and extracts named numeric values field by field.
//!
//! Anything it cannot place — unknown message types, nested field types,
//! short payloads — is skipped, with a warning where coverage is lost.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{RawLog, RawRecord};

pub(crate) const ULOG_MAGIC: [u8; 7] = [0x55, 0x4C, 0x6F, 0x67, 0x01, 0x12, 0x35];
/// Magic, version byte and u64 start timestamp.
const FILE_HEADER_LEN: usize = 16;
/// u16 payload size plus message type byte.
const MESSAGE_HEADER_LEN: usize = 3;

#[derive(Debug, Clone)]
struct UlogField {
    type_name: String,
    array_len: Option<usize>,
    name: String,
}

#[derive(Debug, Clone, Default)]
struct FormatSchema {
    fields: Vec<UlogField>,
}

/// Size of one ULog builtin scalar type; None for nested message types.
fn builtin_size(type_name: &str) -> Option<usize> {
    match type_name {
        "int8_t" | "uint8_t" | "bool" | "char" => Some(1),
        "int16_t" | "uint16_t" => Some(2),
        "int32_t" | "uint32_t" | "float" => Some(4),
        "int64_t" | "uint64_t" | "double" => Some(8),
        _ => None,
    }
}

fn decode_builtin(type_name: &str, bytes: &[u8]) -> Option<f64> {
    let le2 = |b: &[u8]| [b[0], b[1]];
    let le4 = |b: &[u8]| [b[0], b[1], b[2], b[3]];
    let le8 = |b: &[u8]| [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
    match type_name {
        "int8_t" => Some(bytes[0] as i8 as f64),
        "uint8_t" | "bool" | "char" => Some(bytes[0] as f64),
        "int16_t" => Some(i16::from_le_bytes(le2(bytes)) as f64),
        "uint16_t" => Some(u16::from_le_bytes(le2(bytes)) as f64),
        "int32_t" => Some(i32::from_le_bytes(le4(bytes)) as f64),
        "uint32_t" => Some(u32::from_le_bytes(le4(bytes)) as f64),
        "float" => Some(f32::from_le_bytes(le4(bytes)) as f64),
        "int64_t" => Some(i64::from_le_bytes(le8(bytes)) as f64),
        "uint64_t" => Some(u64::from_le_bytes(le8(bytes)) as f64),
        "double" => Some(f64::from_le_bytes(le8(bytes))),
        _ => None,
    }
}

/// Parse one 'F' payload: `topic_name:type field;type field;...`.
fn parse_format(payload: &[u8]) -> Option<(String, FormatSchema)> {
    let text = std::str::from_utf8(payload).ok()?;
    let (name, field_text) = text.split_once(':')?;

    let mut schema = FormatSchema::default();
    for part in field_text.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut words = part.split_whitespace();
        let type_spec = words.next()?;
        let field_name = words.next()?;

        let (type_name, array_len) = match type_spec.split_once('[') {
            Some((base, rest)) => {
                let len = rest.trim_end_matches(']').parse::<usize>().ok()?;
                (base.to_string(), Some(len))
            }
            None => (type_spec.to_string(), None),
        };

        schema.fields.push(UlogField {
            type_name,
            array_len,
            name: field_name.to_string(),
        });
    }

    Some((name.to_string(), schema))
}

/// Decode one 'D' payload against its topic schema.
///
/// Extraction stops at the first field whose offset cannot be computed
/// (nested type) or that runs past the payload; everything before it is
/// kept. Padding fields (leading underscore) advance the offset but emit
/// no value. Char arrays are strings on the wire and are skipped whole.
fn extract_record(schema: &FormatSchema, payload: &[u8]) -> Option<RawRecord> {
    let mut values = HashMap::new();
    let mut time_us: Option<u64> = None;
    let mut offset = 0usize;

    'fields: for field in &schema.fields {
        let Some(elem_size) = builtin_size(&field.type_name) else {
            break;
        };
        let count = field.array_len.unwrap_or(1);
        let skip_values =
            field.name.starts_with('_') || (field.type_name == "char" && field.array_len.is_some());

        for index in 0..count {
            if offset + elem_size > payload.len() {
                break 'fields;
            }
            if !skip_values {
                let bytes = &payload[offset..offset + elem_size];
                if field.name == "timestamp" && field.type_name == "uint64_t" {
                    time_us = Some(u64::from_le_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6],
                        bytes[7],
                    ]));
                }
                if let Some(value) = decode_builtin(&field.type_name, bytes) {
                    let key = if field.array_len.is_some() {
                        format!("{}[{}]", field.name, index)
                    } else {
                        field.name.clone()
                    };
                    values.insert(key, value);
                }
            }
            offset += elem_size;
        }
    }

    time_us.map(|t| RawRecord { time_us: t, values })
}

/// Read every decodable record from a ULog file.
pub fn read_log(data: &[u8]) -> RawLog {
    let mut raw = RawLog::default();

    if data.len() < FILE_HEADER_LEN || data[..ULOG_MAGIC.len()] != ULOG_MAGIC {
        raw.warnings
            .push("missing ULog file magic, nothing decoded".to_string());
        return raw;
    }

    let mut formats: HashMap<String, FormatSchema> = HashMap::new();
    // Subscription id -> topic name, first instance of each topic only.
    let mut subscriptions: HashMap<u16, String> = HashMap::new();
    let mut unknown_subscriptions: HashSet<u16> = HashSet::new();
    let mut pos = FILE_HEADER_LEN;

    while pos + MESSAGE_HEADER_LEN <= data.len() {
        let size = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
        let msg_type = data[pos + 2];
        let start = pos + MESSAGE_HEADER_LEN;
        let end = start + size;
        if end > data.len() {
            raw.warnings.push(format!(
                "truncated '{}' message at end of file",
                msg_type as char
            ));
            break;
        }
        let payload = &data[start..end];

        match msg_type {
            b'F' => {
                if let Some((name, schema)) = parse_format(payload) {
                    formats.insert(name, schema);
                } else {
                    raw.warnings
                        .push("unparseable format definition skipped".to_string());
                }
            }
            b'A' => {
                if payload.len() >= 3 {
                    let multi_id = payload[0];
                    let msg_id = u16::from_le_bytes([payload[1], payload[2]]);
                    let topic = String::from_utf8_lossy(&payload[3..]).trim().to_string();
                    if multi_id == 0 && !topic.is_empty() {
                        subscriptions.insert(msg_id, topic);
                    }
                }
            }
            b'D' if payload.len() >= 2 => {
                let msg_id = u16::from_le_bytes([payload[0], payload[1]]);
                match subscriptions.get(&msg_id) {
                    Some(topic) => {
                        if let Some(schema) = formats.get(topic) {
                            if let Some(record) = extract_record(schema, &payload[2..]) {
                                raw.groups.entry(topic.clone()).or_default().push(record);
                            }
                        }
                    }
                    None => {
                        // Subscriptions with multi id > 0 land here too,
                        // silently.
                        unknown_subscriptions.insert(msg_id);
                    }
                }
            }
            // Info, parameter, logged-string, sync, dropout and flag-bits
            // messages carry nothing the channel layer needs.
            _ => {}
        }

        pos = end;
    }

    debug!(
        topics = raw.groups.len(),
        skipped_ids = unknown_subscriptions.len(),
        "ULog extraction finished"
    );

    raw
}
