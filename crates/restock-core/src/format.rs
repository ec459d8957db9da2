//! The two persisted shapes of a track database.
//!
//! The current format is a schema-tagged JSON document. The legacy format is
//! one record per line, `<version> <hash> <path>`, with `#` comment lines.
//! Which one a file uses is decided once at load time and carried as a
//! [`StorageFormat`] tag.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::track::TrackRecord;

pub const SCHEMA_TAG: &str = "restock-track-db";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Current,
    Legacy,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrackDocument {
    schema: String,
    version: u32,
    records: Vec<TrackRecord>,
}

/// Decode persisted text into records, trying the current format first and
/// falling back to the legacy line format. Returns `None` when neither
/// yields any records; the caller treats that as an empty database.
#[must_use]
pub fn parse(text: &str) -> Option<(StorageFormat, Vec<TrackRecord>)> {
    if let Some(records) = parse_current(text) {
        if !records.is_empty() {
            return Some((StorageFormat::Current, records));
        }
    }

    let records = parse_legacy(text);
    if records.is_empty() {
        None
    } else {
        Some((StorageFormat::Legacy, records))
    }
}

fn parse_current(text: &str) -> Option<Vec<TrackRecord>> {
    let doc: TrackDocument = serde_json::from_str(text).ok()?;
    if doc.schema != SCHEMA_TAG || doc.version != FORMAT_VERSION {
        return None;
    }
    Some(doc.records)
}

fn parse_legacy(text: &str) -> Vec<TrackRecord> {
    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.splitn(3, ' ');
        let (Some(version), Some(hash), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if path.is_empty() || hash.len() < 8 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        records.push(TrackRecord {
            path: path.to_string(),
            version: version.to_string(),
            checksum: String::new(),
            quick_hash: hash.to_string(),
        });
    }
    records
}

/// Encode records as the current JSON document.
pub fn to_current(records: &[TrackRecord]) -> Result<String> {
    let doc = TrackDocument {
        schema: SCHEMA_TAG.to_string(),
        version: FORMAT_VERSION,
        records: records.to_vec(),
    };
    let mut text = serde_json::to_string_pretty(&doc)?;
    text.push('\n');
    Ok(text)
}

/// Written in place of an absent legacy hash; the line format has no way to
/// express "unknown".
pub const LEGACY_NULL_HASH: &str = "00000000";

/// Encode records as the legacy line format.
#[must_use]
pub fn to_legacy(records: &[TrackRecord]) -> String {
    let mut text = String::new();
    for record in records {
        let hash = if record.quick_hash.is_empty() {
            LEGACY_NULL_HASH
        } else {
            &record.quick_hash
        };
        text.push_str(&format!("{} {} {}\n", record.version, hash, record.path));
    }
    text
}
