//! EXIF field mapping.
//!
//! Photos carry their camera metadata in EXIF, addressed by IFD segment and
//! numeric tag. Page templates want something friendlier: `make`, `model`,
//! `date`, `location.latitude`. The mapping table in `config.toml` declares
//! that translation as a tree:
//!
//! ```toml
//! [exif]
//! make = { segment = "0th", tag = "Make" }
//! timezone = { segment = "0th", tag = 34858 }
//!
//! [exif.location]
//! latitude = { segment = "GPS", tag = "GPSLatitude" }
//! ```
//!
//! Leaves ([`FieldRef`]) name one EXIF field; groups nest. The output
//! [`Metadata`] has exactly the shape of the table.
//!
//! ## Conversions
//!
//! - `GPSLatitude` / `GPSLongitude`: three rationals (degrees, minutes,
//!   seconds) become one decimal-degree float. The hemisphere stays in the
//!   separate `*Ref` fields.
//! - `DateTime`, `DateTimeOriginal`, `DateTimeDigitized`:
//!   `"2024:01:01 12:00:00"` becomes `"2024-01-01 12:00:00"`. Unparsable
//!   values are kept verbatim.
//! - ASCII and undefined-type fields decode to text with trailing NULs
//!   trimmed. Numbers pass through; multi-valued fields become lists.
//!
//! A missing field yields [`MetaValue::Empty`] for that leaf only. A photo
//! whose EXIF cannot be read at all yields an empty mapping; reading
//! metadata never fails.

use crate::imaging::{ExifBlock, ImageBackend, Segment, TagId, degrees_to_decimal};
use crate::types::{MetaValue, Metadata};
use chrono::NaiveDateTime;
use exif::{Field, Rational, Tag, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const ISO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reference to a single EXIF field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRef {
    pub segment: Segment,
    pub tag: TagId,
}

impl FieldRef {
    pub fn new(segment: Segment, tag: impl Into<TagId>) -> Self {
        Self {
            segment,
            tag: tag.into(),
        }
    }
}

/// A node in the mapping tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExifMapping {
    Field(FieldRef),
    Group(MappingTable),
}

/// Top level of the mapping tree: output key to node.
pub type MappingTable = BTreeMap<String, ExifMapping>;

/// The stock mapping: camera make/model, capture time, timezone offset and
/// GPS location.
pub fn default_mapping() -> MappingTable {
    let mut location = MappingTable::new();
    location.insert(
        "latitude_ref".into(),
        ExifMapping::Field(FieldRef::new(Segment::Gps, Tag::GPSLatitudeRef)),
    );
    location.insert(
        "longitude_ref".into(),
        ExifMapping::Field(FieldRef::new(Segment::Gps, Tag::GPSLongitudeRef)),
    );
    location.insert(
        "latitude".into(),
        ExifMapping::Field(FieldRef::new(Segment::Gps, Tag::GPSLatitude)),
    );
    location.insert(
        "longitude".into(),
        ExifMapping::Field(FieldRef::new(Segment::Gps, Tag::GPSLongitude)),
    );

    let mut table = MappingTable::new();
    table.insert(
        "make".into(),
        ExifMapping::Field(FieldRef::new(Segment::Primary, Tag::Make)),
    );
    table.insert(
        "model".into(),
        ExifMapping::Field(FieldRef::new(Segment::Primary, Tag::Model)),
    );
    table.insert(
        "date".into(),
        ExifMapping::Field(FieldRef::new(Segment::Primary, Tag::DateTime)),
    );
    // TimeZoneOffset has no named constant in the exif crate.
    table.insert(
        "timezone".into(),
        ExifMapping::Field(FieldRef::new(Segment::Primary, TagId::Number(34858))),
    );
    table.insert("location".into(), ExifMapping::Group(location));
    table
}

/// Read a photo's EXIF block and remap it.
///
/// Returns an empty mapping when the file has no readable EXIF.
pub fn read_metadata(backend: &impl ImageBackend, path: &Path, mapping: &MappingTable) -> Metadata {
    match backend.read_exif(path) {
        Ok(block) => remap(&block, mapping),
        Err(e) => {
            log::debug!("EXIF information not found in {}: {}", path.display(), e);
            Metadata::new()
        }
    }
}

/// Translate an EXIF block through the mapping tree.
pub fn remap(exif: &ExifBlock, mapping: &MappingTable) -> Metadata {
    mapping
        .iter()
        .map(|(key, node)| (key.clone(), remap_node(exif, node)))
        .collect()
}

fn remap_node(exif: &ExifBlock, node: &ExifMapping) -> MetaValue {
    match node {
        ExifMapping::Group(table) => MetaValue::Group(remap(exif, table)),
        ExifMapping::Field(field_ref) => exif
            .get(field_ref.segment, &field_ref.tag)
            .map(convert_field)
            .unwrap_or(MetaValue::Empty),
    }
}

fn convert_field(field: &Field) -> MetaValue {
    match field.tag {
        Tag::GPSLatitude | Tag::GPSLongitude => {
            convert_coordinate(&field.value).unwrap_or_else(|| decode_value(&field.value))
        }
        Tag::DateTime | Tag::DateTimeOriginal | Tag::DateTimeDigitized => {
            match decode_value(&field.value) {
                MetaValue::Text(text) => MetaValue::Text(convert_datetime(&text)),
                other => other,
            }
        }
        _ => decode_value(&field.value),
    }
}

/// Degrees/minutes/seconds rationals to decimal degrees.
fn convert_coordinate(value: &Value) -> Option<MetaValue> {
    let Value::Rational(parts) = value else {
        return None;
    };
    let [d, m, s] = parts.as_slice() else {
        return None;
    };
    Some(MetaValue::Float(degrees_to_decimal(
        rational_f64(d)?,
        rational_f64(m)?,
        rational_f64(s)?,
    )))
}

fn rational_f64(r: &Rational) -> Option<f64> {
    (r.denom != 0).then(|| r.num as f64 / r.denom as f64)
}

/// `"YYYY:MM:DD HH:MM:SS"` to `"YYYY-MM-DD HH:MM:SS"`. Anything else is
/// returned unchanged.
pub fn convert_datetime(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT) {
        Ok(dt) => dt.format(ISO_DATETIME_FORMAT).to_string(),
        Err(_) => {
            log::debug!("unparsable EXIF datetime {:?}", raw);
            raw.to_string()
        }
    }
}

fn decode_value(value: &Value) -> MetaValue {
    match value {
        Value::Ascii(strings) => collapse(strings.iter().map(|s| bytes_to_text(s)).collect()),
        Value::Undefined(bytes, _) => bytes_to_text(bytes),
        Value::Byte(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::Short(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::Long(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::SByte(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::SShort(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::SLong(v) => collapse(v.iter().map(|&n| MetaValue::Integer(n as i64)).collect()),
        Value::Rational(v) => collapse(
            v.iter()
                .map(|r| rational_f64(r).map_or(MetaValue::Empty, MetaValue::Float))
                .collect(),
        ),
        Value::SRational(v) => collapse(
            v.iter()
                .map(|r| {
                    if r.denom == 0 {
                        MetaValue::Empty
                    } else {
                        MetaValue::Float(r.num as f64 / r.denom as f64)
                    }
                })
                .collect(),
        ),
        Value::Float(v) => collapse(v.iter().map(|&f| MetaValue::Float(f as f64)).collect()),
        Value::Double(v) => collapse(v.iter().map(|&f| MetaValue::Float(f)).collect()),
        Value::Unknown(..) => MetaValue::Empty,
    }
}

fn bytes_to_text(bytes: &[u8]) -> MetaValue {
    let text = String::from_utf8_lossy(bytes);
    MetaValue::Text(text.trim_end_matches('\0').to_string())
}

/// Single values unwrap, multiple become a list.
fn collapse(mut items: Vec<MetaValue>) -> MetaValue {
    match items.len() {
        0 => MetaValue::Empty,
        1 => items.remove(0),
        _ => MetaValue::List(items),
    }
}
