//! Shared types used across the pipeline.
//!
//! [`Metadata`] is produced by the EXIF mapper, stored in the record cache as
//! JSON, and read back by the page templates, so its serialized form must stay
//! stable across all three.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Remapped EXIF metadata: human field names to values.
///
/// The shape mirrors the mapping table it was produced from: leaves become
/// values, groups become nested [`MetaValue::Group`]s.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A single remapped metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// The tag was not present in the photo's EXIF block.
    Empty,
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<MetaValue>),
    Group(Metadata),
}

impl MetaValue {
    pub fn is_empty(&self) -> bool {
        match self {
            MetaValue::Empty => true,
            MetaValue::Text(s) => s.is_empty(),
            MetaValue::List(items) => items.is_empty(),
            MetaValue::Group(map) => map.is_empty(),
            MetaValue::Integer(_) | MetaValue::Float(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(f) => Some(*f),
            MetaValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Metadata> {
        match self {
            MetaValue::Group(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Empty => Ok(()),
            MetaValue::Integer(i) => write!(f, "{}", i),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            MetaValue::Group(map) => {
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

/// Look up a value by dotted path (`"location.latitude"`).
///
/// Returns `None` when any segment is missing or a non-group value is
/// traversed.
pub fn lookup<'a>(metadata: &'a Metadata, path: &str) -> Option<&'a MetaValue> {
    let mut parts = path.split('.');
    let mut current = metadata.get(parts.next()?)?;
    for part in parts {
        current = current.as_group()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        let mut location = Metadata::new();
        location.insert("latitude".into(), MetaValue::Float(60.5));
        location.insert("latitude_ref".into(), MetaValue::Text("N".into()));
        let mut meta = Metadata::new();
        meta.insert("make".into(), MetaValue::Text("Canon".into()));
        meta.insert("timezone".into(), MetaValue::Empty);
        meta.insert("location".into(), MetaValue::Group(location));
        meta
    }

    #[test]
    fn lookup_nested_value() {
        let meta = sample();
        assert_eq!(
            lookup(&meta, "location.latitude").and_then(MetaValue::as_f64),
            Some(60.5)
        );
        assert_eq!(
            lookup(&meta, "make").and_then(MetaValue::as_text),
            Some("Canon")
        );
    }

    #[test]
    fn lookup_missing_segment_is_none() {
        let meta = sample();
        assert!(lookup(&meta, "location.altitude").is_none());
        assert!(lookup(&meta, "make.inner").is_none());
        assert!(lookup(&meta, "").is_none());
    }

    #[test]
    fn empty_serializes_as_null_and_back() {
        let meta = sample();
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains(r#""timezone":null"#));
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn display_joins_lists() {
        let v = MetaValue::List(vec![MetaValue::Integer(1), MetaValue::Integer(2)]);
        assert_eq!(v.to_string(), "1, 2");
        assert_eq!(MetaValue::Empty.to_string(), "");
    }

    #[test]
    fn emptiness() {
        assert!(MetaValue::Empty.is_empty());
        assert!(MetaValue::Text(String::new()).is_empty());
        assert!(!MetaValue::Integer(0).is_empty());
    }
}
