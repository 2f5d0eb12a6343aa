//! Decoded EXIF block: the structure that is read, remapped, stripped of its
//! orientation tag, and written back into every derivative.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Parse from a JPEG file | `exif::Reader::read_from_container` |
//! | Parse a raw TIFF payload | `exif::Reader::read_raw` |
//! | Re-serialize | `exif::experimental::Writer` |
//!
//! Fields are addressed by [`Segment`] (the IFD they live in) and [`TagId`]
//! (numeric id or canonical tag name), matching the vocabulary of the mapping
//! table in `config.toml`.

use exif::{Context, Field, In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// An IFD of the EXIF structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Primary image IFD (Make, Model, DateTime, Orientation, ...).
    #[serde(rename = "0th")]
    Primary,
    /// Exif sub-IFD (exposure, DateTimeOriginal, ...).
    #[serde(rename = "Exif")]
    Exif,
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "Interop")]
    Interop,
    /// Thumbnail IFD.
    #[serde(rename = "1st")]
    Thumbnail,
}

impl Segment {
    fn context(self) -> Context {
        match self {
            Segment::Primary | Segment::Thumbnail => Context::Tiff,
            Segment::Exif => Context::Exif,
            Segment::Gps => Context::Gps,
            Segment::Interop => Context::Interop,
        }
    }

    fn ifd(self) -> In {
        match self {
            Segment::Thumbnail => In::THUMBNAIL,
            _ => In::PRIMARY,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Primary => "0th",
            Segment::Exif => "Exif",
            Segment::Gps => "GPS",
            Segment::Interop => "Interop",
            Segment::Thumbnail => "1st",
        };
        f.write_str(name)
    }
}

/// Tag identifier within a segment: either the numeric id or the canonical
/// name as printed by `exif::Tag`'s `Display` (`"Make"`, `"GPSLatitude"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagId {
    Number(u16),
    Name(String),
}

impl TagId {
    fn matches(&self, tag: Tag) -> bool {
        match self {
            TagId::Number(n) => tag.number() == *n,
            TagId::Name(name) => tag.to_string() == *name,
        }
    }
}

impl From<Tag> for TagId {
    fn from(tag: Tag) -> Self {
        TagId::Name(tag.to_string())
    }
}

/// Tags the writer regenerates itself; pushing them would clash.
const POINTER_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
];

/// A decoded EXIF block.
#[derive(Debug, Clone)]
pub struct ExifBlock {
    fields: Vec<Field>,
    little_endian: bool,
}

impl ExifBlock {
    /// Build a block from individual fields.
    pub fn from_fields(fields: Vec<Field>, little_endian: bool) -> Self {
        Self {
            fields,
            little_endian,
        }
    }

    /// Parse a raw TIFF payload (the APP1 contents after `Exif\0\0`).
    pub fn from_raw(data: Vec<u8>) -> Result<Self, exif::Error> {
        let exif = Reader::new().read_raw(data)?;
        Ok(Self::from_exif(&exif))
    }

    /// Read the EXIF block embedded in an image file without decoding pixels.
    pub fn read_from_path(path: &Path) -> Result<Self, exif::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut reader)?;
        Ok(Self::from_exif(&exif))
    }

    fn from_exif(exif: &exif::Exif) -> Self {
        Self {
            fields: exif.fields().cloned().collect(),
            little_endian: exif.little_endian(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by segment and tag id.
    pub fn get(&self, segment: Segment, tag: &TagId) -> Option<&Field> {
        let context = segment.context();
        let ifd = segment.ifd();
        self.fields
            .iter()
            .find(|f| f.ifd_num == ifd && f.tag.context() == context && tag.matches(f.tag))
    }

    /// Orientation code of the primary image, if tagged.
    pub fn orientation(&self) -> Option<u32> {
        self.fields
            .iter()
            .find(|f| f.tag == Tag::Orientation && f.ifd_num == In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }

    /// Remove the primary orientation tag and return its code.
    ///
    /// A tag whose value is not an integer is still removed and reported as
    /// code 1 (identity).
    pub fn take_orientation(&mut self) -> Option<u32> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.tag == Tag::Orientation && f.ifd_num == In::PRIMARY)?;
        let field = self.fields.remove(pos);
        Some(field.value.get_uint(0).unwrap_or(1))
    }

    /// Serialize the primary-image fields back to a TIFF payload.
    ///
    /// Thumbnail IFD fields are dropped: the embedded thumbnail would no
    /// longer match a resized derivative.
    pub fn to_tiff(&self) -> Result<Vec<u8>, exif::Error> {
        let mut writer = exif::experimental::Writer::new();
        for field in self.fields.iter().filter(|f| is_writable(f)) {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, self.little_endian)?;
        Ok(buf.into_inner())
    }
}

fn is_writable(field: &Field) -> bool {
    field.ifd_num == In::PRIMARY
        && !POINTER_TAGS.contains(&field.tag)
        && !matches!(field.value, Value::Unknown(..))
}
