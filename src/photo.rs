//! Photo content model.
//!
//! One [`Photo`] per source JPEG. Built once during discovery (or revived
//! from the record cache) and never mutated afterwards: every later stage
//! (derivative generation, page rendering) reads from it.

use crate::config::GalleryConfig;
use crate::naming::{
    date_prefix, derivative_path, format_page_path, photo_slug, title_from_path,
};
use crate::types::{MetaValue, Metadata, lookup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A photo in the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Source path relative to the content root, forward slashes.
    pub original_path: String,
    /// Output name → derivative path relative to the output root.
    pub derivatives: BTreeMap<String, String>,
    /// Remapped EXIF; empty when the source had none.
    pub metadata: Metadata,
    /// Filename without extension.
    pub title: String,
    pub slug: String,
    /// Page location relative to the output root.
    pub save_as: String,
    /// Page URL relative to the site root.
    pub url: String,
    /// `YYYY-MM-DD` from a dated filename.
    pub date: Option<String>,
}

impl Photo {
    pub fn new(original_path: &str, metadata: Metadata, config: &GalleryConfig) -> Self {
        let title = title_from_path(original_path);
        let slug = photo_slug(&title, original_path);
        let derivatives = config
            .outputs
            .iter()
            .map(|(name, spec)| (name.clone(), derivative_path(original_path, &spec.filename)))
            .collect();

        Self {
            original_path: original_path.to_string(),
            derivatives,
            metadata,
            save_as: format_page_path(&config.photo_save_as, &slug),
            url: format_page_path(&config.photo_url, &slug),
            date: date_prefix(&title).map(|d| d.format("%Y-%m-%d").to_string()),
            title,
            slug,
        }
    }

    /// Relative path of a named derivative.
    pub fn derivative(&self, name: &str) -> Option<&str> {
        self.derivatives.get(name).map(String::as_str)
    }

    /// Signed decimal coordinates `(latitude, longitude)` for maps.
    ///
    /// Reads `location.latitude` / `location.longitude` and applies the
    /// hemisphere from the `*_ref` fields (`S` and `W` are negative).
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = lookup(&self.metadata, "location.latitude")?.as_f64()?;
        let lng = lookup(&self.metadata, "location.longitude")?.as_f64()?;
        Some((
            signed(lat, lookup(&self.metadata, "location.latitude_ref"), "S"),
            signed(lng, lookup(&self.metadata, "location.longitude_ref"), "W"),
        ))
    }
}

fn signed(value: f64, reference: Option<&MetaValue>, negative: &str) -> f64 {
    match reference.and_then(MetaValue::as_text) {
        Some(r) if r.trim().eq_ignore_ascii_case(negative) => -value,
        _ => value,
    }
}
