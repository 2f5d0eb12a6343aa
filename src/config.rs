//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The user file in
//! the content root is layered on top of stock defaults; the result is an
//! immutable [`GalleryConfig`] built once per run.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml              # Overrides stock defaults
//! └── photos/
//!     ├── 2024-01-01_trip.jpg
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! gallery_paths = ["photos"]        # Directories (relative to content) to scan
//! gallery_paths_exclude = []        # Directories to skip
//! max_jobs = 4                      # Parallel derivative workers
//! auto_rotate = true                # Apply EXIF orientation to derivatives
//! copy_original = true              # Copy the source JPEG to the output
//! per_page = 9                      # Photos per gallery index page
//! photo_save_as = "photo/{slug}.html"
//! photo_url = "photo/{slug}.html"
//! gallery_save_as = "gallery.html"  # Empty string disables the index
//! site_name = "Entries"
//!
//! [outputs.thumbnail_image]
//! size = [512, 512]                 # Exact output size; source is fit-cropped
//! quality = 80                      # JPEG quality (0-100)
//! filename = "THUMB_{}"             # Exactly one {} = source filename
//!
//! [exif]
//! make = { segment = "0th", tag = "Make" }
//!
//! [exif.location]
//! latitude = { segment = "GPS", tag = "GPSLatitude" }
//! ```
//!
//! ## Merging
//!
//! Scalars and plain tables merge key-by-key onto the defaults. The
//! `outputs` and `exif` tables are different: they describe complete sets,
//! so a user table replaces the stock one wholesale. Declaring
//! `[outputs.small]` therefore yields exactly one output, not three.
//!
//! Unknown keys are rejected to catch typos early.

use crate::metadata::{MappingTable, default_mapping};
use crate::naming::{PLACEHOLDER, placeholder_count};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the user config inside the content root.
pub const CONFIG_FILE: &str = "config.toml";

/// Tables that replace rather than merge.
const REPLACED_TABLES: &[&str] = &["outputs", "exif"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Directories under the content root that hold photos.
    pub gallery_paths: Vec<String>,
    /// Directories under the content root to skip.
    pub gallery_paths_exclude: Vec<String>,
    /// Maximum parallel derivative jobs.
    pub max_jobs: usize,
    /// Rotate derivatives upright according to the EXIF orientation tag.
    pub auto_rotate: bool,
    /// Copy each original JPEG next to its derivatives.
    pub copy_original: bool,
    /// Photos per gallery index page.
    pub per_page: usize,
    /// Output location of photo pages; `{slug}` is substituted.
    pub photo_save_as: String,
    /// Public URL of photo pages; `{slug}` is substituted.
    pub photo_url: String,
    /// Output location of the first index page. Empty disables the index.
    pub gallery_save_as: String,
    /// Site title shown on every page.
    pub site_name: String,
    /// Named derivative outputs.
    pub outputs: BTreeMap<String, OutputSpec>,
    /// EXIF field mapping tree.
    pub exif: MappingTable,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            gallery_paths: vec!["photos".to_string()],
            gallery_paths_exclude: Vec::new(),
            max_jobs: 4,
            auto_rotate: true,
            copy_original: true,
            per_page: 9,
            photo_save_as: "photo/{slug}.html".to_string(),
            photo_url: "photo/{slug}.html".to_string(),
            gallery_save_as: "gallery.html".to_string(),
            site_name: "Entries".to_string(),
            outputs: default_outputs(),
            exif: default_mapping(),
        }
    }
}

/// One named derivative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    /// Exact output `[width, height]`.
    pub size: [u32; 2],
    /// JPEG quality, 0-100. Clamped to 1-100 when encoding.
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Filename pattern with exactly one `{}` placeholder.
    pub filename: String,
}

fn default_quality() -> u32 {
    80
}

fn default_outputs() -> BTreeMap<String, OutputSpec> {
    let mut outputs = BTreeMap::new();
    outputs.insert(
        "article_image".to_string(),
        OutputSpec {
            size: [1024, 1024],
            quality: 80,
            filename: "ARTICLE_{}".to_string(),
        },
    );
    outputs.insert(
        "thumbnail_image".to_string(),
        OutputSpec {
            size: [512, 512],
            quality: 80,
            filename: "THUMB_{}".to_string(),
        },
    );
    outputs
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_jobs == 0 {
            return Err(ConfigError::Validation("max_jobs must be at least 1".into()));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Validation("per_page must be at least 1".into()));
        }
        for (key, pattern) in [
            ("photo_save_as", &self.photo_save_as),
            ("photo_url", &self.photo_url),
        ] {
            if !pattern.contains("{slug}") {
                return Err(ConfigError::Validation(format!(
                    "{} must contain {{slug}}",
                    key
                )));
            }
        }

        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (name, spec) in &self.outputs {
            if spec.size[0] == 0 || spec.size[1] == 0 {
                return Err(ConfigError::Validation(format!(
                    "outputs.{}.size values must be non-zero",
                    name
                )));
            }
            if spec.quality > 100 {
                return Err(ConfigError::Validation(format!(
                    "outputs.{}.quality must be 0-100",
                    name
                )));
            }
            if placeholder_count(&spec.filename) != 1 {
                return Err(ConfigError::Validation(format!(
                    "outputs.{}.filename must contain exactly one {{}} placeholder",
                    name
                )));
            }
            if self.copy_original && spec.filename == PLACEHOLDER {
                return Err(ConfigError::Validation(format!(
                    "outputs.{}.filename \"{{}}\" would be overwritten by the original; \
                     add a prefix or set copy_original = false",
                    name
                )));
            }
            if let Some(other) = seen.insert(spec.filename.as_str(), name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "outputs.{} and outputs.{} share the filename pattern \"{}\"",
                    other, name, spec.filename
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => {
            let mut base = base;
            if let (toml::Value::Table(base_table), toml::Value::Table(ov_table)) =
                (&mut base, &ov)
            {
                for key in REPLACED_TABLES {
                    if ov_table.contains_key(*key) {
                        base_table.remove(*key);
                    }
                }
            }
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Journal Gallery Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the content root (TRIPBASE_JOURNAL_CONTENT_PATH or
# --source). Unknown keys will cause an error.

# Directories under the content root that hold photos.
gallery_paths = ["photos"]

# Directories under the content root to skip while scanning.
gallery_paths_exclude = []

# Maximum parallel derivative jobs.
max_jobs = 4

# Rotate derivatives upright using the EXIF orientation tag.
auto_rotate = true

# Copy each original JPEG next to its derivatives.
copy_original = true

# Photos per gallery index page.
per_page = 9

# Where photo pages are written and linked. {slug} is the photo slug.
photo_save_as = "photo/{slug}.html"
photo_url = "photo/{slug}.html"

# First gallery index page; later pages are gallery2.html, gallery3.html...
# Set to "" to skip the index.
gallery_save_as = "gallery.html"

# Site title shown on every page.
site_name = "Entries"

# ---------------------------------------------------------------------------
# Derivative outputs
# ---------------------------------------------------------------------------
# Each output is cropped to the aspect of `size`, then scaled to exactly
# `size`. `filename` must contain exactly one {} (the source filename), and
# no two outputs may share a pattern. A bare "{}" is only allowed with
# copy_original = false. Declaring any [outputs.*] table replaces this
# whole set.
[outputs.article_image]
size = [1024, 1024]
quality = 80
filename = "ARTICLE_{}"

[outputs.thumbnail_image]
size = [512, 512]
quality = 80
filename = "THUMB_{}"

# ---------------------------------------------------------------------------
# EXIF mapping
# ---------------------------------------------------------------------------
# Output key = { segment, tag }. Segments: "0th", "Exif", "GPS", "Interop",
# "1st". Tags are a name ("Make") or a number (34858). Sub-tables nest.
# GPSLatitude/GPSLongitude become decimal degrees; DateTime becomes
# "YYYY-MM-DD HH:MM:SS". Declaring [exif] replaces this whole tree.
[exif]
make = { segment = "0th", tag = "Make" }
model = { segment = "0th", tag = "Model" }
date = { segment = "0th", tag = "DateTime" }
timezone = { segment = "0th", tag = 34858 }

[exif.location]
latitude_ref = { segment = "GPS", tag = "GPSLatitudeRef" }
longitude_ref = { segment = "GPS", tag = "GPSLongitudeRef" }
latitude = { segment = "GPS", tag = "GPSLatitude" }
longitude = { segment = "GPS", tag = "GPSLongitude" }
"##
}
