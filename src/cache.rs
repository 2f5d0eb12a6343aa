//! Photo record cache for incremental builds.
//!
//! Building a [`Photo`] means reading the source file's EXIF block and
//! remapping it. That is cheap per photo but adds up over a multi-year
//! journal, and the records are identical from run to run unless the photo
//! or the settings change. This module persists finished records between
//! runs.
//!
//! ## Cache keys
//!
//! Entries are keyed by the photo's relative source path and validated by
//! two hashes:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//!
//! - **`settings_hash`**: SHA-256 of every setting that shapes a record:
//!   the output specs (derivative paths), the EXIF mapping tree, and the page
//!   location patterns. Editing any of them invalidates every entry.
//!
//! A hit requires both hashes to match. Derivative files are not tracked
//! here; the needs-processing check looks at the output directory itself.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.gallery-cache.json`.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to start from an empty manifest. Every record is
//! rebuilt and the manifest is rewritten at the end of the run.

use crate::config::GalleryConfig;
use crate::photo::Photo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".gallery-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// Validation hashes for one cached record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub source_hash: String,
    pub settings_hash: String,
}

/// Store of finished [`Photo`] records, keyed by relative source path.
pub trait PhotoCache {
    /// The cached record for `original_path`, if its key still matches.
    fn get(&self, original_path: &str, key: &CacheKey) -> Option<&Photo>;

    /// Store or replace the record for `photo.original_path`.
    fn put(&mut self, photo: Photo, key: CacheKey);

    /// Drop records whose source is no longer discovered.
    fn prune(&mut self, live: &BTreeSet<String>);

    /// Write the store to durable storage.
    fn persist(&self) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub key: CacheKey,
    pub photo: Photo,
}

/// On-disk cache manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
    /// Directory the manifest is persisted to. Never serialized.
    #[serde(skip)]
    output_dir: PathBuf,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty(output_dir: &Path) -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(output_dir),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                return Self::empty(output_dir);
            }
        };
        if manifest.version != MANIFEST_VERSION {
            log::debug!(
                "Cache version {} != {}, starting fresh",
                manifest.version,
                MANIFEST_VERSION
            );
            return Self::empty(output_dir);
        }
        manifest.output_dir = output_dir.to_path_buf();
        manifest
    }

    /// Save to the output directory.
    pub fn save(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(&self.output_dir), json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PhotoCache for CacheManifest {
    fn get(&self, original_path: &str, key: &CacheKey) -> Option<&Photo> {
        self.entries
            .get(original_path)
            .filter(|entry| entry.key == *key)
            .map(|entry| &entry.photo)
    }

    fn put(&mut self, photo: Photo, key: CacheKey) {
        self.entries
            .insert(photo.original_path.clone(), CacheEntry { key, photo });
    }

    fn prune(&mut self, live: &BTreeSet<String>) {
        self.entries.retain(|path, _| live.contains(path));
    }

    fn persist(&self) -> io::Result<()> {
        self.save()
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// The settings that determine what a [`Photo`] record contains.
#[derive(Serialize)]
struct RecordSettings<'a> {
    outputs: &'a BTreeMap<String, crate::config::OutputSpec>,
    exif: &'a crate::metadata::MappingTable,
    photo_save_as: &'a str,
    photo_url: &'a str,
}

/// SHA-256 hash of the record-shaping settings.
pub fn hash_settings(config: &GalleryConfig) -> Result<String, serde_json::Error> {
    let settings = RecordSettings {
        outputs: &config.outputs,
        exif: &config.exif,
        photo_save_as: &config.photo_save_as,
        photo_url: &config.photo_url,
    };
    let mut hasher = Sha256::new();
    hasher.update(b"record\0");
    hasher.update(serde_json::to_vec(&settings)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Summary of cache performance for a context pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} read ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} read", self.misses)
        }
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use std::fs;
    use tempfile::TempDir;

    fn photo(path: &str) -> Photo {
        Photo::new(path, Metadata::new(), &GalleryConfig::default())
    }

    fn key(source: &str, settings: &str) -> CacheKey {
        CacheKey {
            source_hash: source.to_string(),
            settings_hash: settings.to_string(),
        }
    }

    // =========================================================================
    // CacheManifest basics
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let manifest = CacheManifest::empty(Path::new("/out"));
        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert!(manifest.is_empty());
    }

    #[test]
    fn get_hit() {
        let mut manifest = CacheManifest::empty(Path::new("/out"));
        manifest.put(photo("photos/a.jpg"), key("src", "set"));
        assert!(manifest.get("photos/a.jpg", &key("src", "set")).is_some());
    }

    #[test]
    fn get_miss_wrong_source_hash() {
        let mut manifest = CacheManifest::empty(Path::new("/out"));
        manifest.put(photo("photos/a.jpg"), key("src", "set"));
        assert!(manifest.get("photos/a.jpg", &key("changed", "set")).is_none());
    }

    #[test]
    fn get_miss_wrong_settings_hash() {
        let mut manifest = CacheManifest::empty(Path::new("/out"));
        manifest.put(photo("photos/a.jpg"), key("src", "set"));
        assert!(manifest.get("photos/a.jpg", &key("src", "other")).is_none());
    }

    #[test]
    fn get_miss_no_entry() {
        let manifest = CacheManifest::empty(Path::new("/out"));
        assert!(manifest.get("photos/a.jpg", &key("src", "set")).is_none());
    }

    #[test]
    fn put_replaces_existing_entry() {
        let mut manifest = CacheManifest::empty(Path::new("/out"));
        manifest.put(photo("photos/a.jpg"), key("v1", "set"));
        manifest.put(photo("photos/a.jpg"), key("v2", "set"));
        assert_eq!(manifest.len(), 1);
        assert!(manifest.get("photos/a.jpg", &key("v2", "set")).is_some());
    }

    #[test]
    fn prune_drops_vanished_sources() {
        let mut manifest = CacheManifest::empty(Path::new("/out"));
        manifest.put(photo("photos/a.jpg"), key("a", "s"));
        manifest.put(photo("photos/b.jpg"), key("b", "s"));
        let live: BTreeSet<String> = ["photos/b.jpg".to_string()].into();
        manifest.prune(&live);
        assert_eq!(manifest.entries.keys().collect::<Vec<_>>(), vec!["photos/b.jpg"]);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = CacheManifest::empty(tmp.path());
        manifest.put(photo("photos/a.jpg"), key("src", "set"));
        manifest.persist().unwrap();

        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.entries, manifest.entries);
        assert!(loaded.get("photos/a.jpg", &key("src", "set")).is_some());
    }

    #[test]
    fn save_creates_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("not/yet/there");
        CacheManifest::empty(&out).save().unwrap();
        assert!(manifest_path(&out).exists());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(manifest_path(tmp.path()), "not json {{{").unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = CacheManifest::empty(tmp.path());
        manifest.put(photo("photos/a.jpg"), key("src", "set"));
        manifest.version = 999;
        manifest.save().unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"pixels").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
        assert_eq!(hash_file(&path).unwrap().len(), 64);
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"one").unwrap();
        let first = hash_file(&path).unwrap();
        fs::write(&path, b"two").unwrap();
        assert_ne!(first, hash_file(&path).unwrap());
    }

    #[test]
    fn hash_settings_deterministic() {
        let config = GalleryConfig::default();
        assert_eq!(
            hash_settings(&config).unwrap(),
            hash_settings(&config).unwrap()
        );
    }

    #[test]
    fn hash_settings_varies_with_outputs() {
        let base = GalleryConfig::default();
        let mut changed = base.clone();
        changed
            .outputs
            .get_mut("thumbnail_image")
            .unwrap()
            .filename = "T_{}".into();
        assert_ne!(hash_settings(&base).unwrap(), hash_settings(&changed).unwrap());
    }

    #[test]
    fn hash_settings_varies_with_mapping() {
        let base = GalleryConfig::default();
        let mut changed = base.clone();
        changed.exif.remove("timezone");
        assert_ne!(hash_settings(&base).unwrap(), hash_settings(&changed).unwrap());
    }

    #[test]
    fn hash_settings_ignores_job_count() {
        let base = GalleryConfig::default();
        let changed = GalleryConfig {
            max_jobs: 16,
            ..base.clone()
        };
        assert_eq!(hash_settings(&base).unwrap(), hash_settings(&changed).unwrap());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let stats = CacheStats { hits: 3, misses: 2 };
        assert_eq!(stats.to_string(), "3 cached, 2 read (5 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let mut stats = CacheStats::default();
        stats.miss();
        stats.miss();
        assert_eq!(stats.to_string(), "2 read");
    }
}
