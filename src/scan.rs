//! Photo discovery.
//!
//! Stage 1 of the build. Walks the configured gallery directories under the
//! content root and lists every JPEG, as forward-slash paths relative to the
//! root. Those relative paths identify photos everywhere else: cache keys,
//! derivative locations, page slugs.
//!
//! ```text
//! content/                         # Content root
//! ├── config.toml
//! └── photos/                      # gallery_paths = ["photos"]
//!     ├── 2024-01-01_trip.jpg      # → "photos/2024-01-01_trip.jpg"
//!     ├── 2024/
//!     │   └── IMG_0042.JPEG        # → "photos/2024/IMG_0042.JPEG"
//!     └── drafts/                  # gallery_paths_exclude = ["photos/drafts"]
//!         └── wip.jpg              # skipped
//! ```
//!
//! Only `.jpg` / `.jpeg` files are photos (case-insensitive). Hidden
//! directories are skipped. Results are sorted and free of duplicates even
//! when gallery paths overlap.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content root not found: {0}")]
    MissingRoot(PathBuf),
}

/// Lists the photos a gallery is built from.
pub trait PhotoSource {
    /// Relative paths (forward slashes) of every photo under `paths`,
    /// minus anything under `exclude`. Sorted, no duplicates.
    fn discover(&self, paths: &[String], exclude: &[String]) -> Result<Vec<String>, ScanError>;

    /// Absolute location of a discovered photo.
    fn absolute(&self, relative: &str) -> PathBuf;
}

/// Discovers photos on the local filesystem.
pub struct FsPhotoSource {
    root: PathBuf,
}

impl FsPhotoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PhotoSource for FsPhotoSource {
    fn discover(&self, paths: &[String], exclude: &[String]) -> Result<Vec<String>, ScanError> {
        if !self.root.is_dir() {
            return Err(ScanError::MissingRoot(self.root.clone()));
        }
        let exclude: Vec<String> = exclude.iter().map(|e| normalize_relative(e)).collect();

        let mut found = BTreeSet::new();
        for gallery_path in paths {
            if escapes_root(gallery_path) {
                log::warn!(
                    "Gallery path {} is outside the content root, skipping",
                    gallery_path
                );
                continue;
            }
            let dir = self.root.join(gallery_path);
            if !dir.is_dir() {
                log::warn!("Gallery path {} does not exist, skipping", dir.display());
                continue;
            }

            let walker = WalkDir::new(&dir)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| !is_hidden_dir(e));
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() || !is_jpeg(entry.path()) {
                    continue;
                }
                let Some(relative) = relative_path(&self.root, entry.path()) else {
                    log::warn!("Skipping non-UTF-8 path {}", entry.path().display());
                    continue;
                };
                if is_excluded(&relative, &exclude) {
                    log::debug!("Excluded: {}", relative);
                    continue;
                }
                found.insert(relative);
            }
        }
        Ok(found.into_iter().collect())
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Returns `true` for `.jpg` / `.jpeg` in any case.
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

/// A gallery path must stay below the content root: no `..`, no absolute
/// paths.
fn escapes_root(gallery_path: &str) -> bool {
    Path::new(gallery_path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    Some(parts?.join("/"))
}

fn normalize_relative(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn is_excluded(relative: &str, exclude: &[String]) -> bool {
    exclude.iter().any(|ex| {
        !ex.is_empty()
            && (relative == ex
                || relative
                    .strip_prefix(ex.as_str())
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}
