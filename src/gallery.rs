//! Gallery build driver.
//!
//! Ties the stages together around four injected collaborators:
//!
//! | Seam | Production | Role |
//! |---|---|---|
//! | [`PhotoSource`] | [`FsPhotoSource`](crate::scan::FsPhotoSource) | discovery |
//! | [`PhotoCache`] | [`CacheManifest`](crate::cache::CacheManifest) | record reuse |
//! | [`ImageBackend`] | [`RustBackend`](crate::imaging::RustBackend) | EXIF + pixels |
//! | [`PageWriter`] | [`FsPageWriter`](crate::generate::FsPageWriter) | page output |
//!
//! A build is two calls:
//!
//! ```text
//! generate_context()   discover → cached or fresh Photo records → persist cache
//! generate_output()    missing derivatives (parallel) → originals → pages
//! ```
//!
//! The photo list is built once by `generate_context` and read-only from
//! then on. Per-photo failures are collected into the [`BuildReport`]; only
//! failures that affect the whole run (unreadable content root, unwritable
//! cache or pages) are returned as errors.

use crate::cache::{CacheKey, CacheStats, PhotoCache, hash_file, hash_settings};
use crate::config::GalleryConfig;
use crate::generate::{GenerateError, PageWriter, SiteContext, generate_pages};
use crate::imaging::{ImageBackend, needs_processing};
use crate::metadata::read_metadata;
use crate::photo::Photo;
use crate::process::{
    Job, PhotoOutcome, ProcessConfig, ProcessError, ProcessEvent, copy_original,
    process_with_backend,
};
use crate::scan::{PhotoSource, ScanError};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("Could not hash settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("Could not save cache: {0}")]
    Cache(#[source] std::io::Error),
}

/// Counts and failures from one `generate_output` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Photos in the gallery.
    pub photos: usize,
    /// Photos whose derivatives were all present already.
    pub up_to_date: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub originals_copied: usize,
    /// Pages written (photo pages plus index pages).
    pub pages: usize,
    pub cache: CacheStats,
    /// `(original_path, reason)` for every skipped or failed step.
    pub failures: Vec<(String, String)>,
}

impl BuildReport {
    /// No photo was skipped or failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A photo gallery rooted in a content tree.
pub struct Gallery<S, C, B> {
    config: GalleryConfig,
    source: S,
    cache: C,
    backend: B,
    output_root: PathBuf,
    site: SiteContext,
    photos: Vec<Photo>,
    cache_stats: CacheStats,
}

impl<S: PhotoSource, C: PhotoCache, B: ImageBackend> Gallery<S, C, B> {
    pub fn new(
        config: GalleryConfig,
        source: S,
        cache: C,
        backend: B,
        output_root: impl Into<PathBuf>,
        site: SiteContext,
    ) -> Self {
        Self {
            config,
            source,
            cache,
            backend,
            output_root: output_root.into(),
            site,
            photos: Vec::new(),
            cache_stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Records built by the last `generate_context` call.
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache_stats
    }

    /// Discover photos and build their records.
    ///
    /// A record is reused from the cache when the source bytes and the
    /// record-shaping settings are unchanged; otherwise its EXIF is read and
    /// remapped. Unreadable sources are logged and left out. The cache is
    /// pruned to the discovered set and persisted.
    pub fn generate_context(&mut self) -> Result<&[Photo], GalleryError> {
        let discovered = self.source.discover(
            &self.config.gallery_paths,
            &self.config.gallery_paths_exclude,
        )?;
        let settings_hash = hash_settings(&self.config)?;

        let mut photos = Vec::with_capacity(discovered.len());
        let mut stats = CacheStats::default();
        for relative in &discovered {
            let path = self.source.absolute(relative);
            let source_hash = match hash_file(&path) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Cannot read {}, skipping: {}", path.display(), e);
                    continue;
                }
            };
            let key = CacheKey {
                source_hash,
                settings_hash: settings_hash.clone(),
            };

            if let Some(cached) = self.cache.get(relative, &key) {
                stats.hit();
                photos.push(cached.clone());
                continue;
            }

            stats.miss();
            let metadata = read_metadata(&self.backend, &path, &self.config.exif);
            let photo = Photo::new(relative, metadata, &self.config);
            self.cache.put(photo.clone(), key);
            photos.push(photo);
        }

        let live: BTreeSet<String> = discovered.into_iter().collect();
        self.cache.prune(&live);
        self.cache.persist().map_err(GalleryError::Cache)?;

        warn_slug_collisions(&photos);
        log::info!("Context: {} photos ({})", photos.len(), stats);

        self.photos = photos;
        self.cache_stats = stats;
        Ok(&self.photos)
    }

    /// Write missing derivatives, copy originals, and render every page.
    ///
    /// Only photos with at least one missing derivative are processed, so a
    /// second run over an unchanged tree writes no images.
    pub fn generate_output(
        &self,
        writer: &impl PageWriter,
        events: Option<Sender<ProcessEvent>>,
    ) -> Result<BuildReport, GalleryError> {
        let sources: Vec<PathBuf> = self
            .photos
            .iter()
            .map(|p| self.source.absolute(&p.original_path))
            .collect();

        let jobs: Vec<Job<'_>> = self
            .photos
            .iter()
            .zip(&sources)
            .filter(|(photo, _)| needs_processing(photo, &self.output_root))
            .map(|(photo, source)| Job {
                source: source.as_path(),
                photo,
            })
            .collect();
        let up_to_date = self.photos.len() - jobs.len();
        log::debug!(
            "Generate output: {} to process, {} up to date",
            jobs.len(),
            up_to_date
        );

        let process_config = ProcessConfig::from_gallery_config(&self.config);
        let outcomes = process_with_backend(
            &self.backend,
            &jobs,
            &process_config,
            &self.output_root,
            up_to_date,
            events,
        )?;

        let mut report = BuildReport {
            photos: self.photos.len(),
            up_to_date,
            cache: self.cache_stats,
            ..BuildReport::default()
        };
        for (original_path, outcome) in outcomes {
            match outcome {
                PhotoOutcome::Generated(_) => report.generated += 1,
                PhotoOutcome::Skipped(reason) => {
                    report.skipped += 1;
                    report.failures.push((original_path, reason));
                }
                PhotoOutcome::Failed(reason) => {
                    report.failed += 1;
                    report.failures.push((original_path, reason));
                }
            }
        }

        if self.config.copy_original {
            for (photo, source) in self.photos.iter().zip(&sources) {
                let destination = self.output_root.join(&photo.original_path);
                match copy_original(source, &destination) {
                    Ok(true) => report.originals_copied += 1,
                    Ok(false) => {}
                    Err(e) => {
                        log::warn!("Could not copy {}: {}", photo.original_path, e);
                        report
                            .failures
                            .push((photo.original_path.clone(), format!("copy failed: {}", e)));
                    }
                }
            }
        }

        let pages = generate_pages(&self.photos, &self.config, &self.site, writer)?;
        report.pages = pages.len();
        Ok(report)
    }

    /// `generate_context` followed by `generate_output`.
    pub fn build(
        &mut self,
        writer: &impl PageWriter,
        events: Option<Sender<ProcessEvent>>,
    ) -> Result<BuildReport, GalleryError> {
        self.generate_context()?;
        self.generate_output(writer, events)
    }
}

/// Photos sharing a slug overwrite each other's page; the last one wins.
fn warn_slug_collisions(photos: &[Photo]) {
    let mut by_page: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for photo in photos {
        by_page
            .entry(photo.save_as.as_str())
            .or_default()
            .push(photo.original_path.as_str());
    }
    for (page, sources) in by_page.iter().filter(|(_, s)| s.len() > 1) {
        log::warn!("{} photos share page {}: {}", sources.len(), page, sources.join(", "));
    }
}
