//! Derivative generation.
//!
//! Stage 2 of the build. Takes the photos whose derivatives are missing and
//! writes them, in parallel, on a dedicated [rayon](https://docs.rs/rayon)
//! pool sized by `max_jobs`.
//!
//! ## Output Structure
//!
//! Derivatives sit next to their source's relative location:
//!
//! ```text
//! output/
//! ├── .gallery-cache.json
//! └── photos/
//!     ├── 2024-01-01_trip.jpg           # copy_original
//!     ├── ARTICLE_2024-01-01_trip.jpg   # 1024x1024
//!     └── THUMB_2024-01-01_trip.jpg     # 512x512
//! ```
//!
//! ## Failure isolation
//!
//! Every photo ends in exactly one [`PhotoOutcome`]. A photo that cannot be
//! decoded, or whose output directory cannot be created, never stops its
//! siblings; the outcome is recorded and the batch continues. A panic inside
//! a job is caught and recorded as [`PhotoOutcome::Failed`].
//!
//! ## Progress
//!
//! When a sender is supplied, a [`ProcessEvent`] is emitted as each photo
//! finishes. Jobs run concurrently, so events arrive in completion order;
//! the returned results are always in job order.

use crate::config::{GalleryConfig, OutputSpec};
use crate::imaging::{DeriveError, ImageBackend, generate_derivatives};
use crate::photo::Photo;
use rayon::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Could not start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// What happened to one photo's derivatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// All derivatives were written.
    Generated(Vec<PathBuf>),
    /// Nothing was attempted, e.g. the output directory could not be created.
    Skipped(String),
    /// Decoding, encoding or writing failed.
    Failed(String),
}

impl PhotoOutcome {
    fn from_result(result: Result<Vec<PathBuf>, DeriveError>) -> Self {
        match result {
            Ok(paths) => PhotoOutcome::Generated(paths),
            Err(e @ DeriveError::OutputDir { .. }) => PhotoOutcome::Skipped(e.to_string()),
            Err(DeriveError::Backend(e)) => PhotoOutcome::Failed(e.to_string()),
        }
    }
}

/// Progress events streamed to the CLI printer.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Emitted once before any job starts.
    Started { pending: usize, up_to_date: usize },
    /// Emitted as each photo finishes.
    PhotoDone {
        /// 1-based position in the job list.
        index: usize,
        title: String,
        source_path: String,
        outcome: PhotoOutcome,
    },
}

/// Settings the derivative stage reads from the gallery config.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub outputs: BTreeMap<String, OutputSpec>,
    pub auto_rotate: bool,
    pub max_jobs: usize,
}

impl ProcessConfig {
    pub fn from_gallery_config(config: &GalleryConfig) -> Self {
        Self {
            outputs: config.outputs.clone(),
            auto_rotate: config.auto_rotate,
            max_jobs: config.max_jobs,
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_gallery_config(&GalleryConfig::default())
    }
}

/// One unit of work: an absolute source path and its immutable record.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub source: &'a Path,
    pub photo: &'a Photo,
}

/// Generate derivatives for every job on a pool of `max_jobs` threads.
///
/// Returns `(original_path, outcome)` pairs in job order.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    jobs: &[Job<'_>],
    config: &ProcessConfig,
    output_root: &Path,
    up_to_date: usize,
    events: Option<Sender<ProcessEvent>>,
) -> Result<Vec<(String, PhotoOutcome)>, ProcessError> {
    if let Some(tx) = &events {
        tx.send(ProcessEvent::Started {
            pending: jobs.len(),
            up_to_date,
        })
        .ok();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_jobs.max(1))
        .build()?;

    let outcomes: Vec<(String, PhotoOutcome)> = pool.install(|| {
        jobs.par_iter()
            .enumerate()
            .map(|(i, job)| {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    generate_derivatives(
                        backend,
                        job.source,
                        job.photo,
                        &config.outputs,
                        output_root,
                        config.auto_rotate,
                    )
                }));
                let outcome = match result {
                    Ok(result) => PhotoOutcome::from_result(result),
                    Err(payload) => {
                        PhotoOutcome::Failed(format!("panicked: {}", panic_message(&*payload)))
                    }
                };
                match &outcome {
                    PhotoOutcome::Skipped(reason) => {
                        log::warn!("Skipped {}: {}", job.photo.original_path, reason)
                    }
                    PhotoOutcome::Failed(reason) => {
                        log::warn!("Failed {}: {}", job.photo.original_path, reason)
                    }
                    PhotoOutcome::Generated(_) => {}
                }
                if let Some(tx) = &events {
                    tx.send(ProcessEvent::PhotoDone {
                        index: i + 1,
                        title: job.photo.title.clone(),
                        source_path: job.photo.original_path.clone(),
                        outcome: outcome.clone(),
                    })
                    .ok();
                }
                (job.photo.original_path.clone(), outcome)
            })
            .collect()
    });

    Ok(outcomes)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Copy an original next to its derivatives unless a copy of the same size
/// is already there. Returns whether a copy was made.
pub fn copy_original(source: &Path, destination: &Path) -> std::io::Result<bool> {
    let source_len = std::fs::metadata(source)?.len();
    if let Ok(existing) = std::fs::metadata(destination)
        && existing.len() == source_len
    {
        return Ok(false);
    }
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, destination)?;
    Ok(true)
}
