//! High-level derivative operations.
//!
//! These functions combine a [`Photo`]'s precomputed derivative paths with
//! the configured output specs, and call the backend. They decide *which*
//! files to write and *where*; the backend decides how.

use super::backend::{BackendError, ImageBackend};
use super::params::{DeriveParams, OutputParams, Quality};
use crate::config::OutputSpec;
use crate::photo::Photo;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("could not create {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Derivative outputs of `photo` not yet present under `output_root`.
pub fn missing_derivatives<'a>(photo: &'a Photo, output_root: &Path) -> Vec<&'a str> {
    photo
        .derivatives
        .values()
        .map(String::as_str)
        .filter(|rel| !output_root.join(rel).exists())
        .collect()
}

/// Whether any derivative of `photo` has to be (re)generated.
pub fn needs_processing(photo: &Photo, output_root: &Path) -> bool {
    !missing_derivatives(photo, output_root).is_empty()
}

/// Plan the backend call for one photo without executing it.
///
/// Outputs are listed in spec-name order. Specs the photo has no derivative
/// path for are skipped.
pub fn plan_derivatives(
    source: &Path,
    photo: &Photo,
    outputs: &BTreeMap<String, OutputSpec>,
    output_root: &Path,
    auto_rotate: bool,
) -> DeriveParams {
    let outputs = outputs
        .iter()
        .filter_map(|(name, spec)| {
            let rel = photo.derivative(name)?;
            Some(OutputParams {
                output: output_root.join(rel),
                width: spec.size[0],
                height: spec.size[1],
                quality: Quality::new(spec.quality),
            })
        })
        .collect();

    DeriveParams {
        source: source.to_path_buf(),
        auto_rotate,
        outputs,
    }
}

/// Write every derivative of `photo`.
///
/// Creates the output directory (idempotent), then decodes the source once
/// and writes each output. Returns the written paths.
pub fn generate_derivatives(
    backend: &impl ImageBackend,
    source: &Path,
    photo: &Photo,
    outputs: &BTreeMap<String, OutputSpec>,
    output_root: &Path,
    auto_rotate: bool,
) -> Result<Vec<PathBuf>, DeriveError> {
    let params = plan_derivatives(source, photo, outputs, output_root, auto_rotate);

    let dirs: std::collections::BTreeSet<&Path> = params
        .outputs
        .iter()
        .filter_map(|o| o.output.parent())
        .collect();
    for dir in dirs {
        std::fs::create_dir_all(dir).map_err(|source| DeriveError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    log::debug!("Process: {}", source.display());
    backend.derive(&params)?;
    Ok(params.outputs.into_iter().map(|o| o.output).collect())
}
