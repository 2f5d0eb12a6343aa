//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which derivatives a photo needs and where they go) and the
//! [`backend`](super::backend) (which does the pixel work). Tests swap in a
//! mock backend without touching operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 80). Clamped on construction.
//! - [`OutputParams`]: One derivative: output path, exact target size, quality.
//! - [`DeriveParams`]: One source image and every derivative to produce from it.

use std::path::PathBuf;

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// A single derivative to write.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputParams {
    pub output: PathBuf,
    /// Exact output dimensions; the source is fit-cropped to this aspect.
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Everything the backend needs to turn one source into its derivatives.
///
/// The source is decoded once and shared by all outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DeriveParams {
    pub source: PathBuf,
    /// Rotate pixels upright and drop the orientation tag before resizing.
    pub auto_rotate: bool,
    pub outputs: Vec<OutputParams>,
}
