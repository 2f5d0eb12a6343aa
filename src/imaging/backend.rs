//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: reading the EXIF block and deriving resized outputs.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests use the recording `MockBackend` below.

use super::exif_block::ExifBlock;
use super::params::DeriveParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of a written derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: derivative jobs for different photos run
/// concurrently against one shared backend.
pub trait ImageBackend: Sync {
    /// Read the embedded EXIF block without decoding pixels.
    fn read_exif(&self, path: &Path) -> Result<ExifBlock, BackendError>;

    /// Decode the source once and write every requested derivative.
    ///
    /// Returns the dimensions of each written output, in request order.
    fn derive(&self, params: &DeriveParams) -> Result<Vec<Dimensions>, BackendError>;
}
