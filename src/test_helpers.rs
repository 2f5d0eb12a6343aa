//! Shared test utilities for the journal-gallery test suite.
//!
//! Provides real-JPEG writers (optionally carrying an EXIF block), a content
//! tree builder, and an in-memory [`PageWriter`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_content(&["photos/2024-01-01_trip.jpg", "photos/b.jpg"]);
//! write_test_jpeg(&tmp.path().join("content/photos/c.jpg"), 32, 16, None);
//!
//! let writer = MemoryWriter::default();
//! // ... generate pages into `writer` ...
//! assert!(writer.page("gallery.html").contains("THUMB_b.jpg"));
//! ```

use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;

use crate::generate::{GenerateError, PageWriter};
use crate::imaging::rust_backend::{embed_exif, encode_jpeg};
use crate::imaging::{ExifBlock, Quality};
use image::{DynamicImage, Rgb, RgbImage};

// =========================================================================
// Image files
// =========================================================================

/// Encode `img` as a JPEG at `path`, embedding `exif` when given.
pub fn write_jpeg(path: &Path, img: &DynamicImage, exif: Option<&ExifBlock>) {
    let mut bytes = encode_jpeg(img, Quality::new(95)).unwrap();
    if let Some(block) = exif {
        let tiff = block.to_tiff().unwrap();
        bytes = embed_exif(&bytes, &tiff).unwrap();
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Write a `width` x `height` gradient JPEG.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32, exif: Option<&ExifBlock>) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    write_jpeg(path, &DynamicImage::ImageRgb8(img), exif);
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Temp directory with a `content/` tree holding a small JPEG at each
/// relative path. `output/` is left for the build to create.
pub fn setup_content(photos: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for relative in photos {
        write_test_jpeg(&tmp.path().join("content").join(relative), 24, 16, None);
    }
    tmp
}

// =========================================================================
// Page capture
// =========================================================================

/// Collects rendered pages in memory.
#[derive(Default)]
pub struct MemoryWriter {
    pages: RefCell<Vec<(String, String)>>,
}

impl PageWriter for MemoryWriter {
    fn write_page(&self, save_as: &str, html: &str) -> Result<(), GenerateError> {
        self.pages
            .borrow_mut()
            .push((save_as.to_string(), html.to_string()));
        Ok(())
    }
}

impl MemoryWriter {
    /// HTML of the page written to `save_as`. Panics if there is none.
    pub fn page(&self, save_as: &str) -> String {
        let pages = self.pages.borrow();
        pages
            .iter()
            .find(|(p, _)| p == save_as)
            .map(|(_, html)| html.clone())
            .unwrap_or_else(|| {
                let names: Vec<&str> = pages.iter().map(|(p, _)| p.as_str()).collect();
                panic!("page '{save_as}' not written. Written: {names:?}")
            })
    }

    /// Every `save_as` in write order.
    pub fn names(&self) -> Vec<String> {
        self.pages.borrow().iter().map(|(p, _)| p.clone()).collect()
    }
}
