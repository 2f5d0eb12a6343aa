//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode JPEG | `image::load_from_memory_with_format` |
//! | Extract EXIF segment | `img_parts::jpeg::Jpeg` + `ImageEXIF::exif` |
//! | Orientation | [`normalize`](super::orientation::normalize) |
//! | Fit crop + resize | `DynamicImage::crop_imm` + `resize_exact` with `Lanczos3` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Re-embed EXIF | `ExifBlock::to_tiff` + `ImageEXIF::set_exif` |
//! | Write | sibling `.part` file, then `fs::rename` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_fit_crop;
use super::exif_block::ExifBlock;
use super::orientation::normalize;
use super::params::{DeriveParams, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a JPEG and pull its EXIF block out of the APP1 segment.
///
/// A missing or corrupt EXIF segment is not an error: the pixels are still
/// usable.
fn load_source(path: &Path) -> Result<(DynamicImage, Option<ExifBlock>), BackendError> {
    let data = std::fs::read(path)?;
    let img = image::load_from_memory_with_format(&data, ImageFormat::Jpeg).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    let exif = extract_exif(Bytes::from(data), path);
    Ok((img, exif))
}

fn extract_exif(data: Bytes, path: &Path) -> Option<ExifBlock> {
    let jpeg = Jpeg::from_bytes(data).ok()?;
    let raw = jpeg.exif()?;
    match ExifBlock::from_raw(raw.to_vec()) {
        Ok(block) => Some(block),
        Err(e) => {
            log::debug!("Unreadable EXIF in {}: {}", path.display(), e);
            None
        }
    }
}

/// Crop to the target aspect around the center, then scale to exactly
/// `width` x `height`.
fn fit(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let crop = calculate_fit_crop((img.width(), img.height()), (width, height));
    img.crop_imm(crop.x, crop.y, crop.width, crop.height)
        .resize_exact(width, height, FilterType::Lanczos3)
}

/// Encode as baseline JPEG at the given quality.
pub(crate) fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    encoder
        .encode_image(&img.to_rgb8())
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buf)
}

/// Splice a TIFF payload into an encoded JPEG as its EXIF segment.
pub(crate) fn embed_exif(encoded: &[u8], tiff: &[u8]) -> Result<Vec<u8>, img_parts::Error> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(encoded))?;
    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));
    Ok(jpeg.encoder().bytes().to_vec())
}

/// Write `bytes` to a hidden sibling file and rename it over `path`.
///
/// A derivative's existence marks it as done, so a partially written file
/// must never appear under the final name.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let partial = path.with_file_name(format!(".{}.part", name));
    std::fs::write(&partial, bytes)?;
    std::fs::rename(&partial, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&partial);
    })
}

impl ImageBackend for RustBackend {
    fn read_exif(&self, path: &Path) -> Result<ExifBlock, BackendError> {
        Ok(ExifBlock::read_from_path(path)?)
    }

    fn derive(&self, params: &DeriveParams) -> Result<Vec<Dimensions>, BackendError> {
        let (img, exif) = load_source(&params.source)?;
        let (img, exif) = if params.auto_rotate {
            normalize(img, exif)
        } else {
            (img, exif)
        };

        let tiff = exif
            .filter(|block| !block.is_empty())
            .and_then(|block| match block.to_tiff() {
                Ok(tiff) => Some(tiff),
                Err(e) => {
                    log::warn!(
                        "Could not re-encode EXIF for {}, writing derivatives without it: {}",
                        params.source.display(),
                        e
                    );
                    None
                }
            });

        params
            .outputs
            .iter()
            .map(|out| {
                let resized = fit(&img, out.width, out.height);
                let encoded = encode_jpeg(&resized, out.quality)?;
                let bytes = match &tiff {
                    Some(tiff) => embed_exif(&encoded, tiff).unwrap_or_else(|e| {
                        log::warn!(
                            "Could not embed EXIF into {}: {}",
                            out.output.display(),
                            e
                        );
                        encoded
                    }),
                    None => encoded,
                };
                log::debug!("Save: {}", out.output.display());
                write_atomically(&out.output, &bytes)?;
                Ok(Dimensions {
                    width: resized.width(),
                    height: resized.height(),
                })
            })
            .collect()
    }
}
