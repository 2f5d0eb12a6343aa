//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calculate the centered crop that gives `source` the aspect ratio of
/// `target`.
///
/// This is the first half of the "fit" policy: crop to the target aspect,
/// then scale to the exact target size. No letterboxing, no distortion.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Output dimensions (width, height)
///
/// # Returns
/// * The largest centered rectangle of the target aspect ratio that fits
///   inside the source. Never empty for non-empty inputs.
///
/// # Examples
/// ```
/// # use journal_gallery::imaging::{CropRect, calculate_fit_crop};
/// // 4000x3000 landscape into a square: trim 500px off each side
/// assert_eq!(
///     calculate_fit_crop((4000, 3000), (512, 512)),
///     CropRect { x: 500, y: 0, width: 3000, height: 3000 }
/// );
/// ```
pub fn calculate_fit_crop(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    // Compare src_w/src_h against tgt_w/tgt_h without floating point.
    let src_cross = src_w as u64 * tgt_h as u64;
    let tgt_cross = tgt_w as u64 * src_h as u64;

    if src_cross > tgt_cross {
        // Source is wider: keep full height, trim the sides
        let w = ((src_h as f64 * tgt_w as f64 / tgt_h as f64).round() as u32).clamp(1, src_w);
        CropRect {
            x: (src_w - w) / 2,
            y: 0,
            width: w,
            height: src_h,
        }
    } else if src_cross < tgt_cross {
        // Source is taller: keep full width, trim top and bottom
        let h = ((src_w as f64 * tgt_h as f64 / tgt_w as f64).round() as u32).clamp(1, src_h);
        CropRect {
            x: 0,
            y: (src_h - h) / 2,
            width: src_w,
            height: h,
        }
    } else {
        CropRect {
            x: 0,
            y: 0,
            width: src_w,
            height: src_h,
        }
    }
}

/// Convert an EXIF (degrees, minutes, seconds) triplet to decimal degrees.
///
/// ```
/// # use journal_gallery::imaging::degrees_to_decimal;
/// assert_eq!(degrees_to_decimal(60.0, 30.0, 0.0), 60.5);
/// ```
pub fn degrees_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
