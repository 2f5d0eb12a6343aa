//! EXIF orientation normalization.
//!
//! Cameras store pixels in sensor order and record how to display them in
//! the Orientation tag (1-8). Derivatives are written with the pixels already
//! upright, so the tag is removed from the EXIF block before it is re-embedded;
//! keeping it would make viewers rotate the image a second time.
//!
//! ```text
//! code  transform
//!  1    identity
//!  2    flip horizontal
//!  3    rotate 180
//!  4    rotate 180, flip horizontal
//!  5    rotate 90 cw, flip horizontal
//!  6    rotate 90 cw
//!  7    rotate 90 ccw, flip horizontal
//!  8    rotate 90 ccw
//! ```

use super::exif_block::ExifBlock;
use image::DynamicImage;

/// One of the eight EXIF orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    FlipHorizontal,
    Rotate180,
    Rotate180FlipHorizontal,
    Rotate90FlipHorizontal,
    Rotate90,
    Rotate270FlipHorizontal,
    Rotate270,
}

impl Orientation {
    /// Map an EXIF orientation code. Codes outside 1-8 are `None`.
    pub fn from_exif(code: u32) -> Option<Self> {
        Some(match code {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::Rotate180FlipHorizontal,
            5 => Orientation::Rotate90FlipHorizontal,
            6 => Orientation::Rotate90,
            7 => Orientation::Rotate270FlipHorizontal,
            8 => Orientation::Rotate270,
            _ => return None,
        })
    }

    /// Apply the correcting transform to `img`.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::Rotate180FlipHorizontal => img.rotate180().fliph(),
            Orientation::Rotate90FlipHorizontal => img.rotate90().fliph(),
            Orientation::Rotate90 => img.rotate90(),
            Orientation::Rotate270FlipHorizontal => img.rotate270().fliph(),
            Orientation::Rotate270 => img.rotate270(),
        }
    }
}

/// Rotate/flip `img` upright according to its EXIF block and strip the
/// orientation tag.
///
/// No block, or a block without an orientation tag, returns the input
/// unchanged. Unknown codes leave the pixels alone but the tag is still
/// removed.
pub fn normalize(
    img: DynamicImage,
    exif: Option<ExifBlock>,
) -> (DynamicImage, Option<ExifBlock>) {
    let Some(mut exif) = exif else {
        return (img, None);
    };
    let Some(code) = exif.take_orientation() else {
        return (img, Some(exif));
    };
    let img = match Orientation::from_exif(code) {
        Some(orientation) => orientation.apply(img),
        None => {
            log::debug!("ignoring unknown EXIF orientation {}", code);
            img
        }
    };
    (img, Some(exif))
}
