//! Image processing: pure Rust, JPEG in and JPEG out.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **EXIF read / write** | `kamadak-exif` reader + experimental writer |
//! | **EXIF splice** | `img-parts` (`ImageEXIF`) |
//! | **Orientation** | `DynamicImage::rotate90/180/270` + `fliph` |
//! | **Fit → JPEG** | centered crop + Lanczos3 `resize_exact` + `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and coordinate math (unit testable)
//! - **EXIF block**: Decoded EXIF addressed by segment and tag
//! - **Orientation**: The eight EXIF orientation transforms
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod exif_block;
pub mod operations;
pub mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CropRect, calculate_fit_crop, degrees_to_decimal};
pub use exif_block::{ExifBlock, Segment, TagId};
pub use operations::{
    DeriveError, generate_derivatives, missing_derivatives, needs_processing, plan_derivatives,
};
pub use orientation::{Orientation, normalize};
pub use params::{DeriveParams, OutputParams, Quality};
pub use rust_backend::RustBackend;
