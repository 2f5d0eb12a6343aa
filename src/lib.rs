//! # Journal Gallery
//!
//! Builds the photo section of a travel journal from a directory of camera
//! JPEGs. Every photo gets friendly metadata remapped from its EXIF block,
//! fixed-size derivatives (thumbnail, article image) rotated upright, and an
//! HTML page; a paginated index ties them together.
//!
//! # Architecture: Context, then Output
//!
//! A build runs in two passes over an immutable photo list:
//!
//! ```text
//! 1. Context   content/ → Vec<Photo>         (discover, read EXIF, cache records)
//! 2. Output    Vec<Photo> → output/          (derivatives, originals, pages)
//! ```
//!
//! The first pass is cheap and cached; the second only touches what is
//! missing. Deleting a derivative is the way to regenerate it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`gallery`] | Build driver: owns the photo list and the injected collaborators |
//! | [`scan`] | Photo discovery over the content tree |
//! | [`metadata`] | EXIF field mapping: configurable tag tree → nested [`types::Metadata`] |
//! | [`photo`] | The per-photo record: derivative paths, metadata, page location |
//! | [`process`] | Parallel derivative generation with per-photo outcomes |
//! | [`generate`] | Photo pages and the paginated index, rendered with Maud |
//! | [`cache`] | Record cache keyed by source and settings hashes |
//! | [`config`] | `config.toml` loading, stock defaults, merging, validation |
//! | [`imaging`] | Pure-Rust JPEG work: EXIF block, orientation, fit-crop, encode |
//! | [`naming`] | Derivative filenames, slugs, page paths |
//! | [`types`] | Metadata value types shared by records and templates |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Derivatives Next to Their Source
//!
//! A photo at `photos/2024/a.jpg` gets `photos/2024/THUMB_a.jpg` in the
//! output tree. Journal entries reference photos by their content path, so
//! keeping the relative layout means a link written against the source tree
//! resolves against the output tree too.
//!
//! ## Existence Is the Processing Check
//!
//! A photo is processed when any of its derivatives is missing from the
//! output directory. There is no timestamp comparison: editing a source
//! photo in place does not regenerate its derivatives until they are
//! removed. The record cache, which does hash source bytes, only covers
//! metadata.
//!
//! ## Orientation Baked In
//!
//! With `auto_rotate` on, derivatives are rotated to upright pixels and the
//! orientation tag is dropped from their EXIF, so browsers that honor the
//! tag and browsers that ignore it show the same picture.
//!
//! ## Collaborators Behind Traits
//!
//! Discovery, caching, image work and page writing are each a trait
//! ([`scan::PhotoSource`], [`cache::PhotoCache`], [`imaging::ImageBackend`],
//! [`generate::PageWriter`]). The driver tests run against a recording mock
//! backend and an in-memory page writer.

pub mod cache;
pub mod config;
pub mod gallery;
pub mod generate;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod photo;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
