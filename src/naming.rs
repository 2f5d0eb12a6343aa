//! Centralized naming rules for photos, derivatives and pages.
//!
//! Every path the pipeline writes is derived from a source photo's relative
//! path with one of these functions, so the cache, the derivative generator
//! and the page templates always agree.
//!
//! ## Derivatives
//!
//! An output spec's `filename` pattern has exactly one `{}` placeholder,
//! replaced by the source filename. The derivative lives in the same
//! relative directory as its source:
//!
//! - `photos/2024/IMG_1.jpg` + `THUMB_{}` → `photos/2024/THUMB_IMG_1.jpg`
//!
//! ## Titles, slugs and dates
//!
//! - Title: filename without extension (`2024-01-01_trip.jpg` → `2024-01-01_trip`)
//! - Slug: title made URL-safe (`2024-01-01-trip`), or a path hash when
//!   nothing in the title survives
//! - Date: a `YYYY-MM-DD_` title prefix, if present (`2024-01-01`)

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// The placeholder in derivative filename patterns.
pub const PLACEHOLDER: &str = "{}";

const MAX_SLUG_LEN: usize = 80;

/// Number of `{}` placeholders in a filename pattern.
pub fn placeholder_count(pattern: &str) -> usize {
    pattern.matches(PLACEHOLDER).count()
}

/// Substitute `filename` into a derivative filename pattern.
pub fn format_output_name(pattern: &str, filename: &str) -> String {
    pattern.replacen(PLACEHOLDER, filename, 1)
}

/// Split a forward-slash relative path into `(directory, filename)`.
///
/// The directory is empty for top-level files.
pub fn split_relative(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Relative path of a derivative, next to its source.
pub fn derivative_path(original_path: &str, pattern: &str) -> String {
    let (dir, filename) = split_relative(original_path);
    let name = format_output_name(pattern, filename);
    if dir.is_empty() {
        name
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Photo title: the filename with its extension removed.
pub fn title_from_path(original_path: &str) -> String {
    let (_, filename) = split_relative(original_path);
    match filename.rfind('.') {
        Some(pos) if pos > 0 => filename[..pos].to_string(),
        _ => filename.to_string(),
    }
}

/// Parse a `YYYY-MM-DD_rest` (or bare `YYYY-MM-DD`) title prefix.
pub fn date_prefix(title: &str) -> Option<NaiveDate> {
    let prefix = title.get(..10)?;
    match title.as_bytes().get(10) {
        None | Some(b'_') => NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok(),
        Some(_) => None,
    }
}

/// Fill a page location pattern such as `photo/{slug}.html`.
pub fn format_page_path(pattern: &str, slug: &str) -> String {
    pattern.replace("{slug}", slug)
}

/// File name of index page `page` (1-based).
///
/// Page 1 keeps the configured name; later pages insert the page number
/// before the extension: `gallery.html`, `gallery2.html`, `gallery3.html`.
pub fn paginated_name(save_as: &str, page: usize) -> String {
    if page <= 1 {
        return save_as.to_string();
    }
    let (dir, filename) = split_relative(save_as);
    let numbered = match filename.rfind('.') {
        Some(pos) => format!("{}{}{}", &filename[..pos], page, &filename[pos..]),
        None => format!("{}{}", filename, page),
    };
    if dir.is_empty() {
        numbered
    } else {
        format!("{}/{}", dir, numbered)
    }
}

/// Sanitize a title string for use in URLs and filenames.
///
/// - Replaces non-alphanumeric characters (except dashes) with dashes
/// - Keeps letters and digits from any script (`東京`, `москва`)
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
/// - Lowercases
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn sanitize_slug(title: &str) -> String {
    let mut collapsed = String::with_capacity(title.len());
    let mut prev_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            collapsed.extend(c.to_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            collapsed.push('-');
            prev_dash = true;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.chars().count() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    match cut.rfind('-') {
        Some(pos) if pos > 0 => cut[..pos].to_string(),
        _ => cut,
    }
}

/// Slug for a photo page.
///
/// Falls back to `photo-` plus a short hash of the source path when the
/// title has no letters or digits at all, so such photos still get distinct
/// pages.
pub fn photo_slug(title: &str, original_path: &str) -> String {
    let slug = sanitize_slug(title);
    if !slug.is_empty() {
        return slug;
    }
    let digest = format!("{:x}", Sha256::digest(original_path.as_bytes()));
    format!("photo-{}", &digest[..8])
}
