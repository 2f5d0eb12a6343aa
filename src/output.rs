//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each photo leads with its positional index and title. Paths, dates and
//! camera details follow as indented context lines, so the output reads as a
//! journal inventory while still tracing back to files.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Photos (2)
//! 001 2024-01-01_trip
//!     Source: photos/2024-01-01_trip.jpg
//!     Page: photo/2024-01-01-trip.html
//!     Date: 2024-01-01
//!     Camera: Canon EOS 5D
//!     Location: 48.85000, 2.35000
//! 002 IMG_0042
//!     Source: photos/IMG_0042.jpg
//!     Page: photo/img-0042.html
//!
//! Metadata: 1 cached, 1 read (2 total)
//! ```
//!
//! ## Build
//!
//! ```text
//! Processing 2 photos (1 up to date)
//!     001 2024-01-01_trip
//!         Source: photos/2024-01-01_trip.jpg
//!         generated: 2 files
//!     002 IMG_0042
//!         Source: photos/IMG_0042.jpg
//!         failed: Image decode failed: ...
//!
//! Derivatives: 1 generated, 1 up to date, 0 skipped, 1 failed
//! Originals: 2 copied
//! Pages: 4 written
//! Metadata: 3 read
//!
//! Failures
//!     photos/IMG_0042.jpg: Image decode failed: ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::config::GalleryConfig;
use crate::gallery::BuildReport;
use crate::photo::Photo;
use crate::process::{PhotoOutcome, ProcessEvent};
use crate::types::{Metadata, lookup};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `make model`, skipping whichever is missing. A model that already starts
/// with the make (`Canon` / `Canon EOS 5D`) is shown alone.
fn camera_line(metadata: &Metadata) -> Option<String> {
    let text = |key: &str| {
        lookup(metadata, key)
            .and_then(|v| v.as_text())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    match (text("make"), text("model")) {
        (Some(make), Some(model)) if model.starts_with(make) => Some(model.to_string()),
        (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Format the photo inventory built by the context pass.
pub fn format_scan_output(photos: &[Photo], cache: CacheStats) -> Vec<String> {
    let mut lines = vec![format!("Photos ({})", photos.len())];

    for (i, photo) in photos.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), photo.title));
        let ctx = indent(1);
        lines.push(format!("{}Source: {}", ctx, photo.original_path));
        lines.push(format!("{}Page: {}", ctx, photo.save_as));
        if let Some(date) = &photo.date {
            lines.push(format!("{}Date: {}", ctx, date));
        }
        if let Some(camera) = camera_line(&photo.metadata) {
            lines.push(format!("{}Camera: {}", ctx, camera));
        }
        if let Some((lat, lng)) = photo.coordinates() {
            lines.push(format!("{}Location: {:.5}, {:.5}", ctx, lat, lng));
        }
    }

    lines.push(String::new());
    lines.push(format!("Metadata: {}", cache));
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(photos: &[Photo], cache: CacheStats) {
    for line in format_scan_output(photos, cache) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of validating config and discovery without building.
pub fn format_check_output(
    config: &GalleryConfig,
    config_file: Option<&str>,
    discovered: &[String],
) -> Vec<String> {
    let mut lines = vec!["Config".to_string()];
    lines.push(format!(
        "{}{}",
        indent(1),
        config_file.unwrap_or("(stock defaults)")
    ));

    lines.push("Gallery paths".to_string());
    for path in &config.gallery_paths {
        lines.push(format!("{}{}", indent(1), path));
    }
    for path in &config.gallery_paths_exclude {
        lines.push(format!("{}{} (excluded)", indent(1), path));
    }

    lines.push("Outputs".to_string());
    for (name, spec) in &config.outputs {
        lines.push(format!(
            "{}{}: {}x{} q{} \u{2192} {}",
            indent(1),
            name,
            spec.size[0],
            spec.size[1],
            spec.quality,
            spec.filename
        ));
    }

    lines.push(format!("OK: {}", plural(discovered.len(), "photo", "photos")));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(config: &GalleryConfig, config_file: Option<&str>, discovered: &[String]) {
    for line in format_check_output(config, config_file, discovered) {
        println!("{}", line);
    }
}

// ============================================================================
// Build: progress
// ============================================================================

/// Format a single derivative progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            pending: 0,
            up_to_date,
        } => vec![format!(
            "All {} up to date",
            plural(*up_to_date, "photo", "photos")
        )],
        ProcessEvent::Started {
            pending,
            up_to_date,
        } => vec![format!(
            "Processing {} ({} up to date)",
            plural(*pending, "photo", "photos"),
            up_to_date
        )],
        ProcessEvent::PhotoDone {
            index,
            title,
            source_path,
            outcome,
        } => {
            let status = match outcome {
                PhotoOutcome::Generated(paths) => {
                    format!("generated: {}", plural(paths.len(), "file", "files"))
                }
                PhotoOutcome::Skipped(reason) => format!("skipped: {}", reason),
                PhotoOutcome::Failed(reason) => format!("failed: {}", reason),
            };
            vec![
                format!("{}{} {}", indent(1), format_index(*index), title),
                format!("{}Source: {}", indent(2), source_path),
                format!("{}{}", indent(2), status),
            ]
        }
    }
}

// ============================================================================
// Build: report
// ============================================================================

/// Format the end-of-build summary.
pub fn format_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Derivatives: {} generated, {} up to date, {} skipped, {} failed",
            report.generated, report.up_to_date, report.skipped, report.failed
        ),
        format!("Originals: {} copied", report.originals_copied),
        format!("Pages: {} written", report.pages),
        format!("Metadata: {}", report.cache),
    ];

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failures".to_string());
        for (path, reason) in &report.failures {
            lines.push(format!("{}{}: {}", indent(1), path, reason));
        }
    }
    lines
}

/// Print the build summary to stdout.
pub fn print_report(report: &BuildReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
