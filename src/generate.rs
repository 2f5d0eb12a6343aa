//! HTML page generation.
//!
//! Stage 3 of the build. Renders one page per photo plus the paginated
//! gallery index, and hands each page to a [`PageWriter`].
//!
//! ## Generated Pages
//!
//! - **Photo pages** (`photo_save_as`, default `photo/{slug}.html`): article
//!   image, metadata table, optional map, previous/next links
//! - **Gallery index** (`gallery_save_as`, default `gallery.html`): thumbnail
//!   grid, `per_page` photos per page (`gallery.html`, `gallery2.html`, ...)
//!
//! ## Output Structure
//!
//! ```text
//! output/
//! ├── gallery.html                    # Index page 1
//! ├── gallery2.html                   # Index page 2
//! ├── photo/
//! │   └── 2024-01-01-trip.html        # Photo page
//! └── photos/
//!     ├── ARTICLE_2024-01-01_trip.jpg
//!     └── THUMB_2024-01-01_trip.jpg
//! ```
//!
//! All links are relative, so the site works from any mount point and
//! straight off the filesystem.
//!
//! ## Maps
//!
//! When a photo carries GPS coordinates and a maps API key is configured,
//! its page embeds a Google map centered on the location.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping.

use crate::config::GalleryConfig;
use crate::naming::paginated_name;
use crate::photo::Photo;
use crate::types::{MetaValue, Metadata};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for rendered pages.
pub trait PageWriter {
    /// Write `html` to `save_as`, a path relative to the output root.
    fn write_page(&self, save_as: &str, html: &str) -> Result<(), GenerateError>;
}

/// Writes pages under an output directory, creating parents as needed.
pub struct FsPageWriter {
    root: PathBuf,
}

impl FsPageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PageWriter for FsPageWriter {
    fn write_page(&self, save_as: &str, html: &str) -> Result<(), GenerateError> {
        let path = self.root.join(save_as);
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, html)
        };
        write(&path).map_err(|source| GenerateError::Write { path, source })
    }
}

/// Site-wide values every template reads.
#[derive(Debug, Clone, Default)]
pub struct SiteContext {
    pub site_name: String,
    /// Google Maps API key; maps are omitted without one.
    pub maps_api_key: Option<String>,
    /// Originals are copied to the output, so the photo links to its source.
    pub link_original: bool,
}

impl SiteContext {
    pub fn new(config: &GalleryConfig, maps_api_key: Option<String>) -> Self {
        Self {
            site_name: config.site_name.clone(),
            maps_api_key: maps_api_key.filter(|k| !k.trim().is_empty()),
            link_original: config.copy_original,
        }
    }
}

/// One page of the gallery index.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryPage<'a> {
    /// 1-based page number.
    pub number: usize,
    pub save_as: String,
    pub photos: &'a [Photo],
}

const CSS: &str = r#"
:root { --fg: #1a1a1a; --bg: #fafafa; --muted: #6b6b6b; --accent: #2f5d8a; }
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; color: var(--fg); background: var(--bg); }
a { color: var(--accent); text-decoration: none; }
.site-header { display: flex; justify-content: space-between; padding: 1rem 1.5rem; border-bottom: 1px solid #e5e5e5; }
main { max-width: 1100px; margin: 0 auto; padding: 1.5rem; }
.thumb-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 1rem; }
.thumb-grid img { width: 100%; aspect-ratio: 1; object-fit: cover; display: block; }
.thumb-grid figcaption { font-size: 0.85rem; color: var(--muted); padding-top: 0.25rem; }
.photo-frame img { max-width: 100%; height: auto; display: block; margin: 0 auto; }
.photo-meta { border-collapse: collapse; margin: 1rem 0; }
.photo-meta th { text-align: left; padding-right: 1rem; color: var(--muted); font-weight: normal; }
#map { width: 100%; height: 320px; margin: 1rem 0; }
.pager { display: flex; justify-content: space-between; margin-top: 1.5rem; }
"#;

const MAP_JS: &str = r#"
var point = {lat: 0, lng: 0};
function setPoint(latitude, longitude) {
  point.lat = latitude;
  point.lng = longitude;
}
function initMap() {
  var map = new google.maps.Map(document.getElementById('map'), {
    zoom: 14,
    center: point
  });
  new google.maps.Marker({ position: point, map: map });
}
"#;

/// Derivative shown on photo pages, falling back to any derivative.
const ARTICLE_OUTPUT: &str = "article_image";
/// Derivative shown in the index grid, falling back to any derivative.
const THUMBNAIL_OUTPUT: &str = "thumbnail_image";

/// Render and write every photo page and the gallery index.
///
/// Returns the `save_as` path of each page written, photo pages first.
pub fn generate_pages(
    photos: &[Photo],
    config: &GalleryConfig,
    site: &SiteContext,
    writer: &impl PageWriter,
) -> Result<Vec<String>, GenerateError> {
    let mut written = Vec::with_capacity(photos.len() + 1);

    let index_url = (!config.gallery_save_as.is_empty()).then_some(config.gallery_save_as.as_str());
    for (idx, photo) in photos.iter().enumerate() {
        let prev = idx.checked_sub(1).and_then(|i| photos.get(i));
        let next = photos.get(idx + 1);
        let page = render_photo_page(photo, prev, next, index_url, site);
        writer.write_page(&photo.save_as, &page.into_string())?;
        written.push(photo.save_as.clone());
    }
    log::debug!("Generated {} photo pages", photos.len());

    if config.gallery_save_as.is_empty() {
        log::debug!("gallery_save_as is empty, skipping index");
        return Ok(written);
    }

    let pages = gallery_pages(photos, config.per_page, &config.gallery_save_as);
    for (i, page) in pages.iter().enumerate() {
        let html = render_gallery_page(&pages, i, site);
        writer.write_page(&page.save_as, &html.into_string())?;
        written.push(page.save_as.clone());
    }
    log::debug!("Generated {} index pages", pages.len());

    Ok(written)
}

/// Split photos into index pages of `per_page`.
///
/// An empty gallery still has one (empty) first page.
pub fn gallery_pages<'a>(photos: &'a [Photo], per_page: usize, save_as: &str) -> Vec<GalleryPage<'a>> {
    if photos.is_empty() {
        return vec![GalleryPage {
            number: 1,
            save_as: save_as.to_string(),
            photos,
        }];
    }
    photos
        .chunks(per_page.max(1))
        .enumerate()
        .map(|(i, chunk)| GalleryPage {
            number: i + 1,
            save_as: paginated_name(save_as, i + 1),
            photos: chunk,
        })
        .collect()
}

/// Relative prefix from a page back to the output root.
///
/// ```
/// # use journal_gallery::generate::root_prefix;
/// assert_eq!(root_prefix("gallery.html"), "");
/// assert_eq!(root_prefix("photo/trip.html"), "../");
/// ```
pub fn root_prefix(save_as: &str) -> String {
    "../".repeat(save_as.matches('/').count())
}

fn preferred_derivative<'a>(photo: &'a Photo, name: &str) -> Option<&'a str> {
    photo
        .derivative(name)
        .or_else(|| photo.derivatives.values().next().map(String::as_str))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header with the site name linking to the index
fn site_header(site: &SiteContext, home: Option<&str>, prefix: &str) -> Markup {
    html! {
        header.site-header {
            @if let Some(home) = home {
                a.site-name href={ (prefix) (home) } { (site.site_name) }
            } @else {
                span.site-name { (site.site_name) }
            }
        }
    }
}

/// Flattens nested metadata into `(dotted key, value)` rows, skipping empties
fn metadata_rows(metadata: &Metadata) -> Vec<(String, String)> {
    fn walk(prefix: &str, metadata: &Metadata, rows: &mut Vec<(String, String)>) {
        for (key, value) in metadata {
            let key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                MetaValue::Group(inner) => walk(&key, inner, rows),
                v if v.is_empty() => {}
                v => rows.push((key, v.to_string())),
            }
        }
    }
    let mut rows = Vec::new();
    walk("", metadata, &mut rows);
    rows
}

fn render_map(lat: f64, lng: f64, api_key: &str) -> Markup {
    let maps_src = format!(
        "https://maps.googleapis.com/maps/api/js?key={}&callback=initMap",
        api_key
    );
    html! {
        div id="map" {}
        script { (PreEscaped(MAP_JS)) }
        script { (PreEscaped(format!("setPoint({}, {});", lat, lng))) }
        script async defer src=(maps_src) {}
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders a single photo page
pub fn render_photo_page(
    photo: &Photo,
    prev: Option<&Photo>,
    next: Option<&Photo>,
    index_url: Option<&str>,
    site: &SiteContext,
) -> Markup {
    let prefix = root_prefix(&photo.save_as);
    let image = preferred_derivative(photo, ARTICLE_OUTPUT);
    let rows = metadata_rows(&photo.metadata);
    let map = photo
        .coordinates()
        .zip(site.maps_api_key.as_deref())
        .map(|((lat, lng), key)| render_map(lat, lng, key));

    let content = html! {
        (site_header(site, index_url, &prefix))
        main.photo-page {
            h1 { (photo.title) }
            @if let Some(date) = &photo.date {
                time datetime=(date) { (date) }
            }
            figure.photo-frame {
                @if let Some(src) = image {
                    @if site.link_original {
                        a href={ (prefix) (photo.original_path) } {
                            img src={ (prefix) (src) } alt=(photo.title);
                        }
                    } @else {
                        img src={ (prefix) (src) } alt=(photo.title);
                    }
                }
            }
            @if !rows.is_empty() {
                table.photo-meta {
                    @for (key, value) in &rows {
                        tr {
                            th { (key) }
                            td { (value) }
                        }
                    }
                }
            }
            @if let Some(map) = map {
                (map)
            }
            nav.pager {
                @if let Some(prev) = prev {
                    a.prev rel="prev" href={ (prefix) (prev.url) } { "← " (prev.title) }
                } @else {
                    span {}
                }
                @if let Some(next) = next {
                    a.next rel="next" href={ (prefix) (next.url) } { (next.title) " →" }
                }
            }
        }
    };

    let page_title = format!("{} - {}", photo.title, site.site_name);
    base_document(&page_title, Some("photo-view"), content)
}

/// Renders page `index` (0-based) of the gallery index
pub fn render_gallery_page(pages: &[GalleryPage<'_>], index: usize, site: &SiteContext) -> Markup {
    let page = &pages[index];
    let prev = index.checked_sub(1).and_then(|i| pages.get(i));
    let next = pages.get(index + 1);
    let total_pages = pages.len();
    let prefix = root_prefix(&page.save_as);
    let home = pages.first().map(|p| p.save_as.as_str());

    let content = html! {
        (site_header(site, home, &prefix))
        main.gallery-page {
            div.thumb-grid {
                @for photo in page.photos {
                    figure {
                        a href={ (prefix) (photo.url) } {
                            @if let Some(src) = preferred_derivative(photo, THUMBNAIL_OUTPUT) {
                                img src={ (prefix) (src) } alt=(photo.title) loading="lazy";
                            }
                        }
                        figcaption { (photo.title) }
                    }
                }
            }
            @if total_pages > 1 {
                nav.pager {
                    @if let Some(prev) = prev {
                        a.prev rel="prev" href={ (prefix) (prev.save_as) } { "← Newer" }
                    } @else {
                        span {}
                    }
                    span.page-number { (page.number) " / " (total_pages) }
                    @if let Some(next) = next {
                        a.next rel="next" href={ (prefix) (next.save_as) } { "Older →" }
                    }
                }
            }
        }
    };

    let page_title = if page.number == 1 {
        site.site_name.clone()
    } else {
        format!("{} - page {}", site.site_name, page.number)
    };
    base_document(&page_title, Some("gallery-view"), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MemoryWriter;
    use tempfile::TempDir;

    fn photo(path: &str) -> Photo {
        Photo::new(path, Metadata::new(), &GalleryConfig::default())
    }

    fn located_photo() -> Photo {
        let mut location = Metadata::new();
        location.insert("latitude".into(), MetaValue::Float(48.85));
        location.insert("latitude_ref".into(), MetaValue::Text("N".into()));
        location.insert("longitude".into(), MetaValue::Float(2.35));
        location.insert("longitude_ref".into(), MetaValue::Text("E".into()));
        let mut meta = Metadata::new();
        meta.insert("make".into(), MetaValue::Text("Canon".into()));
        meta.insert("location".into(), MetaValue::Group(location));
        Photo::new("photos/2024-01-01_paris.jpg", meta, &GalleryConfig::default())
    }

    fn site(key: Option<&str>) -> SiteContext {
        SiteContext::new(&GalleryConfig::default(), key.map(String::from))
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[test]
    fn base_document_includes_doctype() {
        let doc = base_document("Test", None, html! { p { "body" } }).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Test</title>"));
    }

    #[test]
    fn base_document_applies_body_class() {
        let doc = base_document("T", Some("photo-view"), html! {}).into_string();
        assert!(doc.contains(r#"<body class="photo-view">"#));
    }

    #[test]
    fn root_prefix_counts_directories() {
        assert_eq!(root_prefix("gallery.html"), "");
        assert_eq!(root_prefix("photo/a.html"), "../");
        assert_eq!(root_prefix("a/b/c.html"), "../../");
    }

    #[test]
    fn metadata_rows_flatten_groups_and_skip_empty() {
        let mut meta = located_photo().metadata;
        meta.insert("timezone".into(), MetaValue::Empty);
        let rows = metadata_rows(&meta);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "location.latitude",
                "location.latitude_ref",
                "location.longitude",
                "location.longitude_ref",
                "make",
            ]
        );
    }

    #[test]
    fn site_context_ignores_blank_key() {
        assert_eq!(site(Some("  ")).maps_api_key, None);
        assert_eq!(site(Some("abc")).maps_api_key.as_deref(), Some("abc"));
    }

    // =========================================================================
    // Photo pages
    // =========================================================================

    #[test]
    fn photo_page_shows_article_image_relative_to_page() {
        let html = render_photo_page(&photo("photos/2024-01-01_trip.jpg"), None, None, Some("gallery.html"), &site(None))
            .into_string();
        assert!(html.contains(r#"src="../photos/ARTICLE_2024-01-01_trip.jpg""#));
        assert!(html.contains(r#"href="../photos/2024-01-01_trip.jpg""#));
        assert!(html.contains(r#"href="../gallery.html""#));
        assert!(html.contains("<time datetime=\"2024-01-01\">"));
    }

    #[test]
    fn photo_page_without_copied_original_has_no_original_link() {
        let config = GalleryConfig {
            copy_original: false,
            ..GalleryConfig::default()
        };
        let site = SiteContext::new(&config, None);
        let html = render_photo_page(&photo("photos/trip.jpg"), None, None, None, &site)
            .into_string();
        assert!(html.contains(r#"src="../photos/ARTICLE_trip.jpg""#));
        assert!(!html.contains(r#"href="../photos/trip.jpg""#));
    }

    #[test]
    fn photo_page_lists_metadata() {
        let html = render_photo_page(&located_photo(), None, None, None, &site(None)).into_string();
        assert!(html.contains("<th>make</th><td>Canon</td>"));
        assert!(html.contains("location.latitude"));
    }

    #[test]
    fn photo_page_embeds_map_with_key_and_location() {
        let html =
            render_photo_page(&located_photo(), None, None, None, &site(Some("KEY123"))).into_string();
        assert!(html.contains(r#"<div id="map">"#));
        assert!(html.contains("setPoint(48.85, 2.35);"));
        assert!(html.contains("key=KEY123&amp;callback=initMap"));
    }

    #[test]
    fn photo_page_omits_map_without_key() {
        let html = render_photo_page(&located_photo(), None, None, None, &site(None)).into_string();
        assert!(!html.contains("id=\"map\""));
    }

    #[test]
    fn photo_page_omits_map_without_location() {
        let html = render_photo_page(&photo("photos/a.jpg"), None, None, None, &site(Some("KEY")))
            .into_string();
        assert!(!html.contains("setPoint("));
    }

    #[test]
    fn photo_page_prev_next_links() {
        let a = photo("photos/a.jpg");
        let b = photo("photos/b.jpg");
        let c = photo("photos/c.jpg");
        let html = render_photo_page(&b, Some(&a), Some(&c), None, &site(None)).into_string();
        assert!(html.contains(r#"rel="prev" href="../photo/a.html""#));
        assert!(html.contains(r#"rel="next" href="../photo/c.html""#));
    }

    #[test]
    fn photo_page_falls_back_to_other_derivative() {
        let mut p = photo("photos/a.jpg");
        p.derivatives.remove("article_image");
        let html = render_photo_page(&p, None, None, None, &site(None)).into_string();
        assert!(html.contains("THUMB_a.jpg"));
    }

    #[test]
    fn html_escape_in_maud() {
        let p = photo("photos/<script>.jpg");
        let html = render_photo_page(&p, None, None, None, &site(None)).into_string();
        assert!(!html.contains("<h1><script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    // =========================================================================
    // Gallery index
    // =========================================================================

    #[test]
    fn gallery_pages_paginates() {
        let photos: Vec<Photo> = (0..20).map(|i| photo(&format!("photos/{:02}.jpg", i))).collect();
        let pages = gallery_pages(&photos, 9, "gallery.html");
        let names: Vec<&str> = pages.iter().map(|p| p.save_as.as_str()).collect();
        assert_eq!(names, vec!["gallery.html", "gallery2.html", "gallery3.html"]);
        assert_eq!(pages[0].photos.len(), 9);
        assert_eq!(pages[2].photos.len(), 2);
        assert_eq!(pages[2].number, 3);
    }

    #[test]
    fn gallery_pages_empty_gallery_has_one_page() {
        let pages = gallery_pages(&[], 9, "gallery.html");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].photos.is_empty());
    }

    #[test]
    fn gallery_page_links_thumbnails_to_photo_pages() {
        let photos = vec![photo("photos/2024-01-01_trip.jpg")];
        let pages = gallery_pages(&photos, 9, "gallery.html");
        let html = render_gallery_page(&pages, 0, &site(None)).into_string();
        assert!(html.contains(r#"href="photo/2024-01-01-trip.html""#));
        assert!(html.contains(r#"src="photos/THUMB_2024-01-01_trip.jpg""#));
        assert!(!html.contains("class=\"pager\""));
    }

    #[test]
    fn gallery_page_pager_between_pages() {
        let photos: Vec<Photo> = (0..3).map(|i| photo(&format!("photos/{}.jpg", i))).collect();
        let pages = gallery_pages(&photos, 1, "gallery.html");
        let html = render_gallery_page(&pages, 1, &site(None)).into_string();
        assert!(html.contains(r#"href="gallery.html""#));
        assert!(html.contains(r#"href="gallery3.html""#));
        assert!(html.contains("2 / 3"));
    }

    // =========================================================================
    // generate_pages
    // =========================================================================

    #[test]
    fn generate_pages_writes_photo_and_index_pages() {
        let photos = vec![photo("photos/a.jpg"), photo("photos/b.jpg")];
        let writer = MemoryWriter::default();
        let written =
            generate_pages(&photos, &GalleryConfig::default(), &site(None), &writer).unwrap();

        assert_eq!(written, vec!["photo/a.html", "photo/b.html", "gallery.html"]);
        assert_eq!(writer.names(), written);
        assert!(writer.page("photo/a.html").contains(r#"rel="next""#));
    }

    #[test]
    fn generate_pages_skips_index_when_save_as_empty() {
        let config = GalleryConfig {
            gallery_save_as: String::new(),
            ..GalleryConfig::default()
        };
        let writer = MemoryWriter::default();
        let written = generate_pages(&[photo("photos/a.jpg")], &config, &site(None), &writer).unwrap();
        assert_eq!(written, vec!["photo/a.html"]);
        assert!(!writer.page("photo/a.html").contains("gallery.html"));
    }

    #[test]
    fn fs_page_writer_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let writer = FsPageWriter::new(tmp.path());
        writer.write_page("photo/a.html", "<p>hi</p>").unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("photo/a.html")).unwrap(),
            "<p>hi</p>"
        );
    }

    #[test]
    fn fs_page_writer_reports_path_on_failure() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo"), b"").unwrap();
        let writer = FsPageWriter::new(tmp.path());
        let err = writer.write_page("photo/a.html", "x").unwrap_err();
        assert!(matches!(err, GenerateError::Write { .. }));
    }
}
