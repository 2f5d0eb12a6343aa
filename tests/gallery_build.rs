//! End-to-end builds over a real content tree with the pure-Rust backend.
//!
//! Fixtures are generated on the fly: small gradient JPEGs, optionally with
//! an EXIF block spliced in the same way derivatives get theirs.

use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use journal_gallery::cache::CacheManifest;
use journal_gallery::config::{GalleryConfig, load_config};
use journal_gallery::gallery::{BuildReport, Gallery};
use journal_gallery::generate::{FsPageWriter, SiteContext};
use journal_gallery::imaging::{ExifBlock, RustBackend};
use journal_gallery::scan::FsPhotoSource;
use journal_gallery::types::{MetaValue, lookup};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Fixtures
// =========================================================================

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(tag: Tag, text: &str) -> Field {
    field(tag, Value::Ascii(vec![text.as_bytes().to_vec()]))
}

fn degrees(d: u32, m: u32, s: u32) -> Value {
    Value::Rational(vec![
        Rational { num: d, denom: 1 },
        Rational { num: m, denom: 1 },
        Rational { num: s, denom: 1 },
    ])
}

fn camera_exif(orientation: u16) -> ExifBlock {
    ExifBlock::from_fields(
        vec![
            ascii(Tag::Make, "Canon"),
            ascii(Tag::Model, "Canon EOS R"),
            ascii(Tag::DateTime, "2024:01:01 09:30:00"),
            field(Tag::Orientation, Value::Short(vec![orientation])),
            ascii(Tag::GPSLatitudeRef, "S"),
            field(Tag::GPSLatitude, degrees(33, 54, 0)),
            ascii(Tag::GPSLongitudeRef, "E"),
            field(Tag::GPSLongitude, degrees(18, 25, 12)),
        ],
        false,
    )
}

/// Write a `width` x `height` JPEG with the left half red and the right
/// half blue, embedding `exif` when given.
fn write_photo(path: &Path, width: u32, height: u32, exif: Option<&ExifBlock>) {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([220, 20, 20])
        } else {
            Rgb([20, 20, 220])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .unwrap();

    if let Some(block) = exif {
        let mut jpeg = Jpeg::from_bytes(Bytes::from(bytes)).unwrap();
        jpeg.set_exif(Some(Bytes::from(block.to_tiff().unwrap())));
        bytes = jpeg.encoder().bytes().to_vec();
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

struct Site {
    tmp: TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn content(&self) -> std::path::PathBuf {
        self.tmp.path().join("content")
    }

    fn output(&self) -> std::path::PathBuf {
        self.tmp.path().join("output")
    }

    fn photo(&self, relative: &str, width: u32, height: u32, exif: Option<&ExifBlock>) {
        write_photo(&self.content().join(relative), width, height, exif);
    }

    fn build_with(&self, config: GalleryConfig) -> (BuildReport, Vec<journal_gallery::photo::Photo>) {
        let site = SiteContext::new(&config, Some("test-key".into()));
        let mut gallery = Gallery::new(
            config,
            FsPhotoSource::new(self.content()),
            CacheManifest::load(&self.output()),
            RustBackend::new(),
            self.output(),
            site,
        );
        let report = gallery
            .build(&FsPageWriter::new(self.output()), None)
            .unwrap();
        (report, gallery.photos().to_vec())
    }

    fn build(&self) -> (BuildReport, Vec<journal_gallery::photo::Photo>) {
        self.build_with(GalleryConfig::default())
    }
}

// =========================================================================
// Builds
// =========================================================================

#[test]
fn build_writes_derivatives_pages_and_original() {
    let site = Site::new();
    site.photo("photos/2024-01-01_trip.jpg", 64, 48, Some(&camera_exif(1)));

    let (report, photos) = site.build();
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.generated, 1);
    assert_eq!(report.originals_copied, 1);

    let out = site.output();
    assert_eq!(
        image::image_dimensions(out.join("photos/THUMB_2024-01-01_trip.jpg")).unwrap(),
        (512, 512)
    );
    assert_eq!(
        image::image_dimensions(out.join("photos/ARTICLE_2024-01-01_trip.jpg")).unwrap(),
        (1024, 1024)
    );
    assert!(out.join("photos/2024-01-01_trip.jpg").exists());
    assert!(out.join("gallery.html").exists());

    let page = fs::read_to_string(out.join("photo/2024-01-01-trip.html")).unwrap();
    assert!(page.contains("../photos/ARTICLE_2024-01-01_trip.jpg"));
    assert!(page.contains("setPoint(-33.9, 18.42);"));

    let meta = &photos[0].metadata;
    assert_eq!(meta["make"], MetaValue::Text("Canon".into()));
    assert_eq!(meta["date"], MetaValue::Text("2024-01-01 09:30:00".into()));
    assert_eq!(
        lookup(meta, "location.latitude_ref"),
        Some(&MetaValue::Text("S".into()))
    );
    assert_eq!(meta["timezone"], MetaValue::Empty);
}

#[test]
fn photo_without_exif_has_empty_metadata() {
    let site = Site::new();
    site.photo("photos/plain.jpg", 32, 32, None);

    let (report, photos) = site.build();
    assert!(photos[0].metadata.is_empty());
    assert_eq!(report.generated, 1);
    assert!(site.output().join("photos/THUMB_plain.jpg").exists());
}

#[test]
fn rerun_leaves_existing_derivatives_untouched() {
    let site = Site::new();
    site.photo("photos/a.jpg", 40, 30, None);
    site.photo("photos/b.jpg", 40, 30, None);
    site.build();

    let thumb = site.output().join("photos/THUMB_a.jpg");
    fs::write(&thumb, b"marker").unwrap();
    fs::remove_file(site.output().join("photos/ARTICLE_b.jpg")).unwrap();

    let (report, _) = site.build();
    assert_eq!(report.up_to_date, 1);
    assert_eq!(report.generated, 1);
    assert_eq!(report.cache.hits, 2);
    assert_eq!(fs::read(&thumb).unwrap(), b"marker");
    assert!(site.output().join("photos/ARTICLE_b.jpg").exists());
}

#[test]
fn corrupt_photo_fails_alone() {
    let site = Site::new();
    site.photo("photos/good.jpg", 32, 32, None);
    fs::write(site.content().join("photos/broken.jpg"), b"not a jpeg").unwrap();

    let (report, photos) = site.build();
    assert_eq!(photos.len(), 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.generated, 1);
    assert_eq!(report.failures[0].0, "photos/broken.jpg");
    assert!(site.output().join("photos/THUMB_good.jpg").exists());
    assert!(site.output().join("photo/broken.html").exists());
}

#[test]
fn derivatives_are_rotated_upright_and_keep_exif() {
    let site = Site::new();
    // Landscape pixels tagged "rotate 90 CW to display".
    site.photo("photos/rotated.jpg", 64, 32, Some(&camera_exif(6)));

    let config = GalleryConfig {
        outputs: [(
            "tall".to_string(),
            journal_gallery::config::OutputSpec {
                size: [32, 64],
                quality: 90,
                filename: "TALL_{}".to_string(),
            },
        )]
        .into_iter()
        .collect(),
        ..GalleryConfig::default()
    };
    let (report, _) = site.build_with(config);
    assert!(report.is_clean(), "{:?}", report.failures);

    let derived = site.output().join("photos/TALL_rotated.jpg");
    let img = image::open(&derived).unwrap().to_rgb8();
    // After rotating, the red half is on top.
    let top = img.get_pixel(16, 8);
    let bottom = img.get_pixel(16, 56);
    assert!(top[0] > top[2], "top should be red: {:?}", top);
    assert!(bottom[2] > bottom[0], "bottom should be blue: {:?}", bottom);

    let exif = ExifBlock::read_from_path(&derived).unwrap();
    assert_eq!(exif.orientation(), None);
    assert!(exif.fields().iter().any(|f| f.tag == Tag::Model));
}

#[test]
fn config_file_controls_outputs_and_paths() {
    let site = Site::new();
    site.photo("journal/x.jpg", 32, 32, None);
    site.photo("journal/drafts/y.jpg", 32, 32, None);
    fs::write(
        site.content().join("config.toml"),
        r#"
gallery_paths = ["journal"]
gallery_paths_exclude = ["journal/drafts"]
copy_original = false
gallery_save_as = ""

[outputs.small]
size = [16, 16]
filename = "S_{}"
"#,
    )
    .unwrap();

    let config = load_config(&site.content()).unwrap();
    let (report, photos) = site.build_with(config);

    assert_eq!(photos.len(), 1);
    assert_eq!(report.originals_copied, 0);
    assert_eq!(report.pages, 1);
    let out = site.output();
    assert_eq!(
        image::image_dimensions(out.join("journal/S_x.jpg")).unwrap(),
        (16, 16)
    );
    assert!(!out.join("journal/THUMB_x.jpg").exists());
    assert!(!out.join("journal/x.jpg").exists());
    assert!(!out.join("gallery.html").exists());
}

#[test]
fn bare_output_pattern_rejected_while_copying_originals() {
    let site = Site::new();
    site.photo("photos/a.jpg", 200, 100, None);
    fs::write(
        site.content().join("config.toml"),
        "[outputs.web]\nsize = [16, 16]\nfilename = \"{}\"\n",
    )
    .unwrap();
    assert!(load_config(&site.content()).is_err());

    fs::write(
        site.content().join("config.toml"),
        "copy_original = false\n\n[outputs.web]\nsize = [16, 16]\nfilename = \"{}\"\n",
    )
    .unwrap();
    let (report, _) = site.build_with(load_config(&site.content()).unwrap());
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(
        image::image_dimensions(site.output().join("photos/a.jpg")).unwrap(),
        (16, 16)
    );
}
