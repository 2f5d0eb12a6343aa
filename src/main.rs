use clap::{Parser, Subcommand};
use journal_gallery::cache::CacheManifest;
use journal_gallery::config::{self, CONFIG_FILE};
use journal_gallery::gallery::Gallery;
use journal_gallery::generate::{FsPageWriter, SiteContext};
use journal_gallery::imaging::RustBackend;
use journal_gallery::output;
use journal_gallery::scan::{FsPhotoSource, PhotoSource};
use std::path::{Path, PathBuf};

/// Shared flags for commands that build records.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the metadata cache and re-read EXIF from every photo
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "journal-gallery")]
#[command(about = "Photo gallery builder for a travel journal")]
#[command(long_about = "\
Photo gallery builder for a travel journal

Every JPEG under the gallery paths becomes a photo: its EXIF is remapped
into friendly metadata (camera, date, location), resized derivatives are
written next to its output location, and each photo gets a page.

Content structure:

  content/
  ├── config.toml                  # Gallery config (optional)
  └── photos/                      # gallery_paths = [\"photos\"]
      ├── 2024-01-01_trip.jpg      # Dated filename → page date
      └── 2024/
          └── IMG_0042.jpg

Output structure:

  output/
  ├── gallery.html                 # Paginated index
  ├── photo/2024-01-01-trip.html   # Photo page
  └── photos/
      ├── 2024-01-01_trip.jpg      # Original (copy_original)
      ├── ARTICLE_2024-01-01_trip.jpg
      └── THUMB_2024-01-01_trip.jpg

Derivatives that already exist are never rewritten; delete one to
regenerate it.

Run 'journal-gallery gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(
        long,
        env = "TRIPBASE_JOURNAL_CONTENT_PATH",
        default_value = "content",
        global = true
    )]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "output", global = true)]
    output: PathBuf,

    /// Google Maps API key for location maps on photo pages
    #[arg(long, env = "TRIPBASE_GOOGLE_MAPS_API_KEY", hide_env_values = true, global = true)]
    maps_api_key: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build everything: metadata, derivatives, pages
    Build(CacheArgs),
    /// Read photo metadata and list the gallery without writing images
    Scan(CacheArgs),
    /// Validate config and discovery without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Build(cache_args) => {
            let mut gallery = open_gallery(&cli, cache_args)?;

            println!("==> Reading {}", cli.source.display());
            gallery.generate_context()?;

            println!("==> Writing {}", cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let writer = FsPageWriter::new(&cli.output);
            let result = gallery.generate_output(&writer, Some(tx));
            if printer.join().is_err() {
                log::warn!("Progress printer panicked");
            }
            let report = result?;
            output::print_report(&report);

            if report.is_clean() {
                println!("==> Build complete: {}", cli.output.display());
            } else {
                println!(
                    "==> Build complete with {} problems: {}",
                    report.failures.len(),
                    cli.output.display()
                );
            }
        }
        Command::Scan(cache_args) => {
            let mut gallery = open_gallery(&cli, cache_args)?;
            gallery.generate_context()?;
            output::print_scan_output(gallery.photos(), gallery.cache_stats());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let config = config::load_config(&cli.source)?;
            let source = FsPhotoSource::new(&cli.source);
            let discovered =
                source.discover(&config.gallery_paths, &config.gallery_paths_exclude)?;
            let config_file = config_file_label(&cli.source);
            output::print_check_output(&config, config_file.as_deref(), &discovered);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

type FsGallery = Gallery<FsPhotoSource, CacheManifest, RustBackend>;

/// Load config and wire the production collaborators.
fn open_gallery(cli: &Cli, cache_args: &CacheArgs) -> Result<FsGallery, config::ConfigError> {
    let config = config::load_config(&cli.source)?;
    let cache = if cache_args.no_cache {
        CacheManifest::empty(&cli.output)
    } else {
        CacheManifest::load(&cli.output)
    };
    let site = SiteContext::new(&config, cli.maps_api_key.clone());
    Ok(Gallery::new(
        config,
        FsPhotoSource::new(&cli.source),
        cache,
        RustBackend::new(),
        &cli.output,
        site,
    ))
}

/// `info` by default, `debug` with `-v`; an explicit `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn config_file_label(source: &Path) -> Option<String> {
    let path = source.join(CONFIG_FILE);
    path.exists().then(|| path.display().to_string())
}
