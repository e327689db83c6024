use clap::{Parser, Subcommand};
use snapstash::{config, organize, output, pipeline};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "snapstash")]
#[command(about = "Archive social media post images from a CSV export")]
#[command(long_about = "\
Archive social media post images from a CSV export

Feed it a CSV of posts and it downloads every image into a local stash,
re-encodes awkward formats, and writes a manifest tying each post to its
stored file.

Input columns (header names are case-insensitive, order is free):

  url          post/image address (required unless image_url is present)
  image_url    direct image address (wins over url)
  post_url     address of the post itself
  caption      free text, carried through to the manifest
  hashtags     separated by commas and/or whitespace
  event        label used by 'organize' to group images into folders

Output layout:

  stash/
  ├── manifest.csv             # one row per input row, input order
  └── images/
      ├── pic.jpg
      └── img_3f9ab2c01d.png   # URL carried no usable name

A row that fails to download or convert is recorded in the manifest
(status and error columns) and the run continues. The exit code is
nonzero only when the environment itself fails — unreadable input,
unwritable output.

Run 'snapstash gen-config' to generate a documented snapstash.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./snapstash.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct FetchArgs {
    /// Input CSV of posts
    #[arg(long, default_value = "posts.csv")]
    input: PathBuf,

    /// Output directory; images/ and manifest.csv land here
    #[arg(long, default_value = "stash")]
    output: PathBuf,

    /// Per-request timeout in seconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra attempts after a retryable failure (overrides config)
    #[arg(long)]
    retries: Option<u32>,

    /// Re-encode every image to this format: jpg, png, or webp
    /// (overrides config)
    #[arg(long)]
    force_format: Option<String>,
}

#[derive(clap::Args, Clone)]
struct OrganizeArgs {
    /// Manifest CSV from a stash run
    #[arg(long, default_value = "stash/manifest.csv")]
    manifest: PathBuf,

    /// Where bare image filenames are looked up
    /// (defaults to images/ next to the manifest)
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Directory to create event folders in
    #[arg(long, default_value = "events")]
    events_dir: PathBuf,

    /// Show the plan without copying anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Download every post's image and write the manifest
    Fetch(FetchArgs),
    /// Copy stashed images into per-event folders
    Organize(OrganizeArgs),
    /// Print a stock snapstash.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fetch(args) => {
            let mut config = load_config(&cli.config)?;
            apply_overrides(&mut config, &args)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_stash_event(&event);
                }
            });
            let summary = pipeline::run(&args.input, &args.output, &config, Some(tx))?;
            printer.join().unwrap();
            println!();
            output::print_run_summary(&summary);
        }
        Command::Organize(args) => {
            let images_dir = match &args.images_dir {
                Some(dir) => dir.clone(),
                None => args
                    .manifest
                    .parent()
                    .unwrap_or(Path::new("."))
                    .join(pipeline::IMAGES_DIRNAME),
            };
            let report =
                organize::organize(&args.manifest, &images_dir, &args.events_dir, args.dry_run)?;
            output::print_organize_report(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config from an explicit path, or from the working directory.
fn load_config(explicit: &Option<PathBuf>) -> Result<config::StashConfig, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Layer CLI flags over the loaded config, then re-validate.
fn apply_overrides(
    config: &mut config::StashConfig,
    args: &FetchArgs,
) -> Result<(), config::ConfigError> {
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(retries) = args.retries {
        config.fetch.max_retries = retries;
    }
    if let Some(force) = &args.force_format {
        config.normalize.force_format = force.clone();
    }
    config.validate()
}
