mod http_fetcher;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mapbundle_export::{ExportRun, NullFetcher, pk3_files_in_directory};
use mapbundle_manifest::Manifest;
use tracing::Level;

use http_fetcher::HttpFetcher;

#[derive(Parser)]
#[command(
    name = "mapbundle",
    about = "Builds a server-ready map bundle from indexed Quake3-family pk3 archives",
    version,
    author
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full export pipeline from one or more manifest fragments
    Export {
        /// Manifest JSON fragment(s), applied in order
        #[arg(required = true)]
        manifest: Vec<PathBuf>,

        /// Output directory; `data/`, `data_new/`, `data_old/`, and `cache/`
        /// live underneath it
        #[arg(short, long)]
        output: PathBuf,

        /// Directory searched for archives/resources by hash before the
        /// cache or any resource URL (repeatable)
        #[arg(short = 'd', long = "local-dir")]
        local_dir: Vec<PathBuf>,

        /// `…{hash}…` URL template for the resource fetcher (repeatable,
        /// tried in order; the first to satisfy a hash is promoted to the
        /// front for later lookups)
        #[arg(short = 'u', long = "resource-url")]
        resource_url: Vec<String>,
    },

    /// List `{mod}/{file}.pk3` archives found under a directory
    Discover {
        /// Root directory to scan, one level of mod directories deep
        root: PathBuf,
    },
}

fn run_export(manifest_paths: &[PathBuf], output: PathBuf, local_dirs: Vec<PathBuf>, resource_urls: Vec<String>) -> anyhow::Result<()> {
    let mut manifest = Manifest::new();
    for path in manifest_paths {
        let data = std::fs::read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&data)?;
        manifest.import_manifest(&value);
    }

    let mut templates: Vec<String> = manifest.resource_urls.iter().cloned().collect();
    templates.extend(resource_urls);

    if templates.is_empty() {
        ExportRun::run(&manifest, output, &local_dirs, None::<NullFetcher>)?;
    } else {
        ExportRun::run(&manifest, output, &local_dirs, Some(HttpFetcher::new(templates)))?;
    }

    Ok(())
}

fn run_discover(root: &std::path::Path) -> anyhow::Result<()> {
    for found in pk3_files_in_directory(root)? {
        println!("{}/{}.pk3\t{}\t{}", found.mod_dir, found.filename, found.size, found.full_path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(Level::from(cli.log_level)).with_target(false).init();

    let result = match cli.command {
        Commands::Export { manifest, output, local_dir, resource_url } => run_export(&manifest, output, local_dir, resource_url),
        Commands::Discover { root } => run_discover(&root),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
