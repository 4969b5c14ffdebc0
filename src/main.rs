use anyhow::{Context, Result};
use bitmask::fs::WalkFileSystem;
use bitmask::index::{RepoIndex, load_or_build};
use bitmask::output::{ColorPrinter, HitPrinter, PlainPrinter};
use bitmask::utils::AppConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "BITMASK_LOG";

#[derive(Parser)]
#[command(name = "bitmask")]
#[command(about = "Substring search over per-file trigram filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the one in the app data directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and write its cache
    Index {
        /// Directory to index
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Cache file (defaults to one per directory in the app data dir)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Rebuild even if a valid cache exists
        #[arg(short, long)]
        force: bool,
    },
    /// Print every line containing QUERY
    Grep {
        /// Literal, case-sensitive text to find
        query: String,

        /// Directory to search
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        #[arg(long)]
        cache: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ColorWhen::Auto)]
        color: ColorWhen,

        /// Blobs tested per query worker
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Show index statistics
    Stats {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long)]
        cache: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorWhen {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bitmask: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let app = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    // Progress bars only when someone is watching
    let silent = !io::stderr().is_terminal();

    match cli.command {
        Commands::Index { path, cache, force } => {
            let fs = WalkFileSystem::new(&path, &app.index)?;
            let cache_path = resolve_cache_path(&app, cache, fs.root())?;

            let index = if force {
                let index = RepoIndex::build_with_progress(&fs, &app.index, silent)?;
                index.serialize_to_file(&cache_path)?;
                index
            } else {
                load_or_build(&fs, &cache_path, &app.index, silent)?
            };

            let stats = index.stats();
            println!(
                "Indexed {} files ({} filtered, {} skipped) into {}",
                stats.blobs,
                stats.filtered,
                stats.skipped,
                cache_path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Grep {
            query,
            path,
            cache,
            color,
            batch_size,
        } => {
            let mut config = app.index.clone();
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }

            let fs = WalkFileSystem::new(&path, &config)?;
            let cache_path = resolve_cache_path(&app, cache, fs.root())?;
            let index = load_or_build(&fs, &cache_path, &config, silent)?;

            let mut printer = make_printer(color);
            let summary = index
                .grep(&fs, query.as_bytes(), printer.as_mut())
                .context("Failed to write results")?;

            tracing::info!(
                candidates = summary.candidates,
                hits = summary.hits,
                false_positives = summary.false_positives,
                "grep finished"
            );

            Ok(if summary.hits > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Stats { path, cache, json } => {
            let fs = WalkFileSystem::new(&path, &app.index)?;
            let cache_path = resolve_cache_path(&app, cache, fs.root())?;
            let index = load_or_build(&fs, &cache_path, &app.index, silent)?;
            let stats = index.stats();

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let cache_size = std::fs::metadata(&cache_path).map(|m| m.len()).unwrap_or(0);
                println!("Index: {}", fs.root().display());
                println!("  Cache: {} ({:.1} KB)", cache_path.display(), cache_size as f64 / 1024.0);
                println!("  Files: {}", stats.blobs);
                println!("  With filter: {}", stats.filtered);
                println!("  Skipped (binary/oversized): {}", stats.skipped);
                println!("  Filter memory: {:.1} KB", stats.filter_bytes as f64 / 1024.0);
                println!("  Query workers: {}", index.batch_count());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_cache_path(app: &AppConfig, explicit: Option<PathBuf>, root: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => app.cache_path_for(root),
    }
}

fn make_printer(color: ColorWhen) -> Box<dyn HitPrinter> {
    let choice = match color {
        ColorWhen::Always => ColorChoice::Always,
        ColorWhen::Auto if io::stdout().is_terminal() => ColorChoice::Auto,
        ColorWhen::Auto | ColorWhen::Never => ColorChoice::Never,
    };

    match choice {
        ColorChoice::Never => Box::new(PlainPrinter::new(BufWriter::new(io::stdout().lock()))),
        choice => Box::new(ColorPrinter::new(StandardStream::stdout(choice))),
    }
}
