// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cratedigger_application::{ResolutionOutcome, ResolutionService};
use cratedigger_config::{load as load_config, AppConfig};
use cratedigger_domain::{Bitrate, RecordTypeFilter};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

const STARTUP_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "cratedigger", version, about = "Resolve music references into a deduplicated download queue")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 128, 320 or flac.
    #[arg(long, global = true)]
    bitrate: Option<Bitrate>,

    #[arg(long, global = true)]
    download_path: Option<PathBuf>,

    /// Discography filter: all, album, ep or single.
    #[arg(long, global = true)]
    record_type: Option<RecordTypeFilter>,

    /// Only releases after this date (YYYY-MM-DD, exclusive).
    #[arg(long, global = true)]
    after: Option<NaiveDate>,

    /// Only releases before this date (YYYY-MM-DD, exclusive).
    #[arg(long, global = true)]
    before: Option<NaiveDate>,

    /// Root of the local music library.
    #[arg(long, global = true)]
    collection: Option<PathBuf>,

    /// Skip albums already present in the collection.
    #[arg(long, global = true)]
    skip_owned: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve queries ("artist", "artist - album"), catalog IDs or links.
    Resolve {
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Resolve a file of "artist - album" lines in parallel.
    Batch { file: PathBuf },

    /// Queue every album referenced by a playlist.
    Playlist { url: String },

    /// Check whether the collection already has an album.
    Owned { artist: String, album: String },

    /// Show collection statistics.
    Stats,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bitrate) = self.bitrate {
            config.queue.bitrate = bitrate;
        }
        if let Some(path) = &self.download_path {
            config.queue.download_path = path.clone();
        }
        if let Some(record_type) = self.record_type {
            config.queue.record_type = record_type;
        }
        if self.after.is_some() {
            config.queue.release_from = self.after;
        }
        if self.before.is_some() {
            config.queue.release_to = self.before;
        }
        if let Some(root) = &self.collection {
            config.collection.root = Some(root.clone());
        }
        if self.skip_owned {
            config.collection.skip_owned = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = init_tracing();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    if let Some(handle) = filter {
        if let Err(e) = handle.reload(level_filter(&config.telemetry.log_level)) {
            warn!(target: "cli", error = %e, "could not apply configured log level");
        }
    }

    let service = ResolutionService::from_config(&config)?;

    match &cli.command {
        Command::Resolve { inputs } => {
            for input in inputs {
                let outcome = service.resolve_one(input).await;
                print_outcome(&outcome);
            }
        }
        Command::Batch { file } => {
            let contents = std::fs::read_to_string(file)
                .with_context(|| format!("reading batch file {}", file.display()))?;
            let lines: Vec<&str> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .collect();
            for outcome in service.resolve_batch(lines).await {
                print_outcome(&outcome);
            }
        }
        Command::Playlist { url } => {
            let outcome = service.queue_playlist(url, config.collection.skip_owned).await;
            print_outcome(&outcome);
        }
        Command::Owned { artist, album } => {
            let Some(index) = service.collection() else {
                bail!("no collection configured; pass --collection or set collection.root");
            };
            match index.find(artist, album) {
                Some(entry) => println!("owned: {} - {} ({})", entry.artist, entry.album, entry.path.display()),
                None => println!("not owned: {artist} - {album}"),
            }
            return Ok(());
        }
        Command::Stats => {
            let Some(index) = service.collection() else {
                bail!("no collection configured; pass --collection or set collection.root");
            };
            let stats = index.stats();
            println!("artists:       {}", stats.artists);
            println!("album entries: {}", stats.albums);
            println!("album folders: {}", stats.album_folders);
            for (genre, count) in &stats.genres {
                println!("  {genre}: {count}");
            }
            return Ok(());
        }
    }

    let queue = service.queue().list();
    info!(target: "cli", queued = queue.len(), duplicates = service.queue().duplicate_count(), "queue ready");
    println!();
    println!("Queue ({} items):", queue.len());
    for (position, item) in queue.iter().enumerate() {
        println!(
            "{:>4}. {} [{}] -> {}",
            position + 1,
            item.release,
            item.bitrate,
            item.download_path.display()
        );
    }

    Ok(())
}

fn print_outcome(outcome: &ResolutionOutcome) {
    if let Some(error) = &outcome.error {
        println!("✗ {}: {}", outcome.input, error);
        return;
    }

    println!(
        "✓ {}: {} queued, {} already queued, {} owned",
        outcome.input,
        outcome.queued.len(),
        outcome.duplicates,
        outcome.owned.len()
    );
    for failure in &outcome.partial_failures {
        warn!(target: "cli", input = %outcome.input, error = %failure, "partial failure");
        println!("    ! {failure}");
    }
}

/// Install the subscriber before configuration is read. `RUST_LOG` wins when
/// set; otherwise the returned handle swaps in the configured level later.
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let follows_config = from_env.is_none();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| level_filter(STARTUP_LOG_LEVEL)));
    let fmt_layer = fmt::layer().with_target(true).with_thread_names(true).with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    follows_config.then_some(handle)
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(STARTUP_LOG_LEVEL))
}
