mod cache;
mod config;
mod site;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::SqliteStorage;
use site::{FetchSource, HttpSource};
use worker::Worker;

#[derive(Parser, Debug)]
#[command(name = "pagestash")]
#[command(about = "An offline page cache for static content sites")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pagestash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Pre-cache the configured page list into the current store
  Install,
  /// Fetch a page through the cache and print its body
  Get {
    /// Absolute URL or a path relative to the site origin
    url: String,
  },
  /// Delete cache stores left over from previous versions
  Activate,
  /// List cache stores and entry counts
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let storage = SqliteStorage::open()?;
  let source = HttpSource::new()?;
  let worker = Worker::new(config.clone(), storage, source);

  match args.command {
    Command::Install => worker.install().await?,
    Command::Get { url } => {
      let url = config.resolve_url(&url)?;
      let fetched = worker.fetch(&url).await?;

      match fetched.source {
        FetchSource::Cache => info!(%url, "served from cache"),
        FetchSource::Network => info!(%url, status = fetched.page.status, "fetched from network"),
      }

      std::io::stdout().write_all(&fetched.page.body)?;
    }
    Command::Activate => worker.activate()?,
    Command::Status => {
      let statuses = worker.status()?;

      if statuses.is_empty() {
        println!("no cache stores");
      }
      for store in statuses {
        let marker = if store.current { "  (current)" } else { "" };
        println!("{}  {} pages{}", store.name, store.entries, marker);
      }
    }
  }

  Ok(())
}
