mod api;
mod app;
mod config;
mod error;
mod feed;
mod posts;
mod repo;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "postfeed")]
#[command(about = "An offline-first terminal client for browsing posts")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/postfeed/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the endpoint root for this invocation
  #[arg(short, long)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show posts, fetching them first if nothing is cached
  List,
  /// Fetch the latest posts and show the outcome
  Refresh,
  /// Empty the local cache
  ClearCache,
  /// Validate and persist a new endpoint root
  SetUrl { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;

  // Override the endpoint if specified on the command line
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let _log_guard = init_logging(&config)?;

  match args.command.unwrap_or(Command::List) {
    Command::List => app::list(&config).await,
    Command::Refresh => app::refresh(&config).await,
    Command::ClearCache => app::clear_cache(&config),
    Command::SetUrl { url } => app::set_url(&mut config, &url, args.config.as_deref()),
  }
}

/// Send logs to a file next to the cache database; the terminal stays
/// reserved for rendered output.
fn init_logging(config: &config::Config) -> Result<WorkerGuard> {
  let log_dir = config
    .cache_path()?
    .parent()
    .map(PathBuf::from)
    .ok_or_else(|| eyre!("Could not determine log directory"))?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "postfeed.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_deref().unwrap_or("info")));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
