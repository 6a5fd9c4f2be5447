mod cache;
mod config;
mod db;
mod error;
mod logging;
mod server;
mod upstream;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheLayer, SqliteStore};
use crate::upstream::{CachedClient, UpstreamClient};

#[derive(Parser, Debug)]
#[command(name = "city-explorer")]
#[command(about = "Caching proxy for location-keyed weather, events, reviews, movies and trails")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./city-explorer.yaml or $XDG_CONFIG_HOME/city-explorer/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Port to listen on (overrides config and PORT)
  #[arg(short, long)]
  port: Option<u16>,

  /// SQLite cache file
  #[arg(short, long)]
  database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_dir = config::data_dir().ok().map(|dir| dir.join("logs"));
  let _log_guard = logging::init(log_dir.as_deref())?;

  // Load configuration, command line wins
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(port) = args.port {
    config.server.port = port;
  }
  if let Some(database) = args.database {
    config.database.path = Some(database);
  }

  let missing = config.api_keys.missing();
  if !missing.is_empty() {
    warn!(?missing, "upstream credentials not set, those endpoints will fail");
  }

  let db_path = config.database_path()?;
  let pool = db::open(&db_path)?;
  info!(path = %db_path.display(), "cache database ready");

  let timeout = config.upstream.timeout();
  let fetcher = Arc::new(UpstreamClient::new(timeout)?);
  let cache = CacheLayer::new(SqliteStore::new(pool), fetcher).with_timeout(timeout);
  let client = CachedClient::new(cache, config.api_keys.clone(), config.freshness.clone());

  server::serve(&config.server, Arc::new(client)).await
}
