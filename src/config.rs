use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub database: DatabaseConfig,
  #[serde(default)]
  pub upstream: UpstreamConfig,
  #[serde(default)]
  pub freshness: FreshnessConfig,
  /// Upstream credentials, never read from the config file
  #[serde(skip)]
  pub api_keys: ApiKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
    }
  }
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  3000
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
  /// SQLite file path (defaults to $XDG_DATA_HOME/city-explorer/cache.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  /// Upper bound for a single upstream request
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
    }
  }
}

impl UpstreamConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

fn default_timeout_ms() -> u64 {
  10_000
}

/// Maximum age of cached rows per resource kind, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
  #[serde(default = "default_freshness_ms")]
  pub weather_ms: u64,
  #[serde(default = "default_freshness_ms")]
  pub events_ms: u64,
  #[serde(default = "default_freshness_ms")]
  pub yelp_ms: u64,
  #[serde(default = "default_freshness_ms")]
  pub movies_ms: u64,
  #[serde(default = "default_freshness_ms")]
  pub trails_ms: u64,
}

impl Default for FreshnessConfig {
  fn default() -> Self {
    Self {
      weather_ms: default_freshness_ms(),
      events_ms: default_freshness_ms(),
      yelp_ms: default_freshness_ms(),
      movies_ms: default_freshness_ms(),
      trails_ms: default_freshness_ms(),
    }
  }
}

fn default_freshness_ms() -> u64 {
  15_000
}

/// Credentials for the upstream APIs.
#[derive(Clone, Default)]
pub struct ApiKeys {
  pub geocode: Option<String>,
  pub weather: Option<String>,
  pub eventbrite: Option<String>,
  pub yelp: Option<String>,
  pub movie: Option<String>,
  pub trail: Option<String>,
}

// Keys stay out of logs.
impl std::fmt::Debug for ApiKeys {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.missing()).finish()
  }
}

impl ApiKeys {
  pub const GEOCODE: &'static str = "GEOCODE_API_KEY";
  pub const WEATHER: &'static str = "WEATHER_API_KEY";
  pub const EVENTBRITE: &'static str = "EVENTBRITE_API_KEY";
  pub const YELP: &'static str = "YELP_API_KEY";
  pub const MOVIE: &'static str = "MOVIE_API_KEY";
  pub const TRAIL: &'static str = "TRAIL_API_KEY";

  /// Read every credential from the environment. Empty values count as unset.
  pub fn from_env() -> Self {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    Self {
      geocode: var(Self::GEOCODE),
      weather: var(Self::WEATHER),
      eventbrite: var(Self::EVENTBRITE),
      yelp: var(Self::YELP),
      movie: var(Self::MOVIE),
      trail: var(Self::TRAIL),
    }
  }

  /// Names of the environment variables that were not set.
  pub fn missing(&self) -> Vec<&'static str> {
    [
      (Self::GEOCODE, &self.geocode),
      (Self::WEATHER, &self.weather),
      (Self::EVENTBRITE, &self.eventbrite),
      (Self::YELP, &self.yelp),
      (Self::MOVIE, &self.movie),
      (Self::TRAIL, &self.trail),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(name, _)| name)
    .collect()
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./city-explorer.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/city-explorer/config.yaml
  ///
  /// Without an explicit path, a missing file means defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(port) = std::env::var("PORT") {
      config.server.port = port
        .parse()
        .map_err(|e| eyre!("Invalid PORT value '{}': {}", port, e))?;
    }
    config.api_keys = ApiKeys::from_env();

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("city-explorer.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("city-explorer").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty document deserializes as unit, not as an empty map
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Where the SQLite cache lives.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.database.path {
      return Ok(path.clone());
    }
    Ok(data_dir()?.join("cache.db"))
  }
}

/// Per-application data directory.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("city-explorer"))
}
