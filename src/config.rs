use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default endpoint root, used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,

  /// Where the cache database lives (default: the platform data dir).
  pub cache_path: Option<PathBuf>,

  /// Log filter directive, e.g. "postfeed=debug" (default: "info").
  pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
  /// Endpoint root the posts are fetched from.
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./postfeed.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/postfeed/config.yaml
  ///
  /// With no file anywhere, built-in defaults apply.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("postfeed.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("postfeed").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Persist the configuration, to the explicit path when one was given,
  /// otherwise to the XDG config directory.
  pub fn save(&self, explicit_path: Option<&Path>) -> Result<()> {
    let path = match explicit_path {
      Some(p) => p.to_path_buf(),
      None => {
        let config_dir =
          dirs::config_dir().ok_or_else(|| eyre!("Could not determine config directory"))?;
        config_dir.join("postfeed").join("config.yaml")
      }
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_yaml::to_string(self)
      .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, contents)
      .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;

    Ok(())
  }

  /// Parsed endpoint root. An empty override falls back to the default.
  pub fn base_url(&self) -> Result<Url> {
    let raw = if self.api.base_url.trim().is_empty() {
      DEFAULT_BASE_URL
    } else {
      self.api.base_url.as_str()
    };

    Url::parse(raw).map_err(|e| eyre!("Invalid base URL {}: {}", raw, e))
  }

  /// Where the cache database lives.
  pub fn cache_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.cache_path {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("postfeed").join("cache.db"))
  }
}
