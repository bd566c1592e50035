use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::search::MAX_SUGGESTIONS;

pub const DEFAULT_PORT: u16 = 3210;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub port: Option<u16>,
  /// JSON dataset the server loads on start and saves registrations to.
  pub data_file: Option<PathBuf>,
  pub quota: Option<usize>,
  #[serde(default)]
  pub sort_by_distance: bool,
  #[serde(default)]
  pub include_distance: bool,
}

impl Config {
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::default();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  #[must_use]
  pub fn port(&self) -> u16 {
    self.port.unwrap_or(DEFAULT_PORT)
  }

  #[must_use]
  pub fn quota(&self) -> usize {
    self.quota.unwrap_or(MAX_SUGGESTIONS)
  }

  fn from_env() -> Self {
    let config_path = std::env::var("VOUALI_CONFIG").ok().map(PathBuf::from);
    let port = std::env::var("VOUALI_PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().inspect_err(|e| error!("Invalid VOUALI_PORT: {e}")).ok());
    let data_file = std::env::var("VOUALI_DATA").ok().map(PathBuf::from);
    let quota = std::env::var("VOUALI_QUOTA")
      .ok()
      .and_then(|q| q.parse::<usize>().inspect_err(|e| error!("Invalid VOUALI_QUOTA: {e}")).ok());

    Self {
      config_path,
      port,
      data_file,
      quota,
      sort_by_distance: false,
      include_distance: false,
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.port = self.port.or(other.port);
    self.data_file = self.data_file.or(other.data_file.clone());
    self.quota = self.quota.or(other.quota);
    // Settings are switched on by whichever source enables them.
    self.sort_by_distance |= other.sort_by_distance;
    self.include_distance |= other.include_distance;
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("VOUALI_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("vouali")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()?
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else {
      return;
    };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }

    let path = path.join("config.json");
    if !path.exists() {
      match serde_json::to_string_pretty(self) {
        Ok(config) => {
          let _ = std::fs::write(path, config).inspect_err(|e| {
            error!("Failed to write config file: {e}");
          });
        }
        Err(e) => error!("Failed to serialize config: {e}"),
      }
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    let config_path = home_dir().map(|p| p.join(".config").join("vouali"));
    let data_file = config_path.as_ref().map(|p| p.join("data.json"));
    Self {
      config_path,
      port: Some(DEFAULT_PORT),
      data_file,
      quota: Some(MAX_SUGGESTIONS),
      sort_by_distance: false,
      include_distance: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn empty() -> Config {
    Config {
      config_path: None,
      port: None,
      data_file: None,
      quota: None,
      sort_by_distance: false,
      include_distance: false,
    }
  }

  #[test]
  fn earlier_sources_win() {
    let env = Config {
      port: Some(8080),
      ..empty()
    };
    let file = Config {
      port: Some(9000),
      quota: Some(4),
      sort_by_distance: true,
      ..empty()
    };

    let merged = env.merge(&file).merge(&Config::default());
    assert_eq!(merged.port(), 8080);
    assert_eq!(merged.quota(), 4);
    assert!(merged.sort_by_distance);
    assert!(!merged.include_distance);
    assert_eq!(merged.data_file, Config::default().data_file);
  }

  #[test]
  fn fallbacks() {
    let config = empty();
    assert_eq!(config.port(), DEFAULT_PORT);
    assert_eq!(config.quota(), MAX_SUGGESTIONS);
  }

  #[test]
  fn file_settings_are_optional() {
    let config: Config = serde_json::from_str(r#"{"port": 1234}"#).unwrap();
    assert_eq!(config.port, Some(1234));
    assert!(config.data_file.is_none());
    assert!(!config.sort_by_distance);
  }
}
