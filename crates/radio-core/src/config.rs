use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use super::platform;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Command line of the external player.  It must accept `clear`, `add <url>`,
/// `play` and `stop` lines on stdin (VLC's `rc` interface does).
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_program")]
    pub program: String,
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationsConfig {
    /// Local TOML station file.  The built-in list is used when it's missing.
    /// Defaults to `~/.config/tunein/stations.toml`.
    #[serde(default = "default_stations_toml")]
    pub stations_toml: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: default_player_program(),
            args: default_player_args(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            stations_toml: default_stations_toml(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_player_program() -> String {
    platform::player_binary_name().to_string()
}

fn default_player_args() -> Vec<String> {
    vec!["-I".to_string(), "rc".to_string()]
}

fn default_stations_toml() -> PathBuf {
    platform::config_dir().join("stations.toml")
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("tunein.log")
}

fn default_log_filter() -> String {
    "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string()
}

impl Config {
    /// Read `config.toml` if there is one.  Nothing is written back.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
