use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no API key configured; set CHAT_API_KEY or add it to the config file")]
    MissingApiKey,

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// API access configuration. File values are overridden by environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
        }
    }
}

impl Config {
    /// Load from the default location (`<config dir>/chat-cli/config.json`)
    /// and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(default_config_path().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str::<Config>(&content)?
            }
            _ => Config::default(),
        };

        if let Ok(api_key) = std::env::var("CHAT_API_KEY") {
            if !api_key.trim().is_empty() {
                config.api_key = Some(api_key);
            }
        }
        if let Ok(api_base) = std::env::var("CHAT_API_BASE") {
            if !api_base.trim().is_empty() {
                config.api_base = api_base;
            }
        }

        Ok(config)
    }

    /// The bearer token, or the configuration error raised before any network
    /// call is attempted.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".config").join("chat-cli").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Some(Path::new("/nonexistent/config.json"))).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_key": "sk-test", "api_base": "https://proxy.local/v1"}}"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.api_base, "https://proxy.local/v1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        assert!(matches!(
            Config::load_from(Some(file.path())),
            Err(ConfigError::Parse(_))
        ));
    }
}
