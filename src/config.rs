use crate::error::ChatError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inline API key; takes precedence over the environment
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Gemini model name
    pub model: String,

    /// Base URL of the generative language API
    pub base_url: String,

    pub temperature: Option<f32>,

    pub max_output_tokens: Option<u32>,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,

    /// MindMate home directory
    #[serde(skip)]
    pub home: PathBuf,

    /// File this configuration is read from and saved to
    #[serde(skip)]
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_output_tokens: None,
            log_level: "info".to_string(),
            home: default_home(),
            config_file: default_home().join("config.toml"),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mindmate")
}

impl Config {
    /// Default settings bound to `path`, or to `~/.mindmate/config.toml`.
    ///
    /// Nothing is read from disk.
    pub fn at(path: Option<&Path>) -> Self {
        let mut config = Config::default();
        if let Some(path) = path {
            config.bind(path);
        }
        config
    }

    fn bind(&mut self, path: &Path) {
        self.config_file = path.to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.home = parent.to_path_buf();
        }
    }

    /// Load configuration from `path`, or from `~/.mindmate/config.toml`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_home().join("config.toml"), false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        if explicit {
            config.bind(&config_path);
        }

        Ok(config)
    }

    /// Save configuration to the file it is bound to
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.config_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_file, content)
            .with_context(|| format!("Failed to write {}", self.config_file.display()))?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_file.clone()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Resolve the API key from the config file or the process environment.
    pub fn resolve_api_key(&self) -> Result<String, ChatError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::resolve_api_key`] with an injectable environment.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(&self.api_key_env).filter(|key| !key.trim().is_empty()))
            .map(|key| key.trim().to_string())
            .ok_or_else(|| {
                ChatError::configuration(format!(
                    "no API key found; set {} or api_key in {}",
                    self.api_key_env,
                    self.config_path().display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn inline_key_wins_over_environment() {
        let config = Config {
            api_key: Some("inline".to_string()),
            ..Config::default()
        };
        let key = config
            .resolve_api_key_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(key, "inline");
    }

    #[test]
    fn key_is_read_from_named_env_var() {
        let config = Config {
            api_key_env: "MINDMATE_TEST_KEY".to_string(),
            ..Config::default()
        };
        let key = config
            .resolve_api_key_with(|name| (name == "MINDMATE_TEST_KEY").then(|| " abc ".to_string()))
            .unwrap();
        assert_eq!(key, "abc");
    }

    #[test]
    fn missing_or_blank_key_fails_fast() {
        let config = Config::default();
        let err = config.resolve_api_key_with(|_| None).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(err.to_string().contains(DEFAULT_API_KEY_ENV));

        let err = config
            .resolve_api_key_with(|_| Some("   ".to_string()))
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn save_then_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            model: "gemini-1.5-flash".to_string(),
            temperature: Some(0.4),
            ..Config::at(Some(&dir.path().join("config.toml")))
        };
        config.save().unwrap();

        let loaded = Config::load(Some(&dir.path().join("config.toml"))).unwrap();
        assert_eq!(loaded.model, "gemini-1.5-flash");
        assert_eq!(loaded.temperature, Some(0.4));
        assert_eq!(loaded.home, dir.path());
        assert_eq!(loaded.api_key_env, DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"gemini-1.5-pro\"\n").unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.model, "gemini-1.5-pro");
        assert_eq!(loaded.base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.log_level, "info");
    }

    #[test]
    fn save_writes_the_named_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("my.toml");
        let config = Config::at(Some(&path));
        assert!(!path.exists());

        config.save().unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested").join("config.toml").exists());
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.config_path(), path);
        assert_eq!(loaded.log_dir(), dir.path().join("nested").join("logs"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
