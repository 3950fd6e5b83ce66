//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub categorizer: CategorizerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Adaptive categorizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CategorizerConfig {
    /// Where the learned model is persisted
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Persist and re-estimate accuracy every N single-example training calls
    #[serde(default = "default_persist_every")]
    pub persist_every: u32,

    /// Write the model off the calling thread when a runtime is available
    #[serde(default = "default_background_persist")]
    pub background_persist: bool,
}

fn default_model_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("gigstats").join("model.json"))
        .unwrap_or_else(|| PathBuf::from("./gigstats_data/model.json"))
}

fn default_persist_every() -> u32 {
    5
}

fn default_background_persist() -> bool {
    true
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            persist_every: default_persist_every(),
            background_persist: default_background_persist(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        config.categorizer.model_path = expand_home(&config.categorizer.model_path);
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("gigstats").join("config.toml")),
            Some(PathBuf::from("./gigstats.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Categorizer overrides
        if let Some(path) = lookup("GIGSTATS_MODEL_PATH") {
            self.categorizer.model_path = expand_home(Path::new(&path));
        }
        if let Some(every) = lookup("GIGSTATS_PERSIST_EVERY") {
            match every.parse() {
                Ok(n) => self.categorizer.persist_every = n,
                Err(_) => tracing::warn!("Ignoring invalid GIGSTATS_PERSIST_EVERY={}", every),
            }
        }

        // Logging overrides
        if let Some(level) = lookup("GIGSTATS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("GIGSTATS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Resolve a leading `~` against the user's home directory
///
/// Paths without a leading `~` component, or with no known home directory,
/// are returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# gigstats Configuration
#
# Environment variables override these settings:
# - GIGSTATS_MODEL_PATH
# - GIGSTATS_PERSIST_EVERY
# - GIGSTATS_LOG_LEVEL
# - GIGSTATS_LOG_FORMAT

[categorizer]
# Where the learned categorization model is stored.
# Defaults to the platform data directory (e.g. ~/.local/share/gigstats/model.json);
# a leading ~ is expanded to the home directory.
# model_path = "~/gigstats/model.json"

# Save the model (and re-estimate accuracy) every N training calls
persist_every = 5

# Write the model in the background instead of on the calling thread
background_persist = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/gigstats/gigstats.log"
"#
    .to_string()
}
