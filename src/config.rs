use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default timeout for a single remote call, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote snapshot store settings.
///
/// `backend` is one of `http`, `github` or `jsonbin`. Which of the other
/// fields matter depends on the backend:
///
/// ```yaml
/// remote:
///   backend: github
///   repository: someone/vehicle-data
///   path: dayledger.json
///   branch: main
///   token: ghp_xxx
///   auto_sync: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub backend: Option<String>,
    /// Base URL (http server, or an override of the GitHub/JSONBin API base)
    pub url: Option<String>,
    /// Write credential. Without it the remote is read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// GitHub `owner/repo`
    pub repository: Option<String>,
    /// File path inside the GitHub repository
    pub path: Option<String>,
    pub branch: Option<String>,
    /// JSONBin bin id
    pub bin_id: Option<String>,
    pub timeout_secs: u64,
    /// Sync before reads and after writes from the CLI (default: false)
    pub auto_sync: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: None,
            url: None,
            token: None,
            repository: None,
            path: None,
            branch: None,
            bin_id: None,
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            auto_sync: false,
        }
    }
}

impl RemoteConfig {
    /// Returns true if a backend is named at all.
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn has_credential(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading overrides through `env`.
    fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_db_path = Self::default_data_dir().join("dayledger.db");

        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Relative paths are relative to the config file
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
        }

        if let Some(db_path) = env("DAYLEDGER_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(backend) = env("DAYLEDGER_REMOTE_BACKEND") {
            remote.backend = Some(backend);
        }
        if let Some(url) = env("DAYLEDGER_REMOTE_URL") {
            remote.url = Some(url);
        }
        if let Some(token) = env("DAYLEDGER_REMOTE_TOKEN") {
            remote.token = Some(token);
        }

        Ok(Self {
            database_path,
            config_file,
            remote,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/dayledger/
    /// - macOS: ~/Library/Application Support/dayledger/
    /// - Windows: %APPDATA%/dayledger/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayledger")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/dayledger/
    /// - macOS: ~/Library/Application Support/dayledger/
    /// - Windows: %APPDATA%/dayledger/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayledger")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
