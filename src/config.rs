use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

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

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Server URL (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// API key for authentication
    pub api_key: Option<String>,
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Returns true if the remote backend is usable (has both server_url and api_key)
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Use only the local database, even when a server is configured
    pub offline_mode: ConfigValue<bool>,
    /// Directory backup exports are written to
    pub backup_dir: ConfigValue<PathBuf>,
    /// Directory of cached item images
    pub image_dir: ConfigValue<PathBuf>,
    /// Low-stock alarm threshold
    pub minimum_stock: ConfigValue<f64>,
    /// Name recorded on orders
    pub cashier: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote backend configuration
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    offline_mode: Option<bool>,
    backup_dir: Option<PathBuf>,
    image_dir: Option<PathBuf>,
    minimum_stock: Option<f64>,
    cashier: Option<String>,
    remote: Option<RemoteConfig>,
}

/// Resolves relative paths against the config file's directory.
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path.parent().map(|p| p.join(&path)).unwrap_or(path)
    } else {
        path
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        let mut config = Self {
            database_path: ConfigValue::new(data_dir.join("shopdesk.db"), ConfigSource::Default),
            offline_mode: ConfigValue::new(false, ConfigSource::Default),
            backup_dir: ConfigValue::new(data_dir.join("backup"), ConfigSource::Default),
            image_dir: ConfigValue::new(data_dir.join("images"), ConfigSource::Default),
            minimum_stock: ConfigValue::new(5.0, ConfigSource::Default),
            cashier: ConfigValue::new("cashier".to_string(), ConfigSource::Default),
            config_file: None,
            remote: RemoteConfig::default(),
        };

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
            config.apply_file(&path, file);
            config.config_file = Some(path);
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path, file: ConfigFile) {
        if let Some(db_path) = file.database_path {
            self.database_path
                .set(resolve(path, db_path), ConfigSource::File);
        }
        if let Some(offline) = file.offline_mode {
            self.offline_mode.set(offline, ConfigSource::File);
        }
        if let Some(dir) = file.backup_dir {
            self.backup_dir.set(resolve(path, dir), ConfigSource::File);
        }
        if let Some(dir) = file.image_dir {
            self.image_dir.set(resolve(path, dir), ConfigSource::File);
        }
        if let Some(minimum) = file.minimum_stock {
            self.minimum_stock.set(minimum, ConfigSource::File);
        }
        if let Some(cashier) = file.cashier {
            self.cashier.set(cashier, ConfigSource::File);
        }
        if let Some(remote) = file.remote {
            self.remote = remote;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(db_path) = std::env::var("SHOPDESK_DATABASE_PATH") {
            self.database_path
                .set(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(offline) = std::env::var("SHOPDESK_OFFLINE") {
            let value = parse_bool(&offline)
                .ok_or_else(|| ConfigError::InvalidEnv("SHOPDESK_OFFLINE", offline.clone()))?;
            self.offline_mode.set(value, ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("SHOPDESK_BACKUP_DIR") {
            self.backup_dir
                .set(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(minimum) = std::env::var("SHOPDESK_MINIMUM_STOCK") {
            let value = minimum
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("SHOPDESK_MINIMUM_STOCK", minimum.clone()))?;
            self.minimum_stock.set(value, ConfigSource::Environment);
        }
        if let Ok(cashier) = std::env::var("SHOPDESK_CASHIER") {
            self.cashier.set(cashier, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("SHOPDESK_SERVER_URL") {
            self.remote.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("SHOPDESK_API_KEY") {
            self.remote.api_key = Some(key);
        }
        Ok(())
    }

    /// True when the services should talk to the server.
    pub fn use_remote(&self) -> bool {
        !self.offline_mode.value && self.remote.is_configured()
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/shopdesk/
    /// - macOS: ~/Library/Application Support/shopdesk/
    /// - Windows: %APPDATA%/shopdesk/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopdesk")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/shopdesk/
    /// - macOS: ~/Library/Application Support/shopdesk/
    /// - Windows: %APPDATA%/shopdesk/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopdesk")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
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
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("shopdesk.db"));
        assert_eq!(config.minimum_stock.value, 5.0);
        assert_eq!(config.minimum_stock.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
        assert_eq!(config.remote.timeout_secs, 10);
        assert!(!config.use_remote());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: data/shop.db").unwrap();
        writeln!(file, "minimum_stock: 3").unwrap();
        writeln!(file, "cashier: rina").unwrap();
        writeln!(file, "remote:").unwrap();
        writeln!(file, "  server_url: http://localhost:8080").unwrap();
        writeln!(file, "  api_key: secret").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/shop.db")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.minimum_stock.value, 3.0);
        assert_eq!(config.cashier.value, "rina");
        assert_eq!(config.config_file, Some(config_path));
        assert!(config.remote.is_configured());
        assert_eq!(config.remote.timeout_secs, 10);
    }

    #[test]
    fn test_offline_mode_disables_remote() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "offline_mode: true").unwrap();
        writeln!(file, "remote:").unwrap();
        writeln!(file, "  server_url: http://localhost:8080").unwrap();
        writeln!(file, "  api_key: secret").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.remote.is_configured());
        assert!(!config.use_remote());
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "backup_dir: /from/file").unwrap();

        std::env::set_var("SHOPDESK_BACKUP_DIR", "/from/env");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.backup_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.backup_dir.source, ConfigSource::Environment);

        std::env::remove_var("SHOPDESK_BACKUP_DIR");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
