//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//!
//! The loaded [`Config`] is built once at startup and handed to each
//! component; nothing reads configuration from globals.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub visit: VisitConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Origin of the speaking-practice API
    #[serde(default = "default_api_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://speaking-app.onrender.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the admin token and device id
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("speaking-console").to_string_lossy().to_string())
        .unwrap_or_else(|| "./speaking_data".to_string())
}

/// Expand a leading `~` to the home directory; other paths pass through
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return path.to_string(),
    };

    match dirs::home_dir() {
        Some(home) => home
            .join(rest.trim_start_matches(['/', '\\']))
            .to_string_lossy()
            .to_string(),
        None => path.to_string(),
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Visit telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VisitConfig {
    /// User id attached to practice visits
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    crate::visit::ANONYMOUS_USER.to_string()
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
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
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        config.storage.data_dir = expand_home(&config.storage.data_dir);

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

    /// Standard config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("speaking-console").join("config.toml"));
        }
        paths.push(PathBuf::from("./config.toml"));
        paths
    }

    /// Load the first readable file among `paths`, falling back to the
    /// environment. Nothing is logged; the report says what happened.
    pub fn discover(paths: &[PathBuf]) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    report.source = Some(path.clone());
                    return (config, report);
                }
                Err(e) => report.skipped.push(e),
            }
        }

        (Self::from_env(), report)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let (config, report) = Self::discover(&Self::default_paths());
        report.log();
        config
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SPEAKING_API_URL") {
            self.api.url = url;
        }
        if let Ok(timeout) = std::env::var("SPEAKING_API_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.api.request_timeout_secs = t;
            }
        }

        if let Ok(data_dir) = std::env::var("SPEAKING_DATA_DIR") {
            self.storage.data_dir = expand_home(&data_dir);
        }

        if let Ok(user_id) = std::env::var("SPEAKING_USER_ID") {
            self.visit.user_id = user_id;
        }

        if let Ok(level) = std::env::var("SPEAKING_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SPEAKING_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Outcome of [`Config::discover`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// File the config came from; `None` means defaults plus environment
    pub source: Option<PathBuf>,
    /// Files that existed but could not be used
    pub skipped: Vec<ConfigError>,
}

impl LoadReport {
    pub fn log(&self) {
        for error in &self.skipped {
            tracing::warn!("Skipped config: {}", error);
        }
        match &self.source {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::debug!("Using default config with environment overrides"),
        }
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
    r#"# Speaking Console Configuration
#
# Environment variables override these settings:
# - SPEAKING_API_URL
# - SPEAKING_API_TIMEOUT_SECS
# - SPEAKING_DATA_DIR
# - SPEAKING_USER_ID
# - SPEAKING_LOG_LEVEL
# - SPEAKING_LOG_FORMAT

[api]
# Speaking-practice API origin
url = "https://speaking-app.onrender.com"

# Request timeout in seconds
request_timeout_secs = 30

[storage]
# Directory holding the admin token and device id
data_dir = "~/.local/share/speaking-console"

[visit]
# User id attached to practice visits
user_id = "anonymous"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.url, "https://speaking-app.onrender.com");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.visit.user_id, "anonymous");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.url, default_api_url());
        assert_eq!(config.visit.user_id, "anonymous");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nurl = \"http://localhost:8000\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.url, "http://localhost:8000");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_expand_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_home("~/.local/share/speaking-console"),
            home.join(".local/share/speaking-console").to_string_lossy()
        );
        assert_eq!(expand_home("~"), home.to_string_lossy());
        assert_eq!(expand_home("/var/lib/speaking"), "/var/lib/speaking");
        assert_eq!(expand_home("./data/~"), "./data/~");
        assert_eq!(expand_home("~other/data"), "~other/data");
    }

    #[test]
    fn test_generated_config_data_dir_is_absolute() {
        if dirs::home_dir().is_none() {
            return;
        }
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, generate_default_config()).unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.storage.data_dir.starts_with('~'));
        assert!(Path::new(&config.storage.data_dir).is_absolute());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("SPEAKING_USER_ID", "tester");
        std::env::set_var("SPEAKING_API_TIMEOUT_SECS", "not-a-number");
        let config = Config::from_env();
        std::env::remove_var("SPEAKING_USER_ID");
        std::env::remove_var("SPEAKING_API_TIMEOUT_SECS");

        assert_eq!(config.visit.user_id, "tester");
        // Unparseable numbers keep the default
        assert_eq!(config.api.request_timeout_secs, 30);
    }

    #[test]
    fn test_discover_skips_broken_file() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        let missing = dir.path().join("missing.toml");
        std::fs::write(&broken, "[api\nurl = ").unwrap();
        std::fs::write(&good, "[logging]\nformat = \"json\"\n").unwrap();

        let (config, report) = Config::discover(&[missing, broken, good.clone()]);
        assert_eq!(config.logging.format, "json");
        assert_eq!(report.source, Some(good));
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0], ConfigError::Parse { .. }));
    }

    #[test]
    fn test_discover_falls_back_to_env() {
        let dir = tempdir().unwrap();
        let (config, report) = Config::discover(&[dir.path().join("none.toml")]);
        assert!(report.source.is_none());
        assert!(report.skipped.is_empty());
        assert_eq!(config.api.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[api\nurl = ").unwrap();
        assert!(matches!(Config::load(&broken), Err(ConfigError::Parse { .. })));
    }
}
