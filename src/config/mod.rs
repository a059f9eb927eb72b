//! Configuration management
//!
//! This module handles loading and parsing configuration for the Newsroom admin service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Content API backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Image upload limits
    #[serde(default)]
    pub upload: UploadConfig,
    /// Staged image registry configuration
    #[serde(default)]
    pub staging: StagingConfig,
    /// Wizard session configuration
    #[serde(default)]
    pub wizard: WizardConfig,
    /// List view configuration
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the dashboard front end)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Content API backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend driver (graphql or memory)
    #[serde(default)]
    pub driver: BackendDriver,
    /// GraphQL endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token sent with every GraphQL request (optional)
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            driver: BackendDriver::default(),
            endpoint: default_endpoint(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_endpoint() -> String {
    "http://localhost:4000/graphql".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Backend driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// Remote GraphQL API (default)
    #[default]
    Graphql,
    /// In-process backend, for demos and local development
    Memory,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Staged image registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// How long an unconsumed staged image is kept, in seconds
    #[serde(default = "default_staging_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of staged images held at once
    #[serde(default = "default_staging_capacity")]
    pub max_capacity: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_staging_ttl(),
            max_capacity: default_staging_capacity(),
        }
    }
}

fn default_staging_ttl() -> u64 {
    6 * 3600
}

fn default_staging_capacity() -> u64 {
    1_000
}

/// Wizard session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Sessions untouched for this long are dropped, in seconds
    #[serde(default = "default_session_idle")]
    pub session_idle_seconds: u64,
    /// Storage key used when step 1 of a create flow carries no image
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            session_idle_seconds: default_session_idle(),
            placeholder_image: default_placeholder_image(),
        }
    }
}

fn default_session_idle() -> u64 {
    2 * 3600
}

fn default_placeholder_image() -> String {
    "placeholders/default.png".to_string()
}

/// List view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Delay before typed search text is committed, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// Delay used to batch URL projection writes, in milliseconds
    #[serde(default = "default_url_sync_delay_ms")]
    pub url_sync_delay_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            url_sync_delay_ms: default_url_sync_delay_ms(),
        }
    }
}

impl ListingConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn url_sync_delay(&self) -> Duration {
        Duration::from_millis(self.url_sync_delay_ms)
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_url_sync_delay_ms() -> u64 {
    50
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NEWSROOM_SERVER_HOST / NEWSROOM_SERVER_PORT / NEWSROOM_SERVER_CORS_ORIGIN
    /// - NEWSROOM_BACKEND_DRIVER / NEWSROOM_BACKEND_ENDPOINT / NEWSROOM_BACKEND_TOKEN
    /// - NEWSROOM_BACKEND_TIMEOUT_SECONDS
    /// - NEWSROOM_UPLOAD_MAX_FILE_SIZE
    /// - NEWSROOM_STAGING_TTL_SECONDS
    /// - NEWSROOM_WIZARD_PLACEHOLDER_IMAGE
    /// - NEWSROOM_LISTING_PAGE_SIZE / NEWSROOM_LISTING_SEARCH_DEBOUNCE_MS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NEWSROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed::<u16>("NEWSROOM_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("NEWSROOM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("NEWSROOM_BACKEND_DRIVER") {
            match driver.to_lowercase().as_str() {
                "graphql" => self.backend.driver = BackendDriver::Graphql,
                "memory" => self.backend.driver = BackendDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(endpoint) = std::env::var("NEWSROOM_BACKEND_ENDPOINT") {
            self.backend.endpoint = endpoint;
        }
        if let Ok(token) = std::env::var("NEWSROOM_BACKEND_TOKEN") {
            self.backend.token = Some(token);
        }
        if let Some(timeout) = env_parsed::<u64>("NEWSROOM_BACKEND_TIMEOUT_SECONDS") {
            self.backend.timeout_seconds = timeout;
        }

        if let Some(size) = env_parsed::<u64>("NEWSROOM_UPLOAD_MAX_FILE_SIZE") {
            self.upload.max_file_size = size;
        }
        if let Some(ttl) = env_parsed::<u64>("NEWSROOM_STAGING_TTL_SECONDS") {
            self.staging.ttl_seconds = ttl;
        }
        if let Ok(placeholder) = std::env::var("NEWSROOM_WIZARD_PLACEHOLDER_IMAGE") {
            self.wizard.placeholder_image = placeholder;
        }
        if let Some(page_size) = env_parsed::<u32>("NEWSROOM_LISTING_PAGE_SIZE") {
            self.listing.page_size = page_size;
        }
        if let Some(ms) = env_parsed::<u64>("NEWSROOM_LISTING_SEARCH_DEBOUNCE_MS") {
            self.listing.search_debounce_ms = ms;
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "NEWSROOM_SERVER_HOST",
    "NEWSROOM_SERVER_PORT",
    "NEWSROOM_SERVER_CORS_ORIGIN",
    "NEWSROOM_BACKEND_DRIVER",
    "NEWSROOM_BACKEND_ENDPOINT",
    "NEWSROOM_BACKEND_TOKEN",
    "NEWSROOM_BACKEND_TIMEOUT_SECONDS",
    "NEWSROOM_UPLOAD_MAX_FILE_SIZE",
    "NEWSROOM_STAGING_TTL_SECONDS",
    "NEWSROOM_WIZARD_PLACEHOLDER_IMAGE",
    "NEWSROOM_LISTING_PAGE_SIZE",
    "NEWSROOM_LISTING_SEARCH_DEBOUNCE_MS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.driver, BackendDriver::Graphql);
        assert_eq!(config.backend.endpoint, "http://localhost:4000/graphql");
        assert_eq!(config.backend.token, None);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.staging.ttl_seconds, 6 * 3600);
        assert_eq!(config.wizard.placeholder_image, "placeholders/default.png");
        assert_eq!(config.listing.search_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.listing.page_size, 20);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "backend:\n  driver: memory\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.backend.driver, BackendDriver::Memory);
        assert_eq!(config.backend.timeout_seconds, 30);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
backend:
  driver: graphql
  endpoint: "https://api.example.com/graphql"
  token: "secret"
  timeout_seconds: 5
upload:
  max_file_size: 2048
  allowed_types: ["image/png"]
staging:
  ttl_seconds: 60
  max_capacity: 10
wizard:
  session_idle_seconds: 120
  placeholder_image: "placeholders/news.png"
listing:
  page_size: 50
  search_debounce_ms: 500
  url_sync_delay_ms: 10
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend.endpoint, "https://api.example.com/graphql");
        assert_eq!(config.backend.token.as_deref(), Some("secret"));
        assert_eq!(config.backend.timeout(), Duration::from_secs(5));
        assert!(config.upload.is_type_allowed("image/png"));
        assert!(!config.upload.is_type_allowed("image/jpeg"));
        assert_eq!(config.staging.max_capacity, 10);
        assert_eq!(config.wizard.session_idle_seconds, 120);
        assert_eq!(config.wizard.placeholder_image, "placeholders/news.png");
        assert_eq!(config.listing.page_size, 50);
        assert_eq!(config.listing.url_sync_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_override_server_and_backend() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("NEWSROOM_SERVER_PORT", "4000");
        std::env::set_var("NEWSROOM_BACKEND_DRIVER", "MEMORY");
        std::env::set_var("NEWSROOM_BACKEND_TOKEN", "abc");

        let config = Config::load_with_env(file.path()).unwrap();
        clear_env();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.backend.driver, BackendDriver::Memory);
        assert_eq!(config.backend.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("NEWSROOM_SERVER_PORT", "not-a-port");
        std::env::set_var("NEWSROOM_BACKEND_DRIVER", "postgres");
        std::env::set_var("NEWSROOM_LISTING_PAGE_SIZE", "-3");

        let config = Config::load_with_env(std::path::Path::new("missing.yml")).unwrap();
        clear_env();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.driver, BackendDriver::Graphql);
        assert_eq!(config.listing.page_size, 20);
    }
}
