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
    pub portal: PortalConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub constants: PortalConstants,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Router settings
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Path prefix every route lives under
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// Route used when the location names no registered route
    #[serde(default = "default_route")]
    pub default_route: String,

    /// Where the browser goes after signing out
    #[serde(default = "default_logout_url")]
    pub logout_url: String,
}

fn default_route_prefix() -> String {
    "/portal/".to_string()
}

fn default_route() -> String {
    "organizations".to_string()
}

fn default_logout_url() -> String {
    "/accounts/logout".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            route_prefix: default_route_prefix(),
            default_route: default_route(),
            logout_url: default_logout_url(),
        }
    }
}

/// REST API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Scheme and authority of the backend (e.g. "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path every resource path is appended to
    #[serde(default = "default_api_path")]
    pub api_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_path() -> String {
    "/api/v1/".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_path: default_api_path(),
        }
    }
}

impl ApiConfig {
    /// Full URL prefix for resource paths, always ending in '/'
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.api_path.trim_matches('/');
        if path.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, path)
        }
    }
}

/// A value/label pair offered by a select field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Server-side constants the views depend on
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConstants {
    /// `partOf` value that marks a top-level organization
    #[serde(default)]
    pub organization_top_level_part_of_id: i64,

    #[serde(default = "default_top_level_label")]
    pub organization_top_level_part_of_label: String,

    #[serde(default = "default_organization_types")]
    pub organization_types: Vec<Choice>,

    #[serde(default = "default_data_source_types")]
    pub data_source_types: Vec<Choice>,

    /// Public URL of the site, substituted into the debug view
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

fn default_top_level_label() -> String {
    "None (Top Level Organization)".to_string()
}

fn default_organization_types() -> Vec<Choice> {
    vec![
        Choice::new("root", "ROOT"),
        Choice::new("prov", "Healthcare Provider"),
        Choice::new("dept", "Hospital Department"),
        Choice::new("team", "Organizational team"),
        Choice::new("govt", "Government"),
        Choice::new("ins", "Insurance Company"),
        Choice::new("pay", "Payer"),
        Choice::new("edu", "Educational Institute"),
        Choice::new("reli", "Religious Institution"),
        Choice::new("crs", "Clinical Research Sponsor"),
        Choice::new("cg", "Community Group"),
        Choice::new("bus", "Non-Healthcare Business or Corporation"),
        Choice::new("other", "Other"),
        Choice::new("laboratory", "Laboratory"),
        Choice::new("imaging", "Imaging Center"),
        Choice::new("pharmacy", "Pharmacy"),
        Choice::new("other_clinical", "Other Clinical Facility"),
        Choice::new("other_research", "Other Research Facility"),
    ]
}

fn default_data_source_types() -> Vec<Choice> {
    vec![Choice::new("personal_device", "Personal Device")]
}

fn default_site_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for PortalConstants {
    fn default() -> Self {
        Self {
            organization_top_level_part_of_id: 0,
            organization_top_level_part_of_label: default_top_level_label(),
            organization_types: default_organization_types(),
            data_source_types: default_data_source_types(),
            site_url: default_site_url(),
        }
    }
}

/// Credentials for the headless session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Bearer token sent with every request
    pub access_token: Option<String>,

    /// Subject claim of the token (the user id)
    pub subject: Option<String>,
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

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
            dirs::config_dir().map(|p| p.join("portal").join("config.toml")),
            Some(PathBuf::from("/etc/portal/config.toml")),
            Some(PathBuf::from("./config.toml")),
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

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PORTAL_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("PORTAL_API_PATH") {
            self.api.api_path = path;
        }

        if let Ok(token) = std::env::var("PORTAL_ACCESS_TOKEN") {
            self.session.access_token = Some(token);
        }
        if let Ok(subject) = std::env::var("PORTAL_SUBJECT") {
            self.session.subject = Some(subject);
        }

        if let Ok(level) = std::env::var("PORTAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PORTAL_LOG_FORMAT") {
            self.logging.format = format;
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
    r#"# Portal Configuration
#
# Environment variables override these settings:
# - PORTAL_BASE_URL
# - PORTAL_API_PATH
# - PORTAL_ACCESS_TOKEN
# - PORTAL_SUBJECT
# - PORTAL_LOG_LEVEL
# - PORTAL_LOG_FORMAT

[portal]
# Path prefix for every route
route_prefix = "/portal/"

# Route shown when the location names an unknown route
default_route = "organizations"

# Where to send the browser after signing out
logout_url = "/accounts/logout"

[api]
# Backend scheme and authority
base_url = "http://localhost:8000"

# REST API path
api_path = "/api/v1/"

[constants]
# partOf id that marks a top-level organization
organization_top_level_part_of_id = 0
organization_top_level_part_of_label = "None (Top Level Organization)"

# Public site URL (used by the debug view)
site_url = "http://localhost:8000"

[session]
# Bearer token and its subject claim for headless use
# access_token = ""
# subject = ""

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
