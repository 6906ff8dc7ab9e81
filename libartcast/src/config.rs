//! Configuration management for Artcast

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Per-website settings keyed by website name
    #[serde(default)]
    pub websites: HashMap<String, WebsiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    /// Outbound User-Agent override; the built-in identity is used when
    /// unset
    pub user_agent: Option<String>,
    /// Connect/read timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Websites posted to when none are selected explicitly
    #[serde(default)]
    pub websites: Vec<String>,
    /// Tags merged into every submission that extends defaults
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Account identity used for this website's cookie scope
    pub account: String,
    /// File holding a captured `Cookie` header for the account
    pub cookie_file: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl WebsiteConfig {
    /// Expand `~` and environment variables in the cookie file path.
    pub fn expand_cookie_file_path(&self) -> Result<Option<PathBuf>> {
        match &self.cookie_file {
            None => Ok(None),
            Some(path) => {
                let expanded = shellexpand::full(path).map_err(|e| {
                    ConfigError::MissingField(format!("cookie_file ({}): {}", path, e))
                })?;
                Ok(Some(PathBuf::from(expanded.to_string())))
            }
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        let mut websites = HashMap::new();
        websites.insert(
            "derpibooru".to_string(),
            WebsiteConfig {
                enabled: true,
                account: "default".to_string(),
                cookie_file: Some("~/.config/artcast/derpibooru.cookies".to_string()),
            },
        );
        Self {
            network: NetworkConfig::default(),
            defaults: DefaultsConfig {
                websites: vec!["derpibooru".to_string()],
                tags: Vec::new(),
            },
            websites,
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ARTCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("artcast").join("config.toml"))
}
