//! Console configuration.
//!
//! Supports loading configuration from:
//! 1. Config file (TOML, JSON, or YAML) named by `CRM_CONSOLE_CONFIG`
//! 2. Environment variables
//!
//! Environment variables take precedence over config file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::guard::DEFAULT_REDIRECT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Local storage configuration
    pub storage: StorageConfig,
    /// Navigation configuration
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL (default: "http://localhost:8000/api")
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preferences file (default: ~/.crm-console/preferences.yaml)
    pub preferences_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Fallback route for denied navigations (default: "/dashboard")
    pub redirect_to: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            redirect_to: DEFAULT_REDIRECT.to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from file and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(config_path) = std::env::var("CRM_CONSOLE_CONFIG") {
            config = Self::from_file(&config_path)?;
            tracing::info!("Loaded configuration from: {}", config_path);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Load configuration from a file (supports TOML, JSON, YAML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: ConsoleConfig = match extension {
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => {
                if content.trim().starts_with('{') {
                    serde_json::from_str(&content)?
                } else if content.contains("---") || content.contains(": ") {
                    serde_yaml::from_str(&content)?
                } else {
                    toml::from_str(&content)?
                }
            }
        };

        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in `load`).
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CRM_API_BASE_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = lookup("CRM_API_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.api.timeout_secs = secs;
            } else {
                tracing::warn!("Ignoring CRM_API_TIMEOUT_SECS={}: not a number", val);
            }
        }
        if let Some(val) = lookup("CRM_PREFERENCES_PATH") {
            self.storage.preferences_path = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("CRM_REDIRECT_TO") {
            self.navigation.redirect_to = val;
        }
    }
}
