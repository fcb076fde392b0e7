//! TOML-based configuration for healthpanel.
//!
//! Supports a config file (healthpanel.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [warehouse]
//! project_id = "escolap2p"
//! location = "southamerica-east1"
//! table = "escolap2p.base_siscnrm.residentes_applications"
//! dialect = "bigquery"
//! timeout_seconds = 180
//!
//! [bridge]
//! path = "${HEALTHPANEL_BRIDGE}"
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 900
//! options_ttl_seconds = 1800
//!
//! [credentials]
//! secret_env = "HEALTHPANEL_SERVICE_ACCOUNT"
//! file = "/tmp/keyfile.json"
//! env_var = "GOOGLE_APPLICATION_CREDENTIALS"
//!
//! [assets]
//! dir = "assets"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub bridge: BridgeSettings,
    pub cache: CacheSettings,
    pub credentials: CredentialSettings,
    pub assets: AssetSettings,
}

/// Which table to query and how.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseSettings {
    pub project_id: String,
    pub location: String,
    /// Fully qualified `project.dataset.table`.
    pub table: String,
    pub dialect: Dialect,
    pub timeout_seconds: u64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            project_id: "escolap2p".to_string(),
            location: "southamerica-east1".to_string(),
            table: "escolap2p.base_siscnrm.residentes_applications".to_string(),
            dialect: Dialect::BigQuery,
            timeout_seconds: 180,
        }
    }
}

impl WarehouseSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// The external process that executes queries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Executable path (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Page queries.
    pub ttl_seconds: u64,
    /// Filter option lists.
    pub options_ttl_seconds: u64,
    /// Empty means `~/.healthpanel/cache.db`.
    pub path: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 900,
            options_ttl_seconds: 1800,
            path: String::new(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn options_ttl(&self) -> Duration {
        Duration::from_secs(self.options_ttl_seconds)
    }

    /// The configured database path, expanded; `None` for the default location.
    pub fn resolved_path(&self) -> SettingsResult<Option<PathBuf>> {
        if self.path.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(expand_env_vars(&self.path)?)))
    }
}

/// Where the service-account secret comes from and where it is written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Environment variable holding the service-account JSON.
    pub secret_env: String,
    pub file: String,
    /// Environment variable pointed at `file` once written.
    pub env_var: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            secret_env: "HEALTHPANEL_SERVICE_ACCOUNT".to_string(),
            file: "/tmp/keyfile.json".to_string(),
            env_var: "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetSettings {
    pub dir: String,
    pub boundaries_states: String,
    pub boundaries_regions: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            dir: "assets".to_string(),
            boundaries_states: "br_states.json".to_string(),
            boundaries_regions: "br_regions.json".to_string(),
        }
    }
}

impl AssetSettings {
    pub fn resolved_dir(&self) -> SettingsResult<PathBuf> {
        Ok(PathBuf::from(expand_env_vars(&self.dir)?))
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> SettingsResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `HEALTHPANEL_CONFIG`
    /// 2. `./healthpanel.toml`
    /// 3. `<config_dir>/healthpanel/config.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var("HEALTHPANEL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("healthpanel.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("healthpanel").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Settings::default())
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.warehouse.table.split('.').count() != 3 {
            return Err(SettingsError::InvalidConfig(format!(
                "warehouse.table must be project.dataset.table, got '{}'",
                self.warehouse.table
            )));
        }
        if self.warehouse.timeout_seconds == 0 {
            return Err(SettingsError::InvalidConfig(
                "warehouse.timeout_seconds must be positive".to_string(),
            ));
        }
        if self.cache.enabled && (self.cache.ttl_seconds == 0 || self.cache.options_ttl_seconds == 0)
        {
            return Err(SettingsError::InvalidConfig(
                "cache TTLs must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// The bridge executable, expanded. `None` when not configured.
    pub fn bridge_path(&self) -> SettingsResult<Option<PathBuf>> {
        match &self.bridge.path {
            Some(path) if !path.trim().is_empty() => {
                Ok(Some(PathBuf::from(expand_env_vars(path)?)))
            }
            _ => Ok(None),
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference in '{}'",
                    s
                )));
            }
            name
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
