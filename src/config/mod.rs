//! Configuration module for healthpanel.
//!
//! Handles the settings file, environment variables, and warehouse credentials.

pub mod credentials;
mod settings;

pub use credentials::{materialize, CredentialError, CredentialResult, CredentialStore};
pub use settings::{
    expand_env_vars, AssetSettings, BridgeSettings, CacheSettings, CredentialSettings, Settings,
    SettingsError, SettingsResult, WarehouseSettings,
};
