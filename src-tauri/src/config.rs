use serde::{de::DeserializeOwned, Deserialize, Serialize};
use servedeck_control::OrchestratorSettings;
use std::marker::PhantomData;
use std::time::Duration;

pub const DEFAULT_CONTROL_PLANE_URL: &str = "http://127.0.0.1:13305";
/// Restarts can take a while on large models.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 120;

/// Type-safe configuration key that associates a key name with its value type
#[derive(Debug, Clone, Copy)]
pub struct ConfigKey<T> {
    name: &'static str,
    _phantom: PhantomData<T>,
}

impl<T> ConfigKey<T> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn key_name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Control plane URL must be an http:// or https:// address (got '{0}')")]
    InvalidUrl(String),

    #[error("Request timeout must be at least 1 second")]
    ZeroTimeout,
}

// ===== Panel Configuration =====

/// Panel preferences (stored locally). Changes apply at next launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, specta::Type)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    /// Base URL of the service's control plane
    #[serde(alias = "control_plane_url")]
    pub control_plane_url: String,
    /// Per-request timeout for control-plane calls
    #[serde(alias = "request_timeout_secs")]
    pub request_timeout_secs: u32,
    /// Auto-clear delays and restart progress script
    pub orchestrator: OrchestratorSettings,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            orchestrator: OrchestratorSettings::default(),
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_url = tauri::Url::parse(&self.control_plane_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if !valid_url {
            return Err(ConfigError::InvalidUrl(self.control_plane_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_secs))
    }
}

impl ConfigKey<PanelConfig> {
    pub const PANEL: Self = Self::new("panelConfig");
}

// ===== Type-Safe Config Store =====

pub trait ConfigStore {
    fn get<T: DeserializeOwned>(&self, key: &ConfigKey<T>) -> Option<T>;
    fn set<T: Serialize>(&self, key: &ConfigKey<T>, value: T) -> Result<(), String>;
    fn delete<T>(&self, key: &ConfigKey<T>) -> Result<(), String>;
}

/// Type-safe configuration store that wraps the Tauri plugin store
#[derive(Clone)]
pub struct Config {
    store: std::sync::Arc<tauri_plugin_store::Store<tauri::Wry>>,
}

impl Config {
    pub fn new(store: std::sync::Arc<tauri_plugin_store::Store<tauri::Wry>>) -> Self {
        Self { store }
    }
}

impl ConfigStore for Config {
    fn get<T: DeserializeOwned>(&self, key: &ConfigKey<T>) -> Option<T> {
        self.store
            .get(key.key_name())
            .and_then(|v| serde_json::from_value(v).ok())
    }

    fn set<T: Serialize>(&self, key: &ConfigKey<T>, value: T) -> Result<(), String> {
        let val = serde_json::to_value(value).map_err(|e| e.to_string())?;
        self.store.set(key.key_name(), val);
        self.store.save().map_err(|e| e.to_string())?;
        Ok(())
    }

    fn delete<T>(&self, key: &ConfigKey<T>) -> Result<(), String> {
        self.store.delete(key.key_name());
        self.store.save().map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Stored panel config, or defaults when nothing usable is stored.
pub fn load_panel_config(store: &impl ConfigStore) -> PanelConfig {
    match store.get(&ConfigKey::PANEL) {
        Some(config) => match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Ignoring stored panel config: {}", e);
                PanelConfig::default()
            }
        },
        None => PanelConfig::default(),
    }
}

/// Drop stored panel preferences and return the defaults now in effect.
pub fn reset_panel_config(store: &impl ConfigStore) -> Result<PanelConfig, String> {
    store.delete(&ConfigKey::PANEL)?;
    Ok(PanelConfig::default())
}
