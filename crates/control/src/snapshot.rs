//! Last-loaded state of the backend, its models and the service process.
//!
//! A snapshot is never patched in place. Every successful mutation is followed
//! by a fresh [`load`] from the control plane, which replaces it wholesale.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ControlError;
use crate::models::ModelConfig;
use crate::remote::ControlPlane;

/// An inference backend the service knows how to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_accelerator: bool,
    /// e.g. "cuda", "rocm", "metal"
    #[serde(default)]
    pub accelerator_class: Option<String>,
    #[serde(default)]
    pub is_available: bool,
}

/// Runtime status of the served process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub running: bool,
    pub port: u16,
    #[serde(default)]
    pub process_id: Option<u32>,
    /// Backend actually serving right now, as reported by the service.
    #[serde(default)]
    pub active_backend_name: Option<String>,
}

/// Response of the configuration-info read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationInfo {
    pub backends: Vec<Backend>,
    #[serde(default)]
    pub backend_override: Option<String>,
    #[serde(default)]
    pub raw_config: Value,
    #[serde(default)]
    pub config_path: Option<String>,
    pub service_status: ServiceStatus,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub arch: String,
}

/// Everything the panel knows about the backend, merged from both reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub backends: Vec<Backend>,
    pub backend_override: Option<String>,
    pub raw_config: Value,
    pub config_path: Option<String>,
    pub service_status: ServiceStatus,
    pub platform: String,
    pub arch: String,
    pub models: Vec<ModelConfig>,
}

impl ConfigSnapshot {
    pub fn from_parts(info: ConfigurationInfo, models: Vec<ModelConfig>) -> Self {
        let mut backends: Vec<Backend> = Vec::with_capacity(info.backends.len());
        for backend in info.backends {
            // ids are the identity key, first one wins
            if backends.iter().any(|b| b.id == backend.id) {
                warn!("Ignoring duplicate backend id '{}'", backend.id);
                continue;
            }
            backends.push(backend);
        }

        Self {
            backends,
            backend_override: info.backend_override,
            raw_config: info.raw_config,
            config_path: info.config_path,
            service_status: info.service_status,
            platform: info.platform,
            arch: info.arch,
            models,
        }
    }

    pub fn backend(&self, id: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.id == id)
    }
}

/// Read configuration info and model configurations and merge them.
///
/// The info read is mandatory. A failed model read degrades to an empty model
/// list instead of failing the whole load.
pub async fn load<C: ControlPlane>(plane: &C) -> Result<ConfigSnapshot, ControlError> {
    let (info, models) = tokio::join!(plane.configuration_info(), plane.model_configurations());

    let info = info?;
    let models = match models {
        Ok(models) => models,
        Err(e) => {
            warn!("Model configurations unavailable, continuing without them: {}", e);
            Vec::new()
        }
    };

    debug!(
        "Loaded snapshot: {} backends, {} models, override={:?}",
        info.backends.len(),
        models.len(),
        info.backend_override
    );

    Ok(ConfigSnapshot::from_parts(info, models))
}
