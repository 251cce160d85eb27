//! Remote control-plane contract.
//!
//! The orchestrator only ever talks to the service through this trait, which
//! keeps the state machine testable against an in-memory implementation.

mod http;

pub use http::HttpControlPlane;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::models::ModelConfig;
use crate::snapshot::ConfigurationInfo;

/// Result of regenerating the service configuration from discovered models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateOutcome {
    pub discovered_models: u32,
}

/// Whether the service wants a restart before a saved config takes effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct RestartRecommendation {
    pub required: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigOutcome {
    #[serde(default)]
    pub restart_recommendation: Option<RestartRecommendation>,
}

/// Request/response calls exposed by the service's control plane.
///
/// Every call fails with [`ControlError::RemoteError`] on a non-success
/// response, or [`ControlError::RemoteUnavailable`] when the service cannot be
/// reached.
pub trait ControlPlane: Send + Sync + 'static {
    fn configuration_info(
        &self,
    ) -> impl Future<Output = Result<ConfigurationInfo, ControlError>> + Send;

    fn model_configurations(
        &self,
    ) -> impl Future<Output = Result<Vec<ModelConfig>, ControlError>> + Send;

    /// `None` returns the service to auto-detection.
    fn set_backend_override(
        &self,
        backend: Option<&str>,
    ) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn restart_with_overrides(&self) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn regenerate_config(
        &self,
    ) -> impl Future<Output = Result<RegenerateOutcome, ControlError>> + Send;

    fn save_config_from_json(
        &self,
        json: &str,
    ) -> impl Future<Output = Result<SaveConfigOutcome, ControlError>> + Send;

    fn save_config_and_restart(
        &self,
        json: &str,
    ) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn save_model_configuration(
        &self,
        name: &str,
        record: &ModelConfig,
    ) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn save_all_model_configurations(
        &self,
        records: &[ModelConfig],
    ) -> impl Future<Output = Result<(), ControlError>> + Send;
}
