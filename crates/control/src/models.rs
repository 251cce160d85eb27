//! Per-model tunables and the edit buffer that holds unsaved changes to them.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Runtime status of a model as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub enum ModelStatus {
    #[default]
    Available,
    Running,
    Error,
}

/// Tunable settings of a single served model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub name: String,
    pub path: String,
    pub port: u16,
    #[serde(default)]
    pub is_embedding: bool,
    /// Context length the weights were trained with, read-only ceiling.
    #[serde(default)]
    pub native_context_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured_context_size: Option<u32>,
    #[serde(default)]
    pub gpu_layers: u32,
    pub batch_size: u32,
    #[serde(default)]
    pub ubatch_size: Option<u32>,
    pub threads: u32,
    #[serde(default)]
    pub flash_attention: bool,
    #[serde(default)]
    pub memory_lock: bool,
    #[serde(default)]
    pub ttl_seconds: u32,
    #[serde(default)]
    pub status: ModelStatus,
}

impl ModelConfig {
    /// The record sent to the control plane when this model is persisted.
    ///
    /// Embedding models never send a configured context size.
    pub fn to_record(&self) -> ModelConfig {
        let mut record = self.clone();
        if record.is_embedding {
            record.configured_context_size = None;
        }
        record
    }
}

/// A single-field edit to a model, `{"field": ..., "value": ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type, strum::Display)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ModelPatch {
    Port(u16),
    ConfiguredContextSize(Option<u32>),
    GpuLayers(u32),
    BatchSize(u32),
    UbatchSize(Option<u32>),
    Threads(u32),
    FlashAttention(bool),
    MemoryLock(bool),
    TtlSeconds(u32),
}

impl ModelPatch {
    /// Apply to `model`. Returns false when the model ignores this field.
    fn apply(self, model: &mut ModelConfig) -> bool {
        match self {
            ModelPatch::Port(port) => model.port = port,
            ModelPatch::ConfiguredContextSize(size) => {
                if model.is_embedding {
                    return false;
                }
                model.configured_context_size = match (size, model.native_context_size) {
                    (Some(size), Some(ceiling)) => Some(size.min(ceiling)),
                    (size, _) => size,
                };
            }
            ModelPatch::GpuLayers(layers) => model.gpu_layers = layers,
            ModelPatch::BatchSize(size) => model.batch_size = size,
            ModelPatch::UbatchSize(size) => model.ubatch_size = size,
            ModelPatch::Threads(threads) => model.threads = threads.max(1),
            ModelPatch::FlashAttention(enabled) => model.flash_attention = enabled,
            ModelPatch::MemoryLock(enabled) => model.memory_lock = enabled,
            ModelPatch::TtlSeconds(ttl) => model.ttl_seconds = ttl,
        }
        true
    }
}

/// Edit buffer for model settings, keyed by model name.
///
/// Dirtiness is tracked per model. Any accepted patch marks its model dirty,
/// even when the new value equals the old one.
#[derive(Debug, Clone, Default)]
pub struct ModelConfigRegistry {
    models: Vec<ModelConfig>,
    dirty: BTreeSet<String>,
}

impl ModelConfigRegistry {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        Self {
            models,
            dirty: BTreeSet::new(),
        }
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_model_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    pub fn dirty_models(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Replace one field on one model.
    pub fn patch(&mut self, name: &str, patch: ModelPatch) -> Result<(), ControlError> {
        let model = self
            .models
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| ControlError::not_found(name))?;

        let field = patch.to_string();
        if patch.apply(model) {
            debug!("Patched {}.{}", name, field);
            self.dirty.insert(name.to_string());
        } else {
            debug!("Ignored {}.{} on embedding model", name, field);
        }
        Ok(())
    }

    /// Replace the whole buffer. Every model in it is considered edited.
    pub fn replace_all(&mut self, models: Vec<ModelConfig>) {
        self.dirty = models.iter().map(|m| m.name.clone()).collect();
        self.models = models;
    }

    /// Outgoing record for one model.
    pub fn record(&self, name: &str) -> Result<ModelConfig, ControlError> {
        self.get(name)
            .map(ModelConfig::to_record)
            .ok_or_else(|| ControlError::not_found(name))
    }

    /// Outgoing records for the whole buffer, in buffer order.
    pub fn records(&self) -> Vec<ModelConfig> {
        self.models.iter().map(ModelConfig::to_record).collect()
    }

    pub fn mark_saved(&mut self, name: &str) {
        self.dirty.remove(name);
    }

    pub fn mark_all_saved(&mut self) {
        self.dirty.clear();
    }

    /// Take reloaded models as the new base.
    ///
    /// Clean entries are replaced by their reloaded version. Dirty entries keep
    /// their edits as long as the model still exists; models that disappeared
    /// are dropped along with their edits.
    pub fn rebase(&mut self, reloaded: Vec<ModelConfig>) {
        let mut next = Vec::with_capacity(reloaded.len());
        for fresh in reloaded {
            match self.models.iter().find(|m| m.name == fresh.name) {
                Some(edited) if self.dirty.contains(&fresh.name) => {
                    let mut kept = edited.clone();
                    kept.status = fresh.status;
                    kept.native_context_size = fresh.native_context_size;
                    next.push(kept);
                }
                _ => next.push(fresh),
            }
        }

        self.dirty.retain(|name| next.iter().any(|m| &m.name == name));
        self.models = next;
    }
}
