use super::{to_message, PanelOrchestrator};
use servedeck_control::{ModelConfig, ModelPatch};
use tauri::State;

// ===== MODEL SETTINGS COMMANDS =====

/// Models as currently edited, unsaved changes included
#[tauri::command]
#[specta::specta]
pub fn get_models(orchestrator: State<PanelOrchestrator>) -> Vec<ModelConfig> {
    orchestrator.models()
}

/// Names of models with unsaved edits
#[tauri::command]
#[specta::specta]
pub fn get_dirty_models(orchestrator: State<PanelOrchestrator>) -> Vec<String> {
    orchestrator.dirty_models()
}

/// Change one field on one model, e.g. `{ field: "gpuLayers", value: 20 }`
#[tauri::command]
#[specta::specta]
pub fn patch_model(
    orchestrator: State<PanelOrchestrator>,
    name: String,
    patch: ModelPatch,
) -> Result<(), String> {
    orchestrator.patch_model(&name, patch).map_err(to_message)
}

/// Replace the whole model buffer (e.g. after a bulk edit in the UI)
#[tauri::command]
#[specta::specta]
pub fn replace_models(
    orchestrator: State<PanelOrchestrator>,
    models: Vec<ModelConfig>,
) -> Result<(), String> {
    orchestrator.replace_models(models).map_err(to_message)
}

/// Persist one model's settings; other models keep their edits
#[tauri::command]
#[specta::specta]
pub async fn save_model(
    orchestrator: State<'_, PanelOrchestrator>,
    name: String,
) -> Result<(), String> {
    orchestrator.save_model(&name).await.map_err(to_message)
}

#[tauri::command]
#[specta::specta]
pub async fn save_all_models(orchestrator: State<'_, PanelOrchestrator>) -> Result<(), String> {
    orchestrator.save_all_models().await.map_err(to_message)
}
