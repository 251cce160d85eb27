use super::{to_message, PanelOrchestrator};
use log::error;
use servedeck_control::{
    BackendChoice, ConfigSnapshot, OperationStatus, RegenerateOutcome, SaveConfigOutcome,
};
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

// ===== STATUS AND SNAPSHOT =====

/// Current phase, message and unsaved-edits flag
#[tauri::command]
#[specta::specta]
pub fn get_status(orchestrator: State<PanelOrchestrator>) -> OperationStatus {
    orchestrator.status()
}

/// Last loaded snapshot, if any load has succeeded yet
#[tauri::command]
#[specta::specta]
pub fn get_snapshot(orchestrator: State<PanelOrchestrator>) -> Option<ConfigSnapshot> {
    orchestrator.snapshot()
}

/// How the backend selector should present the current selection
#[tauri::command]
#[specta::specta]
pub fn get_effective_backend(orchestrator: State<PanelOrchestrator>) -> Option<BackendChoice> {
    orchestrator.effective_backend()
}

/// Re-read configuration and models from the service
#[tauri::command]
#[specta::specta]
pub async fn load_configuration(
    orchestrator: State<'_, PanelOrchestrator>,
) -> Result<ConfigSnapshot, String> {
    orchestrator.load().await.map_err(to_message)
}

// ===== SERVICE OPERATIONS =====

/// Store a backend override (null for auto-detect) and restart the service
#[tauri::command]
#[specta::specta]
pub async fn change_backend(
    orchestrator: State<'_, PanelOrchestrator>,
    backend_id: Option<String>,
) -> Result<(), String> {
    orchestrator
        .change_backend(backend_id)
        .await
        .map_err(to_message)
}

/// Regenerate the service configuration from discovered models
#[tauri::command]
#[specta::specta]
pub async fn reconfigure(
    orchestrator: State<'_, PanelOrchestrator>,
) -> Result<RegenerateOutcome, String> {
    orchestrator.reconfigure().await.map_err(to_message)
}

/// Restart the service with its stored overrides
#[tauri::command]
#[specta::specta]
pub async fn restart_service(orchestrator: State<'_, PanelOrchestrator>) -> Result<(), String> {
    orchestrator.restart().await.map_err(to_message)
}

// ===== RAW CONFIG EDITOR =====

#[tauri::command]
#[specta::specta]
pub fn get_config_text(orchestrator: State<PanelOrchestrator>) -> String {
    orchestrator.config_text()
}

#[tauri::command]
#[specta::specta]
pub fn edit_config_text(
    orchestrator: State<PanelOrchestrator>,
    text: String,
) -> Result<(), String> {
    orchestrator.edit_config_text(text).map_err(to_message)
}

#[tauri::command]
#[specta::specta]
pub fn revert_config_edits(orchestrator: State<PanelOrchestrator>) -> Result<(), String> {
    orchestrator.revert_config_edits().map_err(to_message)
}

/// Check the editor buffer without saving, so persist actions can be disabled
#[tauri::command]
#[specta::specta]
pub fn validate_config(orchestrator: State<PanelOrchestrator>) -> Result<(), String> {
    orchestrator.validate_config().map_err(to_message)
}

#[tauri::command]
#[specta::specta]
pub async fn save_config(
    orchestrator: State<'_, PanelOrchestrator>,
) -> Result<SaveConfigOutcome, String> {
    orchestrator.save_config().await.map_err(to_message)
}

#[tauri::command]
#[specta::specta]
pub async fn save_config_and_restart(
    orchestrator: State<'_, PanelOrchestrator>,
) -> Result<(), String> {
    orchestrator.save_config_and_restart().await.map_err(to_message)
}

/// Show the service's config file in the OS file manager
#[tauri::command]
#[specta::specta]
pub fn reveal_config_file(
    app: AppHandle,
    orchestrator: State<PanelOrchestrator>,
) -> Result<(), String> {
    let path = orchestrator
        .snapshot()
        .and_then(|snapshot| snapshot.config_path)
        .ok_or_else(|| "The service has not reported a config file location".to_string())?;

    app.opener().reveal_item_in_dir(&path).map_err(|e| {
        error!("Failed to reveal {}: {}", path, e);
        format!("Failed to reveal config file: {}", e)
    })
}
