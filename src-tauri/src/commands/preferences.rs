use crate::config::{self, ConfigKey, ConfigStore, PanelConfig};
use log::{error, info};
use tauri::State;

// ===== PANEL PREFERENCES COMMANDS =====

/// Load panel preferences (defaults when nothing valid is stored)
#[tauri::command]
#[specta::specta]
pub fn load_panel_config(config_store: State<config::Config>) -> PanelConfig {
    config::load_panel_config(config_store.inner())
}

/// Save panel preferences. They take effect at next launch.
#[tauri::command]
#[specta::specta]
pub fn save_panel_config(
    config_store: State<config::Config>,
    panel_config: PanelConfig,
) -> Result<(), String> {
    panel_config.validate().map_err(|e| e.to_string())?;

    config_store
        .set(&ConfigKey::PANEL, panel_config)
        .map_err(|e| {
            error!("Failed to save panel config: {}", e);
            format!("Failed to save panel config: {}", e)
        })?;
    info!("Panel config saved, applies at next launch");
    Ok(())
}

/// Forget stored panel preferences. Defaults apply at next launch.
#[tauri::command]
#[specta::specta]
pub fn reset_panel_config(config_store: State<config::Config>) -> Result<PanelConfig, String> {
    let defaults = config::reset_panel_config(config_store.inner()).map_err(|e| {
        error!("Failed to reset panel config: {}", e);
        format!("Failed to reset panel config: {}", e)
    })?;
    info!("Panel config reset to defaults, applies at next launch");
    Ok(defaults)
}
