use crate::{
    commands::PanelOrchestrator,
    config::{self, Config},
    error::Error,
    events,
};
use log::{error, info};
use servedeck_control::{HttpControlPlane, Orchestrator};
use tauri::Manager;
use tauri_plugin_store::StoreExt;

pub fn setup_app(app: &mut tauri::App<tauri::Wry>) -> Result<(), Error> {
    info!("Servedeck v{}", env!("CARGO_PKG_VERSION"));

    // Load panel preferences
    let store = app.store("config.json")?;
    let config_store = Config::new(store);
    let panel_config = config::load_panel_config(&config_store);

    let plane = HttpControlPlane::new(
        &panel_config.control_plane_url,
        panel_config.request_timeout(),
    )?;
    info!(
        "Using control plane at {} (timeout {}s)",
        plane.base_url(),
        panel_config.request_timeout_secs
    );
    let orchestrator: PanelOrchestrator = Orchestrator::new(plane, panel_config.orchestrator);

    // Every status change goes to the webview as an OperationStatusChanged event
    events::forward_status(app.handle().clone(), orchestrator.subscribe());

    app.manage(config_store);
    app.manage(orchestrator.clone());

    // Initial load in the background; the window shows "no snapshot" until it lands
    tauri::async_runtime::spawn(async move {
        if let Err(e) = orchestrator.load().await {
            error!("Initial configuration load failed: {}", e);
        }
    });

    Ok(())
}
