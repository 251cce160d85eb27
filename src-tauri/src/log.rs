/// Creates and configures the logging plugin for the panel
///
/// Logs are sent to:
/// - Stdout (console output)
/// - Log directory (persistent file storage)
/// - Webview (browser console)
///
/// Log level is Debug in development builds and Info in production builds.
/// The orchestrator core logs through the same `log` facade, so phase
/// transitions and progress steps land in all three targets.
pub fn create_plugin() -> tauri_plugin_log::Builder {
    tauri_plugin_log::Builder::new()
        .targets([
            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Stdout),
            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::LogDir {
                file_name: Some("servedeck".to_string()),
            }),
            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Webview),
        ])
        .level(if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        // reqwest and hyper are chatty at debug level
        .level_for("hyper_util", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info)
}
