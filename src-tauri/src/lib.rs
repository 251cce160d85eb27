mod commands;
mod config;
mod error;
mod events;
mod log;
mod setup;
pub mod specta;

pub fn run() {
    let builder = specta::builder();
    specta::export_bindings(&builder);

    tauri::Builder::default()
        .plugin(crate::log::create_plugin().build())
        .plugin(tauri_plugin_store::Builder::default().build())
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(builder.invoke_handler())
        .setup(move |app| {
            // Events must be mounted before the status forwarder emits anything
            builder.mount_events(app);
            setup::setup_app(app)?;
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
