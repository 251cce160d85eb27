//! tauri-specta wiring: the typed command/event registry and the TypeScript
//! bindings export.

use std::path::Path;

use specta_typescript::Typescript;
use tauri_specta::{collect_events, Builder};

use crate::events::OperationStatusChanged;

/// Where the webview imports its bindings from, relative to `src-tauri/`.
pub const BINDINGS_PATH: &str = "../src/bindings.ts";

pub fn builder() -> Builder<tauri::Wry> {
    Builder::<tauri::Wry>::new()
        .commands(crate::with_commands!(tauri_specta::collect_commands))
        .events(collect_events![OperationStatusChanged])
}

/// Write TypeScript bindings for every command and event to `path`.
pub fn export_to(builder: &Builder<tauri::Wry>, path: impl AsRef<Path>) -> Result<(), String> {
    builder
        .export(Typescript::default().header("// @ts-nocheck"), path)
        .map_err(|e| format!("Failed to export TypeScript bindings: {}", e))
}

/// Bindings are refreshed on every debug launch; release builds ship the
/// committed file.
pub fn export_bindings(builder: &Builder<tauri::Wry>) {
    if cfg!(debug_assertions) {
        if let Err(e) = export_to(builder, BINDINGS_PATH) {
            // The log plugin is not up yet
            eprintln!("{}", e);
        }
    }
}
