mod models;
mod panel;
mod preferences;
mod registry;

use servedeck_control::{ControlError, HttpControlPlane, Orchestrator};

// Re-export all commands for convenience
pub use models::*;
pub use panel::*;
pub use preferences::*;

/// The orchestrator instance held in app state.
pub type PanelOrchestrator = Orchestrator<HttpControlPlane>;

/// Commands hand the webview the user-facing wording of an error.
fn to_message(err: ControlError) -> String {
    if !err.is_rejection() {
        log::error!("{}", err);
    }
    err.user_message()
}
