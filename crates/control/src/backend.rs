//! Effective backend choice: explicit override or auto-detection.

use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::remote::ControlPlane;
use crate::snapshot::ConfigSnapshot;

/// Label shown when the service picks the backend itself and has not said which.
pub const AUTO_LABEL: &str = "Auto-detect";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum SelectionMode {
    Auto,
    Explicit,
}

/// How the panel should present the current backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct BackendChoice {
    pub mode: SelectionMode,
    /// Override id, `None` in auto mode.
    pub id: Option<String>,
    pub display_name: String,
    /// The override does not name a backend that was available at load time.
    pub stale: bool,
}

pub fn effective_choice(snapshot: &ConfigSnapshot) -> BackendChoice {
    match snapshot.backend_override.as_deref() {
        None => BackendChoice {
            mode: SelectionMode::Auto,
            id: None,
            display_name: snapshot
                .service_status
                .active_backend_name
                .clone()
                .unwrap_or_else(|| AUTO_LABEL.to_string()),
            stale: false,
        },
        Some(id) => {
            let backend = snapshot.backend(id);
            BackendChoice {
                mode: SelectionMode::Explicit,
                id: Some(id.to_string()),
                // Removed backends still show up under their raw id.
                display_name: backend
                    .map(|b| b.display_name.clone())
                    .unwrap_or_else(|| id.to_string()),
                stale: !backend.is_some_and(|b| b.is_available),
            }
        }
    }
}

/// Display name for a prospective selection, used in status messages.
pub fn display_name(snapshot: Option<&ConfigSnapshot>, id: Option<&str>) -> String {
    match id {
        None => AUTO_LABEL.to_string(),
        Some(id) => snapshot
            .and_then(|s| s.backend(id))
            .map(|b| b.display_name.clone())
            .unwrap_or_else(|| id.to_string()),
    }
}

/// Store the override on the control plane. Does not restart anything.
pub async fn select<C: ControlPlane>(plane: &C, id: Option<&str>) -> Result<(), ControlError> {
    plane.set_backend_override(id).await
}
