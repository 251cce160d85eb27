//! Typesafe events for the panel.
//!
//! These events are emitted from Rust and can be listened to in TypeScript
//! with full type safety via tauri-specta.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use servedeck_control::{OperationPhase, OperationStatus};
use tauri::AppHandle;
use tauri_specta::Event;
use tokio::sync::broadcast::{self, error::RecvError};

/// Operation status change - single event stream for every phase transition
/// and restart progress step
#[derive(Debug, Clone, Serialize, Deserialize, specta::Type, tauri_specta::Event)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatusChanged {
    pub phase: OperationPhase,
    /// Status line to show next to the phase indicator
    pub message: String,
    /// Whether the raw config or any model has edits not yet persisted
    pub has_unsaved_edits: bool,
}

impl From<OperationStatus> for OperationStatusChanged {
    fn from(status: OperationStatus) -> Self {
        Self {
            phase: status.phase,
            message: status.message,
            has_unsaved_edits: status.has_unsaved_edits,
        }
    }
}

/// Relay the orchestrator's status broadcast to the webview until the
/// orchestrator is dropped.
pub fn forward_status(app: AppHandle, mut statuses: broadcast::Receiver<OperationStatus>) {
    tauri::async_runtime::spawn(async move {
        loop {
            match statuses.recv().await {
                Ok(status) => {
                    if let Err(e) = OperationStatusChanged::from(status).emit(&app) {
                        warn!("Failed to emit status event: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Status forwarder lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Status stream closed");
                    break;
                }
            }
        }
    });
}
