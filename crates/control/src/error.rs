use serde::Serialize;

use crate::orchestrator::OperationPhase;

/// Errors surfaced by the orchestrator and the control-plane transport.
///
/// `Busy`, `Syntax` and `NotFound` are raised synchronously, before any phase
/// change or remote call. The remote variants are produced by a
/// [`ControlPlane`](crate::ControlPlane) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, specta::Type, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ControlError {
    /// The control plane could not be reached at all.
    #[error("Control plane unavailable: {detail}")]
    RemoteUnavailable { detail: String },

    /// The call completed but the control plane reported a failure.
    #[error("{message}")]
    RemoteError { message: String },

    /// The edit buffer is not a syntactically valid document.
    #[error("Invalid JSON at line {line}, column {column}: {detail}")]
    Syntax {
        line: u32,
        column: u32,
        detail: String,
    },

    /// An operation referenced a model name that is not in the registry.
    #[error("Model not found: {name}")]
    NotFound { name: String },

    /// Another operation is still in flight.
    #[error("Another operation is in progress ({phase})")]
    Busy { phase: OperationPhase },
}

impl ControlError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteError {
            message: message.into(),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            detail: detail.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            ControlError::RemoteUnavailable { .. } => {
                "Cannot reach the model service. Is it running?".to_string()
            }
            // Carried verbatim, the control plane owns the wording.
            ControlError::RemoteError { message } => message.clone(),
            ControlError::Syntax { line, column, detail } => {
                format!("Configuration is not valid JSON (line {line}, column {column}): {detail}")
            }
            ControlError::NotFound { name } => {
                format!("Model '{}' no longer exists. Reload and try again.", name)
            }
            ControlError::Busy { .. } => {
                "Please wait for the current operation to finish.".to_string()
            }
        }
    }

    /// Whether the error was raised before anything was attempted.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ControlError::Busy { .. } | ControlError::Syntax { .. } | ControlError::NotFound { .. }
        )
    }
}
