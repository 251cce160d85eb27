use serde::{Deserialize, Serialize};

use super::OperationPhase;

/// What the presentation layer renders, emitted on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub phase: OperationPhase,
    pub message: String,
    pub has_unsaved_edits: bool,
}
