//! Timing knobs for the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One scripted progress message shown while the service restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    /// Offset from the start of the restart stage.
    pub after_ms: u32,
    pub message: String,
}

impl ProgressStep {
    pub fn new(after_ms: u32, message: &str) -> Self {
        Self {
            after_ms,
            message: message.to_string(),
        }
    }

    pub fn offset(&self) -> Duration {
        Duration::from_millis(u64::from(self.after_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorSettings {
    /// Delay before a `success` phase clears back to `idle`.
    pub success_clear_ms: u32,
    /// Delay before an `error` phase clears back to `idle`.
    pub error_clear_ms: u32,
    /// Cosmetic messages shown during a restart. They never reflect real progress.
    pub restart_progress: Vec<ProgressStep>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            success_clear_ms: 3_000,
            error_clear_ms: 5_000,
            restart_progress: vec![
                ProgressStep::new(1_000, "Stopping current backend..."),
                ProgressStep::new(3_000, "Applying configuration..."),
                ProgressStep::new(6_000, "Starting service..."),
                ProgressStep::new(10_000, "Initializing backend..."),
                ProgressStep::new(16_000, "Almost ready..."),
            ],
        }
    }
}

impl OrchestratorSettings {
    pub fn success_clear(&self) -> Duration {
        Duration::from_millis(u64::from(self.success_clear_ms))
    }

    pub fn error_clear(&self) -> Duration {
        Duration::from_millis(u64::from(self.error_clear_ms))
    }

    /// Restart progress steps ordered by offset.
    pub fn progress_script(&self) -> Vec<ProgressStep> {
        let mut steps = self.restart_progress.clone();
        steps.sort_by_key(|s| s.after_ms);
        steps
    }
}
