//! The operation orchestrator.
//!
//! One instance per panel. It owns the phase, the last-loaded snapshot and the
//! edit buffers, accepts intents one at a time, drives the control plane
//! through each operation's steps and broadcasts an [`OperationStatus`] on
//! every transition.
//!
//! Intents arriving while an operation is in flight are rejected with
//! [`ControlError::Busy`]. Nothing is queued.

mod state;
mod status;
mod timers;

pub use state::OperationPhase;
pub use status::OperationStatus;

use state::{PhaseEvent, PhaseMachine, Stage, TransitionRejection};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::backend::{self, BackendChoice};
use crate::changes::ConfigEditor;
use crate::error::ControlError;
use crate::models::{ModelConfig, ModelConfigRegistry, ModelPatch};
use crate::remote::{ControlPlane, RegenerateOutcome, SaveConfigOutcome};
use crate::settings::OrchestratorSettings;
use crate::snapshot::{self, ConfigSnapshot};
use crate::validation;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Everything guarded by the orchestrator's lock.
#[derive(Default)]
struct Panel {
    phase: PhaseMachine,
    message: String,
    snapshot: Option<ConfigSnapshot>,
    editor: ConfigEditor,
    registry: ModelConfigRegistry,
    progress: Option<CancellationToken>,
    auto_clear: Option<CancellationToken>,
    /// Bumped whenever an operation begins or a snapshot is applied. A load
    /// that sees a different value on completion read stale data.
    generation: u64,
}

impl Panel {
    fn status(&self) -> OperationStatus {
        OperationStatus {
            phase: self.phase.current(),
            message: self.message.clone(),
            has_unsaved_edits: self.editor.is_dirty() || self.registry.is_dirty(),
        }
    }

    fn ensure_not_busy(&self) -> Result<(), ControlError> {
        if self.phase.is_busy() {
            return Err(ControlError::Busy {
                phase: self.phase.current(),
            });
        }
        Ok(())
    }

    /// Replace the snapshot and rebase both edit buffers on it.
    fn apply_snapshot(&mut self, snapshot: ConfigSnapshot) {
        self.editor.rebase(&snapshot.raw_config);
        self.registry.rebase(snapshot.models.clone());
        self.snapshot = Some(snapshot);
        self.generation += 1;
    }
}

struct Shared<C> {
    plane: C,
    settings: OrchestratorSettings,
    panel: Mutex<Panel>,
    status_tx: broadcast::Sender<OperationStatus>,
}

impl<C: ControlPlane> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, Panel> {
        // Panel state stays consistent across a panicking observer.
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, panel: &Panel) {
        // No subscribers is fine, the status is still readable on demand.
        let _ = self.status_tx.send(panel.status());
    }

    /// Apply a phase event and everything that hangs off it: message, timers,
    /// broadcast.
    fn apply(
        self: &Arc<Self>,
        panel: &mut Panel,
        event: PhaseEvent,
        message: String,
    ) -> Result<OperationPhase, TransitionRejection> {
        let phase = panel.phase.transition(event)?;
        debug!("Phase -> {} ({:?})", phase, event);

        if matches!(event, PhaseEvent::Begin(_)) {
            self.cancel_auto_clear(panel);
        }
        if phase != OperationPhase::Restarting {
            self.stop_progress(panel);
        }

        panel.message = message;
        self.publish(panel);

        match phase {
            OperationPhase::Restarting => self.start_progress(panel),
            OperationPhase::Success => self.arm_auto_clear(panel, self.settings.success_clear()),
            OperationPhase::Error => self.arm_auto_clear(panel, self.settings.error_clear()),
            _ => {}
        }

        Ok(phase)
    }

    fn begin(
        self: &Arc<Self>,
        panel: &mut Panel,
        stage: Stage,
        message: String,
    ) -> Result<(), ControlError> {
        self.apply(panel, PhaseEvent::Begin(stage), message)
            .map_err(|rejection| {
                debug!("{}", rejection);
                ControlError::Busy {
                    phase: rejection.current_phase,
                }
            })?;
        panel.generation += 1;
        Ok(())
    }
}

/// Handle to the panel's orchestrator. Clones share the same instance.
pub struct Orchestrator<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for Orchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ControlPlane> Orchestrator<C> {
    pub fn new(plane: C, settings: OrchestratorSettings) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                plane,
                settings,
                panel: Mutex::new(Panel::default()),
                status_tx,
            }),
        }
    }

    // ===== OBSERVATION =====

    /// Subscribe to status changes. Each transition and progress step is sent once.
    pub fn subscribe(&self) -> broadcast::Receiver<OperationStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn status(&self) -> OperationStatus {
        self.shared.lock().status()
    }

    pub fn phase(&self) -> OperationPhase {
        self.shared.lock().phase.current()
    }

    pub fn snapshot(&self) -> Option<ConfigSnapshot> {
        self.shared.lock().snapshot.clone()
    }

    pub fn effective_backend(&self) -> Option<BackendChoice> {
        self.shared
            .lock()
            .snapshot
            .as_ref()
            .map(backend::effective_choice)
    }

    pub fn config_text(&self) -> String {
        self.shared.lock().editor.text().to_string()
    }

    /// Models as currently edited, unsaved changes included.
    pub fn models(&self) -> Vec<ModelConfig> {
        self.shared.lock().registry.models().to_vec()
    }

    pub fn dirty_models(&self) -> Vec<String> {
        self.shared
            .lock()
            .registry
            .dirty_models()
            .map(str::to_string)
            .collect()
    }

    /// Run the edit buffer through validation without persisting anything.
    pub fn validate_config(&self) -> Result<(), ControlError> {
        validation::validate(self.shared.lock().editor.text()).map(|_| ())
    }

    // ===== EDITS =====

    pub fn edit_config_text(&self, text: String) -> Result<(), ControlError> {
        let mut panel = self.shared.lock();
        panel.ensure_not_busy()?;
        panel.editor.set_text(text);
        self.shared.publish(&panel);
        Ok(())
    }

    pub fn revert_config_edits(&self) -> Result<(), ControlError> {
        let mut panel = self.shared.lock();
        panel.ensure_not_busy()?;
        panel.editor.revert();
        self.shared.publish(&panel);
        Ok(())
    }

    pub fn patch_model(&self, name: &str, patch: ModelPatch) -> Result<(), ControlError> {
        let mut panel = self.shared.lock();
        panel.ensure_not_busy()?;
        panel.registry.patch(name, patch)?;
        self.shared.publish(&panel);
        Ok(())
    }

    pub fn replace_models(&self, models: Vec<ModelConfig>) -> Result<(), ControlError> {
        let mut panel = self.shared.lock();
        panel.ensure_not_busy()?;
        panel.registry.replace_all(models);
        self.shared.publish(&panel);
        Ok(())
    }

    // ===== OPERATIONS =====

    /// Read the current configuration and replace the snapshot with it.
    pub async fn load(&self) -> Result<ConfigSnapshot, ControlError> {
        let started = {
            let panel = self.shared.lock();
            panel.ensure_not_busy()?;
            panel.generation
        };

        let snapshot = snapshot::load(&self.shared.plane).await.map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?;

        let mut panel = self.shared.lock();
        if panel.generation != started {
            // An operation started meanwhile and reloads on completion, or
            // already did.
            debug!("Discarding load result, the snapshot moved on meanwhile");
            return Ok(snapshot);
        }
        panel.apply_snapshot(snapshot.clone());
        self.shared.publish(&panel);
        Ok(snapshot)
    }

    /// Store a new backend override (`None` = auto-detect) and restart the service.
    pub async fn change_backend(&self, backend_id: Option<String>) -> Result<(), ControlError> {
        let display_name = {
            let mut panel = self.shared.lock();
            let display_name =
                backend::display_name(panel.snapshot.as_ref(), backend_id.as_deref());
            self.shared.begin(
                &mut panel,
                Stage::Save,
                format!("Switching backend to {}...", display_name),
            )?;
            display_name
        };
        info!("Changing backend to {:?}", backend_id);

        let result = async {
            backend::select(&self.shared.plane, backend_id.as_deref()).await?;
            self.advance_to_restart("Restarting service with new backend...");
            self.shared.plane.restart_with_overrides().await
        }
        .await;

        self.settle(result, |_, _| format!("Backend switched to {}", display_name))
            .await
    }

    /// Regenerate the service configuration from the models it can discover.
    pub async fn reconfigure(&self) -> Result<RegenerateOutcome, ControlError> {
        {
            let mut panel = self.shared.lock();
            self.shared.begin(
                &mut panel,
                Stage::Reconfigure,
                "Regenerating configuration...".to_string(),
            )?;
        }
        info!("Regenerating configuration");

        let result = self.shared.plane.regenerate_config().await;

        self.settle(result, |_, outcome| {
            format!(
                "Configuration regenerated, {} models discovered",
                outcome.discovered_models
            )
        })
        .await
    }

    /// Restart the service with the currently stored overrides.
    pub async fn restart(&self) -> Result<(), ControlError> {
        {
            let mut panel = self.shared.lock();
            self.shared
                .begin(&mut panel, Stage::Restart, "Restarting service...".to_string())?;
        }
        info!("Restarting service");

        let result = self.shared.plane.restart_with_overrides().await;

        self.settle(result, |_, _| "Service restarted".to_string())
            .await
    }

    /// Persist the raw-JSON edit buffer.
    pub async fn save_config(&self) -> Result<SaveConfigOutcome, ControlError> {
        let (text, parsed) = {
            let mut panel = self.shared.lock();
            panel.ensure_not_busy()?;
            let text = panel.editor.text().to_string();
            let parsed = validation::validate(&text)?;
            self.shared
                .begin(&mut panel, Stage::Save, "Saving configuration...".to_string())?;
            (text, parsed)
        };
        info!("Saving configuration");

        let result = self.shared.plane.save_config_from_json(&text).await;

        self.settle(result, move |panel, outcome: &SaveConfigOutcome| {
            panel.editor.mark_saved(parsed);
            match &outcome.restart_recommendation {
                Some(recommendation) if recommendation.required => match &recommendation.reason {
                    Some(reason) => format!("Configuration saved. Restart recommended: {}", reason),
                    None => "Configuration saved. Restart recommended".to_string(),
                },
                _ => "Configuration saved".to_string(),
            }
        })
        .await
    }

    /// Persist the raw-JSON edit buffer and restart the service in one call.
    pub async fn save_config_and_restart(&self) -> Result<(), ControlError> {
        let (text, parsed) = {
            let mut panel = self.shared.lock();
            panel.ensure_not_busy()?;
            let text = panel.editor.text().to_string();
            let parsed = validation::validate(&text)?;
            self.shared
                .begin(&mut panel, Stage::Save, "Saving configuration...".to_string())?;
            (text, parsed)
        };
        info!("Saving configuration and restarting");

        // The service persists and restarts within the same call, so the
        // restart stage starts as soon as it is dispatched.
        self.advance_to_restart("Restarting service...");
        let result = self.shared.plane.save_config_and_restart(&text).await;

        self.settle(result, move |panel, _| {
            panel.editor.mark_saved(parsed);
            "Configuration saved and service restarted".to_string()
        })
        .await
    }

    /// Persist one model's settings. Other models keep their unsaved edits.
    pub async fn save_model(&self, name: &str) -> Result<(), ControlError> {
        let record = {
            let mut panel = self.shared.lock();
            panel.ensure_not_busy()?;
            let record = panel.registry.record(name)?;
            self.shared
                .begin(&mut panel, Stage::Save, format!("Saving {}...", name))?;
            record
        };
        info!("Saving model configuration for {}", name);

        let result = self
            .shared
            .plane
            .save_model_configuration(name, &record)
            .await;

        let name = name.to_string();
        self.settle(result, move |panel, _| {
            panel.registry.mark_saved(&name);
            format!("Saved settings for {}", name)
        })
        .await
    }

    /// Persist every model in the buffer with a single call.
    pub async fn save_all_models(&self) -> Result<(), ControlError> {
        let records = {
            let mut panel = self.shared.lock();
            let records = panel.registry.records();
            self.shared.begin(
                &mut panel,
                Stage::Save,
                "Saving model settings...".to_string(),
            )?;
            records
        };
        info!("Saving all {} model configurations", records.len());

        let result = self
            .shared
            .plane
            .save_all_model_configurations(&records)
            .await;

        let count = records.len();
        self.settle(result, move |panel, _| {
            panel.registry.mark_all_saved();
            format!("Saved settings for {} models", count)
        })
        .await
    }

    fn advance_to_restart(&self, message: &str) {
        let mut panel = self.shared.lock();
        if let Err(rejection) =
            self.shared
                .apply(&mut panel, PhaseEvent::Advance(Stage::Restart), message.to_string())
        {
            warn!("{}", rejection);
        }
    }

    /// Finish an operation: on success run `on_success` (which also yields the
    /// final message), reload the snapshot and enter `success`; on failure
    /// enter `error` with the failure's message.
    async fn settle<T>(
        &self,
        result: Result<T, ControlError>,
        on_success: impl FnOnce(&mut Panel, &T) -> String,
    ) -> Result<T, ControlError> {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                error!("Operation failed: {}", err);
                let mut panel = self.shared.lock();
                if let Err(rejection) =
                    self.shared
                        .apply(&mut panel, PhaseEvent::Fail, err.to_string())
                {
                    warn!("{}", rejection);
                }
                return Err(err);
            }
        };

        let mut message = {
            let mut panel = self.shared.lock();
            // The real call has resolved, the script must not outlive it.
            self.shared.stop_progress(&mut panel);
            on_success(&mut panel, &value)
        };

        let reloaded = snapshot::load(&self.shared.plane).await;

        let mut panel = self.shared.lock();
        match reloaded {
            Ok(snapshot) => panel.apply_snapshot(snapshot),
            Err(e) => {
                warn!("Operation succeeded but reloading configuration failed: {}", e);
                message = format!("{} (refresh failed: {})", message, e);
            }
        }
        info!("{}", message);
        if let Err(rejection) = self.shared.apply(&mut panel, PhaseEvent::Succeed, message) {
            warn!("{}", rejection);
        }

        Ok(value)
    }
}
