//! Timers that run beside an operation: cosmetic restart progress and the
//! auto-clear of terminal phases. Neither ever decides an outcome.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{OperationPhase, Panel, PhaseEvent, Shared};
use crate::remote::ControlPlane;

impl<C: ControlPlane> Shared<C> {
    /// Play the restart progress script while the phase stays `restarting`.
    ///
    /// The returned token is stored on the panel and cancelled as soon as the
    /// real call resolves, so a late step can never overwrite a terminal message.
    pub(super) fn start_progress(self: &Arc<Self>, panel: &mut Panel) {
        let token = CancellationToken::new();
        if let Some(previous) = panel.progress.replace(token.clone()) {
            previous.cancel();
        }

        let script = self.settings.progress_script();
        if script.is_empty() {
            return;
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let started = Instant::now();
            for step in script {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep_until(started + step.offset()) => {}
                }

                let mut panel = shared.lock();
                if token.is_cancelled() || panel.phase.current() != OperationPhase::Restarting {
                    return;
                }
                debug!("Restart progress: {}", step.message);
                panel.message = step.message;
                shared.publish(&panel);
            }
        });
    }

    pub(super) fn stop_progress(&self, panel: &mut Panel) {
        if let Some(token) = panel.progress.take() {
            token.cancel();
        }
    }

    /// Schedule the return to `idle`. A new intent cancels it first.
    pub(super) fn arm_auto_clear(self: &Arc<Self>, panel: &mut Panel, delay: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = panel.auto_clear.replace(token.clone()) {
            previous.cancel();
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let mut panel = shared.lock();
                    if token.is_cancelled() {
                        return;
                    }
                    // A new operation may have started in the meantime; the
                    // phase machine rejects Clear outside success/error.
                    if panel.phase.transition(PhaseEvent::Clear).is_ok() {
                        debug!("Auto-cleared to idle after {:?}", delay);
                        panel.auto_clear = None;
                        panel.message.clear();
                        shared.publish(&panel);
                    }
                }
            }
        });
    }

    pub(super) fn cancel_auto_clear(&self, panel: &mut Panel) {
        if let Some(token) = panel.auto_clear.take() {
            token.cancel();
        }
    }
}
