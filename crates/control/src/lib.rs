//! Configuration and service orchestration for the servedeck control panel.
//!
//! The panel talks to a local model-serving service through its control
//! plane. This crate holds everything between the UI and that service: the
//! last-loaded [`ConfigSnapshot`], the raw-JSON and per-model edit buffers,
//! validation and unsaved-change detection, and the [`Orchestrator`] state
//! machine that runs one operation at a time and reports its progress.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use servedeck_control::{HttpControlPlane, Orchestrator, OrchestratorSettings};
//!
//! # async fn run() -> Result<(), servedeck_control::ControlError> {
//! let plane = HttpControlPlane::new("http://127.0.0.1:13305", Duration::from_secs(120))?;
//! let orchestrator = Orchestrator::new(plane, OrchestratorSettings::default());
//!
//! let mut status = orchestrator.subscribe();
//! orchestrator.load().await?;
//! orchestrator.change_backend(Some("cuda".to_string())).await?;
//! while let Ok(update) = status.try_recv() {
//!     println!("{}: {}", update.phase, update.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod changes;
mod error;
pub mod models;
mod orchestrator;
pub mod remote;
mod settings;
pub mod snapshot;
pub mod validation;

pub use backend::{BackendChoice, SelectionMode};
pub use error::ControlError;
pub use models::{ModelConfig, ModelConfigRegistry, ModelPatch, ModelStatus};
pub use orchestrator::{OperationPhase, OperationStatus, Orchestrator};
pub use remote::{
    ControlPlane, HttpControlPlane, RegenerateOutcome, RestartRecommendation, SaveConfigOutcome,
};
pub use settings::{OrchestratorSettings, ProgressStep};
pub use snapshot::{Backend, ConfigSnapshot, ConfigurationInfo, ServiceStatus};
