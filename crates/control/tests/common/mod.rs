//! In-memory control plane for driving the orchestrator in tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use servedeck_control::{
    Backend, ConfigurationInfo, ControlError, ControlPlane, ModelConfig, ModelStatus,
    OperationPhase, OperationStatus, Orchestrator, OrchestratorSettings, RegenerateOutcome,
    RestartRecommendation, SaveConfigOutcome, ServiceStatus,
};
use tokio::sync::{broadcast, Notify};

/// Calls that change something on the service.
pub const MUTATING_CALLS: [&str; 7] = [
    "set_backend_override",
    "restart_with_overrides",
    "regenerate_config",
    "save_config_from_json",
    "save_config_and_restart",
    "save_model_configuration",
    "save_all_model_configurations",
];

struct MockState {
    info: ConfigurationInfo,
    models: Vec<ModelConfig>,
    calls: Vec<String>,
    failures: HashMap<&'static str, ControlError>,
    delays: HashMap<&'static str, Duration>,
    holds: HashMap<&'static str, Arc<Notify>>,
    discovered_models: u32,
    restart_recommendation: Option<RestartRecommendation>,
    in_flight: usize,
    max_in_flight: usize,
    slow_info_read: Option<Duration>,
}

/// Cheap to clone; clones share state so a test can keep a handle while the
/// orchestrator owns another.
#[derive(Clone)]
pub struct MockControlPlane {
    state: Arc<Mutex<MockState>>,
}

pub fn backend(id: &str, display_name: &str) -> Backend {
    Backend {
        id: id.to_string(),
        display_name: display_name.to_string(),
        description: format!("{} backend", display_name),
        requires_accelerator: id != "cpu",
        accelerator_class: (id != "cpu").then(|| id.to_string()),
        is_available: true,
    }
}

pub fn model(name: &str, port: u16) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        path: format!("/models/{}.gguf", name),
        port,
        is_embedding: false,
        native_context_size: Some(32768),
        configured_context_size: Some(8192),
        gpu_layers: 0,
        batch_size: 512,
        ubatch_size: None,
        threads: 8,
        flash_attention: false,
        memory_lock: false,
        ttl_seconds: 300,
        status: ModelStatus::Available,
    }
}

pub fn raw_config() -> Value {
    json!({
        "healthCheckTimeout": 120,
        "models": {
            "m1": {"cmd": "llama-server -m /models/m1.gguf --port ${PORT}"},
            "m2": {"cmd": "llama-server -m /models/m2.gguf --port ${PORT}"}
        }
    })
}

impl MockControlPlane {
    /// Two backends (`cpu`, `cuda`), no override, two models (`m1`, `m2`).
    pub fn new() -> Self {
        let info = ConfigurationInfo {
            backends: vec![backend("cpu", "CPU"), backend("cuda", "NVIDIA CUDA")],
            backend_override: None,
            raw_config: raw_config(),
            config_path: Some("/home/user/.config/service/config.json".to_string()),
            service_status: ServiceStatus {
                running: true,
                port: 13305,
                process_id: Some(4242),
                active_backend_name: Some("CPU".to_string()),
            },
            platform: "linux".to_string(),
            arch: "x86_64".to_string(),
        };

        Self {
            state: Arc::new(Mutex::new(MockState {
                info,
                models: vec![model("m1", 9101), model("m2", 9102)],
                calls: Vec::new(),
                failures: HashMap::new(),
                delays: HashMap::new(),
                holds: HashMap::new(),
                discovered_models: 3,
                restart_recommendation: None,
                in_flight: 0,
                max_in_flight: 0,
                slow_info_read: None,
            })),
        }
    }

    pub fn fail(&self, call: &'static str, error: ControlError) {
        self.state.lock().unwrap().failures.insert(call, error);
    }

    pub fn recover(&self, call: &'static str) {
        self.state.lock().unwrap().failures.remove(call);
    }

    /// Make `call` take `delay` of (virtual) time.
    pub fn delay(&self, call: &'static str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(call, delay);
    }

    /// Make `call` wait until the returned handle is notified.
    pub fn hold(&self, call: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .holds
            .insert(call, Arc::clone(&notify));
        notify
    }

    /// The next configuration read takes its data immediately but only
    /// returns after `delay`, so it can be overtaken by a mutation.
    pub fn slow_next_info_read(&self, delay: Duration) {
        self.state.lock().unwrap().slow_info_read = Some(delay);
    }

    pub fn recommend_restart(&self, reason: &str) {
        self.state.lock().unwrap().restart_recommendation = Some(RestartRecommendation {
            required: true,
            reason: Some(reason.to_string()),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING_CALLS.contains(&c.as_str()))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn backend_override(&self) -> Option<String> {
        self.state.lock().unwrap().info.backend_override.clone()
    }

    pub fn stored_model(&self, name: &str) -> Option<ModelConfig> {
        self.state
            .lock()
            .unwrap()
            .models
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    pub fn stored_raw_config(&self) -> Value {
        self.state.lock().unwrap().info.raw_config.clone()
    }

    async fn call(&self, name: &'static str) -> Result<(), ControlError> {
        let mutating = MUTATING_CALLS.contains(&name);
        let (hold, delay) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(name.to_string());
            if mutating {
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
            }
            (
                state.holds.get(name).cloned(),
                state.delays.get(name).copied(),
            )
        };

        if let Some(hold) = hold {
            hold.notified().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if mutating {
            state.in_flight -= 1;
        }
        match state.failures.get(name) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl ControlPlane for MockControlPlane {
    async fn configuration_info(&self) -> Result<ConfigurationInfo, ControlError> {
        let slow_read = {
            let mut state = self.state.lock().unwrap();
            state
                .slow_info_read
                .take()
                .map(|delay| (state.info.clone(), delay))
        };
        if let Some((captured, delay)) = slow_read {
            self.state
                .lock()
                .unwrap()
                .calls
                .push("configuration_info".to_string());
            tokio::time::sleep(delay).await;
            return Ok(captured);
        }

        self.call("configuration_info").await?;
        Ok(self.state.lock().unwrap().info.clone())
    }

    async fn model_configurations(&self) -> Result<Vec<ModelConfig>, ControlError> {
        self.call("model_configurations").await?;
        Ok(self.state.lock().unwrap().models.clone())
    }

    async fn set_backend_override(&self, backend: Option<&str>) -> Result<(), ControlError> {
        self.call("set_backend_override").await?;
        self.state.lock().unwrap().info.backend_override = backend.map(str::to_string);
        Ok(())
    }

    async fn restart_with_overrides(&self) -> Result<(), ControlError> {
        self.call("restart_with_overrides").await?;
        let mut state = self.state.lock().unwrap();
        let active = match state.info.backend_override.clone() {
            Some(id) => state
                .info
                .backends
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.display_name.clone())
                .unwrap_or(id),
            None => "CPU".to_string(),
        };
        state.info.service_status.active_backend_name = Some(active);
        state.info.service_status.process_id = state.info.service_status.process_id.map(|p| p + 1);
        Ok(())
    }

    async fn regenerate_config(&self) -> Result<RegenerateOutcome, ControlError> {
        self.call("regenerate_config").await?;
        Ok(RegenerateOutcome {
            discovered_models: self.state.lock().unwrap().discovered_models,
        })
    }

    async fn save_config_from_json(&self, json: &str) -> Result<SaveConfigOutcome, ControlError> {
        self.call("save_config_from_json").await?;
        let parsed: Value = serde_json::from_str(json)
            .map_err(|e| ControlError::remote(format!("rejected: {}", e)))?;
        let mut state = self.state.lock().unwrap();
        state.info.raw_config = parsed;
        Ok(SaveConfigOutcome {
            restart_recommendation: state.restart_recommendation.clone(),
        })
    }

    async fn save_config_and_restart(&self, json: &str) -> Result<(), ControlError> {
        self.call("save_config_and_restart").await?;
        let parsed: Value = serde_json::from_str(json)
            .map_err(|e| ControlError::remote(format!("rejected: {}", e)))?;
        self.state.lock().unwrap().info.raw_config = parsed;
        Ok(())
    }

    async fn save_model_configuration(
        &self,
        name: &str,
        record: &ModelConfig,
    ) -> Result<(), ControlError> {
        self.call("save_model_configuration").await?;
        let mut state = self.state.lock().unwrap();
        match state.models.iter_mut().find(|m| m.name == name) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(ControlError::remote(format!("unknown model {}", name))),
        }
    }

    async fn save_all_model_configurations(
        &self,
        records: &[ModelConfig],
    ) -> Result<(), ControlError> {
        self.call("save_all_model_configurations").await?;
        self.state.lock().unwrap().models = records.to_vec();
        Ok(())
    }
}

/// Fast-clearing settings are not needed: tests run on paused time.
pub fn orchestrator(plane: &MockControlPlane) -> Orchestrator<MockControlPlane> {
    Orchestrator::new(plane.clone(), OrchestratorSettings::default())
}

/// Orchestrator over a fresh mock with the snapshot already loaded.
pub async fn loaded() -> (MockControlPlane, Orchestrator<MockControlPlane>) {
    let plane = MockControlPlane::new();
    let orchestrator = orchestrator(&plane);
    orchestrator.load().await.expect("initial load");
    plane.clear_calls();
    (plane, orchestrator)
}

pub async fn next_status(rx: &mut broadcast::Receiver<OperationStatus>) -> OperationStatus {
    rx.recv().await.expect("status stream closed")
}

/// Collect statuses until the operation has ended and cleared back to idle.
pub async fn statuses_until_idle(
    rx: &mut broadcast::Receiver<OperationStatus>,
) -> Vec<OperationStatus> {
    let mut seen: Vec<OperationStatus> = Vec::new();
    loop {
        let status = next_status(rx).await;
        let done = status.phase == OperationPhase::Idle && seen.iter().any(|s| s.phase.is_terminal());
        seen.push(status);
        if done {
            return seen;
        }
    }
}

/// Phases in order with consecutive repeats collapsed.
pub fn phases(statuses: &[OperationStatus]) -> Vec<OperationPhase> {
    let mut phases: Vec<OperationPhase> = statuses.iter().map(|s| s.phase).collect();
    phases.dedup();
    phases
}
