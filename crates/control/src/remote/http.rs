use std::time::Duration;

use log::{debug, error};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ControlPlane, RegenerateOutcome, SaveConfigOutcome};
use crate::error::ControlError;
use crate::models::ModelConfig;
use crate::snapshot::ConfigurationInfo;

/// Control plane reached over the service's local HTTP API.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct BackendOverrideBody<'a> {
    backend: Option<&'a str>,
}

#[derive(Serialize)]
struct ConfigTextBody<'a> {
    json: &'a str,
}

#[derive(Serialize, Deserialize)]
struct ModelsBody<T> {
    models: T,
}

impl HttpControlPlane {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ControlError::remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ControlError> {
        debug!("{} {}", method, path);

        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ControlError::unavailable(e.to_string())
            } else {
                ControlError::remote(format!("Request to {} failed: {}", path, e))
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        error!("{} failed with {}: {}", path, status, message);
        Err(ControlError::remote(message))
    }

    async fn parse<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ControlError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ControlError::remote(format!("Invalid response from {}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ControlError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::parse(path, response).await
    }
}

/// Pick the most useful text out of an error body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(message)) = map.get(key) {
                return Some(message.clone());
            }
        }
    }

    Some(body.to_string())
}

impl ControlPlane for HttpControlPlane {
    async fn configuration_info(&self) -> Result<ConfigurationInfo, ControlError> {
        self.get("/api/config/info").await
    }

    async fn model_configurations(&self) -> Result<Vec<ModelConfig>, ControlError> {
        let body: ModelsBody<Vec<ModelConfig>> = self.get("/api/config/models").await?;
        Ok(body.models)
    }

    async fn set_backend_override(&self, backend: Option<&str>) -> Result<(), ControlError> {
        self.send(
            Method::PUT,
            "/api/config/backend-override",
            Some(&BackendOverrideBody { backend }),
        )
        .await?;
        Ok(())
    }

    async fn restart_with_overrides(&self) -> Result<(), ControlError> {
        self.send::<()>(Method::POST, "/api/service/restart", None)
            .await?;
        Ok(())
    }

    async fn regenerate_config(&self) -> Result<RegenerateOutcome, ControlError> {
        let path = "/api/config/regenerate";
        let response = self.send::<()>(Method::POST, path, None).await?;
        Self::parse(path, response).await
    }

    async fn save_config_from_json(&self, json: &str) -> Result<SaveConfigOutcome, ControlError> {
        let path = "/api/config";
        let response = self
            .send(Method::PUT, path, Some(&ConfigTextBody { json }))
            .await?;

        // An empty acknowledgement carries no recommendation.
        let text = response.text().await.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(SaveConfigOutcome::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| ControlError::remote(format!("Invalid response from {}: {}", path, e)))
    }

    async fn save_config_and_restart(&self, json: &str) -> Result<(), ControlError> {
        self.send(
            Method::POST,
            "/api/config/save-and-restart",
            Some(&ConfigTextBody { json }),
        )
        .await?;
        Ok(())
    }

    async fn save_model_configuration(
        &self,
        name: &str,
        record: &ModelConfig,
    ) -> Result<(), ControlError> {
        let path = format!("/api/config/models/{}", urlencoding::encode(name));
        self.send(Method::PUT, &path, Some(record)).await?;
        Ok(())
    }

    async fn save_all_model_configurations(
        &self,
        records: &[ModelConfig],
    ) -> Result<(), ControlError> {
        self.send(
            Method::PUT,
            "/api/config/models",
            Some(&ModelsBody { models: records }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plane(server: &MockServer) -> HttpControlPlane {
        HttpControlPlane::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn model(name: &str) -> ModelConfig {
        serde_json::from_value(json!({
            "name": name,
            "path": format!("/models/{}.gguf", name),
            "port": 9100,
            "batchSize": 512,
            "threads": 8
        }))
        .unwrap()
    }

    #[test]
    fn test_base_url_drops_trailing_slashes() {
        let plane =
            HttpControlPlane::new("http://127.0.0.1:13305//", Duration::from_secs(5)).unwrap();
        assert_eq!(plane.base_url(), "http://127.0.0.1:13305");
        assert_eq!(plane.url("/api/config"), "http://127.0.0.1:13305/api/config");
    }

    #[tokio::test]
    async fn test_configuration_info() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/config/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "backends": [{"id": "cpu", "displayName": "CPU", "isAvailable": true}],
                "backendOverride": null,
                "rawConfig": {"models": {}},
                "configPath": "/etc/service/config.json",
                "serviceStatus": {"running": true, "port": 13305},
                "platform": "linux",
                "arch": "aarch64"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = plane(&server).configuration_info().await.unwrap();
        assert_eq!(info.backends.len(), 1);
        assert_eq!(info.backend_override, None);
        assert_eq!(info.service_status.port, 13305);
        assert_eq!(info.arch, "aarch64");
    }

    #[tokio::test]
    async fn test_set_backend_override_sends_null_for_auto() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/config/backend-override"))
            .and(body_json(json!({"backend": null})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        plane(&server).set_backend_override(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/service/restart"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": "llama-server exited with code 1"})),
            )
            .mount(&server)
            .await;

        let err = plane(&server).restart_with_overrides().await.unwrap_err();
        assert_eq!(err, ControlError::remote("llama-server exited with code 1"));
    }

    #[tokio::test]
    async fn test_plain_text_and_empty_error_bodies() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/config/regenerate"))
            .respond_with(ResponseTemplate::new(409).set_body_string("scan already running"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/config/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let plane = plane(&server);
        assert_eq!(
            plane.regenerate_config().await.unwrap_err(),
            ControlError::remote("scan already running")
        );
        match plane.model_configurations().await.unwrap_err() {
            ControlError::RemoteError { message } => assert!(message.starts_with("503")),
            other => panic!("expected RemoteError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_config_reads_restart_recommendation() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/config"))
            .and(body_json(json!({"json": "{\"logLevel\":\"debug\"}"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "restartRecommendation": {"required": true, "reason": "Port changed"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = plane(&server)
            .save_config_from_json(r#"{"logLevel":"debug"}"#)
            .await
            .unwrap();
        let recommendation = outcome.restart_recommendation.unwrap();
        assert!(recommendation.required);
        assert_eq!(recommendation.reason.as_deref(), Some("Port changed"));
    }

    #[tokio::test]
    async fn test_save_config_accepts_empty_ack() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let outcome = plane(&server).save_config_from_json("{}").await.unwrap();
        assert_eq!(outcome, SaveConfigOutcome::default());
    }

    #[tokio::test]
    async fn test_model_saves_use_expected_routes() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/config/models/qwen%202.5"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/config/models"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let plane = plane(&server);
        plane
            .save_model_configuration("qwen 2.5", &model("qwen 2.5"))
            .await
            .unwrap();
        plane
            .save_all_model_configurations(&[model("m1"), model("m2")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let plane =
            HttpControlPlane::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(5))
                .unwrap();

        let err = plane.configuration_info().await.unwrap_err();
        assert!(
            matches!(err, ControlError::RemoteUnavailable { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(""), None);
        assert_eq!(
            error_message(r#"{"message": "bad field"}"#).as_deref(),
            Some("bad field")
        );
        assert_eq!(
            error_message(r#"{"detail": 1}"#).as_deref(),
            Some(r#"{"detail": 1}"#)
        );
    }
}
