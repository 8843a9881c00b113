use super::http::{AuthScheme, ProviderHttpClient, SubmitContract};
use super::{ProviderAdapter, ProviderContract};
use crate::models::{GenerationProfile, GenerationTask};
use crate::normalize::{normalize, StatusContract, PREDICTION_STATUSES};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.synexa.ai";
pub const DEFAULT_MODEL: &str = "tencent/hunyuan3d-2";

#[derive(Debug, Serialize)]
pub struct PredictionRequest {
    pub model: String,
    pub input: PredictionInput,
}

#[derive(Debug, Serialize)]
pub struct PredictionInput {
    pub image: String,
    pub steps: u32,
    pub guidance_scale: f32,
    pub octree_resolution: u32,
    pub remove_background: bool,
}

/// Prediction-style API: `POST /v1/predictions`, `GET /v1/predictions/{id}`.
pub struct SynexaAdapter {
    http: ProviderHttpClient,
    model: String,
    profile: GenerationProfile,
    contract: ProviderContract,
}

impl SynexaAdapter {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        profile: GenerationProfile,
        contract: ProviderContract,
    ) -> Result<Self> {
        let http = ProviderHttpClient::new(
            "Synexa",
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            AuthScheme::Header {
                name: "x-api-key".to_string(),
                value: api_key,
            },
            Duration::from_secs(30),
        )?;

        Ok(Self {
            http,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            profile,
            contract,
        })
    }

    pub fn default_contract() -> ProviderContract {
        ProviderContract {
            submit: SubmitContract {
                success_statuses: vec![200, 201],
                task_id_field: "id".to_string(),
            },
            status: StatusContract {
                table: PREDICTION_STATUSES,
                status_field: "status".to_string(),
                progress_field: None,
                result_field: "output".to_string(),
                error_field: "error".to_string(),
                source_image_field: Some("input.image".to_string()),
            },
        }
    }

    pub fn build_request(&self, image_url: &str) -> PredictionRequest {
        PredictionRequest {
            model: self.model.clone(),
            input: PredictionInput {
                image: image_url.to_string(),
                steps: self.profile.steps,
                guidance_scale: self.profile.guidance_scale,
                octree_resolution: self.profile.octree_resolution,
                remove_background: self.profile.remove_background,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for SynexaAdapter {
    fn name(&self) -> &str {
        "synexa"
    }

    async fn submit(&self, image_url: &str) -> Result<String> {
        if image_url.trim().is_empty() {
            return Err(Error::InvalidRequest("image URL is required".to_string()));
        }
        let request = self.build_request(image_url);
        self.http
            .submit("/v1/predictions", &request, &self.contract.submit)
            .await
    }

    async fn fetch_status(&self, task_id: &str) -> Result<Value> {
        self.http
            .get_resource("/v1/predictions", task_id)
            .await
    }

    fn parse_status(&self, task_id: &str, raw: &Value) -> GenerationTask {
        normalize(task_id, raw, &self.contract.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_adapter(server: &MockServer) -> SynexaAdapter {
        SynexaAdapter::new(
            "syn-key".to_string(),
            Some(server.uri()),
            None,
            GenerationProfile::default(),
            SynexaAdapter::default_contract(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_body_carries_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("x-api-key", "syn-key"))
            .and(body_json(json!({
                "model": "tencent/hunyuan3d-2",
                "input": {
                    "image": "https://img.test/cat.png",
                    "steps": 50,
                    "guidance_scale": 5.5,
                    "octree_resolution": 256,
                    "remove_background": true
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "pred-123",
                "status": "starting"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = make_adapter(&server)
            .submit("https://img.test/cat.png")
            .await
            .unwrap();
        assert_eq!(id, "pred-123");
    }

    #[tokio::test]
    async fn test_check_status_processing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/predictions/pred-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pred-123",
                "status": "processing",
                "input": {"image": "https://img.test/cat.png"}
            })))
            .mount(&server)
            .await;

        let task = make_adapter(&server).check_status("pred-123").await.unwrap();
        assert_eq!(task.status(), CanonicalStatus::InProgress);
        assert_eq!(task.progress, 50);
        assert_eq!(task.source_image_url.as_deref(), Some("https://img.test/cat.png"));
    }

    #[tokio::test]
    async fn test_check_status_succeeded_with_output_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/predictions/pred-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pred-123",
                "status": "succeeded",
                "output": ["https://out.test/mesh.glb", "https://out.test/preview.png"]
            })))
            .mount(&server)
            .await;

        let task = make_adapter(&server).check_status("pred-123").await.unwrap();
        assert_eq!(task.result_url(), Some("https://out.test/mesh.glb"));
    }

    #[tokio::test]
    async fn test_blank_image_url_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let err = make_adapter(&server).submit("  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
