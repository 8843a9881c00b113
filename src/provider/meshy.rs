use super::http::{AuthScheme, ProviderHttpClient, SubmitContract};
use super::{ProviderAdapter, ProviderContract};
use crate::models::{GenerationProfile, GenerationTask};
use crate::normalize::{normalize, StatusContract, CANONICAL_STATUSES};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.meshy.ai";

const TASKS_PATH: &str = "/openapi/v1/image-to-3d";

#[derive(Debug, Serialize)]
pub struct ImageTo3dRequest {
    pub image_url: String,
    pub enable_pbr: bool,
    pub should_remesh: bool,
    pub should_texture: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_polycount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
}

/// Task-style API that already reports canonical statuses and progress.
pub struct MeshyAdapter {
    http: ProviderHttpClient,
    model: Option<String>,
    profile: GenerationProfile,
    contract: ProviderContract,
}

impl MeshyAdapter {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        profile: GenerationProfile,
        contract: ProviderContract,
    ) -> Result<Self> {
        let http = ProviderHttpClient::new(
            "Meshy",
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            AuthScheme::Bearer(api_key),
            Duration::from_secs(30),
        )?;

        Ok(Self {
            http,
            model,
            profile,
            contract,
        })
    }

    pub fn default_contract() -> ProviderContract {
        ProviderContract {
            submit: SubmitContract {
                success_statuses: vec![200, 202],
                task_id_field: "result".to_string(),
            },
            status: StatusContract {
                table: CANONICAL_STATUSES,
                status_field: "status".to_string(),
                progress_field: Some("progress".to_string()),
                result_field: "model_urls".to_string(),
                error_field: "task_error.message".to_string(),
                source_image_field: Some("image_url".to_string()),
            },
        }
    }

    pub fn build_request(&self, image_url: &str) -> ImageTo3dRequest {
        ImageTo3dRequest {
            image_url: image_url.to_string(),
            enable_pbr: self.profile.enable_pbr,
            should_remesh: self.profile.should_remesh,
            should_texture: self.profile.should_texture,
            target_polycount: self.profile.target_polycount,
            ai_model: self.model.clone(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for MeshyAdapter {
    fn name(&self) -> &str {
        "meshy"
    }

    async fn submit(&self, image_url: &str) -> Result<String> {
        if image_url.trim().is_empty() {
            return Err(Error::InvalidRequest("image URL is required".to_string()));
        }
        let request = self.build_request(image_url);
        self.http
            .submit(TASKS_PATH, &request, &self.contract.submit)
            .await
    }

    async fn fetch_status(&self, task_id: &str) -> Result<Value> {
        self.http
            .get_resource(TASKS_PATH, task_id)
            .await
    }

    fn parse_status(&self, task_id: &str, raw: &Value) -> GenerationTask {
        normalize(task_id, raw, &self.contract.status)
    }
}
