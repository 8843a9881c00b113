//! Image-to-3D generation providers
//!
//! Each provider gets one [`ProviderAdapter`] implementation that knows its
//! request shape, auth scheme and response contract. The rest of the relay
//! only sees task ids and canonical [`GenerationTask`] snapshots.

pub mod http;
pub mod meshy;
pub mod mock;
pub mod synexa;

pub use http::{AuthScheme, ProviderHttpClient, SubmitContract};
pub use meshy::MeshyAdapter;
pub use mock::{MockProvider, MockStatus, SAMPLE_GLB_URL};
pub use synexa::SynexaAdapter;

use crate::models::GenerationTask;
use crate::normalize::StatusContract;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Synexa,
    Meshy,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Synexa => "synexa",
            ProviderKind::Meshy => "meshy",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synexa" => Ok(ProviderKind::Synexa),
            "meshy" => Ok(ProviderKind::Meshy),
            other => Err(format!("unknown provider '{}' (expected synexa or meshy)", other)),
        }
    }
}

/// Everything that varies between versions of a provider's API.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderContract {
    pub submit: SubmitContract,
    pub status: StatusContract,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Start a generation job for a public image URL and return its task id.
    async fn submit(&self, image_url: &str) -> Result<String>;

    /// Fetch the raw status payload for a task.
    async fn fetch_status(&self, task_id: &str) -> Result<Value>;

    /// Map a raw status payload onto the canonical model. Never fails.
    fn parse_status(&self, task_id: &str, raw: &Value) -> GenerationTask;

    /// One status query, normalized.
    async fn check_status(&self, task_id: &str) -> Result<GenerationTask> {
        let raw = self.fetch_status(task_id).await?;
        Ok(self.parse_status(task_id, &raw))
    }
}
