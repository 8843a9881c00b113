use super::{ProviderAdapter, ProviderContract, SubmitContract};
use crate::models::GenerationTask;
use crate::normalize::{normalize, StatusContract, PREDICTION_STATUSES};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Public sample model returned in dry-run mode.
pub const SAMPLE_GLB_URL: &str =
    "https://raw.githubusercontent.com/KhronosGroup/glTF-Sample-Models/master/2.0/Duck/glTF-Binary/Duck.glb";

/// One scripted answer to a status query.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStatus {
    Raw(Value),
    Fault(String),
}

#[derive(Debug, Clone, PartialEq)]
enum SubmitBehavior {
    Accept(String),
    Reject { status: u16, body: String },
    MissingTaskId,
    Fault(String),
}

/// Scripted provider double speaking the prediction-style vocabulary.
///
/// Status queries walk through the configured sequence; the last entry
/// repeats once the script runs out.
#[derive(Clone)]
pub struct MockProvider {
    submit: SubmitBehavior,
    statuses: Arc<Mutex<Vec<MockStatus>>>,
    contract: StatusContract,
    submitted_urls: Arc<Mutex<Vec<String>>>,
    submit_count: Arc<Mutex<usize>>,
    status_count: Arc<Mutex<usize>>,
    recording: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            submit: SubmitBehavior::Accept("mock-task-1".to_string()),
            statuses: Arc::new(Mutex::new(Vec::new())),
            contract: Self::default_contract().status,
            submitted_urls: Arc::new(Mutex::new(Vec::new())),
            submit_count: Arc::new(Mutex::new(0)),
            status_count: Arc::new(Mutex::new(0)),
            recording: true,
        }
    }

    /// Provider that finishes immediately with [`SAMPLE_GLB_URL`].
    pub fn sample() -> Self {
        Self::new().with_status(json!({
            "status": "succeeded",
            "output": SAMPLE_GLB_URL
        }))
    }

    pub fn default_contract() -> ProviderContract {
        ProviderContract {
            submit: SubmitContract {
                success_statuses: vec![200],
                task_id_field: "id".to_string(),
            },
            status: StatusContract {
                table: PREDICTION_STATUSES,
                status_field: "status".to_string(),
                progress_field: None,
                result_field: "output".to_string(),
                error_field: "error".to_string(),
                source_image_field: None,
            },
        }
    }

    /// Count calls but keep no submitted URLs. Used by the dry-run server.
    pub fn discarding(mut self) -> Self {
        self.recording = false;
        self
    }

    pub fn with_task_id(mut self, task_id: &str) -> Self {
        self.submit = SubmitBehavior::Accept(task_id.to_string());
        self
    }

    pub fn rejecting(mut self, status: u16, body: &str) -> Self {
        self.submit = SubmitBehavior::Reject {
            status,
            body: body.to_string(),
        };
        self
    }

    pub fn without_task_id(mut self) -> Self {
        self.submit = SubmitBehavior::MissingTaskId;
        self
    }

    pub fn with_submit_fault(mut self, message: &str) -> Self {
        self.submit = SubmitBehavior::Fault(message.to_string());
        self
    }

    pub fn with_status(self, raw: Value) -> Self {
        self.statuses.lock().unwrap().push(MockStatus::Raw(raw));
        self
    }

    pub fn with_status_fault(self, message: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push(MockStatus::Fault(message.to_string()));
        self
    }

    pub fn get_submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }

    pub fn get_status_count(&self) -> usize {
        *self.status_count.lock().unwrap()
    }

    pub fn get_submitted_urls(&self) -> Vec<String> {
        self.submitted_urls.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, image_url: &str) -> Result<String> {
        *self.submit_count.lock().unwrap() += 1;
        if self.recording {
            self.submitted_urls
                .lock()
                .unwrap()
                .push(image_url.to_string());
        }

        match &self.submit {
            SubmitBehavior::Accept(task_id) => Ok(task_id.clone()),
            SubmitBehavior::Reject { status, body } => Err(Error::SubmissionRejected {
                status: *status,
                body: body.clone(),
            }),
            SubmitBehavior::MissingTaskId => Err(Error::MissingTaskId("{}".to_string())),
            SubmitBehavior::Fault(message) => Err(Error::Transport(message.clone())),
        }
    }

    async fn fetch_status(&self, _task_id: &str) -> Result<Value> {
        let index = {
            let mut count = self.status_count.lock().unwrap();
            *count += 1;
            *count - 1
        };

        let statuses = self.statuses.lock().unwrap();
        let step = match statuses.len() {
            0 => MockStatus::Raw(json!({"status": "processing"})),
            len => statuses[index.min(len - 1)].clone(),
        };

        match step {
            MockStatus::Raw(raw) => Ok(raw),
            MockStatus::Fault(message) => Err(Error::Transport(message)),
        }
    }

    fn parse_status(&self, task_id: &str, raw: &Value) -> GenerationTask {
        normalize(task_id, raw, &self.contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalStatus;

    #[tokio::test]
    async fn test_mock_provider_defaults_to_processing() {
        let provider = MockProvider::new();

        let task_id = provider.submit("https://img.test/a.png").await.unwrap();
        let task = provider.check_status(&task_id).await.unwrap();

        assert_eq!(task_id, "mock-task-1");
        assert_eq!(task.status(), CanonicalStatus::InProgress);
        assert_eq!(provider.get_submitted_urls(), vec!["https://img.test/a.png"]);
    }

    #[tokio::test]
    async fn test_mock_provider_script_repeats_last_entry() {
        let provider = MockProvider::new()
            .with_status_fault("timeout")
            .with_status(json!({"status": "failed", "error": "boom"}));

        assert!(provider.check_status("t").await.is_err());
        for _ in 0..3 {
            let task = provider.check_status("t").await.unwrap();
            assert_eq!(task.error_detail(), Some("boom"));
        }
        assert_eq!(provider.get_status_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_provider_submit_behaviors() {
        let err = MockProvider::new().rejecting(400, "bad").submit("u").await.unwrap_err();
        assert!(matches!(err, Error::SubmissionRejected { status: 400, .. }));

        let err = MockProvider::new().without_task_id().submit("u").await.unwrap_err();
        assert!(matches!(err, Error::MissingTaskId(_)));

        let err = MockProvider::new().with_submit_fault("dns").submit("u").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_discarding_provider_keeps_no_urls() {
        let provider = MockProvider::sample().discarding();

        for n in 0..50 {
            let url = format!("https://img.test/uploads/{}.png", n);
            assert_eq!(provider.submit(&url).await.unwrap(), "mock-task-1");
        }

        assert_eq!(provider.get_submit_count(), 50);
        assert!(provider.get_submitted_urls().is_empty());
    }

    #[tokio::test]
    async fn test_sample_provider_succeeds_with_sample_model() {
        let task = MockProvider::sample().check_status("t").await.unwrap();
        assert_eq!(task.result_url(), Some(SAMPLE_GLB_URL));
    }
}
