//! Data models and structures
//!
//! Defines the canonical generation task, the fixed generation profile, and
//! the JSON payloads exchanged with relay clients.

use serde::{Deserialize, Serialize};

/// Provider-independent task status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Timeout,
}

impl CanonicalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanonicalStatus::Succeeded | CanonicalStatus::Failed | CanonicalStatus::Timeout
        )
    }
}

/// Where a task stands, with the payload that only exists in that state.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    InProgress,
    Succeeded { result_url: String },
    Failed { error: String },
    TimedOut { error: String },
}

/// Snapshot of one provider-side generation job.
///
/// Rebuilt from the provider's payload on every status check and dropped
/// once the response is written.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub task_id: String,
    pub source_image_url: Option<String>,
    pub progress: u8,
    pub state: TaskState,
}

impl GenerationTask {
    pub fn new(task_id: impl Into<String>, state: TaskState, progress: u8) -> Self {
        Self {
            task_id: task_id.into(),
            source_image_url: None,
            progress: progress.min(100),
            state,
        }
    }

    pub fn pending(task_id: impl Into<String>) -> Self {
        Self::new(task_id, TaskState::Pending, 0)
    }

    pub fn timed_out(task_id: impl Into<String>, attempts: u32) -> Self {
        Self::new(
            task_id,
            TaskState::TimedOut {
                error: format!("No result after {} status checks", attempts),
            },
            0,
        )
    }

    pub fn with_source_image_url(mut self, url: Option<String>) -> Self {
        self.source_image_url = url;
        self
    }

    pub fn status(&self) -> CanonicalStatus {
        match self.state {
            TaskState::Pending => CanonicalStatus::Pending,
            TaskState::InProgress => CanonicalStatus::InProgress,
            TaskState::Succeeded { .. } => CanonicalStatus::Succeeded,
            TaskState::Failed { .. } => CanonicalStatus::Failed,
            TaskState::TimedOut { .. } => CanonicalStatus::Timeout,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result_url(&self) -> Option<&str> {
        match &self.state {
            TaskState::Succeeded { result_url } => Some(result_url),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            TaskState::Failed { error } | TaskState::TimedOut { error } => Some(error),
            _ => None,
        }
    }
}

/// Result of a successful upload + submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub task_id: String,
    pub source_image_url: String,
}

/// Quality/cost knobs fixed at deployment time.
///
/// Each provider adapter maps the fields it supports and ignores the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProfile {
    pub enable_pbr: bool,
    pub should_texture: bool,
    pub should_remesh: bool,
    pub steps: u32,
    pub guidance_scale: f32,
    pub octree_resolution: u32,
    pub remove_background: bool,
    pub target_polycount: Option<u32>,
}

impl Default for GenerationProfile {
    fn default() -> Self {
        Self {
            enable_pbr: true,
            should_texture: true,
            should_remesh: true,
            steps: 50,
            guidance_scale: 5.5,
            octree_resolution: 256,
            remove_background: true,
            target_polycount: None,
        }
    }
}

// Client-facing payloads

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlbResponse {
    pub glb_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub status: CanonicalStatus,
    pub task_id: String,
    pub message: String,
}

impl PendingResponse {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            status: CanonicalStatus::Pending,
            task_id: submission.task_id.clone(),
            message: "Generation started; poll /check-status with this taskId".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: CanonicalStatus,
    pub progress: u8,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glb_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&GenerationTask> for StatusResponse {
    fn from(task: &GenerationTask) -> Self {
        Self {
            status: task.status(),
            progress: task.progress,
            task_id: task.task_id.clone(),
            glb_url: task.result_url().map(str::to_string),
            error: task.error_detail().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_status_serialization() {
        let json = serde_json::to_string(&CanonicalStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");

        let parsed: CanonicalStatus = serde_json::from_str("\"TIMEOUT\"").unwrap();
        assert_eq!(parsed, CanonicalStatus::Timeout);
    }

    #[test]
    fn test_result_and_error_are_exclusive() {
        let done = GenerationTask::new(
            "t1",
            TaskState::Succeeded {
                result_url: "https://cdn.test/m.glb".to_string(),
            },
            100,
        );
        assert_eq!(done.result_url(), Some("https://cdn.test/m.glb"));
        assert_eq!(done.error_detail(), None);

        let failed = GenerationTask::new(
            "t1",
            TaskState::Failed {
                error: "bad input".to_string(),
            },
            0,
        );
        assert_eq!(failed.result_url(), None);
        assert_eq!(failed.error_detail(), Some("bad input"));

        let running = GenerationTask::new("t1", TaskState::InProgress, 50);
        assert_eq!(running.result_url(), None);
        assert_eq!(running.error_detail(), None);
        assert!(!running.is_terminal());
    }

    #[test]
    fn test_progress_is_clamped() {
        let task = GenerationTask::new("t1", TaskState::InProgress, 250);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_timed_out_task_carries_detail() {
        let task = GenerationTask::timed_out("t9", 40);
        assert_eq!(task.status(), CanonicalStatus::Timeout);
        assert!(task.error_detail().unwrap().contains("40"));
        assert!(task.is_terminal());
    }

    #[test]
    fn test_status_response_shape() {
        let task = GenerationTask::new(
            "abc",
            TaskState::Succeeded {
                result_url: "https://cdn.test/m.glb".to_string(),
            },
            100,
        );
        let json = serde_json::to_value(StatusResponse::from(&task)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "SUCCEEDED",
                "progress": 100,
                "taskId": "abc",
                "glbUrl": "https://cdn.test/m.glb"
            })
        );

        let running = GenerationTask::new("abc", TaskState::InProgress, 50);
        let json = serde_json::to_value(StatusResponse::from(&running)).unwrap();
        assert!(json.get("glbUrl").is_none());
        assert!(json.get("error").is_none());
    }
}
