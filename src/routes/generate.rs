use crate::config::GenerationMode;
use crate::error::Error;
use crate::models::{GlbResponse, PendingResponse};
use crate::state::AppState;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Multipart field expected to carry the image.
const IMAGE_FIELD: &str = "file";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate", post(generate))
}

/// Accept an image and answer according to the configured mode: the
/// finished model URL when blocking, the pending task id otherwise.
async fn generate(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Error> {
    let multipart = multipart.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let image = read_image(multipart).await?;

    match state.config.mode {
        GenerationMode::Blocking => {
            let task = state.app.generate_blocking(&image).await?;
            let glb_url = task
                .result_url()
                .ok_or_else(|| {
                    Error::ProviderReportedFailure("task finished without a model URL".to_string())
                })?
                .to_string();
            Ok(Json(GlbResponse { glb_url }).into_response())
        }
        GenerationMode::Async => {
            let submission = state.app.submit(&image).await?;
            Ok(Json(PendingResponse::from_submission(&submission)).into_response())
        }
    }
}

/// Take the `file` field, or failing that the first field that carries a
/// filename.
async fn read_image(mut multipart: Multipart) -> Result<Vec<u8>, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        let is_image = field.name() == Some(IMAGE_FIELD) || field.file_name().is_some();
        if !is_image {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read image: {}", e)))?;
        return Ok(bytes.to_vec());
    }

    Err(Error::InvalidRequest(format!(
        "no image provided; send it as multipart field '{}'",
        IMAGE_FIELD
    )))
}

#[cfg(test)]
mod tests {
    use crate::config::GenerationMode;
    use crate::provider::{MockProvider, SAMPLE_GLB_URL};
    use crate::routes::test_support::{body_json, multipart_request, test_state, PNG};
    use crate::routes::build;
    use crate::storage::MockStorageClient;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_async_mode_returns_pending_task() {
        let provider = MockProvider::new().with_task_id("pred_abc");
        let state = test_state(GenerationMode::Async, MockStorageClient::new(), provider.clone());

        let response = build(state)
            .oneshot(multipart_request("file", PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "PENDING");
        assert_eq!(body["taskId"], "pred_abc");
        assert_eq!(provider.get_status_count(), 0);
    }

    #[tokio::test]
    async fn test_blocking_mode_returns_model_url() {
        let state = test_state(
            GenerationMode::Blocking,
            MockStorageClient::new(),
            MockProvider::sample(),
        );

        let response = build(state)
            .oneshot(multipart_request("file", PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"glbUrl": SAMPLE_GLB_URL}));
    }

    #[tokio::test]
    async fn test_any_named_file_field_is_accepted() {
        let storage = MockStorageClient::new();
        let state = test_state(GenerationMode::Async, storage.clone(), MockProvider::new());

        let response = build(state)
            .oneshot(multipart_request("image", PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(storage.get_upload_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_image_is_bad_request() {
        let state = test_state(GenerationMode::Async, MockStorageClient::new(), MockProvider::new());

        let body = "--b\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--b--\r\n";
        let request = Request::post("/generate")
            .header("content-type", "multipart/form-data; boundary=b")
            .body(Body::from(body))
            .unwrap();

        let response = build(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errorCode"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_structured_error() {
        let state = test_state(GenerationMode::Async, MockStorageClient::new(), MockProvider::new());

        let request = Request::post("/generate")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = build(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errorCode"], "BAD_REQUEST");
    }
}
