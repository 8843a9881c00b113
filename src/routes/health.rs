use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    pub provider: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.config.mode.as_str(),
        provider: state.app.provider_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::GenerationMode;
    use crate::provider::MockProvider;
    use crate::routes::build;
    use crate::routes::test_support::{body_json, test_state};
    use crate::storage::MockStorageClient;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_mode_and_provider() {
        let state = test_state(GenerationMode::Blocking, MockStorageClient::new(), MockProvider::new());

        let response = build(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mode"], "blocking");
        assert_eq!(body["provider"], "mock");
    }
}
