use crate::error::Error;
use crate::models::{CheckStatusRequest, StatusResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/check-status", post(check_status))
}

async fn check_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckStatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, Error> {
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let task = state.app.check_status(&request.task_id).await?;
    Ok(Json(StatusResponse::from(&task)))
}
