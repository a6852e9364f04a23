//! Internal event ingress
//!
//! The worker process posts run events here; the gateway fans them out to
//! the run's WebSocket subscribers. Delivery to subscribers is best-effort;
//! the durable record lives in the audit trail and artifacts, not here.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::instrument;

use crate::handlers::ApiError;
use crate::state::AppState;

/// Accept an event from the worker and broadcast it to local subscribers
#[instrument(skip(state, payload), fields(run_id = %run_id))]
pub async fn post_run_event(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .repos()
        .runs()
        .get(&run_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Run", &run_id))?;

    state.bus.broadcast(&run_id, payload);
    Ok(Json(json!({"status": "ok"})))
}
