//! Plan handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use lo_core::PlanId;
use lo_storage::models::{CreatePlan, PlanRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::handlers::{ApiError, ValidatedJson};
use crate::state::AppState;

// =============================================================================
// Request/Response DTOs
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, message = "intent_text must not be empty"))]
    pub intent_text: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub project_id: String,
    pub intent_text: String,
    pub plan_json: serde_json::Value,
    pub created_at: String,
}

fn plan_to_response(plan: PlanRecord) -> PlanResponse {
    PlanResponse {
        id: plan.id,
        project_id: plan.project_id,
        intent_text: plan.intent_text,
        plan_json: plan.plan_json,
        created_at: plan.created_at.to_rfc3339(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Synthesize and persist a plan for a project
#[instrument(skip(state, request), fields(project_id = %project_id))]
pub async fn create_plan(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreatePlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.repos();

    repos
        .projects()
        .get(&project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project", &project_id))?;

    let plan = state.planner.plan(&request.intent_text);
    plan.validate()
        .map_err(|e| ApiError::internal(format!("planner produced an invalid plan: {e}")))?;
    let plan_json = serde_json::to_value(&plan)
        .map_err(|e| ApiError::internal(format!("plan serialization failed: {e}")))?;

    let record = repos
        .plans()
        .create(CreatePlan {
            id: PlanId::new().to_string(),
            project_id,
            intent_text: request.intent_text,
            plan_json,
        })
        .await?;

    info!(plan_id = %record.id, risk = %plan.risk_level, "Plan created");
    Ok(Json(plan_to_response(record)))
}
