//! Run management handlers
//!
//! The control API is the sole writer of run state up to and including the
//! AWAITING_REVIEW -> RUNNING transition; after approval the worker owns
//! every status field. The RUNNING write happens before the job is enqueued
//! so the worker always observes an approved run.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use lo_core::{time, Plan, RunId, SandboxMeta, StepId};
use lo_state::{can_transition_run, RunStatus, StepStatus};
use lo_storage::models::{
    action, actor, Artifact, Audit, CreateAudit, CreateRun, CreateRunStep, Run, RunStep, UpdateRun,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::handlers::ApiError;
use crate::state::AppState;

// =============================================================================
// Request/Response DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
pub struct RunActionResponse {
    pub run_id: String,
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct RunDetailResponse {
    pub id: String,
    pub project_id: String,
    pub plan_id: Option<String>,
    pub status: RunStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub sandbox_meta: serde_json::Value,
    pub risk_level: String,
    pub steps: Vec<RunStep>,
    pub audits: Vec<Audit>,
    pub artifacts: Vec<Artifact>,
    pub report_content: Option<String>,
    pub diff_content: Option<String>,
    pub audit_content: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn require_transition(current: RunStatus, target: RunStatus) -> Result<(), ApiError> {
    if can_transition_run(current, target) {
        Ok(())
    } else {
        Err(lo_core::Error::InvalidTransition {
            from: current.to_string(),
            to: target.to_string(),
        }
        .into())
    }
}

async fn get_run_or_404(state: &AppState, run_id: &str) -> Result<Run, ApiError> {
    state
        .repos()
        .runs()
        .get(run_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Run", run_id))
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a run for a plan, leaving it awaiting human review
#[instrument(skip(state, request), fields(project_id = %project_id, plan_id = %request.plan_id))]
pub async fn create_run(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<CreateRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.repos();

    repos
        .projects()
        .get(&project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project", &project_id))?;

    let plan_record = repos
        .plans()
        .get_for_project(&request.plan_id, &project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Plan", &request.plan_id))?;

    let plan = Plan::from_value(&plan_record.plan_json)
        .map_err(|e| ApiError::bad_request(format!("stored plan is invalid: {e}")))?;

    // Consistency check on the transition table before materializing state.
    require_transition(RunStatus::Pending, RunStatus::Planned)?;
    require_transition(RunStatus::Planned, RunStatus::AwaitingReview)?;

    let sandbox_meta = serde_json::to_value(SandboxMeta::default())
        .map_err(|e| ApiError::internal(format!("sandbox meta serialization failed: {e}")))?;

    let run = repos
        .runs()
        .create(CreateRun {
            id: RunId::new().to_string(),
            project_id,
            plan_id: plan_record.id.clone(),
            status: RunStatus::AwaitingReview,
            sandbox_meta,
            risk_level: plan.risk_level.as_str().to_string(),
        })
        .await?;

    for flat in plan.flatten_commands() {
        repos
            .steps()
            .create(CreateRunStep {
                id: StepId::new().to_string(),
                run_id: run.id.clone(),
                step_no: flat.step_no,
                step_type: flat.step_type,
                command: flat.command,
                status: StepStatus::Queued,
            })
            .await?;
    }

    repos
        .audits()
        .append(CreateAudit::new(
            run.id.clone(),
            actor::USER,
            action::RUN_CREATED,
            json!({"plan_id": plan_record.id}),
        ))
        .await?;

    info!(run_id = %run.id, "Run created, awaiting review");
    Ok(Json(RunActionResponse {
        run_id: run.id,
        status: run.status,
    }))
}

/// Approve a reviewed run and dispatch it to the worker
#[instrument(skip(state), fields(run_id = %run_id))]
pub async fn approve_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.repos();
    let run = get_run_or_404(&state, &run_id).await?;

    require_transition(run.status, RunStatus::Running)?;

    let updated = repos
        .runs()
        .update(
            &run_id,
            UpdateRun {
                status: Some(RunStatus::Running),
                started_at: Some(time::now()),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::internal("Failed to update run"))?;

    repos
        .audits()
        .append(CreateAudit::new(
            run_id.clone(),
            actor::USER,
            action::RUN_APPROVED,
            json!({}),
        ))
        .await?;

    // Status is committed before the enqueue so the worker sees RUNNING.
    state.enqueue_run(&run_id).await?;

    info!(run_id = %run_id, "Run approved and enqueued");
    Ok(Json(RunActionResponse {
        run_id: updated.id,
        status: updated.status,
    }))
}

/// Cancel a run. Advisory against an in-flight sandbox: the status flips,
/// but a step already executing is not killed.
#[instrument(skip(state), fields(run_id = %run_id))]
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.repos();
    let run = get_run_or_404(&state, &run_id).await?;

    require_transition(run.status, RunStatus::Cancelled)?;

    let updated = repos
        .runs()
        .update(
            &run_id,
            UpdateRun {
                status: Some(RunStatus::Cancelled),
                finished_at: Some(time::now()),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::internal("Failed to update run"))?;

    repos
        .audits()
        .append(CreateAudit::new(
            run_id.clone(),
            actor::USER,
            action::RUN_CANCELLED,
            json!({}),
        ))
        .await?;

    info!(run_id = %run_id, "Run cancelled");
    Ok(Json(RunActionResponse {
        run_id: updated.id,
        status: updated.status,
    }))
}

/// Full view of a run: steps, audit trail, artifacts, and the textual
/// contents of the report/diff/audit artifacts when still on disk
#[instrument(skip(state), fields(run_id = %run_id))]
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.repos();
    let run = get_run_or_404(&state, &run_id).await?;

    let steps = repos.steps().list_by_run(&run_id).await?;
    let audits = repos.audits().list_by_run(&run_id).await?;
    let artifacts = repos.artifacts().list_by_run(&run_id).await?;

    let mut report_content = None;
    let mut diff_content = None;
    let mut audit_content = None;
    for artifact in &artifacts {
        let content = match tokio::fs::read(&artifact.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(path = %artifact.path, error = %e, "Artifact file unreadable");
                continue;
            }
        };
        match artifact.kind.as_str() {
            "report" => report_content = Some(content),
            "diff" => diff_content = Some(content),
            "audit" => audit_content = Some(content),
            _ => {}
        }
    }

    Ok(Json(RunDetailResponse {
        id: run.id,
        project_id: run.project_id,
        plan_id: run.plan_id,
        status: run.status,
        started_at: run.started_at.map(|t| t.to_rfc3339()),
        finished_at: run.finished_at.map(|t| t.to_rfc3339()),
        sandbox_meta: run.sandbox_meta,
        risk_level: run.risk_level,
        steps,
        audits,
        artifacts,
        report_content,
        diff_content,
        audit_content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_transition_allows_legal_moves() {
        assert!(require_transition(RunStatus::AwaitingReview, RunStatus::Running).is_ok());
        assert!(require_transition(RunStatus::Pending, RunStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_require_transition_rejects_with_exact_message() {
        let err = require_transition(RunStatus::Pending, RunStatus::Running).unwrap_err();
        assert_eq!(err.message, "invalid transition PENDING -> RUNNING");

        let err = require_transition(RunStatus::Succeeded, RunStatus::Cancelled).unwrap_err();
        assert_eq!(err.message, "invalid transition SUCCEEDED -> CANCELLED");
    }
}
