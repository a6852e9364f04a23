//! Run entity model

use chrono::{DateTime, Utc};
use lo_state::RunStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Run entity: one execution of a plan against a project workspace.
///
/// `started_at` is set when the run first moves to RUNNING; `finished_at`
/// when it reaches a terminal state. `sandbox_meta` carries the runtime caps
/// enforced during execution.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub project_id: String,
    pub plan_id: Option<String>,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sandbox_meta: serde_json::Value,
    pub risk_level: String,
    pub created_at: DateTime<Utc>,
}

/// Create run request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRun {
    pub id: String,
    pub project_id: String,
    pub plan_id: String,
    pub status: RunStatus,
    pub sandbox_meta: serde_json::Value,
    pub risk_level: String,
}

/// Update run request; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRun {
    pub status: Option<RunStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
