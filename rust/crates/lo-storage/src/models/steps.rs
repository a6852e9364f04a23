//! Run step entity model

use chrono::{DateTime, Utc};
use lo_state::StepStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Run step entity: a single shell command within a run.
///
/// `step_no` is dense and 1-based per run; `exit_code` is set iff the step
/// finished executing (SKIPPED steps carry neither exit code nor timestamps).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RunStep {
    pub id: String,
    pub run_id: String,
    pub step_no: i32,
    #[serde(rename = "type")]
    pub step_type: String,
    pub command: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

/// Create step request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunStep {
    pub id: String,
    pub run_id: String,
    pub step_no: i32,
    pub step_type: String,
    pub command: String,
    pub status: StepStatus,
}

/// Update step request; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRunStep {
    pub status: Option<StepStatus>,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}
