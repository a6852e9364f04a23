//! Plan entity model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Plan entity. `plan_json` is a validated `lo_core::Plan` document;
/// once a run references the plan it is immutable.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub project_id: String,
    pub intent_text: String,
    pub plan_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Create plan request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    pub id: String,
    pub project_id: String,
    pub intent_text: String,
    pub plan_json: serde_json::Value,
}
