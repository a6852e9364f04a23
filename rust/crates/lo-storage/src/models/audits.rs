//! Audit entity model
//!
//! Audits are append-only; ordering per run is given by the (time-ordered)
//! id. Known actions use structured payloads built at the call sites; the
//! column itself stays free-form JSON as the escape hatch.

use chrono::{DateTime, Utc};
use lo_core::AuditId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit entity
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub run_id: String,
    pub actor: String,
    pub action: String,
    pub payload_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Create audit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAudit {
    pub id: String,
    pub run_id: String,
    pub actor: String,
    pub action: String,
    pub payload_json: serde_json::Value,
}

impl CreateAudit {
    pub fn new(
        run_id: impl Into<String>,
        actor: &'static str,
        action: &'static str,
        payload_json: serde_json::Value,
    ) -> Self {
        Self {
            id: AuditId::new().to_string(),
            run_id: run_id.into(),
            actor: actor.to_string(),
            action: action.to_string(),
            payload_json,
        }
    }
}

/// Actors recorded on audit entries
pub mod actor {
    pub const USER: &str = "user";
    pub const WORKER: &str = "worker";
}

/// Audit actions
pub mod action {
    pub const RUN_CREATED: &str = "run.created";
    pub const RUN_APPROVED: &str = "run.approved";
    pub const RUN_CANCELLED: &str = "run.cancelled";
    pub const RUN_COMPLETED: &str = "run.completed";
    pub const RUN_FAILED: &str = "run.failed";

    pub const STEP_EXECUTED: &str = "step.executed";
    pub const COMMAND_BLOCKED: &str = "command.blocked";

    pub const ARTIFACT_FAILED: &str = "artifact.failed";
}
