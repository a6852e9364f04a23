//! Artifact entity model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Artifact entity: a durable, content-addressed file produced by a run.
/// `sha256` is the hash of the bytes at `path` at record time; append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub run_id: String,
    pub kind: String,
    pub path: String,
    pub sha256: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Create artifact request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArtifact {
    pub id: String,
    pub run_id: String,
    pub kind: String,
    pub path: String,
    pub sha256: String,
    pub size: i64,
}
