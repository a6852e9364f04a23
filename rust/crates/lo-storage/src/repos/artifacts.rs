//! Artifacts repository

use crate::models::{Artifact, CreateArtifact};
use crate::DbPool;
use tracing::instrument;

/// Repository for artifact operations. Append-only.
#[derive(Clone)]
pub struct ArtifactsRepo {
    pool: DbPool,
}

impl ArtifactsRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record an artifact
    #[instrument(skip(self, artifact), fields(run_id = %artifact.run_id, kind = %artifact.kind))]
    pub async fn create(&self, artifact: CreateArtifact) -> Result<Artifact, sqlx::Error> {
        sqlx::query_as::<_, Artifact>(
            r#"
            INSERT INTO artifacts (id, run_id, kind, path, sha256, size)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&artifact.id)
        .bind(&artifact.run_id)
        .bind(&artifact.kind)
        .bind(&artifact.path)
        .bind(&artifact.sha256)
        .bind(artifact.size)
        .fetch_one(&self.pool)
        .await
    }

    /// List artifacts for a run in id order
    #[instrument(skip(self))]
    pub async fn list_by_run(&self, run_id: &str) -> Result<Vec<Artifact>, sqlx::Error> {
        sqlx::query_as::<_, Artifact>(
            r#"
            SELECT * FROM artifacts
            WHERE run_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
    }
}
