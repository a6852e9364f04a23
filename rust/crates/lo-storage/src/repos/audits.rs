//! Audits repository

use crate::models::{Audit, CreateAudit};
use crate::DbPool;
use tracing::instrument;

/// Repository for audit operations. Append-only by construction: there is
/// no update or delete.
#[derive(Clone)]
pub struct AuditsRepo {
    pool: DbPool,
}

impl AuditsRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append an audit entry
    #[instrument(skip(self, audit), fields(run_id = %audit.run_id, action = %audit.action))]
    pub async fn append(&self, audit: CreateAudit) -> Result<Audit, sqlx::Error> {
        sqlx::query_as::<_, Audit>(
            r#"
            INSERT INTO audits (id, run_id, actor, action, payload_json)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&audit.id)
        .bind(&audit.run_id)
        .bind(&audit.actor)
        .bind(&audit.action)
        .bind(&audit.payload_json)
        .fetch_one(&self.pool)
        .await
    }

    /// List audit entries for a run in id order
    #[instrument(skip(self))]
    pub async fn list_by_run(&self, run_id: &str) -> Result<Vec<Audit>, sqlx::Error> {
        sqlx::query_as::<_, Audit>(
            r#"
            SELECT * FROM audits
            WHERE run_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
    }
}
