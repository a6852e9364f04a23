//! Runs repository

use crate::models::{CreateRun, Run, UpdateRun};
use crate::DbPool;
use tracing::instrument;

/// Repository for run operations
#[derive(Clone)]
pub struct RunsRepo {
    pool: DbPool,
}

impl RunsRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new run
    #[instrument(skip(self, run), fields(run_id = %run.id))]
    pub async fn create(&self, run: CreateRun) -> Result<Run, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            r#"
            INSERT INTO runs (id, project_id, plan_id, status, sandbox_meta, risk_level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&run.id)
        .bind(&run.project_id)
        .bind(&run.plan_id)
        .bind(run.status)
        .bind(&run.sandbox_meta)
        .bind(&run.risk_level)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a run by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<Run>, sqlx::Error> {
        sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Update a run
    #[instrument(skip(self, update), fields(run_id = %id))]
    pub async fn update(&self, id: &str, update: UpdateRun) -> Result<Option<Run>, sqlx::Error> {
        // Build dynamic update query
        let mut set_clauses = Vec::new();
        let mut param_idx = 2; // $1 is the id

        if update.status.is_some() {
            set_clauses.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if update.started_at.is_some() {
            set_clauses.push(format!("started_at = ${param_idx}"));
            param_idx += 1;
        }
        if update.finished_at.is_some() {
            set_clauses.push(format!("finished_at = ${param_idx}"));
        }

        if set_clauses.is_empty() {
            return self.get(id).await;
        }

        let query = format!(
            "UPDATE runs SET {} WHERE id = $1 RETURNING *",
            set_clauses.join(", ")
        );

        let mut q = sqlx::query_as::<_, Run>(&query).bind(id);

        if let Some(status) = update.status {
            q = q.bind(status);
        }
        if let Some(started) = update.started_at {
            q = q.bind(started);
        }
        if let Some(finished) = update.finished_at {
            q = q.bind(finished);
        }

        q.fetch_optional(&self.pool).await
    }

    /// List runs for a project, newest first
    #[instrument(skip(self))]
    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Run>, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            r#"
            SELECT * FROM runs
            WHERE project_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }
}
