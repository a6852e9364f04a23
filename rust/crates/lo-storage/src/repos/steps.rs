//! Run steps repository

use crate::models::{CreateRunStep, RunStep, UpdateRunStep};
use crate::DbPool;
use tracing::instrument;

/// Repository for step operations
#[derive(Clone)]
pub struct StepsRepo {
    pool: DbPool,
}

impl StepsRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new step
    #[instrument(skip(self, step), fields(step_id = %step.id))]
    pub async fn create(&self, step: CreateRunStep) -> Result<RunStep, sqlx::Error> {
        sqlx::query_as::<_, RunStep>(
            r#"
            INSERT INTO run_steps (id, run_id, step_no, step_type, command, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&step.id)
        .bind(&step.run_id)
        .bind(step.step_no)
        .bind(&step.step_type)
        .bind(&step.command)
        .bind(step.status)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a step by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<RunStep>, sqlx::Error> {
        sqlx::query_as::<_, RunStep>("SELECT * FROM run_steps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Update a step
    #[instrument(skip(self, update), fields(step_id = %id))]
    pub async fn update(
        &self,
        id: &str,
        update: UpdateRunStep,
    ) -> Result<Option<RunStep>, sqlx::Error> {
        let mut set_clauses = Vec::new();
        let mut param_idx = 2;

        if update.status.is_some() {
            set_clauses.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if update.exit_code.is_some() {
            set_clauses.push(format!("exit_code = ${param_idx}"));
            param_idx += 1;
        }
        if update.started_at.is_some() {
            set_clauses.push(format!("started_at = ${param_idx}"));
            param_idx += 1;
        }
        if update.finished_at.is_some() {
            set_clauses.push(format!("finished_at = ${param_idx}"));
            param_idx += 1;
        }
        if update.stdout_path.is_some() {
            set_clauses.push(format!("stdout_path = ${param_idx}"));
            param_idx += 1;
        }
        if update.stderr_path.is_some() {
            set_clauses.push(format!("stderr_path = ${param_idx}"));
        }

        if set_clauses.is_empty() {
            return self.get(id).await;
        }

        let query = format!(
            "UPDATE run_steps SET {} WHERE id = $1 RETURNING *",
            set_clauses.join(", ")
        );

        let mut q = sqlx::query_as::<_, RunStep>(&query).bind(id);

        if let Some(status) = update.status {
            q = q.bind(status);
        }
        if let Some(exit_code) = update.exit_code {
            q = q.bind(exit_code);
        }
        if let Some(started) = update.started_at {
            q = q.bind(started);
        }
        if let Some(finished) = update.finished_at {
            q = q.bind(finished);
        }
        if let Some(stdout_path) = update.stdout_path {
            q = q.bind(stdout_path);
        }
        if let Some(stderr_path) = update.stderr_path {
            q = q.bind(stderr_path);
        }

        q.fetch_optional(&self.pool).await
    }

    /// List steps for a run in step_no order
    #[instrument(skip(self))]
    pub async fn list_by_run(&self, run_id: &str) -> Result<Vec<RunStep>, sqlx::Error> {
        sqlx::query_as::<_, RunStep>(
            r#"
            SELECT * FROM run_steps
            WHERE run_id = $1
            ORDER BY step_no ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
    }
}
