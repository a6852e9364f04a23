//! Plans repository

use crate::models::{CreatePlan, PlanRecord};
use crate::DbPool;
use tracing::instrument;

/// Repository for plan operations
#[derive(Clone)]
pub struct PlansRepo {
    pool: DbPool,
}

impl PlansRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new plan
    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    pub async fn create(&self, plan: CreatePlan) -> Result<PlanRecord, sqlx::Error> {
        sqlx::query_as::<_, PlanRecord>(
            r#"
            INSERT INTO plans (id, project_id, intent_text, plan_json)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.project_id)
        .bind(&plan.intent_text)
        .bind(&plan.plan_json)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a plan by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<PlanRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlanRecord>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a plan scoped to a project
    #[instrument(skip(self))]
    pub async fn get_for_project(
        &self,
        id: &str,
        project_id: &str,
    ) -> Result<Option<PlanRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlanRecord>("SELECT * FROM plans WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }
}
