//! Projects repository

use crate::models::{CreateProject, Project};
use crate::DbPool;
use tracing::instrument;

/// Repository for project operations
#[derive(Clone)]
pub struct ProjectsRepo {
    pool: DbPool,
}

impl ProjectsRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new project
    #[instrument(skip(self, project), fields(project_id = %project.id))]
    pub async fn create(&self, project: CreateProject) -> Result<Project, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, root_path)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.root_path)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a project by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List projects, newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
    }
}
