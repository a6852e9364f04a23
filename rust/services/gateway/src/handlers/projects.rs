//! Project handlers

use axum::{extract::State, response::IntoResponse, Json};
use lo_core::ProjectId;
use lo_storage::models::{CreateProject, Project};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use crate::handlers::{ApiError, ValidatedJson};
use crate::state::AppState;

// =============================================================================
// Request/Response DTOs
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(custom(function = validate_absolute_path))]
    pub root_path: String,
}

fn validate_absolute_path(root_path: &str) -> Result<(), ValidationError> {
    if std::path::Path::new(root_path).is_absolute() {
        Ok(())
    } else {
        let mut err = ValidationError::new("root_path");
        err.message = Some("root_path must be absolute".into());
        Err(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub root_path: String,
    pub created_at: String,
}

fn project_to_response(project: Project) -> ProjectResponse {
    ProjectResponse {
        id: project.id,
        name: project.name,
        root_path: project.root_path,
        created_at: project.created_at.to_rfc3339(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new project
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn create_project(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .repos()
        .projects()
        .create(CreateProject {
            id: ProjectId::new().to_string(),
            name: request.name,
            root_path: request.root_path,
        })
        .await?;

    info!(project_id = %project.id, "Project created");
    Ok(Json(project_to_response(project)))
}

/// List projects, newest first
#[instrument(skip(state))]
pub async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.repos().projects().list().await?;
    let projects: Vec<ProjectResponse> = projects.into_iter().map(project_to_response).collect();
    Ok(Json(projects))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_root_path_accepted() {
        assert!(validate_absolute_path("/tmp/demo").is_ok());
    }

    #[test]
    fn test_relative_root_path_rejected() {
        assert!(validate_absolute_path("demo").is_err());
        assert!(validate_absolute_path("./demo").is_err());
    }
}
