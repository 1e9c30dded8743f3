/// Project endpoints
///
/// ```text
/// GET    /v1/projects        projects the caller belongs to
/// POST   /v1/projects        create; the caller becomes admin (201)
/// GET    /v1/projects/:id    404 unless the caller is a member
/// PUT    /v1/projects/:id    admin only (PATCH is identical)
/// DELETE /v1/projects/:id    admin only; removes tasks, comments and members
/// ```

use crate::{
    app::AppState,
    error::{ApiResult, AppJson, AppPath},
    routes::{due_date, MessageResponse},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{
        double_option,
        project::{ProjectWithRole, UpdateProject},
    },
    services::projects::NewProject,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(max = 100, message = "Project name must be at most 100 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub due_date: Option<String>,

    #[validate(length(max = 50, message = "Status must be at most 50 characters"))]
    pub status: Option<String>,
}

/// Absent fields are left alone; `null` clears `description` or `due_date`
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(max = 100, message = "Project name must be at most 100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,

    #[validate(length(max = 50, message = "Status must be at most 50 characters"))]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectWithRole>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProjectListResponse>> {
    let projects = state.projects().list(auth.user_id).await?;
    Ok(Json(ProjectListResponse { projects }))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectWithRole>)> {
    req.validate()?;

    let project = state
        .projects()
        .create(
            auth.user_id,
            NewProject {
                due_date: due_date(req.due_date.as_deref())?,
                name: req.name,
                description: req.description,
                status: req.status,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ProjectWithRole>> {
    Ok(Json(state.projects().get(auth.user_id, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectWithRole>> {
    req.validate()?;

    let due = match req.due_date {
        None => None,
        Some(value) => Some(due_date(value.as_deref())?),
    };

    let changes = UpdateProject {
        name: req.name,
        description: req.description,
        due_date: due,
        status: req.status,
    };

    Ok(Json(state.projects().update(auth.user_id, id, changes).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.projects().delete(auth.user_id, id).await?;
    Ok(Json(MessageResponse::new("Project deleted successfully")))
}
