/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks?project_id=&status=&assignee_id=` - tasks in the caller's
///   projects, newest first
/// - `POST /v1/tasks` - create in a project the caller belongs to (201)
/// - `GET|PUT|PATCH /v1/tasks/:id` - any member of the task's project
/// - `DELETE /v1/tasks/:id` - project admins and managers
/// - `PATCH /v1/tasks/:id/status` - `{ "status": "done" }`
/// - `PATCH /v1/tasks/:id/assign` - `{ "assignee_id": "<uuid>" | null }`
///
/// Assigning a task to someone other than the caller queues a notification
/// for the assignee.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, AppPath, AppQuery},
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
        task::{Task, TaskFilter, UpdateTask},
    },
    services::tasks::NewTask,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Option<Uuid>,

    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(length(max = 50, message = "Status must be at most 50 characters"))]
    pub status: Option<String>,

    #[validate(length(max = 20, message = "Priority must be at most 20 characters"))]
    pub priority: Option<String>,

    pub due_date: Option<String>,

    pub assignee_id: Option<Uuid>,
}

/// Absent fields are left alone; `null` clears the nullable ones
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[validate(length(max = 50, message = "Status must be at most 50 characters"))]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(filter): AppQuery<TaskFilter>,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = state.tasks().list(auth.user_id, &filter).await?;
    Ok(Json(TaskListResponse { tasks }))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let project_id = req
        .project_id
        .ok_or_else(|| ApiError::invalid_field("project_id", "Project ID is required"))?;

    let task = state
        .tasks()
        .create(
            auth.user_id,
            NewTask {
                project_id,
                due_date: due_date(req.due_date.as_deref())?,
                title: req.title,
                description: req.description,
                status: req.status,
                priority: req.priority,
                assignee_id: req.assignee_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks().get(auth.user_id, id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let due = match req.due_date {
        None => None,
        Some(value) => Some(due_date(value.as_deref())?),
    };

    let changes = UpdateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        due_date: due,
        assignee_id: req.assignee_id,
    };

    Ok(Json(state.tasks().update(auth.user_id, id, changes).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<StatusRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(
        state.tasks().set_status(auth.user_id, id, req.status).await?,
    ))
}

pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<AssignRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(
        state
            .tasks()
            .assign(auth.user_id, id, req.assignee_id)
            .await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.tasks().delete(auth.user_id, id).await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
