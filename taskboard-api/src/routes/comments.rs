/// Comment endpoints
///
/// - `GET|POST /v1/tasks/:id/comments` - members of the task's project
/// - `GET /v1/comments/:id` - members of the owning project
/// - `PUT /v1/comments/:id` - the author only
/// - `DELETE /v1/comments/:id` - the author, or a project admin/manager

use crate::{
    app::AppState,
    error::{ApiResult, AppJson, AppPath},
    routes::MessageResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::comment::{Comment, CommentWithAuthor},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(max = 5000, message = "Content must be at most 5000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentWithAuthor>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(task_id): AppPath<Uuid>,
) -> ApiResult<Json<CommentListResponse>> {
    let comments = state.comments().list(auth.user_id, task_id).await?;
    Ok(Json(CommentListResponse { comments }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = state
        .comments()
        .create(auth.user_id, task_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.comments().get(auth.user_id, id).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    req.validate()?;

    Ok(Json(
        state
            .comments()
            .update(auth.user_id, id, &req.content)
            .await?,
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.comments().delete(auth.user_id, id).await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}
