/// Project membership endpoints
///
/// ```text
/// GET    /v1/projects/:id/members            any member
/// POST   /v1/projects/:id/members            admin; { user_id, role? }
/// PATCH  /v1/projects/:id/members/:user_id   admin; { role }
/// DELETE /v1/projects/:id/members/:user_id   admin, or the member themself
/// ```
///
/// `role` is one of `admin`, `manager`, `member` (`owner` is read as
/// `admin`). The last admin of a project can neither leave nor be demoted.

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
    models::project_member::{MemberDetail, ProjectMember, ProjectRole},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// Defaults to `member`
    #[serde(default)]
    pub role: Option<ProjectRole>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: ProjectRole,
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberDetail>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub message: String,
    pub member: ProjectMember,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(project_id): AppPath<Uuid>,
) -> ApiResult<Json<MemberListResponse>> {
    let members = state.members().list(auth.user_id, project_id).await?;
    Ok(Json(MemberListResponse { members }))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(req): AppJson<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let member = state
        .members()
        .add(
            auth.user_id,
            project_id,
            req.user_id,
            req.role.unwrap_or(ProjectRole::Member),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            message: "Member added successfully".to_string(),
            member,
        }),
    ))
}

pub async fn change_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((project_id, user_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<ChangeRoleRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let member = state
        .members()
        .change_role(auth.user_id, project_id, user_id, req.role)
        .await?;

    Ok(Json(MemberResponse {
        message: "Member role updated".to_string(),
        member,
    }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath((project_id, user_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .members()
        .remove(auth.user_id, project_id, user_id)
        .await?;

    Ok(Json(MessageResponse::new("Member removed successfully")))
}
