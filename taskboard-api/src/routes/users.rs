/// User directory
///
/// - `GET /v1/users?limit=&offset=` - public profiles, for picking members
/// - `GET /v1/users/:id` - one profile
/// - `PATCH /v1/users/me` - change own display name

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, AppPath, AppQuery},
};
use axum::{
    extract::State,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserProfile},
};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> ApiResult<Json<UserListResponse>> {
    let (limit, offset) = query.page();
    let users = User::list_profiles(&state.db, limit, offset).await?;

    Ok(Json(UserListResponse { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateMeRequest>,
) -> ApiResult<Json<UserProfile>> {
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Name is required"));
    }

    let user = User::update_name(&state.db, auth.user_id, name)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
