/// Account endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` (alias `/signup`) - create an account
/// - `POST /v1/auth/login` - exchange credentials for tokens
/// - `POST /v1/auth/refresh` - exchange a refresh token for an access token
/// - `POST /v1/auth/logout` - revoke the presented tokens
/// - `GET /v1/auth/me` - current user
/// - `POST /v1/auth/change-password` - replace the password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        jwt::{self, Claims, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        revoked_token::RevokedToken,
        user::{CreateUser, User, UserProfile},
    },
};
use tracing::info;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returned by registration and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

fn weak_password(message: String) -> ApiError {
    ApiError::invalid_field("password", message)
}

/// Creates an account and signs the new user in
///
/// ```text
/// POST /v1/auth/register
/// { "name": "Ada", "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// 201 with `{ user, access_token, refresh_token, token_type, expires_in }`.
/// A taken email is a 400.
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Name is required"));
    }
    let email = req.email.trim();

    password::validate_password_strength(&req.password).map_err(weak_password)?;

    if User::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), state.config.jwt.lifetimes())?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// Signs a user in
///
/// Unknown email, wrong password and deactivated accounts are all 401.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is disabled".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), state.config.jwt.lifetimes())?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// Mints a new access token from a refresh token
///
/// The refresh token keeps its original expiry. Access tokens, revoked
/// refresh tokens and tokens of deactivated users are rejected with 401.
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if RevokedToken::is_revoked(&state.db, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
    }

    let active = User::find_by_id(&state.db, claims.sub)
        .await?
        .map(|u| u.is_active)
        .unwrap_or(false);
    if !active {
        return Err(ApiError::Unauthorized("Account is disabled".to_string()));
    }

    let lifetimes = state.config.jwt.lifetimes();
    let access = Claims::with_expiration(claims.sub, TokenType::Access, lifetimes.access);

    Ok(Json(RefreshResponse {
        access_token: jwt::create_token(&access, state.jwt_secret())?,
        token_type: "Bearer",
        expires_in: lifetimes.access.num_seconds(),
    }))
}

/// Revokes the access token that authenticated this request
///
/// A refresh token in the body is revoked as well; it must belong to the same
/// user.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<AppJson<LogoutRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let req = body.map(|AppJson(req)| req).unwrap_or_default();

    let refresh_claims = match req.refresh_token.as_deref() {
        Some(token) => {
            let claims = jwt::validate_refresh_token(token, state.jwt_secret())?;
            if claims.sub != auth.user_id {
                return Err(ApiError::Forbidden(
                    "Refresh token belongs to another user".to_string(),
                ));
            }
            Some(claims)
        }
        None => None,
    };

    RevokedToken::revoke(&state.db, auth.token_id, auth.user_id, auth.token_expires_at).await?;

    if let Some(claims) = refresh_claims {
        RevokedToken::revoke(&state.db, claims.jti, claims.sub, claims.expires_at()).await?;
    }

    info!(user_id = %auth.user_id, "User logged out");

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserProfile>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Replaces the caller's password after checking the current one (401 if wrong)
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_password_strength(&req.new_password).map_err(weak_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_short_password_rejected() {
        let req = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };

        let err: ApiError = req.validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details[0].field, "password");
                assert_eq!(details[0].message, "Password must be at least 8 characters");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_auth_response_flattens_tokens() {
        let response = AuthResponse {
            user: UserProfile {
                id: uuid::Uuid::new_v4(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: "user".to_string(),
                is_active: true,
            },
            tokens: TokenPair {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                token_type: "Bearer",
                expires_in: 60,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["access_token"], "a");
        assert_eq!(json["refresh_token"], "r");
        assert_eq!(json["user"]["name"], "Ada");
        assert!(json["user"].get("password_hash").is_none());
    }
}
