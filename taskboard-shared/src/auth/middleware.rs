/// Request authentication context
///
/// The API's JWT layer validates the bearer token and inserts an
/// [`AuthContext`] into the request extensions. Handlers then take
/// `Extension<AuthContext>` to learn who the actor is.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Json};
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> Json<String> {
///     Json(auth.user_id.to_string())
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Claims;

/// The authenticated actor of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user
    pub user_id: Uuid,

    /// `jti` of the access token that authenticated the request
    pub token_id: Uuid,

    /// When that access token expires
    pub token_expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            token_id: claims.jti,
            token_expires_at: claims.expires_at(),
        }
    }
}

/// Failure to extract credentials from a request
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Malformed authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}
