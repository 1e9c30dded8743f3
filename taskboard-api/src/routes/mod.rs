/// API route handlers, organized by resource
///
/// - `health`: health check
/// - `auth`: registration, login, token refresh, logout, password change
/// - `users`: user directory and own profile
/// - `projects`: project CRUD
/// - `members`: project membership
/// - `tasks`: task CRUD, status and assignment
/// - `comments`: task comments

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use taskboard_shared::models::parse_due_date;

pub mod auth;
pub mod comments;
pub mod health;
pub mod members;
pub mod projects;
pub mod tasks;
pub mod users;

/// Body of responses that only confirm an action
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parses an optional `due_date` field; unparseable input is a 400
pub(crate) fn due_date(value: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_due_date(raw).map(Some).ok_or_else(|| {
            ApiError::invalid_field(
                "due_date",
                "Invalid due_date; use RFC 3339 or YYYY-MM-DD",
            )
        }),
    }
}
