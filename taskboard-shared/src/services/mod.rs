/// Lifecycle operations over the domain model
///
/// Each service is constructed with the handles it needs (pool, notifier) and
/// is cheap to clone. Services enforce the authorization rules of
/// [`crate::auth::authorization`], validate input and perform the writes;
/// they know nothing about HTTP.
///
/// # Visibility
///
/// Reads of project-scoped resources the actor cannot see fail with
/// [`ServiceError::NotFound`], exactly as if the resource did not exist.
/// Writes on a project the actor is not a member of fail with
/// [`ServiceError::Forbidden`] without checking whether the project exists.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::services::projects::{NewProject, ProjectService};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, actor: Uuid) -> Result<(), taskboard_shared::services::ServiceError> {
/// let projects = ProjectService::new(pool);
/// let created = projects.create(actor, NewProject {
///     name: "Apollo".to_string(),
///     ..Default::default()
/// }).await?;
/// assert_eq!(created.role.as_str(), "admin");
/// # Ok(())
/// # }
/// ```

use crate::auth::authorization::AuthzError;

pub mod comments;
pub mod members;
pub mod projects;
pub mod tasks;

/// Outcome taxonomy shared by all lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input, or a broken referential rule
    #[error("{0}")]
    Validation(String),

    /// Bad credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not permitted
    #[error("{0}")]
    Forbidden(String),

    /// Absent, or invisible to the actor
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) => {
                ServiceError::Forbidden("You are not a member of this project".to_string())
            }
            AuthzError::InsufficientRole {
                action, required, ..
            } => ServiceError::Forbidden(format!("Only project {} can {}", plural(required), action)),
            AuthzError::LastAdmin | AuthzError::NotAuthor => ServiceError::Forbidden(err.to_string()),
            AuthzError::DatabaseError(e) => ServiceError::Database(e),
        }
    }
}

fn plural(requirement: &str) -> String {
    match requirement {
        "admin or manager" => "admins or managers".to_string(),
        other => format!("{}s", other),
    }
}

/// Trims `value` and rejects it if empty or longer than `max` characters
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }

    Ok(value.to_string())
}
