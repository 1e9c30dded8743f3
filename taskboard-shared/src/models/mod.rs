/// Database models for Taskboard
///
/// Each model owns its SQL. Methods take a `&PgPool` or, where they must
/// run inside a caller's transaction, any `sqlx::PgExecutor`.
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `project`: projects
/// - `project_member`: project memberships and roles
/// - `task`: tasks scoped to a project
/// - `comment`: comments on tasks
/// - `notification`: outbox rows consumed by the worker
/// - `revoked_token`: JWT blocklist
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{User, CreateUser};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Ada".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

pub mod comment;
pub mod notification;
pub mod project;
pub mod project_member;
pub mod revoked_token;
pub mod task;
pub mod user;

/// Deserializes a field that distinguishes "absent" from "explicitly null"
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes
/// `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses a due date given either as RFC 3339 or as a plain `YYYY-MM-DD`
///
/// Plain dates are taken as midnight UTC.
pub fn parse_due_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let null: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn test_parse_due_date_plain_date() {
        let d = parse_due_date("2025-03-14").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2025, 3, 14));
        assert_eq!(d.hour(), 0);
    }

    #[test]
    fn test_parse_due_date_rfc3339() {
        let d = parse_due_date("2025-03-14T10:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 8);
    }

    #[test]
    fn test_parse_due_date_rejects_garbage() {
        assert!(parse_due_date("tomorrow").is_none());
        assert!(parse_due_date("2025-13-40").is_none());
        assert!(parse_due_date("").is_none());
    }
}
