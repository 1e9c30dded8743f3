/// Project model and database operations
///
/// Deleting a project cascades to its tasks (and their comments) and to its
/// memberships through `ON DELETE CASCADE` foreign keys.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     status VARCHAR(50) NOT NULL DEFAULT 'active',
///     manager_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::project_member::ProjectRole;

/// Default status of a new project
pub const DEFAULT_PROJECT_STATUS: &str = "active";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,

    /// Free-text status label
    pub status: String,

    /// The user who created the project
    pub manager_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project as seen by one member, with that member's role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectWithRole {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    /// The viewing user's role
    pub role: ProjectRole,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub manager_id: Uuid,
}

/// Partial update; `None` leaves a field unchanged, `Some(None)` clears it
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<String>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, description, due_date, status, manager_id, created_at, updated_at";

impl Project {
    /// Inserts a project
    ///
    /// Runs on any executor; callers create the creator's membership in the
    /// same transaction.
    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO projects (name, description, due_date, status, manager_id)
            VALUES ($1, $2, $3, COALESCE($4, '{}'), $5)
            RETURNING {}
            "#,
            DEFAULT_PROJECT_STATUS, PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&sql)
            .bind(data.name)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.manager_id)
            .fetch_one(executor)
            .await
    }

    /// Finds a project only if `user_id` is a member of it
    pub async fn find_for_member(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithRole>, sqlx::Error> {
        sqlx::query_as::<_, ProjectWithRole>(
            r#"
            SELECT p.id, p.name, p.description, p.due_date, p.status, p.manager_id,
                   p.created_at, p.updated_at, m.role
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE p.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// All projects `user_id` is a member of, newest first
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, sqlx::Error> {
        sqlx::query_as::<_, ProjectWithRole>(
            r#"
            SELECT p.id, p.name, p.description, p.due_date, p.status, p.manager_id,
                   p.created_at, p.updated_at, m.role
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update, returning the new row or `None` if absent
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(due_date) = data.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PROJECT_COLUMNS);

        query.build_query_as::<Project>().fetch_optional(pool).await
    }

    /// Deletes a project; tasks, comments and memberships go with it
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
