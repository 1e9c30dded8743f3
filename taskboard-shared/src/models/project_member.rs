/// Project membership model and database operations
///
/// A membership links one user to one project with a [`ProjectRole`]. It is
/// the only basis for project-scoped authorization: a user with no row for a
/// project cannot see it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'manager', 'member');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Role Hierarchy
///
/// 1. **Admin**: full control of the project and its membership
/// 2. **Manager**: may delete tasks and moderate comments
/// 3. **Member**: may read and work on tasks
///
/// The legacy label `"owner"` is accepted on input as an alias of `admin`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of a user within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Manages the project, its fields and its members
    #[serde(alias = "owner")]
    Admin,

    /// Elevated tier that may delete tasks
    Manager,

    /// Regular participant
    Member,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Manager => "manager",
            ProjectRole::Member => "member",
        }
    }

    /// Admin or manager
    pub fn is_elevated(&self) -> bool {
        matches!(self, ProjectRole::Admin | ProjectRole::Manager)
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Ok(ProjectRole::Admin),
            "manager" => Ok(ProjectRole::Manager),
            "member" => Ok(ProjectRole::Member),
            other => Err(format!("Unknown project role: {}", other)),
        }
    }
}

/// A membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// A membership joined with the member's public profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberDetail {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

impl ProjectMember {
    /// Inserts a membership
    ///
    /// Takes any executor so project creation can run it in the same
    /// transaction as the project insert.
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    /// Role of `user_id` in `project_id`, or `None` if not a member
    pub async fn get_role<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn is_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM project_members
                WHERE project_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update_role<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Locks the project's admin rows and returns how many there are
    ///
    /// Must run inside a transaction. Concurrent removals or demotions of
    /// admins on the same project serialize on these row locks, so two admins
    /// cannot both leave and strand the project.
    pub async fn lock_admin_count<'e, E>(executor: E, project_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let admins: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM project_members
            WHERE project_id = $1 AND role = 'admin'
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;

        Ok(admins.len() as i64)
    }

    pub async fn count_by_role(
        pool: &PgPool,
        project_id: Uuid,
        role: ProjectRole,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = $2",
        )
        .bind(project_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Members of a project with their profiles, oldest first
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberDetail>, sqlx::Error> {
        sqlx::query_as::<_, MemberDetail>(
            r#"
            SELECT m.user_id, u.name, u.email::TEXT AS email, m.role, m.created_at AS joined_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}
