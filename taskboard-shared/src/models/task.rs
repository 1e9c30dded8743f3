/// Task model and database operations
///
/// Tasks belong to exactly one project and are removed with it. `status` is an
/// open vocabulary: any non-empty label is stored as given.
///
/// Reads are always scoped to the projects the caller is a member of; see
/// [`Task::find_visible`] and [`Task::list_visible`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status VARCHAR(50) NOT NULL DEFAULT 'todo',
///     priority VARCHAR(20) DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Status given to tasks created without one
pub const DEFAULT_TASK_STATUS: &str = "todo";

/// Priority given to tasks created without one
pub const DEFAULT_TASK_PRIORITY: &str = "medium";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,

    /// Workflow label, e.g. "todo", "in_progress", "done"
    pub status: String,

    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// Partial update; `None` leaves a field unchanged, `Some(None)` clears it
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<Uuid>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.assignee_id.is_none()
    }
}

/// Optional filters for listing tasks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<String>,
    pub assignee_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, project_id, assignee_id, title, description, status, priority, \
                            due_date, created_at, updated_at";

impl Task {
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO tasks (project_id, assignee_id, title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, COALESCE($5, '{}'), COALESCE($6, '{}'), $7)
            RETURNING {}
            "#,
            DEFAULT_TASK_STATUS, DEFAULT_TASK_PRIORITY, TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.assignee_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.due_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a task only if `user_id` is a member of its project
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.assignee_id, t.title, t.description, t.status,
                   t.priority, t.due_date, t.created_at, t.updated_at
            FROM tasks t
            JOIN project_members m ON m.project_id = t.project_id
            WHERE t.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Tasks in the projects `user_id` belongs to, newest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT t.id, t.project_id, t.assignee_id, t.title, t.description, t.status,
                   t.priority, t.due_date, t.created_at, t.updated_at
            FROM tasks t
            JOIN project_members m ON m.project_id = t.project_id
            WHERE m.user_id = "#,
        );
        query.push_bind(user_id);

        if let Some(project_id) = filter.project_id {
            query.push(" AND t.project_id = ").push_bind(project_id);
        }
        if let Some(status) = &filter.status {
            query.push(" AND t.status = ").push_bind(status.clone());
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND t.assignee_id = ").push_bind(assignee_id);
        }

        query.push(" ORDER BY t.created_at DESC");

        query.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Applies a partial update, returning the new row or `None` if absent
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = data.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assignee_id) = data.assignee_id {
            query.push(", assignee_id = ").push_bind(assignee_id);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await
    }
}
