/// Comment model and database operations
///
/// Comments hang off a task and are deleted with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment with its author's display name
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,

    pub author_name: String,
}

/// A comment together with the project that owns its task
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentScope {
    #[sqlx(flatten)]
    pub comment: Comment,

    pub project_id: Uuid,
}

impl Comment {
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    /// Loads a comment and the project id it belongs to through its task
    pub async fn find_with_scope(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<CommentScope>, sqlx::Error> {
        sqlx::query_as::<_, CommentScope>(
            r#"
            SELECT c.id, c.task_id, c.author_id, c.content, c.created_at, c.updated_at,
                   t.project_id
            FROM comments c
            JOIN tasks t ON t.id = c.task_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Comments on a task, oldest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.task_id, c.author_id, c.content, c.created_at, c.updated_at,
                   u.name AS author_name
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.task_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
