/// Notification outbox model
///
/// The API inserts `pending` rows; the worker claims them, delivers them and
/// moves them to `sent` or, after `max_attempts` failures, to `failed`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE notification_status AS ENUM ('pending', 'processing', 'sent', 'failed');
///
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     recipient_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     kind VARCHAR(50) NOT NULL,
///     payload JSONB NOT NULL DEFAULT '{}',
///     status notification_status NOT NULL DEFAULT 'pending',
///     attempts INTEGER NOT NULL DEFAULT 0,
///     max_attempts INTEGER NOT NULL DEFAULT 5,
///     last_error TEXT,
///     available_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     locked_until TIMESTAMPTZ,
///     sent_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Waiting for delivery (possibly after a failed attempt)
    Pending,

    /// Claimed by a worker until `locked_until`
    Processing,

    /// Delivered
    Sent,

    /// Gave up after `max_attempts`
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: NotificationStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub available_at: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
}

pub const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, payload, status, attempts, \
                                        max_attempts, last_error, available_at, locked_until, \
                                        sent_at, created_at";

impl Notification {
    /// Queues a notification for delivery
    pub async fn enqueue(pool: &PgPool, data: NewNotification) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO notifications (recipient_id, kind, payload) VALUES ($1, $2, $3) \
             RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(data.recipient_id)
            .bind(data.kind)
            .bind(data.payload)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Notifications addressed to a user, newest first
    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(recipient_id)
            .fetch_all(pool)
            .await
    }
}
