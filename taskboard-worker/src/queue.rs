/// Notification queue
///
/// The `notifications` table doubles as a work queue. Rows move through
///
/// ```text
/// pending ──claim──> processing ──mark_sent──> sent
///    ^                   │
///    └──mark_failed──────┤ (attempts left, after a backoff delay)
///                        └──mark_failed──> failed (attempts exhausted)
/// ```
///
/// Claiming uses `FOR UPDATE SKIP LOCKED`, so several workers can poll the
/// same table without handing out a row twice. A claim holds a lease until
/// `locked_until`; a row whose lease expired (the worker died mid-delivery)
/// becomes claimable again. Delivery is therefore at-least-once.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use taskboard_worker::queue::NotificationQueue;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), taskboard_worker::queue::QueueError> {
/// let queue = NotificationQueue::new(pool, Duration::from_secs(300), 5);
/// for notification in queue.claim(20).await? {
///     // deliver...
///     queue.mark_sent(notification.id).await?;
/// }
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use sqlx::PgPool;
use taskboard_shared::models::notification::{
    Notification, NotificationStatus, NOTIFICATION_COLUMNS,
};
use thiserror::Error;
use uuid::Uuid;

/// Delay before the first retry
pub const BASE_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Upper bound on the delay between retries
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row is no longer held by this worker's lease
    #[error("Notification {0} is not claimed")]
    NotClaimed(Uuid),
}

/// Delay before retrying after the `attempt`-th failed delivery
///
/// Doubles from [`BASE_RETRY_DELAY`] and is capped at [`MAX_RETRY_DELAY`].
pub fn retry_delay(attempt: i32) -> Duration {
    let exponent = attempt.saturating_sub(1).clamp(0, 16) as u32;
    BASE_RETRY_DELAY
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(MAX_RETRY_DELAY)
}

#[derive(Debug, Clone)]
pub struct NotificationQueue {
    db: PgPool,

    /// How long a claim is held before another worker may take the row
    lease: Duration,

    /// Worker-wide cap on attempts; a row's own `max_attempts` may be lower
    max_attempts: i32,
}

impl NotificationQueue {
    pub fn new(db: PgPool, lease: Duration, max_attempts: i32) -> Self {
        Self {
            db,
            lease,
            max_attempts,
        }
    }

    /// Claims up to `limit` due notifications, oldest first
    ///
    /// Each claimed row is moved to `processing`, has its attempt counter
    /// incremented and is leased to the caller.
    pub async fn claim(&self, limit: i64) -> Result<Vec<Notification>, QueueError> {
        let sql = format!(
            r#"
            WITH due AS (
                SELECT id
                FROM notifications
                WHERE attempts < LEAST(max_attempts, $3)
                  AND (
                      (status = 'pending' AND available_at <= NOW())
                      OR (status = 'processing' AND locked_until < NOW())
                  )
                ORDER BY available_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE notifications
            SET
                status = 'processing',
                attempts = attempts + 1,
                locked_until = NOW() + ($2::BIGINT * INTERVAL '1 second')
            WHERE id IN (SELECT id FROM due)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let claimed = sqlx::query_as::<_, Notification>(&sql)
            .bind(limit)
            .bind(self.lease.as_secs() as i64)
            .bind(self.max_attempts)
            .fetch_all(&self.db)
            .await?;

        if !claimed.is_empty() {
            tracing::debug!(count = claimed.len(), "Claimed notifications");
        }

        Ok(claimed)
    }

    /// Records a successful delivery
    pub async fn mark_sent(&self, id: Uuid) -> Result<(), QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET
                status = 'sent',
                sent_at = NOW(),
                locked_until = NULL,
                last_error = NULL
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::NotClaimed(id));
        }

        Ok(())
    }

    /// Records a failed delivery
    ///
    /// The row goes back to `pending` after [`retry_delay`] while attempts
    /// remain and `retryable` is set; otherwise it becomes `failed`. Returns
    /// the new status.
    pub async fn mark_failed(
        &self,
        notification: &Notification,
        error: &str,
        retryable: bool,
    ) -> Result<NotificationStatus, QueueError> {
        let delay = retry_delay(notification.attempts);

        let status = sqlx::query_scalar::<_, NotificationStatus>(
            r#"
            UPDATE notifications
            SET
                status = CASE
                    WHEN NOT $3 OR attempts >= LEAST(max_attempts, $4)
                        THEN 'failed'::notification_status
                    ELSE 'pending'::notification_status
                END,
                last_error = $2,
                locked_until = NULL,
                available_at = NOW() + ($5::BIGINT * INTERVAL '1 second')
            WHERE id = $1 AND status = 'processing'
            RETURNING status
            "#,
        )
        .bind(notification.id)
        .bind(error)
        .bind(retryable)
        .bind(self.max_attempts)
        .bind(delay.as_secs() as i64)
        .fetch_optional(&self.db)
        .await?
        .ok_or(QueueError::NotClaimed(notification.id))?;

        Ok(status)
    }

    /// Fails rows whose lease expired on their final attempt
    ///
    /// Such rows can never be claimed again, so without this they would stay
    /// `processing` forever.
    pub async fn fail_abandoned(&self) -> Result<u64, QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET
                status = 'failed',
                locked_until = NULL,
                last_error = COALESCE(last_error, 'Lease expired on final attempt')
            WHERE status = 'processing'
              AND locked_until < NOW()
              AND attempts >= LEAST(max_attempts, $1)
            "#,
        )
        .bind(self.max_attempts)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Number of rows in `status`
    pub async fn count(&self, status: NotificationStatus) -> Result<i64, QueueError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE status = $1")
            .bind(status)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
