/// Notification side effects of task lifecycle operations
///
/// Lifecycle services depend on the [`Notifier`] trait rather than on a mail
/// client. The production implementation, [`OutboxNotifier`], only records a
/// row in the `notifications` table; delivery happens later in the worker,
/// which retries until the mailer succeeds or attempts run out.
///
/// Callers treat a notifier error as non-fatal: the triggering write has
/// already committed, so the error is logged and dropped.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::notify::{Notifier, OutboxNotifier, TaskAssigned};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, assignee: Uuid, event: TaskAssigned) {
/// let notifier: Arc<dyn Notifier> = Arc::new(OutboxNotifier::new(pool));
/// if let Err(e) = notifier.task_assigned(assignee, event).await {
///     tracing::warn!(error = %e, "could not queue notification");
/// }
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification};

/// `kind` of the notification sent when a task gets an assignee
pub const TASK_ASSIGNED: &str = "task_assigned";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to serialize notification payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Failed to queue notification: {0}")]
    Queue(#[from] sqlx::Error),
}

/// Payload of a [`TASK_ASSIGNED`] notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssigned {
    pub task_id: Uuid,
    pub task_title: String,
    pub project_id: Uuid,

    /// Actor who made the assignment
    pub assigned_by: Uuid,
}

/// Sink for notifications triggered by lifecycle operations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A task was assigned to `recipient`
    async fn task_assigned(&self, recipient: Uuid, event: TaskAssigned) -> Result<(), NotifyError>;
}

/// Writes notifications to the outbox table for the worker to deliver
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    pool: PgPool,
}

impl OutboxNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn task_assigned(&self, recipient: Uuid, event: TaskAssigned) -> Result<(), NotifyError> {
        let task_id = event.task_id;
        let notification = Notification::enqueue(
            &self.pool,
            NewNotification {
                recipient_id: recipient,
                kind: TASK_ASSIGNED.to_string(),
                payload: serde_json::to_value(event)?,
            },
        )
        .await?;

        debug!(
            notification_id = %notification.id,
            task_id = %task_id,
            recipient_id = %recipient,
            "Queued task assignment notification"
        );
        Ok(())
    }
}
