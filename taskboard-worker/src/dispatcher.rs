/// Notification dispatcher
///
/// Polls the notification queue, renders each claimed notification into an
/// email and sends it through the configured [`Mailer`].
///
/// ```text
/// Dispatcher::run
///   ├─> NotificationQueue::fail_abandoned
///   ├─> NotificationQueue::claim
///   ├─> compose (notification + recipient -> EmailMessage)
///   ├─> Mailer::send
///   └─> NotificationQueue::mark_sent / mark_failed
/// ```
///
/// The same loop periodically purges expired entries from the JWT blocklist.
/// `run` returns once its [`CancellationToken`] is cancelled; a delivery in
/// progress is finished first.

use std::sync::Arc;

use sqlx::PgPool;
use taskboard_shared::models::notification::{Notification, NotificationStatus};
use taskboard_shared::models::revoked_token::RevokedToken;
use taskboard_shared::models::user::User;
use taskboard_shared::notify::{TaskAssigned, TASK_ASSIGNED};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;
use crate::mailer::{EmailMessage, Mailer};
use crate::queue::{NotificationQueue, QueueError};

/// Why a notification could not be turned into an email
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Unknown notification kind: {0}")]
    UnknownKind(String),

    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Renders `notification` as an email to `recipient`
pub fn compose(
    notification: &Notification,
    recipient: &User,
    from: &str,
) -> Result<EmailMessage, ComposeError> {
    let (subject, body) = match notification.kind.as_str() {
        TASK_ASSIGNED => {
            let event: TaskAssigned = serde_json::from_value(notification.payload.clone())?;
            (
                format!("New task assigned: {}", event.task_title),
                format!(
                    "Hi {},\n\nYou have been assigned the task \"{}\".\n\nTask ID: {}\nProject ID: {}\n",
                    recipient.name, event.task_title, event.task_id, event.project_id
                ),
            )
        }
        other => return Err(ComposeError::UnknownKind(other.to_string())),
    };

    Ok(EmailMessage {
        from: from.to_string(),
        to: recipient.email.clone(),
        to_name: recipient.name.clone(),
        subject,
        body,
    })
}

/// Counts from one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    db: PgPool,
    queue: NotificationQueue,
    mailer: Arc<dyn Mailer>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>, config: DispatchConfig) -> Self {
        let queue = NotificationQueue::new(db.clone(), config.lease, config.max_attempts);

        Self {
            db,
            queue,
            mailer,
            config,
        }
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    /// Runs until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            mailer = self.mailer.name(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Notification dispatcher started"
        );

        let mut poll_timer = interval(self.config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut purge_timer = interval(self.config.purge_interval);
        purge_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                _ = poll_timer.tick() => {
                    self.drain(&shutdown).await;
                }
                _ = purge_timer.tick() => {
                    match RevokedToken::purge_expired(&self.db).await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "Purged expired revoked tokens"),
                        Err(e) => warn!(error = %e, "Failed to purge revoked tokens"),
                    }
                }
            }
        }

        info!("Notification dispatcher stopped");
    }

    /// Polls repeatedly while full batches keep coming
    async fn drain(&self, shutdown: &CancellationToken) {
        loop {
            match self.poll_once().await {
                Ok(stats) if stats.claimed as i64 >= self.config.batch_size => {
                    if shutdown.is_cancelled() {
                        break;
                    }
                }
                Ok(_) => break,
                Err(e) => {
                    error!(error = %e, "Failed to poll notification queue");
                    break;
                }
            }
        }
    }

    /// Claims one batch and attempts to deliver every notification in it
    pub async fn poll_once(&self) -> Result<DispatchStats, QueueError> {
        let abandoned = self.queue.fail_abandoned().await?;
        if abandoned > 0 {
            warn!(count = abandoned, "Failed notifications abandoned on their final attempt");
        }

        let claimed = self.queue.claim(self.config.batch_size).await?;
        let mut stats = DispatchStats {
            claimed: claimed.len(),
            ..Default::default()
        };

        for notification in claimed {
            match self.deliver(&notification).await {
                Ok(NotificationStatus::Sent) => stats.sent += 1,
                Ok(NotificationStatus::Pending) => stats.retried += 1,
                Ok(_) => stats.failed += 1,
                Err(QueueError::NotClaimed(id)) => {
                    warn!(notification_id = %id, "Lease lost before delivery was recorded");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }

    async fn deliver(&self, notification: &Notification) -> Result<NotificationStatus, QueueError> {
        let recipient = match User::find_by_id(&self.db, notification.recipient_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return self
                    .record_failure(notification, "Recipient not found", false)
                    .await
            }
            Err(e) => {
                return self
                    .record_failure(notification, &format!("Database error: {}", e), true)
                    .await
            }
        };

        let message = match compose(notification, &recipient, &self.config.mail_from) {
            Ok(message) => message,
            Err(e) => return self.record_failure(notification, &e.to_string(), false).await,
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                self.queue.mark_sent(notification.id).await?;
                info!(
                    notification_id = %notification.id,
                    kind = %notification.kind,
                    recipient_id = %notification.recipient_id,
                    "Notification sent"
                );
                Ok(NotificationStatus::Sent)
            }
            Err(e) => {
                self.record_failure(notification, &e.to_string(), e.is_retryable())
                    .await
            }
        }
    }

    async fn record_failure(
        &self,
        notification: &Notification,
        reason: &str,
        retryable: bool,
    ) -> Result<NotificationStatus, QueueError> {
        let status = self.queue.mark_failed(notification, reason, retryable).await?;

        if status == NotificationStatus::Failed {
            error!(
                notification_id = %notification.id,
                attempts = notification.attempts,
                error = %reason,
                "Notification delivery failed permanently"
            );
        } else {
            warn!(
                notification_id = %notification.id,
                attempts = notification.attempts,
                error = %reason,
                "Notification delivery failed; will retry"
            );
        }

        Ok(status)
    }
}
