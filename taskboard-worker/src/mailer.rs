/// Outgoing mail transports
///
/// The dispatcher renders each notification into an [`EmailMessage`] and hands
/// it to a [`Mailer`]. Two transports ship with the worker:
///
/// - [`LogMailer`] writes the message to the log; the development default
/// - [`WebhookMailer`] POSTs the message as JSON to an HTTP endpoint, e.g. a
///   mail relay
///
/// # Example
///
/// ```no_run
/// use taskboard_worker::mailer::{EmailMessage, Mailer, WebhookMailer};
///
/// # async fn example() -> Result<(), taskboard_worker::mailer::MailerError> {
/// let mailer = WebhookMailer::new("https://mail.internal/send")?;
/// mailer.send(&EmailMessage {
///     from: "taskboard@example.com".to_string(),
///     to: "ada@example.com".to_string(),
///     to_name: "Ada".to_string(),
///     subject: "Hello".to_string(),
///     body: "Hi Ada".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Mail endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl MailerError {
    /// Whether trying again later could succeed
    ///
    /// Client errors other than 408 and 429 mean the request itself is bad.
    pub fn is_retryable(&self) -> bool {
        match self {
            MailerError::Http(_) => true,
            MailerError::Rejected { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// Logs messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email (log transport)"
        );
        tracing::debug!(body = %message.body, "Email body");
        Ok(())
    }
}

/// Delivers messages by POSTing them as JSON
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: impl Into<String>) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %message.to, status = status.as_u16(), "Email accepted by webhook");
        Ok(())
    }
}
