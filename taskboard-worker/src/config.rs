/// Worker configuration
///
/// Read from the environment after loading `.env` when present.
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | `5` |
/// | `NOTIFY_POLL_INTERVAL_SECS` | `2` |
/// | `NOTIFY_BATCH_SIZE` | `20` |
/// | `NOTIFY_MAX_ATTEMPTS` | `5` |
/// | `NOTIFY_LEASE_SECS` | `300` |
/// | `REVOKED_TOKEN_PURGE_SECS` | `3600` |
/// | `MAILER` | `log` (`log` or `webhook`) |
/// | `MAILER_WEBHOOK_URL` | required when `MAILER=webhook` |
/// | `MAIL_FROM` | `taskboard@localhost` |

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub dispatch: DispatchConfig,
    pub mailer: MailerConfig,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Pause between polls when the queue is empty
    pub poll_interval: Duration,

    /// Notifications claimed per poll
    pub batch_size: i64,

    pub max_attempts: i32,

    /// How long a claimed notification stays leased
    pub lease: Duration,

    /// Sender address of outgoing mail
    pub mail_from: String,

    /// How often expired entries are dropped from the token blocklist
    pub purge_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            batch_size: 20,
            max_attempts: 5,
            lease: Duration::from_secs(300),
            mail_from: "taskboard@localhost".to_string(),
            purge_interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailerConfig {
    Log,
    Webhook { url: String },
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let mailer = match get("MAILER", "log").to_ascii_lowercase().as_str() {
            "log" => MailerConfig::Log,
            "webhook" => MailerConfig::Webhook {
                url: lookup("MAILER_WEBHOOK_URL").ok_or_else(|| {
                    anyhow::anyhow!("MAILER_WEBHOOK_URL is required when MAILER=webhook")
                })?,
            },
            other => anyhow::bail!("Unknown MAILER '{}'; expected 'log' or 'webhook'", other),
        };

        let batch_size: i64 = get("NOTIFY_BATCH_SIZE", "20").parse()?;
        let max_attempts: i32 = get("NOTIFY_MAX_ATTEMPTS", "5").parse()?;
        if batch_size <= 0 || max_attempts <= 0 {
            anyhow::bail!("NOTIFY_BATCH_SIZE and NOTIFY_MAX_ATTEMPTS must be positive");
        }

        let poll_secs: u64 = get("NOTIFY_POLL_INTERVAL_SECS", "2").parse()?;
        let lease_secs: u64 = get("NOTIFY_LEASE_SECS", "300").parse()?;
        let purge_secs: u64 = get("REVOKED_TOKEN_PURGE_SECS", "3600").parse()?;
        if poll_secs == 0 || lease_secs == 0 || purge_secs == 0 {
            anyhow::bail!(
                "NOTIFY_POLL_INTERVAL_SECS, NOTIFY_LEASE_SECS and REVOKED_TOKEN_PURGE_SECS must be positive"
            );
        }

        Ok(Self {
            database_url,
            max_connections: get("DATABASE_MAX_CONNECTIONS", "5").parse()?,
            dispatch: DispatchConfig {
                poll_interval: Duration::from_secs(poll_secs),
                batch_size,
                max_attempts,
                lease: Duration::from_secs(lease_secs),
                mail_from: get("MAIL_FROM", "taskboard@localhost"),
                purge_interval: Duration::from_secs(purge_secs),
            },
            mailer,
        })
    }
}
