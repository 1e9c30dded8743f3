//! # Taskboard Worker
//!
//! Background process that delivers notifications queued by the API server
//! and prunes expired entries from the token blocklist.
//!
//! The API server owns the schema; start it once before the worker so that
//! migrations have run.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/taskboard cargo run -p taskboard-worker
//! ```

use std::sync::Arc;

use taskboard_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use taskboard_worker::{
    config::{MailerConfig, WorkerConfig},
    dispatcher::Dispatcher,
    mailer::{LogMailer, Mailer, WebhookMailer},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskboard_worker=debug,taskboard_shared=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &MailerConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config {
        MailerConfig::Log => Arc::new(LogMailer),
        MailerConfig::Webhook { url } => Arc::new(WebhookMailer::new(url.clone())?),
    };
    Ok(mailer)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    init_tracing();

    tracing::info!(
        "Taskboard Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone())
            .with_max_connections(config.max_connections),
    )
    .await?;

    let mailer = build_mailer(&config.mailer)?;
    let dispatcher = Dispatcher::new(pool.clone(), mailer, config.dispatch.clone());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal.cancel();
    });

    dispatcher.run(shutdown).await;

    close_pool(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}
