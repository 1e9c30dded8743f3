//! # Taskboard Worker Library
//!
//! Delivers queued notifications written by the API server.
//!
//! ## Modules
//!
//! - `config`: Worker configuration from the environment
//! - `queue`: Claiming and settling rows of the notification outbox
//! - `mailer`: Outgoing mail transports
//! - `dispatcher`: Poll loop tying the queue to a mailer
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_worker::{config::DispatchConfig, dispatcher::Dispatcher, mailer::LogMailer};
//! # use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) {
//! let dispatcher = Dispatcher::new(pool, Arc::new(LogMailer), DispatchConfig::default());
//! let _stats = dispatcher.poll_once().await;
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod mailer;
pub mod queue;
