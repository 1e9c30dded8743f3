//! # Taskboard Shared Library
//!
//! Domain model, credential handling, authorization rules and lifecycle
//! services used by both the Taskboard API server and the notification
//! worker.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `auth`: passwords, JWTs, request auth context, authorization rules
//! - `services`: project, membership, task and comment lifecycle operations
//! - `notify`: notification side effects and the outbox notifier
//! - `db`: connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod services;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
