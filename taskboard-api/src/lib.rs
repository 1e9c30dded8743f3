//! # Taskboard API Server Library
//!
//! HTTP surface of Taskboard: router, JWT authentication, handlers and the
//! mapping of domain errors onto HTTP statuses.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: environment configuration
//! - `error`: error handling and HTTP response mapping
//! - `middleware`: security headers
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
