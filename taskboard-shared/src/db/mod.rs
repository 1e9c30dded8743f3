/// Database layer
///
/// - `pool`: connection pool construction and health checks
/// - `migrations`: embedded schema migrations
///
/// Models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
