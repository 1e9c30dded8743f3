/// Embedded schema migrations
///
/// The SQL files under `taskboard-shared/migrations/` are compiled into the
/// binary, so the API server brings its database up to date at startup without
/// the sqlx CLI.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::migrations::run_migrations;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{info, warn};

/// Migrations embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies any pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_schema_covers_every_table() {
        let sql = MIGRATOR
            .iter()
            .map(|m| m.sql.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        for table in [
            "users",
            "projects",
            "project_members",
            "tasks",
            "comments",
            "notifications",
            "revoked_tokens",
        ] {
            assert!(
                sql.contains(&format!("CREATE TABLE {} (", table)),
                "missing table {}",
                table
            );
        }
        assert!(sql.contains("ON DELETE CASCADE"));
    }
}
