//! Database connection management

use sqlx::{PgPool, migrate::MigrateError};

/// Connect to `PostgreSQL`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Apply every pending schema migration.
///
/// # Errors
///
/// Returns an error if a migration fails or the applied history does not match the embedded one.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!().run(pool).await
}
