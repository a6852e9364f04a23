//! Database migration runner
//!
//! Embeds the SQL migrations at compile time and applies any that have not
//! run yet. Both services call this on startup; the migrator takes a
//! Postgres advisory lock, so concurrent starts are safe.

use sqlx::PgPool;
use tracing::info;

/// Run all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");

    // The path is relative to this crate's Cargo.toml; migrations live at
    // the workspace root under db/migrations.
    let migrator = sqlx::migrate!("../../../db/migrations");

    migrator.run(pool).await?;

    info!("Migrations complete");
    Ok(())
}
