//! Schema bootstrap for the authentication service

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;

/// Apply the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    info!("Database migrations applied");
    Ok(())
}
