//! Embedded schema migrations from `migrations/`.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;

use crate::error::StoreError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bring the schema up to date. Idempotent.
pub async fn run(pool: &SqlitePool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
