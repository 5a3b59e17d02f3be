//! Engine-private metadata table. The reserved name prefix keeps these
//! tables out of the public listing.

use crate::error::AppError;
use sqlx::PgPool;

/// Name prefix reserved for the engine's own tables.
pub const META_TABLE_PREFIX: &str = "_tabula";

/// Create the reserved schema-definition table if missing. The runtime CRUD
/// path never reads it; it holds statically defined schemas for future use.
pub async fn ensure_meta_table(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _tabula_schemas (
            id TEXT PRIMARY KEY,
            payload JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}
