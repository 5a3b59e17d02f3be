//! Schema catalog reader: enumerates tables and columns from
//! `information_schema`. Table names passed in are only ever bound
//! parameters here; an empty column set is the "table not found" signal.

use crate::descriptor::{ColumnDescriptor, ColumnKind, TableDescriptor};
use crate::error::AppError;
use crate::store::META_TABLE_PREFIX;
use sqlx::PgPool;

/// Platform reference tables that are never user data.
const PLATFORM_TABLES: &[&str] = &["spatial_ref_sys", "geometry_columns", "geography_columns"];

/// True for tables the engine hides from callers: its own metadata tables
/// and platform geometry/reference tables.
pub fn is_hidden_table(name: &str) -> bool {
    name.starts_with(META_TABLE_PREFIX) || PLATFORM_TABLES.contains(&name)
}

fn catalog_err(e: sqlx::Error) -> AppError {
    AppError::CatalogUnavailable(e.to_string())
}

/// Base tables of the public schema, lexicographic, engine and platform
/// tables excluded.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, AppError> {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .fetch_all(pool)
    .await
    .map_err(catalog_err)?;
    Ok(names
        .into_iter()
        .map(|(n,)| n)
        .filter(|n| !is_hidden_table(n))
        .collect())
}

/// Constraint names are only unique per table, so the key-column join must
/// match on table name as well; otherwise a same-named PK constraint on a
/// sibling table leaks its columns into this table's description.
const DESCRIBE_COLUMNS_SQL: &str =
    "SELECT c.column_name, c.data_type, c.udt_name, c.is_nullable, c.column_default, \
            (pk.column_name IS NOT NULL) AS is_primary_key \
     FROM information_schema.columns c \
     LEFT JOIN ( \
         SELECT kcu.column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON kcu.constraint_name = tc.constraint_name \
          AND kcu.table_schema = tc.table_schema \
          AND kcu.table_name = tc.table_name \
         WHERE tc.table_schema = 'public' \
           AND tc.table_name = $1 \
           AND tc.constraint_type = 'PRIMARY KEY' \
     ) pk ON pk.column_name = c.column_name \
     WHERE c.table_schema = 'public' AND c.table_name = $1 \
     ORDER BY c.ordinal_position";

/// Column metadata joined with PRIMARY KEY constraint metadata, in ordinal
/// order. Empty result means the table does not exist; callers treat that
/// as NotFound, not as an error.
pub async fn describe_columns(
    pool: &PgPool,
    table: &str,
) -> Result<Vec<ColumnDescriptor>, AppError> {
    let rows: Vec<(String, String, String, String, Option<String>, bool)> =
        sqlx::query_as(DESCRIBE_COLUMNS_SQL)
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(catalog_err)?;

    Ok(rows
        .into_iter()
        .map(
            |(name, data_type, udt_name, is_nullable, default_value, is_primary_key)| {
                ColumnDescriptor {
                    kind: ColumnKind::from_catalog(&data_type, &udt_name),
                    name,
                    data_type: udt_name,
                    nullable: is_nullable == "YES",
                    is_primary_key,
                    default_value,
                }
            },
        )
        .collect())
}

/// Build a full descriptor: columns plus an advisory row count. `None` when
/// the table is hidden or has no columns in the catalog, so engine and
/// platform tables resolve to NotFound on every operation, not just the
/// listing. The count interpolates the table name only after the catalog has
/// confirmed it exists, and always quoted.
pub async fn build_descriptor(
    pool: &PgPool,
    table: &str,
) -> Result<Option<TableDescriptor>, AppError> {
    if is_hidden_table(table) {
        return Ok(None);
    }
    let columns = describe_columns(pool, table).await?;
    if columns.is_empty() {
        return Ok(None);
    }
    let count_sql = format!("SELECT COUNT(*) FROM {}", crate::sql::quoted(table));
    let (row_count,): (i64,) = sqlx::query_as(&count_sql)
        .fetch_one(pool)
        .await
        .map_err(catalog_err)?;
    Ok(Some(TableDescriptor {
        table_name: table.to_string(),
        columns,
        row_count,
    }))
}

/// Descriptors for every listed table. One broken table is logged and
/// skipped; it must not abort the whole listing.
pub async fn list_all_descriptors(pool: &PgPool) -> Result<Vec<TableDescriptor>, AppError> {
    let names = list_tables(pool).await?;
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match build_descriptor(pool, &name).await {
            Ok(Some(desc)) => out.push(desc),
            Ok(None) => tracing::warn!(table = %name, "table vanished between listing and describe"),
            Err(e) => tracing::warn!(table = %name, error = %e, "skipping table, describe failed"),
        }
    }
    Ok(out)
}
