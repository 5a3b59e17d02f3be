//! Generic record access against PostgreSQL, one table at a time. Owns the
//! shared pool injected at startup; every statement is independently atomic
//! (no multi-statement transactions).

use crate::catalog;
use crate::descriptor::{ColumnKind, TableDescriptor};
use crate::error::AppError;
use crate::response::RecordPage;
use crate::sql::{self, BindValue, QuerySpec};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Clone)]
pub struct TableService {
    pool: PgPool,
}

impl TableService {
    pub fn new(pool: PgPool) -> Self {
        TableService { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drain the pool on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn connection_test(&self) -> bool {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await.is_ok()
    }

    /// Descriptors for every visible table; broken tables are skipped, not fatal.
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>, AppError> {
        catalog::list_all_descriptors(&self.pool).await
    }

    pub async fn describe_table(&self, table: &str) -> Result<TableDescriptor, AppError> {
        catalog::build_descriptor(&self.pool, table)
            .await?
            .ok_or_else(|| AppError::TableNotFound(table.to_string()))
    }

    /// Paged list: count query then data query. The two reads are not a
    /// single snapshot; a concurrent write between them can skew `total`.
    pub async fn query(&self, table: &str, spec: QuerySpec) -> Result<RecordPage, AppError> {
        let desc = self.describe_table(table).await?;
        let spec = spec.normalized();
        let q = sql::compile_select(&desc, &spec);
        tracing::debug!(sql = %q.count_sql, "count");
        let mut count = sqlx::query_scalar::<_, i64>(&q.count_sql);
        for p in &q.params[..q.where_params] {
            count = count.bind(BindValue::from(p));
        }
        let total = count.fetch_one(&self.pool).await?;
        let data = self.fetch_all(&q.sql, &q.params).await?;
        Ok(RecordPage {
            data,
            total,
            page: spec.page,
            limit: spec.limit,
            total_pages: page_count(total, spec.limit),
        })
    }

    /// Fetch one record by primary key. Zero rows is NotFound, never an error.
    pub async fn get_by_id(&self, table: &str, id: &str) -> Result<Value, AppError> {
        let desc = self.describe_table(table).await?;
        let pk = desc.primary_key()?.to_string();
        let id_value = parse_id(pk_kind(&desc, &pk), id)?;
        let q = sql::compile_select_by_id(&desc, &pk, id_value);
        self.fetch_optional(&q.sql, &q.params)
            .await?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))
    }

    /// Insert one record; returns the full created row.
    pub async fn insert(
        &self,
        table: &str,
        record: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let desc = self.describe_table(table).await?;
        let q = sql::compile_insert(&desc, record)?;
        self.fetch_optional(&q.sql, &q.params)
            .await?
            .ok_or(AppError::Execution(sqlx::Error::RowNotFound))
    }

    /// Update the submitted keys only; returns the full updated row.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        record: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let desc = self.describe_table(table).await?;
        let pk = desc.primary_key()?.to_string();
        let id_value = parse_id(pk_kind(&desc, &pk), id)?;
        let q = sql::compile_update(&desc, &pk, id_value, record)?;
        self.fetch_optional(&q.sql, &q.params)
            .await?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))
    }

    /// Delete by primary key. False means no such row.
    pub async fn remove(&self, table: &str, id: &str) -> Result<bool, AppError> {
        let desc = self.describe_table(table).await?;
        let pk = desc.primary_key()?.to_string();
        let id_value = parse_id(pk_kind(&desc, &pk), id)?;
        let q = sql::compile_delete(&desc, &pk, id_value);
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(BindValue::from(p));
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(BindValue::from(p));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(BindValue::from(p));
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(decode_row))
    }
}

fn pk_kind(desc: &TableDescriptor, pk: &str) -> ColumnKind {
    desc.column(pk).map(|c| c.kind).unwrap_or(ColumnKind::Other)
}

/// Parse a path id by the primary-key column's kind before binding.
fn parse_id(kind: ColumnKind, raw: &str) -> Result<Value, AppError> {
    match kind {
        ColumnKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw))),
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// `ceil(total / limit)`, 0 when the table slice is empty.
pub fn page_count(total: i64, limit: u32) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + limit as i64 - 1) / limit as i64
    }
}

fn decode_row(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), decode_cell(row, name));
    }
    Value::Object(map)
}

/// Probe common Postgres types until one decodes. Numeric and user-defined
/// columns arrive pre-cast to text by the compiler's select list.
fn decode_cell(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
