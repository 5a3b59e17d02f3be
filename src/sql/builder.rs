//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a table
//! descriptor plus untyped request parameters.
//!
//! Identifier rule: only names already present in the descriptor (or the
//! catalog's table list) are ever interpolated, and always quoted. Values
//! travel exclusively as bound parameters.

use crate::descriptor::{ColumnDescriptor, TableDescriptor};
use crate::error::AppError;
use serde_json::Value;
use std::collections::HashMap;

/// Filter value that selects rows where the column IS NULL.
pub const NULL_FILTER: &str = "__null__";
/// Filter value that selects rows where the column IS NOT NULL.
pub const NOT_NULL_FILTER: &str = "__not_null__";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// "desc" (any case) sorts descending; anything else is ascending.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some(s) if s.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Untyped per-request query parameters. Built fresh per request.
#[derive(Clone, Debug)]
pub struct QuerySpec {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub filters: HashMap<String, Value>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        QuerySpec {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            filters: HashMap::new(),
        }
    }
}

impl QuerySpec {
    /// Clamp page and limit into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_LIMIT);
        self
    }
}

/// Quote an identifier for PostgreSQL. Callers must have validated the name
/// against the descriptor or the catalog first.
pub fn quoted(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Compiled list query: data SQL and its count counterpart share one
/// parameter vector; the count query binds only the WHERE prefix.
pub struct SelectQuery {
    pub sql: String,
    pub count_sql: String,
    pub params: Vec<Value>,
    pub where_params: usize,
}

/// `$n` with a cast to the column's catalog type, so text-shaped parameters
/// bind correctly against uuid/timestamp/enum columns. Array types get no
/// cast (their udt names are not valid cast targets).
fn placeholder(col: &ColumnDescriptor, n: usize) -> String {
    if col.data_type.is_empty() || col.data_type.starts_with('_') {
        format!("${}", n)
    } else {
        format!("${}::{}", n, col.data_type)
    }
}

/// SELECT list: arbitrary-precision numerics and user-defined columns cast
/// to text so every row decodes to the same generic shape.
fn select_column_list(desc: &TableDescriptor) -> String {
    use crate::descriptor::ColumnKind;
    desc.columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if c.data_type == "numeric" || c.kind == ColumnKind::Other {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One WHERE predicate for a filter entry, or None when the entry is
/// skipped (empty-string value). The column is already known to exist.
fn filter_predicate(col: &ColumnDescriptor, value: &Value, q: &mut QueryBuf) -> Option<String> {
    let ident = quoted(&col.name);
    match value {
        Value::Null => Some(format!("{} IS NULL", ident)),
        Value::String(s) if s == NULL_FILTER => Some(format!("{} IS NULL", ident)),
        Value::String(s) if s == NOT_NULL_FILTER => Some(format!("{} IS NOT NULL", ident)),
        Value::String(s) if s.is_empty() => None,
        _ => {
            let n = q.push_param(value.clone());
            Some(format!("{} = {}", ident, placeholder(col, n)))
        }
    }
}

/// Compile the list query: search disjunction AND equality/null filters,
/// optional ORDER BY on a validated column, LIMIT/OFFSET as parameters.
pub fn compile_select(desc: &TableDescriptor, spec: &QuerySpec) -> SelectQuery {
    let mut q = QueryBuf::new();
    let table = quoted(&desc.table_name);
    let mut clauses: Vec<String> = Vec::new();

    if let Some(term) = spec.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let text_cols: Vec<&ColumnDescriptor> =
            desc.columns.iter().filter(|c| c.kind.is_searchable()).collect();
        // No text columns: the term is silently ignored, not an error.
        if !text_cols.is_empty() {
            let n = q.push_param(Value::String(format!("%{}%", term)));
            let disjunction = text_cols
                .iter()
                .map(|c| format!("{} ILIKE ${}", quoted(&c.name), n))
                .collect::<Vec<_>>()
                .join(" OR ");
            clauses.push(format!("({})", disjunction));
        }
    }

    // Descriptor order keeps the SQL deterministic and doubles as the
    // identifier allow-list: filter keys not in the descriptor never reach
    // the statement.
    for col in &desc.columns {
        let Some(value) = spec.filters.get(&col.name) else {
            continue;
        };
        if let Some(predicate) = filter_predicate(col, value, &mut q) {
            clauses.push(predicate);
        }
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let where_params = q.params.len();
    let count_sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);

    let order_clause = match spec.sort_by.as_deref() {
        Some(col) if desc.has_column(col) => {
            format!(" ORDER BY {} {}", quoted(col), spec.sort_order.as_sql())
        }
        Some(col) => {
            tracing::debug!(column = %col, table = %desc.table_name, "ignoring unknown sort column");
            String::new()
        }
        None => String::new(),
    };

    let limit_n = q.push_param(Value::from(spec.limit as i64));
    let offset_n = q.push_param(Value::from((spec.page as i64 - 1) * spec.limit as i64));
    let sql = format!(
        "SELECT {} FROM {}{}{} LIMIT ${} OFFSET ${}",
        select_column_list(desc),
        table,
        where_clause,
        order_clause,
        limit_n,
        offset_n
    );

    SelectQuery {
        sql,
        count_sql,
        params: q.params,
        where_params,
    }
}

/// `$n` cast to the primary-key column's type. The key name always comes
/// from `TableDescriptor::primary_key`, so the lookup cannot miss; a bare
/// placeholder is the harmless fallback.
fn pk_placeholder(desc: &TableDescriptor, pk: &str, n: usize) -> String {
    desc.column(pk)
        .map(|c| placeholder(c, n))
        .unwrap_or_else(|| format!("${}", n))
}

/// Single-row select on the primary-key column.
pub fn compile_select_by_id(desc: &TableDescriptor, pk: &str, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(desc),
        quoted(&desc.table_name),
        quoted(pk),
        pk_placeholder(desc, pk, n)
    );
    q
}

/// Every record key must exist in the descriptor; an empty record is a
/// caller error, rejected before any SQL is built.
fn validate_record(desc: &TableDescriptor, record: &HashMap<String, Value>) -> Result<(), AppError> {
    if record.is_empty() {
        return Err(AppError::InvalidRecord("record has no columns".into()));
    }
    for key in record.keys() {
        if !desc.has_column(key) {
            return Err(AppError::InvalidRecord(format!(
                "unknown column '{}' for table '{}'",
                key, desc.table_name
            )));
        }
    }
    Ok(())
}

/// INSERT with the record's columns only; returns the full inserted row.
pub fn compile_insert(
    desc: &TableDescriptor,
    record: &HashMap<String, Value>,
) -> Result<QueryBuf, AppError> {
    validate_record(desc, record)?;
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for col in &desc.columns {
        let Some(value) = record.get(&col.name) else {
            continue;
        };
        let n = q.push_param(value.clone());
        cols.push(quoted(&col.name));
        placeholders.push(placeholder(col, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&desc.table_name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(desc)
    );
    Ok(q)
}

/// UPDATE by primary key; SET from the record's keys, id bound last;
/// returns the full updated row.
pub fn compile_update(
    desc: &TableDescriptor,
    pk: &str,
    id: Value,
    record: &HashMap<String, Value>,
) -> Result<QueryBuf, AppError> {
    validate_record(desc, record)?;
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for col in &desc.columns {
        let Some(value) = record.get(&col.name) else {
            continue;
        };
        let n = q.push_param(value.clone());
        sets.push(format!("{} = {}", quoted(&col.name), placeholder(col, n)));
    }
    let n = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(&desc.table_name),
        sets.join(", "),
        quoted(pk),
        pk_placeholder(desc, pk, n),
        select_column_list(desc)
    );
    Ok(q)
}

/// DELETE by primary key.
pub fn compile_delete(desc: &TableDescriptor, pk: &str, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(&desc.table_name),
        quoted(pk),
        pk_placeholder(desc, pk, n)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnDescriptor, ColumnKind, TableDescriptor};
    use serde_json::json;

    fn col(name: &str, data_type: &str, kind: ColumnKind, pk: bool) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            kind,
            nullable: true,
            is_primary_key: pk,
            default_value: None,
        }
    }

    fn users() -> TableDescriptor {
        TableDescriptor {
            table_name: "users".into(),
            columns: vec![
                col("id", "uuid", ColumnKind::Other, true),
                col("username", "varchar", ColumnKind::Text, false),
                col("status", "text", ColumnKind::Text, false),
                col("age", "int8", ColumnKind::Integer, false),
                col("created_at", "timestamptz", ColumnKind::Timestamp, false),
                col("profile", "jsonb", ColumnKind::Json, false),
            ],
            row_count: 0,
        }
    }

    fn spec() -> QuerySpec {
        QuerySpec::default()
    }

    #[test]
    fn bare_select_has_no_where_and_bound_pagination() {
        let q = compile_select(&users(), &spec());
        assert_eq!(
            q.sql,
            "SELECT \"id\"::text AS \"id\", \"username\", \"status\", \"age\", \
             \"created_at\", \"profile\" FROM \"users\" LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.count_sql, "SELECT COUNT(*) FROM \"users\"");
        assert_eq!(q.params, vec![json!(25), json!(0)]);
        assert_eq!(q.where_params, 0);
    }

    #[test]
    fn search_builds_ilike_disjunction_over_text_columns_only() {
        let mut s = spec();
        s.search = Some("ali".into());
        let q = compile_select(&users(), &s);
        assert!(q
            .sql
            .contains("WHERE (\"username\" ILIKE $1 OR \"status\" ILIKE $1)"));
        assert_eq!(q.params[0], json!("%ali%"));
        assert_eq!(q.where_params, 1);
        assert!(q.count_sql.ends_with("WHERE (\"username\" ILIKE $1 OR \"status\" ILIKE $1)"));
    }

    #[test]
    fn search_is_ignored_when_no_text_columns_exist() {
        let desc = TableDescriptor {
            table_name: "metrics".into(),
            columns: vec![col("value", "float8", ColumnKind::Numeric, false)],
            row_count: 0,
        };
        let mut s = spec();
        s.search = Some("ali".into());
        let q = compile_select(&desc, &s);
        assert!(!q.sql.contains("WHERE"));
        assert_eq!(q.where_params, 0);
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut s = spec();
        s.search = Some("   ".into());
        let q = compile_select(&users(), &s);
        assert!(!q.sql.contains("WHERE"));
    }

    #[test]
    fn equality_filter_binds_value_with_cast() {
        let mut s = spec();
        s.filters.insert("status".into(), json!("active"));
        let q = compile_select(&users(), &s);
        assert!(q.sql.contains("WHERE \"status\" = $1::text"));
        assert_eq!(q.params[0], json!("active"));
    }

    #[test]
    fn null_markers_become_null_tests_without_parameters() {
        let mut s = spec();
        s.filters.insert("age".into(), Value::Null);
        s.filters.insert("status".into(), json!(NOT_NULL_FILTER));
        s.filters.insert("username".into(), json!(NULL_FILTER));
        let q = compile_select(&users(), &s);
        assert!(q.sql.contains("\"username\" IS NULL"));
        assert!(q.sql.contains("\"status\" IS NOT NULL"));
        assert!(q.sql.contains("\"age\" IS NULL"));
        assert_eq!(q.where_params, 0);
    }

    #[test]
    fn empty_string_filter_is_skipped() {
        let mut s = spec();
        s.filters.insert("status".into(), json!(""));
        let q = compile_select(&users(), &s);
        assert!(!q.sql.contains("WHERE"));
    }

    #[test]
    fn unknown_filter_column_never_reaches_the_sql() {
        let mut s = spec();
        s.filters
            .insert("status\"; DROP TABLE users; --".into(), json!("x"));
        let q = compile_select(&users(), &s);
        assert!(!q.sql.contains("DROP TABLE"));
        assert!(!q.sql.contains("WHERE"));
    }

    #[test]
    fn search_and_filters_combine_with_and() {
        let mut s = spec();
        s.search = Some("ali".into());
        s.filters.insert("status".into(), json!("active"));
        let q = compile_select(&users(), &s);
        assert!(q.sql.contains(
            "WHERE (\"username\" ILIKE $1 OR \"status\" ILIKE $1) AND \"status\" = $2::text"
        ));
        assert_eq!(q.where_params, 2);
    }

    #[test]
    fn sort_on_known_column_is_emitted_uppercase() {
        let mut s = spec();
        s.sort_by = Some("username".into());
        s.sort_order = SortOrder::Desc;
        let q = compile_select(&users(), &s);
        assert!(q.sql.contains("ORDER BY \"username\" DESC"));
        assert!(!q.count_sql.contains("ORDER BY"));
    }

    #[test]
    fn unknown_sort_column_is_ignored() {
        let mut s = spec();
        s.sort_by = Some("username; DROP TABLE users".into());
        let q = compile_select(&users(), &s);
        assert!(!q.sql.contains("ORDER BY"));
        assert!(!q.sql.contains("DROP TABLE"));
    }

    #[test]
    fn sort_order_parse_defaults_to_asc() {
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(None), SortOrder::Asc);
    }

    #[test]
    fn pagination_offset_is_page_minus_one_times_limit() {
        let mut s = spec();
        s.page = 3;
        s.limit = 10;
        let q = compile_select(&users(), &s);
        let n = q.params.len();
        assert_eq!(q.params[n - 2], json!(10));
        assert_eq!(q.params[n - 1], json!(20));
    }

    #[test]
    fn spec_normalization_clamps_page_and_limit() {
        let s = QuerySpec {
            page: 0,
            limit: 0,
            ..QuerySpec::default()
        }
        .normalized();
        assert_eq!((s.page, s.limit), (1, 1));
        let s = QuerySpec {
            page: 7,
            limit: 1000,
            ..QuerySpec::default()
        }
        .normalized();
        assert_eq!((s.page, s.limit), (7, 100));
    }

    #[test]
    fn select_by_id_casts_to_the_pk_type() {
        let q = compile_select_by_id(&users(), "id", json!("9b2f"));
        assert!(q.sql.ends_with("FROM \"users\" WHERE \"id\" = $1::uuid"));
        assert_eq!(q.params, vec![json!("9b2f")]);
    }

    #[test]
    fn insert_uses_record_columns_in_descriptor_order() {
        let mut record = HashMap::new();
        record.insert("status".to_string(), json!("active"));
        record.insert("username".to_string(), json!("alice"));
        let q = compile_insert(&users(), &record).unwrap();
        assert!(q.sql.starts_with(
            "INSERT INTO \"users\" (\"username\", \"status\") VALUES ($1::varchar, $2::text) RETURNING "
        ));
        assert_eq!(q.params, vec![json!("alice"), json!("active")]);
    }

    #[test]
    fn insert_rejects_empty_record() {
        let record = HashMap::new();
        assert!(matches!(
            compile_insert(&users(), &record),
            Err(AppError::InvalidRecord(_))
        ));
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let mut record = HashMap::new();
        record.insert("no_such".to_string(), json!(1));
        assert!(matches!(
            compile_insert(&users(), &record),
            Err(AppError::InvalidRecord(_))
        ));
    }

    #[test]
    fn update_binds_id_as_the_last_parameter() {
        let mut record = HashMap::new();
        record.insert("status".to_string(), json!("inactive"));
        let q = compile_update(&users(), "id", json!("9b2f"), &record).unwrap();
        assert!(q
            .sql
            .contains("UPDATE \"users\" SET \"status\" = $1::text WHERE \"id\" = $2::uuid RETURNING "));
        assert_eq!(q.params, vec![json!("inactive"), json!("9b2f")]);
    }

    #[test]
    fn update_rejects_empty_record() {
        let record = HashMap::new();
        assert!(matches!(
            compile_update(&users(), "id", json!("x"), &record),
            Err(AppError::InvalidRecord(_))
        ));
    }

    #[test]
    fn delete_targets_only_the_primary_key() {
        let q = compile_delete(&users(), "id", json!("9b2f"));
        assert_eq!(q.sql, "DELETE FROM \"users\" WHERE \"id\" = $1::uuid");
        assert_eq!(q.params, vec![json!("9b2f")]);
    }

    #[test]
    fn quoted_escapes_embedded_quotes() {
        assert_eq!(quoted("plain"), "\"plain\"");
        assert_eq!(quoted("wei\"rd"), "\"wei\"\"rd\"");
    }
}
