//! Runtime table descriptors: columns, types, primary key, row count.

use crate::error::AppError;
use serde::Serialize;

/// Closed taxonomy over raw catalog type strings. All type-dependent behavior
/// (search eligibility, id parsing, filter casts) dispatches on this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Boolean,
    Integer,
    Numeric,
    Text,
    Json,
    Timestamp,
    Other,
}

impl ColumnKind {
    /// Map `information_schema.columns` metadata (`data_type` + `udt_name`)
    /// to a kind. Unrecognized types land in `Other`, never an error.
    pub fn from_catalog(data_type: &str, udt_name: &str) -> Self {
        let dt = data_type.to_ascii_lowercase();
        let udt = udt_name.to_ascii_lowercase();
        match dt.as_str() {
            "boolean" => ColumnKind::Boolean,
            "smallint" | "integer" | "bigint" => ColumnKind::Integer,
            "numeric" | "decimal" | "real" | "double precision" => ColumnKind::Numeric,
            "text" | "character varying" | "character" | "citext" => ColumnKind::Text,
            "json" | "jsonb" => ColumnKind::Json,
            "date" => ColumnKind::Timestamp,
            _ if dt.starts_with("timestamp") || dt.starts_with("time") => ColumnKind::Timestamp,
            _ => match udt.as_str() {
                "bool" => ColumnKind::Boolean,
                "int2" | "int4" | "int8" => ColumnKind::Integer,
                "float4" | "float8" | "numeric" => ColumnKind::Numeric,
                "text" | "varchar" | "bpchar" | "citext" => ColumnKind::Text,
                "json" | "jsonb" => ColumnKind::Json,
                "timestamp" | "timestamptz" | "date" | "time" | "timetz" => ColumnKind::Timestamp,
                _ => ColumnKind::Other,
            },
        }
    }

    /// Text-kind columns are the only ones the search disjunction touches.
    pub fn is_searchable(self) -> bool {
        self == ColumnKind::Text
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Raw catalog type name (udt_name, e.g. "timestamptz"), kept for SQL casts.
    pub data_type: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub table_name: String,
    /// Columns in catalog ordinal order.
    pub columns: Vec<ColumnDescriptor>,
    /// Point-in-time count, advisory only.
    pub row_count: i64,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Resolve the primary-key column. Exactly one marked column wins; zero
    /// marked falls back to a literal "id" column when one exists; composite
    /// keys and keyless tables without an "id" column are rejected outright
    /// rather than guessed at.
    pub fn primary_key(&self) -> Result<&str, AppError> {
        let mut marked = self.columns.iter().filter(|c| c.is_primary_key);
        match (marked.next(), marked.next()) {
            (Some(pk), None) => Ok(&pk.name),
            (None, _) => self.column("id").map(|c| c.name.as_str()).ok_or_else(|| {
                AppError::UnsupportedTable(format!(
                    "table '{}' has no primary key and no 'id' column",
                    self.table_name
                ))
            }),
            (Some(_), Some(_)) => Err(AppError::UnsupportedTable(format!(
                "table '{}' has a composite primary key",
                self.table_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, kind: ColumnKind, pk: bool) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            data_type: "text".into(),
            kind,
            nullable: true,
            is_primary_key: pk,
            default_value: None,
        }
    }

    fn table(name: &str, columns: Vec<ColumnDescriptor>) -> TableDescriptor {
        TableDescriptor {
            table_name: name.into(),
            columns,
            row_count: 0,
        }
    }

    #[test]
    fn kind_mapping_covers_common_types() {
        assert_eq!(ColumnKind::from_catalog("boolean", "bool"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_catalog("bigint", "int8"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_catalog("numeric", "numeric"), ColumnKind::Numeric);
        assert_eq!(
            ColumnKind::from_catalog("character varying", "varchar"),
            ColumnKind::Text
        );
        assert_eq!(ColumnKind::from_catalog("jsonb", "jsonb"), ColumnKind::Json);
        assert_eq!(
            ColumnKind::from_catalog("timestamp with time zone", "timestamptz"),
            ColumnKind::Timestamp
        );
        assert_eq!(ColumnKind::from_catalog("date", "date"), ColumnKind::Timestamp);
        assert_eq!(
            ColumnKind::from_catalog("USER-DEFINED", "my_enum"),
            ColumnKind::Other
        );
    }

    #[test]
    fn kind_mapping_falls_back_to_udt_name() {
        assert_eq!(ColumnKind::from_catalog("ARRAY", "int8"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_catalog("", "uuid"), ColumnKind::Other);
    }

    #[test]
    fn only_text_is_searchable() {
        assert!(ColumnKind::Text.is_searchable());
        assert!(!ColumnKind::Json.is_searchable());
        assert!(!ColumnKind::Integer.is_searchable());
    }

    #[test]
    fn single_marked_primary_key_wins() {
        let t = table(
            "users",
            vec![
                col("user_id", ColumnKind::Text, true),
                col("id", ColumnKind::Text, false),
            ],
        );
        assert_eq!(t.primary_key().unwrap(), "user_id");
    }

    #[test]
    fn unmarked_falls_back_to_id_column() {
        let t = table(
            "events",
            vec![
                col("id", ColumnKind::Integer, false),
                col("payload", ColumnKind::Json, false),
            ],
        );
        assert_eq!(t.primary_key().unwrap(), "id");
    }

    #[test]
    fn keyless_table_without_id_is_rejected() {
        let t = table("log_lines", vec![col("line", ColumnKind::Text, false)]);
        assert!(matches!(t.primary_key(), Err(AppError::UnsupportedTable(_))));
    }

    #[test]
    fn composite_key_is_rejected() {
        let t = table(
            "memberships",
            vec![
                col("user_id", ColumnKind::Text, true),
                col("group_id", ColumnKind::Text, true),
            ],
        );
        assert!(matches!(t.primary_key(), Err(AppError::UnsupportedTable(_))));
    }
}
