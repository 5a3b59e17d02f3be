//! Bridge from untyped JSON values to sqlx Postgres binds.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// One bindable parameter. Declared to Postgres as TEXT; the compiler's
/// `$n::type` casts convert at the statement boundary.
#[derive(Clone, Debug)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl From<&Value> for BindValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Int(i)
                } else {
                    BindValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => match uuid::Uuid::parse_str(s) {
                Ok(u) => BindValue::Uuid(u),
                Err(_) => BindValue::Text(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null => <Option<i32> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            BindValue::Int(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::Float(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::Text(s) => {
                <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?
            }
            BindValue::Uuid(u) => {
                let s = u.to_string();
                <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)?
            }
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }
}

impl sqlx::Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
