//! Convert serde_json::Value to types that sqlx can bind.

use crate::query::value_type::{self, BindType};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value that can be bound to a PostgreSQL query, converted from
/// serde_json::Value. Strings that probe as identifiers become `Uuid`
/// so a `$n::uuid` cast on the placeholder round-trips cleanly.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => match value_type::resolve(v) {
                Some(BindType::Uuid) => {
                    // resolve() only reports Uuid for parseable strings.
                    match uuid::Uuid::parse_str(s) {
                        Ok(u) => PgBindValue::Uuid(u),
                        Err(_) => PgBindValue::String(s.clone()),
                    }
                }
                None => PgBindValue::String(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<i32> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            PgBindValue::Uuid(u) => {
                let u_str = u.to_string();
                <&str as Encode<Postgres>>::encode_by_ref(&u_str.as_str(), buf)?
            }
            PgBindValue::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_split_into_integer_and_float() {
        assert_eq!(PgBindValue::from_json(&json!(7)), PgBindValue::I64(7));
        assert_eq!(PgBindValue::from_json(&json!(1.5)), PgBindValue::F64(1.5));
    }

    #[test]
    fn uuid_strings_become_uuid_binds() {
        let v = json!("7c9e6679-7425-40de-944b-e07fc1f90ae7");
        match PgBindValue::from_json(&v) {
            PgBindValue::Uuid(u) => {
                assert_eq!(u.to_string(), "7c9e6679-7425-40de-944b-e07fc1f90ae7");
            }
            other => panic!("expected uuid bind, got {:?}", other),
        }
    }

    #[test]
    fn non_canonical_hex_binds_as_string() {
        assert_eq!(
            PgBindValue::from_json(&json!("7c9e6679742540de944be07fc1f90ae7")),
            PgBindValue::String("7c9e6679742540de944be07fc1f90ae7".to_string())
        );
    }

    #[test]
    fn plain_strings_stay_strings() {
        assert_eq!(
            PgBindValue::from_json(&json!("hello")),
            PgBindValue::String("hello".to_string())
        );
    }
}
