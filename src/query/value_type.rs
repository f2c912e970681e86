//! Decide how a scalar should be bound or inlined: distinguished
//! identifier type (UUID) versus plain scalar.

use serde_json::Value;

/// Type hint attached to a positional parameter. Only identifiers are
/// distinguished today; everything else binds as a default scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindType {
    Uuid,
}

impl BindType {
    /// SQL cast suffix for a placeholder carrying this hint.
    pub fn cast(&self) -> &'static str {
        match self {
            BindType::Uuid => "::uuid",
        }
    }
}

/// Probe a scalar for a distinguished identifier type. This is a probe,
/// not a validator: failure to parse means "no hint", never an error.
pub fn resolve(value: &Value) -> Option<BindType> {
    match value {
        Value::String(s) => parse_canonical_uuid(s).map(|_| BindType::Uuid),
        _ => None,
    }
}

/// Accept only the canonical hyphenated 8-4-4-4-12 form. The uuid
/// parser also takes simple 32-hex, braced and urn forms, which must
/// stay plain strings here or a `::uuid` cast would break text-column
/// comparisons.
fn parse_canonical_uuid(s: &str) -> Option<uuid::Uuid> {
    if s.len() != 36 {
        return None;
    }
    uuid::Uuid::try_parse(s).ok()
}

/// Render an `in`/`notIn` element as an inline escaped literal.
/// Identifier strings render canonically quoted, numeric-looking strings
/// as bare integers, everything else as an escaped string literal.
/// Callers must reject non-scalar elements before getting here.
pub fn inline_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if let Some(u) = parse_canonical_uuid(s) {
                return format!("'{}'", u);
            }
            if let Ok(n) = s.parse::<i64>() {
                return n.to_string();
            }
            quote_literal(s)
        }
        other => quote_literal(&other.to_string()),
    }
}

/// Standard single-quote doubling; the value never appears unescaped in
/// query text.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
