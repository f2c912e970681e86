//! Decode raw HTTP query parameters (`where`, `order`, `limit`,
//! `offset`, `search`) into typed structures. Pure parsing, no database
//! knowledge. Wire names are a compatibility contract.

use crate::error::AppError;
use crate::query::criteria::{self, Node};
use crate::query::search::SearchSpec;
use crate::sql::OrderDirection;
use serde_json::Value;
use std::collections::HashSet;

/// Everything a list request can ask for, decoded and normalized.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    pub criteria: Vec<Node>,
    pub order: Vec<(String, OrderDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub search: SearchSpec,
}

impl ListParams {
    /// Walk decoded query pairs once. Repeated `order=` keys keep their
    /// order; `order[col]=dir` is the map form.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut params = ListParams::default();
        for (key, value) in pairs {
            match key.as_str() {
                "where" => params.criteria = parse_criteria(value)?,
                "order" => params.order.push(parse_order_entry(value)),
                "limit" => params.limit = parse_bound(value),
                "offset" => params.offset = parse_bound(value),
                "search" => params.search = parse_search(value)?,
                _ => {
                    if let Some(col) = key.strip_prefix("order[").and_then(|k| k.strip_suffix(']'))
                    {
                        params
                            .order
                            .push((col.to_string(), parse_direction(value)));
                    }
                    // Unknown parameters are ignored; they may belong to
                    // other layers (pagination cursors, api keys, ...).
                }
            }
        }
        Ok(params)
    }
}

/// JSON-decode the `where` parameter into criteria nodes. Empty input
/// is an empty tree, malformed JSON a 400 naming the parameter.
pub fn parse_criteria(raw: &str) -> Result<Vec<Node>, AppError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest("malformed JSON in 'where' parameter".to_string()))?;
    criteria::parse_tree(&value)
}

/// Array-form order entry: leading `-` forces DESC and is stripped.
fn parse_order_entry(raw: &str) -> (String, OrderDirection) {
    match raw.strip_prefix('-') {
        Some(col) => (col.to_string(), OrderDirection::Desc),
        None => (raw.to_string(), OrderDirection::Asc),
    }
}

/// Map-form direction: anything not exactly ASC/DESC (case-insensitive)
/// normalizes to ASC.
fn parse_direction(raw: &str) -> OrderDirection {
    if raw.eq_ignore_ascii_case("desc") {
        OrderDirection::Desc
    } else {
        OrderDirection::Asc
    }
}

/// Absolute value of the input integer: these values only bound a
/// query, never index memory, so negatives are silently flipped rather
/// than rejected. Non-numeric input counts as absent.
pub fn parse_bound(raw: &str) -> Option<u64> {
    raw.trim().parse::<i64>().ok().map(i64::unsigned_abs)
}

/// Decode the `search` parameter. Structured JSON specs carry `and`/`or`
/// term lists; everything else that fails to decode as JSON is treated
/// as plain text and split into an OR group of terms. A JSON object or
/// array *lacking* both keys is a client error, not a fallback.
pub fn parse_search(raw: &str) -> Result<SearchSpec, AppError> {
    if raw.trim().is_empty() {
        return Ok(SearchSpec::default());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => {
            if !map.contains_key("and") && !map.contains_key("or") {
                return Err(AppError::BadRequest(
                    "'search' object must contain an 'and' or 'or' key".to_string(),
                ));
            }
            Ok(SearchSpec {
                and_terms: map.get("and").map(normalize_terms).transpose()?.unwrap_or_default(),
                or_terms: map.get("or").map(normalize_terms).transpose()?.unwrap_or_default(),
            })
        }
        Ok(Value::Array(_)) => Err(AppError::BadRequest(
            "'search' object must contain an 'and' or 'or' key".to_string(),
        )),
        // Decode failure or a JSON scalar: plain-text fallback.
        _ => Ok(SearchSpec {
            and_terms: Vec::new(),
            or_terms: split_terms(raw),
        }),
    }
}

fn normalize_terms(value: &Value) -> Result<Vec<String>, AppError> {
    let items = value.as_array().ok_or_else(|| {
        AppError::BadRequest("'search' term lists must be arrays".to_string())
    })?;
    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for item in items {
        let term = match item {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(AppError::BadRequest(
                    "'search' terms must be strings".to_string(),
                ))
            }
        };
        if term.is_empty() || !seen.insert(term.clone()) {
            continue;
        }
        terms.push(term);
    }
    Ok(terms)
}

/// Split plain text on single spaces, drop empties, dedupe keeping
/// first occurrence.
fn split_terms(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(' ')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}
