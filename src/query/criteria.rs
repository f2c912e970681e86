//! Criteria tree: the typed boolean structure compiled against the
//! query builder. Wire JSON is parsed into this tagged union at the
//! boundary; the compiler never sees untyped maps.

use crate::error::AppError;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "and" => Some(Connective::And),
            "or" => Some(Connective::Or),
            _ => None,
        }
    }
}

/// Comparison operators; a closed set. Anything else is a hard error,
/// never silently ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Like,
    NotLike,
    Between,
}

impl Operator {
    /// Case-insensitive operator lookup (`notIn`, `NOTIN`, `notin` all
    /// dispatch the same).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(Operator::Eq),
            "neq" => Some(Operator::Neq),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "in" => Some(Operator::In),
            "notin" => Some(Operator::NotIn),
            "isnull" => Some(Operator::IsNull),
            "isnotnull" => Some(Operator::IsNotNull),
            "like" => Some(Operator::Like),
            "notlike" => Some(Operator::NotLike),
            "between" => Some(Operator::Between),
            _ => None,
        }
    }

    /// SQL token for binary comparison operators. Membership, nullity
    /// and range tests render their own syntax in the compiler.
    pub fn sql_comparison(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Neq => Some("<>"),
            Operator::Lt => Some("<"),
            Operator::Lte => Some("<="),
            Operator::Gt => Some(">"),
            Operator::Gte => Some(">="),
            Operator::Like => Some("LIKE"),
            Operator::NotLike => Some("NOT LIKE"),
            _ => None,
        }
    }
}

/// One node of the criteria tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf {
        field: String,
        op: Operator,
        value: Value,
    },
    Group {
        connective: Connective,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn leaf(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Node::Leaf {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn group(connective: Connective, children: Vec<Node>) -> Self {
        Node::Group {
            connective,
            children,
        }
    }
}

/// Parse the decoded `where` object into top-level sibling nodes
/// (implicitly conjoined). Entries whose value is literally null are
/// filtered out.
pub fn parse_tree(raw: &Value) -> Result<Vec<Node>, AppError> {
    let obj = raw.as_object().ok_or_else(|| {
        AppError::BadRequest("'where' parameter must be a JSON object".to_string())
    })?;
    let mut nodes = Vec::new();
    for (key, value) in obj {
        if value.is_null() {
            continue;
        }
        match Connective::from_key(key) {
            Some(connective) => nodes.push(parse_group(connective, value)?),
            None => nodes.push(parse_node(value)?),
        }
    }
    Ok(nodes)
}

fn parse_group(connective: Connective, value: &Value) -> Result<Node, AppError> {
    let children = value.as_array().ok_or_else(|| {
        AppError::BadRequest(format!(
            "criteria group '{}' must hold an array",
            connective.as_sql().to_ascii_lowercase()
        ))
    })?;
    let children = children
        .iter()
        .map(parse_node)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::Group {
        connective,
        children,
    })
}

/// A 3-element array with string field and operator is a leaf; an array
/// of arrays/objects is an implicit conjunction; an object opens
/// and/or groups. Anything else is a malformed node.
fn parse_node(value: &Value) -> Result<Node, AppError> {
    match value {
        Value::Array(items) => {
            if let Some(leaf) = try_parse_leaf(items)? {
                return Ok(leaf);
            }
            if !items.is_empty() && items.iter().all(|v| v.is_array() || v.is_object()) {
                let children = items
                    .iter()
                    .map(parse_node)
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Node::Group {
                    connective: Connective::And,
                    children,
                });
            }
            Err(AppError::BadRequest(
                "criteria node must be a [field, operator, value] triple or a group".to_string(),
            ))
        }
        Value::Object(obj) => {
            let entries: Vec<(&String, &Value)> =
                obj.iter().filter(|(_, v)| !v.is_null()).collect();
            // A lone connective key is that group itself; the implicit
            // conjunction only wraps when siblings are present.
            if let [(key, v)] = entries.as_slice() {
                if let Some(connective) = Connective::from_key(key) {
                    return parse_group(connective, v);
                }
            }
            let mut children = Vec::new();
            for (key, v) in entries {
                match Connective::from_key(key) {
                    Some(connective) => children.push(parse_group(connective, v)?),
                    None => {
                        return Err(AppError::BadRequest(format!(
                            "unknown criteria group key '{}'",
                            key
                        )))
                    }
                }
            }
            Ok(Node::Group {
                connective: Connective::And,
                children,
            })
        }
        _ => Err(AppError::BadRequest(
            "criteria node must be a [field, operator, value] triple or a group".to_string(),
        )),
    }
}

fn try_parse_leaf(items: &[Value]) -> Result<Option<Node>, AppError> {
    let [field, op, value] = items else {
        return Ok(None);
    };
    let (Some(field), Some(op_str)) = (field.as_str(), op.as_str()) else {
        return Ok(None);
    };
    let op = Operator::parse(op_str).ok_or_else(|| {
        AppError::BadRequest(format!("unsupported criteria operator '{}'", op_str))
    })?;
    Ok(Some(Node::Leaf {
        field: field.to_string(),
        op,
        value: value.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_top_level_leaf_entries() {
        let nodes = parse_tree(&json!({"0": ["title", "eq", "x"]})).unwrap();
        assert_eq!(nodes, vec![Node::leaf("title", Operator::Eq, json!("x"))]);
    }

    #[test]
    fn parses_and_or_groups_side_by_side() {
        let nodes = parse_tree(&json!({
            "and": [["a", "eq", 1]],
            "or": [["b", "eq", 2]]
        }))
        .unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::group(Connective::And, vec![Node::leaf("a", Operator::Eq, json!(1))]),
                Node::group(Connective::Or, vec![Node::leaf("b", Operator::Eq, json!(2))]),
            ]
        );
    }

    #[test]
    fn parses_nested_groups() {
        let nodes = parse_tree(&json!({
            "or": [
                ["a", "eq", 1],
                {"and": [["b", "gt", 2], ["c", "isNull", null]]}
            ]
        }))
        .unwrap();
        let Node::Group { connective, children } = &nodes[0] else {
            panic!("expected group");
        };
        assert_eq!(*connective, Connective::Or);
        assert_eq!(children.len(), 2);
        let Node::Group { children: inner, .. } = &children[1] else {
            panic!("expected nested group");
        };
        assert_eq!(inner[1], Node::leaf("c", Operator::IsNull, json!(null)));
    }

    #[test]
    fn lone_connective_object_is_its_own_group() {
        let nodes = parse_tree(&json!({
            "or": [
                ["a", "eq", 1],
                {"and": [["b", "gt", 2], ["c", "isNull", null]]}
            ]
        }))
        .unwrap();
        let Node::Group { children, .. } = &nodes[0] else {
            panic!("expected group");
        };
        assert_eq!(
            children[1],
            Node::group(
                Connective::And,
                vec![
                    Node::leaf("b", Operator::Gt, json!(2)),
                    Node::leaf("c", Operator::IsNull, json!(null)),
                ]
            )
        );
    }

    #[test]
    fn sibling_connective_keys_wrap_in_a_conjunction() {
        let nodes = parse_tree(&json!({
            "or": [{"and": [["a", "eq", 1]], "or": [["b", "eq", 2]]}]
        }))
        .unwrap();
        let Node::Group { children, .. } = &nodes[0] else {
            panic!("expected group");
        };
        let Node::Group { connective, children: inner } = &children[0] else {
            panic!("expected wrapper");
        };
        assert_eq!(*connective, Connective::And);
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn null_valued_entries_are_filtered() {
        let nodes = parse_tree(&json!({"and": null})).unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn operator_parse_is_case_insensitive() {
        assert_eq!(Operator::parse("NOTIN"), Some(Operator::NotIn));
        assert_eq!(Operator::parse("isNotNull"), Some(Operator::IsNotNull));
        assert_eq!(Operator::parse("Between"), Some(Operator::Between));
        assert_eq!(Operator::parse("regex"), None);
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let err = parse_tree(&json!({"0": ["title", "matches", "x"]})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("matches")));
    }

    #[test]
    fn wrong_arity_tuple_is_an_error() {
        let err = parse_tree(&json!({"0": ["title", "eq"]})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_object_tree_is_an_error() {
        let err = parse_tree(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
