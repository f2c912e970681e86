//! Recursive criteria-to-predicate compilation: walks the boolean tree,
//! dispatches the operator table, assigns positional parameters through
//! the builder and resolves fields against the resource model.

use crate::error::AppError;
use crate::model::ResolvedResource;
use crate::query::criteria::{Node, Operator};
use crate::query::value_type;
use crate::sql::{quoted, Composite, OrderDirection, Predicate, SelectBuilder};
use serde_json::Value;

/// Criteria nesting deeper than this is rejected; the recursion is
/// driven by client input.
const MAX_DEPTH: usize = 32;

pub struct CriteriaCompiler<'a> {
    resource: &'a ResolvedResource,
}

impl<'a> CriteriaCompiler<'a> {
    pub fn new(resource: &'a ResolvedResource) -> Self {
        CriteriaCompiler { resource }
    }

    /// Compile `nodes` into `root`, binding every scalar value on the
    /// builder. The builder owns the positional counter, so repeated
    /// calls against the same builder (user criteria, then the search
    /// subtree) never collide.
    pub fn compile(
        &self,
        builder: &mut SelectBuilder<'_>,
        root: &mut Composite,
        nodes: &[Node],
    ) -> Result<(), AppError> {
        self.compile_into(builder, root, nodes, 0)
    }

    fn compile_into(
        &self,
        builder: &mut SelectBuilder<'_>,
        parent: &mut Composite,
        nodes: &[Node],
        depth: usize,
    ) -> Result<(), AppError> {
        if depth > MAX_DEPTH {
            return Err(AppError::BadRequest(
                "criteria tree exceeds maximum nesting depth".to_string(),
            ));
        }
        for node in nodes {
            match node {
                Node::Group {
                    connective,
                    children,
                } => {
                    let mut composite = Composite::new(*connective);
                    self.compile_into(builder, &mut composite, children, depth + 1)?;
                    if !composite.is_empty() {
                        parent.add(Predicate::Composite(composite));
                    }
                }
                Node::Leaf { field, op, value } => {
                    let sql = self.compile_leaf(builder, field, *op, value)?;
                    parent.add(Predicate::Comparison(sql));
                }
            }
        }
        Ok(())
    }

    fn compile_leaf(
        &self,
        builder: &mut SelectBuilder<'_>,
        field: &str,
        op: Operator,
        value: &Value,
    ) -> Result<String, AppError> {
        let column = self.resolve_field(builder, field)?;
        if let Some(cmp) = op.sql_comparison() {
            let value = scalar_value(field, value)?;
            let hint = value_type::resolve(&value);
            let index = builder.bind(value, hint);
            return Ok(format!(
                "{} {} {}",
                column,
                cmp,
                SelectBuilder::placeholder(index, hint)
            ));
        }
        match op {
            Operator::Between => {
                let Some([low, high]) = value.as_array().and_then(|a| <&[Value; 2]>::try_from(a.as_slice()).ok())
                else {
                    return Err(AppError::BadRequest(format!(
                        "'between' on '{}' requires a 2-element array",
                        field
                    )));
                };
                let low = scalar_value(field, low)?;
                let high = scalar_value(field, high)?;
                let low_hint = value_type::resolve(&low);
                let high_hint = value_type::resolve(&high);
                let low_idx = builder.bind(low, low_hint);
                let high_idx = builder.bind(high, high_hint);
                Ok(format!(
                    "{} BETWEEN {} AND {}",
                    column,
                    SelectBuilder::placeholder(low_idx, low_hint),
                    SelectBuilder::placeholder(high_idx, high_hint)
                ))
            }
            Operator::In | Operator::NotIn => {
                // Deliberate divergence from `between`: list elements are
                // inline-escaped literals, never positional parameters.
                let items = value.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "'{}' on '{}' requires a non-empty array",
                        if op == Operator::In { "in" } else { "notIn" },
                        field
                    ))
                })?;
                let mut literals = Vec::with_capacity(items.len());
                for item in items {
                    let item = scalar_value(field, item)?;
                    literals.push(value_type::inline_literal(&item));
                }
                let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
                Ok(format!("{} {} ({})", column, keyword, literals.join(", ")))
            }
            Operator::IsNull => Ok(format!("{} IS NULL", column)),
            Operator::IsNotNull => Ok(format!("{} IS NOT NULL", column)),
            // Binary comparisons were handled through sql_comparison().
            _ => unreachable!("operator {:?} has no dispatch arm", op),
        }
    }

    /// Qualify and validate a criteria field. Unqualified fields get the
    /// root alias; a qualifier must be the root alias or a declared
    /// association, which is joined on first use. Unknown fields are an
    /// error, never silently dropped.
    fn resolve_field(
        &self,
        builder: &mut SelectBuilder<'_>,
        field: &str,
    ) -> Result<String, AppError> {
        match field.split_once('.') {
            None => {
                if !self.resource.has_column(field) {
                    return Err(AppError::BadRequest(format!("unknown field '{}'", field)));
                }
                Ok(format!("{}.{}", builder.alias(), quoted(field)))
            }
            Some((qualifier, column)) => {
                if qualifier == builder.alias() {
                    if !self.resource.has_column(column) {
                        return Err(AppError::BadRequest(format!("unknown field '{}'", field)));
                    }
                    return Ok(format!("{}.{}", builder.alias(), quoted(column)));
                }
                let assoc = self.resource.association(qualifier).ok_or_else(|| {
                    AppError::BadRequest(format!("unknown association '{}'", qualifier))
                })?;
                if !assoc.columns.contains(column) {
                    return Err(AppError::BadRequest(format!("unknown field '{}'", field)));
                }
                builder.join_association(assoc);
                Ok(format!("{}.{}", quoted(&assoc.name), quoted(column)))
            }
        }
    }

    /// Resolve order columns through the same field rules and push the
    /// clauses onto the builder.
    pub fn apply_order(
        &self,
        builder: &mut SelectBuilder<'_>,
        order: &[(String, OrderDirection)],
    ) -> Result<(), AppError> {
        for (column, direction) in order {
            let column_sql = self.resolve_field(builder, column)?;
            builder.push_order(column_sql, *direction);
        }
        Ok(())
    }
}

fn scalar_value(field: &str, value: &Value) -> Result<Value, AppError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => Ok(value.clone()),
        _ => Err(AppError::BadRequest(format!(
            "value for '{}' must be a scalar",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        resolve, AssociationConfig, ColumnConfig, PkTypeConfig, ResolvedModel, ResourceConfig,
    };
    use crate::query::criteria::Connective;
    use crate::sql::BoundParam;
    use serde_json::json;

    fn model() -> ResolvedModel {
        let columns = |names: &[&str]| {
            names
                .iter()
                .map(|n| ColumnConfig {
                    name: n.to_string(),
                    pg_type: None,
                })
                .collect()
        };
        resolve(&[
            ResourceConfig {
                path_segment: "articles".to_string(),
                schema: "public".to_string(),
                table: "article".to_string(),
                primary_key: "id".to_string(),
                pk_type: PkTypeConfig::Uuid,
                columns: columns(&["id", "title", "views", "author_id"]),
                search: None,
                associations: vec![AssociationConfig {
                    name: "author".to_string(),
                    target: "authors".to_string(),
                    our_key: "author_id".to_string(),
                    their_key: "id".to_string(),
                }],
            },
            ResourceConfig {
                path_segment: "authors".to_string(),
                schema: "public".to_string(),
                table: "author".to_string(),
                primary_key: "id".to_string(),
                pk_type: PkTypeConfig::Uuid,
                columns: columns(&["id", "name"]),
                search: None,
                associations: vec![],
            },
        ])
        .unwrap()
    }

    fn compile_sql(nodes: &[Node]) -> (String, Vec<BoundParam>) {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        compiler.compile(&mut builder, &mut root, nodes).unwrap();
        let where_sql = root.to_sql().unwrap_or_default();
        let q = builder.build();
        (where_sql, q.params)
    }

    #[test]
    fn qualification_is_idempotent() {
        let (bare, _) = compile_sql(&[Node::leaf("title", Operator::Eq, json!("x"))]);
        let (qualified, _) = compile_sql(&[Node::leaf("t.title", Operator::Eq, json!("x"))]);
        assert_eq!(bare, qualified);
        assert_eq!(bare, "t.\"title\" = $1");
    }

    #[test]
    fn scalar_leaves_bind_monotonically_from_one() {
        let (sql, params) = compile_sql(&[
            Node::leaf("title", Operator::Eq, json!("a")),
            Node::group(
                Connective::Or,
                vec![
                    Node::leaf("views", Operator::Gt, json!(1)),
                    Node::leaf("views", Operator::Lt, json!(9)),
                ],
            ),
            Node::leaf("title", Operator::NotLike, json!("%b%")),
        ]);
        assert_eq!(params.len(), 4);
        assert_eq!(
            sql,
            "t.\"title\" = $1 AND (t.\"views\" > $2 OR t.\"views\" < $3) AND t.\"title\" NOT LIKE $4"
        );
    }

    #[test]
    fn between_consumes_two_sequential_parameters() {
        let (sql, params) = compile_sql(&[Node::leaf("views", Operator::Between, json!([1, 6]))]);
        assert_eq!(sql, "t.\"views\" BETWEEN $1 AND $2");
        assert_eq!(params[0].value, json!(1));
        assert_eq!(params[1].value, json!(6));
    }

    #[test]
    fn in_binds_no_positional_parameters() {
        let (sql, params) = compile_sql(&[Node::leaf("views", Operator::In, json!([1, 2]))]);
        assert_eq!(sql, "t.\"views\" IN (1, 2)");
        assert!(params.is_empty());
    }

    #[test]
    fn not_in_inlines_escaped_literals() {
        let (sql, params) = compile_sql(&[Node::leaf(
            "title",
            Operator::NotIn,
            json!(["o'brien", "42", "7c9e6679-7425-40de-944b-e07fc1f90ae7"]),
        )]);
        assert_eq!(
            sql,
            "t.\"title\" NOT IN ('o''brien', 42, '7c9e6679-7425-40de-944b-e07fc1f90ae7')"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn null_tests_bind_nothing() {
        let (sql, params) = compile_sql(&[
            Node::leaf("title", Operator::IsNull, json!(null)),
            Node::leaf("views", Operator::IsNotNull, json!(null)),
        ]);
        assert_eq!(sql, "t.\"title\" IS NULL AND t.\"views\" IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn uuid_values_get_cast_placeholders() {
        let (sql, params) = compile_sql(&[Node::leaf(
            "author_id",
            Operator::Eq,
            json!("7c9e6679-7425-40de-944b-e07fc1f90ae7"),
        )]);
        assert_eq!(sql, "t.\"author_id\" = $1::uuid");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn sibling_groups_join_under_outer_conjunction() {
        let (sql, _) = compile_sql(&[
            Node::group(
                Connective::And,
                vec![Node::leaf("title", Operator::Eq, json!(1))],
            ),
            Node::group(
                Connective::Or,
                vec![Node::leaf("views", Operator::Eq, json!(2))],
            ),
        ]);
        assert_eq!(sql, "(t.\"title\" = $1) AND (t.\"views\" = $2)");
    }

    #[test]
    fn association_fields_join_and_qualify() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("author.name", Operator::Eq, json!("ada"))],
            )
            .unwrap();
        assert_eq!(root.to_sql().unwrap(), "\"author\".\"name\" = $1");
        let q = builder.build();
        assert!(q.sql.contains("LEFT JOIN \"public\".\"author\""));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        let err = compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("password", Operator::Eq, json!("x"))],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("password")));
    }

    #[test]
    fn empty_in_list_is_rejected() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        let err = compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("views", Operator::In, json!([]))],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn wrong_between_arity_is_rejected() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        let err = compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("views", Operator::Between, json!([1, 2, 3]))],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn pathological_nesting_is_rejected() {
        let mut node = Node::leaf("views", Operator::Eq, json!(1));
        for _ in 0..64 {
            node = Node::group(Connective::And, vec![node]);
        }
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        let err = compiler
            .compile(&mut builder, &mut root, &[node])
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("nesting")));
    }

    #[test]
    fn counter_spans_separate_compile_calls() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        let mut root = Composite::new(Connective::And);
        compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("title", Operator::Eq, json!("a"))],
            )
            .unwrap();
        compiler
            .compile(
                &mut builder,
                &mut root,
                &[Node::leaf("views", Operator::Eq, json!(2))],
            )
            .unwrap();
        assert_eq!(
            root.to_sql().unwrap(),
            "t.\"title\" = $1 AND t.\"views\" = $2"
        );
        assert_eq!(builder.param_count(), 2);
    }

    #[test]
    fn order_columns_resolve_like_criteria_fields() {
        let model = model();
        let resource = model.resource_by_path("articles").unwrap();
        let compiler = CriteriaCompiler::new(resource);
        let mut builder = SelectBuilder::new(resource);
        compiler
            .apply_order(
                &mut builder,
                &[
                    ("title".to_string(), OrderDirection::Desc),
                    ("author.name".to_string(), OrderDirection::Asc),
                ],
            )
            .unwrap();
        let q = builder.build();
        assert!(q
            .sql
            .ends_with("ORDER BY t.\"title\" DESC, \"author\".\"name\" ASC"));
        assert!(q.sql.contains("LEFT JOIN"));
        let err = {
            let mut builder = SelectBuilder::new(resource);
            compiler.apply_order(&mut builder, &[("nope".to_string(), OrderDirection::Asc)])
        }
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
