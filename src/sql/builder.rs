//! Parameterized SELECT assembly from a resolved resource: predicate
//! tree, positional parameters, joins, ordering and paging.

use crate::model::{ResolvedAssociation, ResolvedResource};
use crate::query::criteria::Connective;
use crate::query::value_type::BindType;
use serde_json::Value;
use std::collections::HashSet;

/// Alias of the base table in every compiled statement. Unqualified
/// criteria fields are implicitly qualified with it.
pub const ROOT_ALIAS: &str = "t";

/// Quote identifier for PostgreSQL (safe: only from the resolved model).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// A positional parameter awaiting binding: value plus optional type
/// hint driving the placeholder cast.
#[derive(Clone, Debug)]
pub struct BoundParam {
    pub value: Value,
    pub bind_type: Option<BindType>,
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BoundParam>,
}

/// One node of the compiled predicate tree: either a finished SQL
/// comparison fragment or a boolean composite of child predicates.
#[derive(Clone, Debug)]
pub enum Predicate {
    Comparison(String),
    Composite(Composite),
}

/// Boolean connective holding child predicates. Renders parenthesized;
/// empty composites render nothing.
#[derive(Clone, Debug)]
pub struct Composite {
    pub connective: Connective,
    children: Vec<Predicate>,
}

impl Composite {
    pub fn new(connective: Connective) -> Self {
        Composite {
            connective,
            children: Vec::new(),
        }
    }

    pub fn add(&mut self, predicate: Predicate) {
        self.children.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_sql(&self) -> Option<String> {
        let parts: Vec<String> = self
            .children
            .iter()
            .filter_map(|p| match p {
                Predicate::Comparison(sql) => Some(sql.clone()),
                Predicate::Composite(c) => c.to_sql().map(|s| format!("({})", s)),
            })
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(&format!(" {} ", self.connective.as_sql())))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Builds one SELECT statement for one resource. Owns the positional
/// parameter counter for the compilation pass: indices are 1-based and
/// strictly increasing across every sub-compilation of the statement.
pub struct SelectBuilder<'a> {
    resource: &'a ResolvedResource,
    params: Vec<BoundParam>,
    joins: Vec<String>,
    joined: HashSet<String>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    predicate: Option<Composite>,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(resource: &'a ResolvedResource) -> Self {
        SelectBuilder {
            resource,
            params: Vec::new(),
            joins: Vec::new(),
            joined: HashSet::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            predicate: None,
        }
    }

    pub fn alias(&self) -> &'static str {
        ROOT_ALIAS
    }

    /// Bind a value at the next positional index and return that index.
    pub fn bind(&mut self, value: Value, bind_type: Option<BindType>) -> u32 {
        self.params.push(BoundParam { value, bind_type });
        self.params.len() as u32
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Placeholder text for a bound index, with the hint's cast applied.
    pub fn placeholder(index: u32, bind_type: Option<BindType>) -> String {
        match bind_type {
            Some(t) => format!("${}{}", index, t.cast()),
            None => format!("${}", index),
        }
    }

    /// LEFT JOIN the association's target table, aliased by association
    /// name. Adding the same association twice is a no-op.
    pub fn join_association(&mut self, assoc: &ResolvedAssociation) {
        if !self.joined.insert(assoc.name.clone()) {
            return;
        }
        self.joins.push(format!(
            "LEFT JOIN {} {} ON {}.{} = {}.{}",
            qualified_table(&assoc.schema_name, &assoc.table_name),
            quoted(&assoc.name),
            quoted(&assoc.name),
            quoted(&assoc.their_key),
            ROOT_ALIAS,
            quoted(&assoc.our_key),
        ));
    }

    /// Append an ORDER BY clause; `column_sql` is an already-resolved
    /// qualified column fragment.
    pub fn push_order(&mut self, column_sql: String, direction: OrderDirection) {
        self.order
            .push(format!("{} {}", column_sql, direction.as_sql()));
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub fn set_predicate(&mut self, predicate: Composite) {
        self.predicate = Some(predicate);
    }

    /// SELECT list: each column alias-qualified, except custom enum
    /// (schema.typename) and numeric as col::text so sqlx returns String.
    fn select_column_list(&self) -> String {
        self.resource
            .columns
            .iter()
            .map(|c| {
                let q = quoted(&c.name);
                let pg_type = c.pg_type.as_deref().unwrap_or("");
                if pg_type.contains('.') || pg_type == "numeric" {
                    format!("{}.{}::text AS {}", ROOT_ALIAS, q, q)
                } else {
                    format!("{}.{}", ROOT_ALIAS, q)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn build(self) -> QueryBuf {
        let table = qualified_table(&self.resource.schema_name, &self.resource.table_name);
        let mut sql = format!(
            "SELECT {} FROM {} {}",
            self.select_column_list(),
            table,
            ROOT_ALIAS
        );
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if let Some(where_sql) = self.predicate.as_ref().and_then(Composite::to_sql) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        if let Some(n) = self.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }
        QueryBuf {
            sql,
            params: self.params,
        }
    }
}
