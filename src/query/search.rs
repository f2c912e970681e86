//! Free-text search: expands a normalized search spec plus the
//! resource's searchable columns into a criteria subtree of LIKE
//! leaves. AND across terms, OR across columns.

use crate::model::{MatchMode, ResolvedSearch};
use crate::query::criteria::{Connective, Node, Operator};
use serde_json::Value;

/// Normalized search terms per connective. Built by the parameter
/// parser; terms are already trimmed, deduplicated and non-empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchSpec {
    pub and_terms: Vec<String>,
    pub or_terms: Vec<String>,
}

impl SearchSpec {
    pub fn is_empty(&self) -> bool {
        self.and_terms.is_empty() && self.or_terms.is_empty()
    }
}

pub struct SearchTermCompiler<'a> {
    search: &'a ResolvedSearch,
}

impl<'a> SearchTermCompiler<'a> {
    pub fn new(search: &'a ResolvedSearch) -> Self {
        SearchTermCompiler { search }
    }

    /// Produce the criteria subtree for the spec, or `None` when there
    /// is nothing to match: no searchable columns (search silently
    /// disabled) or no terms left after normalization. Both no-ops are
    /// intentional, not errors.
    pub fn compile(&self, spec: &SearchSpec) -> Option<Node> {
        if self.search.columns.is_empty() || spec.is_empty() {
            return None;
        }
        let mut groups = Vec::new();
        if !spec.and_terms.is_empty() {
            groups.push(self.connective_group(Connective::And, &spec.and_terms));
        }
        if !spec.or_terms.is_empty() {
            groups.push(self.connective_group(Connective::Or, &spec.or_terms));
        }
        match groups.len() {
            1 => groups.pop(),
            _ => Some(Node::group(Connective::And, groups)),
        }
    }

    /// The connective groups terms; each term's per-column leaves are
    /// OR'd internally regardless of the outer connective, since one
    /// term only has to hit one column.
    fn connective_group(&self, connective: Connective, terms: &[String]) -> Node {
        let term_groups = terms
            .iter()
            .map(|term| Node::group(Connective::Or, self.term_leaves(term)))
            .collect();
        Node::group(connective, term_groups)
    }

    fn term_leaves(&self, term: &str) -> Vec<Node> {
        let pattern = match self.search.mode {
            MatchMode::Contains => format!("%{}%", term),
            MatchMode::StartsWith => format!("{}%", term),
            MatchMode::EndsWith => format!("%{}", term),
        };
        self.search
            .columns
            .iter()
            .map(|col| Node::leaf(col.clone(), Operator::Like, Value::String(pattern.clone())))
            .collect()
    }
}
