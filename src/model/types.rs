//! Raw resource config types as supplied by the embedding application
//! (JSON file or inline structs).

use serde::{Deserialize, Serialize};

fn default_schema() -> String {
    "public".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// URL segment the resource is mounted at (e.g. "articles").
    pub path_segment: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub primary_key: String,
    #[serde(default)]
    pub pk_type: PkTypeConfig,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// PostgreSQL type name, used for SQL casts (e.g. "timestamptz") and
    /// for ::text coercion of enum/numeric select columns.
    #[serde(default)]
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PkTypeConfig {
    #[default]
    Uuid,
    Bigint,
    Text,
}

/// Free-text search settings for a resource. Resources without one (or
/// with an empty column list) have search silently disabled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    pub columns: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
}

/// How a search term is turned into a LIKE pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
}

/// A navigable association: criteria fields qualified with `name.` join
/// to the target resource through our_key = their_key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub name: String,
    /// path_segment of the target resource.
    pub target: String,
    pub our_key: String,
    pub their_key: String,
}
