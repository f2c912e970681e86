//! Resolved resource model: config validated and flattened for runtime use.
//!
//! Every identifier that ever reaches SQL text (columns, tables,
//! association names) comes from this model, never from the request.

use crate::error::ConfigError;
use crate::model::types::{MatchMode, PkTypeConfig, ResourceConfig};
use std::collections::{HashMap, HashSet};

/// Primary key type for parsing path ids.
#[derive(Clone, Debug)]
pub enum PkType {
    Uuid,
    BigInt,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type name for SQL casts when binding string values.
    pub pg_type: Option<String>,
}

/// Search settings with columns verified against the resource.
#[derive(Clone, Debug)]
pub struct ResolvedSearch {
    pub columns: Vec<String>,
    pub mode: MatchMode,
}

/// An association flattened for the compiler: the target's table and
/// column set are copied in so field resolution needs no model lookup.
#[derive(Clone, Debug)]
pub struct ResolvedAssociation {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    /// Column on this resource's table used in the join.
    pub our_key: String,
    /// Column on the target table used in the join.
    pub their_key: String,
    /// Target columns addressable as `name.column` in criteria.
    pub columns: HashSet<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub path_segment: String,
    pub schema_name: String,
    pub table_name: String,
    pub pk_column: String,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub search: Option<ResolvedSearch>,
    pub associations: Vec<ResolvedAssociation>,
}

impl ResolvedResource {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&ResolvedAssociation> {
        self.associations.iter().find(|a| a.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        self.by_path.get(path).map(|i| &self.resources[*i])
    }
}

/// Build the resolved model from raw configs, checking every
/// cross-reference: duplicate paths, search columns, association
/// targets and join keys.
pub fn resolve(configs: &[ResourceConfig]) -> Result<ResolvedModel, ConfigError> {
    let by_path: HashMap<&str, &ResourceConfig> = {
        let mut m = HashMap::new();
        for c in configs {
            if m.insert(c.path_segment.as_str(), c).is_some() {
                return Err(ConfigError::DuplicatePathSegment(c.path_segment.clone()));
            }
        }
        m
    };

    let mut resources = Vec::with_capacity(configs.len());
    for config in configs {
        let column_names: HashSet<&str> = config.columns.iter().map(|c| c.name.as_str()).collect();
        if !column_names.contains(config.primary_key.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "primary key column",
                id: format!("{}.{}", config.path_segment, config.primary_key),
            });
        }

        let search = match &config.search {
            None => None,
            Some(s) => {
                for col in &s.columns {
                    if !column_names.contains(col.as_str()) {
                        return Err(ConfigError::MissingReference {
                            kind: "search column",
                            id: format!("{}.{}", config.path_segment, col),
                        });
                    }
                }
                Some(ResolvedSearch {
                    columns: s.columns.clone(),
                    mode: s.mode,
                })
            }
        };

        let mut associations = Vec::with_capacity(config.associations.len());
        for assoc in &config.associations {
            let target = by_path
                .get(assoc.target.as_str())
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "association target",
                    id: assoc.target.clone(),
                })?;
            if !column_names.contains(assoc.our_key.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "association key",
                    id: format!("{}.{}", config.path_segment, assoc.our_key),
                });
            }
            if !target.columns.iter().any(|c| c.name == assoc.their_key) {
                return Err(ConfigError::MissingReference {
                    kind: "association key",
                    id: format!("{}.{}", target.path_segment, assoc.their_key),
                });
            }
            associations.push(ResolvedAssociation {
                name: assoc.name.clone(),
                schema_name: target.schema.clone(),
                table_name: target.table.clone(),
                our_key: assoc.our_key.clone(),
                their_key: assoc.their_key.clone(),
                columns: target.columns.iter().map(|c| c.name.clone()).collect(),
            });
        }

        resources.push(ResolvedResource {
            path_segment: config.path_segment.clone(),
            schema_name: config.schema.clone(),
            table_name: config.table.clone(),
            pk_column: config.primary_key.clone(),
            pk_type: match config.pk_type {
                PkTypeConfig::Uuid => PkType::Uuid,
                PkTypeConfig::Bigint => PkType::BigInt,
                PkTypeConfig::Text => PkType::Text,
            },
            columns: config
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    pg_type: c.pg_type.clone(),
                })
                .collect(),
            search,
            associations,
        });
    }

    let by_path = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.path_segment.clone(), i))
        .collect();
    Ok(ResolvedModel { resources, by_path })
}
