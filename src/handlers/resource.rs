//! Resource read handlers: filtered/ordered/searched list, and read by
//! primary key. Both compile through the criteria engine.

use crate::error::AppError;
use crate::model::{PkType, ResolvedResource};
use crate::query::criteria::{Connective, Node, Operator};
use crate::query::{CriteriaCompiler, ListParams, SearchTermCompiler};
use crate::response::{MetaCount, SuccessMany, SuccessOne};
use crate::service::QueryService;
use crate::sql::{Composite, SelectBuilder};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1000;

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let resource = state
        .model
        .resource_by_path(&path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.clone()))?;
    let params = ListParams::from_pairs(&pairs)?;

    let mut builder = SelectBuilder::new(resource);
    let mut root = Composite::new(Connective::And);
    let compiler = CriteriaCompiler::new(resource);
    compiler.compile(&mut builder, &mut root, &params.criteria)?;

    if let Some(search) = &resource.search {
        if let Some(node) = SearchTermCompiler::new(search).compile(&params.search) {
            // Same builder, so search binds continue the counter.
            compiler.compile(&mut builder, &mut root, &[node])?;
        }
    }

    if params.order.is_empty() {
        compiler.apply_order(
            &mut builder,
            &[(resource.pk_column.clone(), crate::sql::OrderDirection::Asc)],
        )?;
    } else {
        compiler.apply_order(&mut builder, &params.order)?;
    }
    builder.set_predicate(root);
    builder.set_limit(params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
    builder.set_offset(params.offset.unwrap_or(0));

    let q = builder.build();
    let rows = QueryService::fetch_all(&state.pool, &q).await?;
    let count = rows.len() as u64;
    Ok((
        axum::http::StatusCode::OK,
        Json(SuccessMany {
            data: rows,
            meta: MetaCount { count },
        }),
    ))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let resource = state
        .model
        .resource_by_path(&path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment))?;
    let id = parse_id(&id_str, resource)?;

    let mut builder = SelectBuilder::new(resource);
    let mut root = Composite::new(Connective::And);
    let compiler = CriteriaCompiler::new(resource);
    compiler.compile(
        &mut builder,
        &mut root,
        &[Node::leaf(resource.pk_column.clone(), Operator::Eq, id)],
    )?;
    builder.set_predicate(root);
    builder.set_limit(1);

    let q = builder.build();
    let row = QueryService::fetch_optional(&state.pool, &q)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok((
        axum::http::StatusCode::OK,
        Json(SuccessOne {
            data: row,
            meta: None,
        }),
    ))
}

fn parse_id(id_str: &str, resource: &ResolvedResource) -> Result<Value, AppError> {
    Ok(match resource.pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str)
                .map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
            Value::String(u.to_string())
        }
        PkType::BigInt => {
            let n: i64 = id_str
                .parse()
                .map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}
