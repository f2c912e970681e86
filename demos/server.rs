//! Example server: resolves a small article/author model and mounts
//! common and resource routes.
//!
//! Try:
//!   GET /api/v1/articles?where={"and":[["views","gte",10]]}&order=-views&limit=20
//!   GET /api/v1/articles?search=rust%20async

use sieve_sdk::model::{
    AssociationConfig, ColumnConfig, MatchMode, ResourceConfig, SearchConfig,
};
use sieve_sdk::{common_routes, resolve, resource_routes, AppState};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sieve_sdk=debug".parse()?))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/sieve".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let model = resolve(&demo_model())?;
    let state = AppState {
        pool,
        model: Arc::new(model),
    };

    let app = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/v1", resource_routes(state));

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn demo_model() -> Vec<ResourceConfig> {
    let column = |name: &str, pg_type: Option<&str>| ColumnConfig {
        name: name.to_string(),
        pg_type: pg_type.map(str::to_string),
    };
    vec![
        ResourceConfig {
            path_segment: "articles".to_string(),
            schema: "public".to_string(),
            table: "article".to_string(),
            primary_key: "id".to_string(),
            pk_type: Default::default(),
            columns: vec![
                column("id", Some("uuid")),
                column("title", Some("text")),
                column("body", Some("text")),
                column("views", Some("bigint")),
                column("published_at", Some("timestamptz")),
                column("author_id", Some("uuid")),
            ],
            search: Some(SearchConfig {
                columns: vec!["title".to_string(), "body".to_string()],
                mode: MatchMode::Contains,
            }),
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
            pk_type: Default::default(),
            columns: vec![column("id", Some("uuid")), column("name", Some("text"))],
            search: None,
            associations: vec![],
        },
    ]
}
