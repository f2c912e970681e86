//! Resource routes built from the resolved model.
//! Parameterized paths so Path extractors receive the segment and id;
//! handlers resolve the resource by path.

use crate::handlers::resource::{list, read};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list))
        .route("/:path_segment/:id", get(read))
        .with_state(state)
}
