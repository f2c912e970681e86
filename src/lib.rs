//! Sieve SDK: REST backend library with a dynamic criteria-to-query
//! compiler. Untrusted `where`/`order`/`search`/`limit`/`offset` query
//! parameters become safe, parameterized PostgreSQL predicates.

pub mod error;
pub mod handlers;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use error::{AppError, ConfigError};
pub use model::{resolve, ResolvedModel, ResolvedResource, ResourceConfig};
pub use query::{CriteriaCompiler, ListParams, SearchTermCompiler};
pub use routes::{common_routes, resource_routes};
pub use service::QueryService;
pub use sql::{Composite, Predicate, QueryBuf, SelectBuilder};
pub use state::AppState;
