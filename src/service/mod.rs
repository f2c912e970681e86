//! Query execution against PostgreSQL.

mod query;
pub use query::QueryService;
