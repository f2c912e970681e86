//! Resource registry: raw config types and the resolved runtime model.

pub mod resolved;
pub mod types;

pub use resolved::*;
pub use types::*;
