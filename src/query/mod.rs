//! The criteria-to-query core: parameter parsing, the criteria tree,
//! free-text search expansion and the recursive predicate compiler.

pub mod compiler;
pub mod criteria;
pub mod params;
pub mod search;
pub mod value_type;

pub use compiler::CriteriaCompiler;
pub use criteria::{Connective, Node, Operator};
pub use params::{ListParams, parse_criteria, parse_search};
pub use search::{SearchSpec, SearchTermCompiler};
pub use value_type::BindType;
