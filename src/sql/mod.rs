//! Safe SQL builder: identifiers from the resolved model only, values
//! as positional parameters or escaped literals.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
