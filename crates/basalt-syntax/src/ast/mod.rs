//! Parse-tree node definitions.

pub mod attribute;
pub mod expr;
pub mod ops;
pub mod types;

pub use attribute::*;
pub use expr::*;
pub use ops::*;
pub use types::*;
