//! Basalt expression binder.
//!
//! Turns expression syntax into typed bound trees: names are resolved,
//! overloads chosen, implicit conversions made explicit, constants folded
//! and every problem reported as a diagnostic.
//!
//! ## Entry points
//!
//! - [`interpret_expression`]: an expression with flags and an optional target type
//! - [`interpret_constant_expression`]: a standalone constant such as an enum value
//! - [`interpret_attribute`]: a custom attribute application
//! - [`bind_assignment`] and [`bind_local_initializer`]: assignment statements
//!
//! ## Modules
//!
//! - [`bound`]: the bound tree
//! - [`constant`]: compile-time arithmetic and conversions
//! - [`conversion`]: conversion classification between two types
//! - [`dominant`]: dominant type of a set of expression types
//! - [`operators`]: predefined operator result types
//! - [`overload`]: argument mapping and overload resolution
//! - [`type_resolver`]: syntax type references to semantic types

mod attribute;
mod binder;
pub mod bound;
pub mod constant;
mod context;
pub mod conversion;
pub mod dominant;
mod expr;
mod flags;
mod interpret;
mod late;
mod names;
pub mod operators;
pub mod overload;
pub mod type_resolver;

#[cfg(test)]
mod testing;

pub use attribute::{BoundAttribute, NamedAttributeArgument};
pub use binder::{Binder, Result};
pub use bound::{BoundExpr, BoundFlags, BoundKind};
pub use context::{InterpretationContext, WithTarget};
pub use conversion::{Conversion, ConversionClass, ConversionKind, classify};
pub use dominant::{DominantType, dominant_type};
pub use expr::assignment::{bind_assignment, bind_local_initializer};
pub use flags::ExpressionFlags;
pub use interpret::{interpret_attribute, interpret_constant_expression, interpret_expression};
pub use names::{Lookup, NameResolution};
pub use overload::{Resolution, resolve_overloads};
pub use type_resolver::TypeResolver;
