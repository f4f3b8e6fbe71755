//! Symbol table model consumed by the Basalt binder.
//!
//! - [`SymbolTable`]: types, procedures, properties, fields, namespaces,
//!   imports, extension methods and XML prefixes
//! - [`LocalScope`]: locals and parameters of the body being bound
//! - [`WellKnownType`]: runtime library types referred to by role
//!
//! The binder only reads the table; hosts populate it up front, typically
//! starting from [`SymbolTable::with_runtime`].

pub mod entries;
mod error;
mod runtime;
mod scope;
mod table;

pub use entries::*;
pub use error::RegistrationError;
pub use runtime::WellKnownType;
pub use scope::{CapturedVar, LocalScope, LocalVar, ScopeError, VarLookup};
pub use table::{DelegateSignature, SymbolTable};
