//! Registration errors.

use thiserror::Error;

/// Errors raised while populating a [`SymbolTable`](crate::SymbolTable).
///
/// These describe a malformed host-supplied table, never a problem in the
/// program being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A type with this qualified name and arity already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A member with the same identity already exists.
    #[error("duplicate registration: {name} already registered as {kind}")]
    DuplicateRegistration { name: String, kind: &'static str },

    /// A member was registered against a type that does not exist.
    #[error("owner not found for member '{0}'")]
    OwnerNotFound(String),
}
