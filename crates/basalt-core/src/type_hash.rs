//! Deterministic identities for declarations.
//!
//! Every declaration the binder can reference (types, procedures, properties,
//! fields) is identified by a [`TypeHash`] computed from its qualified name and,
//! for overloadable members, its signature. Identifiers in this language are
//! case-insensitive, so all names are folded to lowercase before hashing.
//!
//! # Examples
//!
//! ```
//! use basalt_core::TypeHash;
//!
//! assert_eq!(TypeHash::from_name("System.String"), TypeHash::from_name("system.string"));
//!
//! let owner = TypeHash::from_name("Widget");
//! let a = TypeHash::from_signature(owner, "Resize", "(Integer)");
//! let b = TypeHash::from_signature(owner, "Resize", "(Long)");
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants so a type and a member with the same
/// spelling never collide.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for procedure hashes.
    pub const PROCEDURE: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for non-procedure member hashes (fields, properties).
    pub const MEMBER: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for implicitly declared locals and synthesized helpers.
    pub const SYNTHETIC: u64 = 0x1a095090689d4647;
}

/// A deterministic 64-bit identity for a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

fn fold(name: &str) -> u64 {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        xxh64(name.to_ascii_lowercase().as_bytes(), 0)
    } else {
        xxh64(name.as_bytes(), 0)
    }
}

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Identity of a type from its qualified name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ fold(name))
    }

    /// Identity of a field or property, scoped to its owner.
    #[inline]
    pub fn from_member(owner: TypeHash, name: &str) -> Self {
        TypeHash(
            (hash_constants::MEMBER ^ owner.0)
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(fold(name)),
        )
    }

    /// Identity of one overload of a procedure.
    ///
    /// `signature` is any stable rendering of the parameter list; two overloads
    /// with the same owner and name must render distinct signatures.
    #[inline]
    pub fn from_signature(owner: TypeHash, name: &str, signature: &str) -> Self {
        let base = (hash_constants::PROCEDURE ^ owner.0)
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(fold(name));
        TypeHash(base.wrapping_mul(hash_constants::SEP) ^ xxh64(signature.as_bytes(), 0))
    }

    /// Identity for compiler-synthesized declarations (implicit locals, temporaries).
    #[inline]
    pub fn synthetic(name: &str, ordinal: u32) -> Self {
        TypeHash(
            (hash_constants::SYNTHETIC ^ fold(name))
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(u64::from(ordinal)),
        )
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(TypeHash::from_name("Widget"), TypeHash::from_name("WIDGET"));
    }

    #[test]
    fn domains_do_not_collide() {
        let owner = TypeHash::from_name("Widget");
        assert_ne!(TypeHash::from_name("Size"), TypeHash::from_member(owner, "Size"));
        assert_ne!(
            TypeHash::from_member(owner, "Size"),
            TypeHash::from_signature(owner, "Size", "()")
        );
    }

    #[test]
    fn members_are_scoped_to_owner() {
        let a = TypeHash::from_member(TypeHash::from_name("A"), "X");
        let b = TypeHash::from_member(TypeHash::from_name("B"), "X");
        assert_ne!(a, b);
    }

    #[test]
    fn synthetic_ordinals_differ() {
        assert_ne!(TypeHash::synthetic("x", 0), TypeHash::synthetic("x", 1));
        assert!(!TypeHash::synthetic("x", 0).is_empty());
    }
}
