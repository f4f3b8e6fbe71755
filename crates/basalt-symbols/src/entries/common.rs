//! Small structures shared by the declaration entries.

use basalt_core::TypeHash;

/// Declared accessibility of a type or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    /// Visible within the compilation unit.
    Friend,
    /// Visible to the declaring type and types derived from it.
    Protected,
    /// Visible to the declaring type only.
    Private,
}

/// Declared variance of a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    /// `Out T`: covariant.
    Out,
    /// `In T`: contravariant.
    In,
}

/// A generic type or method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamEntry {
    pub name: String,
    pub variance: Variance,
}

impl GenericParamEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
        }
    }

    pub fn covariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Out,
        }
    }

    pub fn contravariant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::In,
        }
    }
}

/// A reference from a type (or module) to one of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Procedure(TypeHash),
    Property(TypeHash),
    Field(TypeHash),
    /// A nested type.
    Type(TypeHash),
}

impl MemberRef {
    pub fn hash(self) -> TypeHash {
        match self {
            MemberRef::Procedure(h) | MemberRef::Property(h) | MemberRef::Field(h) | MemberRef::Type(h) => h,
        }
    }
}

/// Case-fold a name for map keys.
pub fn fold_name(name: &str) -> String {
    name.to_ascii_lowercase()
}
