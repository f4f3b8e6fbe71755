//! The semantic type model.
//!
//! [`DataType`] is a structural description of a type as the binder sees it.
//! Declared types are referenced by [`TypeHash`]; constructed forms (arrays,
//! nullable wrappers, generic instantiations) are spelled out structurally so
//! two occurrences of `Integer()` or `List(Of String)` compare equal without
//! any interning.
//!
//! Rendering a `Named` type needs the symbol table; see
//! `SymbolTable::display_type` in `basalt-symbols`.

use crate::{PrimitiveKind, TypeHash};

/// A complete semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No value: the result of a `Sub` call, or a construct still waiting for
    /// a target type.
    Void,
    /// A predefined primitive type.
    Primitive(PrimitiveKind),
    /// The universal base type; the umbrella type for late binding.
    Object,
    /// A declared class, structure, interface, enum, delegate or module,
    /// optionally instantiated with type arguments.
    Named { hash: TypeHash, args: Vec<DataType> },
    /// An array of the given element type and rank.
    Array { element: Box<DataType>, rank: u32 },
    /// `T?`: a nullable wrapper around a value type.
    Nullable(Box<DataType>),
    /// A generic type parameter, identified by its declaring entity and position.
    GenericParam { owner: TypeHash, index: u32 },
    /// The type of an expression that failed to bind.
    Error,
}

impl DataType {
    #[inline]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        DataType::Primitive(kind)
    }

    #[inline]
    pub fn boolean() -> Self {
        DataType::Primitive(PrimitiveKind::Boolean)
    }

    #[inline]
    pub fn integer() -> Self {
        DataType::Primitive(PrimitiveKind::Integer)
    }

    #[inline]
    pub fn long() -> Self {
        DataType::Primitive(PrimitiveKind::Long)
    }

    #[inline]
    pub fn double() -> Self {
        DataType::Primitive(PrimitiveKind::Double)
    }

    #[inline]
    pub fn string() -> Self {
        DataType::Primitive(PrimitiveKind::String)
    }

    /// A non-generic declared type.
    #[inline]
    pub fn named(hash: TypeHash) -> Self {
        DataType::Named { hash, args: Vec::new() }
    }

    /// A generic instantiation of a declared type.
    #[inline]
    pub fn generic(hash: TypeHash, args: Vec<DataType>) -> Self {
        DataType::Named { hash, args }
    }

    pub fn array(element: DataType, rank: u32) -> Self {
        DataType::Array {
            element: Box::new(element),
            rank,
        }
    }

    pub fn nullable(inner: DataType) -> Self {
        DataType::Nullable(Box::new(inner))
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, DataType::Error)
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, DataType::Object)
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Primitive(PrimitiveKind::String))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array { .. })
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            DataType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Hash of the declared type, if this is a `Named` type.
    pub fn type_hash(&self) -> Option<TypeHash> {
        match self {
            DataType::Named { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    /// Type arguments of a generic instantiation (empty otherwise).
    pub fn type_args(&self) -> &[DataType] {
        match self {
            DataType::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// Element type and rank of an array type.
    pub fn array_parts(&self) -> Option<(&DataType, u32)> {
        match self {
            DataType::Array { element, rank } => Some((element, *rank)),
            _ => None,
        }
    }

    /// The wrapped type of a nullable.
    pub fn nullable_underlying(&self) -> Option<&DataType> {
        match self {
            DataType::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    /// Strip one nullable wrapper, if present.
    pub fn strip_nullable(&self) -> &DataType {
        self.nullable_underlying().unwrap_or(self)
    }

    /// Whether any generic parameter occurs anywhere inside this type.
    pub fn contains_generic_param(&self) -> bool {
        match self {
            DataType::GenericParam { .. } => true,
            DataType::Named { args, .. } => args.iter().any(DataType::contains_generic_param),
            DataType::Array { element, .. } => element.contains_generic_param(),
            DataType::Nullable(inner) => inner.contains_generic_param(),
            _ => false,
        }
    }

    /// Replace generic parameters of `owner` with `args` (by position).
    ///
    /// Parameters of other owners, and positions past the end of `args`, are
    /// left untouched.
    pub fn substitute(&self, owner: TypeHash, args: &[DataType]) -> DataType {
        match self {
            DataType::GenericParam { owner: o, index } if *o == owner => args
                .get(*index as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            DataType::Named { hash, args: inner } => DataType::Named {
                hash: *hash,
                args: inner.iter().map(|a| a.substitute(owner, args)).collect(),
            },
            DataType::Array { element, rank } => DataType::array(element.substitute(owner, args), *rank),
            DataType::Nullable(inner) => DataType::nullable(inner.substitute(owner, args)),
            other => other.clone(),
        }
    }
}

impl From<PrimitiveKind> for DataType {
    fn from(kind: PrimitiveKind) -> Self {
        DataType::Primitive(kind)
    }
}
