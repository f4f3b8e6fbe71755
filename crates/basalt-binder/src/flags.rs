//! Per-call interpretation flags.

use bitflags::bitflags;

bitflags! {
    /// Requirements the caller places on the expression being interpreted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExpressionFlags: u32 {
        /// The result must be a compile-time constant.
        const CONSTANT_REQUIRED = 1 << 0;
        /// A value is required (not a method group, type or namespace).
        const VALUE_REQUIRED = 1 << 1;
        /// The expression is the target of an assignment.
        const ASSIGNMENT_TARGET = 1 << 2;
        /// A type name may stand as the result (qualifier position).
        const ALLOW_TYPE = 1 << 3;
        /// A namespace name may stand as the result (qualifier position).
        const ALLOW_NAMESPACE = 1 << 4;
        /// A method group is returned as is instead of being invoked.
        const ALLOW_METHOD_GROUP = 1 << 5;
        /// A call to a `Sub` is acceptable (statement position).
        const ALLOW_VOID = 1 << 6;
        /// Implicit conversions are checked as if written with `CType`.
        const EXPLICIT = 1 << 7;
        /// Target-typed forms stay unbound for a later reclassification.
        const DEFER_TARGET_TYPED = 1 << 8;
    }
}

impl ExpressionFlags {
    /// Flags for an ordinary rvalue.
    pub const VALUE: Self = Self::VALUE_REQUIRED;

    /// Flags for the qualifier of a member access.
    pub const QUALIFIER: Self = Self::ALLOW_TYPE.union(Self::ALLOW_NAMESPACE);

    /// Flags for a statement-level call.
    pub const STATEMENT: Self = Self::ALLOW_VOID;
}
