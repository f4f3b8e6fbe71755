//! The bound expression tree.
//!
//! Every node carries its type, source span and a small set of flags. The
//! `BAD` flag is sticky: a node built from a bad child is itself bad, so one
//! error is reported once and never cascades into follow-on diagnostics.
//!
//! Target-typed constructs (lambdas, `AddressOf`, `Nothing`, array literals)
//! may stay [`BoundKind::Unbound`] until a conversion supplies their type.
//! Reclassification consumes the pending node by value, so a pending form is
//! completed at most once.

use basalt_core::{ConstantValue, DataType, Span, TypeHash};
use basalt_symbols::{CapturedVar, MemberRef};
use basalt_syntax::{ArrayLiteralExpr, BinaryOp, CastKind, InstanceKeyword, LambdaExpr, UnaryOp};
use bitflags::bitflags;

use crate::conversion::Conversion;

bitflags! {
    /// Properties of a bound node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BoundFlags: u16 {
        /// The node or one of its descendants has an error.
        const BAD = 1 << 0;
        /// Storage location: local, field or array element.
        const LVALUE = 1 << 1;
        /// Location that may be read but not written.
        const READ_ONLY = 1 << 2;
        /// Written inside parentheses; never an lvalue.
        const PARENTHESIZED = 1 << 3;
        /// Call through an extension method.
        const EXTENSION_CALL = 1 << 4;
        /// Constant produced directly from a literal.
        const FROM_LITERAL = 1 << 5;
        /// Resolved at run time.
        const LATE_BOUND = 1 << 6;
    }
}

/// How an operator is carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorMethod {
    /// Built-in operator on primitive operands.
    Intrinsic,
    /// Built-in operator lifted over nullable operands.
    Lifted,
    /// User-defined operator procedure.
    UserDefined { procedure: TypeHash, lifted: bool },
    /// Run-time operator on `Object` operands.
    Late,
}

/// A call to a statically resolved procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCall<'ast> {
    /// Instance receiver; for extension calls, the value passed as the first
    /// parameter.
    pub receiver: Option<BoundExpr<'ast>>,
    pub procedure: TypeHash,
    /// Type arguments of a generic procedure, supplied or inferred.
    pub type_args: Vec<DataType>,
    /// One converted argument per parameter, defaults filled in.
    pub args: Vec<BoundExpr<'ast>>,
    /// Assignments that run after the call returns, writing `ByRef`
    /// temporaries back into their original locations.
    pub copy_backs: Vec<BoundExpr<'ast>>,
    pub is_extension: bool,
}

/// Copy-back of one late-bound `ByRef` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct LateCopyBack<'ast> {
    /// Position in the argument array.
    pub index: usize,
    /// Assignment from [`BoundKind::LateArgument`] into the original location;
    /// runs only if the callee actually took the argument by reference.
    pub assignment: BoundExpr<'ast>,
}

/// A member access or invocation resolved at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct LateCall<'ast> {
    pub receiver: Option<BoundExpr<'ast>>,
    /// Member name; `None` for a default-member index or invocation.
    pub member: Option<String>,
    /// Arguments converted to `Object`.
    pub args: Vec<BoundExpr<'ast>>,
    pub arg_names: Vec<Option<String>>,
    /// Which arguments are storage locations that may be passed by reference.
    pub by_ref: Vec<bool>,
    pub copy_backs: Vec<LateCopyBack<'ast>>,
}

/// A parameter of a bound lambda.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParameter {
    pub name: String,
    pub ty: DataType,
    pub ordinal: u32,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundLambda<'ast> {
    pub params: Vec<LambdaParameter>,
    pub body: BoundExpr<'ast>,
    pub captures: Vec<CapturedVar>,
    pub is_function: bool,
    pub is_async: bool,
}

/// An `Await` lowered onto the awaiter pattern.
///
/// The procedure hashes are `None` when the await is late bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAwait<'ast> {
    pub operand: BoundExpr<'ast>,
    pub awaiter: DataType,
    pub get_awaiter: Option<TypeHash>,
    pub get_awaiter_is_extension: bool,
    pub is_completed: Option<TypeHash>,
    pub get_result: Option<TypeHash>,
}

/// Overloads found for a name, not yet applied to arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberGroup<'ast> {
    pub receiver: Option<BoundExpr<'ast>>,
    pub name: String,
    /// Procedures or properties visible on the receiver.
    pub members: Vec<MemberRef>,
    /// Extension procedures with this name.
    pub extensions: Vec<TypeHash>,
    pub type_args: Vec<DataType>,
    pub has_type_arg_list: bool,
    /// Accessed through a type name: only shared members qualify.
    pub through_type: bool,
    /// The receiver is an implied `Me`; shared members drop it silently.
    pub implicit_receiver: bool,
}

/// An array literal awaiting its target type.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingArray<'ast> {
    pub literal: &'ast ArrayLiteralExpr<'ast>,
    /// Top-level elements; nested literals are themselves pending.
    pub elements: Vec<BoundExpr<'ast>>,
    /// Nesting depth at which every element is itself a literal.
    pub rank: u32,
}

/// A target-typed construct whose type comes from its context.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending<'ast> {
    Lambda(&'ast LambdaExpr<'ast>),
    /// `AddressOf` with its bound method group.
    AddressOf(Box<BoundExpr<'ast>>),
    Nothing,
    ArrayLiteral(Box<PendingArray<'ast>>),
}

/// What a bound node is.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundKind<'ast> {
    Constant(ConstantValue),
    Local {
        name: String,
        ordinal: u32,
        captured: bool,
    },
    SelfRef(InstanceKeyword),
    Field {
        receiver: Option<Box<BoundExpr<'ast>>>,
        field: TypeHash,
    },
    Property {
        receiver: Option<Box<BoundExpr<'ast>>>,
        property: TypeHash,
        args: Vec<BoundExpr<'ast>>,
    },
    Call(Box<BoundCall<'ast>>),
    LateCall(Box<LateCall<'ast>>),
    /// Value of late-call argument `index` after the call returned.
    LateArgument(usize),
    Conversion {
        operand: Box<BoundExpr<'ast>>,
        conversion: Conversion,
        /// The cast operator written, `None` for an implicit conversion.
        cast: Option<CastKind>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<BoundExpr<'ast>>,
        method: OperatorMethod,
    },
    Binary {
        op: BinaryOp,
        left: Box<BoundExpr<'ast>>,
        right: Box<BoundExpr<'ast>>,
        method: OperatorMethod,
    },
    Ternary {
        condition: Box<BoundExpr<'ast>>,
        when_true: Box<BoundExpr<'ast>>,
        when_false: Box<BoundExpr<'ast>>,
    },
    Coalesce {
        left: Box<BoundExpr<'ast>>,
        right: Box<BoundExpr<'ast>>,
    },
    TypeOfIs {
        operand: Box<BoundExpr<'ast>>,
        target: DataType,
        is_not: bool,
    },
    GetType(DataType),
    /// Array of the node's type; `elements` are in row-major order.
    ArrayCreation {
        bounds: Vec<BoundExpr<'ast>>,
        elements: Vec<BoundExpr<'ast>>,
    },
    ObjectCreation {
        constructor: Option<TypeHash>,
        args: Vec<BoundExpr<'ast>>,
        copy_backs: Vec<BoundExpr<'ast>>,
    },
    /// Default value of a value type (`New S()` without a constructor).
    ZeroInit,
    /// `Activator.CreateInstance(Type.GetTypeFromCLSID(clsid))`.
    ActivatorCreate {
        clsid: String,
    },
    /// `New T From {...}`: the creation stored in `temp`, then one `Add`
    /// call per element with [`BoundKind::Temporary`] as receiver.
    CollectionInitializer {
        creation: Box<BoundExpr<'ast>>,
        temp: u32,
        adds: Vec<BoundExpr<'ast>>,
    },
    /// `New T With {...}`: the creation stored in `temp`, then member
    /// assignments through it.
    ObjectInitializer {
        creation: Box<BoundExpr<'ast>>,
        temp: u32,
        members: Vec<BoundExpr<'ast>>,
    },
    Lambda(Box<BoundLambda<'ast>>),
    DelegateCreation {
        receiver: Option<Box<BoundExpr<'ast>>>,
        procedure: TypeHash,
        is_extension: bool,
    },
    ArrayIndex {
        array: Box<BoundExpr<'ast>>,
        indices: Vec<BoundExpr<'ast>>,
    },
    Assignment {
        target: Box<BoundExpr<'ast>>,
        value: Box<BoundExpr<'ast>>,
    },
    /// A storage location passed by reference.
    Address(Box<BoundExpr<'ast>>),
    /// A temporary initialized from `initial` and passed by reference.
    TempAddress {
        temp: u32,
        initial: Box<BoundExpr<'ast>>,
    },
    Temporary(u32),
    Await(Box<BoundAwait<'ast>>),
    /// A type name in qualifier position.
    TypeExpr(DataType),
    NamespaceRef(String),
    MemberGroup(Box<MemberGroup<'ast>>),
    /// A value of known type with no source, used while matching a method
    /// group against a delegate signature.
    Placeholder,
    Unbound(Pending<'ast>),
    Bad,
}

/// A bound expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr<'ast> {
    pub kind: BoundKind<'ast>,
    pub ty: DataType,
    pub span: Span,
    pub flags: BoundFlags,
}

impl<'ast> BoundExpr<'ast> {
    /// Build a node; `BAD` is inherited from any bad child.
    pub fn new(kind: BoundKind<'ast>, ty: DataType, span: Span) -> Self {
        let mut node = Self {
            kind,
            ty,
            span,
            flags: BoundFlags::empty(),
        };
        if node.children().iter().any(|c| c.is_bad()) {
            node.flags |= BoundFlags::BAD;
        }
        node
    }

    /// An error node.
    pub fn bad(span: Span) -> Self {
        Self {
            kind: BoundKind::Bad,
            ty: DataType::Error,
            span,
            flags: BoundFlags::BAD,
        }
    }

    pub fn constant(value: ConstantValue, ty: DataType, span: Span) -> Self {
        Self::new(BoundKind::Constant(value), ty, span)
    }

    pub fn pending(pending: Pending<'ast>, span: Span) -> Self {
        Self::new(BoundKind::Unbound(pending), DataType::Void, span)
    }

    pub fn placeholder(ty: DataType, span: Span) -> Self {
        Self::new(BoundKind::Placeholder, ty, span)
    }

    pub fn with_flags(mut self, flags: BoundFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_flags(mut self, flags: BoundFlags) -> Self {
        self.flags -= flags;
        self
    }

    /// Mark this node bad, keeping its shape.
    pub fn into_bad(mut self) -> Self {
        self.flags |= BoundFlags::BAD;
        self
    }

    pub fn is_bad(&self) -> bool {
        self.flags.contains(BoundFlags::BAD)
    }

    pub fn is_lvalue(&self) -> bool {
        self.flags.contains(BoundFlags::LVALUE) && !self.flags.contains(BoundFlags::PARENTHESIZED)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(BoundFlags::READ_ONLY)
    }

    pub fn constant_value(&self) -> Option<&ConstantValue> {
        match &self.kind {
            BoundKind::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, BoundKind::Constant(_))
    }

    /// Still waiting for a target type.
    pub fn is_unbound(&self) -> bool {
        matches!(self.kind, BoundKind::Unbound(_))
    }

    /// Whether the node denotes a value (as opposed to a type, namespace or
    /// method group).
    pub fn is_value(&self) -> bool {
        !matches!(
            self.kind,
            BoundKind::TypeExpr(_) | BoundKind::NamespaceRef(_) | BoundKind::MemberGroup(_) | BoundKind::Unbound(_)
        )
    }

    /// Property with a setter, field, local or array element, including
    /// late-bound members.
    pub fn is_assignable(&self) -> bool {
        if self.flags.contains(BoundFlags::PARENTHESIZED) || self.is_read_only() {
            return false;
        }
        self.flags.contains(BoundFlags::LVALUE)
            || matches!(self.kind, BoundKind::Property { .. })
            || (matches!(self.kind, BoundKind::LateCall(_)) && self.flags.contains(BoundFlags::LATE_BOUND))
    }

    /// Direct children of this node.
    pub fn children(&self) -> Vec<&BoundExpr<'ast>> {
        let mut out: Vec<&BoundExpr<'ast>> = Vec::new();
        match &self.kind {
            BoundKind::Field { receiver, .. } => out.extend(receiver.as_deref()),
            BoundKind::Property { receiver, args, .. } => {
                out.extend(receiver.as_deref());
                out.extend(args);
            }
            BoundKind::Call(call) => {
                out.extend(call.receiver.as_ref());
                out.extend(&call.args);
                out.extend(&call.copy_backs);
            }
            BoundKind::LateCall(call) => {
                out.extend(call.receiver.as_ref());
                out.extend(&call.args);
                out.extend(call.copy_backs.iter().map(|c| &c.assignment));
            }
            BoundKind::Conversion { operand, .. } | BoundKind::Unary { operand, .. } => out.push(operand),
            BoundKind::TypeOfIs { operand, .. } => out.push(operand),
            BoundKind::Binary { left, right, .. } | BoundKind::Coalesce { left, right } => {
                out.push(left);
                out.push(right);
            }
            BoundKind::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                out.push(condition);
                out.push(when_true);
                out.push(when_false);
            }
            BoundKind::ArrayCreation { bounds, elements } => {
                out.extend(bounds);
                out.extend(elements);
            }
            BoundKind::ObjectCreation { args, copy_backs, .. } => {
                out.extend(args);
                out.extend(copy_backs);
            }
            BoundKind::CollectionInitializer { creation, adds, .. } => {
                out.push(creation);
                out.extend(adds);
            }
            BoundKind::ObjectInitializer { creation, members, .. } => {
                out.push(creation);
                out.extend(members);
            }
            BoundKind::Lambda(lambda) => out.push(&lambda.body),
            BoundKind::DelegateCreation { receiver, .. } => out.extend(receiver.as_deref()),
            BoundKind::ArrayIndex { array, indices } => {
                out.push(array);
                out.extend(indices);
            }
            BoundKind::Assignment { target, value } => {
                out.push(target);
                out.push(value);
            }
            BoundKind::Address(inner) => out.push(inner),
            BoundKind::TempAddress { initial, .. } => out.push(initial),
            BoundKind::Await(await_expr) => out.push(&await_expr.operand),
            BoundKind::MemberGroup(group) => out.extend(group.receiver.as_ref()),
            BoundKind::Unbound(Pending::AddressOf(group)) => out.push(group),
            BoundKind::Unbound(Pending::ArrayLiteral(array)) => out.extend(&array.elements),
            BoundKind::Constant(_)
            | BoundKind::Local { .. }
            | BoundKind::SelfRef(_)
            | BoundKind::LateArgument(_)
            | BoundKind::GetType(_)
            | BoundKind::ZeroInit
            | BoundKind::ActivatorCreate { .. }
            | BoundKind::Temporary(_)
            | BoundKind::TypeExpr(_)
            | BoundKind::NamespaceRef(_)
            | BoundKind::Placeholder
            | BoundKind::Unbound(_)
            | BoundKind::Bad => {}
        }
        out
    }

    /// True if `predicate` holds for this node or any descendant.
    pub fn any(&self, predicate: impl Fn(&BoundExpr<'ast>) -> bool) -> bool {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if predicate(node) {
                return true;
            }
            stack.extend(node.children());
        }
        false
    }

    /// Number of nodes in the tree rooted here matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BoundExpr<'ast>) -> bool) -> usize {
        let mut stack = vec![self];
        let mut n = 0;
        while let Some(node) = stack.pop() {
            if predicate(node) {
                n += 1;
            }
            stack.extend(node.children());
        }
        n
    }
}
