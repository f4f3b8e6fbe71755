//! Expression nodes.
//!
//! Nodes are allocated in a `bumpalo` arena owned by the caller and are
//! immutable once built. Every node carries its source span.
//!
//! A call-or-index `a(b)` is a single [`CallExpr`]; whether it means a call,
//! an array index, a default-property access or a delegate invocation is a
//! semantic decision made by the binder.

use basalt_core::Span;

use crate::ast::ops::{BinaryOp, UnaryOp};
use crate::ast::types::{Ident, TypeExpr};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr<'ast>),
    /// The `Nothing` literal.
    Nothing(Span),
    /// A simple name, optionally with type arguments: `x`, `Foo(Of T)`.
    Name(NameExpr<'ast>),
    /// `Me`, `MyBase` or `MyClass`.
    Instance(InstanceExpr),
    /// `a.b`, or `.b` inside a `With` block.
    Member(&'ast MemberExpr<'ast>),
    /// `a(args)`: call, index, default property or delegate invocation.
    Call(&'ast CallExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    Binary(&'ast BinaryExpr<'ast>),
    /// `CType`, `DirectCast`, `TryCast` and the intrinsic `CInt`-style operators.
    Cast(&'ast CastExpr<'ast>),
    /// `TypeOf x Is T` / `TypeOf x IsNot T`.
    TypeOf(&'ast TypeOfExpr<'ast>),
    /// `GetType(T)`.
    GetType(&'ast GetTypeExpr<'ast>),
    /// `New T(args) [With {...} | From {...}]`.
    New(&'ast NewExpr<'ast>),
    /// `New T(bounds) {elements}`.
    ArrayCreation(&'ast ArrayCreationExpr<'ast>),
    /// `{a, b, c}`.
    ArrayLiteral(&'ast ArrayLiteralExpr<'ast>),
    /// `Function(x) expr` / `Sub(x) expr`.
    Lambda(&'ast LambdaExpr<'ast>),
    /// `AddressOf target`.
    AddressOf(&'ast AddressOfExpr<'ast>),
    Paren(&'ast ParenExpr<'ast>),
    /// `If(condition, a, b)`.
    If(&'ast IfExpr<'ast>),
    /// `If(a, b)`.
    Coalesce(&'ast CoalesceExpr<'ast>),
    Await(&'ast AwaitExpr<'ast>),
    /// `From x In source ...`.
    Query(&'ast QueryExpr<'ast>),
    /// `<name>content</name>`.
    Xml(&'ast XmlElementExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Nothing(span) => *span,
            Expr::Name(e) => e.span,
            Expr::Instance(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Cast(e) => e.span,
            Expr::TypeOf(e) => e.span,
            Expr::GetType(e) => e.span,
            Expr::New(e) => e.span,
            Expr::ArrayCreation(e) => e.span,
            Expr::ArrayLiteral(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::AddressOf(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::If(e) => e.span,
            Expr::Coalesce(e) => e.span,
            Expr::Await(e) => e.span,
            Expr::Query(e) => e.span,
            Expr::Xml(e) => e.span,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr<'ast> {
        let mut current = self;
        while let Expr::Paren(p) = current {
            current = p.inner;
        }
        current
    }

    /// Constructs whose type comes from context rather than from themselves.
    pub fn is_target_typed(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expr::Lambda(_) | Expr::AddressOf(_) | Expr::Nothing(_) | Expr::ArrayLiteral(_)
        )
    }
}

/// A literal token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

/// Type character on an integral literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntegerSuffix {
    #[default]
    None,
    /// `S`
    Short,
    /// `US`
    UShort,
    /// `I` / `%`
    Integer,
    /// `UI`
    UInteger,
    /// `L` / `&`
    Long,
    /// `UL`
    ULong,
    /// `D` / `@` on an integral spelling
    Decimal,
    /// `F` / `!` on an integral spelling
    Single,
    /// `R` / `#` on an integral spelling
    Double,
}

/// Type character on a floating literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FloatSuffix {
    #[default]
    None,
    /// `F` / `!`
    Single,
    /// `R` / `#`
    Double,
}

/// The payload of a literal token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    /// An integral spelling; the lexer guarantees the magnitude fits 64 bits.
    Integer { value: u64, suffix: IntegerSuffix },
    Floating { value: f64, suffix: FloatSuffix },
    /// A decimal literal, kept as text so no precision is lost before folding.
    Decimal(&'ast str),
    Char(char),
    String(&'ast str),
    /// A date literal as a tick count.
    Date(i64),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameExpr<'ast> {
    pub ident: Ident<'ast>,
    /// `(Of ...)` arguments; empty when none were written.
    pub type_args: &'ast [TypeExpr<'ast>],
    /// Whether an `(Of ...)` list was written at all.
    pub has_type_arg_list: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKeyword {
    Me,
    MyBase,
    MyClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceExpr {
    pub keyword: InstanceKeyword,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    /// `None` for `.name` inside a `With` block.
    pub receiver: Option<&'ast Expr<'ast>>,
    pub name: Ident<'ast>,
    pub type_args: &'ast [TypeExpr<'ast>],
    pub has_type_arg_list: bool,
    pub span: Span,
}

/// One argument of a call-or-index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Argument<'ast> {
    /// `name := value`.
    pub name: Option<Ident<'ast>>,
    /// `None` for an omitted argument (`f(1, , 3)`).
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

impl<'ast> Argument<'ast> {
    pub fn is_omitted(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub args: &'ast [Argument<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

/// Which conversion operator was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// `CType(x, T)` and the intrinsic forms (`CInt(x)`, `CStr(x)`, ...).
    CType,
    /// `DirectCast(x, T)`: identity, reference or unboxing only.
    DirectCast,
    /// `TryCast(x, T)`: reference conversion yielding `Nothing` on failure.
    TryCast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub kind: CastKind,
    pub operand: &'ast Expr<'ast>,
    pub target: TypeExpr<'ast>,
    /// Written as an intrinsic (`CInt(x)`) rather than `CType(x, Integer)`.
    pub intrinsic: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeOfExpr<'ast> {
    pub operand: &'ast Expr<'ast>,
    pub target: TypeExpr<'ast>,
    pub is_not: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GetTypeExpr<'ast> {
    pub target: TypeExpr<'ast>,
    pub span: Span,
}

/// `.Name = value` inside `With { ... }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldInitializer<'ast> {
    pub name: Ident<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectInitializer<'ast> {
    With(&'ast [FieldInitializer<'ast>]),
    From(&'ast ArrayLiteralExpr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [Argument<'ast>],
    pub initializer: Option<ObjectInitializer<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayCreationExpr<'ast> {
    pub element: TypeExpr<'ast>,
    /// Upper bounds; empty when only the rank was written (`New Integer(,) {...}`).
    pub bounds: &'ast [Expr<'ast>],
    pub rank: u32,
    pub initializer: &'ast ArrayLiteralExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayLiteralExpr<'ast> {
    pub elements: &'ast [Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaParam<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaExpr<'ast> {
    pub params: &'ast [LambdaParam<'ast>],
    pub body: &'ast Expr<'ast>,
    /// `Function` lambdas produce a value; `Sub` lambdas do not.
    pub is_function: bool,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressOfExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParenExpr<'ast> {
    pub inner: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfExpr<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub when_true: &'ast Expr<'ast>,
    pub when_false: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoalesceExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AwaitExpr<'ast> {
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// A clause following `From x In source`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryClause<'ast> {
    Where(&'ast Expr<'ast>),
    OrderBy { key: &'ast Expr<'ast>, descending: bool },
    Select(&'ast Expr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryExpr<'ast> {
    pub variable: Ident<'ast>,
    pub source: &'ast Expr<'ast>,
    pub clauses: &'ast [QueryClause<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XmlContent<'ast> {
    Text(&'ast str),
    /// `<%= expr %>`
    Embedded(&'ast Expr<'ast>),
    Element(&'ast XmlElementExpr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XmlElementExpr<'ast> {
    pub prefix: Option<Ident<'ast>>,
    pub name: Ident<'ast>,
    pub content: &'ast [XmlContent<'ast>],
    pub span: Span,
}
