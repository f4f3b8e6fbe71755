//! Type references as written in source.

use basalt_core::{PrimitiveKind, Span};

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }

    /// Case-insensitive comparison, matching the language's name rules.
    pub fn is(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

/// A type reference: `Integer`, `Object`, `Ns.List(Of T)`, `T()`, `T?`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeExpr<'ast> {
    Primitive { kind: PrimitiveKind, span: Span },
    Object(Span),
    /// A possibly qualified, possibly generic named type.
    Named {
        path: &'ast [Ident<'ast>],
        args: &'ast [TypeExpr<'ast>],
        span: Span,
    },
    Array {
        element: &'ast TypeExpr<'ast>,
        rank: u32,
        span: Span,
    },
    Nullable {
        inner: &'ast TypeExpr<'ast>,
        span: Span,
    },
}

impl<'ast> TypeExpr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Primitive { span, .. } => *span,
            TypeExpr::Object(span) => *span,
            TypeExpr::Named { span, .. } => *span,
            TypeExpr::Array { span, .. } => *span,
            TypeExpr::Nullable { span, .. } => *span,
        }
    }

    /// Dotted spelling of the type, without type arguments.
    pub fn display_name(&self) -> String {
        match self {
            TypeExpr::Primitive { kind, .. } => kind.name().to_string(),
            TypeExpr::Object(_) => "Object".to_string(),
            TypeExpr::Named { path, .. } => path.iter().map(|i| i.name).collect::<Vec<_>>().join("."),
            TypeExpr::Array { element, rank, .. } => {
                format!("{}({})", element.display_name(), ",".repeat(rank.saturating_sub(1) as usize))
            }
            TypeExpr::Nullable { inner, .. } => format!("{}?", inner.display_name()),
        }
    }
}
