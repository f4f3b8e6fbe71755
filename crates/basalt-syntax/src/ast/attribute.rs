//! Custom attribute applications.

use basalt_core::Span;

use crate::ast::expr::{Argument, FieldInitializer};
use crate::ast::types::TypeExpr;

/// `<Name(args, Field:=value)>` applied to a declaration.
///
/// Positional arguments go to the attribute constructor; named arguments
/// assign public fields or properties of the attribute class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [Argument<'ast>],
    pub named_args: &'ast [FieldInitializer<'ast>],
    pub span: Span,
}
