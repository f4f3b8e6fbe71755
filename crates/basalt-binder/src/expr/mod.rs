//! Expression binding.
//!
//! [`bind_expr`] dispatches on the syntax node, binds it through the
//! submodule that owns that construct, then applies the caller's
//! [`ExpressionFlags`] in one place ([`finish`]):
//!
//! - a type or namespace where a value is required is reported
//! - a method group is invoked with no arguments unless the caller asked
//!   for the group itself
//! - a target-typed construct (`Nothing`, a lambda, `AddressOf`, an array
//!   literal) is given its natural type unless the caller defers it
//! - a `Sub` call or a non-constant is reported where a value or a
//!   constant is required
//!
//! # Example
//!
//! ```ignore
//! let bound = bind_expr(b, expr, ExpressionFlags::VALUE, ctx)?;
//! assert!(bound.is_value());
//! ```

pub(crate) mod assignment;
mod await_expr;
pub(crate) mod binary;
pub(crate) mod calls;
mod cast;
pub(crate) mod construction;
pub(crate) mod convert;
mod identifiers;
pub(crate) mod init_list;
pub(crate) mod lambda;
mod literals;
pub(crate) mod member;
mod query;
pub(crate) mod reclassify;
mod ternary;
mod unary;
mod xml;

use basalt_core::{DataType, DiagnosticCode};
use basalt_syntax::Expr;

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, Pending};
use crate::context::InterpretationContext;
use crate::flags::ExpressionFlags;

/// Bind `expr` and apply `flags` to the result.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_expr<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    flags: ExpressionFlags,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let bound = match expr {
        Expr::Literal(lit) => literals::bind_literal(b, lit),
        Expr::Nothing(span) => BoundExpr::pending(Pending::Nothing, *span),
        Expr::Name(name) => identifiers::bind_name(b, name, flags, ctx)?,
        Expr::Instance(instance) => identifiers::bind_instance(b, instance, ctx),
        Expr::Member(access) => member::bind_member_access(b, access, ctx)?,
        Expr::Call(call) => calls::bind_call(b, call, ctx)?,
        Expr::Unary(un) => unary::bind_unary(b, un, ctx)?,
        Expr::Binary(bin) => binary::bind_binary(b, bin, ctx)?,
        Expr::Cast(cast) => cast::bind_cast(b, cast, ctx)?,
        Expr::TypeOf(type_of) => cast::bind_type_of(b, type_of, ctx)?,
        Expr::GetType(get_type) => cast::bind_get_type(b, get_type, ctx),
        Expr::New(new) => construction::bind_new(b, new, ctx)?,
        Expr::ArrayCreation(creation) => construction::bind_array_creation(b, creation, ctx)?,
        Expr::ArrayLiteral(literal) => init_list::bind_array_literal(b, literal, ctx)?,
        Expr::Lambda(lambda) => BoundExpr::pending(Pending::Lambda(*lambda), lambda.span),
        Expr::AddressOf(address_of) => lambda::bind_address_of(b, address_of, ctx)?,
        Expr::Paren(paren) => {
            let inner_flags = flags
                - ExpressionFlags::QUALIFIER
                - ExpressionFlags::ALLOW_METHOD_GROUP
                - ExpressionFlags::ASSIGNMENT_TARGET;
            let inner = bind_expr(b, paren.inner, inner_flags, ctx)?;
            let mut inner = inner.with_flags(BoundFlags::PARENTHESIZED);
            inner.span = paren.span;
            inner
        }
        Expr::If(if_expr) => ternary::bind_if(b, if_expr, ctx)?,
        Expr::Coalesce(coalesce) => ternary::bind_coalesce(b, coalesce, ctx)?,
        Expr::Await(await_expr) => await_expr::bind_await(b, await_expr, ctx)?,
        Expr::Query(query) => query::bind_query(b, query, ctx)?,
        Expr::Xml(element) => xml::bind_xml(b, element, ctx)?,
    };
    finish(b, bound, flags, ctx)
}

/// Bind `expr` as a value of its natural type.
pub(crate) fn bind_value<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    bind_expr(b, expr, ExpressionFlags::VALUE, ctx)
}

/// Bind `expr` as a value, leaving target-typed constructs unbound.
pub(crate) fn bind_deferred<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    bind_expr(b, expr, ExpressionFlags::VALUE | ExpressionFlags::DEFER_TARGET_TYPED, ctx)
}

/// Bind `expr` and implicitly convert it to `target`.
pub(crate) fn bind_converted<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let bound = bind_deferred(b, expr, ctx)?;
    convert::convert_implicit(b, bound, target, ctx)
}

/// Apply the caller's requirements to a freshly bound node.
fn finish<'ast>(
    b: &mut Binder<'_>,
    bound: BoundExpr<'ast>,
    flags: ExpressionFlags,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if bound.is_bad() {
        return Ok(bound);
    }
    let span = bound.span;
    let bound = match bound.kind {
        BoundKind::TypeExpr(ty) if !flags.contains(ExpressionFlags::ALLOW_TYPE) => {
            let shown = b.display(&ty);
            b.error(
                DiagnosticCode::TypeUsedAsValue,
                span,
                format!("'{shown}' is a type and cannot be used as an expression."),
            );
            return Ok(BoundExpr::bad(span));
        }
        BoundKind::NamespaceRef(namespace) if !flags.contains(ExpressionFlags::ALLOW_NAMESPACE) => {
            b.error(
                DiagnosticCode::NamespaceUsedAsValue,
                span,
                format!("'{namespace}' is a namespace and cannot be used as an expression."),
            );
            return Ok(BoundExpr::bad(span));
        }
        BoundKind::MemberGroup(group) if !flags.contains(ExpressionFlags::ALLOW_METHOD_GROUP) => {
            let parenthesized = bound.flags & BoundFlags::PARENTHESIZED;
            calls::invoke_group(b, *group, Vec::new(), false, span, ctx)?.with_flags(parenthesized)
        }
        kind @ BoundKind::Unbound(_) if !flags.contains(ExpressionFlags::DEFER_TARGET_TYPED) => {
            reclassify::reclassify_natural(b, BoundExpr { kind, ..bound }, ctx)?
        }
        kind => BoundExpr { kind, ..bound },
    };

    if bound.is_bad() {
        return Ok(bound);
    }
    if bound.is_value()
        && bound.ty.is_void()
        && flags.contains(ExpressionFlags::VALUE_REQUIRED)
        && !flags.contains(ExpressionFlags::ALLOW_VOID)
    {
        b.error(DiagnosticCode::ExpressionHasNoValue, span, "Expression does not produce a value.");
        return Ok(bound.into_bad());
    }
    if flags.contains(ExpressionFlags::CONSTANT_REQUIRED) && bound.is_value() && !bound.is_constant() {
        b.error(DiagnosticCode::RequiresConstant, span, "Constant expression is required.");
        return Ok(bound.into_bad());
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind};
    use basalt_symbols::{ProcedureEntry, TypeEntry};
    use basalt_syntax::AstBuilder;
    use bumpalo::Bump;

    use super::*;
    use crate::testing::{Fixture, codes};

    #[test]
    fn type_name_is_not_a_value() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("Gadget"));
        let mut f = Fixture::new();
        f.table.register_type(TypeEntry::class("Gadget")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::TypeUsedAsValue]);
    }

    #[test]
    fn namespace_is_not_a_value() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("System"));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NamespaceUsedAsValue]);
    }

    #[test]
    fn sub_call_has_no_value() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Widget");
        f.table.register_procedure(ProcedureEntry::sub(class, "Reset", vec![])).unwrap();
        let expr = ast.alloc(ast.call(ast.name("Reset"), &[]));

        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ExpressionHasNoValue]);

        let (bound, sink) = f.bind_with(expr, ExpressionFlags::STATEMENT);
        assert!(!bound.is_bad());
        assert!(sink.is_empty());
    }

    #[test]
    fn constant_required_rejects_locals() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let expr = ast.alloc(ast.binary(ast.name("n"), basalt_syntax::BinaryOp::Add, ast.int(1)));
        let (bound, sink) = f.bind_with(expr, ExpressionFlags::VALUE | ExpressionFlags::CONSTANT_REQUIRED);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::RequiresConstant]);
    }

    #[test]
    fn parentheses_make_an_rvalue() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let plain = ast.alloc(ast.name("n"));
        let wrapped = ast.alloc(ast.paren(ast.name("n")));
        assert!(f.bind(plain).0.is_lvalue());
        let (bound, _) = f.bind(wrapped);
        assert!(!bound.is_lvalue());
        assert!(!bound.is_assignable());
    }

    #[test]
    fn deferred_nothing_stays_unbound() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.nothing());
        let mut f = Fixture::new();
        let (deferred, _) = f.bind_with(expr, ExpressionFlags::VALUE | ExpressionFlags::DEFER_TARGET_TYPED);
        assert!(deferred.is_unbound());
        let (natural, _) = f.bind(expr);
        assert_eq!(natural.ty, DataType::Object);
        assert_eq!(natural.constant_value(), Some(&ConstantValue::Nothing));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.binary(
            ast.intrinsic_cast(PrimitiveKind::Long, ast.name("x")),
            basalt_syntax::BinaryOp::Multiply,
            ast.int(3),
        ));
        let mut f = Fixture::new();
        f.local("x", DataType::integer());
        let (first, first_sink) = f.bind(expr);
        let (second, second_sink) = f.bind(expr);
        assert_eq!(first, second);
        assert_eq!(first_sink.diagnostics(), second_sink.diagnostics());
    }
}
