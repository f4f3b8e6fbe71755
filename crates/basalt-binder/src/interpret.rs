//! Entry points used by the statement, declaration and attribute binders.
//!
//! Each entry point binds one top-level expression behind a recovery
//! boundary: a [`BindError`] or a panic from inside the binder becomes an
//! `InternalError` diagnostic and a bad result, and the binder's scope and
//! diagnostic nesting are put back as they were before the call.

use std::panic::{AssertUnwindSafe, catch_unwind};

use basalt_core::{BindError, ConstantValue, DataType, Diagnostic, DiagnosticCode, Severity, Span};
use basalt_syntax::{AttributeExpr, CastKind, Expr};

use crate::attribute::{BoundAttribute, bind_attribute};
use crate::binder::{Binder, Result};
use crate::bound::BoundExpr;
use crate::context::InterpretationContext;
use crate::expr::bind_expr;
use crate::expr::convert::{convert_explicit, convert_implicit};
use crate::flags::ExpressionFlags;

/// Bind `expr` under `flags`, converting to `target` when one is given.
///
/// The conversion is implicit unless `flags` contains
/// [`ExpressionFlags::EXPLICIT`], in which case it is checked as `CType`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn interpret_expression<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    flags: ExpressionFlags,
    target: Option<&DataType>,
    ctx: &InterpretationContext,
) -> BoundExpr<'ast> {
    let span = expr.span();
    guarded(b, span, BoundExpr::bad, |b| bind_targeted(b, expr, flags, target, ctx))
}

/// Evaluate `expr` as a standalone constant: an enum member value, an
/// optional parameter default or a conditional compilation constant.
///
/// The expression is bound without `Me` and without implicit declarations.
/// Returns `None` after reporting why the expression is not constant.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn interpret_constant_expression<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    target: Option<&DataType>,
    ctx: &InterpretationContext,
) -> Option<ConstantValue> {
    let span = expr.span();
    let ctx = ctx.standalone();
    let flags = ExpressionFlags::VALUE | ExpressionFlags::CONSTANT_REQUIRED;
    let bound = guarded(b, span, BoundExpr::bad, |b| {
        let bound = bind_targeted(b, expr, flags, target, &ctx)?;
        if !bound.is_bad() && !bound.is_constant() {
            b.error(DiagnosticCode::RequiresConstant, bound.span, "Constant expression is required.");
            return Ok(bound.into_bad());
        }
        Ok(bound)
    });
    if bound.is_bad() {
        return None;
    }
    bound.constant_value().cloned()
}

/// Bind a custom attribute application.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn interpret_attribute<'ast>(
    b: &mut Binder<'_>,
    attribute: &'ast AttributeExpr<'ast>,
    ctx: &InterpretationContext,
) -> BoundAttribute<'ast> {
    guarded(b, attribute.span, BoundAttribute::bad, |b| bind_attribute(b, attribute, ctx))
}

fn bind_targeted<'ast>(
    b: &mut Binder<'_>,
    expr: &'ast Expr<'ast>,
    flags: ExpressionFlags,
    target: Option<&DataType>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let Some(target) = target else {
        return bind_expr(b, expr, flags, ctx);
    };
    let bound = bind_expr(b, expr, flags | ExpressionFlags::DEFER_TARGET_TYPED, ctx)?;
    if flags.contains(ExpressionFlags::EXPLICIT) {
        let span = bound.span;
        convert_explicit(b, bound, target, CastKind::CType, span, ctx)
    } else {
        convert_implicit(b, bound, target, ctx)
    }
}

/// Run `f`, turning an internal error or a panic into a diagnostic and the
/// result of `bad`.
pub(crate) fn guarded<'b, T>(
    b: &mut Binder<'b>,
    span: Span,
    bad: impl FnOnce(Span) -> T,
    f: impl FnOnce(&mut Binder<'b>) -> Result<T>,
) -> T {
    let checkpoint = b.checkpoint();
    let scope = b.scope.clone();

    let error = match catch_unwind(AssertUnwindSafe(|| f(b))) {
        Ok(Ok(value)) => return value,
        Ok(Err(error)) => error,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "binder panicked".to_string());
            BindError::internal(message, span)
        }
    };

    b.restore(checkpoint);
    *b.scope = scope;
    b.cache.clear();
    tracing::error!(%error, "expression binding abandoned");
    b.diagnostics.report(Diagnostic::new(
        DiagnosticCode::InternalError,
        Severity::Error,
        error.span(),
        format!("Internal compiler error: {error}"),
    ));
    bad(span)
}
