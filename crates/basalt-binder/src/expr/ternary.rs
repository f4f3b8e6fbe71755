//! The `If` operator in its ternary and coalescing forms.

use basalt_core::{DataType, DiagnosticCode, Severity, Span};
use basalt_syntax::{CoalesceExpr, IfExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind, Pending};
use crate::context::InterpretationContext;
use crate::conversion::classify;
use crate::dominant::{DominantType, dominant_type};

use super::convert::convert_implicit;
use super::reclassify::{reclassify, reclassify_natural};
use super::{bind_deferred, bind_value};

fn is_pending_nothing(expr: &BoundExpr<'_>) -> bool {
    matches!(expr.kind, BoundKind::Unbound(Pending::Nothing))
}

/// Natural type for every pending branch except `Nothing`, which waits for
/// the result type.
fn settle<'ast>(b: &mut Binder<'_>, expr: BoundExpr<'ast>, ctx: &InterpretationContext) -> Result<BoundExpr<'ast>> {
    if expr.is_unbound() && !is_pending_nothing(&expr) {
        reclassify_natural(b, expr, ctx)
    } else {
        Ok(expr)
    }
}

/// Dominant type of the typed operands; `Object` (with a diagnostic) when
/// none dominates.
fn result_type(b: &mut Binder<'_>, operands: &[&BoundExpr<'_>], span: Span) -> Option<DataType> {
    let types: Vec<DataType> = operands
        .iter()
        .filter(|o| !is_pending_nothing(o))
        .map(|o| o.ty.clone())
        .collect();
    match dominant_type(b.table, &types) {
        DominantType::Unique(ty) => Some(ty),
        DominantType::Empty => Some(DataType::Object),
        DominantType::ObjectAssumed => {
            let severity = b.options.narrowing_severity();
            let message = if severity == Severity::Error {
                "Cannot infer a common type for the operands of the 'If' operator, and Option Strict On does not allow 'Object' to be assumed."
            } else {
                "Cannot infer a common type for the operands of the 'If' operator; 'Object' assumed."
            };
            b.report(DiagnosticCode::NoDominantType, severity, span, message);
            (severity != Severity::Error).then_some(DataType::Object)
        }
    }
}

/// `If(condition, a, b)`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_if<'ast>(
    b: &mut Binder<'_>,
    if_expr: &'ast IfExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = if_expr.span;
    let condition = bind_value(b, if_expr.condition, ctx)?;
    let condition_ty = if condition.ty == DataType::nullable(DataType::boolean()) {
        condition.ty.clone()
    } else {
        DataType::boolean()
    };
    let condition = convert_implicit(b, condition, &condition_ty, ctx)?;

    let when_true = bind_deferred(b, if_expr.when_true, ctx)?;
    let when_true = settle(b, when_true, ctx)?;
    let when_false = bind_deferred(b, if_expr.when_false, ctx)?;
    let when_false = settle(b, when_false, ctx)?;
    if condition.is_bad() || when_true.is_bad() || when_false.is_bad() {
        return Ok(BoundExpr::bad(span));
    }

    let Some(ty) = result_type(b, &[&when_true, &when_false], span) else {
        return Ok(BoundExpr::bad(span));
    };
    let when_true = convert_implicit(b, when_true, &ty, ctx)?;
    let when_false = convert_implicit(b, when_false, &ty, ctx)?;
    Ok(BoundExpr::new(
        BoundKind::Ternary {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        },
        ty,
        span,
    ))
}

/// `If(value, fallback)`: `value` unless it is `Nothing`.
///
/// A nullable first operand whose underlying type covers the fallback is
/// unwrapped: `If(n, 0)` with `n As Integer?` is an `Integer`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_coalesce<'ast>(
    b: &mut Binder<'_>,
    coalesce: &'ast CoalesceExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = coalesce.span;
    let left = bind_value(b, coalesce.left, ctx)?;
    let right = bind_deferred(b, coalesce.right, ctx)?;
    if left.is_bad() {
        return Ok(BoundExpr::bad(span));
    }

    let table = b.table;
    let left_ok = left.ty.is_nullable()
        || matches!(left.ty, DataType::GenericParam { .. })
        || table.is_reference_type(&left.ty);
    if !left_ok {
        b.error(
            DiagnosticCode::ReferenceOperandRequired,
            left.span,
            "First operand in a binary 'If' expression must be a nullable value type, a reference type, or an unconstrained generic type.",
        );
        let right = reclassify_natural(b, right, ctx)?;
        return Ok(coalesce_node(left, right, DataType::Error, span).into_bad());
    }

    let right = if is_pending_nothing(&right) {
        let target = left.ty.clone();
        reclassify(b, right, &target, ctx)?
    } else {
        reclassify_natural(b, right, ctx)?
    };
    if right.is_bad() {
        return Ok(coalesce_node(left, right, DataType::Error, span));
    }

    let unwrapped = left.ty.nullable_underlying().cloned().filter(|inner| {
        !right.ty.is_nullable() && {
            let conversion = classify(table, &right.ty, inner);
            conversion.is_identity() || conversion.is_widening()
        }
    });
    let (left, ty) = match unwrapped {
        Some(inner) => (left, inner),
        None => {
            let Some(ty) = result_type(b, &[&left, &right], span) else {
                return Ok(BoundExpr::bad(span));
            };
            (convert_implicit(b, left, &ty, ctx)?, ty)
        }
    };
    let right = convert_implicit(b, right, &ty, ctx)?;
    Ok(coalesce_node(left, right, ty, span))
}

fn coalesce_node<'ast>(left: BoundExpr<'ast>, right: BoundExpr<'ast>, ty: DataType, span: Span) -> BoundExpr<'ast> {
    BoundExpr::new(
        BoundKind::Coalesce {
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        span,
    )
}
