//! Giving target-typed constructs a type.
//!
//! `Nothing`, lambdas, `AddressOf` and array literals are bound as
//! [`Pending`] nodes with no type of their own. Once the target type is
//! known, [`reclassify`] turns them into ordinary nodes of that type; when
//! no target exists, [`reclassify_natural`] picks the type the construct
//! would have on its own.

use basalt_core::{ConstantValue, DataType, DiagnosticCode, Severity, Span};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, Pending};
use crate::constant::default_value;
use crate::context::InterpretationContext;

use super::convert::convert_implicit;
use super::{init_list, lambda};

/// Bind a pending construct against `target`. Other nodes are returned
/// unchanged.
pub(crate) fn reclassify<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let BoundExpr { kind, span, flags, .. } = expr;
    let BoundKind::Unbound(pending) = kind else {
        return Ok(BoundExpr { kind, ty: expr.ty, span, flags });
    };
    if target.is_error() {
        return Ok(BoundExpr::bad(span));
    }
    tracing::trace!(target = %b.display(target), "reclassifying target-typed expression");

    let bound = match pending {
        Pending::Nothing => nothing_of(b, target, span),
        Pending::Lambda(syntax) => lambda::bind_lambda_to(b, syntax, target, ctx)?,
        Pending::AddressOf(group) => lambda::bind_delegate_creation(b, *group, target, span, ctx)?,
        Pending::ArrayLiteral(array) => init_list::convert_array_literal(b, *array, target, ctx)?,
    };
    Ok(bound.with_flags(flags & BoundFlags::PARENTHESIZED))
}

/// Bind a pending construct with no target type.
pub(crate) fn reclassify_natural<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let BoundExpr { kind, span, flags, .. } = expr;
    let BoundKind::Unbound(pending) = kind else {
        return Ok(BoundExpr { kind, ty: expr.ty, span, flags });
    };

    let bound = match pending {
        Pending::Nothing => BoundExpr::constant(ConstantValue::Nothing, DataType::Object, span),
        Pending::Lambda(syntax) => {
            let untyped = syntax.params.iter().filter(|p| p.ty.is_none()).count();
            if untyped > 0 {
                let severity = b.options.narrowing_severity();
                let message = if severity == Severity::Error {
                    "Option Strict On requires each lambda expression parameter to be declared with an 'As' clause if its type cannot be inferred."
                } else {
                    "Lambda parameter types could not be inferred; 'Object' assumed."
                };
                b.report(DiagnosticCode::InferredObject, severity, span, message);
                if severity == Severity::Error {
                    return Ok(BoundExpr::bad(span));
                }
            }
            match lambda::natural_lambda_type(b, syntax, ctx) {
                Some(ty) => lambda::bind_lambda_to(b, syntax, &ty, ctx)?,
                None => {
                    b.report_missing_runtime("A lambda expression with this many parameters", span);
                    BoundExpr::bad(span)
                }
            }
        }
        Pending::AddressOf(_) => {
            b.error(
                DiagnosticCode::NotDelegateType,
                span,
                "'AddressOf' expression cannot be converted to 'Object' because 'Object' is not a delegate type.",
            );
            BoundExpr::bad(span)
        }
        Pending::ArrayLiteral(array) => init_list::infer_array_literal(b, *array, ctx)?,
    };
    Ok(bound.with_flags(flags & BoundFlags::PARENTHESIZED))
}

/// `Nothing` as a value of `target`: the default value of a value type, a
/// null reference otherwise.
pub(crate) fn nothing_of<'ast>(b: &Binder<'_>, target: &DataType, span: Span) -> BoundExpr<'ast> {
    let table = b.table;
    let target = table.normalize(target.clone());
    if let Some(kind) = target.as_primitive().or_else(|| table.enum_underlying(&target)) {
        return BoundExpr::constant(default_value(kind), target, span);
    }
    if table.is_value_type(&target) && !target.is_nullable() {
        return BoundExpr::new(BoundKind::ZeroInit, target, span);
    }
    BoundExpr::constant(ConstantValue::Nothing, target, span)
}

/// Convert an already natural-typed lambda or array to `Object`.
pub(crate) fn box_natural<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let natural = reclassify_natural(b, expr, ctx)?;
    convert_implicit(b, natural, &DataType::Object, ctx)
}
