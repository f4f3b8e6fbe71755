//! Casts, `TypeOf ... Is` and `GetType`.

use basalt_core::{DataType, DiagnosticCode};
use basalt_symbols::WellKnownType;
use basalt_syntax::{CastExpr, GetTypeExpr, TypeOfExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind};
use crate::context::InterpretationContext;
use crate::conversion::classify_direct_cast;
use crate::type_resolver::resolve_type;

use super::convert::convert_explicit;
use super::{bind_deferred, bind_value};

/// `CType`, `DirectCast`, `TryCast` and the intrinsic conversion operators.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_cast<'ast>(
    b: &mut Binder<'_>,
    cast: &'ast CastExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let operand = bind_deferred(b, cast.operand, ctx)?;
    let target = resolve_type(b, &cast.target, ctx);
    if target.is_error() {
        return Ok(BoundExpr::bad(cast.span));
    }
    convert_explicit(b, operand, &target, cast.kind, cast.span, ctx)
}

pub(crate) fn bind_type_of<'ast>(
    b: &mut Binder<'_>,
    type_of: &'ast TypeOfExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = type_of.span;
    let operand = bind_value(b, type_of.operand, ctx)?;
    let target = resolve_type(b, &type_of.target, ctx);
    if operand.is_bad() || target.is_error() {
        return Ok(BoundExpr::bad(span));
    }

    let table = b.table;
    let open = matches!(operand.ty, DataType::GenericParam { .. });
    let mut ok = true;
    if !open && table.is_value_type(&operand.ty) {
        let shown = b.display(&operand.ty);
        b.error(
            DiagnosticCode::ReferenceOperandRequired,
            operand.span,
            format!("'TypeOf ... Is' requires its left operand to have a reference type, but this operand has the value type '{shown}'."),
        );
        ok = false;
    } else if !open && classify_direct_cast(table, &operand.ty, &target).is_error() {
        let (s, t) = (b.display(&operand.ty), b.display(&target));
        b.error(
            DiagnosticCode::TypeOfNeverSucceeds,
            span,
            format!("Expression of type '{s}' can never be of type '{t}'."),
        );
        ok = false;
    }

    let node = BoundExpr::new(
        BoundKind::TypeOfIs {
            operand: Box::new(operand),
            target,
            is_not: type_of.is_not,
        },
        DataType::boolean(),
        span,
    );
    Ok(if ok { node } else { node.into_bad() })
}

/// `GetType(T)`: a `System.Type` value.
pub(crate) fn bind_get_type<'ast>(
    b: &mut Binder<'_>,
    get_type: &'ast GetTypeExpr<'ast>,
    ctx: &InterpretationContext,
) -> BoundExpr<'ast> {
    let span = get_type.span;
    let target = resolve_type(b, &get_type.target, ctx);
    if target.is_error() {
        return BoundExpr::bad(span);
    }
    let Some(type_type) = b.table.well_known_type(WellKnownType::Type) else {
        b.report_missing_runtime("'GetType'", span);
        return BoundExpr::bad(span);
    };
    BoundExpr::new(BoundKind::GetType(target), type_type, span)
}
