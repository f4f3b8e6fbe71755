//! Assignment targets and local initializers.

use basalt_core::{BindError, DataType, DiagnosticCode, Span};
use basalt_syntax::Expr;

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind};
use crate::context::InterpretationContext;
use crate::flags::ExpressionFlags;

use super::convert::convert_implicit;
use super::reclassify::reclassify_natural;
use super::{bind_converted, bind_deferred, bind_expr};

/// Bind `target = value`.
///
/// A property target binds to its setter; a late-bound target receives the
/// value boxed to `Object`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn bind_assignment<'ast>(
    b: &mut Binder<'_>,
    target: &'ast Expr<'ast>,
    value: &'ast Expr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = target.span().merge(value.span());
    let target = bind_expr(b, target, ExpressionFlags::VALUE | ExpressionFlags::ASSIGNMENT_TARGET, ctx)?;
    if target.is_bad() {
        let value = bind_deferred(b, value, ctx)?;
        return Ok(BoundExpr::new(
            BoundKind::Assignment {
                target: Box::new(target),
                value: Box::new(value),
            },
            DataType::Void,
            span,
        ));
    }
    let target_ty = target.ty.clone();
    let value = bind_converted(b, value, &target_ty, ctx)?;
    Ok(assign(b, target, value, span))
}

/// Build an assignment of an already converted `value` to `target`,
/// reporting targets that cannot be written.
pub(crate) fn assign<'ast>(b: &mut Binder<'_>, target: BoundExpr<'ast>, value: BoundExpr<'ast>, span: Span) -> BoundExpr<'ast> {
    let writable = target.is_bad() || target.is_assignable();
    if !writable {
        if target.is_read_only() {
            let name = target_name(b, &target);
            b.error(DiagnosticCode::ReadOnlyTarget, target.span, format!("'{name}' is 'ReadOnly'."));
        } else {
            b.error(
                DiagnosticCode::NotAssignable,
                target.span,
                "Expression is a value and therefore cannot be the target of an assignment.",
            );
        }
    }
    let node = BoundExpr::new(
        BoundKind::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        },
        DataType::Void,
        span,
    );
    if writable { node } else { node.into_bad() }
}

fn target_name(b: &Binder<'_>, target: &BoundExpr<'_>) -> String {
    let table = b.table;
    match &target.kind {
        BoundKind::Local { name, .. } => name.clone(),
        BoundKind::Field { field, .. } => table.get_field(*field).map(|f| f.name.clone()).unwrap_or_default(),
        BoundKind::Property { property, .. } => {
            table.get_property(*property).map(|p| p.name.clone()).unwrap_or_default()
        }
        _ => b.display(&target.ty),
    }
}

/// Bind the initializer of local `name`, which the caller has already
/// declared.
///
/// A local declared without a type takes the type of its initializer
/// (`Object` when inference is off); referring to it from inside that
/// initializer is reported as circular.
pub fn bind_local_initializer<'ast>(
    b: &mut Binder<'_>,
    name: &str,
    value: &'ast Expr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let Some(local) = b.scope.get(name).cloned() else {
        return Err(BindError::internal(format!("local '{name}' is not declared"), value.span()));
    };

    b.scope.begin_initializer(name);
    let bound = match &local.ty {
        Some(ty) => bind_converted(b, value, ty, ctx),
        None if !b.options.option_infer => bind_converted(b, value, &DataType::Object, ctx),
        None => bind_deferred(b, value, ctx).and_then(|v| reclassify_natural(b, v, ctx)),
    };
    b.scope.end_initializer();
    let bound = bound?;

    if local.ty.is_none() {
        let inferred = if bound.is_bad() || !b.options.option_infer {
            DataType::Object
        } else {
            bound.ty.clone()
        };
        tracing::trace!(local = name, inferred = %b.display(&inferred), "local type inferred");
        b.scope.set_inferred_type(name, inferred.clone());
        if bound.ty != inferred && !bound.is_bad() {
            return convert_implicit(b, bound, &inferred, ctx);
        }
    }
    Ok(bound)
}
