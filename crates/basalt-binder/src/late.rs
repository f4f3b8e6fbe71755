//! Late-bound member access and invocation.
//!
//! A member of an `Object` (or of a dispatch interface the table knows
//! nothing about) is looked up by name at run time. The bound form is a
//! [`LateCall`]: every argument is boxed to `Object`, and an argument that
//! names a storage location is passed by reference and written back from
//! [`BoundKind::LateArgument`] once the call returns.

use basalt_core::{DataType, Span};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, LateCall, LateCopyBack};
use crate::context::InterpretationContext;
use crate::expr::assignment::assign;
use crate::expr::calls::missing_value;
use crate::expr::convert::{convert_implicit, convert_unchecked};
use crate::expr::reclassify::box_natural;
use crate::overload::BoundArgument;

/// `receiver.name` with no argument list yet.
pub(crate) fn late_member<'ast>(receiver: BoundExpr<'ast>, name: &str, span: Span) -> BoundExpr<'ast> {
    let call = LateCall {
        receiver: Some(receiver),
        member: Some(name.to_string()),
        args: Vec::new(),
        arg_names: Vec::new(),
        by_ref: Vec::new(),
        copy_backs: Vec::new(),
    };
    BoundExpr::new(BoundKind::LateCall(Box::new(call)), DataType::Object, span).with_flags(BoundFlags::LATE_BOUND)
}

/// Invoke `member` of `receiver` (or index `receiver` when `member` is
/// `None`) with `args`, all decided at run time.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn late_invoke<'ast>(
    b: &mut Binder<'_>,
    receiver: Option<BoundExpr<'ast>>,
    member: Option<String>,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let mut bound = Vec::with_capacity(args.len());
    let mut arg_names = Vec::with_capacity(args.len());
    let mut by_ref = Vec::with_capacity(args.len());
    let mut copy_backs = Vec::new();

    for (index, arg) in args.into_iter().enumerate() {
        arg_names.push(arg.name.map(str::to_string));
        let Some(value) = arg.value else {
            by_ref.push(false);
            let missing = missing_value(b, arg.span);
            bound.push(convert_unchecked(table, missing, &DataType::Object));
            continue;
        };

        let writable = value.is_assignable() && !value.is_bad();
        by_ref.push(writable);
        if writable {
            let back = BoundExpr::new(BoundKind::LateArgument(index), DataType::Object, value.span);
            let back = convert_unchecked(table, back, &value.ty);
            let assignment = assign(b, value.clone(), back, value.span);
            copy_backs.push(LateCopyBack { index, assignment });
        }

        let boxed = if value.is_unbound() {
            box_natural(b, value, ctx)?
        } else {
            convert_implicit(b, value, &DataType::Object, ctx)?
        };
        bound.push(boxed);
    }

    tracing::debug!(member = member.as_deref().unwrap_or("<default>"), args = bound.len(), "late-bound call");
    let call = LateCall {
        receiver,
        member,
        args: bound,
        arg_names,
        by_ref,
        copy_backs,
    };
    Ok(BoundExpr::new(BoundKind::LateCall(Box::new(call)), DataType::Object, span).with_flags(BoundFlags::LATE_BOUND))
}
