//! `Await` and the awaiter pattern.
//!
//! The operand must offer a parameterless `GetAwaiter` (instance or
//! extension). Its result must have an instance `IsCompleted As Boolean`
//! property, an instance parameterless `GetResult` method and, unless the
//! awaiter is `Object`, implement the completion-notification interface.
//! Failing to find a usable `GetAwaiter` is reported as "not awaitable";
//! every later mismatch has its own diagnostic.

use basalt_core::{DataType, DiagnosticCode, RuntimeFeatures, Span, TypeHash};
use basalt_symbols::{MemberRef, WellKnownType};
use basalt_syntax::AwaitExpr;

use crate::binder::{Binder, Result};
use crate::bound::{BoundAwait, BoundExpr, BoundKind};
use crate::context::InterpretationContext;

use super::bind_value;
use super::calls::invoke_group;
use super::member::bind_member_of;

/// The `GetAwaiter` call an await lowers through.
struct AwaiterCall {
    procedure: TypeHash,
    is_extension: bool,
    awaiter: DataType,
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_await<'ast>(
    b: &mut Binder<'_>,
    await_expr: &'ast AwaitExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = await_expr.span;
    let operand = bind_value(b, await_expr.operand, ctx)?;

    if !ctx.is_async {
        let message = if ctx.in_lambda() {
            "'Await' can only be used within an Async lambda expression. Consider marking this lambda expression with the 'Async' modifier."
        } else {
            "'Await' can only be used within an Async method. Consider marking this method with the 'Async' modifier and changing its return type to 'Task'."
        };
        b.error(DiagnosticCode::AwaitOutsideAsync, span, message);
        return Ok(BoundExpr::bad(span));
    }
    if operand.is_bad() {
        return Ok(BoundExpr::bad(span));
    }
    if !b.options.runtime.contains(RuntimeFeatures::AWAIT_PATTERN) {
        b.report_missing_runtime("'Await'", span);
        return Ok(BoundExpr::bad(span));
    }

    if operand.ty.is_object() {
        return Ok(late_await(b, operand, None, span));
    }

    let Some(call) = find_get_awaiter(b, &operand, span, ctx)? else {
        let shown = b.display(&operand.ty);
        b.error(DiagnosticCode::NotAwaitable, span, format!("'{shown}' is not awaitable."));
        return Ok(BoundExpr::bad(span));
    };
    if call.awaiter.is_object() {
        return Ok(late_await(b, operand, Some(call), span));
    }

    let is_completed = check_is_completed(b, &call.awaiter, span);
    let get_result = check_get_result(b, &call.awaiter, span);
    let notifies = check_notify_completion(b, &call.awaiter, span);
    let (Some(is_completed), Some((get_result, ty)), true) = (is_completed, get_result, notifies) else {
        return Ok(BoundExpr::bad(span));
    };

    tracing::trace!(awaiter = %b.display(&call.awaiter), "await bound");
    let bound = BoundAwait {
        operand,
        awaiter: call.awaiter,
        get_awaiter: Some(call.procedure),
        get_awaiter_is_extension: call.is_extension,
        is_completed: Some(is_completed),
        get_result: Some(get_result),
    };
    Ok(BoundExpr::new(BoundKind::Await(Box::new(bound)), ty, span))
}

/// An await whose operand or awaiter is `Object`: every awaiter member is
/// found at run time.
fn late_await<'ast>(
    b: &mut Binder<'_>,
    operand: BoundExpr<'ast>,
    call: Option<AwaiterCall>,
    span: Span,
) -> BoundExpr<'ast> {
    if !b.report_late_binding("'Await'", span) {
        return BoundExpr::bad(span);
    }
    let (get_awaiter, get_awaiter_is_extension) = match &call {
        Some(call) => (Some(call.procedure), call.is_extension),
        None => (None, false),
    };
    let bound = BoundAwait {
        operand,
        awaiter: DataType::Object,
        get_awaiter,
        get_awaiter_is_extension,
        is_completed: None,
        get_result: None,
    };
    BoundExpr::new(BoundKind::Await(Box::new(bound)), DataType::Object, span)
}

/// Bind `operand.GetAwaiter()` as a trial. `None` unless it resolves to an
/// instance method or extension taking no arguments.
fn find_get_awaiter(
    b: &mut Binder<'_>,
    operand: &BoundExpr<'_>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<Option<AwaiterCall>> {
    let (call, _) = b.speculate(|b| -> Result<Option<AwaiterCall>> {
        let member = bind_member_of(b, operand.clone(), "GetAwaiter", Vec::new(), false, span, ctx)?;
        let BoundKind::MemberGroup(group) = member.kind else {
            return Ok(None);
        };
        let invoked = invoke_group(b, *group, Vec::new(), true, span, ctx)?;
        if invoked.is_bad() {
            return Ok(None);
        }
        let BoundKind::Call(call) = &invoked.kind else {
            return Ok(None);
        };
        let Some(procedure) = b.table.get_procedure(call.procedure) else {
            return Ok(None);
        };
        if procedure.is_shared || !procedure.call_params().is_empty() || invoked.ty.is_void() {
            return Ok(None);
        }
        Ok(Some(AwaiterCall {
            procedure: call.procedure,
            is_extension: call.is_extension,
            awaiter: invoked.ty.clone(),
        }))
    });
    call
}

fn report_shared(b: &mut Binder<'_>, member: &str, awaiter: &DataType, span: Span) {
    let shown = b.display(awaiter);
    b.error(
        DiagnosticCode::AwaiterMemberShared,
        span,
        format!("'{member}' of awaiter type '{shown}' is Shared; 'Await' requires an instance member."),
    );
}

/// Hash of the awaiter's `IsCompleted` property.
fn check_is_completed(b: &mut Binder<'_>, awaiter: &DataType, span: Span) -> Option<TypeHash> {
    let table = b.table;
    let property = table
        .lookup_member(awaiter, "IsCompleted")
        .into_iter()
        .find_map(|m| match m {
            MemberRef::Property(h) => table.get_property(h),
            _ => None,
        });
    let valid = property.filter(|p| {
        p.params.is_empty()
            && p.has_getter
            && table.member_type(awaiter, p.owner, &p.ty) == DataType::boolean()
    });
    match valid {
        Some(p) if p.is_shared => {
            report_shared(b, "IsCompleted", awaiter, span);
            None
        }
        Some(p) => Some(p.hash),
        None => {
            let shown = b.display(awaiter);
            b.error(
                DiagnosticCode::AwaiterIsCompletedInvalid,
                span,
                format!("'Await' requires the awaiter type '{shown}' to have a readable 'IsCompleted' property of type 'Boolean' with no parameters."),
            );
            None
        }
    }
}

/// Hash and result type of the awaiter's `GetResult` method.
fn check_get_result(b: &mut Binder<'_>, awaiter: &DataType, span: Span) -> Option<(TypeHash, DataType)> {
    let table = b.table;
    let method = table
        .lookup_member(awaiter, "GetResult")
        .into_iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(h) => table.get_procedure(h),
            _ => None,
        })
        .find(|p| p.call_params().is_empty() && !p.is_generic());
    match method {
        Some(p) if p.is_shared => {
            report_shared(b, "GetResult", awaiter, span);
            None
        }
        Some(p) => {
            let ty = table.member_type(awaiter, p.owner, &p.return_type);
            Some((p.hash, ty))
        }
        None => {
            let shown = b.display(awaiter);
            b.error(
                DiagnosticCode::AwaiterGetResultInvalid,
                span,
                format!("'Await' requires the awaiter type '{shown}' to have a 'GetResult' method with no parameters."),
            );
            None
        }
    }
}

fn check_notify_completion(b: &mut Binder<'_>, awaiter: &DataType, span: Span) -> bool {
    let table = b.table;
    let Some(notify) = table.well_known_type(WellKnownType::NotifyCompletion) else {
        b.report_missing_runtime("'Await'", span);
        return false;
    };
    if table.implements_interface(awaiter, &notify) {
        return true;
    }
    let (shown, interface) = (b.display(awaiter), b.display(&notify));
    b.error(
        DiagnosticCode::AwaiterMissingNotifyCompletion,
        span,
        format!("'Await' requires the awaiter type '{shown}' to implement '{interface}'."),
    );
    false
}
