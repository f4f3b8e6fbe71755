//! Invocation: method groups, argument passing and indexing.
//!
//! A call site `target(args)` is bound in three steps. The target is bound
//! as a method group (or a value), the arguments are bound without a
//! target type so lambdas and `Nothing` can still adapt to whichever
//! overload wins, and finally [`invoke_group`] resolves the overload and
//! [`bind_arguments`] converts each argument to its parameter.
//!
//! # ByRef arguments
//!
//! An argument passed to a `ByRef` parameter is passed by address when it is
//! a writable location of exactly the parameter type. Anything else goes
//! through a temporary; when the original is still writable (a local of
//! another type, a property) the temporary is written back after the call.
//!
//! # Re-indexing
//!
//! `F(1)` where `F` is a parameterless function whose result has a default
//! member is bound as `F()(1)`. This only happens when the group has a
//! single accessible parameterless candidate (or a lone default-property
//! extension) and nothing in the group accepts the arguments as written.

use basalt_core::{
    BindError, ConstantValue, DataType, DiagnosticCode, RuntimeFeatures, Span,
};
use basalt_symbols::{CallerInfo, ComDefault, MemberRef, ParamEntry, WellKnownType};
use basalt_syntax::{Argument, CallExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundCall, BoundExpr, BoundFlags, BoundKind, MemberGroup};
use crate::context::InterpretationContext;
use crate::flags::ExpressionFlags;
use crate::late::late_invoke;
use crate::overload::{
    BoundArgument, CallSite, Candidate, ParamBinding, Resolution, Selected, map_arguments, resolve_overloads,
};

use super::assignment::assign;
use super::convert::{convert_implicit, convert_unchecked};
use super::member::receiver_type;
use super::{bind_deferred, bind_expr};

/// Bind `target(args)`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_call<'ast>(
    b: &mut Binder<'_>,
    call: &'ast CallExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = call.span;
    let target = bind_expr(b, call.target, ExpressionFlags::VALUE | ExpressionFlags::ALLOW_METHOD_GROUP, ctx)?;
    let args = bind_argument_list(b, call.args, ctx)?;
    if target.is_bad() {
        return Ok(BoundExpr::bad(span));
    }

    let BoundExpr { kind, ty, flags, span: target_span } = target;
    match kind {
        BoundKind::MemberGroup(group) => invoke_group(b, *group, args, true, span, ctx),
        BoundKind::LateCall(late) if late.args.is_empty() && late.member.is_some() => {
            let late = *late;
            late_invoke(b, late.receiver, late.member, args, span, ctx)
        }
        kind => {
            let value = BoundExpr {
                kind,
                ty,
                flags,
                span: target_span,
            };
            index_value(b, value, args, span, ctx)
        }
    }
}

/// Bind the arguments of a call without target types.
pub(crate) fn bind_argument_list<'ast>(
    b: &mut Binder<'_>,
    args: &'ast [Argument<'ast>],
    ctx: &InterpretationContext,
) -> Result<Vec<BoundArgument<'ast>>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        let value = match arg.value {
            Some(expr) => Some(bind_deferred(b, expr, ctx)?),
            None => None,
        };
        out.push(BoundArgument {
            name: arg.name.map(|n| n.name),
            value,
            span: arg.span,
        });
    }
    Ok(out)
}

/// Resolve and bind a call to `group`.
///
/// `has_arg_list` is false when the group was named without parentheses.
pub(crate) fn invoke_group<'ast>(
    b: &mut Binder<'_>,
    group: MemberGroup<'ast>,
    args: Vec<BoundArgument<'ast>>,
    has_arg_list: bool,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    invoke_group_with(b, group, args, has_arg_list, span, ctx, true)
}

fn invoke_group_with<'ast>(
    b: &mut Binder<'_>,
    group: MemberGroup<'ast>,
    args: Vec<BoundArgument<'ast>>,
    has_arg_list: bool,
    span: Span,
    ctx: &InterpretationContext,
    allow_reindex: bool,
) -> Result<BoundExpr<'ast>> {
    let (instance, extensions) = group_candidates(b, &group);
    if instance.is_empty() && extensions.is_empty() {
        return Err(BindError::internal(
            format!("'{}' has no callable members", group.name),
            span,
        ));
    }

    if allow_reindex && has_arg_list && !args.is_empty() && reindexes(b, &instance, &extensions, &args, ctx) {
        tracing::debug!(name = %group.name, "re-indexing the result of a parameterless call");
        let value = invoke_group_with(b, group, Vec::new(), false, span, ctx, false)?;
        if value.is_bad() {
            return Ok(value);
        }
        return index_value(b, value, args, span, ctx);
    }

    let site = CallSite {
        name: group.name.clone(),
        receiver: group.receiver.clone().filter(|_| !group.through_type),
        args,
        type_args: group.type_args.clone(),
        has_type_arg_list: group.has_type_arg_list,
        span,
    };

    let resolution = match (instance.is_empty(), extensions.is_empty()) {
        (false, true) => resolve_overloads(b, instance, &site, ctx)?,
        (true, _) => resolve_overloads(b, extensions, &site, ctx)?,
        (false, false) => {
            // Extensions are only considered when no instance member applies.
            let (first, diagnostics) = b.buffered(|b| resolve_overloads(b, instance, &site, ctx));
            let first = first?;
            let instance_applies = match &first {
                Resolution::Selected(selected) => !selected.arguments_rejected,
                Resolution::LateBound => true,
                Resolution::Failed => false,
            };
            if instance_applies {
                b.commit(diagnostics);
                first
            } else {
                let (second, extension_diagnostics) = b.buffered(|b| resolve_overloads(b, extensions, &site, ctx));
                match second? {
                    Resolution::Failed => {
                        b.commit(diagnostics);
                        first
                    }
                    Resolution::Selected(selected) if selected.arguments_rejected && first != Resolution::Failed => {
                        b.commit(diagnostics);
                        first
                    }
                    resolved => {
                        tracing::debug!(name = %group.name, "falling back to extension methods");
                        b.commit(extension_diagnostics);
                        resolved
                    }
                }
            }
        }
    };

    match resolution {
        Resolution::Selected(selected) => bind_selected(b, group, *selected, site.args, span, ctx),
        Resolution::LateBound => {
            if !b.report_late_binding(&format!("'{}'", group.name), span) {
                return Ok(BoundExpr::bad(span));
            }
            let receiver = group.receiver.filter(|_| !group.through_type);
            late_invoke(b, receiver, Some(group.name), site.args, span, ctx)
        }
        Resolution::Failed => Ok(BoundExpr::bad(span)),
    }
}

/// Instance candidates and extension candidates of `group`.
fn group_candidates(b: &Binder<'_>, group: &MemberGroup<'_>) -> (Vec<Candidate>, Vec<Candidate>) {
    let table = b.table;
    let receiver = receiver_type(group);
    let instance = group
        .members
        .iter()
        .filter_map(|member| match *member {
            MemberRef::Procedure(h) => table
                .get_procedure(h)
                .map(|p| Candidate::from_procedure(table, p, receiver.as_ref(), false)),
            MemberRef::Property(h) => table
                .get_property(h)
                .map(|p| Candidate::from_property(table, p, receiver.as_ref())),
            MemberRef::Field(_) | MemberRef::Type(_) => None,
        })
        .collect();
    let extensions = group
        .extensions
        .iter()
        .filter_map(|h| table.get_procedure(*h))
        .map(|p| Candidate::from_procedure(table, p, receiver.as_ref(), true))
        .collect();
    (instance, extensions)
}

fn reindexes(
    b: &Binder<'_>,
    instance: &[Candidate],
    extensions: &[Candidate],
    args: &[BoundArgument<'_>],
    ctx: &InterpretationContext,
) -> bool {
    let table = b.table;
    let parameterless = |c: &Candidate| c.call_params().is_empty() && !c.return_type.is_void();
    let accessible: Vec<&Candidate> = instance
        .iter()
        .filter(|c| table.is_member_accessible(c.member, ctx.containing_type))
        .collect();
    let eligible = match accessible.as_slice() {
        [single] => parameterless(single),
        [] => matches!(extensions, [only] if only.is_default_extension && parameterless(only)),
        _ => false,
    };
    eligible && !instance.iter().chain(extensions).any(|c| accepts(c, args))
}

fn accepts(candidate: &Candidate, args: &[BoundArgument<'_>]) -> bool {
    let params = candidate.call_params();
    map_arguments(params, args, false).is_ok() || (candidate.has_param_array() && map_arguments(params, args, true).is_ok())
}

fn bind_selected<'ast>(
    b: &mut Binder<'_>,
    group: MemberGroup<'ast>,
    selected: Selected,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let candidate = &selected.candidate;
    let is_extension = candidate.is_extension;
    let shared = candidate.is_shared || table.get_type(candidate.owner).is_some_and(|t| t.is_module());
    let through_type = group.through_type || group.receiver.as_ref().is_some_and(|r| matches!(r.kind, BoundKind::TypeExpr(_)));

    let mut args = args;
    let receiver = if is_extension {
        let Some(receiver) = group.receiver else {
            return Err(BindError::internal(format!("extension call '{}' without a receiver", group.name), span));
        };
        args.insert(0, BoundArgument::positional(receiver));
        None
    } else if shared {
        if let Some(receiver) = &group.receiver
            && !through_type
            && !group.implicit_receiver
        {
            b.warning(
                DiagnosticCode::SharedMemberThroughInstance,
                receiver.span,
                "Access of shared member, constant member, enum member or nested type through an instance; qualifying expression will not be evaluated.",
            );
        }
        None
    } else {
        match group.receiver {
            Some(receiver) if !through_type => Some(receiver),
            _ => {
                b.error(
                    DiagnosticCode::InstanceMemberRequiresObject,
                    span,
                    "Reference to a non-shared member requires an object reference.",
                );
                bind_arguments(b, &selected, args, span, ctx)?;
                return Ok(BoundExpr::bad(span));
            }
        }
    };

    let (mut bound_args, copy_backs) = bind_arguments(b, &selected, args, span, ctx)?;
    let receiver = if is_extension && !bound_args.is_empty() {
        Some(bound_args.remove(0))
    } else {
        receiver
    };

    let ty = selected.return_type.clone();
    let node = match selected.candidate.member {
        MemberRef::Property(hash) => {
            let read_only = table.get_property(hash).is_some_and(|p| !p.has_setter);
            let node = BoundExpr::new(
                BoundKind::Property {
                    receiver: receiver.map(Box::new),
                    property: hash,
                    args: bound_args,
                },
                ty,
                span,
            );
            if read_only { node.with_flags(BoundFlags::READ_ONLY) } else { node }
        }
        MemberRef::Procedure(hash) => {
            let call = BoundCall {
                receiver,
                procedure: hash,
                type_args: selected.type_args,
                args: bound_args,
                copy_backs,
                is_extension,
            };
            BoundExpr::new(BoundKind::Call(Box::new(call)), ty, span)
        }
        MemberRef::Field(_) | MemberRef::Type(_) => {
            return Err(BindError::internal(format!("'{}' is not invocable", group.name), span));
        }
    };
    Ok(if is_extension { node.with_flags(BoundFlags::EXTENSION_CALL) } else { node })
}

// ==========================================================================
// Arguments
// ==========================================================================

/// Convert `args` to the parameters of `selected`.
///
/// Returns the arguments in parameter order and the copy-back assignments
/// to run after the call.
pub(crate) fn bind_arguments<'ast>(
    b: &mut Binder<'_>,
    selected: &Selected,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<(Vec<BoundExpr<'ast>>, Vec<BoundExpr<'ast>>)> {
    let mut slots: Vec<Option<BoundArgument<'ast>>> = args.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(selected.params.len());
    let mut copy_backs = Vec::new();

    for (param, binding) in selected.params.iter().zip(&selected.map.bindings) {
        let bound = match binding {
            ParamBinding::Argument(index) => {
                let value = slots.get_mut(*index).and_then(Option::take).and_then(|a| a.value);
                match value {
                    Some(value) => pass_argument(b, value, param, &mut copy_backs, ctx)?,
                    None => default_argument(b, param, span, ctx)?,
                }
            }
            ParamBinding::Expanded(indices) => {
                let element = param
                    .ty
                    .array_parts()
                    .map_or(DataType::Error, |(element, _)| element.clone());
                let mut elements = Vec::with_capacity(indices.len());
                for index in indices {
                    if let Some(value) = slots.get_mut(*index).and_then(Option::take).and_then(|a| a.value) {
                        elements.push(convert_implicit(b, value, &element, ctx)?);
                    }
                }
                param_array(param, elements, span)
            }
            ParamBinding::Default => default_argument(b, param, span, ctx)?,
        };
        out.push(bound);
    }
    Ok((out, copy_backs))
}

fn param_array<'ast>(param: &ParamEntry, elements: Vec<BoundExpr<'ast>>, span: Span) -> BoundExpr<'ast> {
    let length = i32::try_from(elements.len()).unwrap_or(i32::MAX);
    let bounds = vec![BoundExpr::constant(ConstantValue::integer(length), DataType::integer(), span)];
    BoundExpr::new(BoundKind::ArrayCreation { bounds, elements }, param.ty.clone(), span)
}

fn pass_argument<'ast>(
    b: &mut Binder<'_>,
    value: BoundExpr<'ast>,
    param: &ParamEntry,
    copy_backs: &mut Vec<BoundExpr<'ast>>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if !param.by_ref {
        return convert_implicit(b, value, &param.ty, ctx);
    }
    let span = value.span;
    let param_ty = b.table.normalize(param.ty.clone());
    if value.is_lvalue() && !value.is_read_only() && !value.is_unbound() && value.ty == param_ty {
        return Ok(BoundExpr::new(BoundKind::Address(Box::new(value)), param_ty, span));
    }

    let temp = b.new_temp();
    let original = (value.is_assignable() && !value.is_unbound() && !value.is_bad()).then(|| value.clone());
    let initial = convert_implicit(b, value, &param_ty, ctx)?;
    if let Some(original) = original
        && !initial.is_bad()
    {
        tracing::trace!(param = %param.name, "ByRef argument copied back after the call");
        let back = BoundExpr::new(BoundKind::Temporary(temp), param_ty.clone(), span);
        let original_ty = original.ty.clone();
        let back = convert_implicit(b, back, &original_ty, ctx)?;
        copy_backs.push(assign(b, original, back, span));
    }
    Ok(BoundExpr::new(
        BoundKind::TempAddress {
            temp,
            initial: Box::new(initial),
        },
        param_ty,
        span,
    ))
}

/// The value passed for an optional parameter the caller left out.
fn default_argument<'ast>(
    b: &mut Binder<'_>,
    param: &ParamEntry,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    if let Some(info) = param.caller_info {
        let fallback = || param.default.clone().unwrap_or_else(|| ConstantValue::string(""));
        let value = match info {
            CallerInfo::LineNumber => ConstantValue::integer(i32::try_from(span.line).unwrap_or(i32::MAX)),
            CallerInfo::MemberName => ctx.procedure_name.clone().map_or_else(fallback, ConstantValue::string),
            CallerInfo::FilePath => ctx.file_path.clone().map_or_else(fallback, ConstantValue::string),
        };
        let ty = value.data_type();
        return convert_implicit(b, BoundExpr::constant(value, ty, span), &param.ty, ctx);
    }

    if let Some(marker) = param.com_default {
        let role = match marker {
            ComDefault::Dispatch => WellKnownType::DispatchWrapper,
            ComDefault::Unknown => WellKnownType::UnknownWrapper,
        };
        let constructor = table
            .well_known(role)
            .filter(|_| b.options.runtime.contains(RuntimeFeatures::COM_WRAPPERS))
            .and_then(|wrapper| {
                table.declared_members(wrapper, "New").into_iter().find_map(|m| match m {
                    MemberRef::Procedure(h) => Some((wrapper, h)),
                    _ => None,
                })
            });
        let Some((wrapper, constructor)) = constructor else {
            b.report_missing_runtime("A COM default parameter value", span);
            return Ok(BoundExpr::bad(span));
        };
        let nothing = BoundExpr::constant(ConstantValue::Nothing, DataType::Object, span);
        let creation = BoundExpr::new(
            BoundKind::ObjectCreation {
                constructor: Some(constructor),
                args: vec![nothing],
                copy_backs: Vec::new(),
            },
            DataType::named(wrapper),
            span,
        );
        return Ok(convert_unchecked(table, creation, &param.ty));
    }

    if param.is_param_array {
        return Ok(param_array(param, Vec::new(), span));
    }

    match &param.default {
        Some(value) => {
            let ty = value.data_type();
            convert_implicit(b, BoundExpr::constant(value.clone(), ty, span), &param.ty, ctx)
        }
        None if param.is_optional => {
            let missing = missing_value(b, span);
            Ok(convert_unchecked(table, missing, &param.ty))
        }
        None => Err(BindError::internal(
            format!("parameter '{}' has no argument and no default", param.name),
            span,
        )),
    }
}

/// `System.Reflection.Missing.Value`, passed for omitted arguments whose
/// default only the callee knows.
pub(crate) fn missing_value<'ast>(b: &mut Binder<'_>, span: Span) -> BoundExpr<'ast> {
    let table = b.table;
    let field = table
        .well_known(WellKnownType::Missing)
        .filter(|_| b.options.runtime.contains(RuntimeFeatures::COM_WRAPPERS))
        .and_then(|missing| {
            table.declared_members(missing, "Value").into_iter().find_map(|m| match m {
                MemberRef::Field(h) => table.get_field(h),
                _ => None,
            })
        });
    match field {
        Some(field) => BoundExpr::new(
            BoundKind::Field {
                receiver: None,
                field: field.hash,
            },
            field.ty.clone(),
            span,
        ),
        None => {
            b.report_missing_runtime("An omitted argument", span);
            BoundExpr::bad(span)
        }
    }
}

// ==========================================================================
// Indexing
// ==========================================================================

/// Apply an argument list to a value: array element access, delegate
/// invocation or a default-member call.
pub(crate) fn index_value<'ast>(
    b: &mut Binder<'_>,
    value: BoundExpr<'ast>,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if value.is_bad() {
        return Ok(BoundExpr::bad(span));
    }
    let table = b.table;
    let ty = value.ty.clone();

    if let Some((element, rank)) = ty.array_parts() {
        let element = element.clone();
        return index_array(b, value, element, rank, args, span, ctx);
    }

    if table.is_delegate(&ty) {
        let Some(signature) = table.delegate_signature(&ty) else {
            return Err(BindError::internal("delegate type without an Invoke method", span));
        };
        let group = MemberGroup {
            receiver: Some(value),
            name: "Invoke".to_string(),
            members: vec![MemberRef::Procedure(signature.invoke)],
            extensions: Vec::new(),
            type_args: Vec::new(),
            has_type_arg_list: false,
            through_type: false,
            implicit_receiver: false,
        };
        return invoke_group_with(b, group, args, true, span, ctx, false);
    }

    if ty.is_object() || table.entry_of(&ty).is_some_and(|e| e.is_dispatch) {
        if !b.report_late_binding("the default member", span) {
            return Ok(BoundExpr::bad(span));
        }
        return late_invoke(b, Some(value), None, args, span, ctx);
    }

    if let Some(name) = table.default_member(&ty) {
        let members = table.lookup_member(&ty, name);
        if !members.is_empty() {
            let group = MemberGroup {
                receiver: Some(value),
                name: name.to_string(),
                members,
                extensions: Vec::new(),
                type_args: Vec::new(),
                has_type_arg_list: false,
                through_type: false,
                implicit_receiver: false,
            };
            return invoke_group_with(b, group, args, true, span, ctx, false);
        }
    }

    let shown = b.display(&ty);
    let message = if ty.is_void() {
        "Expression does not produce a value.".to_string()
    } else {
        format!("Class '{shown}' cannot be indexed because it has no default property.")
    };
    let code = if ty.is_void() {
        DiagnosticCode::ExpressionHasNoValue
    } else {
        DiagnosticCode::NotIndexable
    };
    b.error(code, value.span, message);
    Ok(BoundExpr::bad(span))
}

fn index_array<'ast>(
    b: &mut Binder<'_>,
    array: BoundExpr<'ast>,
    element: DataType,
    rank: u32,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let mut ok = true;
    if args.len() != rank as usize {
        let message = if args.len() > rank as usize {
            "Number of indices exceeds the number of dimensions of the indexed array."
        } else {
            "Number of indices is less than the number of dimensions of the indexed array."
        };
        b.error(DiagnosticCode::IndexCountMismatch, span, message);
        ok = false;
    }

    let mut indices = Vec::with_capacity(args.len());
    for arg in args {
        if arg.name.is_some() {
            b.error(
                DiagnosticCode::NamedArgumentNotFound,
                arg.span,
                "Named arguments are not valid as array subscripts.",
            );
            ok = false;
        }
        match arg.value {
            Some(value) => indices.push(convert_implicit(b, value, &DataType::integer(), ctx)?),
            None => {
                b.error(
                    DiagnosticCode::IndexCountMismatch,
                    arg.span,
                    "Array subscript expression missing.",
                );
                ok = false;
            }
        }
    }

    let node = BoundExpr::new(
        BoundKind::ArrayIndex {
            array: Box::new(array),
            indices,
        },
        element,
        span,
    )
    .with_flags(BoundFlags::LVALUE);
    Ok(if ok { node } else { node.into_bad() })
}

#[cfg(test)]
mod tests {
    use basalt_core::{CompileOptions, ConstantValue, DataType, DiagnosticCode, PrimitiveKind, RuntimeFeatures};
    use basalt_symbols::{CallerInfo, ParamEntry, ProcedureEntry, PropertyEntry, TypeEntry};
    use basalt_syntax::AstBuilder;
    use bumpalo::Bump;

    use crate::bound::{BoundFlags, BoundKind};
    use crate::context::InterpretationContext;
    use crate::testing::{Fixture, codes};

    fn call_args<'a, 'ast>(bound: &'a crate::bound::BoundExpr<'ast>) -> &'a [crate::bound::BoundExpr<'ast>] {
        match &bound.kind {
            BoundKind::Call(call) => &call.args,
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn by_ref_local_of_the_same_type_is_passed_by_address() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Counter");
        f.table
            .register_procedure(ProcedureEntry::sub(
                class,
                "Increment",
                vec![ParamEntry::by_ref("value", DataType::integer())],
            ))
            .unwrap();
        f.local("n", DataType::integer());
        let expr = ast.alloc(ast.call(ast.name("Increment"), &[ast.name("n")]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert!(sink.is_empty());
        assert!(matches!(call_args(&bound)[0].kind, BoundKind::Address(_)));
    }

    #[test]
    fn by_ref_property_is_copied_back_once() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Counter");
        f.table
            .register_procedure(ProcedureEntry::sub(
                class,
                "Increment",
                vec![ParamEntry::by_ref("value", DataType::integer())],
            ))
            .unwrap();
        f.table
            .register_property(PropertyEntry::read_write(class, "Total", DataType::integer()))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Increment"), &[ast.name("Total")]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert!(sink.is_empty());
        let BoundKind::Call(call) = &bound.kind else {
            panic!("expected a call");
        };
        assert!(matches!(call.args[0].kind, BoundKind::TempAddress { .. }));
        assert_eq!(call.copy_backs.len(), 1);
        let BoundKind::Assignment { target, value } = &call.copy_backs[0].kind else {
            panic!("expected an assignment");
        };
        assert!(matches!(target.kind, BoundKind::Property { .. }));
        assert!(matches!(value.kind, BoundKind::Temporary(_)));
    }

    #[test]
    fn by_ref_local_of_another_type_converts_both_ways() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Counter");
        f.table
            .register_procedure(ProcedureEntry::sub(
                class,
                "Grow",
                vec![ParamEntry::by_ref("value", DataType::long())],
            ))
            .unwrap();
        f.local("n", DataType::integer());
        let expr = ast.alloc(ast.call(ast.name("Grow"), &[ast.name("n")]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert_eq!(codes(&sink), vec![DiagnosticCode::NarrowingConversion]);
        let BoundKind::Call(call) = &bound.kind else {
            panic!("expected a call");
        };
        assert_eq!(call.copy_backs.len(), 1);
        assert!(!bound.is_bad());
    }

    #[test]
    fn by_ref_constant_goes_through_a_temporary_without_copy_back() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Counter");
        f.table
            .register_procedure(ProcedureEntry::sub(
                class,
                "Increment",
                vec![ParamEntry::by_ref("value", DataType::integer())],
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Increment"), &[ast.int(4)]));
        let (bound, _) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        let BoundKind::Call(call) = &bound.kind else {
            panic!("expected a call");
        };
        assert!(matches!(call.args[0].kind, BoundKind::TempAddress { .. }));
        assert!(call.copy_backs.is_empty());
    }

    #[test]
    fn param_array_packs_trailing_arguments() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Math");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Sum",
                vec![ParamEntry::param_array("values", DataType::integer())],
                DataType::integer(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Sum"), &[ast.int(1), ast.int(2), ast.int(3)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        let BoundKind::ArrayCreation { bounds, elements } = &call_args(&bound)[0].kind else {
            panic!("expected a packed array");
        };
        assert_eq!(bounds[0].constant_value(), Some(&ConstantValue::integer(3)));
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn omitted_optional_argument_uses_its_default() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Printer");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Print",
                vec![
                    ParamEntry::new("text", DataType::string()),
                    ParamEntry::optional("copies", DataType::integer(), ConstantValue::integer(1)),
                ],
                DataType::boolean(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Print"), &[ast.string("page")]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(call_args(&bound)[1].constant_value(), Some(&ConstantValue::integer(1)));
    }

    #[test]
    fn caller_member_name_is_filled_in() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Log");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Trace",
                vec![
                    ParamEntry::optional("member", DataType::string(), ConstantValue::string(""))
                        .with_caller_info(CallerInfo::MemberName),
                ],
                DataType::boolean(),
            ))
            .unwrap();
        f.ctx = InterpretationContext::in_type(class).with_procedure("Render");
        let expr = ast.alloc(ast.call(ast.name("Trace"), &[]));
        let (bound, _) = f.bind(expr);
        assert_eq!(call_args(&bound)[0].constant_value(), Some(&ConstantValue::string("Render")));
    }

    #[test]
    fn optional_object_without_default_needs_com_wrappers() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let options = CompileOptions::lenient().without_runtime(RuntimeFeatures::COM_WRAPPERS);
        let mut f = Fixture::with_options(options);
        let class = f.enter_class("Automation");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Open",
                vec![ParamEntry::optional_missing("mode", DataType::Object)],
                DataType::boolean(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Open"), &[]));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::MissingRuntimeSupport]);
    }

    #[test]
    fn every_bad_argument_is_reported() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Pair");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Make",
                vec![ParamEntry::new("a", DataType::integer()), ParamEntry::new("b", DataType::integer())],
                DataType::integer(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("Make"), &[ast.name("first"), ast.name("second")]));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(
            codes(&sink),
            vec![DiagnosticCode::NameNotDeclared, DiagnosticCode::NameNotDeclared]
        );
    }

    #[test]
    fn array_element_is_an_lvalue() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        f.local("grid", DataType::array(DataType::double(), 2));
        let expr = ast.alloc(ast.call(ast.name("grid"), &[ast.int(1), ast.int(2)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::double());
        assert!(bound.is_lvalue());

        let wrong = ast.alloc(ast.call(ast.name("grid"), &[ast.int(1)]));
        let (bound, sink) = f.bind(wrong);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::IndexCountMismatch]);
    }

    #[test]
    fn string_is_indexed_through_its_default_property() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        f.local("name", DataType::string());
        let expr = ast.alloc(ast.call(ast.name("name"), &[ast.int(0)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::primitive(PrimitiveKind::Char));
        assert!(matches!(bound.kind, BoundKind::Property { .. }));
        assert!(!bound.is_assignable());
    }

    #[test]
    fn parameterless_function_result_is_re_indexed() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Person");
        f.table
            .register_procedure(ProcedureEntry::method(class, "GetName", vec![], DataType::string()))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("GetName"), &[ast.int(0)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::primitive(PrimitiveKind::Char));
        let BoundKind::Property { receiver: Some(receiver), .. } = &bound.kind else {
            panic!("expected the default property, got {:?}", bound.kind);
        };
        assert!(matches!(receiver.kind, BoundKind::Call(_)));
    }

    #[test]
    fn overloaded_group_is_not_re_indexed() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Person");
        f.table
            .register_procedure(ProcedureEntry::method(class, "GetName", vec![], DataType::string()))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "GetName",
                vec![ParamEntry::new("a", DataType::string()), ParamEntry::new("b", DataType::string())],
                DataType::string(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.call(ast.name("GetName"), &[ast.int(0)]));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NoApplicableOverload]);
    }

    #[test]
    fn delegate_value_is_invoked() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let func = f.table.func_type(vec![DataType::integer(), DataType::string()]).unwrap();
        f.local("format", func);
        let expr = ast.alloc(ast.call(ast.name("format"), &[ast.int(7)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::string());
        assert!(matches!(bound.kind, BoundKind::Call(_)));
    }

    #[test]
    fn integer_cannot_be_indexed() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let expr = ast.alloc(ast.call(ast.name("n"), &[ast.int(0)]));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NotIndexable]);
    }

    #[test]
    fn instance_method_from_shared_context_needs_an_object() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Widget");
        f.table
            .register_procedure(ProcedureEntry::method(class, "Size", vec![], DataType::integer()))
            .unwrap();
        f.ctx = InterpretationContext::in_type(class).with_shared(true);
        let expr = ast.alloc(ast.call(ast.name("Size"), &[]));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::InstanceMemberRequiresObject]);
    }

    #[test]
    fn extension_call_receives_the_receiver_first() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let module = f.table.register_type(TypeEntry::module("TextExtensions")).unwrap();
        f.table
            .register_procedure(
                ProcedureEntry::method(
                    module,
                    "Repeat",
                    vec![ParamEntry::new("text", DataType::string()), ParamEntry::new("count", DataType::integer())],
                    DataType::string(),
                )
                .extension(),
            )
            .unwrap();
        f.local("s", DataType::string());
        let expr = ast.alloc(ast.call(ast.member(ast.name("s"), "Repeat"), &[ast.int(2)]));
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert!(bound.flags.contains(BoundFlags::EXTENSION_CALL));
        let BoundKind::Call(call) = &bound.kind else {
            panic!("expected a call");
        };
        assert!(call.is_extension);
        assert!(matches!(call.receiver.as_ref().map(|r| &r.kind), Some(BoundKind::Local { .. })));
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn extension_applies_when_the_instance_member_rejects_the_arguments() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let widget_ty = DataType::named(widget);
        f.table
            .register_procedure(ProcedureEntry::sub(widget, "Add", vec![ParamEntry::new("other", widget_ty.clone())]))
            .unwrap();
        let module = f.table.register_type(TypeEntry::module("WidgetExtensions")).unwrap();
        f.table
            .register_procedure(
                ProcedureEntry::sub(
                    module,
                    "Add",
                    vec![ParamEntry::new("w", widget_ty.clone()), ParamEntry::new("n", DataType::integer())],
                )
                .extension(),
            )
            .unwrap();
        f.local("w", widget_ty);
        let expr = ast.alloc(ast.call(ast.member(ast.name("w"), "Add"), &[ast.int(5)]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert!(sink.is_empty(), "{:?}", codes(&sink));
        assert!(!bound.is_bad());
        let BoundKind::Call(call) = &bound.kind else {
            panic!("expected a call");
        };
        assert!(call.is_extension);
    }

    #[test]
    fn instance_conversion_error_stands_when_no_extension_applies() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let widget_ty = DataType::named(widget);
        f.table
            .register_procedure(ProcedureEntry::sub(widget, "Add", vec![ParamEntry::new("other", widget_ty.clone())]))
            .unwrap();
        let module = f.table.register_type(TypeEntry::module("WidgetExtensions")).unwrap();
        f.table
            .register_procedure(
                ProcedureEntry::sub(
                    module,
                    "Add",
                    vec![ParamEntry::new("w", widget_ty.clone()), ParamEntry::new("other", widget_ty.clone())],
                )
                .extension(),
            )
            .unwrap();
        f.local("w", widget_ty);
        let expr = ast.alloc(ast.call(ast.member(ast.name("w"), "Add"), &[ast.string("x")]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NoConversion]);
    }

    #[test]
    fn object_argument_defers_overload_choice_to_run_time() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Sink");
        for ty in [DataType::integer(), DataType::string()] {
            f.table
                .register_procedure(ProcedureEntry::sub(class, "Write", vec![ParamEntry::new("value", ty)]))
                .unwrap();
        }
        f.local("o", DataType::Object);
        let expr = ast.alloc(ast.call(ast.name("Write"), &[ast.name("o")]));
        let (bound, sink) = f.bind_with(expr, crate::flags::ExpressionFlags::STATEMENT);
        assert!(matches!(bound.kind, BoundKind::LateCall(_)));
        assert_eq!(codes(&sink), vec![DiagnosticCode::LateBinding]);
    }
}
