//! Member access.
//!
//! `a.b` binds its qualifier first, allowing a type or namespace there, then
//! looks `b` up on whatever the qualifier denotes. Fields and nested types
//! bind directly; procedures and properties come back as a [`MemberGroup`]
//! that the call binder applies to arguments.
//!
//! A simple name that is both a value and the name of its own type (a
//! property `Color As Color`) may qualify shared members of that type
//! without a warning.

use basalt_core::{BindError, DataType, DiagnosticCode, Span, TypeHash};
use basalt_symbols::{FieldEntry, MemberRef};
use basalt_syntax::{Expr, InstanceKeyword, MemberExpr};

use crate::binder::{Binder, Result, qualify};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, MemberGroup};
use crate::context::InterpretationContext;
use crate::conversion::classify;
use crate::flags::ExpressionFlags;
use crate::late::late_member;
use crate::names::report_type_argument_count;
use crate::type_resolver::resolve_type;

use super::bind_expr;

/// What the qualifier of a member access turned out to be.
enum Qualifier<'ast> {
    Bound(BoundExpr<'ast>),
    /// A value whose name is also the name of its type.
    ValueOrType { value: BoundExpr<'ast>, ty: DataType },
}

/// Bind `a.b` or, inside `With`, `.b`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_member_access<'ast>(
    b: &mut Binder<'_>,
    access: &'ast MemberExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = access.span;
    let type_args: Vec<DataType> = access.type_args.iter().map(|t| resolve_type(b, t, ctx)).collect();
    let name = access.name.name;

    let Some(receiver) = access.receiver else {
        let Some(target) = &ctx.with_target else {
            b.error(
                DiagnosticCode::WithMemberOutsideWith,
                span,
                "Leading '.' or '!' can only appear inside a 'With' statement.",
            );
            return Ok(BoundExpr::bad(span));
        };
        let temp = BoundExpr::new(BoundKind::Temporary(target.temp), target.ty.clone(), span)
            .with_flags(BoundFlags::LVALUE);
        return bind_member_of(b, temp, name, type_args, access.has_type_arg_list, span, ctx);
    };

    let receiver = match bind_qualifier(b, receiver, ctx)? {
        Qualifier::Bound(bound) => bound,
        Qualifier::ValueOrType { value, ty } => {
            let table = b.table;
            let members = table.lookup_member(&ty, name);
            let all_shared = !members.is_empty() && members.iter().all(|m| is_shared_member(b, *m));
            if all_shared {
                BoundExpr::new(BoundKind::TypeExpr(ty), DataType::Void, value.span)
            } else {
                value
            }
        }
    };
    bind_member_of(b, receiver, name, type_args, access.has_type_arg_list, span, ctx)
}

/// Bind the left side of `a.b`.
///
/// When a simple name fails to bind as a value but names a type, the type
/// is used and the value's diagnostics are dropped.
fn bind_qualifier<'ast>(
    b: &mut Binder<'_>,
    receiver: &'ast Expr<'ast>,
    ctx: &InterpretationContext,
) -> Result<Qualifier<'ast>> {
    let flags = ExpressionFlags::QUALIFIER | ExpressionFlags::VALUE_REQUIRED;
    let (bound, diagnostics) = b.buffered(|b| bind_expr(b, receiver, flags, ctx));
    let bound = bound?;

    let as_type = match receiver {
        Expr::Name(name) if !name.has_type_arg_list && !ctx.locals_only => b
            .table
            .resolve_type_name(name.ident.name, &ctx.namespace, 0)
            .map(|hash| b.table.normalize(DataType::named(hash))),
        _ => None,
    };

    match as_type {
        Some(ty) if bound.is_bad() => {
            tracing::trace!(name = %b.display(&ty), "qualifier rebound as a type");
            Ok(Qualifier::Bound(BoundExpr::new(BoundKind::TypeExpr(ty), DataType::Void, bound.span)))
        }
        Some(ty) if bound.is_value() && bound.ty == ty => {
            b.commit(diagnostics);
            Ok(Qualifier::ValueOrType { value: bound, ty })
        }
        _ => {
            b.commit(diagnostics);
            Ok(Qualifier::Bound(bound))
        }
    }
}

/// Look up `name` on a bound qualifier.
pub(crate) fn bind_member_of<'ast>(
    b: &mut Binder<'_>,
    receiver: BoundExpr<'ast>,
    name: &str,
    type_args: Vec<DataType>,
    has_type_arg_list: bool,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if receiver.is_bad() {
        return Ok(BoundExpr::bad(span));
    }
    let table = b.table;

    if let BoundKind::NamespaceRef(namespace) = &receiver.kind {
        let namespace = namespace.clone();
        return bind_namespace_member(b, &namespace, name, type_args, has_type_arg_list, span, ctx);
    }

    if let BoundKind::TypeExpr(ty) = &receiver.kind {
        let ty = ty.clone();
        let members = visible_members(b, &ty, name, type_args.len());
        if members.is_empty() {
            report_not_member(b, name, &ty, span);
            return Ok(BoundExpr::bad(span));
        }
        let group = MemberGroup {
            receiver: Some(receiver),
            name: name.to_string(),
            members,
            extensions: Vec::new(),
            type_args,
            has_type_arg_list,
            through_type: true,
            implicit_receiver: false,
        };
        return bind_member_refs(b, group, span, ctx);
    }

    let ty = receiver.ty.clone();
    if ty.is_object() {
        if !b.report_late_binding(&format!("'{name}'"), span) {
            return Ok(BoundExpr::bad(span));
        }
        return Ok(late_member(receiver, name, span));
    }

    let members = visible_members(b, &ty, name, type_args.len());
    let extensions = applicable_extensions(b, &ty, name);
    if members.is_empty() && extensions.is_empty() {
        if table.entry_of(&ty).is_some_and(|e| e.is_dispatch) {
            if !b.report_late_binding(&format!("'{name}'"), span) {
                return Ok(BoundExpr::bad(span));
            }
            return Ok(late_member(receiver, name, span));
        }
        report_not_member(b, name, &ty, span);
        return Ok(BoundExpr::bad(span));
    }

    let group = MemberGroup {
        receiver: Some(receiver),
        name: name.to_string(),
        members,
        extensions,
        type_args,
        has_type_arg_list,
        through_type: false,
        implicit_receiver: false,
    };
    bind_member_refs(b, group, span, ctx)
}

fn bind_namespace_member<'ast>(
    b: &mut Binder<'_>,
    namespace: &str,
    name: &str,
    type_args: Vec<DataType>,
    has_type_arg_list: bool,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let qualified = qualify(namespace, name);
    let arity = type_args.len();

    if let Some(entry) = table.type_by_name(&qualified, arity) {
        let ty = if type_args.is_empty() {
            table.normalize(DataType::named(entry.hash))
        } else {
            DataType::generic(entry.hash, type_args)
        };
        return Ok(BoundExpr::new(BoundKind::TypeExpr(ty), DataType::Void, span));
    }
    if arity == 0
        && let Some(child) = table.child_namespace(namespace, name)
    {
        return Ok(BoundExpr::new(BoundKind::NamespaceRef(child), DataType::Void, span));
    }
    let members = table.module_members(namespace, name);
    if !members.is_empty() {
        let group = MemberGroup {
            receiver: None,
            name: name.to_string(),
            members,
            extensions: Vec::new(),
            type_args,
            has_type_arg_list,
            through_type: false,
            implicit_receiver: true,
        };
        return bind_member_refs(b, group, span, ctx);
    }
    if let Some(entry) = table.types_named(&qualified).next() {
        report_type_argument_count(b, entry, arity, span);
        return Ok(BoundExpr::bad(span));
    }
    b.error(
        DiagnosticCode::MemberNotFound,
        span,
        format!("'{name}' is not a member of '{namespace}'."),
    );
    Ok(BoundExpr::bad(span))
}

/// Members named `name` on `ty`; nested types must match `arity`.
fn visible_members(b: &Binder<'_>, ty: &DataType, name: &str, arity: usize) -> Vec<MemberRef> {
    let table = b.table;
    let lookup_ty = match ty {
        DataType::GenericParam { .. } => DataType::Object,
        other => other.clone(),
    };
    table
        .lookup_member(&lookup_ty, name)
        .into_iter()
        .filter(|m| !matches!(m, MemberRef::Type(h) if table.get_type(*h).is_some_and(|t| t.arity() != arity)))
        .collect()
}

/// Extension methods named `name` whose receiver parameter accepts `ty`.
fn applicable_extensions(b: &Binder<'_>, ty: &DataType, name: &str) -> Vec<TypeHash> {
    let table = b.table;
    table
        .extension_methods(name)
        .into_iter()
        .filter(|p| {
            p.params.first().is_some_and(|first| {
                first.ty.contains_generic_param() || classify(table, ty, &table.normalize(first.ty.clone())).is_widening()
            })
        })
        .map(|p| p.hash)
        .collect()
}

fn is_shared_member(b: &Binder<'_>, member: MemberRef) -> bool {
    let table = b.table;
    let owner_is_module = |owner| table.get_type(owner).is_some_and(|t| t.is_module());
    match member {
        MemberRef::Procedure(h) => table.get_procedure(h).is_some_and(|p| p.is_shared || owner_is_module(p.owner)),
        MemberRef::Property(h) => table.get_property(h).is_some_and(|p| p.is_shared || owner_is_module(p.owner)),
        MemberRef::Field(h) => table.get_field(h).is_some_and(|f| field_is_shared(b, f)),
        MemberRef::Type(_) => true,
    }
}

fn field_is_shared(b: &Binder<'_>, field: &FieldEntry) -> bool {
    field.is_shared || field.constant.is_some() || b.table.get_type(field.owner).is_some_and(|t| t.is_module())
}

fn report_not_member(b: &mut Binder<'_>, name: &str, ty: &DataType, span: Span) {
    let shown = b.display(ty);
    b.error(
        DiagnosticCode::MemberNotFound,
        span,
        format!("'{name}' is not a member of '{shown}'."),
    );
}

/// `Me` as the receiver of an unqualified member of the containing type,
/// or `None` where there is no instance.
pub(crate) fn implicit_receiver<'ast>(
    b: &Binder<'_>,
    ctx: &InterpretationContext,
    span: Span,
) -> Option<BoundExpr<'ast>> {
    if ctx.is_shared || ctx.standalone_constant {
        return None;
    }
    let entry = ctx.containing_type.and_then(|h| b.table.get_type(h))?;
    if entry.is_module() {
        return None;
    }
    Some(BoundExpr::new(
        BoundKind::SelfRef(InstanceKeyword::Me),
        entry.self_type(),
        span,
    ))
}

/// The type members of `group` are seen through.
pub(crate) fn receiver_type(group: &MemberGroup<'_>) -> Option<DataType> {
    group.receiver.as_ref().map(|r| match &r.kind {
        BoundKind::TypeExpr(ty) => ty.clone(),
        _ => r.ty.clone(),
    })
}

/// Turn the members a lookup found into a node: a field or nested type
/// directly, procedures and properties as a method group.
pub(crate) fn bind_member_refs<'ast>(
    b: &mut Binder<'_>,
    group: MemberGroup<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    match group.members.first().copied() {
        Some(MemberRef::Field(hash)) if group.extensions.is_empty() => bind_field(b, hash, group, span, ctx),
        Some(MemberRef::Type(hash)) => {
            let ty = if group.type_args.is_empty() {
                b.table.normalize(DataType::named(hash))
            } else {
                DataType::generic(hash, group.type_args)
            };
            Ok(BoundExpr::new(BoundKind::TypeExpr(ty), DataType::Void, span))
        }
        _ => Ok(BoundExpr::new(BoundKind::MemberGroup(Box::new(group)), DataType::Void, span)),
    }
}

fn bind_field<'ast>(
    b: &mut Binder<'_>,
    hash: TypeHash,
    group: MemberGroup<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let Some(field) = table.get_field(hash) else {
        return Err(BindError::internal(format!("field '{}' is not registered", group.name), span));
    };

    if group.has_type_arg_list {
        b.error(
            DiagnosticCode::NotGeneric,
            span,
            format!("'{}' has no type parameters and so cannot have type arguments.", field.name),
        );
        return Ok(BoundExpr::bad(span));
    }
    if !table.is_accessible(field.access, field.owner, ctx.containing_type) {
        b.error(
            DiagnosticCode::Inaccessible,
            span,
            format!(
                "'{}.{}' is not accessible in this context because it is '{:?}'.",
                b.type_name(field.owner),
                field.name,
                field.access
            ),
        );
        return Ok(BoundExpr::bad(span));
    }

    let seen_through = receiver_type(&group);
    let ty = match &seen_through {
        Some(receiver) => table.member_type(receiver, field.owner, &field.ty),
        None => table.normalize(field.ty.clone()),
    };

    let receiver = if field_is_shared(b, field) {
        if let Some(receiver) = &group.receiver
            && !group.through_type
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
            Some(receiver) if !group.through_type => Some(receiver),
            _ => {
                b.error(
                    DiagnosticCode::InstanceMemberRequiresObject,
                    span,
                    "Reference to a non-shared member requires an object reference.",
                );
                return Ok(BoundExpr::bad(span));
            }
        }
    };

    if let Some(value) = &field.constant {
        return Ok(BoundExpr::constant(value.clone(), ty, span));
    }

    let writable = receiver
        .as_ref()
        .is_none_or(|r| r.is_lvalue() || table.is_reference_type(&r.ty) || matches!(r.kind, BoundKind::SelfRef(_)));
    let mut flags = BoundFlags::empty();
    if writable {
        flags |= BoundFlags::LVALUE;
    }
    if field.is_read_only {
        flags |= BoundFlags::LVALUE | BoundFlags::READ_ONLY;
    }
    let kind = BoundKind::Field {
        receiver: receiver.map(Box::new),
        field: hash,
    };
    Ok(BoundExpr::new(kind, ty, span).with_flags(flags))
}
