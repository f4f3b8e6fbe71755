//! `New` expressions and array creation.
//!
//! Object creation resolves the type's constructors like any other call.
//! A few shapes skip the constructor entirely:
//!
//! - a value type with no arguments is zero-initialized in place
//! - an interface with a linked coclass constructs that class, or, for an
//!   embedded interop class, goes through `Activator` by class identifier
//! - a delegate type takes its single argument as the delegate target

use basalt_core::{BindError, ConstantValue, DataType, DiagnosticCode, RuntimeFeatures, Span, TypeHash};
use basalt_symbols::{MemberRef, WellKnownType};
use basalt_syntax::{ArrayCreationExpr, BinaryOp, Expr, FieldInitializer, NewExpr, ObjectInitializer};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, Pending};
use crate::context::InterpretationContext;
use crate::overload::{BoundArgument, CallSite, Candidate, Resolution, resolve_overloads};
use crate::type_resolver::resolve_type;

use super::assignment::assign;
use super::binary::bind_operator;
use super::calls::{bind_argument_list, bind_arguments, invoke_group};
use super::convert::{convert_implicit, convert_unchecked};
use super::init_list::{bind_array_literal, bind_collection_initializer, length_constant, shape_array};
use super::member::bind_member_of;
use super::reclassify::{nothing_of, reclassify_natural};
use super::{bind_converted, bind_deferred};

/// `New T(args)`, optionally followed by `With {...}` or `From {...}`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_new<'ast>(
    b: &mut Binder<'_>,
    new: &'ast NewExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = new.span;
    let ty = resolve_type(b, &new.ty, ctx);
    let args = bind_argument_list(b, new.args, ctx)?;
    if ty.is_error() {
        return Ok(BoundExpr::bad(span));
    }

    let creation = create(b, &ty, args, span, ctx)?;
    if creation.ty.is_error() {
        return Ok(creation);
    }
    match new.initializer {
        None => Ok(creation),
        Some(ObjectInitializer::With(members)) => bind_member_initializers(b, creation, members, span, ctx),
        Some(ObjectInitializer::From(literal)) => bind_collection_initializer(b, creation, literal, span, ctx),
    }
}

/// Construct `ty` from already bound arguments.
pub(crate) fn create<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;

    if matches!(ty, DataType::GenericParam { .. }) {
        if !args.is_empty() {
            return too_many_arguments(b, ty, args, span, ctx);
        }
        return Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span));
    }

    if table.is_delegate(ty) {
        return create_delegate(b, ty, args, span, ctx);
    }

    let Some(entry) = table.entry_of(ty) else {
        // Primitives without a registered runtime type.
        if args.is_empty() {
            return Ok(nothing_of(b, ty, span));
        }
        return too_many_arguments(b, ty, args, span, ctx);
    };

    if entry.is_interface() {
        if let Some(coclass) = entry.coclass {
            return create_through_coclass(b, ty, coclass, args, span, ctx);
        }
        return new_on_abstract(b, ty, args, span, ctx);
    }
    if entry.is_abstract() || entry.is_module() {
        return new_on_abstract(b, ty, args, span, ctx);
    }

    let constructors: Vec<Candidate> = table
        .declared_members(entry.hash, "New")
        .into_iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(h) => table.get_procedure(h),
            _ => None,
        })
        .filter(|p| !p.is_shared)
        .map(|p| Candidate::from_procedure(table, p, Some(ty), false))
        .collect();

    if args.is_empty() && (table.is_value_type(ty) || constructors.is_empty()) {
        if table.is_value_type(ty) {
            tracing::trace!(ty = %b.display(ty), "value type construction zero-initialized");
            return Ok(nothing_of(b, ty, span));
        }
        return Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span));
    }
    if constructors.is_empty() {
        return too_many_arguments(b, ty, args, span, ctx);
    }

    let site = CallSite::new("New", args, span);
    match resolve_overloads(b, constructors, &site, ctx)? {
        Resolution::Selected(selected) => {
            let MemberRef::Procedure(constructor) = selected.candidate.member else {
                return Err(BindError::internal("constructor is not a procedure", span));
            };
            let (args, copy_backs) = bind_arguments(b, &selected, site.args, span, ctx)?;
            Ok(object_creation(Some(constructor), args, copy_backs, ty.clone(), span))
        }
        Resolution::LateBound => {
            let shown = b.display(ty);
            b.error(
                DiagnosticCode::NoApplicableOverload,
                span,
                format!("Overload resolution failed because no 'New' of '{shown}' can be called without a narrowing conversion."),
            );
            Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span).into_bad())
        }
        Resolution::Failed => Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span).into_bad()),
    }
}

fn object_creation<'ast>(
    constructor: Option<TypeHash>,
    args: Vec<BoundExpr<'ast>>,
    copy_backs: Vec<BoundExpr<'ast>>,
    ty: DataType,
    span: Span,
) -> BoundExpr<'ast> {
    BoundExpr::new(
        BoundKind::ObjectCreation {
            constructor,
            args,
            copy_backs,
        },
        ty,
        span,
    )
}

/// Give the remaining pending arguments their natural types so their own
/// diagnostics are still reported.
fn discard_arguments<'ast>(
    b: &mut Binder<'_>,
    args: Vec<BoundArgument<'ast>>,
    ctx: &InterpretationContext,
) -> Result<()> {
    for value in args.into_iter().filter_map(|a| a.value) {
        if value.is_unbound() && !matches!(value.kind, BoundKind::Unbound(Pending::Nothing)) {
            reclassify_natural(b, value, ctx)?;
        }
    }
    Ok(())
}

fn too_many_arguments<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let shown = b.display(ty);
    let at = args.first().map_or(span, |a| a.span);
    b.error(
        DiagnosticCode::TooManyArguments,
        at,
        format!("Too many arguments to the constructor of '{shown}'."),
    );
    discard_arguments(b, args, ctx)?;
    Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span).into_bad())
}

fn new_on_abstract<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let shown = b.display(ty);
    b.error(
        DiagnosticCode::NewOnAbstractType,
        span,
        format!("'New' cannot be used on '{shown}' because it is an interface, a module or a 'MustInherit' class."),
    );
    discard_arguments(b, args, ctx)?;
    Ok(object_creation(None, Vec::new(), Vec::new(), ty.clone(), span).into_bad())
}

/// `New I()` for an interface linked to a concrete coclass.
fn create_through_coclass<'ast>(
    b: &mut Binder<'_>,
    interface: &DataType,
    coclass: TypeHash,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let class_ty = DataType::named(coclass);
    let embedded = table.get_type(coclass).and_then(|c| c.embedded_interop.then(|| c.guid.clone()).flatten());

    let Some(clsid) = embedded else {
        tracing::debug!(interface = %b.display(interface), coclass = %b.display(&class_ty), "constructing through coclass");
        let creation = create(b, &class_ty, args, span, ctx)?;
        if creation.is_bad() {
            return Ok(BoundExpr { ty: interface.clone(), ..creation });
        }
        return Ok(convert_unchecked(table, creation, interface));
    };

    if !args.is_empty() {
        return too_many_arguments(b, interface, args, span, ctx);
    }
    let available = b.options.runtime.contains(RuntimeFeatures::ACTIVATOR)
        && table.well_known(WellKnownType::Activator).is_some()
        && table.well_known(WellKnownType::Type).is_some();
    if !available {
        b.report_missing_runtime("Constructing an embedded interop type", span);
        return Ok(BoundExpr::bad(span));
    }
    tracing::debug!(%clsid, "embedded coclass constructed through Activator");
    Ok(BoundExpr::new(BoundKind::ActivatorCreate { clsid }, interface.clone(), span))
}

/// `New D(AddressOf M)` or `New D(lambda)`.
fn create_delegate<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let mut values = args.into_iter();
    match (values.next(), values.next()) {
        (Some(BoundArgument { name: None, value: Some(target), .. }), None) => {
            let created = convert_implicit(b, target, ty, ctx)?;
            Ok(BoundExpr { span, ..created })
        }
        (first, second) => {
            let shown = b.display(ty);
            b.error(
                DiagnosticCode::NotDelegateType,
                span,
                format!("Delegate '{shown}' requires an 'AddressOf' expression or lambda expression as the only argument to its constructor."),
            );
            let rest: Vec<BoundArgument<'ast>> = first.into_iter().chain(second).chain(values).collect();
            discard_arguments(b, rest, ctx)?;
            Ok(BoundExpr::bad(span))
        }
    }
}

// ============================================================================
// Initializers
// ============================================================================

/// `New T With {.A = x, .B = y}`: the object lands in a temporary and each
/// member is assigned through it.
fn bind_member_initializers<'ast>(
    b: &mut Binder<'_>,
    creation: BoundExpr<'ast>,
    members: &'ast [FieldInitializer<'ast>],
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let ty = creation.ty.clone();
    let temp = b.new_temp();
    let mut assignments = Vec::with_capacity(members.len());

    for init in members {
        let name_span = init.name.span;
        let receiver = BoundExpr::new(BoundKind::Temporary(temp), ty.clone(), name_span).with_flags(BoundFlags::LVALUE);
        let member = bind_member_of(b, receiver, init.name.name, Vec::new(), false, name_span, ctx)?;
        let target = match member.kind {
            BoundKind::MemberGroup(group) => invoke_group(b, *group, Vec::new(), false, name_span, ctx)?,
            kind => BoundExpr { kind, ..member },
        };
        if target.is_bad() {
            let value = bind_deferred(b, init.value, ctx)?;
            let value = reclassify_natural(b, value, ctx)?;
            assignments.push(assign(b, target, value, init.span));
            continue;
        }
        let target_ty = target.ty.clone();
        let value = bind_converted(b, init.value, &target_ty, ctx)?;
        assignments.push(assign(b, target, value, init.span));
    }

    Ok(BoundExpr::new(
        BoundKind::ObjectInitializer {
            creation: Box::new(creation),
            temp,
            members: assignments,
        },
        ty,
        span,
    ))
}

// ============================================================================
// Arrays
// ============================================================================

/// `New T(bounds) {elements}`.
///
/// Each written bound is an upper bound, so the dimension's length is one
/// more. With an initializer every bound must be a constant that matches
/// the initializer's shape.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_array_creation<'ast>(
    b: &mut Binder<'_>,
    creation: &'ast ArrayCreationExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = creation.span;
    let element = resolve_type(b, &creation.element, ctx);
    let rank = creation.rank.max(1);

    let mut sizes = Vec::with_capacity(creation.bounds.len());
    for upper in creation.bounds {
        sizes.push(bind_size(b, upper, ctx)?);
    }
    if element.is_error() {
        return Ok(BoundExpr::bad(span));
    }
    let ty = DataType::array(element.clone(), rank);

    let literal = creation.initializer;
    if literal.elements.is_empty() && !sizes.is_empty() {
        return Ok(BoundExpr::new(
            BoundKind::ArrayCreation {
                bounds: sizes,
                elements: Vec::new(),
            },
            ty,
            span,
        ));
    }

    let pending = bind_array_literal(b, literal, ctx)?;
    let BoundKind::Unbound(Pending::ArrayLiteral(pending)) = pending.kind else {
        return Err(BindError::internal("array initializer did not bind as a literal", span));
    };
    let shape = shape_array(b, *pending, &element, rank, ctx)?;
    let mut ok = shape.ok;

    let bounds = if sizes.is_empty() {
        let bounds: Vec<BoundExpr<'ast>> = shape.lengths.iter().map(|&len| length_constant(b, len, span)).collect();
        ok &= !bounds.iter().any(BoundExpr::is_bad);
        bounds
    } else {
        for (size, &length) in sizes.iter().zip(&shape.lengths) {
            if size.is_bad() {
                ok = false;
                continue;
            }
            match size.constant_value().and_then(ConstantValue::as_integral) {
                Some(declared) if declared == length as i128 => {}
                Some(declared) => {
                    let message = if declared > length as i128 {
                        format!("Array initializer is missing {} element(s).", declared - length as i128)
                    } else {
                        format!("Array initializer has {} too many element(s).", length as i128 - declared)
                    };
                    b.error(DiagnosticCode::ArrayInitializerLengthMismatch, literal.span, message);
                    ok = false;
                }
                None => {
                    b.error(
                        DiagnosticCode::RequiresConstant,
                        size.span,
                        "Array initializer cannot be specified for a non-constant dimension; use the empty initializer '{}'.",
                    );
                    ok = false;
                }
            }
        }
        sizes
    };

    let node = BoundExpr::new(
        BoundKind::ArrayCreation {
            bounds,
            elements: shape.elements,
        },
        ty,
        span,
    );
    Ok(if ok { node } else { node.into_bad() })
}

/// The length of a dimension written as its upper bound.
fn bind_size<'ast>(b: &mut Binder<'_>, upper: &'ast Expr<'ast>, ctx: &InterpretationContext) -> Result<BoundExpr<'ast>> {
    let upper = bind_converted(b, upper, &DataType::integer(), ctx)?;
    if upper.is_bad() {
        return Ok(upper);
    }
    let span = upper.span;
    let one = BoundExpr::constant(ConstantValue::integer(1), DataType::integer(), span);
    bind_operator(b, BinaryOp::Add, upper, one, span, ctx)
}

#[cfg(test)]
mod tests {
    use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind};
    use basalt_symbols::{ParamEntry, ProcedureEntry, PropertyEntry, TypeEntry, WellKnownType};
    use basalt_syntax::AstBuilder;
    use bumpalo::Bump;

    use crate::bound::BoundKind;
    use crate::testing::{Fixture, codes};

    #[test]
    fn class_without_constructors() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("Widget"), &[]));
        let mut f = Fixture::new();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::named(widget));
        assert!(matches!(bound.kind, BoundKind::ObjectCreation { constructor: None, .. }));
    }

    #[test]
    fn constructor_overload_is_selected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("Widget"), &[ast.string("name")]));
        let mut f = Fixture::strict();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        f.table
            .register_procedure(ProcedureEntry::constructor(widget, vec![ParamEntry::new("size", DataType::integer())]))
            .unwrap();
        let by_name = f
            .table
            .register_procedure(ProcedureEntry::constructor(widget, vec![ParamEntry::new("name", DataType::string())]))
            .unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        let BoundKind::ObjectCreation { constructor, args, .. } = &bound.kind else {
            panic!("expected an object creation");
        };
        assert_eq!(*constructor, Some(by_name));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn arguments_to_a_parameterless_class() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("Widget"), &[ast.int(1)]));
        let mut f = Fixture::new();
        f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::TooManyArguments]);
    }

    #[test]
    fn structure_without_arguments_is_zero_initialized() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("Point"), &[]));
        let mut f = Fixture::new();
        let point = f.table.register_type(TypeEntry::structure("Point")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.kind, BoundKind::ZeroInit);
        assert_eq!(bound.ty, DataType::named(point));
    }

    #[test]
    fn abstract_class_cannot_be_created() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("Shape"), &[]));
        let mut f = Fixture::new();
        f.table.register_type(TypeEntry::abstract_class("Shape")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NewOnAbstractType]);
    }

    #[test]
    fn interface_with_coclass_constructs_the_class() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("IApplication"), &[]));
        let mut f = Fixture::new();
        let class = f.table.register_type(TypeEntry::class("ApplicationClass")).unwrap();
        let iface = f
            .table
            .register_type(TypeEntry::interface("IApplication").with_coclass(class))
            .unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::named(iface));
        let BoundKind::Conversion { operand, .. } = &bound.kind else {
            panic!("expected a conversion to the interface");
        };
        assert_eq!(operand.ty, DataType::named(class));
        assert!(matches!(operand.kind, BoundKind::ObjectCreation { .. }));
    }

    #[test]
    fn embedded_coclass_uses_activator() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_object(ast.ty_named("IApplication"), &[]));
        let mut f = Fixture::new();
        let class = f
            .table
            .register_type(TypeEntry::class("ApplicationClass").embedded("00024500-0000-0000-C000-000000000046"))
            .unwrap();
        f.table
            .register_type(TypeEntry::interface("IApplication").with_coclass(class))
            .unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(
            bound.kind,
            BoundKind::ActivatorCreate {
                clsid: "00024500-0000-0000-C000-000000000046".to_string()
            }
        );
    }

    #[test]
    fn member_initializers_assign_through_a_temporary() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_with_members(ast.ty_named("Widget"), &[("Name", ast.string("gear"))]));
        let mut f = Fixture::strict();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        f.table
            .register_property(PropertyEntry::read_write(widget, "Name", DataType::string()))
            .unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        let BoundKind::ObjectInitializer { members, temp, .. } = &bound.kind else {
            panic!("expected an object initializer");
        };
        assert_eq!(members.len(), 1);
        let BoundKind::Assignment { target, .. } = &members[0].kind else {
            panic!("expected an assignment");
        };
        let BoundKind::Property { receiver: Some(receiver), .. } = &target.kind else {
            panic!("expected a property target");
        };
        assert_eq!(receiver.kind, BoundKind::Temporary(*temp));
    }

    #[test]
    fn read_only_member_initializer() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_with_members(ast.ty_named("Widget"), &[("Id", ast.int(3))]));
        let mut f = Fixture::new();
        let widget = f.table.register_type(TypeEntry::class("Widget")).unwrap();
        f.table
            .register_property(PropertyEntry::read_only(widget, "Id", DataType::integer()))
            .unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ReadOnlyTarget]);
    }

    #[test]
    fn collection_initializer_calls_add_per_element() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let list = ast.ty_generic("System.Collections.Generic.List", &[ast.ty_primitive(PrimitiveKind::Integer)]);
        let expr = ast.alloc(ast.new_from(list, &[ast.int(1), ast.int(2)]));
        let mut f = Fixture::strict();
        let list_hash = f.table.well_known(WellKnownType::GenericList).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::generic(list_hash, vec![DataType::integer()]));
        let BoundKind::CollectionInitializer { adds, .. } = &bound.kind else {
            panic!("expected a collection initializer");
        };
        assert_eq!(adds.len(), 2);
        assert!(adds.iter().all(|add| matches!(add.kind, BoundKind::Call(_))));
    }

    #[test]
    fn collection_initializer_needs_an_add_method() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.new_from(ast.ty_named("Widget"), &[ast.int(1), ast.name("missing")]));
        let mut f = Fixture::new();
        f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NotACollection]);
    }

    #[test]
    fn collection_add_arity_lists_parameter_names() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let list = ast.ty_generic("System.Collections.Generic.List", &[ast.ty_primitive(PrimitiveKind::Integer)]);
        let expr = ast.alloc(ast.new_from(list, &[ast.array_literal(&[ast.int(1), ast.int(2)])]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::CollectionAddArity]);
        assert!(sink.diagnostics()[0].message.contains("'Add(item)'"));
    }

    #[test]
    fn array_creation_with_matching_bound() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_creation(
            ast.ty_primitive(PrimitiveKind::Integer),
            &[ast.int(2)],
            1,
            &[ast.int(1), ast.int(2), ast.int(3)],
        ));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::array(DataType::integer(), 1));
        let BoundKind::ArrayCreation { bounds, elements } = &bound.kind else {
            panic!("expected an array creation");
        };
        assert_eq!(bounds[0].constant_value(), Some(&ConstantValue::integer(3)));
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn array_creation_length_mismatch() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_creation(
            ast.ty_primitive(PrimitiveKind::Integer),
            &[ast.int(1)],
            1,
            &[ast.int(1), ast.int(2), ast.int(3)],
        ));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ArrayInitializerLengthMismatch]);
    }

    #[test]
    fn array_creation_without_initializer_uses_bound_plus_one() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_creation(ast.ty_primitive(PrimitiveKind::Integer), &[ast.name("n")], 1, &[]));
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        let BoundKind::ArrayCreation { bounds, elements } = &bound.kind else {
            panic!("expected an array creation");
        };
        assert!(elements.is_empty());
        assert!(matches!(bounds[0].kind, BoundKind::Binary { .. }));
    }

    #[test]
    fn array_creation_takes_lengths_from_initializer() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_creation(
            ast.ty_primitive(PrimitiveKind::Long),
            &[],
            2,
            &[
                ast.array_literal(&[ast.int(1), ast.int(2), ast.int(3)]),
                ast.array_literal(&[ast.int(4), ast.int(5), ast.int(6)]),
            ],
        ));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::array(DataType::long(), 2));
        let BoundKind::ArrayCreation { bounds, elements } = &bound.kind else {
            panic!("expected an array creation");
        };
        let lengths: Vec<_> = bounds.iter().filter_map(|b| b.constant_value().cloned()).collect();
        assert_eq!(lengths, vec![ConstantValue::integer(2), ConstantValue::integer(3)]);
        assert_eq!(elements.len(), 6);
    }
}
