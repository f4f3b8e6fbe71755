//! Brace initializers: array literals and `From {...}` collection
//! initializers.
//!
//! An array literal is bound with its elements deferred and stays pending
//! until a target type is known. With a target array type the elements are
//! laid out to the target's rank and converted to its element type; without
//! one, the element type is the dominant type of the leaf elements and the
//! rank is the literal's own nesting depth.

use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind, Severity, Span};
use basalt_symbols::{MemberRef, ProcedureEntry};
use basalt_syntax::{ArrayLiteralExpr, Expr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, Pending, PendingArray};
use crate::context::InterpretationContext;
use crate::constant::FoldError;
use crate::conversion::classify;
use crate::dominant::{DominantType, dominant_type};
use crate::overload::BoundArgument;

use super::bind_deferred;
use super::calls::invoke_group;
use super::convert::{convert_implicit, report_fold_error};
use super::member::bind_member_of;

/// Bind `{a, b, ...}` as a pending node.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_array_literal<'ast>(
    b: &mut Binder<'_>,
    literal: &'ast ArrayLiteralExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let mut elements = Vec::with_capacity(literal.elements.len());
    for element in literal.elements {
        elements.push(bind_deferred(b, element, ctx)?);
    }
    let rank = literal_rank(&elements);
    let pending = PendingArray { literal, elements, rank };
    Ok(BoundExpr::pending(Pending::ArrayLiteral(Box::new(pending)), literal.span))
}

/// One more than the smallest rank among nested literals, or 1 when any
/// element is not a literal.
fn literal_rank(elements: &[BoundExpr<'_>]) -> u32 {
    let nested: Option<Vec<u32>> = elements
        .iter()
        .map(|e| match &e.kind {
            BoundKind::Unbound(Pending::ArrayLiteral(inner)) => Some(inner.rank),
            _ => None,
        })
        .collect();
    match nested {
        Some(ranks) => 1 + ranks.into_iter().min().unwrap_or(0),
        None => 1,
    }
}

fn leaves<'a, 'ast>(elements: &'a [BoundExpr<'ast>], rank: u32, out: &mut Vec<&'a BoundExpr<'ast>>) {
    for element in elements {
        match &element.kind {
            BoundKind::Unbound(Pending::ArrayLiteral(inner)) if rank > 1 => leaves(&inner.elements, rank - 1, out),
            _ => out.push(element),
        }
    }
}

/// What the leaves of a literal say about its element type.
enum ElementType {
    Inferred(DataType),
    /// The leaves only meet at `Object`, or every leaf is `Nothing`.
    ObjectAssumed,
    /// The literal has no leaves at all.
    Empty,
    /// Every leaf is a lambda, `AddressOf` or an empty nested literal.
    Untyped,
    /// Every typed leaf is already in error.
    Bad,
}

fn element_type(b: &mut Binder<'_>, array: &PendingArray<'_>, ctx: &InterpretationContext) -> ElementType {
    let mut found = Vec::new();
    leaves(&array.elements, array.rank, &mut found);
    if found.is_empty() {
        return ElementType::Empty;
    }

    let mut types = Vec::with_capacity(found.len());
    let mut nothing_only = true;
    let mut any_bad = false;
    for leaf in &found {
        match &leaf.kind {
            BoundKind::Unbound(Pending::Nothing) => continue,
            BoundKind::Unbound(Pending::ArrayLiteral(inner)) => {
                if let Some(ty) = natural_array_type(b, inner, ctx) {
                    types.push(ty);
                }
            }
            BoundKind::Unbound(_) => {}
            _ if leaf.is_bad() => any_bad = true,
            _ => types.push(leaf.ty.clone()),
        }
        nothing_only = false;
    }

    match dominant_type(b.table, &types) {
        DominantType::Unique(ty) => ElementType::Inferred(ty),
        DominantType::ObjectAssumed => ElementType::ObjectAssumed,
        DominantType::Empty if nothing_only => ElementType::ObjectAssumed,
        DominantType::Empty if any_bad => ElementType::Bad,
        DominantType::Empty => ElementType::Untyped,
    }
}

/// The type an array literal would have on its own, without reporting
/// anything. `None` for literals that contribute no type.
pub(crate) fn natural_array_type(
    b: &mut Binder<'_>,
    array: &PendingArray<'_>,
    ctx: &InterpretationContext,
) -> Option<DataType> {
    match element_type(b, array, ctx) {
        ElementType::Inferred(ty) => Some(DataType::array(ty, array.rank)),
        ElementType::ObjectAssumed => Some(DataType::array(DataType::Object, array.rank)),
        ElementType::Empty | ElementType::Untyped | ElementType::Bad => None,
    }
}

/// Bind an array literal with no target type.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn infer_array_literal<'ast>(
    b: &mut Binder<'_>,
    array: PendingArray<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = array.literal.span;
    let rank = array.rank;
    let (element, accepted) = match element_type(b, &array, ctx) {
        ElementType::Inferred(ty) => (ty, true),
        ElementType::ObjectAssumed => {
            let severity = b.options.narrowing_severity();
            let message = if severity == Severity::Error {
                "Cannot infer an element type, and Option Strict On does not allow 'Object' to be assumed."
            } else {
                "Cannot infer an element type; 'Object' assumed."
            };
            b.report(DiagnosticCode::ObjectAssumedForArray, severity, span, message);
            (DataType::Object, severity != Severity::Error)
        }
        ElementType::Empty => {
            let severity = b.options.narrowing_severity();
            let message = if severity == Severity::Error {
                "Cannot infer an element type for an empty array literal, and Option Strict On does not allow 'Object' to be assumed."
            } else {
                "Cannot infer an element type for an empty array literal; 'Object' assumed."
            };
            b.report(DiagnosticCode::EmptyArrayLiteral, severity, span, message);
            (DataType::Object, severity != Severity::Error)
        }
        ElementType::Untyped => {
            b.error(
                DiagnosticCode::NoDominantType,
                span,
                "Cannot infer an element type because none of the elements has a type.",
            );
            return Ok(BoundExpr::bad(span));
        }
        ElementType::Bad => return Ok(BoundExpr::bad(span)),
    };

    tracing::trace!(element = %b.display(&element), rank, "inferred array literal type");
    let node = build_array(b, array, &element, rank, ctx)?;
    Ok(if accepted { node } else { node.into_bad() })
}

/// Bind an array literal against `target`.
pub(crate) fn convert_array_literal<'ast>(
    b: &mut Binder<'_>,
    array: PendingArray<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if let Some((element, rank)) = target.array_parts() {
        let element = element.clone();
        return build_array(b, array, &element, rank, ctx);
    }
    if array.rank == 1
        && let Some(element) = enumerable_element(b, target)
    {
        let node = build_array(b, array, &element, 1, ctx)?;
        return convert_implicit(b, node, target, ctx);
    }
    let natural = infer_array_literal(b, array, ctx)?;
    convert_implicit(b, natural, target, ctx)
}

/// `T` when `target` is a one-argument interface that `T()` widens to,
/// such as `IEnumerable(Of T)`.
fn enumerable_element(b: &Binder<'_>, target: &DataType) -> Option<DataType> {
    let table = b.table;
    let [element] = target.type_args() else {
        return None;
    };
    if !table.is_interface(target) {
        return None;
    }
    classify(table, &DataType::array(element.clone(), 1), target)
        .is_widening()
        .then(|| element.clone())
}

/// A literal laid out to a fixed rank.
pub(crate) struct ArrayShape<'ast> {
    /// Length of each dimension.
    pub lengths: Vec<usize>,
    /// Leaf elements in row-major order, converted to the element type.
    pub elements: Vec<BoundExpr<'ast>>,
    pub ok: bool,
}

/// Lay out `array` as an array of `rank` dimensions of `element`.
pub(crate) fn shape_array<'ast>(
    b: &mut Binder<'_>,
    array: PendingArray<'ast>,
    element: &DataType,
    rank: u32,
    ctx: &InterpretationContext,
) -> Result<ArrayShape<'ast>> {
    let mut lengths: Vec<Option<usize>> = vec![None; rank.max(1) as usize];
    let mut found = Vec::new();
    let ok = layout(b, array.elements, array.literal.span, 0, &mut lengths, &mut found);

    let mut elements = Vec::with_capacity(found.len());
    for leaf in found {
        elements.push(convert_implicit(b, leaf, element, ctx)?);
    }
    Ok(ArrayShape {
        lengths: lengths.into_iter().map(|l| l.unwrap_or(0)).collect(),
        elements,
        ok,
    })
}

fn layout<'ast>(
    b: &mut Binder<'_>,
    elements: Vec<BoundExpr<'ast>>,
    span: Span,
    depth: usize,
    lengths: &mut [Option<usize>],
    out: &mut Vec<BoundExpr<'ast>>,
) -> bool {
    let innermost = depth + 1 == lengths.len();
    let Some(slot) = lengths.get_mut(depth) else {
        return false;
    };
    let mut ok = true;
    match *slot {
        None => *slot = Some(elements.len()),
        Some(expected) if expected > elements.len() => {
            let missing = expected - elements.len();
            b.error(
                DiagnosticCode::ArrayInitializerLengthMismatch,
                span,
                format!("Array initializer is missing {missing} element(s)."),
            );
            ok = false;
        }
        Some(expected) if expected < elements.len() => {
            let extra = elements.len() - expected;
            b.error(
                DiagnosticCode::ArrayInitializerLengthMismatch,
                span,
                format!("Array initializer has {extra} too many element(s)."),
            );
            ok = false;
        }
        Some(_) => {}
    }

    if innermost {
        out.extend(elements);
        return ok;
    }
    for element in elements {
        match element.kind {
            BoundKind::Unbound(Pending::ArrayLiteral(inner)) => {
                let inner = *inner;
                ok &= layout(b, inner.elements, inner.literal.span, depth + 1, lengths, out);
            }
            _ => {
                b.error(
                    DiagnosticCode::ArrayRankMismatch,
                    element.span,
                    "Array initializer has too few dimensions.",
                );
                ok = false;
            }
        }
    }
    ok
}

fn build_array<'ast>(
    b: &mut Binder<'_>,
    array: PendingArray<'ast>,
    element: &DataType,
    rank: u32,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = array.literal.span;
    if element.is_error() {
        return Ok(BoundExpr::bad(span));
    }
    let shape = shape_array(b, array, element, rank, ctx)?;
    let bounds: Vec<BoundExpr<'ast>> = shape
        .lengths
        .iter()
        .map(|&len| length_constant(b, len, span))
        .collect();
    let ok = shape.ok && !bounds.iter().any(BoundExpr::is_bad);
    let node = BoundExpr::new(
        BoundKind::ArrayCreation {
            bounds,
            elements: shape.elements,
        },
        DataType::array(element.clone(), rank),
        span,
    );
    Ok(if ok { node } else { node.into_bad() })
}

/// An `Integer` length bound. A length past `Integer.MaxValue` is reported
/// and binds bad.
pub(crate) fn length_constant<'ast>(b: &mut Binder<'_>, len: usize, span: Span) -> BoundExpr<'ast> {
    match i32::try_from(len) {
        Ok(value) => BoundExpr::constant(ConstantValue::integer(value), DataType::integer(), span),
        Err(_) => {
            report_fold_error(b, FoldError::overflow(PrimitiveKind::Integer), span);
            BoundExpr::bad(span)
        }
    }
}

// ============================================================================
// Collection initializers
// ============================================================================

/// `New T From {a, {b, c}}`: one `Add` call per top-level element, with a
/// nested brace group supplying several arguments.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_collection_initializer<'ast>(
    b: &mut Binder<'_>,
    creation: BoundExpr<'ast>,
    literal: &'ast ArrayLiteralExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let ty = creation.ty.clone();
    let temp = b.new_temp();
    let receiver = |span| BoundExpr::new(BoundKind::Temporary(temp), ty.clone(), span).with_flags(BoundFlags::LVALUE);

    let (add, diagnostics) = b.buffered(|b| bind_member_of(b, receiver(literal.span), "Add", Vec::new(), false, literal.span, ctx));
    let group = match add?.kind {
        BoundKind::MemberGroup(group) if has_procedures(&group.members, &group.extensions) => {
            b.commit(diagnostics);
            *group
        }
        _ => {
            let shown = b.display(&ty);
            b.error(
                DiagnosticCode::NotACollection,
                literal.span,
                format!("Cannot initialize '{shown}' with a collection initializer because it has no accessible 'Add' method."),
            );
            return Ok(collection_node(creation, temp, Vec::new(), ty.clone(), span).into_bad());
        }
    };

    let table = b.table;
    let procedures: Vec<&ProcedureEntry> = group
        .members
        .iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(h) => table.get_procedure(*h),
            _ => None,
        })
        .chain(group.extensions.iter().filter_map(|h| table.get_procedure(*h)))
        .collect();

    let mut adds = Vec::with_capacity(literal.elements.len());
    for element in literal.elements {
        let (arg_syntax, element_span): (&'ast [Expr<'ast>], Span) = match element {
            Expr::ArrayLiteral(nested) => (nested.elements, nested.span),
            single => (std::slice::from_ref(single), single.span()),
        };

        let count = arg_syntax.len();
        if !procedures.iter().any(|p| accepts(p, count)) {
            let shown = b.display(&ty);
            let signatures = procedures
                .iter()
                .map(|p| {
                    let names: Vec<&str> = p.call_params().iter().map(|param| param.name.as_str()).collect();
                    format!("'Add({})'", names.join(", "))
                })
                .collect::<Vec<_>>()
                .join(", ");
            b.error(
                DiagnosticCode::CollectionAddArity,
                element_span,
                format!("No 'Add' method of '{shown}' accepts {count} argument(s); candidates are {signatures}."),
            );
            adds.push(BoundExpr::bad(element_span));
            continue;
        }

        let mut args = Vec::with_capacity(count);
        for arg in arg_syntax {
            args.push(BoundArgument::positional(bind_deferred(b, arg, ctx)?));
        }
        let mut call_group = group.clone();
        call_group.receiver = Some(receiver(element_span));
        adds.push(invoke_group(b, call_group, args, true, element_span, ctx)?);
    }

    Ok(collection_node(creation, temp, adds, ty, span))
}

fn has_procedures(members: &[MemberRef], extensions: &[basalt_core::TypeHash]) -> bool {
    !extensions.is_empty() || members.iter().any(|m| matches!(m, MemberRef::Procedure(_)))
}

fn accepts(procedure: &ProcedureEntry, count: usize) -> bool {
    count >= procedure.required_count() && (count <= procedure.call_params().len() || procedure.has_param_array())
}

fn collection_node<'ast>(
    creation: BoundExpr<'ast>,
    temp: u32,
    adds: Vec<BoundExpr<'ast>>,
    ty: DataType,
    span: Span,
) -> BoundExpr<'ast> {
    BoundExpr::new(
        BoundKind::CollectionInitializer {
            creation: Box::new(creation),
            temp,
            adds,
        },
        ty,
        span,
    )
}

#[cfg(test)]
mod tests {
    use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind, Severity};
    use basalt_symbols::WellKnownType;
    use basalt_syntax::AstBuilder;
    use bumpalo::Bump;

    use crate::bound::BoundKind;
    use crate::testing::{Fixture, codes};

    #[test]
    fn length_beyond_integer_range_is_reported() {
        let mut f = Fixture::new();
        let span = basalt_core::Span::new(3, 1, 4);
        let ((fits, too_long), sink) = f.run(|b, _| {
            (
                super::length_constant(b, 7, span),
                super::length_constant(b, i32::MAX as usize + 1, span),
            )
        });
        assert_eq!(fits.constant_value(), Some(&ConstantValue::integer(7)));
        assert!(too_long.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::Overflow]);
    }

    fn bounds_of(kind: &BoundKind<'_>) -> Vec<ConstantValue> {
        let BoundKind::ArrayCreation { bounds, .. } = kind else {
            panic!("expected an array creation, got {kind:?}");
        };
        bounds.iter().filter_map(|b| b.constant_value().cloned()).collect()
    }

    #[test]
    fn integer_elements_infer_integer_array() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.int(2)]));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::array(DataType::integer(), 1));
        assert_eq!(bounds_of(&bound.kind), vec![ConstantValue::integer(2)]);
    }

    #[test]
    fn mixed_elements_assume_object() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.string("x")]));

        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert_eq!(bound.ty, DataType::array(DataType::Object, 1));
        assert!(!bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ObjectAssumedForArray]);
        assert_eq!(sink.diagnostics()[0].severity, Severity::Warning);

        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ObjectAssumedForArray]);
        assert_eq!(sink.diagnostics()[0].severity, Severity::Error);
    }

    #[test]
    fn empty_literal_is_object_array() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert_eq!(bound.ty, DataType::array(DataType::Object, 1));
        assert_eq!(codes(&sink), vec![DiagnosticCode::EmptyArrayLiteral]);
        assert_eq!(sink.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn nested_literals_make_a_rank_two_array() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[
            ast.array_literal(&[ast.int(1), ast.int(2)]),
            ast.array_literal(&[ast.int(3), ast.int(4)]),
        ]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::array(DataType::integer(), 2));
        let BoundKind::ArrayCreation { elements, .. } = &bound.kind else {
            panic!("expected an array creation");
        };
        let values: Vec<_> = elements.iter().filter_map(|e| e.constant_value().cloned()).collect();
        assert_eq!(values, (1..=4).map(ConstantValue::integer).collect::<Vec<_>>());
        assert_eq!(bounds_of(&bound.kind), vec![ConstantValue::integer(2), ConstantValue::integer(2)]);
    }

    #[test]
    fn target_element_type_converts_each_element() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.int(2)]));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind_to(expr, &DataType::array(DataType::long(), 1));
        assert!(sink.is_empty());
        let BoundKind::ArrayCreation { elements, .. } = &bound.kind else {
            panic!("expected an array creation");
        };
        assert!(elements.iter().all(|e| e.ty == DataType::long()));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[
            ast.array_literal(&[ast.int(1), ast.int(2)]),
            ast.array_literal(&[ast.int(3)]),
        ]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind_to(expr, &DataType::array(DataType::integer(), 2));
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::ArrayInitializerLengthMismatch]);
    }

    #[test]
    fn too_few_dimensions() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.int(2)]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind_to(expr, &DataType::array(DataType::integer(), 2));
        assert!(bound.is_bad());
        assert_eq!(
            codes(&sink),
            vec![DiagnosticCode::ArrayRankMismatch, DiagnosticCode::ArrayRankMismatch]
        );
    }

    #[test]
    fn lambdas_alone_have_no_dominant_type() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.lambda(&[], ast.int(1))]));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NoDominantType]);
    }

    #[test]
    fn nothing_elements_take_the_dominant_type() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.nothing(), ast.string("a")]));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, DataType::array(DataType::string(), 1));
    }

    #[test]
    fn literal_converts_to_enumerable() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.int(2)]));
        let mut f = Fixture::strict();
        let enumerable = f.table.well_known(WellKnownType::GenericEnumerable).unwrap();
        let target = DataType::generic(enumerable, vec![DataType::long()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, target);
        let BoundKind::Conversion { operand, .. } = &bound.kind else {
            panic!("expected a conversion");
        };
        assert_eq!(operand.ty, DataType::array(DataType::primitive(PrimitiveKind::Long), 1));
    }
}
