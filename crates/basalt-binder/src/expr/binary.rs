//! Binary operators.
//!
//! An operator is tried in this order: reference comparison (`Is`,
//! `IsNot`), short-circuit logic, user-defined operators declared on
//! either operand type, late binding when an operand is `Object`, and
//! finally the predefined operator tables. Predefined operators on
//! constants fold.
//!
//! A run of `&` operators is bound as one list: constants next to each
//! other merge, and the rest becomes a single `String.Concat` call. A run
//! of `+` whose operands are all `String` is bound the same way.

use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind, RuntimeFeatures, Span, TypeHash};
use basalt_symbols::{MemberRef, SymbolTable, WellKnownType};
use basalt_syntax::{BinaryExpr, BinaryOp, Expr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundCall, BoundExpr, BoundFlags, BoundKind, OperatorMethod, Pending};
use crate::constant::{FoldError, fold_binary};
use crate::context::InterpretationContext;
use crate::operators::{OperatorTypes, binary_operator_types};
use crate::overload::{BoundArgument, Candidate, CallSite, Resolution, resolve_overloads};

use super::calls::bind_arguments;
use super::convert::{convert_implicit, convert_operand, report_fold_error};
use super::init_list::length_constant;
use super::reclassify::{reclassify, reclassify_natural};
use super::bind_deferred;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_binary<'ast>(
    b: &mut Binder<'_>,
    bin: &'ast BinaryExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    match bin.op {
        BinaryOp::Concatenate => return bind_concatenation(b, bin, ctx),
        BinaryOp::Add => return bind_addition(b, bin, ctx),
        _ => {}
    }
    let left = bind_deferred(b, bin.left, ctx)?;
    let right = bind_deferred(b, bin.right, ctx)?;
    let (left, right) = settle_operands(b, bin.op, left, right, ctx)?;
    bind_operator(b, bin.op, left, right, bin.span, ctx)
}

/// Give pending operands a type. `Nothing` takes the type of the other
/// operand, so `x = Nothing` compares against the default of `x`.
fn settle_operands<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<(BoundExpr<'ast>, BoundExpr<'ast>)> {
    let typed = |e: &BoundExpr<'_>| !e.is_unbound() && !e.is_bad() && e.is_value();
    if !op.is_reference_comparison() {
        if is_pending_nothing(&left) && typed(&right) {
            let target = right.ty.clone();
            return Ok((reclassify(b, left, &target, ctx)?, right));
        }
        if is_pending_nothing(&right) && typed(&left) {
            let target = left.ty.clone();
            return Ok((left, reclassify(b, right, &target, ctx)?));
        }
    }
    Ok((reclassify_natural(b, left, ctx)?, reclassify_natural(b, right, ctx)?))
}

fn is_pending_nothing(expr: &BoundExpr<'_>) -> bool {
    matches!(expr.kind, BoundKind::Unbound(Pending::Nothing))
}

/// Apply `op` to two bound operands.
pub(crate) fn bind_operator<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    if left.is_bad() || right.is_bad() {
        return Ok(binary_node(op, left, right, OperatorMethod::Intrinsic, DataType::Error, span));
    }
    match op {
        BinaryOp::Is | BinaryOp::IsNot => return Ok(bind_reference_comparison(b, op, left, right, span)),
        BinaryOp::AndAlso | BinaryOp::OrElse => return bind_short_circuit(b, op, left, right, span, ctx),
        _ => {}
    }

    let candidates = user_operator_candidates(b.table, op, &left.ty, &right.ty);
    if !candidates.is_empty() {
        return bind_user_operator(b, op, candidates, left, right, span, ctx);
    }
    if left.ty.is_object() || right.ty.is_object() {
        return bind_late_operator(b, op, left, right, span, ctx);
    }
    bind_intrinsic(b, op, left, right, span, ctx)
}

fn binary_node<'ast>(
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    method: OperatorMethod,
    ty: DataType,
    span: Span,
) -> BoundExpr<'ast> {
    BoundExpr::new(
        BoundKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            method,
        },
        ty,
        span,
    )
}

fn report_not_defined(b: &mut Binder<'_>, op: BinaryOp, left: &DataType, right: &DataType, span: Span) {
    let (left, right) = (b.display(left), b.display(right));
    b.error(
        DiagnosticCode::OperatorNotDefined,
        span,
        format!("Operator '{op}' is not defined for types '{left}' and '{right}'."),
    );
}

// ==========================================================================
// Predefined operators
// ==========================================================================

fn bind_intrinsic<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let Some(types) = binary_operator_types(table, op, &left.ty, &right.ty) else {
        report_not_defined(b, op, &left.ty, &right.ty, span);
        return Ok(binary_node(op, left, right, OperatorMethod::Intrinsic, DataType::Error, span).into_bad());
    };
    let left = convert_implicit(b, left, &types.left, ctx)?;
    let right = convert_implicit(b, right, &types.right, ctx)?;
    let method = if types.lifted { OperatorMethod::Lifted } else { OperatorMethod::Intrinsic };

    if !types.lifted
        && let (Some(l), Some(r)) = (left.constant_value(), right.constant_value())
        && let Some(kind) = fold_kind(table, op, &types)
    {
        match fold_binary(op, l, r, kind) {
            Ok(value) => return Ok(BoundExpr::constant(value, types.result, span)),
            Err(FoldError::NotConstant) => {}
            Err(error) => {
                report_fold_error(b, error, span);
                return Ok(binary_node(op, left, right, method, types.result, span).into_bad());
            }
        }
    }
    Ok(binary_node(op, left, right, method, types.result, span))
}

/// Kind a predefined operator folds in: the shared operand kind, or the
/// left kind for shifts, whose count is always `Integer`.
fn fold_kind(table: &SymbolTable, op: BinaryOp, types: &OperatorTypes) -> Option<PrimitiveKind> {
    let kind_of = |ty: &DataType| ty.as_primitive().or_else(|| table.enum_underlying(ty));
    let left = kind_of(&types.left)?;
    if op.is_shift() {
        return Some(left);
    }
    (kind_of(&types.right)? == left).then_some(left)
}

fn bind_short_circuit<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let lifted = left.ty.is_nullable() || right.ty.is_nullable();
    let target = if lifted {
        DataType::nullable(DataType::boolean())
    } else {
        DataType::boolean()
    };
    let left = convert_implicit(b, left, &target, ctx)?;
    let right = convert_implicit(b, right, &target, ctx)?;
    if !lifted
        && let (Some(l), Some(r)) = (left.constant_value(), right.constant_value())
        && let Ok(value) = fold_binary(op, l, r, PrimitiveKind::Boolean)
    {
        return Ok(BoundExpr::constant(value, target, span));
    }
    let method = if lifted { OperatorMethod::Lifted } else { OperatorMethod::Intrinsic };
    Ok(binary_node(op, left, right, method, target, span))
}

fn bind_reference_comparison<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
) -> BoundExpr<'ast> {
    let mut ok = true;
    for operand in [&left, &right] {
        if !accepts_reference_comparison(b.table, &operand.ty) {
            let shown = b.display(&operand.ty);
            b.error(
                DiagnosticCode::ReferenceOperandRequired,
                operand.span,
                format!("'{op}' operator does not accept operands of type '{shown}'. Operands must be reference or nullable types."),
            );
            ok = false;
        }
    }
    let node = binary_node(op, left, right, OperatorMethod::Intrinsic, DataType::boolean(), span);
    if ok { node } else { node.into_bad() }
}

fn accepts_reference_comparison(table: &SymbolTable, ty: &DataType) -> bool {
    ty.is_nullable() || matches!(ty, DataType::GenericParam { .. }) || table.is_reference_type(ty)
}

// ==========================================================================
// User-defined and late-bound operators
// ==========================================================================

/// Operators named for `op` on either operand type. Over nullable operands
/// each one is lifted: value-type parameters and result become nullable.
fn user_operator_candidates(table: &SymbolTable, op: BinaryOp, left: &DataType, right: &DataType) -> Vec<Candidate> {
    let Some(name) = op.operator_name() else {
        return Vec::new();
    };
    let lifted = left.is_nullable() || right.is_nullable();
    let mut seen: Vec<TypeHash> = Vec::new();
    let mut out = Vec::new();
    for ty in [left.strip_nullable(), right.strip_nullable()] {
        for procedure in table.user_operators(ty, name) {
            if seen.contains(&procedure.hash) {
                continue;
            }
            seen.push(procedure.hash);
            let mut candidate = Candidate::from_procedure(table, procedure, None, false);
            if lifted {
                lift_candidate(table, &mut candidate);
            }
            out.push(candidate);
        }
    }
    out
}

fn lift_candidate(table: &SymbolTable, candidate: &mut Candidate) {
    let lift = |ty: &DataType| {
        if table.is_value_type(ty) && !ty.is_nullable() {
            DataType::nullable(ty.clone())
        } else {
            ty.clone()
        }
    };
    for param in &mut candidate.params {
        param.ty = lift(&param.ty);
    }
    candidate.return_type = lift(&candidate.return_type);
}

fn bind_user_operator<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    candidates: Vec<Candidate>,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let lifted = left.ty.is_nullable() || right.ty.is_nullable();
    let (left_ty, right_ty) = (left.ty.clone(), right.ty.clone());
    let name = candidates[0].name.clone();
    let site = CallSite::new(
        &name,
        vec![BoundArgument::positional(left), BoundArgument::positional(right)],
        span,
    );
    let (resolution, diagnostics) = b.buffered(|b| resolve_overloads(b, candidates, &site, ctx));

    match resolution? {
        Resolution::Selected(selected) => {
            b.commit(diagnostics);
            let MemberRef::Procedure(procedure) = selected.candidate.member else {
                return Err(basalt_core::BindError::internal(format!("operator '{name}' is not a procedure"), span));
            };
            let (mut args, _) = bind_arguments(b, &selected, site.args, span, ctx)?;
            let (Some(right), Some(left)) = (args.pop(), args.pop()) else {
                return Err(basalt_core::BindError::internal(format!("operator '{name}' takes two operands"), span));
            };
            tracing::trace!(operator = %op, "user-defined operator selected");
            let method = OperatorMethod::UserDefined { procedure, lifted };
            Ok(binary_node(op, left, right, method, selected.return_type.clone(), span))
        }
        Resolution::LateBound => {
            b.commit(diagnostics);
            let mut args = site.args.into_iter().filter_map(|a| a.value);
            let (Some(left), Some(right)) = (args.next(), args.next()) else {
                return Ok(BoundExpr::bad(span));
            };
            bind_late_operator(b, op, left, right, span, ctx)
        }
        Resolution::Failed => {
            report_not_defined(b, op, &left_ty, &right_ty, span);
            Ok(BoundExpr::bad(span))
        }
    }
}

fn bind_late_operator<'ast>(
    b: &mut Binder<'_>,
    op: BinaryOp,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let allowed = b.report_late_binding(&format!("operator '{op}'"), span);
    let left = convert_implicit(b, left, &DataType::Object, ctx)?;
    let right = convert_implicit(b, right, &DataType::Object, ctx)?;
    let node = binary_node(op, left, right, OperatorMethod::Late, DataType::Object, span).with_flags(BoundFlags::LATE_BOUND);
    Ok(if allowed { node } else { node.into_bad() })
}

// ==========================================================================
// Concatenation
// ==========================================================================

/// Operands of a left-nested run of `op`, in source order, with the span of
/// each operator node from the innermost out.
fn chain_operands<'ast>(
    bin: &'ast BinaryExpr<'ast>,
    op: BinaryOp,
    operands: &mut Vec<&'ast Expr<'ast>>,
    spans: &mut Vec<Span>,
) {
    match bin.left {
        Expr::Binary(inner) if inner.op == op => chain_operands(inner, op, operands, spans),
        other => operands.push(other),
    }
    operands.push(bin.right);
    spans.push(bin.span);
}

fn bind_concatenation<'ast>(
    b: &mut Binder<'_>,
    bin: &'ast BinaryExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let mut syntax = Vec::new();
    let mut spans = Vec::new();
    chain_operands(bin, BinaryOp::Concatenate, &mut syntax, &mut spans);

    let string = DataType::string();
    let mut operands = Vec::with_capacity(syntax.len());
    for expr in syntax {
        let bound = bind_deferred(b, expr, ctx)?;
        let bound = if is_pending_nothing(&bound) {
            reclassify(b, bound, &string, ctx)?
        } else {
            reclassify_natural(b, bound, ctx)?
        };
        operands.push(bound);
    }
    if operands.iter().any(BoundExpr::is_bad) {
        return Ok(concat_call(b, operands, bin.span).into_bad());
    }

    let table = b.table;
    let simple = operands.iter().all(|o| {
        !o.ty.is_object()
            && table.user_operators(o.ty.strip_nullable(), "op_Concatenate").is_empty()
            && binary_operator_types(table, BinaryOp::Concatenate, &o.ty, &string).is_some()
    });
    if !simple {
        // Pairwise, left to right, so each step can pick its own operator.
        let mut operands = operands.into_iter();
        let Some(mut acc) = operands.next() else {
            return Ok(BoundExpr::bad(bin.span));
        };
        for (next, span) in operands.zip(spans) {
            acc = bind_operator(b, BinaryOp::Concatenate, acc, next, span, ctx)?;
        }
        return Ok(acc);
    }
    concat_pieces(b, operands, bin.span, ctx)
}

/// A left-nested run of `+`. Leading `String` operands are collected; if
/// every operand is a `String` the run concatenates, otherwise the operators
/// apply left to right as each operand is bound.
fn bind_addition<'ast>(
    b: &mut Binder<'_>,
    bin: &'ast BinaryExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let mut syntax = Vec::new();
    let mut spans = Vec::new();
    chain_operands(bin, BinaryOp::Add, &mut syntax, &mut spans);

    let mut run = Vec::with_capacity(syntax.len());
    let mut acc: Option<BoundExpr<'ast>> = None;
    for (index, expr) in syntax.into_iter().enumerate() {
        let operand = bind_deferred(b, expr, ctx)?;
        if acc.is_none() && is_plain_string(b.table, &operand) {
            run.push(operand);
            continue;
        }
        let left = match acc.take() {
            Some(left) => Some(left),
            None => add_pairwise(b, std::mem::take(&mut run), &spans, ctx)?,
        };
        acc = Some(match left {
            Some(left) => {
                let span = index.checked_sub(1).and_then(|i| spans.get(i)).copied().unwrap_or(bin.span);
                add(b, left, operand, span, ctx)?
            }
            None => operand,
        });
    }
    match acc {
        Some(acc) => Ok(acc),
        None => concat_pieces(b, run, bin.span, ctx),
    }
}

fn is_plain_string(table: &SymbolTable, operand: &BoundExpr<'_>) -> bool {
    !operand.is_unbound()
        && !operand.is_bad()
        && operand.is_value()
        && operand.ty == DataType::string()
        && table.user_operators(&operand.ty, "op_Addition").is_empty()
}

fn add<'ast>(
    b: &mut Binder<'_>,
    left: BoundExpr<'ast>,
    right: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let (left, right) = settle_operands(b, BinaryOp::Add, left, right, ctx)?;
    bind_operator(b, BinaryOp::Add, left, right, span, ctx)
}

fn add_pairwise<'ast>(
    b: &mut Binder<'_>,
    run: Vec<BoundExpr<'ast>>,
    spans: &[Span],
    ctx: &InterpretationContext,
) -> Result<Option<BoundExpr<'ast>>> {
    let mut run = run.into_iter();
    let Some(mut acc) = run.next() else {
        return Ok(None);
    };
    for (next, span) in run.zip(spans) {
        acc = add(b, acc, next, *span, ctx)?;
    }
    Ok(Some(acc))
}

/// Convert every operand to `String`, merge adjacent constants and build
/// the concat call. A lone constant is returned as the folded value.
fn concat_pieces<'ast>(
    b: &mut Binder<'_>,
    operands: Vec<BoundExpr<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let string = DataType::string();
    let mut pieces: Vec<BoundExpr<'ast>> = Vec::with_capacity(operands.len());
    let mut bad = false;
    for operand in operands {
        let operand = convert_operand(b, operand, &string, ctx)?;
        if operand.is_bad() {
            bad = true;
            pieces.push(operand);
            continue;
        }
        match (pieces.last_mut(), operand.constant_value()) {
            (Some(last), Some(value)) if last.is_constant() => {
                let mut text = last.constant_value().and_then(text_of).unwrap_or_default().to_string();
                text.push_str(text_of(value).unwrap_or_default());
                let span = last.span.merge(operand.span);
                *last = BoundExpr::constant(ConstantValue::string(text), DataType::string(), span);
            }
            _ => pieces.push(operand),
        }
    }
    if bad {
        return Ok(concat_call(b, pieces, span).into_bad());
    }

    if pieces.len() == 1 && pieces[0].is_constant() {
        let mut folded = pieces.remove(0);
        folded.span = span;
        return Ok(folded);
    }
    Ok(concat_call(b, pieces, span))
}

fn text_of(value: &ConstantValue) -> Option<&str> {
    match value {
        ConstantValue::Nothing => Some(""),
        other => other.as_str(),
    }
}

/// `String.Concat` over the pieces: a fixed-arity overload for up to four,
/// the `ParamArray` overload beyond that, and plain `&` nodes when the
/// runtime has neither.
fn concat_call<'ast>(b: &mut Binder<'_>, pieces: Vec<BoundExpr<'ast>>, span: Span) -> BoundExpr<'ast> {
    let table = b.table;
    let runtime = b.options.runtime;
    let count = pieces.len();

    if count <= 4
        && runtime.contains(RuntimeFeatures::STRING_CONCAT)
        && let Some(procedure) = concat_overload(table, Some(count))
    {
        return concat_node(procedure, pieces, span);
    }
    if runtime.contains(RuntimeFeatures::STRING_CONCAT_ARRAY)
        && let Some(procedure) = concat_overload(table, None)
    {
        let length = length_constant(b, count, span);
        let bad = length.is_bad();
        let array = BoundExpr::new(
            BoundKind::ArrayCreation {
                bounds: vec![length],
                elements: pieces,
            },
            DataType::array(DataType::string(), 1),
            span,
        );
        let node = concat_node(procedure, vec![array], span);
        return if bad { node.into_bad() } else { node };
    }

    tracing::debug!(pieces = count, "no String.Concat overload; keeping '&' operators");
    let mut pieces = pieces.into_iter();
    let Some(mut acc) = pieces.next() else {
        return BoundExpr::bad(span);
    };
    for next in pieces {
        let span = acc.span.merge(next.span);
        acc = binary_node(BinaryOp::Concatenate, acc, next, OperatorMethod::Intrinsic, DataType::string(), span);
    }
    acc
}

fn concat_overload(table: &SymbolTable, count: Option<usize>) -> Option<TypeHash> {
    let string = table.well_known(WellKnownType::String)?;
    table
        .declared_members(string, "Concat")
        .into_iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(hash) => table.get_procedure(hash),
            _ => None,
        })
        .find(|p| {
            let param_array = p.params.iter().any(|x| x.is_param_array);
            match count {
                Some(n) => !param_array && p.params.len() == n,
                None => param_array && p.params.len() == 1,
            }
        })
        .map(|p| p.hash)
}

fn concat_node<'ast>(procedure: TypeHash, args: Vec<BoundExpr<'ast>>, span: Span) -> BoundExpr<'ast> {
    let call = BoundCall {
        receiver: None,
        procedure,
        type_args: Vec::new(),
        args,
        copy_backs: Vec::new(),
        is_extension: false,
    };
    BoundExpr::new(BoundKind::Call(Box::new(call)), DataType::string(), span)
}
