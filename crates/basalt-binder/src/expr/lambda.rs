//! Lambdas, `AddressOf` and delegate creation.
//!
//! A lambda is bound once its delegate type is known. Its parameters take
//! the delegate's parameter types unless written with an `As` clause, and
//! the body is converted to the delegate's return type (or to `T` of the
//! `Task(Of T)` an async lambda returns). Omitting every parameter is
//! allowed against a delegate that has some.

use basalt_core::{DataType, DiagnosticCode, Span};
use basalt_symbols::{DelegateSignature, MemberRef};
use basalt_syntax::{AddressOfExpr, LambdaExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind, BoundLambda, LambdaParameter, MemberGroup, Pending};
use crate::context::InterpretationContext;
use crate::conversion::classify;
use crate::flags::ExpressionFlags;
use crate::overload::{BoundArgument, CallSite, Candidate, Resolution, Selected, resolve_overloads};
use crate::type_resolver::resolve_type;

use super::convert::convert_implicit;
use super::reclassify::reclassify_natural;
use super::{bind_converted, bind_expr};

/// Parameter types written on `lambda`, `None` where the `As` clause is
/// missing. Type errors are left for the real bind.
pub(crate) fn explicit_param_types(
    b: &mut Binder<'_>,
    lambda: &LambdaExpr<'_>,
    ctx: &InterpretationContext,
) -> Vec<Option<DataType>> {
    b.speculate(|b| {
        lambda
            .params
            .iter()
            .map(|p| p.ty.as_ref().map(|t| resolve_type(b, t, ctx)))
            .collect()
    })
    .0
}

/// Natural type of a `Function` lambda's body given its parameter types,
/// found by a trial bind. `None` for `Sub` lambdas and bodies that fail.
pub(crate) fn lambda_return_type<'ast>(
    b: &mut Binder<'_>,
    lambda: &'ast LambdaExpr<'ast>,
    inputs: &[DataType],
    ctx: &InterpretationContext,
) -> Option<DataType> {
    if !lambda.is_function {
        return None;
    }
    let inner = ctx.enter_lambda(lambda.is_async);
    let (ty, _) = b.speculate(|b| {
        b.scope.push_lambda();
        for (param, ty) in lambda.params.iter().zip(inputs) {
            let _ = b.scope.declare_parameter(param.name.name, ty.clone(), param.by_ref, param.span);
        }
        let body = bind_expr(b, lambda.body, ExpressionFlags::VALUE, &inner);
        b.scope.pop_lambda();
        match body {
            Ok(body) if !body.is_bad() && !body.ty.is_void() => Some(body.ty),
            _ => None,
        }
    });
    ty
}

/// The `Func` or `Action` type a lambda has with no target: written
/// parameter types (or `Object`) and the body's natural type.
pub(crate) fn natural_lambda_type<'ast>(
    b: &mut Binder<'_>,
    lambda: &'ast LambdaExpr<'ast>,
    ctx: &InterpretationContext,
) -> Option<DataType> {
    let inputs: Vec<DataType> = explicit_param_types(b, lambda, ctx)
        .into_iter()
        .map(|t| t.unwrap_or(DataType::Object))
        .collect();
    let table = b.table;
    if !lambda.is_function {
        return table.action_type(inputs);
    }
    let body = lambda_return_type(b, lambda, &inputs, ctx).unwrap_or(DataType::Object);
    let result = if lambda.is_async { table.task_of(body)? } else { body };
    let mut args = inputs;
    args.push(result);
    table.func_type(args)
}

fn report_not_delegate(b: &mut Binder<'_>, what: &str, target: &DataType, span: Span) {
    let shown = b.display(target);
    b.error(
        DiagnosticCode::NotDelegateType,
        span,
        format!("{what} cannot be converted to '{shown}' because '{shown}' is not a delegate type."),
    );
}

fn report_mismatch(b: &mut Binder<'_>, target: &DataType, span: Span) {
    let shown = b.display(target);
    b.error(
        DiagnosticCode::LambdaParameterMismatch,
        span,
        format!("Nested function does not have a signature that is compatible with delegate '{shown}'."),
    );
}

/// Bind `lambda` as a value of delegate type `target`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_lambda_to<'ast>(
    b: &mut Binder<'_>,
    lambda: &'ast LambdaExpr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = lambda.span;
    let table = b.table;
    let target = table.normalize(target.clone());

    if target.is_object() {
        let natural = reclassify_natural(b, BoundExpr::pending(Pending::Lambda(lambda), span), ctx)?;
        return convert_implicit(b, natural, &DataType::Object, ctx);
    }
    let Some(signature) = table.delegate_signature(&target) else {
        report_not_delegate(b, "Lambda expression", &target, span);
        return Ok(BoundExpr::bad(span));
    };

    let relaxed = lambda.params.is_empty() && !signature.params.is_empty();
    if (!relaxed && lambda.params.len() != signature.params.len())
        || (!lambda.is_function && !signature.return_type.is_void())
    {
        report_mismatch(b, &target, span);
        return Ok(BoundExpr::bad(span));
    }

    let explicit = explicit_param_types(b, lambda, ctx);
    let mut param_types = Vec::with_capacity(lambda.params.len());
    for (param, written) in signature.params.iter().zip(explicit) {
        match written {
            Some(ty) if ty.is_error() => return Ok(BoundExpr::bad(span)),
            Some(ty) => {
                let conversion = classify(table, &param.ty, &ty);
                if !conversion.is_identity() && !conversion.is_widening() {
                    report_mismatch(b, &target, span);
                    return Ok(BoundExpr::bad(span));
                }
                param_types.push(ty);
            }
            None => param_types.push(param.ty.clone()),
        }
    }

    let Some(body_target) = body_target(b, lambda, &signature, &target, span) else {
        return Ok(BoundExpr::bad(span));
    };

    let inner = ctx.enter_lambda(lambda.is_async);
    b.scope.push_lambda();
    let mut params = Vec::with_capacity(param_types.len());
    for (syntax, ty) in lambda.params.iter().zip(param_types) {
        match b.scope.declare_parameter(syntax.name.name, ty.clone(), syntax.by_ref, syntax.span) {
            Ok(ordinal) => params.push(LambdaParameter {
                name: syntax.name.name.to_string(),
                ty,
                ordinal,
                by_ref: syntax.by_ref,
            }),
            Err(error) => b.error(DiagnosticCode::LambdaParameterMismatch, syntax.span, error.to_string()),
        }
    }
    let body = match &body_target {
        Some(ty) => bind_converted(b, lambda.body, ty, &inner),
        None => bind_expr(b, lambda.body, ExpressionFlags::STATEMENT, &inner),
    };
    let captures = b.scope.pop_lambda();
    let body = body?;

    tracing::trace!(delegate = %b.display(&target), captures = captures.len(), "lambda bound");
    let bound = BoundLambda {
        params,
        body,
        captures,
        is_function: lambda.is_function,
        is_async: lambda.is_async,
    };
    Ok(BoundExpr::new(BoundKind::Lambda(Box::new(bound)), target, span))
}

/// Type the lambda body converts to; `Some(None)` for a body bound as a
/// statement.
fn body_target(
    b: &mut Binder<'_>,
    lambda: &LambdaExpr<'_>,
    signature: &DelegateSignature,
    target: &DataType,
    span: Span,
) -> Option<Option<DataType>> {
    let table = b.table;
    let ret = &signature.return_type;
    if !lambda.is_function || ret.is_void() {
        return Some(None);
    }
    if !lambda.is_async {
        return Some(Some(ret.clone()));
    }
    if table.task().as_ref() == Some(ret) {
        return Some(None);
    }
    if let [result] = ret.type_args()
        && table.task_of(result.clone()).as_ref() == Some(ret)
    {
        return Some(Some(result.clone()));
    }
    report_mismatch(b, target, span);
    None
}

/// `AddressOf target`: the method group waits for a delegate type.
pub(crate) fn bind_address_of<'ast>(
    b: &mut Binder<'_>,
    address_of: &'ast AddressOfExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = address_of.span;
    let target = bind_expr(b, address_of.target, ExpressionFlags::VALUE | ExpressionFlags::ALLOW_METHOD_GROUP, ctx)?;
    if target.is_bad() {
        return Ok(target);
    }
    let is_method_group = matches!(&target.kind, BoundKind::MemberGroup(group)
        if group.members.iter().all(|m| matches!(m, MemberRef::Procedure(_))));
    if !is_method_group {
        b.error(
            DiagnosticCode::AddressOfNoMatch,
            span,
            "'AddressOf' operand must be the name of a method (without parentheses).",
        );
        return Ok(BoundExpr::bad(span));
    }
    Ok(BoundExpr::pending(Pending::AddressOf(Box::new(target)), span))
}

/// Create a delegate of type `target` from a method group.
///
/// The group is resolved as if called with one argument of each delegate
/// parameter type; failing that, a method with no parameters matches any
/// delegate.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_delegate_creation<'ast>(
    b: &mut Binder<'_>,
    group: BoundExpr<'ast>,
    target: &DataType,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let target = table.normalize(target.clone());
    let BoundKind::MemberGroup(group) = group.kind else {
        return Ok(BoundExpr::bad(span));
    };
    let Some(signature) = table.delegate_signature(&target) else {
        report_not_delegate(b, "'AddressOf' expression", &target, span);
        return Ok(BoundExpr::bad(span));
    };

    let candidates = group_candidates(b, &group);
    if candidates.is_empty() {
        return Ok(report_no_match(b, &group.name, &target, span));
    }
    let placeholders: Vec<BoundArgument<'ast>> = signature
        .params
        .iter()
        .map(|p| BoundArgument::positional(BoundExpr::placeholder(p.ty.clone(), span)))
        .collect();

    let mut selected = try_resolve(b, &group, candidates.clone(), placeholders, span, ctx)?;
    if selected.is_none() && !signature.params.is_empty() {
        let parameterless: Vec<Candidate> = candidates.into_iter().filter(|c| c.call_params().is_empty()).collect();
        if !parameterless.is_empty() {
            selected = try_resolve(b, &group, parameterless, Vec::new(), span, ctx)?;
        }
    }
    let Some(selected) = selected else {
        return Ok(report_no_match(b, &group.name, &target, span));
    };

    if !signature.return_type.is_void() {
        let conversion = classify(table, &selected.return_type, &signature.return_type);
        if !conversion.is_identity() && !conversion.is_widening() {
            return Ok(report_no_match(b, &group.name, &target, span));
        }
    }
    let MemberRef::Procedure(procedure) = selected.candidate.member else {
        return Ok(report_no_match(b, &group.name, &target, span));
    };

    let candidate = &selected.candidate;
    let shared = candidate.is_shared || table.get_type(candidate.owner).is_some_and(|t| t.is_module());
    let receiver = match group.receiver {
        Some(receiver) if !shared && !matches!(receiver.kind, BoundKind::TypeExpr(_)) => Some(Box::new(receiver)),
        _ if !shared => {
            let name = group.name.clone();
            b.error(
                DiagnosticCode::InstanceMemberRequiresObject,
                span,
                format!("Reference to a non-shared member '{name}' requires an object reference."),
            );
            return Ok(BoundExpr::bad(span));
        }
        _ => None,
    };
    Ok(BoundExpr::new(
        BoundKind::DelegateCreation {
            receiver,
            procedure,
            is_extension: candidate.is_extension,
        },
        target,
        span,
    ))
}

fn group_candidates(b: &Binder<'_>, group: &MemberGroup<'_>) -> Vec<Candidate> {
    let table = b.table;
    let receiver_ty = group
        .receiver
        .as_ref()
        .filter(|r| !matches!(r.kind, BoundKind::TypeExpr(_)))
        .map(|r| r.ty.clone());
    let mut out: Vec<Candidate> = group
        .members
        .iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(hash) => table.get_procedure(*hash),
            _ => None,
        })
        .map(|p| Candidate::from_procedure(table, p, receiver_ty.as_ref(), false))
        .collect();
    if receiver_ty.is_some() {
        out.extend(
            group
                .extensions
                .iter()
                .filter_map(|h| table.get_procedure(*h))
                .map(|p| Candidate::from_procedure(table, p, receiver_ty.as_ref(), true)),
        );
    }
    out
}

/// Resolve quietly; `None` when nothing matches.
fn try_resolve<'ast>(
    b: &mut Binder<'_>,
    group: &MemberGroup<'ast>,
    candidates: Vec<Candidate>,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<Option<Box<Selected>>> {
    let site = CallSite {
        name: group.name.clone(),
        receiver: group.receiver.clone(),
        args,
        type_args: group.type_args.clone(),
        has_type_arg_list: group.has_type_arg_list,
        span,
    };
    let (resolution, diagnostics) = b.buffered(|b| resolve_overloads(b, candidates, &site, ctx));
    match resolution? {
        Resolution::Selected(selected) => {
            b.commit(diagnostics);
            Ok(Some(selected))
        }
        Resolution::LateBound | Resolution::Failed => Ok(None),
    }
}

fn report_no_match<'ast>(b: &mut Binder<'_>, name: &str, target: &DataType, span: Span) -> BoundExpr<'ast> {
    let shown = b.display(target);
    b.error(
        DiagnosticCode::AddressOfNoMatch,
        span,
        format!("Method '{name}' does not have a signature compatible with delegate '{shown}'."),
    );
    BoundExpr::bad(span)
}

#[cfg(test)]
mod tests {
    use basalt_core::{DataType, DiagnosticCode, PrimitiveKind};
    use basalt_symbols::{ParamEntry, ProcedureEntry};
    use basalt_syntax::{AstBuilder, BinaryOp};
    use bumpalo::Bump;

    use crate::bound::BoundKind;
    use crate::testing::{Fixture, codes};

    fn func_of(f: &Fixture, args: Vec<DataType>) -> DataType {
        f.table.func_type(args).unwrap()
    }

    #[test]
    fn lambda_takes_the_delegate_parameter_types() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.lambda(
            &[ast.lambda_param("x", None)],
            ast.binary(ast.name("x"), BinaryOp::Multiply, ast.int(2)),
        ));
        let mut f = Fixture::strict();
        let target = func_of(&f, vec![DataType::integer(), DataType::long()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(sink.is_empty());
        let BoundKind::Lambda(lambda) = &bound.kind else {
            panic!("expected a lambda, got {:?}", bound.kind);
        };
        assert_eq!(lambda.params[0].ty, DataType::integer());
        assert_eq!(lambda.body.ty, DataType::long());
        assert_eq!(bound.ty, target);
    }

    #[test]
    fn lambda_captures_outer_locals() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.lambda(&[], ast.name("total")));
        let mut f = Fixture::new();
        f.local("total", DataType::integer());
        let target = func_of(&f, vec![DataType::integer()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(sink.is_empty());
        let BoundKind::Lambda(lambda) = &bound.kind else {
            panic!("expected a lambda");
        };
        assert_eq!(lambda.captures.len(), 1);
    }

    #[test]
    fn parameter_count_must_match() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.lambda(
            &[ast.lambda_param("a", None), ast.lambda_param("b", None)],
            ast.name("a"),
        ));
        let mut f = Fixture::new();
        let target = func_of(&f, vec![DataType::integer(), DataType::integer()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::LambdaParameterMismatch]);
    }

    #[test]
    fn lambda_to_a_non_delegate() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.lambda(&[], ast.int(1)));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind_to(expr, &DataType::string());
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NotDelegateType]);
    }

    #[test]
    fn natural_type_of_a_typed_lambda() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.lambda(
            &[ast.lambda_param("s", Some(ast.ty_primitive(PrimitiveKind::String)))],
            ast.member(ast.name("s"), "Length"),
        ));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.ty, func_of(&f, vec![DataType::string(), DataType::integer()]));
    }

    #[test]
    fn address_of_picks_the_matching_overload() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Handlers");
        let wanted = f
            .table
            .register_procedure(ProcedureEntry::method(
                class,
                "Handle",
                vec![ParamEntry::new("n", DataType::integer())],
                DataType::integer(),
            ))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Handle",
                vec![ParamEntry::new("s", DataType::string())],
                DataType::integer(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.address_of(ast.name("Handle")));
        let target = func_of(&f, vec![DataType::integer(), DataType::integer()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        let BoundKind::DelegateCreation { procedure, receiver, .. } = &bound.kind else {
            panic!("expected a delegate creation, got {:?}", bound.kind);
        };
        assert_eq!(*procedure, wanted);
        assert!(receiver.is_some());
    }

    #[test]
    fn address_of_without_a_match() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Handlers");
        f.table
            .register_procedure(ProcedureEntry::method(
                class,
                "Handle",
                vec![ParamEntry::new("s", DataType::string()), ParamEntry::new("t", DataType::string())],
                DataType::integer(),
            ))
            .unwrap();
        let expr = ast.alloc(ast.address_of(ast.name("Handle")));
        let target = func_of(&f, vec![DataType::integer(), DataType::integer()]);
        let (bound, sink) = f.bind_to(expr, &target);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::AddressOfNoMatch]);
    }

    #[test]
    fn address_of_to_object_is_rejected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let mut f = Fixture::new();
        let class = f.enter_class("Handlers");
        f.table.register_procedure(ProcedureEntry::sub(class, "Run", vec![])).unwrap();
        let expr = ast.alloc(ast.address_of(ast.name("Run")));
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NotDelegateType]);
    }
}
