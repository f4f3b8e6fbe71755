//! Query expressions.
//!
//! `From x In source` followed by `Where`, `Order By` and `Select` clauses
//! lowers to a chain of calls, each clause becoming a `Func` lambda over the
//! range variable passed to the operator of the same name. Operators are
//! found like any member: instance methods first, then extensions.

use basalt_core::{DataType, DiagnosticCode, Span};
use basalt_symbols::WellKnownType;
use basalt_syntax::{Expr, Ident, QueryClause, QueryExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind, BoundLambda, LambdaParameter};
use crate::context::InterpretationContext;
use crate::overload::BoundArgument;

use super::calls::invoke_group;
use super::member::bind_member_of;
use super::{bind_converted, bind_value};

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_query<'ast>(
    b: &mut Binder<'_>,
    query: &'ast QueryExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = query.span;
    let source = bind_value(b, query.source, ctx)?;
    if source.is_bad() {
        return Ok(BoundExpr::bad(span));
    }
    let Some(mut element) = element_type(b, &source.ty) else {
        report_not_queryable(b, &source.ty, source.span);
        return Ok(BoundExpr::bad(span));
    };

    let mut current = source;
    for clause in query.clauses {
        let (name, lambda) = match *clause {
            QueryClause::Where(predicate) => {
                let lambda = clause_lambda(b, &query.variable, &element, predicate, Some(&DataType::boolean()), ctx)?;
                ("Where", lambda)
            }
            QueryClause::OrderBy { key, descending } => {
                let lambda = clause_lambda(b, &query.variable, &element, key, None, ctx)?;
                (if descending { "OrderByDescending" } else { "OrderBy" }, lambda)
            }
            QueryClause::Select(projection) => {
                let lambda = clause_lambda(b, &query.variable, &element, projection, None, ctx)?;
                ("Select", lambda)
            }
        };
        if lambda.is_bad() {
            return Ok(BoundExpr::bad(span));
        }
        current = apply_operator(b, current, name, lambda, span, ctx)?;
        if current.is_bad() {
            return Ok(current);
        }
        let Some(next) = element_type(b, &current.ty) else {
            report_not_queryable(b, &current.ty, span);
            return Ok(BoundExpr::bad(span));
        };
        element = next;
    }
    Ok(current)
}

/// `T` of the `IEnumerable(Of T)` that `ty` is or implements.
fn element_type(b: &Binder<'_>, ty: &DataType) -> Option<DataType> {
    let table = b.table;
    let enumerable = table.well_known(WellKnownType::GenericEnumerable)?;
    match table.instantiation_of(ty, enumerable)?.as_slice() {
        [element] => Some(element.clone()),
        _ => None,
    }
}

fn report_not_queryable(b: &mut Binder<'_>, ty: &DataType, span: Span) {
    let shown = b.display(ty);
    b.error(
        DiagnosticCode::QueryOperatorNotFound,
        span,
        format!("Expression of type '{shown}' is not queryable. Make sure you are not missing a namespace import for the query provider."),
    );
}

/// A single-parameter `Func` lambda binding `body` with the range variable
/// typed as `element`.
fn clause_lambda<'ast>(
    b: &mut Binder<'_>,
    variable: &Ident<'ast>,
    element: &DataType,
    body: &'ast Expr<'ast>,
    result: Option<&DataType>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = body.span();
    let inner = ctx.enter_lambda(false);
    b.scope.push_lambda();
    let ordinal = match b.scope.declare_parameter(variable.name, element.clone(), false, variable.span) {
        Ok(ordinal) => ordinal,
        Err(error) => {
            b.scope.pop_lambda();
            b.error(DiagnosticCode::LambdaParameterMismatch, variable.span, error.to_string());
            return Ok(BoundExpr::bad(span));
        }
    };
    let body = match result {
        Some(ty) => bind_converted(b, body, ty, &inner),
        None => bind_value(b, body, &inner),
    };
    let captures = b.scope.pop_lambda();
    let body = body?;
    if body.is_bad() {
        return Ok(BoundExpr::bad(span));
    }

    let Some(delegate) = b.table.func_type(vec![element.clone(), body.ty.clone()]) else {
        b.report_missing_runtime("Query expression", span);
        return Ok(BoundExpr::bad(span));
    };
    let lambda = BoundLambda {
        params: vec![LambdaParameter {
            name: variable.name.to_string(),
            ty: element.clone(),
            ordinal,
            by_ref: false,
        }],
        body,
        captures,
        is_function: true,
        is_async: false,
    };
    Ok(BoundExpr::new(BoundKind::Lambda(Box::new(lambda)), delegate, span))
}

/// `current.name(lambda)`, reporting a missing operator as such.
fn apply_operator<'ast>(
    b: &mut Binder<'_>,
    current: BoundExpr<'ast>,
    name: &str,
    lambda: BoundExpr<'ast>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let ty = current.ty.clone();
    let (member, diagnostics) = b.buffered(|b| bind_member_of(b, current, name, Vec::new(), false, span, ctx));
    let member = member?;
    let BoundKind::MemberGroup(group) = member.kind else {
        let shown = b.display(&ty);
        b.error(
            DiagnosticCode::QueryOperatorNotFound,
            span,
            format!("Definition of method '{name}' is not accessible on a source of type '{shown}'."),
        );
        return Ok(BoundExpr::bad(span));
    };
    b.commit(diagnostics);
    tracing::trace!(operator = name, "query clause lowered");
    invoke_group(b, *group, vec![BoundArgument::positional(lambda)], true, span, ctx)
}
