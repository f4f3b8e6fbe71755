//! Unary operators: `-`, `+` and `Not`.

use basalt_core::{BindError, DataType, DiagnosticCode, Span};
use basalt_symbols::MemberRef;
use basalt_syntax::UnaryExpr;

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, OperatorMethod};
use crate::constant::{FoldError, fold_unary};
use crate::context::InterpretationContext;
use crate::operators::unary_operator_types;
use crate::overload::{BoundArgument, CallSite, Candidate, Resolution, resolve_overloads};

use super::bind_value;
use super::calls::bind_arguments;
use super::convert::{convert_implicit, report_fold_error};

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_unary<'ast>(
    b: &mut Binder<'_>,
    un: &'ast UnaryExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = un.span;
    let op = un.op;
    let operand = bind_value(b, un.operand, ctx)?;
    if operand.is_bad() {
        return Ok(unary_node(op, operand, OperatorMethod::Intrinsic, DataType::Error, span));
    }
    let table = b.table;

    let procedures = table.user_operators(operand.ty.strip_nullable(), op.operator_name());
    if !procedures.is_empty() {
        let lifted = operand.ty.is_nullable();
        let candidates = procedures
            .into_iter()
            .map(|p| {
                let mut c = Candidate::from_procedure(table, p, None, false);
                if lifted {
                    for param in &mut c.params {
                        if table.is_value_type(&param.ty) && !param.ty.is_nullable() {
                            param.ty = DataType::nullable(param.ty.clone());
                        }
                    }
                    if table.is_value_type(&c.return_type) && !c.return_type.is_nullable() {
                        c.return_type = DataType::nullable(c.return_type.clone());
                    }
                }
                c
            })
            .collect();
        return bind_user_unary(b, un, candidates, operand, lifted, ctx);
    }

    if operand.ty.is_object() {
        let allowed = b.report_late_binding(&format!("operator '{}'", op.as_str()), span);
        let node = unary_node(op, operand, OperatorMethod::Late, DataType::Object, span).with_flags(BoundFlags::LATE_BOUND);
        return Ok(if allowed { node } else { node.into_bad() });
    }

    let Some(types) = unary_operator_types(table, op, &operand.ty) else {
        let shown = b.display(&operand.ty);
        b.error(
            DiagnosticCode::OperatorNotDefined,
            span,
            format!("Operator '{}' is not defined for type '{shown}'.", op.as_str()),
        );
        return Ok(unary_node(op, operand, OperatorMethod::Intrinsic, DataType::Error, span).into_bad());
    };
    let operand = convert_implicit(b, operand, &types.left, ctx)?;
    let method = if types.lifted { OperatorMethod::Lifted } else { OperatorMethod::Intrinsic };

    let kind = types.left.as_primitive().or_else(|| table.enum_underlying(&types.left));
    if !types.lifted
        && let (Some(value), Some(kind)) = (operand.constant_value(), kind)
    {
        match fold_unary(op, value, kind) {
            Ok(folded) => return Ok(BoundExpr::constant(folded, types.result, span)),
            Err(FoldError::NotConstant) => {}
            Err(error) => {
                report_fold_error(b, error, span);
                return Ok(unary_node(op, operand, method, types.result, span).into_bad());
            }
        }
    }
    Ok(unary_node(op, operand, method, types.result, span))
}

fn bind_user_unary<'ast>(
    b: &mut Binder<'_>,
    un: &'ast UnaryExpr<'ast>,
    candidates: Vec<Candidate>,
    operand: BoundExpr<'ast>,
    lifted: bool,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = un.span;
    let operand_ty = operand.ty.clone();
    let site = CallSite::new(un.op.operator_name(), vec![BoundArgument::positional(operand)], span);
    let (resolution, diagnostics) = b.buffered(|b| resolve_overloads(b, candidates, &site, ctx));
    match resolution? {
        Resolution::Selected(selected) => {
            b.commit(diagnostics);
            let MemberRef::Procedure(procedure) = selected.candidate.member else {
                return Err(BindError::internal("unary operator is not a procedure", span));
            };
            let (mut args, _) = bind_arguments(b, &selected, site.args, span, ctx)?;
            let Some(operand) = args.pop() else {
                return Err(BindError::internal("unary operator takes one operand", span));
            };
            let method = OperatorMethod::UserDefined { procedure, lifted };
            Ok(unary_node(un.op, operand, method, selected.return_type.clone(), span))
        }
        Resolution::LateBound | Resolution::Failed => {
            let shown = b.display(&operand_ty);
            b.error(
                DiagnosticCode::OperatorNotDefined,
                span,
                format!("Operator '{}' is not defined for type '{shown}'.", un.op.as_str()),
            );
            Ok(BoundExpr::bad(span))
        }
    }
}

fn unary_node<'ast>(op: basalt_syntax::UnaryOp, operand: BoundExpr<'ast>, method: OperatorMethod, ty: DataType, span: Span) -> BoundExpr<'ast> {
    BoundExpr::new(
        BoundKind::Unary {
            op,
            operand: Box::new(operand),
            method,
        },
        ty,
        span,
    )
}
