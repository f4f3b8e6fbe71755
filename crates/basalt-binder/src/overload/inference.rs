//! Type-argument inference for generic procedures.
//!
//! Each argument contributes hints for the type parameters its parameter
//! type mentions; the dominant type of each parameter's hints fixes it.
//! Lambdas contribute in a second, iterative phase: once the delegate's
//! input types are fixed, the lambda body is bound speculatively and its
//! type feeds the delegate's return type.

use basalt_core::{DataType, TypeHash};
use basalt_symbols::SymbolTable;
use basalt_syntax::LambdaExpr;

use super::{ArgumentMap, BoundArgument, Candidate, ParamBinding};
use crate::binder::Binder;
use crate::bound::{BoundKind, Pending};
use crate::context::InterpretationContext;
use crate::dominant::{DominantType, dominant_type};
use crate::expr::init_list::natural_array_type;
use crate::expr::lambda::{explicit_param_types, lambda_return_type};

/// Result of inference.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inferred {
    Fixed {
        type_args: Vec<DataType>,
        /// Some parameter could only be fixed to an assumed `Object`.
        object: bool,
    },
    Failed,
}

pub(crate) fn infer_type_arguments<'ast>(
    b: &mut Binder<'_>,
    candidate: &Candidate,
    args: &[BoundArgument<'ast>],
    map: &ArgumentMap,
    ctx: &InterpretationContext,
) -> Inferred {
    let owner = candidate.generic_owner;
    let table = b.table;
    let mut hints: Vec<Vec<DataType>> = vec![Vec::new(); candidate.generic_count];
    let mut lambdas: Vec<(&'ast LambdaExpr<'ast>, DataType)> = Vec::new();

    for (param, binding) in candidate.params.iter().zip(&map.bindings) {
        let targets: Vec<(usize, DataType)> = match binding {
            ParamBinding::Argument(i) => vec![(*i, param.ty.clone())],
            ParamBinding::Expanded(list) => {
                let element = param.ty.array_parts().map_or(DataType::Error, |(e, _)| e.clone());
                list.iter().map(|i| (*i, element.clone())).collect()
            }
            ParamBinding::Default => Vec::new(),
        };
        for (index, param_ty) in targets {
            if !mentions(&param_ty, owner) {
                continue;
            }
            let Some(value) = args.get(index).and_then(|a| a.value.as_ref()) else {
                continue;
            };
            match &value.kind {
                BoundKind::Unbound(Pending::Lambda(lambda)) => lambdas.push((*lambda, param_ty)),
                BoundKind::Unbound(Pending::ArrayLiteral(pending)) => {
                    if let Some(natural) = natural_array_type(b, pending, ctx) {
                        unify(table, owner, &param_ty, &natural, &mut hints);
                    }
                }
                BoundKind::Unbound(_) => {}
                _ if value.is_bad() => {}
                _ => unify(table, owner, &param_ty, &value.ty, &mut hints),
            }
        }
    }

    while !lambdas.is_empty() {
        let before = lambdas.len();
        let mut waiting = Vec::new();
        for (lambda, param_ty) in lambdas {
            let fixed = partial_fixing(table, owner, &hints);
            if !infer_from_lambda(b, owner, lambda, &param_ty, &fixed, &mut hints, ctx) {
                waiting.push((lambda, param_ty));
            }
        }
        if waiting.len() == before {
            break;
        }
        lambdas = waiting;
    }

    let mut type_args = Vec::with_capacity(hints.len());
    let mut object = false;
    for candidates in &hints {
        match dominant_type(table, candidates) {
            DominantType::Unique(ty) => type_args.push(ty),
            DominantType::ObjectAssumed => {
                object = true;
                type_args.push(DataType::Object);
            }
            DominantType::Empty => return Inferred::Failed,
        }
    }
    tracing::trace!(procedure = %candidate.display, ?type_args, "type arguments inferred");
    Inferred::Fixed { type_args, object }
}

/// Learn from one lambda argument. Returns false while the delegate's input
/// types still depend on unfixed parameters.
fn infer_from_lambda<'ast>(
    b: &mut Binder<'_>,
    owner: TypeHash,
    lambda: &'ast LambdaExpr<'ast>,
    param_ty: &DataType,
    fixed: &[DataType],
    hints: &mut [Vec<DataType>],
    ctx: &InterpretationContext,
) -> bool {
    let table = b.table;
    let partial = table.normalize(param_ty.substitute(owner, fixed));
    let Some(signature) = table.delegate_signature(&partial) else {
        return true;
    };
    if signature.params.len() != lambda.params.len() {
        return true;
    }

    let explicit = explicit_param_types(b, lambda, ctx);
    let mut inputs = Vec::with_capacity(signature.params.len());
    for (param, written) in signature.params.iter().zip(explicit) {
        match written {
            Some(ty) => {
                unify(table, owner, &param.ty, &ty, hints);
                inputs.push(ty);
            }
            None => inputs.push(param.ty.clone()),
        }
    }
    if inputs.iter().any(|t| mentions(t, owner)) {
        return false;
    }
    if !mentions(&signature.return_type, owner) {
        return true;
    }

    let Some(body) = lambda_return_type(b, lambda, &inputs, ctx) else {
        return true;
    };
    let body = if lambda.is_async {
        match table.task_of(body) {
            Some(task) => task,
            None => return true,
        }
    } else {
        body
    };
    unify(table, owner, &signature.return_type, &body, hints);
    true
}

/// Current best guess for each parameter, leaving unfixed ones in place.
fn partial_fixing(table: &SymbolTable, owner: TypeHash, hints: &[Vec<DataType>]) -> Vec<DataType> {
    hints
        .iter()
        .enumerate()
        .map(|(index, candidates)| {
            dominant_type(table, candidates).into_type().unwrap_or(DataType::GenericParam {
                owner,
                index: index as u32,
            })
        })
        .collect()
}

/// Whether `ty` mentions a type parameter of `owner`.
fn mentions(ty: &DataType, owner: TypeHash) -> bool {
    match ty {
        DataType::GenericParam { owner: o, .. } => *o == owner,
        DataType::Named { args, .. } => args.iter().any(|a| mentions(a, owner)),
        DataType::Array { element, .. } => mentions(element, owner),
        DataType::Nullable(inner) => mentions(inner, owner),
        _ => false,
    }
}

/// Match `param` (mentioning `owner`'s parameters) against `arg`, adding a
/// hint for every parameter position reached.
pub(crate) fn unify(table: &SymbolTable, owner: TypeHash, param: &DataType, arg: &DataType, hints: &mut [Vec<DataType>]) {
    if arg.is_error() || arg.is_void() {
        return;
    }
    match param {
        DataType::GenericParam { owner: o, index } if *o == owner => {
            if let Some(slot) = hints.get_mut(*index as usize) {
                slot.push(arg.clone());
            }
        }
        DataType::Array { element, rank } => {
            if let Some((arg_element, arg_rank)) = arg.array_parts()
                && arg_rank == *rank
            {
                unify(table, owner, element, arg_element, hints);
            }
        }
        DataType::Nullable(inner) => match arg.nullable_underlying() {
            Some(arg_inner) => unify(table, owner, inner, arg_inner, hints),
            None if table.is_value_type(arg) => unify(table, owner, inner, arg, hints),
            None => {}
        },
        DataType::Named { hash, args } if !args.is_empty() => {
            if let Some(arg_args) = table.instantiation_of(arg, *hash) {
                for (p, a) in args.iter().zip(&arg_args) {
                    unify(table, owner, p, a, hints);
                }
            }
        }
        _ => {}
    }
}
