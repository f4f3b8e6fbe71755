//! Overload resolution for procedure calls and indexed properties.
//!
//! Selects the single procedure (or property) a call site refers to, or
//! reports exactly one diagnostic explaining why none could be selected.
//!
//! ## Algorithm
//!
//! 1. Drop candidates that are not accessible from the calling code
//! 2. Match arguments to parameters by shape only (count, names, omissions),
//!    first in normal form and then with the `ParamArray` expanded
//! 3. Check explicit type-argument counts, or infer type arguments
//! 4. Classify the conversion of every argument to its parameter type
//! 5. Rank the applicable candidates (see [`ranking`])
//!
//! Failures are reported for the earliest step at which every candidate
//! dropped out, so a wrong argument count is never reported as a type
//! mismatch.

mod arguments;
mod inference;
mod ranking;

pub use arguments::{ArgumentMap, BoundArgument, MappingError, ParamBinding, map_arguments};
pub use ranking::Ranked;

use std::borrow::Cow;

use basalt_core::{BindError, DataType, DiagnosticCode, Severity, Span, TypeHash};
use basalt_symbols::{MemberRef, ParamEntry, ProcedureEntry, PropertyEntry, SymbolTable};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind};
use crate::context::InterpretationContext;
use crate::conversion::{ConversionClass, classify, classify_constant};
use crate::expr::convert::convert_implicit;

use inference::{Inferred, infer_type_arguments};
use ranking::find_best_match;

/// One overload under consideration.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub member: MemberRef,
    pub name: String,
    /// Parameters as seen through the receiver. For an extension call the
    /// receiver parameter is included and the receiver is argument 0.
    pub params: Vec<ParamEntry>,
    pub return_type: DataType,
    pub generic_owner: TypeHash,
    pub generic_count: usize,
    pub is_extension: bool,
    pub is_default_extension: bool,
    pub is_shared: bool,
    pub owner: TypeHash,
    /// Signature text used in diagnostics.
    pub display: String,
}

impl Candidate {
    /// A procedure called through `receiver` (or directly, when `None`).
    ///
    /// With `as_extension`, an extension method is called with instance
    /// syntax and the receiver is passed as its first argument.
    pub fn from_procedure(
        table: &SymbolTable,
        procedure: &ProcedureEntry,
        receiver: Option<&DataType>,
        as_extension: bool,
    ) -> Self {
        let is_extension = as_extension && procedure.is_extension;
        let through = |ty: &DataType| match receiver {
            Some(r) if !is_extension => table.member_type(r, procedure.owner, ty),
            _ => table.normalize(ty.clone()),
        };
        Self {
            member: MemberRef::Procedure(procedure.hash),
            name: procedure.name.clone(),
            params: procedure
                .params
                .iter()
                .map(|p| ParamEntry {
                    ty: through(&p.ty),
                    ..p.clone()
                })
                .collect(),
            return_type: through(&procedure.return_type),
            generic_owner: procedure.generic_owner,
            generic_count: procedure.arity(),
            is_extension,
            is_default_extension: procedure.is_default_extension,
            is_shared: procedure.is_shared && !is_extension,
            owner: procedure.owner,
            display: table.display_procedure(procedure),
        }
    }

    pub fn from_property(table: &SymbolTable, property: &PropertyEntry, receiver: Option<&DataType>) -> Self {
        let through = |ty: &DataType| match receiver {
            Some(r) => table.member_type(r, property.owner, ty),
            None => table.normalize(ty.clone()),
        };
        let params: Vec<ParamEntry> = property
            .params
            .iter()
            .map(|p| ParamEntry {
                ty: through(&p.ty),
                ..p.clone()
            })
            .collect();
        let shown: Vec<String> = property
            .params
            .iter()
            .map(|p| format!("{} As {}", p.name, table.display_type(&p.ty)))
            .collect();
        let display = format!(
            "{}({}) As {}",
            property.name,
            shown.join(", "),
            table.display_type(&property.ty)
        );
        Self {
            member: MemberRef::Property(property.hash),
            name: property.name.clone(),
            params,
            return_type: through(&property.ty),
            generic_owner: TypeHash::EMPTY,
            generic_count: 0,
            is_extension: false,
            is_default_extension: false,
            is_shared: property.is_shared,
            owner: property.owner,
            display,
        }
    }

    pub fn has_param_array(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_param_array)
    }

    /// Parameters a caller supplies explicitly (receiver excluded).
    pub fn call_params(&self) -> &[ParamEntry] {
        if self.is_extension {
            self.params.get(1..).unwrap_or(&[])
        } else {
            &self.params
        }
    }

    /// Parameter and return types with `type_args` substituted.
    pub fn instantiate(&self, table: &SymbolTable, type_args: &[DataType]) -> (Vec<ParamEntry>, DataType) {
        if type_args.is_empty() {
            return (self.params.clone(), self.return_type.clone());
        }
        let params = self
            .params
            .iter()
            .map(|p| ParamEntry {
                ty: table.normalize(p.ty.substitute(self.generic_owner, type_args)),
                ..p.clone()
            })
            .collect();
        let ret = table.normalize(self.return_type.substitute(self.generic_owner, type_args));
        (params, ret)
    }
}

/// The arguments of one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite<'ast> {
    pub name: String,
    /// Value passed as the first argument of extension candidates.
    pub receiver: Option<BoundExpr<'ast>>,
    pub args: Vec<BoundArgument<'ast>>,
    pub type_args: Vec<DataType>,
    pub has_type_arg_list: bool,
    pub span: Span,
}

impl<'ast> CallSite<'ast> {
    pub fn new(name: &str, args: Vec<BoundArgument<'ast>>, span: Span) -> Self {
        Self {
            name: name.to_string(),
            receiver: None,
            args,
            type_args: Vec::new(),
            has_type_arg_list: false,
            span,
        }
    }

    /// Arguments as matched against `candidate`'s parameters.
    pub fn args_for(&self, candidate: &Candidate) -> Cow<'_, [BoundArgument<'ast>]> {
        match (&self.receiver, candidate.is_extension) {
            (Some(receiver), true) => {
                let mut all = Vec::with_capacity(self.args.len() + 1);
                all.push(BoundArgument::positional(receiver.clone()));
                all.extend(self.args.iter().cloned());
                Cow::Owned(all)
            }
            _ => Cow::Borrowed(&self.args),
        }
    }

    /// Some argument is statically `Object`.
    fn has_object_argument(&self) -> bool {
        self.args
            .iter()
            .any(|a| a.value.as_ref().is_some_and(|v| v.ty.is_object() && v.is_value()))
    }
}

/// The candidate chosen for a call, with everything needed to bind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub candidate: Candidate,
    pub type_args: Vec<DataType>,
    pub map: ArgumentMap,
    /// Parameters with type arguments substituted.
    pub params: Vec<ParamEntry>,
    pub return_type: DataType,
    /// At least one argument needs a narrowing conversion.
    pub narrowing: bool,
    /// A type argument could only be inferred as `Object`.
    pub object_inferred: bool,
    /// The only candidate with the right shape, selected although some
    /// argument does not convert.
    pub arguments_rejected: bool,
}

/// Outcome of overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Selected(Box<Selected>),
    /// Only a run-time decision can choose; the caller builds a late call.
    LateBound,
    /// A diagnostic has been reported.
    Failed,
}

/// A candidate that survived shape matching and inference.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Applicable {
    pub selected: Selected,
    /// Conversion class of each argument; `None` for omitted arguments.
    pub classes: Vec<Option<ConversionClass>>,
    /// Parameter (or `ParamArray` element) type each argument converts to.
    pub arg_params: Vec<Option<DataType>>,
}

impl Applicable {
    fn has_error(&self) -> bool {
        self.classes.iter().any(|c| *c == Some(ConversionClass::Error))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Rejection {
    Arity(MappingError),
    TypeArity,
    Inference,
    InferredObject,
    Arguments(Box<Applicable>),
}

// ==========================================================================
// Resolution
// ==========================================================================

/// Resolve `candidates` against `site`.
///
/// Every failure is reported before returning [`Resolution::Failed`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_overloads<'ast>(
    b: &mut Binder<'_>,
    candidates: Vec<Candidate>,
    site: &CallSite<'ast>,
    ctx: &InterpretationContext,
) -> Result<Resolution> {
    if candidates.is_empty() {
        return Err(BindError::internal(
            format!("no candidates for '{}'", site.name),
            site.span,
        ));
    }

    let table = b.table;
    let (accessible, inaccessible): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .partition(|c| table.is_member_accessible(c.member, ctx.containing_type));
    if accessible.is_empty() {
        let first = &inaccessible[0];
        let access = table.member_access(first.member).map(|(a, _)| a);
        b.error(
            DiagnosticCode::Inaccessible,
            site.span,
            format!(
                "'{}' is not accessible in this context because it is '{:?}'.",
                first.display,
                access.unwrap_or(basalt_symbols::Access::Private)
            ),
        );
        return Ok(Resolution::Failed);
    }

    let mut results = Vec::with_capacity(accessible.len());
    for candidate in accessible {
        let outcome = evaluate(b, &candidate, site, ctx);
        tracing::trace!(
            candidate = %candidate.display,
            outcome = outcome_label(&outcome),
            "overload candidate"
        );
        results.push((candidate, outcome));
    }

    // Arity: reported only when no candidate accepts the argument shape.
    if results.iter().all(|(_, r)| matches!(r, Err(Rejection::Arity(_)))) {
        if let [(candidate, Err(Rejection::Arity(error)))] = results.as_slice() {
            let args = site.args_for(candidate);
            let span = error.argument().and_then(|i| args.get(i)).map_or(site.span, |a| a.span);
            b.error(error.code(), span, error.message(&candidate.display));
        } else {
            b.error(
                DiagnosticCode::NoApplicableOverload,
                site.span,
                format!(
                    "Overload resolution failed because no accessible '{}' accepts this number of arguments.",
                    site.name
                ),
            );
        }
        return Ok(Resolution::Failed);
    }
    results.retain(|(_, r)| !matches!(r, Err(Rejection::Arity(_))));

    if results.iter().all(|(_, r)| matches!(r, Err(Rejection::TypeArity))) {
        if let [(candidate, _)] = results.as_slice() {
            report_type_argument_count(b, candidate, site);
        } else {
            b.error(
                DiagnosticCode::NoApplicableOverload,
                site.span,
                format!(
                    "Overload resolution failed because no accessible '{}' accepts this number of type arguments.",
                    site.name
                ),
            );
        }
        return Ok(Resolution::Failed);
    }
    results.retain(|(_, r)| !matches!(r, Err(Rejection::TypeArity)));

    let mut viable = Vec::new();
    let mut rejected_arguments = Vec::new();
    let mut inference_failures = Vec::new();
    for (candidate, outcome) in results {
        match outcome {
            Ok(app) => viable.push(app),
            Err(Rejection::Arguments(app)) => rejected_arguments.push(*app),
            Err(rejection) => inference_failures.push((candidate, rejection)),
        }
    }

    if viable.is_empty() {
        match (rejected_arguments.len(), inference_failures.as_slice()) {
            // The only candidate with the right shape: its argument
            // conversions are reported individually when the call is bound.
            (1, []) => {
                let mut selected = rejected_arguments.remove(0).selected;
                selected.arguments_rejected = true;
                return Ok(Resolution::Selected(Box::new(selected)));
            }
            (0, [(candidate, rejection)]) => {
                report_inference_failure(b, candidate, rejection, site.span);
            }
            _ => {
                let mut shown: Vec<&str> = rejected_arguments
                    .iter()
                    .map(|a| a.selected.candidate.display.as_str())
                    .collect();
                shown.extend(inference_failures.iter().map(|(c, _)| c.display.as_str()));
                report_candidate_list(
                    b,
                    DiagnosticCode::NoApplicableOverload,
                    site,
                    "can be called with these arguments",
                    &shown,
                );
            }
        }
        return Ok(Resolution::Failed);
    }

    match find_best_match(b, &viable, site.has_object_argument()) {
        Ranked::Winner(index) => {
            let app = viable.swap_remove(index);
            if app.selected.object_inferred {
                report_object_inferred(b, &app.selected.candidate, site.span);
            }
            tracing::trace!(selected = %app.selected.candidate.display, "overload selected");
            Ok(Resolution::Selected(Box::new(app.selected)))
        }
        Ranked::LateBound => {
            tracing::debug!(name = %site.name, "overload resolution deferred to run time");
            Ok(Resolution::LateBound)
        }
        Ranked::Ambiguous(indices) => {
            let shown: Vec<&str> = indices
                .iter()
                .map(|&i| viable[i].selected.candidate.display.as_str())
                .collect();
            report_candidate_list(
                b,
                DiagnosticCode::AmbiguousOverload,
                site,
                "is most specific for these arguments",
                &shown,
            );
            Ok(Resolution::Failed)
        }
        Ranked::Narrowing(indices) => {
            let shown: Vec<&str> = indices
                .iter()
                .map(|&i| viable[i].selected.candidate.display.as_str())
                .collect();
            report_candidate_list(
                b,
                DiagnosticCode::NarrowingOverload,
                site,
                "can be called without a narrowing conversion",
                &shown,
            );
            Ok(Resolution::Failed)
        }
    }
}

fn outcome_label(outcome: &std::result::Result<Applicable, Rejection>) -> &'static str {
    match outcome {
        Ok(app) if app.selected.narrowing => "narrowing",
        Ok(_) => "applicable",
        Err(Rejection::Arity(_)) => "argument count",
        Err(Rejection::TypeArity) => "type argument count",
        Err(Rejection::Inference) => "inference failed",
        Err(Rejection::InferredObject) => "inferred Object",
        Err(Rejection::Arguments(_)) => "argument types",
    }
}

/// Run steps 2-4 for one candidate.
fn evaluate(
    b: &mut Binder<'_>,
    candidate: &Candidate,
    site: &CallSite<'_>,
    ctx: &InterpretationContext,
) -> std::result::Result<Applicable, Rejection> {
    let args = site.args_for(candidate);
    let mut first_error = None;
    let mut rejected = None;
    for expanded in [false, true] {
        if expanded && !candidate.has_param_array() {
            break;
        }
        match map_arguments(&candidate.params, &args, expanded) {
            Err(error) => {
                first_error.get_or_insert(error);
            }
            Ok(map) => match evaluate_form(b, candidate, site, &args, map, ctx) {
                Ok(app) if !app.has_error() => return Ok(app),
                Ok(app) => {
                    rejected.get_or_insert(Rejection::Arguments(Box::new(app)));
                }
                Err(rejection) => {
                    rejected.get_or_insert(rejection);
                }
            },
        }
    }
    match (rejected, first_error) {
        (Some(rejection), _) => Err(rejection),
        (None, Some(error)) => Err(Rejection::Arity(error)),
        (None, None) => Err(Rejection::Arity(MappingError::TooManyArguments)),
    }
}

fn evaluate_form(
    b: &mut Binder<'_>,
    candidate: &Candidate,
    site: &CallSite<'_>,
    args: &[BoundArgument<'_>],
    map: ArgumentMap,
    ctx: &InterpretationContext,
) -> std::result::Result<Applicable, Rejection> {
    let mut object_inferred = false;
    let type_args = if site.has_type_arg_list {
        if candidate.generic_count != site.type_args.len() {
            return Err(Rejection::TypeArity);
        }
        site.type_args.clone()
    } else if candidate.generic_count > 0 {
        match infer_type_arguments(b, candidate, args, &map, ctx) {
            Inferred::Fixed { type_args, object } => {
                if object && b.options.option_strict {
                    return Err(Rejection::InferredObject);
                }
                object_inferred = object;
                type_args
            }
            Inferred::Failed => return Err(Rejection::Inference),
        }
    } else {
        Vec::new()
    };

    let (params, return_type) = candidate.instantiate(b.table, &type_args);
    let mut classes = vec![None; args.len()];
    let mut arg_params = vec![None; args.len()];
    for (param, binding) in params.iter().zip(&map.bindings) {
        match binding {
            ParamBinding::Argument(i) => {
                if let Some(value) = args[*i].value.as_ref() {
                    classes[*i] = Some(classify_argument(b, value, &param.ty, ctx));
                    arg_params[*i] = Some(param.ty.clone());
                }
            }
            ParamBinding::Expanded(list) => {
                let element = param.ty.array_parts().map_or(DataType::Error, |(e, _)| e.clone());
                for i in list {
                    if let Some(value) = args[*i].value.as_ref() {
                        classes[*i] = Some(classify_argument(b, value, &element, ctx));
                        arg_params[*i] = Some(element.clone());
                    }
                }
            }
            ParamBinding::Default => {}
        }
    }

    let narrowing = classes.iter().any(|c| *c == Some(ConversionClass::Narrowing));
    Ok(Applicable {
        selected: Selected {
            candidate: candidate.clone(),
            type_args,
            map,
            params,
            return_type,
            narrowing,
            object_inferred,
            arguments_rejected: false,
        },
        classes,
        arg_params,
    })
}

/// Conversion class of passing `arg` where `target` is expected.
///
/// Target-typed arguments are converted speculatively; any error while
/// doing so (including in a lambda body) makes the argument inapplicable.
pub(crate) fn classify_argument<'ast>(
    b: &mut Binder<'_>,
    arg: &BoundExpr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> ConversionClass {
    if arg.is_bad() || target.is_error() {
        return ConversionClass::Identity;
    }
    if arg.is_unbound() {
        let (converted, diagnostics) = b.speculate(|b| convert_implicit(b, arg.clone(), target, ctx));
        let Ok(converted) = converted else {
            return ConversionClass::Error;
        };
        if converted.is_bad() || diagnostics.iter().any(|d| d.is_error()) {
            return ConversionClass::Error;
        }
        if diagnostics.iter().any(|d| d.code == DiagnosticCode::NarrowingConversion) {
            return ConversionClass::Narrowing;
        }
        return match &converted.kind {
            BoundKind::Conversion { conversion, .. } => conversion.class,
            _ => ConversionClass::Widening,
        };
    }
    if !arg.is_value() {
        return ConversionClass::Error;
    }
    match arg.constant_value() {
        Some(value) => classify_constant(b.table, value, &arg.ty, target).class,
        None => classify(b.table, &arg.ty, target).class,
    }
}

// ==========================================================================
// Reporting
// ==========================================================================

fn report_candidate_list(b: &mut Binder<'_>, code: DiagnosticCode, site: &CallSite<'_>, reason: &str, shown: &[&str]) {
    let mut message = format!(
        "Overload resolution failed because no accessible '{}' {reason}:",
        site.name
    );
    for signature in shown {
        message.push_str(&format!("\n    '{signature}'"));
    }
    b.error(code, site.span, message);
}

fn report_type_argument_count(b: &mut Binder<'_>, candidate: &Candidate, site: &CallSite<'_>) {
    let supplied = site.type_args.len();
    let (code, message) = if candidate.generic_count == 0 {
        (
            DiagnosticCode::NotGeneric,
            format!(
                "'{}' is not generic and so cannot have type arguments.",
                candidate.display
            ),
        )
    } else {
        let (code, amount) = if supplied < candidate.generic_count {
            (DiagnosticCode::TooFewTypeArguments, "Too few")
        } else {
            (DiagnosticCode::TooManyTypeArguments, "Too many")
        };
        let message = if candidate.is_extension {
            let owner = b.type_name(candidate.owner);
            format!(
                "{amount} type arguments to extension method '{}' defined in '{owner}'.",
                candidate.display
            )
        } else {
            format!("{amount} type arguments to '{}'.", candidate.display)
        };
        (code, message)
    };
    b.error(code, site.span, message);
}

fn report_inference_failure(b: &mut Binder<'_>, candidate: &Candidate, rejection: &Rejection, span: Span) {
    if matches!(rejection, Rejection::InferredObject) {
        b.error(
            DiagnosticCode::InferredObject,
            span,
            format!(
                "Data type(s) of the type parameter(s) in method '{}' cannot be inferred from these arguments because more than one type is possible.",
                candidate.display
            ),
        );
    } else {
        b.error(
            DiagnosticCode::TypeInferenceFailed,
            span,
            format!(
                "Data type(s) of the type parameter(s) in method '{}' cannot be inferred from these arguments.",
                candidate.display
            ),
        );
    }
}

fn report_object_inferred(b: &mut Binder<'_>, candidate: &Candidate, span: Span) {
    let severity = b.options.narrowing_severity();
    if severity == Severity::Error {
        return;
    }
    b.report(
        DiagnosticCode::InferredObject,
        severity,
        span,
        format!(
            "Data type(s) of the type parameter(s) in method '{}' could not be inferred exactly; 'Object' is assumed.",
            candidate.display
        ),
    );
}
