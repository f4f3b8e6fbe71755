//! Matching call arguments to parameters.
//!
//! Positional arguments fill parameters in order, named arguments fill the
//! parameter they name, and whatever is left must be optional or a
//! `ParamArray`. In expanded form, the positional arguments from the
//! `ParamArray` position onward are packed into the array.
//!
//! Matching looks only at shapes (counts, names, omissions). Argument types
//! are checked afterwards, so a wrong argument count is reported as such
//! rather than as a confusing conversion error.

use basalt_core::{DiagnosticCode, Span};
use basalt_symbols::ParamEntry;

use crate::bound::BoundExpr;

/// One argument at a call site, already bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument<'ast> {
    /// `name := value`.
    pub name: Option<&'ast str>,
    /// `None` for an omitted argument.
    pub value: Option<BoundExpr<'ast>>,
    pub span: Span,
}

impl<'ast> BoundArgument<'ast> {
    pub fn positional(value: BoundExpr<'ast>) -> Self {
        let span = value.span;
        Self {
            name: None,
            value: Some(value),
            span,
        }
    }

    pub fn is_omitted(&self) -> bool {
        self.value.is_none()
    }
}

/// How one parameter receives its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBinding {
    /// From the argument at this index.
    Argument(usize),
    /// A `ParamArray` built from these arguments.
    Expanded(Vec<usize>),
    /// The parameter's default.
    Default,
}

/// Parameter bindings for one candidate, in parameter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMap {
    pub bindings: Vec<ParamBinding>,
    /// The `ParamArray` was expanded from individual arguments.
    pub expanded: bool,
    /// Number of parameters filled from their defaults.
    pub defaults: usize,
}

impl ArgumentMap {
    /// Parameter index each argument went to, `None` for omitted arguments.
    pub fn param_of_argument(&self, argument_count: usize) -> Vec<Option<usize>> {
        let mut out = vec![None; argument_count];
        for (param, binding) in self.bindings.iter().enumerate() {
            match binding {
                ParamBinding::Argument(i) => {
                    if let Some(slot) = out.get_mut(*i) {
                        *slot = Some(param);
                    }
                }
                ParamBinding::Expanded(list) => {
                    for i in list {
                        if let Some(slot) = out.get_mut(*i) {
                            *slot = Some(param);
                        }
                    }
                }
                ParamBinding::Default => {}
            }
        }
        out
    }
}

/// Why arguments could not be matched to a candidate's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    TooManyArguments,
    ArgumentNotSpecified(String),
    NamedArgumentNotFound { name: String, arg: usize },
    NamedArgumentUsedTwice { name: String, arg: usize },
    /// A named argument for a parameter whose position was skipped with a comma.
    NamedArgumentMatchesOmitted { name: String, arg: usize },
    OmittedArgumentNotOptional { name: String, arg: usize },
    ParamArrayNamed { arg: usize },
    ParamArrayOmitted { arg: usize },
}

impl MappingError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            MappingError::TooManyArguments => DiagnosticCode::TooManyArguments,
            MappingError::ArgumentNotSpecified(_) => DiagnosticCode::ArgumentNotSpecified,
            MappingError::NamedArgumentNotFound { .. } | MappingError::ParamArrayNamed { .. } => {
                DiagnosticCode::NamedArgumentNotFound
            }
            MappingError::NamedArgumentUsedTwice { .. } => DiagnosticCode::NamedArgumentUsedTwice,
            MappingError::NamedArgumentMatchesOmitted { .. } => DiagnosticCode::NamedArgumentMatchesOmitted,
            MappingError::OmittedArgumentNotOptional { .. } | MappingError::ParamArrayOmitted { .. } => {
                DiagnosticCode::OmittedArgumentNotOptional
            }
        }
    }

    /// The argument the error is about, if it is about one.
    pub fn argument(&self) -> Option<usize> {
        match self {
            MappingError::TooManyArguments | MappingError::ArgumentNotSpecified(_) => None,
            MappingError::NamedArgumentNotFound { arg, .. }
            | MappingError::NamedArgumentUsedTwice { arg, .. }
            | MappingError::NamedArgumentMatchesOmitted { arg, .. }
            | MappingError::OmittedArgumentNotOptional { arg, .. }
            | MappingError::ParamArrayNamed { arg }
            | MappingError::ParamArrayOmitted { arg } => Some(*arg),
        }
    }

    pub fn message(&self, procedure: &str) -> String {
        match self {
            MappingError::TooManyArguments => format!("Too many arguments to '{procedure}'."),
            MappingError::ArgumentNotSpecified(name) => {
                format!("Argument not specified for parameter '{name}' of '{procedure}'.")
            }
            MappingError::NamedArgumentNotFound { name, .. } => {
                format!("'{name}' is not a parameter of '{procedure}'.")
            }
            MappingError::NamedArgumentUsedTwice { name, .. } => {
                format!("Parameter '{name}' of '{procedure}' already has a matching argument.")
            }
            MappingError::NamedArgumentMatchesOmitted { name, .. } => {
                format!("Parameter '{name}' in '{procedure}' already has a matching omitted argument.")
            }
            MappingError::OmittedArgumentNotOptional { name, .. } => {
                format!("Argument for parameter '{name}' of '{procedure}' cannot be omitted.")
            }
            MappingError::ParamArrayNamed { .. } => "Named argument cannot match a ParamArray parameter.".to_string(),
            MappingError::ParamArrayOmitted { .. } => "Omitted argument cannot match a ParamArray parameter.".to_string(),
        }
    }
}

/// Match `args` to `params`, in normal or expanded form.
pub fn map_arguments(params: &[ParamEntry], args: &[BoundArgument<'_>], expanded: bool) -> Result<ArgumentMap, MappingError> {
    let param_array = params.iter().position(|p| p.is_param_array);
    let expanding = expanded && param_array.is_some();
    let mut slots: Vec<Option<ParamBinding>> = vec![None; params.len()];
    let mut omitted = vec![false; params.len()];
    let mut packed: Vec<usize> = Vec::new();

    let positional = args.iter().take_while(|a| a.name.is_none()).count();
    for (i, arg) in args[..positional].iter().enumerate() {
        if expanding && param_array.is_some_and(|pa| i >= pa) {
            if arg.is_omitted() {
                return Err(MappingError::ParamArrayOmitted { arg: i });
            }
            packed.push(i);
            continue;
        }
        let Some(param) = params.get(i) else {
            return Err(MappingError::TooManyArguments);
        };
        if arg.is_omitted() {
            if param.is_param_array {
                return Err(MappingError::ParamArrayOmitted { arg: i });
            }
            if !param.is_optional {
                return Err(MappingError::OmittedArgumentNotOptional {
                    name: param.name.clone(),
                    arg: i,
                });
            }
            omitted[i] = true;
            slots[i] = Some(ParamBinding::Default);
        } else {
            slots[i] = Some(ParamBinding::Argument(i));
        }
    }

    for (i, arg) in args.iter().enumerate().skip(positional) {
        let Some(name) = arg.name else {
            // A positional argument after a named one is a syntax error the
            // parser already reported; it cannot match anything here.
            return Err(MappingError::TooManyArguments);
        };
        let Some(index) = params.iter().position(|p| p.name.eq_ignore_ascii_case(name)) else {
            return Err(MappingError::NamedArgumentNotFound {
                name: name.to_string(),
                arg: i,
            });
        };
        if params[index].is_param_array {
            return Err(MappingError::ParamArrayNamed { arg: i });
        }
        if omitted[index] {
            return Err(MappingError::NamedArgumentMatchesOmitted {
                name: params[index].name.clone(),
                arg: i,
            });
        }
        if slots[index].is_some() {
            return Err(MappingError::NamedArgumentUsedTwice {
                name: params[index].name.clone(),
                arg: i,
            });
        }
        if arg.is_omitted() {
            return Err(MappingError::OmittedArgumentNotOptional {
                name: params[index].name.clone(),
                arg: i,
            });
        }
        slots[index] = Some(ParamBinding::Argument(i));
    }

    let mut bindings = Vec::with_capacity(params.len());
    let mut defaults = 0;
    for (index, (param, slot)) in params.iter().zip(slots).enumerate() {
        let binding = match slot {
            Some(ParamBinding::Default) => {
                defaults += 1;
                ParamBinding::Default
            }
            Some(binding) => binding,
            None if param.is_param_array && Some(index) == param_array => {
                ParamBinding::Expanded(std::mem::take(&mut packed))
            }
            None if param.is_optional => {
                defaults += 1;
                ParamBinding::Default
            }
            None => return Err(MappingError::ArgumentNotSpecified(param.name.clone())),
        };
        bindings.push(binding);
    }

    Ok(ArgumentMap {
        bindings,
        expanded: expanding,
        defaults,
    })
}
