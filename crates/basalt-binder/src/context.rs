//! InterpretationContext - where an expression is being interpreted.
//!
//! The context is immutable; nested constructs derive a new one with the
//! `with_*` methods instead of mutating shared state.

use basalt_core::{DataType, TypeHash};

/// The object a `With` block's leading-dot accesses refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct WithTarget {
    pub ty: DataType,
    /// Temporary holding the evaluated `With` expression.
    pub temp: u32,
}

/// Immutable description of the code surrounding an expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpretationContext {
    /// Type whose member is being bound, if any.
    pub containing_type: Option<TypeHash>,
    /// Name of the enclosing procedure, for caller-information defaults.
    pub procedure_name: Option<String>,
    /// Source file path, for caller-information defaults.
    pub file_path: Option<String>,
    /// Enclosing namespace, outermost first.
    pub namespace: Vec<String>,
    /// Inside a `Shared` member (no `Me`).
    pub is_shared: bool,
    /// Inside an `Async` procedure or lambda.
    pub is_async: bool,
    pub with_target: Option<WithTarget>,
    /// Lambda nesting depth.
    pub lambda_depth: u32,
    /// Only locals are considered during name lookup.
    pub locals_only: bool,
    /// Locals may be referenced before their declaration.
    pub allow_forward_reference: bool,
    /// A standalone constant (attribute argument, `Const` initializer).
    pub standalone_constant: bool,
}

impl InterpretationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for code inside a member of `ty`.
    pub fn in_type(ty: TypeHash) -> Self {
        Self {
            containing_type: Some(ty),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_procedure(mut self, name: &str) -> Self {
        self.procedure_name = Some(name.to_string());
        self
    }

    pub fn with_file_path(mut self, path: &str) -> Self {
        self.file_path = Some(path.to_string());
        self
    }

    pub fn with_shared(mut self, is_shared: bool) -> Self {
        self.is_shared = is_shared;
        self
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn with_target(&self, ty: DataType, temp: u32) -> Self {
        Self {
            with_target: Some(WithTarget { ty, temp }),
            ..self.clone()
        }
    }

    /// Context for the body of a lambda nested in this context.
    pub fn enter_lambda(&self, is_async: bool) -> Self {
        Self {
            is_async,
            lambda_depth: self.lambda_depth + 1,
            ..self.clone()
        }
    }

    pub fn with_locals_only(mut self, on: bool) -> Self {
        self.locals_only = on;
        self
    }

    pub fn with_forward_reference(mut self, on: bool) -> Self {
        self.allow_forward_reference = on;
        self
    }

    /// Context for a standalone constant expression.
    pub fn standalone(&self) -> Self {
        Self {
            standalone_constant: true,
            with_target: None,
            ..self.clone()
        }
    }

    pub fn in_lambda(&self) -> bool {
        self.lambda_depth > 0
    }
}
