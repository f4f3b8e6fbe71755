//! Local scope management for procedure and lambda bodies.
//!
//! [`LocalScope`] tracks the locals and parameters visible at the current point
//! of a body. It handles:
//! - Declaration with ordinal allocation, in source order
//! - Nested block scopes with shadowing restored on exit
//! - Lambda frames and the variables they capture
//! - Implicit declarations (placed in the nearest procedure or lambda frame)
//! - The initializer stack used to detect `Dim x = f(x)` before `x` has a type

use basalt_core::{ConstantValue, DataType, Span};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::entries::fold_name;

// ============================================================================
// Types
// ============================================================================

/// Information about a local variable or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    /// Name as declared.
    pub name: String,
    /// Declared or inferred type; `None` while an inferred initializer is
    /// still being bound.
    pub ty: Option<DataType>,
    /// Declaration-order index within the body.
    pub ordinal: u32,
    /// Block depth where declared.
    pub depth: u32,
    /// Lambda nesting level where declared.
    pub lambda_depth: u32,
    pub is_const: bool,
    /// Value of a `Const` local.
    pub constant: Option<ConstantValue>,
    pub is_param: bool,
    pub by_ref: bool,
    pub is_read_only: bool,
    /// Synthesized for an undeclared name under `Option Explicit Off`.
    pub is_implicit: bool,
    /// Location of the declaration.
    pub span: Span,
}

impl LocalVar {
    fn new(name: &str, ty: Option<DataType>, span: Span) -> Self {
        Self {
            name: name.to_string(),
            ty,
            ordinal: 0,
            depth: 0,
            lambda_depth: 0,
            is_const: false,
            constant: None,
            is_param: false,
            by_ref: false,
            is_read_only: false,
            is_implicit: false,
            span,
        }
    }

    /// The variable's type, `Error` while it is still being inferred.
    pub fn data_type(&self) -> DataType {
        self.ty.clone().unwrap_or(DataType::Error)
    }
}

/// A variable captured by a lambda from an enclosing frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedVar {
    pub name: String,
    pub ordinal: u32,
    /// Lambda nesting level that captured it.
    pub lambda_depth: u32,
}

/// Result of variable lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum VarLookup {
    /// Declared in the current lambda frame (or the procedure body).
    Local(LocalVar),
    /// Declared in an enclosing frame and captured by the current lambda.
    Captured(LocalVar),
}

impl VarLookup {
    pub fn var(&self) -> &LocalVar {
        match self {
            VarLookup::Local(v) | VarLookup::Captured(v) => v,
        }
    }
}

/// A declaration that conflicts with an existing one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("at {span}: '{name}' is already declared in this block (first declared at {original})")]
    Redeclared { name: String, original: Span, span: Span },
}

// ============================================================================
// LocalScope
// ============================================================================

/// Locals of the body being bound.
#[derive(Debug, Clone, Default)]
pub struct LocalScope {
    /// Variables by folded name in the current scope chain.
    variables: FxHashMap<String, LocalVar>,

    /// Current block depth (0 = procedure body).
    scope_depth: u32,

    /// Current lambda nesting level.
    lambda_depth: u32,

    /// Block depth at which each open lambda frame started.
    lambda_frames: Vec<u32>,

    /// Variables hidden by a declaration, with the depth at which the hiding
    /// declaration was made.
    shadowed: Vec<(u32, String, LocalVar)>,

    next_ordinal: u32,

    captures: Vec<CapturedVar>,

    /// Folded names whose inferred initializer is being bound.
    initializers: Vec<String>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a nested block.
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Leave the current block, removing its declarations.
    pub fn pop_scope(&mut self) {
        let depth = self.scope_depth;
        self.variables.retain(|_, var| var.depth < depth);

        while let Some((shadowing_depth, _, _)) = self.shadowed.last() {
            if *shadowing_depth != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        self.scope_depth = depth.saturating_sub(1);
    }

    /// Enter a lambda body; its parameters are declared after this call.
    pub fn push_lambda(&mut self) {
        self.push_scope();
        self.lambda_depth += 1;
        self.lambda_frames.push(self.scope_depth);
    }

    /// Leave a lambda body, returning the variables it captured.
    pub fn pop_lambda(&mut self) -> Vec<CapturedVar> {
        let depth = self.lambda_depth;
        let (captured, kept): (Vec<_>, Vec<_>) = self.captures.drain(..).partition(|c| c.lambda_depth == depth);
        self.captures = kept;
        self.lambda_frames.pop();
        self.lambda_depth = depth.saturating_sub(1);
        self.pop_scope();
        captured
    }

    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    pub fn lambda_depth(&self) -> u32 {
        self.lambda_depth
    }

    // ==========================================================================
    // Declaration
    // ==========================================================================

    fn insert(&mut self, mut var: LocalVar, depth: u32) -> Result<u32, ScopeError> {
        let key = fold_name(&var.name);
        if let Some(existing) = self.variables.get(&key) {
            if existing.depth == depth {
                return Err(ScopeError::Redeclared {
                    name: var.name,
                    original: existing.span,
                    span: var.span,
                });
            }
            self.shadowed.push((depth, key.clone(), existing.clone()));
        }

        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        var.ordinal = ordinal;
        var.depth = depth;
        var.lambda_depth = self.lambda_depth;
        self.variables.insert(key, var);
        Ok(ordinal)
    }

    /// Declare a local in the current block.
    ///
    /// `ty` is `None` for a local whose type is inferred from its initializer;
    /// set it afterwards with [`set_inferred_type`](Self::set_inferred_type).
    pub fn declare(&mut self, name: &str, ty: Option<DataType>, span: Span) -> Result<u32, ScopeError> {
        self.insert(LocalVar::new(name, ty, span), self.scope_depth)
    }

    /// Declare a `Const` local.
    pub fn declare_const(
        &mut self,
        name: &str,
        ty: DataType,
        value: ConstantValue,
        span: Span,
    ) -> Result<u32, ScopeError> {
        let var = LocalVar {
            is_const: true,
            is_read_only: true,
            constant: Some(value),
            ..LocalVar::new(name, Some(ty), span)
        };
        self.insert(var, self.scope_depth)
    }

    /// Declare a parameter of the procedure or current lambda.
    pub fn declare_parameter(&mut self, name: &str, ty: DataType, by_ref: bool, span: Span) -> Result<u32, ScopeError> {
        let var = LocalVar {
            is_param: true,
            by_ref,
            ..LocalVar::new(name, Some(ty), span)
        };
        self.insert(var, self.scope_depth)
    }

    /// Declare a read-only range variable (query iteration variable).
    pub fn declare_read_only(&mut self, name: &str, ty: DataType, span: Span) -> Result<u32, ScopeError> {
        let var = LocalVar {
            is_read_only: true,
            ..LocalVar::new(name, Some(ty), span)
        };
        self.insert(var, self.scope_depth)
    }

    /// Synthesize an implicit local in the nearest procedure or lambda frame.
    pub fn declare_implicit(&mut self, name: &str, ty: DataType, span: Span) -> Result<u32, ScopeError> {
        let depth = self.lambda_frames.last().copied().unwrap_or(0);
        let var = LocalVar {
            is_implicit: true,
            ..LocalVar::new(name, Some(ty), span)
        };
        self.insert(var, depth)
    }

    /// Record the type inferred for a local declared without one.
    pub fn set_inferred_type(&mut self, name: &str, ty: DataType) {
        if let Some(var) = self.variables.get_mut(&fold_name(name)) {
            var.ty = Some(ty);
        }
    }

    // ==========================================================================
    // Initializer Tracking
    // ==========================================================================

    /// Mark `name`'s initializer as being bound.
    pub fn begin_initializer(&mut self, name: &str) {
        self.initializers.push(fold_name(name));
    }

    pub fn end_initializer(&mut self) {
        self.initializers.pop();
    }

    /// True if `name` is referenced from inside its own inferred initializer.
    pub fn is_initializing(&self, name: &str) -> bool {
        let key = fold_name(name);
        self.initializers.iter().any(|n| *n == key)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Look up a variable without recording a capture.
    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(&fold_name(name))
    }

    /// Look up a variable, recording a capture if it belongs to an enclosing
    /// lambda frame.
    pub fn lookup(&mut self, name: &str) -> Option<VarLookup> {
        let var = self.variables.get(&fold_name(name))?.clone();
        if var.lambda_depth == self.lambda_depth {
            return Some(VarLookup::Local(var));
        }

        for depth in (var.lambda_depth + 1)..=self.lambda_depth {
            let already = self
                .captures
                .iter()
                .any(|c| c.lambda_depth == depth && c.ordinal == var.ordinal);
            if !already {
                self.captures.push(CapturedVar {
                    name: var.name.clone(),
                    ordinal: var.ordinal,
                    lambda_depth: depth,
                });
            }
        }
        Some(VarLookup::Captured(var))
    }

    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.depth == self.scope_depth)
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// Variables captured by the current lambda so far.
    pub fn captures(&self) -> impl Iterator<Item = &CapturedVar> {
        let depth = self.lambda_depth;
        self.captures.iter().filter(move |c| c.lambda_depth == depth)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
        self.variables.values()
    }

    /// Number of locals declared in the body so far.
    pub fn local_count(&self) -> u32 {
        self.next_ordinal
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_variable() {
        let mut scope = LocalScope::new();
        let ordinal = scope.declare("x", Some(DataType::integer()), Span::default()).unwrap();
        assert_eq!(ordinal, 0);
        let var = scope.get("X").unwrap();
        assert_eq!(var.data_type(), DataType::integer());
        assert!(!var.is_implicit);
    }

    #[test]
    fn redeclaration_error() {
        let mut scope = LocalScope::new();
        scope.declare("x", Some(DataType::integer()), Span::new(1, 1, 1)).unwrap();
        let result = scope.declare("X", Some(DataType::integer()), Span::new(2, 1, 1));
        assert!(matches!(result, Err(ScopeError::Redeclared { original, .. }) if original == Span::new(1, 1, 1)));
    }

    #[test]
    fn shadowing_restored_on_pop() {
        let mut scope = LocalScope::new();
        scope.declare("x", Some(DataType::integer()), Span::default()).unwrap();
        scope.push_scope();
        scope.declare("x", Some(DataType::string()), Span::default()).unwrap();
        assert_eq!(scope.get("x").unwrap().data_type(), DataType::string());
        scope.pop_scope();
        assert_eq!(scope.get("x").unwrap().data_type(), DataType::integer());
    }

    #[test]
    fn pop_removes_block_locals() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare("x", Some(DataType::integer()), Span::default()).unwrap();
        scope.pop_scope();
        assert!(scope.get("x").is_none());
        assert_eq!(scope.local_count(), 1);
    }

    #[test]
    fn lambda_captures_outer_local() {
        let mut scope = LocalScope::new();
        scope.declare("total", Some(DataType::integer()), Span::default()).unwrap();
        scope.push_lambda();
        scope.declare_parameter("n", DataType::integer(), false, Span::default()).unwrap();

        assert!(matches!(scope.lookup("n"), Some(VarLookup::Local(_))));
        assert!(matches!(scope.lookup("total"), Some(VarLookup::Captured(_))));
        scope.lookup("total");
        assert_eq!(scope.captures().count(), 1);

        let captured = scope.pop_lambda();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].name, "total");
        assert!(scope.get("n").is_none());
    }

    #[test]
    fn implicit_goes_to_lambda_frame() {
        let mut scope = LocalScope::new();
        scope.push_lambda();
        scope.push_scope();
        scope.declare_implicit("tmp", DataType::Object, Span::default()).unwrap();
        scope.pop_scope();
        assert!(scope.get("tmp").is_some_and(|v| v.is_implicit));
        scope.pop_lambda();
        assert!(scope.get("tmp").is_none());
    }

    #[test]
    fn inferred_initializer_tracking() {
        let mut scope = LocalScope::new();
        scope.declare("x", None, Span::default()).unwrap();
        scope.begin_initializer("x");
        assert!(scope.is_initializing("X"));
        assert_eq!(scope.get("x").unwrap().data_type(), DataType::Error);
        scope.end_initializer();
        scope.set_inferred_type("x", DataType::long());
        assert!(!scope.is_initializing("x"));
        assert_eq!(scope.get("x").unwrap().data_type(), DataType::long());
    }

    #[test]
    fn const_local_keeps_value() {
        let mut scope = LocalScope::new();
        scope
            .declare_const("k", DataType::integer(), ConstantValue::integer(3), Span::default())
            .unwrap();
        let var = scope.get("k").unwrap();
        assert!(var.is_const && var.is_read_only);
        assert_eq!(var.constant, Some(ConstantValue::integer(3)));
    }
}
