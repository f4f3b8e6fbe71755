//! Basalt: the expression-binding core of a Visual Basic compiler front end.
//!
//! A [`Session`] holds the symbol table and compile options for one
//! compilation. Each procedure body gets a [`Body`] with its own locals and
//! diagnostics, and expressions are bound through it:
//!
//! ```ignore
//! let session = Session::new(CompileOptions::strict())?;
//! let mut body = session.body(InterpretationContext::new());
//! let bound = body.expression(expr, ExpressionFlags::VALUE, None);
//! ```
//!
//! The individual phases are available as `basalt::core`, `basalt::syntax`,
//! `basalt::symbols` and `basalt::binder`.

pub use basalt_binder as binder;
pub use basalt_core as core;
pub use basalt_symbols as symbols;
pub use basalt_syntax as syntax;

pub use basalt_binder::{
    Binder, BoundAttribute, BoundExpr, BoundKind, ExpressionFlags, InterpretationContext,
    interpret_attribute, interpret_constant_expression, interpret_expression,
};
pub use basalt_core::{
    BindError, CompileOptions, ConstantValue, DataType, Diagnostic, DiagnosticCode, DiagnosticSink,
    PrimitiveKind, RuntimeFeatures, Severity, Span, TypeHash,
};
pub use basalt_symbols::{LocalScope, RegistrationError, SymbolTable};
pub use basalt_syntax::{AstBuilder, AttributeExpr, Expr};

/// Symbol table and options shared by every body of a compilation.
#[derive(Debug)]
pub struct Session {
    table: SymbolTable,
    options: CompileOptions,
}

impl Session {
    /// A session whose table holds the runtime library types.
    pub fn new(options: CompileOptions) -> Result<Self, RegistrationError> {
        Ok(Self::with_table(SymbolTable::with_runtime()?, options))
    }

    pub fn with_table(table: SymbolTable, options: CompileOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Mutable access for registering declarations before binding.
    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.table
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CompileOptions) {
        self.options = options;
    }

    /// Start binding a procedure body in `ctx`.
    pub fn body(&self, ctx: InterpretationContext) -> Body<'_> {
        Body {
            session: self,
            scope: LocalScope::new(),
            diagnostics: DiagnosticSink::new(),
            ctx,
        }
    }
}

/// Locals and diagnostics of one procedure body.
#[derive(Debug)]
pub struct Body<'s> {
    session: &'s Session,
    scope: LocalScope,
    diagnostics: DiagnosticSink,
    ctx: InterpretationContext,
}

impl<'s> Body<'s> {
    pub fn context(&self) -> &InterpretationContext {
        &self.ctx
    }

    pub fn set_context(&mut self, ctx: InterpretationContext) {
        self.ctx = ctx;
    }

    pub fn scope(&self) -> &LocalScope {
        &self.scope
    }

    /// Mutable access for declaring locals and parameters.
    pub fn scope_mut(&mut self) -> &mut LocalScope {
        &mut self.scope
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_diagnostics()
    }

    /// A binder over this body, for callers that need the lower-level API.
    pub fn binder(&mut self) -> Binder<'_> {
        Binder::new(&self.session.table, &mut self.scope, &mut self.diagnostics, &self.session.options)
    }

    pub fn expression<'ast>(
        &mut self,
        expr: &'ast Expr<'ast>,
        flags: ExpressionFlags,
        target: Option<&DataType>,
    ) -> BoundExpr<'ast> {
        let ctx = self.ctx.clone();
        interpret_expression(&mut self.binder(), expr, flags, target, &ctx)
    }

    pub fn constant<'ast>(&mut self, expr: &'ast Expr<'ast>, target: Option<&DataType>) -> Option<ConstantValue> {
        let ctx = self.ctx.clone();
        interpret_constant_expression(&mut self.binder(), expr, target, &ctx)
    }

    pub fn attribute<'ast>(&mut self, attribute: &'ast AttributeExpr<'ast>) -> BoundAttribute<'ast> {
        let ctx = self.ctx.clone();
        interpret_attribute(&mut self.binder(), attribute, &ctx)
    }
}
