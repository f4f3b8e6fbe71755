//! Fixtures shared by the binder's unit tests.

use basalt_core::{CompileOptions, DataType, DiagnosticCode, DiagnosticSink, Span, TypeHash};
use basalt_symbols::{LocalScope, SymbolTable, TypeEntry};
use basalt_syntax::Expr;

use crate::binder::Binder;
use crate::bound::BoundExpr;
use crate::context::InterpretationContext;
use crate::expr::{bind_converted, bind_value};
use crate::flags::ExpressionFlags;

/// A runtime-populated table, an empty body and lenient options.
pub(crate) struct Fixture {
    pub table: SymbolTable,
    pub scope: LocalScope,
    pub options: CompileOptions,
    pub ctx: InterpretationContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::lenient())
    }

    pub fn strict() -> Self {
        Self::with_options(CompileOptions::strict())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            table: SymbolTable::with_runtime().unwrap(),
            scope: LocalScope::new(),
            options,
            ctx: InterpretationContext::new(),
        }
    }

    /// Declare a local ahead of every node an `AstBuilder` produces.
    pub fn local(&mut self, name: &str, ty: DataType) {
        self.scope.declare(name, Some(ty), Span::new(0, 1, 1)).unwrap();
    }

    /// Register a class and bind subsequent expressions inside one of its
    /// instance members.
    pub fn enter_class(&mut self, name: &str) -> TypeHash {
        let hash = self.table.register_type(TypeEntry::class(name)).unwrap();
        self.ctx = InterpretationContext::in_type(hash);
        hash
    }

    pub fn run<R>(&mut self, f: impl FnOnce(&mut Binder<'_>, &InterpretationContext) -> R) -> (R, DiagnosticSink) {
        let mut sink = DiagnosticSink::new();
        let ctx = self.ctx.clone();
        let mut binder = Binder::new(&self.table, &mut self.scope, &mut sink, &self.options);
        let result = f(&mut binder, &ctx);
        (result, sink)
    }

    pub fn bind<'ast>(&mut self, expr: &'ast Expr<'ast>) -> (BoundExpr<'ast>, DiagnosticSink) {
        self.run(|b, ctx| bind_value(b, expr, ctx).unwrap())
    }

    pub fn bind_with<'ast>(&mut self, expr: &'ast Expr<'ast>, flags: ExpressionFlags) -> (BoundExpr<'ast>, DiagnosticSink) {
        self.run(|b, ctx| crate::expr::bind_expr(b, expr, flags, ctx).unwrap())
    }

    pub fn bind_to<'ast>(&mut self, expr: &'ast Expr<'ast>, target: &DataType) -> (BoundExpr<'ast>, DiagnosticSink) {
        self.run(|b, ctx| bind_converted(b, expr, target, ctx).unwrap())
    }
}

/// Codes of every committed diagnostic, in report order.
pub(crate) fn codes(sink: &DiagnosticSink) -> Vec<DiagnosticCode> {
    sink.diagnostics().iter().map(|d| d.code).collect()
}
