//! Binder - state shared by every expression form.
//!
//! The [`Binder`] borrows the host's symbol table, the locals of the body
//! being bound, the diagnostic sink and the compile options. It owns only
//! per-body bookkeeping: the declaration cache, the temporary counter and
//! the speculation depth.
//!
//! # Speculation
//!
//! Overload resolution and lambda inference bind the same syntax several
//! times against different targets. Those trial runs go through
//! [`Binder::speculate`], which routes diagnostics into a scratch table and
//! hands them back instead of committing them. [`Binder::buffered`] does the
//! same for attempts whose result may be kept.

use basalt_core::{
    CompileOptions, DataType, Diagnostic, DiagnosticCode, DiagnosticSink, Severity, Span, TypeHash,
};
use basalt_symbols::{LocalScope, SymbolTable};
use rustc_hash::FxHashMap;

use crate::conversion::{Conversion, ConversionFlags, explain};
use crate::names::{CacheKey, Lookup};

pub type Result<T> = std::result::Result<T, basalt_core::BindError>;

/// Expression binder for one body.
pub struct Binder<'a> {
    pub(crate) table: &'a SymbolTable,
    pub(crate) scope: &'a mut LocalScope,
    pub(crate) diagnostics: &'a mut DiagnosticSink,
    pub(crate) options: &'a CompileOptions,
    /// Non-local name lookups already made in this body.
    pub(crate) cache: FxHashMap<CacheKey, Lookup>,
    next_temp: u32,
    speculation_depth: u32,
}

impl<'a> Binder<'a> {
    pub fn new(
        table: &'a SymbolTable,
        scope: &'a mut LocalScope,
        diagnostics: &'a mut DiagnosticSink,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            table,
            scope,
            diagnostics,
            options,
            cache: FxHashMap::default(),
            next_temp: 0,
            speculation_depth: 0,
        }
    }

    pub fn table(&self) -> &'a SymbolTable {
        self.table
    }

    pub fn options(&self) -> &'a CompileOptions {
        self.options
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        self.diagnostics
    }

    pub fn scope(&self) -> &LocalScope {
        self.scope
    }

    /// Number of temporaries allocated so far.
    pub fn temp_count(&self) -> u32 {
        self.next_temp
    }

    pub(crate) fn new_temp(&mut self) -> u32 {
        let temp = self.next_temp;
        self.next_temp += 1;
        temp
    }

    /// True inside a trial run whose result will be thrown away.
    pub(crate) fn is_speculating(&self) -> bool {
        self.speculation_depth > 0
    }

    // ==========================================================================
    // Reporting
    // ==========================================================================

    /// Report a diagnostic; `Hidden` severity reports nothing.
    pub(crate) fn report(&mut self, code: DiagnosticCode, severity: Severity, span: Span, message: impl Into<String>) {
        if severity == Severity::Hidden {
            return;
        }
        self.diagnostics.report(Diagnostic::new(code, severity, span, message));
    }

    pub(crate) fn error(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.report(code, Severity::Error, span, message);
    }

    pub(crate) fn warning(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.report(code, Severity::Warning, span, message);
    }

    /// Source-style spelling of a type.
    pub(crate) fn display(&self, ty: &DataType) -> String {
        self.table.display_type(&self.table.normalize(ty.clone()))
    }

    /// Name of a declared type, for messages.
    pub(crate) fn type_name(&self, hash: TypeHash) -> String {
        self.table
            .get_type(hash)
            .map(|t| t.qualified_name.clone())
            .unwrap_or_else(|| format!("{hash:?}"))
    }

    /// Report what an implicit conversion means under the current options.
    ///
    /// Returns `false` when the conversion was reported as an error.
    pub(crate) fn report_implicit_conversion(
        &mut self,
        conversion: &Conversion,
        source: &DataType,
        target: &DataType,
        span: Span,
    ) -> bool {
        if conversion.is_error() {
            let (code, message) = explain(self.table, source, target);
            self.error(code, span, message);
            return false;
        }
        if conversion.flags.contains(ConversionFlags::AMBIGUOUS) {
            let message = format!(
                "Conversion from '{}' to '{}' is ambiguous between several user-defined operators; it is treated as narrowing.",
                self.display(source),
                self.display(target)
            );
            self.warning(DiagnosticCode::AmbiguousConversion, span, message);
        }
        if !conversion.is_narrowing() {
            return true;
        }

        let severity = self.options.narrowing_severity();
        let (s, t) = (self.display(source), self.display(target));
        let code = if source.is_object() {
            DiagnosticCode::LateBoundObjectConversion
        } else {
            DiagnosticCode::NarrowingConversion
        };
        let message = if severity == Severity::Error {
            format!("Option Strict On disallows implicit conversions from '{s}' to '{t}'.")
        } else {
            format!("Implicit conversion from '{s}' to '{t}'.")
        };
        self.report(code, severity, span, message);
        severity != Severity::Error
    }

    /// Report a late-bound operation under the current options.
    ///
    /// Returns `false` when late binding is not possible here.
    pub(crate) fn report_late_binding(&mut self, what: &str, span: Span) -> bool {
        match self.options.late_binding_severity() {
            None => {
                self.error(
                    DiagnosticCode::MissingRuntimeSupport,
                    span,
                    format!("Late binding of {what} requires run-time support that is not available."),
                );
                false
            }
            Some(Severity::Error) => {
                self.error(
                    DiagnosticCode::LateBindingDisallowed,
                    span,
                    format!("Option Strict On disallows late binding of {what}."),
                );
                false
            }
            Some(severity) => {
                self.report(
                    DiagnosticCode::LateBinding,
                    severity,
                    span,
                    format!("Late bound resolution of {what}; runtime errors could occur."),
                );
                true
            }
        }
    }

    /// Report a construct whose lowering needs a runtime helper the target
    /// runtime does not provide.
    pub(crate) fn report_missing_runtime(&mut self, what: &str, span: Span) {
        self.error(
            DiagnosticCode::MissingRuntimeSupport,
            span,
            format!("{what} requires run-time support that is not available."),
        );
    }

    // ==========================================================================
    // Speculation
    // ==========================================================================

    /// Run `f` as a trial: its diagnostics are returned, never committed,
    /// it declares nothing implicitly, and locals, captures and temporaries
    /// it creates are rolled back.
    pub(crate) fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, Vec<Diagnostic>) {
        let scope = self.scope.clone();
        let next_temp = self.next_temp;
        self.speculation_depth += 1;
        self.diagnostics.push_scratch();
        let result = f(self);
        let diagnostics = self.diagnostics.pop_discard();
        self.speculation_depth -= 1;
        *self.scope = scope;
        self.next_temp = next_temp;
        tracing::trace!(discarded = diagnostics.len(), "speculative binding finished");
        (result, diagnostics)
    }

    /// Run `f` with its diagnostics held back; the caller commits them with
    /// [`commit`](Self::commit) if it keeps the result.
    pub(crate) fn buffered<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, Vec<Diagnostic>) {
        self.diagnostics.push_scratch();
        let result = f(self);
        (result, self.diagnostics.pop_discard())
    }

    pub(crate) fn commit(&mut self, diagnostics: Vec<Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Record the scratch and speculation depth before a top-level bind.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            scratch_depth: self.diagnostics.scratch_depth(),
            speculation_depth: self.speculation_depth,
        }
    }

    /// Return to `checkpoint` after a bind was abandoned part way through.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.diagnostics.unwind_to(checkpoint.scratch_depth);
        self.speculation_depth = checkpoint.speculation_depth;
    }
}

/// Diagnostic nesting state saved by [`Binder::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    scratch_depth: usize,
    speculation_depth: u32,
}

/// `namespace.name`, or `name` in the global namespace.
pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionClass, ConversionKind};

    fn setup() -> (SymbolTable, LocalScope, DiagnosticSink) {
        (SymbolTable::with_runtime().unwrap(), LocalScope::new(), DiagnosticSink::new())
    }

    #[test]
    fn speculation_discards_diagnostics() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::default();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        let (value, diags) = binder.speculate(|b| {
            assert!(b.is_speculating());
            b.error(DiagnosticCode::Overflow, Span::new(1, 1, 1), "x");
            7
        });
        assert_eq!(value, 7);
        assert_eq!(diags.len(), 1);
        assert!(!binder.is_speculating());
        assert!(sink.is_empty());
    }

    #[test]
    fn speculation_rolls_back_locals_and_temporaries() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::default();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        binder.speculate(|b| {
            b.scope.push_lambda();
            b.scope.declare_parameter("x", DataType::integer(), false, Span::new(1, 1, 1)).unwrap();
            b.new_temp();
        });
        assert_eq!(binder.temp_count(), 0);
        assert_eq!(binder.scope().local_count(), 0);
        assert_eq!(binder.scope().lambda_depth(), 0);
    }

    #[test]
    fn buffered_diagnostics_commit_on_request() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::default();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        let ((), diags) = binder.buffered(|b| b.warning(DiagnosticCode::LateBinding, Span::new(1, 1, 1), "x"));
        assert!(binder.diagnostics().is_empty());
        binder.commit(diags);
        assert!(sink.contains(DiagnosticCode::LateBinding));
    }

    #[test]
    fn narrowing_severity_follows_options() {
        let (table, mut scope, mut sink) = setup();
        let narrowing = Conversion::new(ConversionClass::Narrowing, ConversionKind::Primitive);
        let strict = CompileOptions::strict();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &strict);
        let ok = binder.report_implicit_conversion(&narrowing, &DataType::long(), &DataType::integer(), Span::new(1, 1, 1));
        assert!(!ok);
        assert_eq!(sink.errors().count(), 1);

        let (table, mut scope, mut sink) = setup();
        let hidden = CompileOptions::lenient().with_lenient_severity(Severity::Hidden);
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &hidden);
        assert!(binder.report_implicit_conversion(&narrowing, &DataType::long(), &DataType::integer(), Span::new(1, 1, 1)));
        assert!(sink.is_empty());
    }

    #[test]
    fn late_binding_gating() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::lenient().without_runtime(basalt_core::RuntimeFeatures::LATE_BINDING);
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        assert!(!binder.report_late_binding("'Foo'", Span::new(1, 1, 1)));
        assert!(sink.contains(DiagnosticCode::MissingRuntimeSupport));
    }

    #[test]
    fn restore_closes_abandoned_scratch_tables() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::default();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        let checkpoint = binder.checkpoint();
        binder.diagnostics.push_scratch();
        binder.speculation_depth += 1;
        binder.restore(checkpoint);
        assert!(!binder.is_speculating());
        assert!(!binder.diagnostics().is_speculating());
    }

    #[test]
    fn temporaries_are_numbered_in_order() {
        let (table, mut scope, mut sink) = setup();
        let options = CompileOptions::default();
        let mut binder = Binder::new(&table, &mut scope, &mut sink, &options);
        assert_eq!(binder.new_temp(), 0);
        assert_eq!(binder.new_temp(), 1);
        assert_eq!(binder.temp_count(), 2);
    }
}
