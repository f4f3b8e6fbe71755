//! Compilation-mode switches consumed by the binder.
//!
//! The same conversion classification can map to three user-facing
//! severities depending on these switches; the mapping lives in
//! [`CompileOptions::narrowing_severity`] and
//! [`CompileOptions::late_binding_severity`] so that call sites never
//! re-derive it.

use bitflags::bitflags;

use crate::Severity;

bitflags! {
    /// Capabilities of the target runtime library.
    ///
    /// When a feature needs a helper the runtime does not provide, the binder
    /// reports "missing runtime support" instead of proceeding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuntimeFeatures: u32 {
        /// Late-bound member access and calls on `Object`.
        const LATE_BINDING = 1 << 0;
        /// Fixed-arity string concatenation helpers (2, 3 and 4 operands).
        const STRING_CONCAT = 1 << 1;
        /// Array-based string concatenation helper.
        const STRING_CONCAT_ARRAY = 1 << 2;
        /// `Activator`-style construction by class identifier.
        const ACTIVATOR = 1 << 3;
        /// The awaiter pattern and completion-notification interface.
        const AWAIT_PATTERN = 1 << 4;
        /// COM default-value wrappers (`Missing`, dispatch and unknown wrappers).
        const COM_WRAPPERS = 1 << 5;
        /// XML literal construction.
        const XML_LITERALS = 1 << 6;
    }
}

impl Default for RuntimeFeatures {
    fn default() -> Self {
        RuntimeFeatures::all()
    }
}

/// Switches controlling how strictly expressions are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Strict typing: implicit narrowing and late binding are errors.
    pub option_strict: bool,
    /// Explicit declaration: when false, unknown names become implicit locals.
    pub option_explicit: bool,
    /// Local type inference from initializers.
    pub option_infer: bool,
    /// Severity of implicit narrowing when strict typing is off.
    pub lenient_severity: Severity,
    /// Runtime helpers available to lowered code.
    pub runtime: RuntimeFeatures,
    /// Cache name lookups per (name, scope) within one body.
    pub declaration_caching: bool,
    /// Integral arithmetic is unchecked at run time.
    pub remove_overflow_checks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            option_strict: false,
            option_explicit: true,
            option_infer: true,
            lenient_severity: Severity::Warning,
            runtime: RuntimeFeatures::default(),
            declaration_caching: true,
            remove_overflow_checks: false,
        }
    }
}

impl CompileOptions {
    /// Strict typing on, every runtime feature available.
    pub fn strict() -> Self {
        Self {
            option_strict: true,
            ..Self::default()
        }
    }

    /// Strict typing off, warnings for implicit narrowing.
    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, on: bool) -> Self {
        self.option_strict = on;
        self
    }

    pub fn with_explicit(mut self, on: bool) -> Self {
        self.option_explicit = on;
        self
    }

    pub fn with_infer(mut self, on: bool) -> Self {
        self.option_infer = on;
        self
    }

    pub fn with_lenient_severity(mut self, severity: Severity) -> Self {
        self.lenient_severity = severity;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeFeatures) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn without_runtime(mut self, features: RuntimeFeatures) -> Self {
        self.runtime.remove(features);
        self
    }

    pub fn with_declaration_caching(mut self, on: bool) -> Self {
        self.declaration_caching = on;
        self
    }

    /// Severity of an implicit narrowing conversion.
    pub fn narrowing_severity(&self) -> Severity {
        if self.option_strict {
            Severity::Error
        } else {
            self.lenient_severity
        }
    }

    /// Severity of a late-bound member access, or `None` when the runtime
    /// cannot late bind at all.
    pub fn late_binding_severity(&self) -> Option<Severity> {
        if self.option_strict {
            Some(Severity::Error)
        } else if self.runtime.contains(RuntimeFeatures::LATE_BINDING) {
            Some(self.lenient_severity)
        } else {
            None
        }
    }

    /// Whether late-bound operations may be produced at all.
    pub fn allows_late_binding(&self) -> bool {
        !self.option_strict && self.runtime.contains(RuntimeFeatures::LATE_BINDING)
    }

    /// Whether unknown names may become implicit locals.
    pub fn allows_implicit_declaration(&self) -> bool {
        !self.option_explicit
    }
}
