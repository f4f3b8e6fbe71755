//! User-facing diagnostics and the sink that collects them.
//!
//! Semantic problems in user code are never returned as `Err`; they are
//! reported into a [`DiagnosticSink`] and the offending bound node is marked
//! bad. The sink supports a strictly nested scratch protocol used for
//! speculative binding:
//!
//! ```
//! use basalt_core::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity, Span};
//!
//! let mut sink = DiagnosticSink::new();
//! sink.push_scratch();
//! sink.report(Diagnostic::new(DiagnosticCode::NameNotDeclared, Severity::Error, Span::new(1, 1, 1), "'x' is not declared"));
//! let discarded = sink.pop_discard();
//! assert_eq!(discarded.len(), 1);
//! assert!(sink.is_empty());
//! ```

use std::fmt;

use num_enum::IntoPrimitive;

use crate::Span;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Recorded but not shown to the user.
    Hidden,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hidden => f.write_str("hidden"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Stable numeric identity of every diagnostic this core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive)]
#[repr(u32)]
pub enum DiagnosticCode {
    // Constant evaluation
    Overflow = 30439,
    ZeroDivide = 30542,
    RequiresConstant = 30059,

    // Conversions
    NarrowingConversion = 30512,
    NoConversion = 30311,
    AmbiguousConversion = 30526,
    ArrayElementMismatch = 30332,
    ArrayRankMismatch = 30414,
    ArrayNotCovariant = 30333,
    VarianceArgumentMismatch = 36754,
    VarianceNotDeclared = 36755,
    VarianceTryInterface = 36757,
    LateBoundObjectConversion = 42016,
    TypeOfNeverSucceeds = 31430,
    TryCastNeedsReference = 30792,
    DirectCastInvalid = 30313,
    OperatorNotDefined = 30452,
    ReferenceOperandRequired = 30020,

    // Names
    NameNotDeclared = 30451,
    TypeNotDefined = 30002,
    NullableRequiresValueType = 33101,
    NameAmbiguous = 30562,
    Inaccessible = 30389,
    TypeUsedAsValue = 30108,
    ValueUsedAsType = 30182,
    NamespaceUsedAsValue = 30112,
    XmlPrefixUsedAsValue = 31148,
    UsedBeforeDeclaration = 32000,
    CircularInference = 30980,
    ObsoleteKeyword = 30804,
    ObsoleteKeywordRemoved = 30828,
    TooFewTypeArguments = 32042,
    TooManyTypeArguments = 32043,
    NotGeneric = 32045,
    ImplicitDeclaration = 42104,
    MeInSharedContext = 30043,
    MeNotAllowedHere = 30044,
    InstanceMemberRequiresObject = 30469,
    SharedMemberThroughInstance = 42025,
    MemberNotFound = 30456,
    WithMemberOutsideWith = 30157,

    // Overload resolution and arguments
    NoApplicableOverload = 30518,
    AmbiguousOverload = 30521,
    NarrowingOverload = 30519,
    TooManyArguments = 30057,
    ArgumentNotSpecified = 30455,
    NamedArgumentNotFound = 30272,
    NamedArgumentUsedTwice = 30274,
    NamedArgumentMatchesOmitted = 30241,
    OmittedArgumentNotOptional = 30293,
    TypeInferenceFailed = 36645,
    InferredObject = 42020,
    NotInvocable = 30454,
    NotIndexable = 30367,
    IndexCountMismatch = 30106,
    ExpressionHasNoValue = 30491,
    NotAssignable = 30068,
    ReadOnlyTarget = 30074,

    // Late binding
    LateBindingDisallowed = 30574,
    LateBinding = 42017,

    // Await
    AwaitOutsideAsync = 37058,
    NotAwaitable = 36930,
    AwaiterMemberShared = 36931,
    AwaiterIsCompletedInvalid = 36932,
    AwaiterGetResultInvalid = 36933,
    AwaiterMissingNotifyCompletion = 36934,

    // Array literals and collections
    NoDominantType = 36717,
    ObjectAssumedForArray = 42215,
    EmptyArrayLiteral = 36726,
    ArrayInitializerLengthMismatch = 30567,
    NotACollection = 36718,
    CollectionAddArity = 36719,

    // Construction, lambdas, delegates
    NewOnAbstractType = 30375,
    LambdaParameterMismatch = 36670,
    NotDelegateType = 36625,
    AddressOfNoMatch = 31143,

    // Attributes
    NotAttributeClass = 31504,
    AttributeConstructorNotPublic = 30517,
    AttributeIllegalType = 30045,
    AttributeArrayElementOmitted = 30306,

    // Queries and XML
    QueryOperatorNotFound = 36593,
    XmlPrefixNotDefined = 31146,

    // Infrastructure
    MissingRuntimeSupport = 35000,
    InternalError = 30000,
}

impl DiagnosticCode {
    /// Numeric code, as shown to the user.
    pub fn number(self) -> u32 {
        self.into()
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, severity: Severity, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            span,
            message: message.into(),
        }
    }

    pub fn error(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, span, message)
    }

    pub fn warning(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, span, message)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} BC{}: {}",
            self.span,
            self.severity,
            self.code.number(),
            self.message
        )
    }
}

/// Append-only diagnostic storage with nested scratch tables.
///
/// While at least one scratch table is open, reports go to the innermost
/// table. Each `push_scratch` must be balanced by exactly one of
/// [`pop_merge`](Self::pop_merge) or [`pop_discard`](Self::pop_discard).
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    committed: Vec<Diagnostic>,
    scratch: Vec<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic in the innermost open table.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match self.scratch.last_mut() {
            Some(table) => table.push(diagnostic),
            None => self.committed.push(diagnostic),
        }
    }

    /// Record several diagnostics in order.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    /// Open a new scratch table.
    pub fn push_scratch(&mut self) {
        self.scratch.push(Vec::new());
    }

    /// Close the innermost scratch table, appending its contents to the
    /// enclosing table. Returns how many diagnostics were merged.
    pub fn pop_merge(&mut self) -> usize {
        let table = self.scratch.pop().unwrap_or_default();
        let count = table.len();
        match self.scratch.last_mut() {
            Some(outer) => outer.extend(table),
            None => self.committed.extend(table),
        }
        count
    }

    /// Close the innermost scratch table and hand its contents back.
    pub fn pop_discard(&mut self) -> Vec<Diagnostic> {
        self.scratch.pop().unwrap_or_default()
    }

    /// Number of open scratch tables.
    #[inline]
    pub fn scratch_depth(&self) -> usize {
        self.scratch.len()
    }

    /// Discard every scratch table opened above `depth`.
    ///
    /// Used to restore stack discipline after an unwinding failure.
    pub fn unwind_to(&mut self, depth: usize) {
        self.scratch.truncate(depth);
    }

    /// Whether reports currently go to a scratch table.
    #[inline]
    pub fn is_speculating(&self) -> bool {
        !self.scratch.is_empty()
    }

    /// Diagnostics in the innermost open table.
    pub fn current(&self) -> &[Diagnostic] {
        self.scratch.last().map(Vec::as_slice).unwrap_or(&self.committed)
    }

    /// Errors in the innermost open table.
    pub fn current_error_count(&self) -> usize {
        self.current().iter().filter(|d| d.is_error()).count()
    }

    /// All committed diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.committed
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.committed
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.committed.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.committed
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Whether a committed diagnostic with this code exists.
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.committed.iter().any(|d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }
}
