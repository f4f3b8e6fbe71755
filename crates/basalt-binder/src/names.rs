//! Name resolution.
//!
//! A simple name is looked up, in order:
//!
//! 1. Locals and parameters (recording lambda captures)
//! 2. Members of the containing type and its bases
//! 3. Types, standard-module members and child namespaces of the current
//!    namespace, innermost first, ending at the global namespace
//! 4. The same in every imported namespace
//!
//! Non-local results are cached per body under (name, arity, containing
//! type, namespace). When nothing binds, [`report_unresolved`] runs the
//! fallback diagnosis: XML prefixes, a relaxed-arity retry, removed
//! keywords, implicit declaration, then "not declared".

use basalt_core::{DataType, DiagnosticCode, Severity, Span, TypeHash};
use basalt_symbols::{MemberRef, TypeEntry, VarLookup, fold_name};

use crate::binder::{Binder, qualify};
use crate::context::InterpretationContext;

/// Key of one cached non-local lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    arity: usize,
    containing_type: Option<TypeHash>,
    namespace: String,
}

/// What a non-local name denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Members of the containing type (or its bases).
    TypeMembers(Vec<MemberRef>),
    /// Members of standard modules promoted into a namespace.
    ModuleMembers(Vec<MemberRef>),
    Type(TypeHash),
    Namespace(String),
    /// Several imports supply the name; holds their qualified spellings.
    Ambiguous(Vec<String>),
    NotFound,
}

/// What a simple name denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum NameResolution {
    Local(VarLookup),
    Symbol(Lookup),
}

/// Resolve a simple name with `arity` type arguments.
pub(crate) fn resolve_name(
    b: &mut Binder<'_>,
    name: &str,
    arity: usize,
    ctx: &InterpretationContext,
) -> NameResolution {
    if arity == 0
        && let Some(local) = b.scope.lookup(name)
    {
        return NameResolution::Local(local);
    }
    if ctx.locals_only {
        return NameResolution::Symbol(Lookup::NotFound);
    }
    NameResolution::Symbol(lookup_symbol(b, name, arity, ctx))
}

/// Look a name up outside the locals, through the declaration cache.
pub(crate) fn lookup_symbol(b: &mut Binder<'_>, name: &str, arity: usize, ctx: &InterpretationContext) -> Lookup {
    let caching = b.options.declaration_caching && !ctx.standalone_constant;
    let key = CacheKey {
        name: fold_name(name),
        arity,
        containing_type: ctx.containing_type,
        namespace: ctx.namespace.join("."),
    };
    if caching && let Some(found) = b.cache.get(&key) {
        return found.clone();
    }

    let found = lookup_uncached(b, name, arity, ctx);
    if caching {
        b.cache.insert(key, found.clone());
    }
    found
}

fn lookup_uncached(b: &Binder<'_>, name: &str, arity: usize, ctx: &InterpretationContext) -> Lookup {
    let table = b.table;

    if let Some(entry) = ctx.containing_type.and_then(|h| table.get_type(h)) {
        let members: Vec<MemberRef> = table
            .lookup_member(&entry.self_type(), name)
            .into_iter()
            .filter(|m| !matches!(m, MemberRef::Type(h) if table.get_type(*h).is_some_and(|t| t.arity() != arity)))
            .collect();
        if !members.is_empty() {
            return Lookup::TypeMembers(members);
        }
    }

    for namespace in namespace_chain(ctx) {
        if let Some(found) = lookup_in_namespace(b, &namespace, name, arity) {
            return found;
        }
    }

    let mut imported: Vec<Lookup> = Vec::new();
    for import in table.imports() {
        if let Some(found) = lookup_in_namespace(b, import, name, arity)
            && !imported.contains(&found)
        {
            imported.push(found);
        }
    }
    match imported.len() {
        0 => Lookup::NotFound,
        1 => imported.pop().unwrap_or(Lookup::NotFound),
        _ => Lookup::Ambiguous(imported.iter().map(|l| describe(b, l)).collect()),
    }
}

/// The current namespace and each enclosing one, innermost first, ending
/// with the global namespace.
pub(crate) fn namespace_chain(ctx: &InterpretationContext) -> Vec<String> {
    (0..=ctx.namespace.len())
        .rev()
        .map(|i| ctx.namespace[..i].join("."))
        .collect()
}

fn lookup_in_namespace(b: &Binder<'_>, namespace: &str, name: &str, arity: usize) -> Option<Lookup> {
    let table = b.table;
    if let Some(entry) = table.type_by_name(&qualify(namespace, name), arity) {
        return Some(Lookup::Type(entry.hash));
    }
    let members = table.module_members(namespace, name);
    if !members.is_empty() {
        return Some(Lookup::ModuleMembers(members));
    }
    if arity == 0 {
        return table.child_namespace(namespace, name).map(Lookup::Namespace);
    }
    None
}

fn describe(b: &Binder<'_>, lookup: &Lookup) -> String {
    match lookup {
        Lookup::Type(h) => b.type_name(*h),
        Lookup::Namespace(ns) => ns.clone(),
        Lookup::ModuleMembers(members) | Lookup::TypeMembers(members) => members
            .first()
            .and_then(|m| b.table.member_access(*m))
            .map(|(_, owner)| b.type_name(owner))
            .unwrap_or_default(),
        Lookup::Ambiguous(names) => names.join(", "),
        Lookup::NotFound => String::new(),
    }
}

/// `List(Of T)`: a generic definition as written in messages.
pub(crate) fn generic_definition(entry: &TypeEntry) -> String {
    if entry.generic_params.is_empty() {
        return entry.qualified_name.clone();
    }
    let params: Vec<&str> = entry.generic_params.iter().map(|p| p.name.as_str()).collect();
    format!("{}(Of {})", entry.qualified_name, params.join(", "))
}

// ============================================================================
// Fallback diagnosis
// ============================================================================

/// Keywords of earlier language versions and what replaced them.
const REMOVED_KEYWORDS: &[(&str, DiagnosticCode, &str)] = &[
    (
        "Variant",
        DiagnosticCode::ObsoleteKeyword,
        "'Variant' is no longer a supported type; use the 'Object' type instead.",
    ),
    (
        "Currency",
        DiagnosticCode::ObsoleteKeyword,
        "'Currency' is no longer a supported type; use the 'Decimal' type instead.",
    ),
    (
        "Empty",
        DiagnosticCode::ObsoleteKeyword,
        "'Empty' is no longer supported; use 'Nothing' instead.",
    ),
    (
        "Null",
        DiagnosticCode::ObsoleteKeyword,
        "'Null' is no longer supported; use 'System.DBNull' instead.",
    ),
    (
        "Let",
        DiagnosticCode::ObsoleteKeywordRemoved,
        "'Let' and 'Set' assignment statements are no longer supported.",
    ),
    (
        "Set",
        DiagnosticCode::ObsoleteKeywordRemoved,
        "'Let' and 'Set' assignment statements are no longer supported.",
    ),
    (
        "GoSub",
        DiagnosticCode::ObsoleteKeywordRemoved,
        "'GoSub' statements are no longer supported.",
    ),
];

/// Outcome of the fallback diagnosis for a name that bound to nothing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Unresolved {
    /// An implicit local was declared; bind the name again.
    Declared,
    /// A diagnostic was reported.
    Reported,
}

/// Diagnose a name that bound to nothing, or declare it implicitly when the
/// options allow it.
pub(crate) fn report_unresolved(
    b: &mut Binder<'_>,
    name: &str,
    arity: usize,
    span: Span,
    allow_implicit: bool,
    ctx: &InterpretationContext,
) -> Unresolved {
    if b.table.is_xml_prefix(name) {
        b.error(
            DiagnosticCode::XmlPrefixUsedAsValue,
            span,
            format!("XML namespace prefix '{name}' cannot be used as an expression."),
        );
        return Unresolved::Reported;
    }

    if report_arity_mismatch(b, name, arity, span, ctx) {
        return Unresolved::Reported;
    }

    if let Some((_, code, message)) = REMOVED_KEYWORDS.iter().find(|(k, _, _)| k.eq_ignore_ascii_case(name)) {
        b.error(*code, span, *message);
        return Unresolved::Reported;
    }

    if allow_implicit
        && arity == 0
        && b.options.allows_implicit_declaration()
        && !ctx.standalone_constant
        && !ctx.locals_only
        && b.scope.declare_implicit(name, DataType::Object, span).is_ok()
    {
        let severity = match b.options.lenient_severity {
            Severity::Hidden => Severity::Hidden,
            _ => Severity::Warning,
        };
        b.report(
            DiagnosticCode::ImplicitDeclaration,
            severity,
            span,
            format!("Variable '{name}' is declared implicitly as 'Object'."),
        );
        tracing::debug!(name, "implicit local declared");
        return Unresolved::Declared;
    }

    b.error(DiagnosticCode::NameNotDeclared, span, format!("'{name}' is not declared."));
    Unresolved::Reported
}

/// Retry the lookup ignoring arity; report a type-argument count error if
/// a type of another arity exists.
fn report_arity_mismatch(
    b: &mut Binder<'_>,
    name: &str,
    arity: usize,
    span: Span,
    ctx: &InterpretationContext,
) -> bool {
    let mut scopes = namespace_chain(ctx);
    scopes.extend(b.table.imports().iter().cloned());
    let Some(entry) = scopes
        .iter()
        .find_map(|ns| b.table.types_named(&qualify(ns, name)).find(|t| t.arity() != arity))
    else {
        return false;
    };
    report_type_argument_count(b, entry, arity, span);
    true
}

/// Report a wrong number of type arguments for `entry`.
pub(crate) fn report_type_argument_count(b: &mut Binder<'_>, entry: &TypeEntry, supplied: usize, span: Span) {
    let shown = generic_definition(entry);
    if entry.arity() == 0 {
        b.error(
            DiagnosticCode::NotGeneric,
            span,
            format!("'{shown}' has no type parameters and so cannot have type arguments."),
        );
    } else if supplied < entry.arity() {
        b.error(
            DiagnosticCode::TooFewTypeArguments,
            span,
            format!("Too few type arguments to '{shown}'."),
        );
    } else {
        b.error(
            DiagnosticCode::TooManyTypeArguments,
            span,
            format!("Too many type arguments to '{shown}'."),
        );
    }
}

/// Report an ambiguous imported name.
pub(crate) fn report_ambiguous(b: &mut Binder<'_>, name: &str, sources: &[String], span: Span) {
    b.error(
        DiagnosticCode::NameAmbiguous,
        span,
        format!(
            "'{name}' is ambiguous, imported from the namespaces or types '{}'.",
            sources.join(", ")
        ),
    );
}
