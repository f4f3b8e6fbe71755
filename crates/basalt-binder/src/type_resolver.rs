//! Type resolution for converting syntax type references to semantic types.
//!
//! [`TypeResolver`] turns a [`TypeExpr`] into a [`DataType`]:
//!
//! - Primitive keywords and `Object`
//! - Named types, qualified or not, through the namespace chain and imports
//! - Generic parameters of the containing type
//! - Generic instantiations, with type-argument count checks
//! - Arrays of any rank and nullable `T?` wrappers
//!
//! Failures are reported and resolve to [`DataType::Error`], which every
//! later check treats as already diagnosed.

use basalt_core::{DataType, DiagnosticCode, Span};
use basalt_syntax::{Ident, TypeExpr};

use crate::binder::{Binder, qualify};
use crate::context::InterpretationContext;
use crate::names::{generic_definition, namespace_chain, report_type_argument_count};

/// Resolves syntax type references against the symbol table.
pub struct TypeResolver<'r, 'a> {
    binder: &'r mut Binder<'a>,
    ctx: &'r InterpretationContext,
}

impl<'r, 'a> TypeResolver<'r, 'a> {
    pub fn new(binder: &'r mut Binder<'a>, ctx: &'r InterpretationContext) -> Self {
        Self { binder, ctx }
    }

    /// Resolve a type reference, reporting any failure.
    pub fn resolve(&mut self, ty: &TypeExpr<'_>) -> DataType {
        let resolved = match ty {
            TypeExpr::Primitive { kind, .. } => DataType::Primitive(*kind),
            TypeExpr::Object(_) => DataType::Object,
            TypeExpr::Named { path, args, span } => self.resolve_named(path, args, *span),
            TypeExpr::Array { element, rank, .. } => match self.resolve(element) {
                DataType::Error => DataType::Error,
                element => DataType::array(element, *rank),
            },
            TypeExpr::Nullable { inner, span } => self.resolve_nullable(inner, *span),
        };
        self.binder.table.normalize(resolved)
    }

    fn resolve_nullable(&mut self, inner: &TypeExpr<'_>, span: Span) -> DataType {
        let inner = self.resolve(inner);
        if inner.is_error() {
            return DataType::Error;
        }
        let allowed = matches!(inner, DataType::GenericParam { .. })
            || (self.binder.table.is_value_type(&inner) && !inner.is_nullable());
        if !allowed {
            let shown = self.binder.display(&inner);
            self.binder.error(
                DiagnosticCode::NullableRequiresValueType,
                span,
                format!(
                    "Type '{shown}' must be a value type or a type argument constrained to 'Structure' in order to be used with 'Nullable' or nullable modifier '?'."
                ),
            );
            return DataType::Error;
        }
        DataType::nullable(inner)
    }

    fn resolve_named(&mut self, path: &[Ident<'_>], args: &[TypeExpr<'_>], span: Span) -> DataType {
        let arity = args.len();
        let dotted = path.iter().map(|i| i.name).collect::<Vec<_>>().join(".");

        if path.len() == 1
            && arity == 0
            && let Some(param) = self.containing_generic_param(path[0].name)
        {
            return param;
        }

        let table = self.binder.table;
        let Some(hash) = table.resolve_type_name(&dotted, &self.ctx.namespace, arity) else {
            self.report_unresolved(&dotted, arity, span);
            return DataType::Error;
        };

        if let Some(entry) = table.get_type(hash)
            && !table.is_accessible(entry.access, hash, self.ctx.containing_type)
        {
            self.binder.error(
                DiagnosticCode::Inaccessible,
                span,
                format!(
                    "'{}' is not accessible in this context because it is '{:?}'.",
                    entry.qualified_name, entry.access
                ),
            );
            return DataType::Error;
        }

        let mut resolved_args = Vec::with_capacity(arity);
        for arg in args {
            resolved_args.push(self.resolve(arg));
        }
        if resolved_args.iter().any(DataType::is_error) {
            return DataType::Error;
        }
        DataType::generic(hash, resolved_args)
    }

    /// `T` inside a generic type declaring `T`.
    fn containing_generic_param(&self, name: &str) -> Option<DataType> {
        let entry = self.binder.table.get_type(self.ctx.containing_type?)?;
        let index = entry.generic_params.iter().position(|p| p.name.eq_ignore_ascii_case(name))?;
        Some(entry.generic_param(index as u32))
    }

    fn report_unresolved(&mut self, dotted: &str, arity: usize, span: Span) {
        let table = self.binder.table;
        let mut scopes = vec![String::new()];
        scopes.extend(namespace_chain(self.ctx));
        scopes.extend(table.imports().iter().cloned());
        let other_arity = scopes
            .iter()
            .find_map(|ns| table.types_named(&qualify(ns, dotted)).find(|t| t.arity() != arity));
        if let Some(entry) = other_arity {
            report_type_argument_count(self.binder, entry, arity, span);
            return;
        }

        if !dotted.contains('.') && self.binder.scope.get(dotted).is_some() {
            self.binder.error(
                DiagnosticCode::ValueUsedAsType,
                span,
                format!("'{dotted}' is a variable and cannot be used as a type."),
            );
            return;
        }

        self.binder.error(
            DiagnosticCode::TypeNotDefined,
            span,
            format!("Type '{dotted}' is not defined."),
        );
    }
}

/// Resolve `ty` in `ctx`.
pub(crate) fn resolve_type(b: &mut Binder<'_>, ty: &TypeExpr<'_>, ctx: &InterpretationContext) -> DataType {
    TypeResolver::new(b, ctx).resolve(ty)
}

/// `List(Of T)` for the generic definition behind `ty`, for messages.
pub(crate) fn definition_name(b: &Binder<'_>, ty: &DataType) -> String {
    match ty.type_hash().and_then(|h| b.table.get_type(h)) {
        Some(entry) => generic_definition(entry),
        None => b.display(ty),
    }
}
