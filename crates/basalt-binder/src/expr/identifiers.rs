//! Simple names and the `Me` / `MyBase` / `MyClass` keywords.

use basalt_core::{BindError, DataType, DiagnosticCode, Span};
use basalt_symbols::VarLookup;
use basalt_syntax::{InstanceExpr, InstanceKeyword, NameExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind, MemberGroup};
use crate::context::InterpretationContext;
use crate::flags::ExpressionFlags;
use crate::names::{Lookup, NameResolution, Unresolved, report_ambiguous, report_unresolved, resolve_name};
use crate::type_resolver::resolve_type;

use super::member::{bind_member_refs, implicit_receiver};

/// Bind a simple name.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_name<'ast>(
    b: &mut Binder<'_>,
    name: &NameExpr<'ast>,
    flags: ExpressionFlags,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = name.span;
    let text = name.ident.name;
    let type_args: Vec<DataType> = name.type_args.iter().map(|t| resolve_type(b, t, ctx)).collect();
    let arity = type_args.len();

    let lookup = match resolve_name(b, text, arity, ctx) {
        NameResolution::Local(local) => return Ok(bind_local(b, local, span, ctx)),
        NameResolution::Symbol(lookup) => lookup,
    };
    tracing::trace!(name = text, ?lookup, "name resolved");

    match lookup {
        Lookup::TypeMembers(members) => {
            let receiver = implicit_receiver(b, ctx, span);
            let group = MemberGroup {
                receiver,
                name: text.to_string(),
                members,
                extensions: Vec::new(),
                type_args,
                has_type_arg_list: name.has_type_arg_list,
                through_type: false,
                implicit_receiver: true,
            };
            bind_member_refs(b, group, span, ctx)
        }
        Lookup::ModuleMembers(members) => {
            let group = MemberGroup {
                receiver: None,
                name: text.to_string(),
                members,
                extensions: Vec::new(),
                type_args,
                has_type_arg_list: name.has_type_arg_list,
                through_type: false,
                implicit_receiver: true,
            };
            bind_member_refs(b, group, span, ctx)
        }
        Lookup::Type(hash) => {
            let ty = if type_args.is_empty() {
                b.table.normalize(DataType::named(hash))
            } else {
                DataType::generic(hash, type_args)
            };
            Ok(BoundExpr::new(BoundKind::TypeExpr(ty), DataType::Void, span))
        }
        Lookup::Namespace(namespace) => Ok(BoundExpr::new(BoundKind::NamespaceRef(namespace), DataType::Void, span)),
        Lookup::Ambiguous(sources) => {
            report_ambiguous(b, text, &sources, span);
            Ok(BoundExpr::bad(span))
        }
        Lookup::NotFound => {
            let allow_implicit = !flags.contains(ExpressionFlags::ALLOW_METHOD_GROUP);
            match report_unresolved(b, text, arity, span, allow_implicit, ctx) {
                Unresolved::Declared => match b.scope.lookup(text) {
                    Some(local) => Ok(bind_local(b, local, span, ctx)),
                    None => Err(BindError::internal(format!("implicit local '{text}' vanished"), span)),
                },
                Unresolved::Reported => Ok(BoundExpr::bad(span)),
            }
        }
    }
}

/// Bind a reference to a local, parameter or constant.
fn bind_local<'ast>(b: &mut Binder<'_>, lookup: VarLookup, span: Span, ctx: &InterpretationContext) -> BoundExpr<'ast> {
    let captured = matches!(lookup, VarLookup::Captured(_));
    let var = lookup.var();

    if !ctx.allow_forward_reference && !var.is_param && !var.is_implicit && span.precedes(var.span) {
        b.error(
            DiagnosticCode::UsedBeforeDeclaration,
            span,
            format!("Local variable '{}' cannot be referred to before it is declared.", var.name),
        );
        return BoundExpr::bad(span);
    }

    let Some(ty) = var.ty.clone() else {
        b.error(
            DiagnosticCode::CircularInference,
            span,
            format!(
                "Type of '{}' cannot be inferred from an expression containing '{}'.",
                var.name, var.name
            ),
        );
        return BoundExpr::bad(span);
    };

    if var.is_const {
        return match &var.constant {
            Some(value) => BoundExpr::constant(value.clone(), ty, span),
            None => BoundExpr::bad(span),
        };
    }

    let mut flags = BoundFlags::LVALUE;
    if var.is_read_only {
        flags |= BoundFlags::READ_ONLY;
    }
    let kind = BoundKind::Local {
        name: var.name.clone(),
        ordinal: var.ordinal,
        captured,
    };
    BoundExpr::new(kind, ty, span).with_flags(flags)
}

/// Bind `Me`, `MyBase` or `MyClass`.
pub(crate) fn bind_instance<'ast>(b: &mut Binder<'_>, instance: &InstanceExpr, ctx: &InterpretationContext) -> BoundExpr<'ast> {
    let span = instance.span;
    let keyword = match instance.keyword {
        InstanceKeyword::Me => "Me",
        InstanceKeyword::MyBase => "MyBase",
        InstanceKeyword::MyClass => "MyClass",
    };
    if ctx.standalone_constant {
        b.error(
            DiagnosticCode::MeNotAllowedHere,
            span,
            format!("'{keyword}' is not valid within a constant expression or an attribute argument."),
        );
        return BoundExpr::bad(span);
    }

    let table = b.table;
    let entry = ctx.containing_type.and_then(|h| table.get_type(h));
    let Some(entry) = entry.filter(|e| !ctx.is_shared && !e.is_module()) else {
        b.error(
            DiagnosticCode::MeInSharedContext,
            span,
            format!("'{keyword}' is valid only within an instance method."),
        );
        return BoundExpr::bad(span);
    };

    let self_type = entry.self_type();
    let ty = match instance.keyword {
        InstanceKeyword::MyBase => table.base_type(&self_type).unwrap_or(DataType::Object),
        InstanceKeyword::Me | InstanceKeyword::MyClass => self_type,
    };
    BoundExpr::new(BoundKind::SelfRef(instance.keyword), ty, span)
}

#[cfg(test)]
mod tests {
    use basalt_core::{CompileOptions, ConstantValue, DataType, DiagnosticCode, Span};
    use basalt_symbols::{FieldEntry, TypeEntry};
    use basalt_syntax::AstBuilder;
    use bumpalo::Bump;

    use crate::bound::BoundKind;
    use crate::context::InterpretationContext;
    use crate::testing::{Fixture, codes};

    #[test]
    fn local_is_an_lvalue() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("count"));
        let mut f = Fixture::new();
        f.local("count", DataType::integer());
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert!(bound.is_lvalue());
        assert!(matches!(bound.kind, BoundKind::Local { captured: false, .. }));
    }

    #[test]
    fn use_before_declaration() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("later"));
        let mut f = Fixture::new();
        f.scope.declare("later", Some(DataType::integer()), Span::new(9, 1, 5)).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::UsedBeforeDeclaration]);

        f.ctx = InterpretationContext::new().with_forward_reference(true);
        let (bound, sink) = f.bind(expr);
        assert!(!bound.is_bad());
        assert!(sink.is_empty());
    }

    #[test]
    fn constant_local_folds() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("Limit"));
        let mut f = Fixture::new();
        f.scope
            .declare_const("Limit", DataType::integer(), ConstantValue::integer(10), Span::new(0, 1, 1))
            .unwrap();
        let (bound, _) = f.bind(expr);
        assert_eq!(bound.constant_value(), Some(&ConstantValue::integer(10)));
    }

    #[test]
    fn undeclared_name_is_reported() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("missing"));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NameNotDeclared]);
    }

    #[test]
    fn implicit_declaration_when_explicit_is_off() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("scratch"));
        let mut f = Fixture::with_options(CompileOptions::lenient().with_explicit(false));
        let (bound, sink) = f.bind(expr);
        assert!(!bound.is_bad());
        assert_eq!(bound.ty, DataType::Object);
        assert_eq!(codes(&sink), vec![DiagnosticCode::ImplicitDeclaration]);
        assert!(f.scope.get("scratch").is_some());
    }

    #[test]
    fn me_in_shared_context() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.me());
        let mut f = Fixture::new();
        let class = f.enter_class("Counter");
        let (bound, sink) = f.bind(expr);
        assert_eq!(bound.ty, DataType::named(class));
        assert!(sink.is_empty());

        f.ctx = InterpretationContext::in_type(class).with_shared(true);
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::MeInSharedContext]);
    }

    #[test]
    fn my_base_has_the_base_type() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.my_base());
        let mut f = Fixture::new();
        let base = f.table.register_type(TypeEntry::class("Shape")).unwrap();
        let derived = f
            .table
            .register_type(TypeEntry::class("Circle").with_base(DataType::named(base)))
            .unwrap();
        f.ctx = InterpretationContext::in_type(derived);
        let (bound, _) = f.bind(expr);
        assert_eq!(bound.ty, DataType::named(base));
    }

    #[test]
    fn field_of_containing_type() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("total"));
        let mut f = Fixture::new();
        let class = f.enter_class("Ledger");
        let field = f.table.register_field(FieldEntry::new(class, "total", DataType::long())).unwrap();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        let BoundKind::Field { receiver: Some(receiver), field: bound_field } = &bound.kind else {
            panic!("expected a field, got {:?}", bound.kind);
        };
        assert_eq!(*bound_field, field);
        assert!(matches!(receiver.kind, BoundKind::SelfRef(_)));
        assert!(bound.is_lvalue());
    }
}
