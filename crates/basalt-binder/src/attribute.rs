//! Custom attribute applications.
//!
//! An attribute binds like `New T(args) With {named}` evaluated at compile
//! time, with extra rules: the type derives from `System.Attribute`, the
//! constructor is `Public`, every parameter and named target has an
//! attribute-legal type, and every argument is a constant, a `GetType`, or
//! a fully specified one-dimensional array of those.

use basalt_core::{BindError, DataType, DiagnosticCode, PrimitiveKind, Span, TypeHash};
use basalt_symbols::{Access, MemberRef, WellKnownType};
use basalt_syntax::{AttributeExpr, FieldInitializer};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind};
use crate::context::InterpretationContext;
use crate::expr::bind_converted;
use crate::expr::calls::{bind_argument_list, bind_arguments};
use crate::expr::reclassify::reclassify_natural;
use crate::overload::{BoundArgument, CallSite, Candidate, Resolution, resolve_overloads};
use crate::type_resolver::resolve_type;

/// A named argument: a public field or property of the attribute class.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedAttributeArgument<'ast> {
    pub name: String,
    pub member: MemberRef,
    pub value: BoundExpr<'ast>,
}

/// A bound attribute application.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAttribute<'ast> {
    pub ty: DataType,
    /// `None` for a class without declared constructors.
    pub constructor: Option<TypeHash>,
    /// One converted argument per constructor parameter.
    pub args: Vec<BoundExpr<'ast>>,
    pub named: Vec<NamedAttributeArgument<'ast>>,
    pub span: Span,
    pub is_bad: bool,
}

impl BoundAttribute<'_> {
    pub(crate) fn bad(span: Span) -> Self {
        Self {
            ty: DataType::Error,
            constructor: None,
            args: Vec::new(),
            named: Vec::new(),
            span,
            is_bad: true,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_attribute<'ast>(
    b: &mut Binder<'_>,
    attribute: &'ast AttributeExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundAttribute<'ast>> {
    let span = attribute.span;
    let ctx = ctx.standalone();
    let ty = resolve_type(b, &attribute.ty, &ctx);
    let args = bind_argument_list(b, attribute.args, &ctx)?;
    if ty.is_error() {
        discard(b, args, &ctx)?;
        return Ok(BoundAttribute::bad(span));
    }

    let table = b.table;
    let is_attribute = table
        .well_known_type(WellKnownType::Attribute)
        .is_some_and(|attribute| table.is_derived_from(&ty, &attribute));
    let Some(entry) = table.entry_of(&ty).filter(|e| is_attribute && e.is_class()) else {
        let shown = b.display(&ty);
        b.error(
            DiagnosticCode::NotAttributeClass,
            span,
            format!("'{shown}' cannot be used as an attribute because it does not inherit from 'System.Attribute'."),
        );
        discard(b, args, &ctx)?;
        return Ok(BoundAttribute::bad(span));
    };
    if entry.is_abstract() {
        let shown = b.display(&ty);
        b.error(
            DiagnosticCode::NewOnAbstractType,
            span,
            format!("'{shown}' cannot be used as an attribute because it is declared 'MustInherit'."),
        );
        discard(b, args, &ctx)?;
        return Ok(BoundAttribute::bad(span));
    }

    let (constructor, args, mut ok) = bind_constructor(b, &ty, entry.hash, args, span, &ctx)?;
    for arg in &args {
        ok &= check_value(b, arg);
    }

    let mut named = Vec::with_capacity(attribute.named_args.len());
    for initializer in attribute.named_args {
        match bind_named(b, &ty, initializer, &ctx)? {
            Some(argument) => {
                ok &= check_value(b, &argument.value);
                named.push(argument);
            }
            None => ok = false,
        }
    }

    tracing::debug!(attribute = %b.display(&ty), args = args.len(), named = named.len(), "attribute bound");
    Ok(BoundAttribute {
        ty,
        constructor,
        args,
        named,
        span,
        is_bad: !ok,
    })
}

/// Bind arguments that will not be used, for their diagnostics.
fn discard<'ast>(b: &mut Binder<'_>, args: Vec<BoundArgument<'ast>>, ctx: &InterpretationContext) -> Result<()> {
    for value in args.into_iter().filter_map(|a| a.value) {
        reclassify_natural(b, value, ctx)?;
    }
    Ok(())
}

type BoundConstructor<'ast> = (Option<TypeHash>, Vec<BoundExpr<'ast>>, bool);

fn bind_constructor<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    owner: TypeHash,
    args: Vec<BoundArgument<'ast>>,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundConstructor<'ast>> {
    let table = b.table;
    let constructors: Vec<Candidate> = table
        .declared_members(owner, "New")
        .into_iter()
        .filter_map(|m| match m {
            MemberRef::Procedure(h) => table.get_procedure(h),
            _ => None,
        })
        .filter(|p| !p.is_shared)
        .map(|p| Candidate::from_procedure(table, p, Some(ty), false))
        .collect();

    if constructors.is_empty() {
        if args.is_empty() {
            return Ok((None, Vec::new(), true));
        }
        let shown = b.display(ty);
        b.error(
            DiagnosticCode::TooManyArguments,
            span,
            format!("Too many arguments to the constructor of '{shown}'."),
        );
        discard(b, args, ctx)?;
        return Ok((None, Vec::new(), false));
    }

    let site = CallSite::new("New", args, span);
    let selected = match resolve_overloads(b, constructors, &site, ctx)? {
        Resolution::Selected(selected) => selected,
        Resolution::LateBound => {
            let shown = b.display(ty);
            b.error(
                DiagnosticCode::NoApplicableOverload,
                span,
                format!("Overload resolution failed because no 'New' of '{shown}' accepts these arguments without a narrowing conversion."),
            );
            return Ok((None, Vec::new(), false));
        }
        Resolution::Failed => return Ok((None, Vec::new(), false)),
    };
    let MemberRef::Procedure(hash) = selected.candidate.member else {
        return Err(BindError::internal("attribute constructor is not a procedure", span));
    };
    let Some(procedure) = table.get_procedure(hash) else {
        return Err(BindError::UnknownDeclaration { hash, span });
    };

    let mut ok = true;
    if procedure.access != Access::Public {
        let shown = b.display(ty);
        b.error(
            DiagnosticCode::AttributeConstructorNotPublic,
            span,
            format!("Attribute '{shown}' cannot be used because its constructor is not 'Public'."),
        );
        ok = false;
    }
    for param in &procedure.params {
        if !is_attribute_legal(b, &param.ty) {
            let shown = b.display(&param.ty);
            b.error(
                DiagnosticCode::AttributeIllegalType,
                span,
                format!("Attribute constructor has a parameter '{}' of type '{shown}', which is not an Integral, Floating-point, Enum, Char, String, Boolean, Type or Object type or a one-dimensional array of those.", param.name),
            );
            ok = false;
        }
    }

    let (args, copy_backs) = bind_arguments(b, &selected, site.args, span, ctx)?;
    if !copy_backs.is_empty() {
        return Err(BindError::internal("attribute arguments produced copy-backs", span));
    }
    Ok((Some(hash), args, ok))
}

/// `Name:=value`: a writable public field or property of the attribute.
fn bind_named<'ast>(
    b: &mut Binder<'_>,
    ty: &DataType,
    initializer: &'ast FieldInitializer<'ast>,
    ctx: &InterpretationContext,
) -> Result<Option<NamedAttributeArgument<'ast>>> {
    let table = b.table;
    let name = initializer.name.name;
    let span = initializer.name.span;
    let target = table.lookup_member(ty, name).into_iter().find_map(|member| match member {
        MemberRef::Field(h) => table
            .get_field(h)
            .map(|f| (member, f.ty.clone(), f.owner, f.access, f.is_shared || f.is_read_only || f.constant.is_some())),
        MemberRef::Property(h) => table
            .get_property(h)
            .map(|p| (member, p.ty.clone(), p.owner, p.access, p.is_shared || !p.has_setter || !p.params.is_empty())),
        _ => None,
    });

    let Some((member, declared, owner, access, read_only)) = target else {
        let shown = b.display(ty);
        b.error(
            DiagnosticCode::MemberNotFound,
            span,
            format!("'{name}' is not a member of '{shown}'."),
        );
        bind_converted(b, initializer.value, &DataType::Object, ctx)?;
        return Ok(None);
    };
    let member_ty = table.member_type(ty, owner, &declared);
    let value = bind_converted(b, initializer.value, &member_ty, ctx)?;

    if access != Access::Public {
        b.error(
            DiagnosticCode::Inaccessible,
            span,
            format!("'{name}' cannot be named in an attribute because it is not 'Public'."),
        );
        return Ok(None);
    }
    if read_only {
        b.error(
            DiagnosticCode::ReadOnlyTarget,
            span,
            format!("'{name}' cannot be named as a parameter in an attribute specifier because it is not a writable instance field or property."),
        );
        return Ok(None);
    }
    if !is_attribute_legal(b, &member_ty) {
        let shown = b.display(&member_ty);
        b.error(
            DiagnosticCode::AttributeIllegalType,
            span,
            format!("Property or field '{name}' does not have a valid attribute type '{shown}'."),
        );
        return Ok(None);
    }
    Ok(Some(NamedAttributeArgument {
        name: name.to_string(),
        member,
        value,
    }))
}

/// Types an attribute argument can carry.
fn is_attribute_legal(b: &Binder<'_>, ty: &DataType) -> bool {
    match ty {
        DataType::Array { element, rank: 1 } => !element.is_array() && is_attribute_legal(b, element),
        DataType::Primitive(kind) => !matches!(kind, PrimitiveKind::Decimal | PrimitiveKind::Date),
        DataType::Object => true,
        other => {
            let table = b.table;
            table.well_known_type(WellKnownType::Type).as_ref() == Some(other)
                || table.entry_of(other).is_some_and(|e| e.enum_underlying().is_some())
        }
    }
}

/// Report an argument value that cannot be stored in metadata.
fn check_value(b: &mut Binder<'_>, value: &BoundExpr<'_>) -> bool {
    if value.is_bad() {
        return false;
    }
    if value.is_constant() {
        return true;
    }
    match &value.kind {
        BoundKind::GetType(_) => true,
        BoundKind::Conversion { operand, .. } => check_value(b, operand),
        BoundKind::ArrayCreation { bounds, elements } => {
            let declared = bounds.iter().try_fold(1usize, |total, bound| {
                let len = bound.constant_value()?.as_integral()?;
                total.checked_mul(usize::try_from(len).ok()?)
            });
            if declared != Some(elements.len()) {
                b.error(
                    DiagnosticCode::AttributeArrayElementOmitted,
                    value.span,
                    "Array passed as an attribute argument must have every element value specified.",
                );
                return false;
            }
            elements.iter().fold(true, |ok, element| check_value(b, element) && ok)
        }
        _ => {
            b.error(DiagnosticCode::RequiresConstant, value.span, "Constant expression is required.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use basalt_core::{ConstantValue, DataType, DiagnosticCode, DiagnosticSink, PrimitiveKind, TypeHash};
    use basalt_symbols::{Access, ParamEntry, ProcedureEntry, PropertyEntry, TypeEntry, WellKnownType};
    use basalt_syntax::{AstBuilder, AttributeExpr};
    use bumpalo::Bump;

    use super::{BoundAttribute, bind_attribute};
    use crate::bound::BoundKind;
    use crate::testing::{Fixture, codes};

    /// `NoteAttribute` with a `New(text As String)` constructor and a
    /// read-write `Priority` property.
    fn note_attribute(f: &mut Fixture) -> TypeHash {
        let attribute = f.table.well_known_type(WellKnownType::Attribute).unwrap();
        let class = f
            .table
            .register_type(TypeEntry::class("NoteAttribute").with_base(attribute))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::constructor(class, vec![ParamEntry::new("text", DataType::string())]))
            .unwrap();
        f.table
            .register_property(PropertyEntry::read_write(class, "Priority", DataType::integer()))
            .unwrap();
        f.table
            .register_property(PropertyEntry::read_only(class, "Text", DataType::string()))
            .unwrap();
        class
    }

    fn bind<'ast>(f: &mut Fixture, attribute: &'ast AttributeExpr<'ast>) -> (BoundAttribute<'ast>, DiagnosticSink) {
        let (bound, sink) = f.run(|b, ctx| bind_attribute(b, attribute, ctx));
        (bound.unwrap(), sink)
    }

    #[test]
    fn positional_and_named_arguments() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("NoteAttribute"), &[ast.string("hi")], &[("Priority", ast.int(2))]);
        let mut f = Fixture::strict();
        note_attribute(&mut f);
        let (bound, sink) = bind(&mut f, attribute);
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert!(!bound.is_bad);
        assert!(bound.constructor.is_some());
        assert_eq!(bound.args[0].constant_value(), Some(&ConstantValue::string("hi")));
        assert_eq!(bound.named.len(), 1);
        assert_eq!(bound.named[0].value.constant_value(), Some(&ConstantValue::integer(2)));
    }

    #[test]
    fn non_attribute_class_is_rejected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("Widget"), &[], &[]);
        let mut f = Fixture::new();
        f.table.register_type(TypeEntry::class("Widget")).unwrap();
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::NotAttributeClass]);
    }

    #[test]
    fn constructor_must_be_public() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("HiddenAttribute"), &[], &[]);
        let mut f = Fixture::new();
        let base = f.table.well_known_type(WellKnownType::Attribute).unwrap();
        let class = f
            .table
            .register_type(TypeEntry::class("HiddenAttribute").with_base(base))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::constructor(class, vec![]).with_access(Access::Friend))
            .unwrap();
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::AttributeConstructorNotPublic]);
    }

    #[test]
    fn decimal_parameter_is_not_attribute_legal() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("PriceAttribute"), &[ast.int(1)], &[]);
        let mut f = Fixture::new();
        let base = f.table.well_known_type(WellKnownType::Attribute).unwrap();
        let class = f
            .table
            .register_type(TypeEntry::class("PriceAttribute").with_base(base))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::constructor(
                class,
                vec![ParamEntry::new("amount", DataType::primitive(PrimitiveKind::Decimal))],
            ))
            .unwrap();
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::AttributeIllegalType]);
    }

    #[test]
    fn read_only_named_target() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("NoteAttribute"), &[ast.string("a")], &[("Text", ast.string("b"))]);
        let mut f = Fixture::new();
        note_attribute(&mut f);
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::ReadOnlyTarget]);
    }

    #[test]
    fn arguments_must_be_constant() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("NoteAttribute"), &[ast.name("s")], &[]);
        let mut f = Fixture::new();
        note_attribute(&mut f);
        f.local("s", DataType::string());
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::RequiresConstant]);
    }

    #[test]
    fn me_is_not_an_attribute_argument() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let attribute = ast.attribute(ast.ty_named("NoteAttribute"), &[ast.me()], &[]);
        let mut f = Fixture::new();
        note_attribute(&mut f);
        f.enter_class("Host");
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert!(sink.contains(DiagnosticCode::MeNotAllowedHere));
    }

    #[test]
    fn arrays_must_specify_every_element() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let sized = ast.array_creation(ast.ty_primitive(PrimitiveKind::Integer), &[ast.int(2)], 1, &[]);
        let attribute = ast.attribute(ast.ty_named("TagsAttribute"), &[sized], &[]);
        let mut f = Fixture::new();
        let base = f.table.well_known_type(WellKnownType::Attribute).unwrap();
        let class = f
            .table
            .register_type(TypeEntry::class("TagsAttribute").with_base(base))
            .unwrap();
        f.table
            .register_procedure(ProcedureEntry::constructor(
                class,
                vec![ParamEntry::new("tags", DataType::array(DataType::integer(), 1))],
            ))
            .unwrap();
        let (bound, sink) = bind(&mut f, attribute);
        assert!(bound.is_bad);
        assert_eq!(codes(&sink), vec![DiagnosticCode::AttributeArrayElementOmitted]);

        let literal = ast.array_literal(&[ast.int(1), ast.int(2)]);
        let attribute = ast.attribute(ast.ty_named("TagsAttribute"), &[literal], &[]);
        let (bound, sink) = bind(&mut f, attribute);
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert!(!bound.is_bad);
        assert!(matches!(bound.args[0].kind, BoundKind::ArrayCreation { .. }));
    }
}
