//! End-to-end binding tests through the `Session` facade.
//!
//! Each test builds a syntax tree with `AstBuilder`, binds it in a fresh
//! body and checks the bound tree and the diagnostics it produced.

use basalt::binder::bound::BoundCall;
use basalt::symbols::{ParamEntry, ProcedureEntry, PropertyEntry, TypeEntry, WellKnownType};
use basalt::syntax::{BinaryOp, IntegerSuffix};
use basalt::{
    AstBuilder, BoundKind, CompileOptions, ConstantValue, DataType, DiagnosticCode, ExpressionFlags,
    InterpretationContext, PrimitiveKind, Session, Severity, Span, TypeHash,
};
use bumpalo::Bump;

fn session(options: CompileOptions) -> Session {
    Session::new(options).expect("runtime types register")
}

fn codes(diagnostics: &basalt::DiagnosticSink) -> Vec<DiagnosticCode> {
    diagnostics.diagnostics().iter().map(|d| d.code).collect()
}

/// A declaration site ahead of every node `AstBuilder` produces.
fn before_use() -> Span {
    Span::new(0, 1, 1)
}

fn call<'a, 'ast>(kind: &'a BoundKind<'ast>) -> &'a BoundCall<'ast> {
    match kind {
        BoundKind::Call(call) => call,
        other => panic!("expected a call, got {other:?}"),
    }
}

// =============================================================================
// Constant folding
// =============================================================================

#[test]
fn test_concatenation_folds_to_one_constant() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let pieces = ["a", "b", "c", "d", "e"].map(|s| ast.string(s));
    let expr = ast.alloc(ast.chain(BinaryOp::Concatenate, &pieces));

    let session = session(CompileOptions::strict());
    let mut body = session.body(InterpretationContext::new());
    let bound = body.expression(expr, ExpressionFlags::VALUE, None);
    assert!(body.diagnostics().is_empty());
    assert_eq!(bound.ty, DataType::string());
    assert_eq!(bound.constant_value(), Some(&ConstantValue::string("abcde")));
    assert_eq!(bound.count(|e| matches!(e.kind, BoundKind::Call(_))), 0);
}

#[test]
fn test_integer_boundary_conversion() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let session = session(CompileOptions::strict());
    let integer = DataType::integer();

    let fits = ast.alloc(ast.int_suffixed(2_147_483_647, IntegerSuffix::Long));
    let mut body = session.body(InterpretationContext::new());
    let bound = body.expression(fits, ExpressionFlags::VALUE, Some(&integer));
    assert!(body.diagnostics().is_empty(), "{:?}", body.diagnostics().diagnostics());
    assert_eq!(bound.ty, integer);
    assert_eq!(bound.constant_value(), Some(&ConstantValue::integer(i32::MAX)));

    let past = ast.alloc(ast.int_suffixed(2_147_483_648, IntegerSuffix::Long));
    let mut body = session.body(InterpretationContext::new());
    let bound = body.expression(past, ExpressionFlags::VALUE, Some(&integer));
    assert!(bound.is_bad());
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::Overflow]);
    assert_eq!(body.diagnostics().diagnostics()[0].span, past.span());
}

#[test]
fn test_division_by_zero() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let session = session(CompileOptions::lenient());

    for op in [BinaryOp::IntegerDivide, BinaryOp::Modulo] {
        let expr = ast.alloc(ast.binary(ast.int(5), op, ast.int(0)));
        let mut body = session.body(InterpretationContext::new());
        let bound = body.expression(expr, ExpressionFlags::VALUE, None);
        assert!(bound.is_bad());
        assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::ZeroDivide]);
    }

    let expr = ast.alloc(ast.binary(ast.double(5.0), BinaryOp::Divide, ast.double(0.0)));
    let mut body = session.body(InterpretationContext::new());
    let bound = body.expression(expr, ExpressionFlags::VALUE, None);
    assert!(body.diagnostics().is_empty());
    assert_eq!(bound.constant_value(), Some(&ConstantValue::double(f64::INFINITY)));
}

#[test]
fn test_standalone_constant() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.binary(ast.int(40), BinaryOp::Add, ast.int(2)));
    let session = session(CompileOptions::strict());
    let mut body = session.body(InterpretationContext::new());
    let value = body.constant(expr, Some(&DataType::primitive(PrimitiveKind::Byte)));
    assert!(body.diagnostics().is_empty());
    assert_eq!(value.as_ref().and_then(ConstantValue::as_integral), Some(42));

    let local = ast.alloc(ast.name("n"));
    let mut body = session.body(InterpretationContext::new());
    body.scope_mut().declare("n", Some(DataType::integer()), before_use()).unwrap();
    assert_eq!(body.constant(local, None), None);
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::RequiresConstant]);
}

// =============================================================================
// Array literals
// =============================================================================

#[test]
fn test_array_literal_dominant_type() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);

    let session_lenient = session(CompileOptions::lenient());
    let session_strict = session(CompileOptions::strict());

    let integers = ast.alloc(ast.array_literal(&[ast.int(1), ast.int(2)]));
    let mut body = session_strict.body(InterpretationContext::new());
    let bound = body.expression(integers, ExpressionFlags::VALUE, None);
    assert!(body.diagnostics().is_empty());
    assert_eq!(bound.ty, DataType::array(DataType::integer(), 1));

    let mixed = ast.alloc(ast.array_literal(&[ast.int(1), ast.string("x")]));
    let mut body = session_lenient.body(InterpretationContext::new());
    let bound = body.expression(mixed, ExpressionFlags::VALUE, None);
    assert_eq!(bound.ty, DataType::array(DataType::Object, 1));
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::ObjectAssumedForArray]);
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Warning);

    let mut body = session_strict.body(InterpretationContext::new());
    let bound = body.expression(mixed, ExpressionFlags::VALUE, None);
    assert!(bound.is_bad());
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Error);

    let empty = ast.alloc(ast.array_literal(&[]));
    let mut body = session_lenient.body(InterpretationContext::new());
    let bound = body.expression(empty, ExpressionFlags::VALUE, None);
    assert_eq!(bound.ty, DataType::array(DataType::Object, 1));
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Warning);
}

#[test]
fn test_nested_array_literal_is_rank_two() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.array_literal(&[
        ast.array_literal(&[ast.int(1), ast.int(2)]),
        ast.array_literal(&[ast.int(3), ast.int(4)]),
    ]));
    let session = session(CompileOptions::strict());
    let mut body = session.body(InterpretationContext::new());
    let bound = body.expression(expr, ExpressionFlags::VALUE, None);
    assert!(body.diagnostics().is_empty());
    assert_eq!(bound.ty, DataType::array(DataType::integer(), 2));
    let BoundKind::ArrayCreation { elements, .. } = &bound.kind else {
        panic!("expected an array creation, got {:?}", bound.kind);
    };
    let values: Vec<_> = elements.iter().filter_map(|e| e.constant_value().cloned()).collect();
    assert_eq!(values, (1..=4).map(ConstantValue::integer).collect::<Vec<_>>());
}

#[test]
fn test_rebinding_is_idempotent() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.array_literal(&[ast.int(1), ast.name("n")]));
    let target = DataType::array(DataType::long(), 1);
    let session = session(CompileOptions::strict());

    let mut first = session.body(InterpretationContext::new());
    first.scope_mut().declare("n", Some(DataType::integer()), before_use()).unwrap();
    let once = first.expression(expr, ExpressionFlags::VALUE, Some(&target));
    let again = first.expression(expr, ExpressionFlags::VALUE, Some(&target));
    assert_eq!(once, again);
    assert!(first.diagnostics().is_empty());
    assert_eq!(once.ty, target);
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn test_narrowing_strict_and_lenient() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.name("wide"));
    let byte = DataType::primitive(PrimitiveKind::Byte);

    let strict = session(CompileOptions::strict());
    let mut body = strict.body(InterpretationContext::new());
    body.scope_mut().declare("wide", Some(DataType::integer()), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::VALUE, Some(&byte));
    assert!(bound.is_bad());
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::NarrowingConversion]);
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Error);

    let lenient = session(CompileOptions::lenient());
    let mut body = lenient.body(InterpretationContext::new());
    body.scope_mut().declare("wide", Some(DataType::integer()), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::VALUE, Some(&byte));
    assert!(!bound.is_bad());
    assert_eq!(bound.ty, byte);
    assert!(matches!(bound.kind, BoundKind::Conversion { .. }));
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::NarrowingConversion]);
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Warning);
}

// =============================================================================
// Calls
// =============================================================================

/// A module declaring `F(Integer)`, `F(Long)` and `G(Integer)`, `G(String)`.
fn overloads(session: &mut Session) -> (TypeHash, TypeHash) {
    let table = session.table_mut();
    let module = table.register_type(TypeEntry::module("Calls")).unwrap();
    let narrow = table
        .register_procedure(ProcedureEntry::sub(module, "F", vec![ParamEntry::new("x", DataType::integer())]).shared())
        .unwrap();
    table
        .register_procedure(ProcedureEntry::sub(module, "F", vec![ParamEntry::new("x", DataType::long())]).shared())
        .unwrap();
    table
        .register_procedure(ProcedureEntry::sub(module, "G", vec![ParamEntry::new("x", DataType::integer())]).shared())
        .unwrap();
    table
        .register_procedure(ProcedureEntry::sub(module, "G", vec![ParamEntry::new("x", DataType::string())]).shared())
        .unwrap();
    (module, narrow)
}

#[test]
fn test_overload_picks_the_narrower_parameter() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.call(ast.name("F"), &[ast.name("n")]));
    let mut session = session(CompileOptions::strict());
    let (module, narrow) = overloads(&mut session);

    let mut body = session.body(InterpretationContext::in_type(module).with_shared(true));
    body.scope_mut().declare("n", Some(DataType::integer()), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::STATEMENT, None);
    assert!(body.diagnostics().is_empty(), "{:?}", body.diagnostics().diagnostics());
    assert_eq!(call(&bound.kind).procedure, narrow);
}

#[test]
fn test_overload_ambiguity_is_reported() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.call(ast.name("G"), &[ast.name("d")]));
    let mut session = session(CompileOptions::lenient());
    let (module, _) = overloads(&mut session);

    let mut body = session.body(InterpretationContext::in_type(module).with_shared(true));
    body.scope_mut().declare("d", Some(DataType::double()), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::STATEMENT, None);
    assert!(bound.is_bad());
    assert!(body.diagnostics().contains(DiagnosticCode::AmbiguousOverload));
    assert!(!body.diagnostics().contains(DiagnosticCode::NoApplicableOverload));
}

#[test]
fn test_by_ref_property_is_copied_back() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.call(ast.name("Increment"), &[ast.name("Total")]));
    let mut session = session(CompileOptions::lenient());
    let table = session.table_mut();
    let class = table.register_type(TypeEntry::class("Counter")).unwrap();
    table
        .register_procedure(ProcedureEntry::sub(
            class,
            "Increment",
            vec![ParamEntry::by_ref("value", DataType::long())],
        ))
        .unwrap();
    let total = table
        .register_property(PropertyEntry::read_write(class, "Total", DataType::integer()))
        .unwrap();

    let mut body = session.body(InterpretationContext::in_type(class));
    let bound = body.expression(expr, ExpressionFlags::STATEMENT, None);
    assert!(!bound.is_bad());
    let call = call(&bound.kind);
    assert!(matches!(call.args[0].kind, BoundKind::TempAddress { .. }));
    assert_eq!(call.copy_backs.len(), 1);
    let BoundKind::Assignment { target, value } = &call.copy_backs[0].kind else {
        panic!("expected an assignment, got {:?}", call.copy_backs[0].kind);
    };
    assert!(matches!(target.kind, BoundKind::Property { property, .. } if property == total));
    assert_eq!(value.ty, DataType::integer());
}

// =============================================================================
// Late binding
// =============================================================================

#[test]
fn test_late_binding_gating() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.alloc(ast.call(ast.member(ast.name("target"), "Refresh"), &[ast.int(1)]));

    let lenient = session(CompileOptions::lenient());
    let mut body = lenient.body(InterpretationContext::new());
    body.scope_mut().declare("target", Some(DataType::Object), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::STATEMENT, None);
    assert!(matches!(bound.kind, BoundKind::LateCall(_)));
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::LateBinding]);
    assert_eq!(body.diagnostics().diagnostics()[0].severity, Severity::Warning);

    let strict = session(CompileOptions::strict());
    let mut body = strict.body(InterpretationContext::new());
    body.scope_mut().declare("target", Some(DataType::Object), before_use()).unwrap();
    let bound = body.expression(expr, ExpressionFlags::STATEMENT, None);
    assert!(bound.is_bad());
    assert_eq!(codes(body.diagnostics()), vec![DiagnosticCode::LateBindingDisallowed]);
}

// =============================================================================
// Attributes
// =============================================================================

#[test]
fn test_attribute_application() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let mut session = session(CompileOptions::strict());
    let table = session.table_mut();
    let base = table.well_known_type(WellKnownType::Attribute).unwrap();
    let class = table
        .register_type(TypeEntry::class("ObsoleteNoteAttribute").with_base(base))
        .unwrap();
    table
        .register_procedure(ProcedureEntry::constructor(class, vec![ParamEntry::new("text", DataType::string())]))
        .unwrap();
    table
        .register_property(PropertyEntry::read_write(class, "Level", DataType::integer()))
        .unwrap();

    let attribute = ast.attribute(
        ast.ty_named("ObsoleteNoteAttribute"),
        &[ast.chain(BinaryOp::Concatenate, &[ast.string("use "), ast.string("Other")])],
        &[("Level", ast.int(3))],
    );
    let mut body = session.body(InterpretationContext::new());
    let bound = body.attribute(attribute);
    assert!(body.diagnostics().is_empty(), "{:?}", body.diagnostics().diagnostics());
    assert!(!bound.is_bad);
    assert_eq!(bound.args[0].constant_value(), Some(&ConstantValue::string("use Other")));
    assert_eq!(bound.named[0].name, "Level");
}
