//! Implicit and explicit conversion of bound expressions.
//!
//! Constants are folded through the conversion where the target is a
//! primitive or enum; everything else becomes a [`BoundKind::Conversion`]
//! node carrying its classification. Identity conversions are elided,
//! except that an explicit cast between floating types is always kept so
//! the value is rounded to its declared precision.

use basalt_core::{ConstantValue, DataType, DiagnosticCode, Span};
use basalt_symbols::SymbolTable;
use basalt_syntax::CastKind;

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundFlags, BoundKind};
use crate::constant::{FoldError, FoldResult, convert_constant};
use crate::context::InterpretationContext;
use crate::conversion::{
    Conversion, classify, classify_constant, classify_direct_cast, classify_try_cast, explain,
};

use super::reclassify;

/// Convert `expr` to `target` as an implicit conversion, reporting
/// narrowing under the current options.
pub(crate) fn convert_implicit<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    convert_with(b, expr, target, true, ctx)
}

/// Like [`convert_implicit`], but a narrowing conversion is accepted
/// silently. Used where the operator itself defines the conversion, such
/// as the operands of `&`.
pub(crate) fn convert_operand<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    target: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    convert_with(b, expr, target, false, ctx)
}

fn convert_with<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    target: &DataType,
    report_narrowing: bool,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let target = table.normalize(target.clone());
    if expr.is_unbound() {
        return reclassify::reclassify(b, expr, &target, ctx);
    }
    if expr.is_bad() || target.is_error() || expr.ty.is_error() || !expr.is_value() {
        return Ok(expr);
    }
    if expr.ty == target {
        return Ok(expr);
    }
    let span = expr.span;
    if expr.ty.is_void() {
        b.error(DiagnosticCode::ExpressionHasNoValue, span, "Expression does not produce a value.");
        return Ok(expr.into_bad());
    }
    if target.is_void() {
        return Ok(expr);
    }

    if let Some(value) = expr.constant_value() {
        if matches!(value, ConstantValue::Nothing) && expr.ty.is_object() {
            return Ok(reclassify::nothing_of(b, &target, span));
        }
        match fold_conversion(table, value, &target) {
            Some(Ok(folded)) => {
                let conversion = classify_constant(table, value, &expr.ty, &target);
                let accepted = report(b, &conversion, &expr.ty, &target, span, report_narrowing);
                let literal = expr.flags & BoundFlags::FROM_LITERAL;
                let node = BoundExpr::constant(folded, target, span).with_flags(literal);
                return Ok(if accepted { node } else { node.into_bad() });
            }
            Some(Err(error)) => {
                report_fold_error(b, error, span);
                return Ok(conversion_node(expr, Conversion::ERROR, None, target).into_bad());
            }
            None => {}
        }
    }

    let conversion = classify(table, &expr.ty, &target);
    let accepted = report(b, &conversion, &expr.ty, &target, span, report_narrowing);
    let node = conversion_node(expr, conversion, None, target);
    Ok(if accepted { node } else { node.into_bad() })
}

fn report(
    b: &mut Binder<'_>,
    conversion: &Conversion,
    source: &DataType,
    target: &DataType,
    span: Span,
    report_narrowing: bool,
) -> bool {
    if report_narrowing || conversion.is_error() {
        b.report_implicit_conversion(conversion, source, target, span)
    } else {
        true
    }
}

/// Convert `expr` as written with `kind`.
pub(crate) fn convert_explicit<'ast>(
    b: &mut Binder<'_>,
    expr: BoundExpr<'ast>,
    target: &DataType,
    kind: CastKind,
    span: Span,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let table = b.table;
    let target = table.normalize(target.clone());
    if expr.is_unbound() {
        let converted = reclassify::reclassify(b, expr, &target, ctx)?;
        return Ok(BoundExpr { span, ..converted });
    }
    if expr.is_bad() || target.is_error() || expr.ty.is_error() {
        return Ok(BoundExpr { span, ..expr.into_bad() });
    }
    if expr.ty.is_void() {
        b.error(DiagnosticCode::ExpressionHasNoValue, expr.span, "Expression does not produce a value.");
        return Ok(expr.into_bad());
    }

    let (s, t) = (b.display(&expr.ty), b.display(&target));
    let conversion = match kind {
        CastKind::CType => {
            let conversion = classify(table, &expr.ty, &target);
            if conversion.is_error() {
                let (code, message) = explain(table, &expr.ty, &target);
                b.error(code, span, message);
            }
            conversion
        }
        CastKind::DirectCast => {
            let conversion = classify_direct_cast(table, &expr.ty, &target);
            if conversion.is_error() {
                b.error(
                    DiagnosticCode::DirectCastInvalid,
                    span,
                    format!("Value of type '{s}' cannot be converted to '{t}' with 'DirectCast'."),
                );
            }
            conversion
        }
        CastKind::TryCast => match classify_try_cast(table, &expr.ty, &target) {
            Some(conversion) => {
                if conversion.is_error() {
                    let (code, message) = explain(table, &expr.ty, &target);
                    b.error(code, span, message);
                }
                conversion
            }
            None => {
                b.error(
                    DiagnosticCode::TryCastNeedsReference,
                    span,
                    format!("'TryCast' operand must be reference type, but '{t}' is a value type."),
                );
                Conversion::ERROR
            }
        },
    };
    if conversion.is_error() {
        let node = conversion_node(expr, conversion, Some(kind), target);
        return Ok(BoundExpr { span, ..node.into_bad() });
    }

    let floating = target.as_primitive().is_some_and(|k| k.is_floating());
    if kind == CastKind::CType
        && let Some(value) = expr.constant_value()
        && !(matches!(value, ConstantValue::Nothing) && expr.ty.is_object())
    {
        match fold_conversion(table, value, &target) {
            Some(Ok(folded)) => return Ok(BoundExpr::constant(folded, target, span)),
            Some(Err(error)) => {
                report_fold_error(b, error, span);
                return Ok(BoundExpr::bad(span));
            }
            None => {}
        }
    }

    if expr.ty == target && !floating {
        let value = expr.without_flags(BoundFlags::LVALUE | BoundFlags::FROM_LITERAL);
        return Ok(BoundExpr { span, ..value });
    }
    let node = conversion_node(expr, conversion, Some(kind), target);
    Ok(BoundExpr { span, ..node })
}

/// Wrap `operand` in a conversion to `target` without any checks.
pub(crate) fn conversion_node<'ast>(
    operand: BoundExpr<'ast>,
    conversion: Conversion,
    cast: Option<CastKind>,
    target: DataType,
) -> BoundExpr<'ast> {
    let span = operand.span;
    BoundExpr::new(
        BoundKind::Conversion {
            operand: Box::new(operand),
            conversion,
            cast,
        },
        target,
        span,
    )
}

/// Convert `expr` to `target` with no diagnostics, for values whose
/// conversion is decided at run time (late-bound copy-backs).
pub(crate) fn convert_unchecked<'ast>(table: &SymbolTable, expr: BoundExpr<'ast>, target: &DataType) -> BoundExpr<'ast> {
    let target = table.normalize(target.clone());
    if expr.ty == target {
        return expr;
    }
    let conversion = classify(table, &expr.ty, &target);
    conversion_node(expr, conversion, None, target)
}

/// Fold `value` into `target`, or `None` when the result is not a constant.
fn fold_conversion(table: &SymbolTable, value: &ConstantValue, target: &DataType) -> Option<FoldResult> {
    let kind = target.as_primitive().or_else(|| table.enum_underlying(target));
    match kind {
        Some(kind) => match convert_constant(value, kind) {
            Err(FoldError::NotConstant) => None,
            result => Some(result),
        },
        None if matches!(value, ConstantValue::Nothing) && table.is_reference_type(target) => {
            Some(Ok(ConstantValue::Nothing))
        }
        None => None,
    }
}

/// Report a failed constant operation.
pub(crate) fn report_fold_error(b: &mut Binder<'_>, error: FoldError, span: Span) {
    match error {
        FoldError::Overflow(name) => b.error(
            DiagnosticCode::Overflow,
            span,
            format!("Constant expression not representable in type '{name}'."),
        ),
        FoldError::ZeroDivide => b.error(
            DiagnosticCode::ZeroDivide,
            span,
            "Division by zero occurred while evaluating this expression.",
        ),
        FoldError::NotConstant => {}
    }
}

#[cfg(test)]
mod tests {
    use basalt_core::{ConstantValue, DataType, DiagnosticCode, PrimitiveKind, Severity};
    use basalt_syntax::{AstBuilder, CastKind};
    use bumpalo::Bump;

    use crate::bound::BoundKind;
    use crate::conversion::ConversionClass;
    use crate::testing::{Fixture, codes};

    fn byte() -> DataType {
        DataType::primitive(PrimitiveKind::Byte)
    }

    #[test]
    fn integer_variable_to_byte_is_strict_error() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("n"));

        let mut f = Fixture::strict();
        f.local("n", DataType::integer());
        let (bound, sink) = f.bind_to(expr, &byte());
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::NarrowingConversion]);
        assert!(sink.has_errors());
    }

    #[test]
    fn integer_variable_to_byte_is_lenient_warning() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.name("n"));

        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let (bound, sink) = f.bind_to(expr, &byte());
        assert!(!bound.is_bad());
        assert_eq!(sink.diagnostics()[0].severity, Severity::Warning);
        let BoundKind::Conversion { conversion, .. } = &bound.kind else {
            panic!("expected a conversion, got {:?}", bound.kind);
        };
        assert_eq!(conversion.class, ConversionClass::Narrowing);
        assert_eq!(bound.ty, byte());
    }

    #[test]
    fn fitting_constant_narrows_silently() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.int(200));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind_to(expr, &byte());
        assert!(sink.is_empty());
        assert_eq!(
            bound.constant_value(),
            Some(&ConstantValue::Integral { kind: PrimitiveKind::Byte, value: 200 })
        );
    }

    #[test]
    fn constant_overflow_is_reported_once() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.int(300));
        let mut f = Fixture::new();
        let (bound, sink) = f.bind_to(expr, &byte());
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::Overflow]);
    }

    #[test]
    fn long_boundary_converts_to_integer() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let max = ast.alloc(ast.int_suffixed(2_147_483_647, basalt_syntax::IntegerSuffix::Long));
        let past = ast.alloc(ast.int_suffixed(2_147_483_648, basalt_syntax::IntegerSuffix::Long));
        let mut f = Fixture::strict();

        let (bound, sink) = f.bind_to(max, &DataType::integer());
        assert!(sink.is_empty());
        assert_eq!(bound.constant_value(), Some(&ConstantValue::integer(i32::MAX)));

        let (bound, sink) = f.bind_to(past, &DataType::integer());
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::Overflow]);
    }

    #[test]
    fn nothing_becomes_default_of_target() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.nothing());
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind_to(expr, &DataType::integer());
        assert!(sink.is_empty());
        assert_eq!(bound.constant_value(), Some(&ConstantValue::integer(0)));
        let (bound, _) = f.bind_to(expr, &DataType::string());
        assert_eq!(bound.constant_value(), Some(&ConstantValue::Nothing));
        assert_eq!(bound.ty, DataType::string());
    }

    #[test]
    fn explicit_floating_identity_is_kept() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.intrinsic_cast(PrimitiveKind::Double, ast.name("d")));
        let mut f = Fixture::new();
        f.local("d", DataType::double());
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert!(matches!(bound.kind, BoundKind::Conversion { cast: Some(CastKind::CType), .. }));
    }

    #[test]
    fn explicit_integral_identity_is_elided() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.intrinsic_cast(PrimitiveKind::Integer, ast.name("n")));
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let (bound, _) = f.bind(expr);
        assert!(matches!(bound.kind, BoundKind::Local { .. }));
        assert!(!bound.is_lvalue());
    }

    #[test]
    fn try_cast_to_value_type_is_rejected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.cast(
            CastKind::TryCast,
            ast.name("o"),
            ast.ty_primitive(PrimitiveKind::Integer),
        ));
        let mut f = Fixture::new();
        f.local("o", DataType::Object);
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::TryCastNeedsReference]);
    }

    #[test]
    fn direct_cast_between_primitives_is_rejected() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.cast(
            CastKind::DirectCast,
            ast.name("n"),
            ast.ty_primitive(PrimitiveKind::Long),
        ));
        let mut f = Fixture::new();
        f.local("n", DataType::integer());
        let (bound, sink) = f.bind(expr);
        assert!(bound.is_bad());
        assert_eq!(codes(&sink), vec![DiagnosticCode::DirectCastInvalid]);
    }

    #[test]
    fn ctype_folds_constants() {
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.intrinsic_cast(PrimitiveKind::Integer, ast.double(2.5)));
        let mut f = Fixture::strict();
        let (bound, sink) = f.bind(expr);
        assert!(sink.is_empty());
        assert_eq!(bound.constant_value(), Some(&ConstantValue::integer(2)));
    }
}
