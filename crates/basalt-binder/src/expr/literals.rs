//! Literal tokens.

use std::str::FromStr;

use basalt_core::{ConstantValue, Decimal, PrimitiveKind};
use basalt_syntax::{FloatSuffix, IntegerSuffix, LiteralExpr, LiteralKind};
use ordered_float::OrderedFloat;

use crate::binder::Binder;
use crate::bound::{BoundExpr, BoundFlags};
use crate::constant::FoldError;

use super::convert::report_fold_error;

/// Bind a literal to a constant of its natural type.
///
/// An unsuffixed integral literal is `Integer` when it fits and `Long`
/// otherwise. A value out of range of its type is reported as overflow.
pub(crate) fn bind_literal<'ast>(b: &mut Binder<'_>, lit: &LiteralExpr<'ast>) -> BoundExpr<'ast> {
    let span = lit.span;
    match literal_value(lit.kind) {
        Ok(value) => {
            let ty = value.data_type();
            BoundExpr::constant(value, ty, span).with_flags(BoundFlags::FROM_LITERAL)
        }
        Err(error) => {
            report_fold_error(b, error, span);
            BoundExpr::bad(span)
        }
    }
}

fn literal_value(kind: LiteralKind<'_>) -> Result<ConstantValue, FoldError> {
    let value = match kind {
        LiteralKind::Integer { value, suffix } => return integer_value(value, suffix),
        LiteralKind::Floating { value, suffix } => match suffix {
            FloatSuffix::Single => single(value)?,
            FloatSuffix::None | FloatSuffix::Double => ConstantValue::Double(OrderedFloat(value)),
        },
        LiteralKind::Decimal(text) => decimal(text)?,
        LiteralKind::Char(c) => ConstantValue::Char(c),
        LiteralKind::String(s) => ConstantValue::String(s.to_string()),
        LiteralKind::Date(ticks) => ConstantValue::Date(ticks),
        LiteralKind::Boolean(v) => ConstantValue::Boolean(v),
    };
    Ok(value)
}

fn integer_value(value: u64, suffix: IntegerSuffix) -> Result<ConstantValue, FoldError> {
    let kind = match suffix {
        IntegerSuffix::None if value <= i32::MAX as u64 => PrimitiveKind::Integer,
        IntegerSuffix::None => PrimitiveKind::Long,
        IntegerSuffix::Short => PrimitiveKind::Short,
        IntegerSuffix::UShort => PrimitiveKind::UShort,
        IntegerSuffix::Integer => PrimitiveKind::Integer,
        IntegerSuffix::UInteger => PrimitiveKind::UInteger,
        IntegerSuffix::Long => PrimitiveKind::Long,
        IntegerSuffix::ULong => PrimitiveKind::ULong,
        IntegerSuffix::Decimal => return Ok(ConstantValue::Decimal(Decimal::from(value))),
        IntegerSuffix::Single => return single(value as f64),
        IntegerSuffix::Double => return Ok(ConstantValue::Double(OrderedFloat(value as f64))),
    };
    let (_, max) = kind.integral_range().ok_or(FoldError::overflow(kind))?;
    let value = i128::from(value);
    if value > max {
        return Err(FoldError::overflow(kind));
    }
    Ok(ConstantValue::Integral { kind, value })
}

fn single(value: f64) -> Result<ConstantValue, FoldError> {
    let narrowed = value as f32;
    if narrowed.is_infinite() && value.is_finite() {
        return Err(FoldError::overflow(PrimitiveKind::Single));
    }
    Ok(ConstantValue::Single(OrderedFloat(narrowed)))
}

fn decimal(text: &str) -> Result<ConstantValue, FoldError> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map(ConstantValue::Decimal)
        .map_err(|_| FoldError::overflow(PrimitiveKind::Decimal))
}
