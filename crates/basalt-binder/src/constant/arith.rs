//! Operator evaluation on constants.

use std::cmp::Ordering;
use std::hint::black_box;

use basalt_core::{ConstantValue, PrimitiveKind};
use basalt_syntax::{BinaryOp, UnaryOp};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;

use super::convert::truncate_integral;
use super::{FoldError, FoldResult};

/// Evaluate a unary operator whose operand is already of kind `kind`.
pub fn fold_unary(op: UnaryOp, operand: &ConstantValue, kind: PrimitiveKind) -> FoldResult {
    match (op, operand) {
        (UnaryOp::Plus, _) => Ok(operand.clone()),
        (UnaryOp::Negate, ConstantValue::Integral { value, .. }) => integral(-*value, kind),
        (UnaryOp::Negate, ConstantValue::Single(v)) => Ok(ConstantValue::Single(OrderedFloat(-v.0))),
        (UnaryOp::Negate, ConstantValue::Double(v)) => Ok(ConstantValue::double(-v.0)),
        (UnaryOp::Negate, ConstantValue::Decimal(d)) => Ok(ConstantValue::Decimal(-*d)),
        (UnaryOp::Not, ConstantValue::Boolean(b)) => Ok(ConstantValue::Boolean(!*b)),
        (UnaryOp::Not, ConstantValue::Integral { value, .. }) => Ok(ConstantValue::Integral {
            kind,
            value: truncate_integral(!*value, kind).0,
        }),
        _ => Err(FoldError::NotConstant),
    }
}

/// Evaluate a binary operator whose operands are already of kind `kind`.
///
/// Comparisons produce `Boolean`; everything else produces `kind`.
pub fn fold_binary(op: BinaryOp, left: &ConstantValue, right: &ConstantValue, kind: PrimitiveKind) -> FoldResult {
    if matches!(op, BinaryOp::Like | BinaryOp::Is | BinaryOp::IsNot) {
        return Err(FoldError::NotConstant);
    }
    match kind {
        k if k.is_integral() => {
            let (Some(l), Some(r)) = (left.as_integral(), right.as_integral()) else {
                return Err(FoldError::NotConstant);
            };
            fold_integral(op, l, r, k)
        }
        PrimitiveKind::Single | PrimitiveKind::Double => {
            let (Some(l), Some(r)) = (as_f64(left), as_f64(right)) else {
                return Err(FoldError::NotConstant);
            };
            fold_floating(op, l, r, kind)
        }
        PrimitiveKind::Decimal => match (left, right) {
            (ConstantValue::Decimal(l), ConstantValue::Decimal(r)) => fold_decimal(op, *l, *r),
            _ => Err(FoldError::NotConstant),
        },
        PrimitiveKind::Boolean => match (left, right) {
            (ConstantValue::Boolean(l), ConstantValue::Boolean(r)) => fold_boolean(op, *l, *r),
            _ => Err(FoldError::NotConstant),
        },
        PrimitiveKind::String => {
            let (Some(l), Some(r)) = (as_text(left), as_text(right)) else {
                return Err(FoldError::NotConstant);
            };
            match op {
                BinaryOp::Concatenate | BinaryOp::Add => Ok(ConstantValue::String(format!("{l}{r}"))),
                _ => compare(op, l.cmp(r)),
            }
        }
        PrimitiveKind::Char => match (left, right) {
            (ConstantValue::Char(l), ConstantValue::Char(r)) => compare(op, l.cmp(r)),
            _ => Err(FoldError::NotConstant),
        },
        PrimitiveKind::Date => match (left, right) {
            (ConstantValue::Date(l), ConstantValue::Date(r)) => compare(op, l.cmp(r)),
            _ => Err(FoldError::NotConstant),
        },
        _ => Err(FoldError::NotConstant),
    }
}

fn integral(value: i128, kind: PrimitiveKind) -> FoldResult {
    match truncate_integral(value, kind) {
        (v, false) => Ok(ConstantValue::Integral { kind, value: v }),
        (_, true) => Err(FoldError::overflow(kind)),
    }
}

fn checked(value: Option<i128>, kind: PrimitiveKind) -> FoldResult {
    value.map_or(Err(FoldError::overflow(kind)), |v| integral(v, kind))
}

fn fold_integral(op: BinaryOp, l: i128, r: i128, kind: PrimitiveKind) -> FoldResult {
    let width = kind.bit_width().unwrap_or(64) as i128;
    match op {
        BinaryOp::Add => checked(l.checked_add(r), kind),
        BinaryOp::Subtract => checked(l.checked_sub(r), kind),
        BinaryOp::Multiply => checked(l.checked_mul(r), kind),
        BinaryOp::IntegerDivide if r == 0 => Err(FoldError::ZeroDivide),
        BinaryOp::IntegerDivide => integral(l / r, kind),
        BinaryOp::Modulo if r == 0 => Err(FoldError::ZeroDivide),
        BinaryOp::Modulo => integral(l % r, kind),
        BinaryOp::And => integral(l & r, kind),
        BinaryOp::Or => integral(l | r, kind),
        BinaryOp::Xor => integral(l ^ r, kind),
        BinaryOp::ShiftLeft => {
            let amount = (r & (width - 1)) as u32;
            Ok(ConstantValue::Integral {
                kind,
                value: truncate_integral(l << amount, kind).0,
            })
        }
        BinaryOp::ShiftRight => {
            let amount = (r & (width - 1)) as u32;
            Ok(ConstantValue::Integral { kind, value: l >> amount })
        }
        _ => compare(op, l.cmp(&r)),
    }
}

fn fold_floating(op: BinaryOp, l: f64, r: f64, kind: PrimitiveKind) -> FoldResult {
    let value = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Subtract => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide => l / r,
        BinaryOp::Modulo => l % r,
        BinaryOp::Power => l.powf(r),
        _ => {
            return match l.partial_cmp(&r) {
                Some(ordering) => compare(op, ordering),
                // NaN compares unequal to everything.
                None => Ok(ConstantValue::Boolean(op == BinaryOp::NotEquals)),
            };
        }
    };
    if kind == PrimitiveKind::Single {
        Ok(ConstantValue::Single(OrderedFloat(black_box(value as f32))))
    } else {
        Ok(ConstantValue::double(value))
    }
}

fn fold_decimal(op: BinaryOp, l: Decimal, r: Decimal) -> FoldResult {
    let overflow = FoldError::overflow(PrimitiveKind::Decimal);
    let value = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Subtract => l.checked_sub(r),
        BinaryOp::Multiply => l.checked_mul(r),
        BinaryOp::Divide | BinaryOp::Modulo if r.is_zero() => return Err(FoldError::ZeroDivide),
        BinaryOp::Divide => l.checked_div(r),
        BinaryOp::Modulo => l.checked_rem(r),
        _ => return compare(op, l.cmp(&r)),
    };
    value.map(ConstantValue::Decimal).ok_or(overflow)
}

fn fold_boolean(op: BinaryOp, l: bool, r: bool) -> FoldResult {
    match op {
        BinaryOp::And | BinaryOp::AndAlso => Ok(ConstantValue::Boolean(l && r)),
        BinaryOp::Or | BinaryOp::OrElse => Ok(ConstantValue::Boolean(l || r)),
        BinaryOp::Xor => Ok(ConstantValue::Boolean(l ^ r)),
        // True is -1, so it orders below False.
        _ => compare(op, (-(l as i8)).cmp(&-(r as i8))),
    }
}

fn compare(op: BinaryOp, ordering: Ordering) -> FoldResult {
    let result = match op {
        BinaryOp::Equals => ordering == Ordering::Equal,
        BinaryOp::NotEquals => ordering != Ordering::Equal,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterEqual => ordering != Ordering::Less,
        _ => return Err(FoldError::NotConstant),
    };
    Ok(ConstantValue::Boolean(result))
}

fn as_f64(value: &ConstantValue) -> Option<f64> {
    match value {
        ConstantValue::Single(v) => Some(v.0 as f64),
        ConstantValue::Double(v) => Some(v.0),
        _ => None,
    }
}

/// String operands; `Nothing` behaves as the empty string.
fn as_text(value: &ConstantValue) -> Option<&str> {
    match value {
        ConstantValue::String(s) => Some(s),
        ConstantValue::Nothing => Some(""),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i32) -> ConstantValue {
        ConstantValue::integer(v)
    }

    #[test]
    fn integral_overflow() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &int(i32::MAX), &int(1), PrimitiveKind::Integer),
            Err(FoldError::Overflow("Integer"))
        );
        assert_eq!(
            fold_binary(BinaryOp::Multiply, &int(46341), &int(46341), PrimitiveKind::Integer),
            Err(FoldError::Overflow("Integer"))
        );
        assert_eq!(
            fold_binary(BinaryOp::IntegerDivide, &int(i32::MIN), &int(-1), PrimitiveKind::Integer),
            Err(FoldError::Overflow("Integer"))
        );
    }

    #[test]
    fn wide_integral_overflow() {
        let ulong_max = ConstantValue::Integral {
            kind: PrimitiveKind::ULong,
            value: u64::MAX as i128,
        };
        assert_eq!(
            fold_binary(BinaryOp::Multiply, &ulong_max, &ulong_max, PrimitiveKind::ULong),
            Err(FoldError::Overflow("ULong"))
        );
        assert_eq!(
            fold_binary(
                BinaryOp::Add,
                &ulong_max,
                &ConstantValue::Integral {
                    kind: PrimitiveKind::ULong,
                    value: 1
                },
                PrimitiveKind::ULong
            ),
            Err(FoldError::Overflow("ULong"))
        );
        let long = ConstantValue::long;
        assert_eq!(
            fold_binary(BinaryOp::Multiply, &long(i64::MIN), &long(i64::MIN), PrimitiveKind::Long),
            Err(FoldError::Overflow("Long"))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, &long(i64::MAX), &long(1), PrimitiveKind::Long),
            Err(FoldError::Overflow("Long"))
        );
        assert_eq!(
            fold_binary(BinaryOp::Subtract, &long(i64::MIN), &long(1), PrimitiveKind::Long),
            Err(FoldError::Overflow("Long"))
        );
        assert_eq!(
            fold_binary(BinaryOp::Multiply, &long(-3_037_000_499), &long(3_037_000_499), PrimitiveKind::Long),
            Ok(long(-9_223_372_030_926_249_001))
        );
    }

    #[test]
    fn integral_zero_divide() {
        assert_eq!(
            fold_binary(BinaryOp::IntegerDivide, &int(5), &int(0), PrimitiveKind::Integer),
            Err(FoldError::ZeroDivide)
        );
        assert_eq!(
            fold_binary(BinaryOp::Modulo, &int(5), &int(0), PrimitiveKind::Integer),
            Err(FoldError::ZeroDivide)
        );
    }

    #[test]
    fn floating_division_by_zero_is_infinite() {
        let v = fold_binary(
            BinaryOp::Divide,
            &ConstantValue::double(5.0),
            &ConstantValue::double(0.0),
            PrimitiveKind::Double,
        );
        assert_eq!(v, Ok(ConstantValue::double(f64::INFINITY)));
    }

    #[test]
    fn decimal_division_by_zero_is_an_error() {
        let v = fold_binary(
            BinaryOp::Divide,
            &ConstantValue::Decimal(Decimal::ONE),
            &ConstantValue::Decimal(Decimal::ZERO),
            PrimitiveKind::Decimal,
        );
        assert_eq!(v, Err(FoldError::ZeroDivide));
    }

    #[test]
    fn shifts_mask_their_count() {
        assert_eq!(
            fold_binary(BinaryOp::ShiftLeft, &int(1), &int(33), PrimitiveKind::Integer),
            Ok(int(2))
        );
        assert_eq!(
            fold_binary(BinaryOp::ShiftLeft, &int(1), &int(31), PrimitiveKind::Integer),
            Ok(int(i32::MIN))
        );
        assert_eq!(
            fold_binary(BinaryOp::ShiftRight, &int(-8), &int(1), PrimitiveKind::Integer),
            Ok(int(-4))
        );
    }

    #[test]
    fn negation_overflow() {
        assert_eq!(
            fold_unary(UnaryOp::Negate, &int(i32::MIN), PrimitiveKind::Integer),
            Err(FoldError::Overflow("Integer"))
        );
        assert_eq!(fold_unary(UnaryOp::Negate, &int(5), PrimitiveKind::Integer), Ok(int(-5)));
    }

    #[test]
    fn not_stays_in_width() {
        let byte = ConstantValue::Integral {
            kind: PrimitiveKind::Byte,
            value: 0,
        };
        assert_eq!(
            fold_unary(UnaryOp::Not, &byte, PrimitiveKind::Byte),
            Ok(ConstantValue::Integral {
                kind: PrimitiveKind::Byte,
                value: 255
            })
        );
    }

    #[test]
    fn string_concatenation_and_comparison() {
        let a = ConstantValue::string("ab");
        let b = ConstantValue::string("cd");
        assert_eq!(
            fold_binary(BinaryOp::Concatenate, &a, &b, PrimitiveKind::String),
            Ok(ConstantValue::string("abcd"))
        );
        assert_eq!(
            fold_binary(BinaryOp::Less, &a, &b, PrimitiveKind::String),
            Ok(ConstantValue::Boolean(true))
        );
        assert_eq!(
            fold_binary(BinaryOp::Equals, &ConstantValue::Nothing, &ConstantValue::string(""), PrimitiveKind::String),
            Ok(ConstantValue::Boolean(true))
        );
    }

    #[test]
    fn true_orders_below_false() {
        assert_eq!(
            fold_binary(
                BinaryOp::Less,
                &ConstantValue::Boolean(true),
                &ConstantValue::Boolean(false),
                PrimitiveKind::Boolean
            ),
            Ok(ConstantValue::Boolean(true))
        );
    }

    #[test]
    fn like_is_never_folded() {
        let a = ConstantValue::string("a");
        assert_eq!(
            fold_binary(BinaryOp::Like, &a, &a, PrimitiveKind::String),
            Err(FoldError::NotConstant)
        );
    }
}
