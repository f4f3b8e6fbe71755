//! Conversion of constants between primitive kinds.

use std::hint::black_box;

use basalt_core::{ConstantValue, PrimitiveKind};
use ordered_float::OrderedFloat;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use super::{FoldError, FoldResult, Numeric};

/// The value `Nothing` takes when converted to `kind`.
pub fn default_value(kind: PrimitiveKind) -> ConstantValue {
    match kind {
        PrimitiveKind::Boolean => ConstantValue::Boolean(false),
        PrimitiveKind::Single => ConstantValue::Single(OrderedFloat(0.0)),
        PrimitiveKind::Double => ConstantValue::Double(OrderedFloat(0.0)),
        PrimitiveKind::Decimal => ConstantValue::Decimal(Decimal::ZERO),
        PrimitiveKind::Char => ConstantValue::Char('\0'),
        PrimitiveKind::String => ConstantValue::Nothing,
        PrimitiveKind::Date => ConstantValue::Date(0),
        integral => ConstantValue::Integral { kind: integral, value: 0 },
    }
}

/// Truncate `value` to `kind`'s width with that kind's sign extension.
///
/// Returns the truncated value and whether it differs from the input.
pub fn truncate_integral(value: i128, kind: PrimitiveKind) -> (i128, bool) {
    let Some(bits) = kind.bit_width() else {
        return (value, false);
    };
    let mask: u128 = (1u128 << bits) - 1;
    let raw = (value as u128) & mask;
    let truncated = if kind.is_unsigned() {
        raw as i128
    } else {
        let shift = 128 - bits;
        ((raw << shift) as i128) >> shift
    };
    (truncated, truncated != value)
}

fn checked_integral(value: i128, kind: PrimitiveKind) -> FoldResult {
    match truncate_integral(value, kind) {
        (truncated, false) => Ok(ConstantValue::Integral { kind, value: truncated }),
        (_, true) => Err(FoldError::overflow(kind)),
    }
}

/// Convert a constant to `target`.
///
/// Floating and decimal values round half to even when converted to an
/// integral kind. `True` converts to -1, or to the maximum value of an
/// unsigned kind.
pub fn convert_constant(value: &ConstantValue, target: PrimitiveKind) -> FoldResult {
    if value.primitive_kind() == Some(target) {
        return Ok(value.clone());
    }
    if matches!(value, ConstantValue::Nothing) {
        return Ok(default_value(target));
    }

    match target {
        PrimitiveKind::String => match value {
            ConstantValue::Char(c) => Ok(ConstantValue::String(c.to_string())),
            _ => Err(FoldError::NotConstant),
        },
        PrimitiveKind::Char | PrimitiveKind::Date => Err(FoldError::NotConstant),
        PrimitiveKind::Boolean => {
            let n = Numeric::of(value).ok_or(FoldError::NotConstant)?;
            Ok(ConstantValue::Boolean(!is_zero(n)))
        }
        PrimitiveKind::Single => {
            if let ConstantValue::Decimal(d) = value {
                return d
                    .to_f32()
                    .map(|v| ConstantValue::Single(OrderedFloat(v)))
                    .ok_or(FoldError::overflow(target));
            }
            let n = Numeric::of(value).ok_or(FoldError::NotConstant)?;
            to_single(n)
        }
        PrimitiveKind::Double => {
            let n = Numeric::of(value).ok_or(FoldError::NotConstant)?;
            to_double(n)
        }
        PrimitiveKind::Decimal => {
            if let ConstantValue::Single(v) = value {
                return Decimal::from_f32(v.0)
                    .map(ConstantValue::Decimal)
                    .ok_or(FoldError::overflow(target));
            }
            let n = Numeric::of(value).ok_or(FoldError::NotConstant)?;
            to_decimal(n)
        }
        integral => {
            if let ConstantValue::Boolean(b) = value {
                let v = match (*b, integral.integral_range()) {
                    (false, _) => 0,
                    (true, Some((_, max))) if integral.is_unsigned() => max,
                    (true, _) => -1,
                };
                return Ok(ConstantValue::Integral { kind: integral, value: v });
            }
            let n = Numeric::of(value).ok_or(FoldError::NotConstant)?;
            to_integral(n, integral)
        }
    }
}

/// Whether a constant narrowing to `target` keeps its value, which makes the
/// conversion acceptable without an explicit cast.
pub fn fits_without_loss(value: &ConstantValue, target: PrimitiveKind) -> bool {
    let Some(source) = value.primitive_kind() else {
        return false;
    };
    let allowed = (source.is_integral() && target.is_integral())
        || (source == PrimitiveKind::Double && target == PrimitiveKind::Single);
    allowed && convert_constant(value, target).is_ok()
}

fn is_zero(n: Numeric) -> bool {
    match n {
        Numeric::Int(v) => v == 0,
        Numeric::Float(f) => f == 0.0,
        Numeric::Decimal(d) => d.is_zero(),
    }
}

fn to_integral(n: Numeric, kind: PrimitiveKind) -> FoldResult {
    match n {
        Numeric::Int(v) => checked_integral(v, kind),
        Numeric::Float(f) => {
            if !f.is_finite() {
                return Err(FoldError::overflow(kind));
            }
            let rounded = f.round_ties_even();
            let (min, max) = kind.integral_range().ok_or(FoldError::NotConstant)?;
            if rounded < min as f64 || rounded > max as f64 {
                return Err(FoldError::overflow(kind));
            }
            checked_integral(rounded as i128, kind)
        }
        Numeric::Decimal(d) => {
            let rounded = d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
            let v = rounded.to_i128().ok_or(FoldError::overflow(kind))?;
            checked_integral(v, kind)
        }
    }
}

/// Narrow to 32-bit floating point.
///
/// The intermediate goes through `black_box` so the rounding to single
/// precision really happens instead of being kept at double precision.
fn to_single(n: Numeric) -> FoldResult {
    let kind = PrimitiveKind::Single;
    let v = match n {
        Numeric::Int(v) => black_box(v as f32),
        Numeric::Float(f) => {
            let v = black_box(f as f32);
            if v.is_infinite() && f.is_finite() {
                return Err(FoldError::overflow(kind));
            }
            v
        }
        Numeric::Decimal(d) => d.to_f32().ok_or(FoldError::overflow(kind))?,
    };
    Ok(ConstantValue::Single(OrderedFloat(v)))
}

fn to_double(n: Numeric) -> FoldResult {
    let v = match n {
        Numeric::Int(v) => v as f64,
        Numeric::Float(f) => f,
        Numeric::Decimal(d) => d.to_f64().ok_or(FoldError::overflow(PrimitiveKind::Double))?,
    };
    Ok(ConstantValue::Double(OrderedFloat(v)))
}

fn to_decimal(n: Numeric) -> FoldResult {
    let kind = PrimitiveKind::Decimal;
    let d = match n {
        Numeric::Int(v) => Decimal::from_i128(v),
        Numeric::Float(f) if f.is_finite() => Decimal::from_f64(f),
        Numeric::Float(_) => None,
        Numeric::Decimal(d) => Some(d),
    };
    d.map(ConstantValue::Decimal).ok_or(FoldError::overflow(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(v: i64) -> ConstantValue {
        ConstantValue::long(v)
    }

    #[test]
    fn integer_boundaries() {
        assert_eq!(
            convert_constant(&long(2147483647), PrimitiveKind::Integer),
            Ok(ConstantValue::integer(i32::MAX))
        );
        assert_eq!(
            convert_constant(&long(2147483648), PrimitiveKind::Integer),
            Err(FoldError::Overflow("Integer"))
        );
        assert_eq!(
            convert_constant(&long(-2147483648), PrimitiveKind::Integer),
            Ok(ConstantValue::integer(i32::MIN))
        );
    }

    #[test]
    fn unsigned_rejects_negative() {
        assert!(convert_constant(&ConstantValue::integer(-1), PrimitiveKind::Byte).is_err());
        assert!(convert_constant(&ConstantValue::integer(255), PrimitiveKind::Byte).is_ok());
        assert!(convert_constant(&ConstantValue::integer(256), PrimitiveKind::Byte).is_err());
    }

    #[test]
    fn truncation_sign_extends() {
        assert_eq!(truncate_integral(255, PrimitiveKind::SByte), (-1, true));
        assert_eq!(truncate_integral(-1, PrimitiveKind::Byte), (255, true));
        assert_eq!(truncate_integral(100, PrimitiveKind::SByte), (100, false));
    }

    #[test]
    fn floating_rounds_half_to_even() {
        let to_int = |f: f64| convert_constant(&ConstantValue::double(f), PrimitiveKind::Integer);
        assert_eq!(to_int(2.5), Ok(ConstantValue::integer(2)));
        assert_eq!(to_int(3.5), Ok(ConstantValue::integer(4)));
        assert_eq!(to_int(-2.5), Ok(ConstantValue::integer(-2)));
        assert!(to_int(f64::NAN).is_err());
        assert!(to_int(f64::INFINITY).is_err());
        assert!(to_int(3e9).is_err());
    }

    #[test]
    fn decimal_rounds_half_to_even() {
        let d = ConstantValue::Decimal(Decimal::new(15, 1));
        assert_eq!(convert_constant(&d, PrimitiveKind::Long), Ok(ConstantValue::long(2)));
    }

    #[test]
    fn booleans() {
        let t = ConstantValue::Boolean(true);
        assert_eq!(convert_constant(&t, PrimitiveKind::Integer), Ok(ConstantValue::integer(-1)));
        assert_eq!(
            convert_constant(&t, PrimitiveKind::Byte),
            Ok(ConstantValue::Integral {
                kind: PrimitiveKind::Byte,
                value: 255
            })
        );
        assert_eq!(
            convert_constant(&ConstantValue::integer(7), PrimitiveKind::Boolean),
            Ok(ConstantValue::Boolean(true))
        );
    }

    #[test]
    fn single_precision_is_materialized() {
        let v = convert_constant(&ConstantValue::double(0.1), PrimitiveKind::Single);
        assert_eq!(v, Ok(ConstantValue::Single(OrderedFloat(0.1f32))));
        assert!(convert_constant(&ConstantValue::double(1e300), PrimitiveKind::Single).is_err());
    }

    #[test]
    fn decimal_range() {
        assert!(convert_constant(&ConstantValue::double(1e30), PrimitiveKind::Decimal).is_err());
        assert_eq!(
            convert_constant(&ConstantValue::integer(3), PrimitiveKind::Decimal),
            Ok(ConstantValue::Decimal(Decimal::from(3)))
        );
    }

    #[test]
    fn nothing_takes_default() {
        assert_eq!(
            convert_constant(&ConstantValue::Nothing, PrimitiveKind::Integer),
            Ok(ConstantValue::integer(0))
        );
        assert_eq!(
            convert_constant(&ConstantValue::Nothing, PrimitiveKind::String),
            Ok(ConstantValue::Nothing)
        );
    }

    #[test]
    fn strings_are_not_folded_to_numbers() {
        assert_eq!(
            convert_constant(&ConstantValue::string("1"), PrimitiveKind::Integer),
            Err(FoldError::NotConstant)
        );
        assert_eq!(
            convert_constant(&ConstantValue::Char('a'), PrimitiveKind::String),
            Ok(ConstantValue::string("a"))
        );
    }

    #[test]
    fn literal_fit() {
        assert!(fits_without_loss(&ConstantValue::integer(200), PrimitiveKind::Byte));
        assert!(!fits_without_loss(&ConstantValue::integer(300), PrimitiveKind::Byte));
        assert!(fits_without_loss(&ConstantValue::double(1.5), PrimitiveKind::Single));
        assert!(!fits_without_loss(&ConstantValue::double(1.5), PrimitiveKind::Integer));
    }
}
