//! Constant folding.
//!
//! Pure functions over [`ConstantValue`]: conversion between primitive
//! kinds, and evaluation of unary and binary operators whose operands have
//! already been converted to the operator's operand type. Nothing here
//! reports diagnostics; callers map a [`FoldError`] onto one at the
//! expression's location.

mod arith;
mod convert;

use basalt_core::{ConstantValue, PrimitiveKind};
use thiserror::Error;

pub use arith::{fold_binary, fold_unary};
pub use convert::{convert_constant, default_value, fits_without_loss, truncate_integral};

/// Why a constant operation could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FoldError {
    /// The result is not representable in the target type.
    #[error("constant expression not representable in type '{0}'")]
    Overflow(&'static str),
    #[error("division by zero in constant expression")]
    ZeroDivide,
    /// The operation is valid but is evaluated at run time.
    #[error("expression is not constant")]
    NotConstant,
}

impl FoldError {
    pub(crate) fn overflow(kind: PrimitiveKind) -> Self {
        FoldError::Overflow(kind.name())
    }
}

pub type FoldResult = Result<ConstantValue, FoldError>;

/// A numeric view of a constant used by the folding routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int(i128),
    Float(f64),
    Decimal(rust_decimal::Decimal),
}

impl Numeric {
    /// `True` is -1 and `False` is 0, as in every numeric context.
    pub(crate) fn of(value: &ConstantValue) -> Option<Self> {
        match value {
            ConstantValue::Boolean(b) => Some(Numeric::Int(if *b { -1 } else { 0 })),
            ConstantValue::Integral { value, .. } => Some(Numeric::Int(*value)),
            ConstantValue::Single(v) => Some(Numeric::Float(v.0 as f64)),
            ConstantValue::Double(v) => Some(Numeric::Float(v.0)),
            ConstantValue::Decimal(d) => Some(Numeric::Decimal(*d)),
            ConstantValue::Nothing => Some(Numeric::Int(0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_is_minus_one() {
        assert_eq!(Numeric::of(&ConstantValue::Boolean(true)), Some(Numeric::Int(-1)));
        assert_eq!(Numeric::of(&ConstantValue::string("x")), None);
    }

    #[test]
    fn overflow_names_the_type() {
        let err = FoldError::overflow(PrimitiveKind::Integer);
        assert_eq!(err.to_string(), "constant expression not representable in type 'Integer'");
    }
}
