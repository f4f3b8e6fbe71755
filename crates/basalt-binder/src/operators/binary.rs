//! Binary operator promotion table.

use basalt_core::PrimitiveKind;
use basalt_syntax::BinaryOp;

use super::OperatorKinds;

use PrimitiveKind::*;

/// The numeric kind both operands of an arithmetic operator widen to.
///
/// `Boolean` acts as `SByte`, except that two `Boolean` operands give
/// `Short`. Mixing signed and unsigned integrals moves to the next wider
/// signed kind; `ULong` with a signed kind gives `Decimal`. `String`
/// operands take part as `Double`.
pub fn promote_numeric(left: PrimitiveKind, right: PrimitiveKind) -> Option<PrimitiveKind> {
    if left == Boolean && right == Boolean {
        return Some(Short);
    }
    let left = numeric_view(left)?;
    let right = numeric_view(right)?;
    if left == right {
        return Some(left);
    }
    if left == Double || right == Double {
        return Some(Double);
    }
    if left == Single || right == Single {
        return Some(Single);
    }
    if left == Decimal || right == Decimal {
        return Some(Decimal);
    }

    let (lw, rw) = (left.bit_width()?, right.bit_width()?);
    if left.is_unsigned() == right.is_unsigned() {
        return Some(if lw >= rw { left } else { right });
    }
    let (unsigned_width, signed, signed_width) = if left.is_unsigned() {
        (lw, right, rw)
    } else {
        (rw, left, lw)
    };
    if signed_width > unsigned_width {
        return Some(signed);
    }
    Some(PrimitiveKind::signed_of_width(unsigned_width * 2).unwrap_or(Decimal))
}

fn numeric_view(kind: PrimitiveKind) -> Option<PrimitiveKind> {
    match kind {
        Boolean => Some(SByte),
        String => Some(Double),
        k if k.is_numeric() => Some(k),
        _ => None,
    }
}

/// Integral kind for bitwise and shift operators: non-integral numeric
/// operands work as `Long`.
fn integral_view(kind: PrimitiveKind) -> PrimitiveKind {
    if kind.is_integral() { kind } else { Long }
}

/// Operand and result kinds of `op` on primitive operands.
pub fn binary_kinds(op: BinaryOp, left: PrimitiveKind, right: PrimitiveKind) -> Option<OperatorKinds> {
    use BinaryOp::*;
    let uniform = OperatorKinds::uniform;
    match op {
        Add if left == String && right == String => Some(uniform(String, String)),
        Add | Subtract | Multiply | Modulo => {
            let k = promote_numeric(left, right)?;
            Some(uniform(k, k))
        }
        Divide => {
            let k = match promote_numeric(left, right)? {
                Single => Single,
                Decimal => Decimal,
                _ => Double,
            };
            Some(uniform(k, k))
        }
        IntegerDivide => {
            let k = integral_view(promote_numeric(left, right)?);
            Some(uniform(k, k))
        }
        Power => {
            promote_numeric(left, right)?;
            Some(uniform(Double, Double))
        }
        // Every primitive converts to String.
        Concatenate => Some(uniform(String, String)),
        Like => Some(uniform(String, Boolean)),
        Equals | NotEquals | Less | LessEqual | Greater | GreaterEqual => {
            comparison_kind(left, right).map(|k| uniform(k, Boolean))
        }
        And | Or | Xor => {
            if left == Boolean && right == Boolean {
                return Some(uniform(Boolean, Boolean));
            }
            let k = integral_view(promote_numeric(left, right)?);
            Some(uniform(k, k))
        }
        AndAlso | OrElse => {
            let logical = |k: PrimitiveKind| k == Boolean || k.is_numeric() || k == String;
            (logical(left) && logical(right)).then(|| uniform(Boolean, Boolean))
        }
        ShiftLeft | ShiftRight => {
            numeric_view(right)?;
            let k = match left {
                Boolean => Short,
                other => integral_view(numeric_view(other)?),
            };
            Some(OperatorKinds {
                left: k,
                right: Integer,
                result: k,
            })
        }
        Is | IsNot => None,
    }
}

fn comparison_kind(left: PrimitiveKind, right: PrimitiveKind) -> Option<PrimitiveKind> {
    match (left, right) {
        (Boolean, Boolean) => Some(Boolean),
        (String, String) | (Char, String) | (String, Char) => Some(String),
        (Char, Char) => Some(Char),
        (Date, Date) | (Date, String) | (String, Date) => Some(Date),
        _ => promote_numeric(left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_sign_moves_to_wider_signed() {
        assert_eq!(promote_numeric(Byte, SByte), Some(Short));
        assert_eq!(promote_numeric(UShort, Short), Some(Integer));
        assert_eq!(promote_numeric(UInteger, Integer), Some(Long));
        assert_eq!(promote_numeric(ULong, Long), Some(Decimal));
        assert_eq!(promote_numeric(Byte, Integer), Some(Integer));
    }

    #[test]
    fn boolean_arithmetic() {
        assert_eq!(promote_numeric(Boolean, Boolean), Some(Short));
        assert_eq!(promote_numeric(Boolean, Integer), Some(Integer));
        assert_eq!(promote_numeric(Boolean, Byte), Some(Short));
    }

    #[test]
    fn floating_and_decimal() {
        assert_eq!(promote_numeric(Decimal, Single), Some(Single));
        assert_eq!(promote_numeric(Long, Decimal), Some(Decimal));
        assert_eq!(promote_numeric(Single, Double), Some(Double));
        assert_eq!(promote_numeric(Char, Integer), None);
    }

    #[test]
    fn division_results() {
        assert_eq!(binary_kinds(BinaryOp::Divide, Integer, Integer).unwrap().result, Double);
        assert_eq!(binary_kinds(BinaryOp::Divide, Decimal, Integer).unwrap().result, Decimal);
        assert_eq!(binary_kinds(BinaryOp::IntegerDivide, Double, Integer).unwrap().result, Long);
        assert_eq!(binary_kinds(BinaryOp::IntegerDivide, Short, Byte).unwrap().result, Short);
        assert_eq!(binary_kinds(BinaryOp::Power, Integer, Integer).unwrap().result, Double);
    }

    #[test]
    fn strings() {
        assert_eq!(binary_kinds(BinaryOp::Add, String, String).unwrap().result, String);
        assert_eq!(binary_kinds(BinaryOp::Add, String, Integer).unwrap().result, Double);
        assert_eq!(binary_kinds(BinaryOp::Concatenate, Integer, Date).unwrap().left, String);
        assert_eq!(binary_kinds(BinaryOp::Equals, Char, String).unwrap().left, String);
        assert!(binary_kinds(BinaryOp::Add, Char, Char).is_none());
    }

    #[test]
    fn logical_and_shift() {
        assert_eq!(binary_kinds(BinaryOp::And, Boolean, Boolean).unwrap().result, Boolean);
        assert_eq!(binary_kinds(BinaryOp::Or, Double, Integer).unwrap().result, Long);
        let shift = binary_kinds(BinaryOp::ShiftLeft, Byte, Long).unwrap();
        assert_eq!((shift.left, shift.right, shift.result), (Byte, Integer, Byte));
        assert_eq!(binary_kinds(BinaryOp::AndAlso, Integer, Boolean).unwrap().left, Boolean);
        assert!(binary_kinds(BinaryOp::Is, String, String).is_none());
    }
}
