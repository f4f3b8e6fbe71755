//! Unary operator promotion table.

use basalt_core::PrimitiveKind;
use basalt_syntax::UnaryOp;

use PrimitiveKind::*;

/// Operand and result kind of `op` applied to `operand`.
///
/// Negating an unsigned integral widens it to the next signed kind so the
/// result can hold the negated value.
pub fn unary_kinds(op: UnaryOp, operand: PrimitiveKind) -> Option<(PrimitiveKind, PrimitiveKind)> {
    let kind = match (op, operand) {
        (_, Char | Date) => return None,
        (UnaryOp::Not, Boolean) => Boolean,
        (UnaryOp::Not, k) if k.is_integral() => k,
        (UnaryOp::Not, _) => Long,
        (_, Boolean) => Short,
        (_, String) => Double,
        (UnaryOp::Plus, k) => k,
        (UnaryOp::Negate, Byte) => Short,
        (UnaryOp::Negate, UShort) => Integer,
        (UnaryOp::Negate, UInteger) => Long,
        (UnaryOp::Negate, ULong) => Decimal,
        (UnaryOp::Negate, k) => k,
    };
    Some((kind, kind))
}
