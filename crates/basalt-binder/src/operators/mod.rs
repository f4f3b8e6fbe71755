//! Intrinsic operator signatures.
//!
//! These tables decide, for predefined operators on primitive, enum and
//! nullable operands, what type each operand is converted to and what type
//! the operation produces:
//! - Primitive operands use the promotion rules in [`binary`] and [`unary`]
//! - Enum operands keep their enum type for bitwise operators and compare
//!   as their enum type; elsewhere they act as their underlying type
//! - Nullable operands lift the operator over the underlying types
//!
//! User-defined and late-bound operators are resolved by the expression
//! binder; nothing here reports diagnostics.

mod binary;
mod unary;

pub use binary::{binary_kinds, promote_numeric};
pub use unary::unary_kinds;

use basalt_core::{DataType, PrimitiveKind};
use basalt_symbols::SymbolTable;
use basalt_syntax::{BinaryOp, UnaryOp};

/// Operand and result kinds of an operator on primitive operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorKinds {
    pub left: PrimitiveKind,
    pub right: PrimitiveKind,
    pub result: PrimitiveKind,
}

impl OperatorKinds {
    pub(crate) const fn uniform(operand: PrimitiveKind, result: PrimitiveKind) -> Self {
        Self {
            left: operand,
            right: operand,
            result,
        }
    }
}

/// The types an intrinsic operator works in.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorTypes {
    /// Type the left (or only) operand is converted to.
    pub left: DataType,
    /// Type the right operand is converted to; `Void` for unary operators.
    pub right: DataType,
    pub result: DataType,
    /// Applied to the underlying types of nullable operands.
    pub lifted: bool,
}

impl OperatorTypes {
    /// Primitive kind the operands are folded in, if both agree on one.
    pub fn operand_kind(&self) -> Option<PrimitiveKind> {
        let left = self.left.as_primitive()?;
        match self.right.as_primitive() {
            Some(right) if right != left => None,
            _ => Some(left),
        }
    }
}

/// Operators that keep an enum operand's type.
fn keeps_enum(op: BinaryOp) -> bool {
    op.is_bitwise()
}

/// The primitive an operand acts as: itself, or an enum's underlying type.
fn operand_primitive(table: &SymbolTable, ty: &DataType) -> Option<PrimitiveKind> {
    ty.as_primitive().or_else(|| table.enum_underlying(ty))
}

/// Signature of a predefined binary operator, or `None` if there is none.
///
/// `Is`, `IsNot` and operators on `Object` are not intrinsic.
pub fn binary_operator_types(table: &SymbolTable, op: BinaryOp, left: &DataType, right: &DataType) -> Option<OperatorTypes> {
    if op.is_reference_comparison() || left.is_object() || right.is_object() {
        return None;
    }
    let lifted = (left.is_nullable() || right.is_nullable())
        && !matches!(op, BinaryOp::Concatenate | BinaryOp::Like);
    let (l, r) = if lifted {
        (left.strip_nullable(), right.strip_nullable())
    } else {
        (left, right)
    };

    // Same enum on both sides.
    if l == r && table.enum_underlying(l).is_some() && (keeps_enum(op) || op.is_comparison()) {
        let result = if op.is_comparison() { DataType::boolean() } else { l.clone() };
        return Some(wrap(
            OperatorTypes {
                left: l.clone(),
                right: r.clone(),
                result,
                lifted: false,
            },
            lifted,
        ));
    }

    let kinds = binary_kinds(op, operand_primitive(table, l)?, operand_primitive(table, r)?)?;
    Some(wrap(
        OperatorTypes {
            left: DataType::Primitive(kinds.left),
            right: DataType::Primitive(kinds.right),
            result: DataType::Primitive(kinds.result),
            lifted: false,
        },
        lifted,
    ))
}

/// Signature of a predefined unary operator, or `None` if there is none.
pub fn unary_operator_types(table: &SymbolTable, op: UnaryOp, operand: &DataType) -> Option<OperatorTypes> {
    if operand.is_object() {
        return None;
    }
    let lifted = operand.is_nullable();
    let inner = operand.strip_nullable();
    if op == UnaryOp::Not && table.enum_underlying(inner).is_some() {
        return Some(wrap(
            OperatorTypes {
                left: inner.clone(),
                right: DataType::Void,
                result: inner.clone(),
                lifted: false,
            },
            lifted,
        ));
    }
    let (operand_kind, result) = unary_kinds(op, operand_primitive(table, inner)?)?;
    Some(wrap(
        OperatorTypes {
            left: DataType::Primitive(operand_kind),
            right: DataType::Void,
            result: DataType::Primitive(result),
            lifted: false,
        },
        lifted,
    ))
}

/// Lift a signature over nullable operands. `String` results and operands
/// are reference types and stay as they are.
fn wrap(types: OperatorTypes, lifted: bool) -> OperatorTypes {
    if !lifted {
        return types;
    }
    let lift = |ty: DataType| {
        if ty.is_string() || ty.is_void() {
            ty
        } else {
            DataType::nullable(ty)
        }
    };
    OperatorTypes {
        left: lift(types.left),
        right: lift(types.right),
        result: lift(types.result),
        lifted: true,
    }
}
