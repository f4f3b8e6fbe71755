//! Operator definitions.

use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/` (floating division)
    Divide,
    /// `\` (integral division)
    IntegerDivide,
    /// `Mod`
    Modulo,
    /// `^`
    Power,
    /// `&`
    Concatenate,
    /// `=`
    Equals,
    /// `<>`
    NotEquals,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `And`
    And,
    /// `Or`
    Or,
    /// `Xor`
    Xor,
    /// `AndAlso`
    AndAlso,
    /// `OrElse`
    OrElse,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `Like`
    Like,
    /// `Is`
    Is,
    /// `IsNot`
    IsNot,
}

impl BinaryOp {
    /// `=`, `<>`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }

    /// `And`, `Or`, `Xor`: logical on Boolean, bitwise on integral types.
    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::ShiftLeft | BinaryOp::ShiftRight)
    }

    /// `Is` / `IsNot` reference comparison.
    pub fn is_reference_comparison(self) -> bool {
        matches!(self, BinaryOp::Is | BinaryOp::IsNot)
    }

    /// Name of the user-definable operator procedure, if overloadable.
    pub fn operator_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "op_Addition",
            BinaryOp::Subtract => "op_Subtraction",
            BinaryOp::Multiply => "op_Multiply",
            BinaryOp::Divide => "op_Division",
            BinaryOp::IntegerDivide => "op_IntegerDivision",
            BinaryOp::Modulo => "op_Modulus",
            BinaryOp::Power => "op_Exponent",
            BinaryOp::Concatenate => "op_Concatenate",
            BinaryOp::Equals => "op_Equality",
            BinaryOp::NotEquals => "op_Inequality",
            BinaryOp::Less => "op_LessThan",
            BinaryOp::LessEqual => "op_LessThanOrEqual",
            BinaryOp::Greater => "op_GreaterThan",
            BinaryOp::GreaterEqual => "op_GreaterThanOrEqual",
            BinaryOp::And => "op_BitwiseAnd",
            BinaryOp::Or => "op_BitwiseOr",
            BinaryOp::Xor => "op_ExclusiveOr",
            BinaryOp::ShiftLeft => "op_LeftShift",
            BinaryOp::ShiftRight => "op_RightShift",
            BinaryOp::Like => "op_Like",
            BinaryOp::AndAlso | BinaryOp::OrElse | BinaryOp::Is | BinaryOp::IsNot => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntegerDivide => "\\",
            BinaryOp::Modulo => "Mod",
            BinaryOp::Power => "^",
            BinaryOp::Concatenate => "&",
            BinaryOp::Equals => "=",
            BinaryOp::NotEquals => "<>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Xor => "Xor",
            BinaryOp::AndAlso => "AndAlso",
            BinaryOp::OrElse => "OrElse",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Like => "Like",
            BinaryOp::Is => "Is",
            BinaryOp::IsNot => "IsNot",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `+`
    Plus,
    /// `Not`
    Not,
}

impl UnaryOp {
    pub fn operator_name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "op_UnaryNegation",
            UnaryOp::Plus => "op_UnaryPlus",
            UnaryOp::Not => "op_OnesComplement",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "Not",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
