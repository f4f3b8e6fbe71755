//! Compile-time constant values.
//!
//! Integral constants are stored widened to `i128` together with their kind;
//! every producer is responsible for keeping the value inside the kind's
//! range (the constant folder reports overflow instead of storing an
//! out-of-range value). Decimal constants use exact 96-bit fixed-point
//! arithmetic from `rust_decimal`.

use std::fmt;

use ordered_float::OrderedFloat;
use rust_decimal::Decimal;

use crate::{DataType, PrimitiveKind};

/// A typed compile-time value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    /// The `Nothing` literal.
    Nothing,
    Boolean(bool),
    /// Any integral kind; `value` always lies within `kind`'s range.
    Integral { kind: PrimitiveKind, value: i128 },
    Single(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Decimal(Decimal),
    Char(char),
    String(String),
    /// A date as a 64-bit tick count.
    Date(i64),
}

impl ConstantValue {
    /// An `Integer` constant.
    pub fn integer(value: i32) -> Self {
        ConstantValue::Integral {
            kind: PrimitiveKind::Integer,
            value: value as i128,
        }
    }

    pub fn long(value: i64) -> Self {
        ConstantValue::Integral {
            kind: PrimitiveKind::Long,
            value: value as i128,
        }
    }

    pub fn double(value: f64) -> Self {
        ConstantValue::Double(OrderedFloat(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        ConstantValue::String(value.into())
    }

    /// The primitive kind carried by this value, if any.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            ConstantValue::Nothing => None,
            ConstantValue::Boolean(_) => Some(PrimitiveKind::Boolean),
            ConstantValue::Integral { kind, .. } => Some(*kind),
            ConstantValue::Single(_) => Some(PrimitiveKind::Single),
            ConstantValue::Double(_) => Some(PrimitiveKind::Double),
            ConstantValue::Decimal(_) => Some(PrimitiveKind::Decimal),
            ConstantValue::Char(_) => Some(PrimitiveKind::Char),
            ConstantValue::String(_) => Some(PrimitiveKind::String),
            ConstantValue::Date(_) => Some(PrimitiveKind::Date),
        }
    }

    /// The natural type of the value (`Object` for `Nothing`).
    pub fn data_type(&self) -> DataType {
        self.primitive_kind()
            .map(DataType::Primitive)
            .unwrap_or(DataType::Object)
    }

    pub fn as_integral(&self) -> Option<i128> {
        match self {
            ConstantValue::Integral { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstantValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is numerically zero (integral or decimal only).
    pub fn is_exact_zero(&self) -> bool {
        match self {
            ConstantValue::Integral { value, .. } => *value == 0,
            ConstantValue::Decimal(d) => d.is_zero(),
            _ => false,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Nothing => f.write_str("Nothing"),
            ConstantValue::Boolean(true) => f.write_str("True"),
            ConstantValue::Boolean(false) => f.write_str("False"),
            ConstantValue::Integral { value, .. } => write!(f, "{value}"),
            ConstantValue::Single(v) => write!(f, "{}", v.0),
            ConstantValue::Double(v) => write!(f, "{}", v.0),
            ConstantValue::Decimal(d) => write!(f, "{d}"),
            ConstantValue::Char(c) => write!(f, "\"{c}\"c"),
            ConstantValue::String(s) => write!(f, "\"{s}\""),
            ConstantValue::Date(ticks) => write!(f, "#{ticks}#"),
        }
    }
}
