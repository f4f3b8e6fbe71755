//! Conversions between primitive types.

use basalt_core::PrimitiveKind;

use super::{Conversion, ConversionClass, ConversionKind};

/// Whether the numeric conversion from `source` to `target` is widening.
///
/// Integral types widen to every integral type that can hold their whole
/// range, and every numeric type widens to `Decimal`, `Single` and `Double`
/// except in the direction of lower precision.
pub fn numeric_widens(source: PrimitiveKind, target: PrimitiveKind) -> bool {
    use PrimitiveKind::*;
    match source {
        Byte => matches!(
            target,
            Short | UShort | Integer | UInteger | Long | ULong | Decimal | Single | Double
        ),
        SByte => matches!(target, Short | Integer | Long | Decimal | Single | Double),
        Short => matches!(target, Integer | Long | Decimal | Single | Double),
        UShort => matches!(target, Integer | UInteger | Long | ULong | Decimal | Single | Double),
        Integer => matches!(target, Long | Decimal | Single | Double),
        UInteger => matches!(target, Long | ULong | Decimal | Single | Double),
        Long | ULong => matches!(target, Decimal | Single | Double),
        Decimal => matches!(target, Single | Double),
        Single => target == Double,
        _ => false,
    }
}

/// Classify a conversion between two primitive types.
pub fn classify_primitive(source: PrimitiveKind, target: PrimitiveKind) -> Conversion {
    use PrimitiveKind::*;

    let class = if source == target {
        ConversionClass::Identity
    } else if source.is_numeric() && target.is_numeric() {
        if numeric_widens(source, target) {
            ConversionClass::Widening
        } else {
            ConversionClass::Narrowing
        }
    } else {
        match (source, target) {
            (Char, String) => ConversionClass::Widening,
            (String, Char) => ConversionClass::Narrowing,
            (Boolean, t) if t.is_numeric() || t == String => ConversionClass::Narrowing,
            (s, Boolean) if s.is_numeric() || s == String => ConversionClass::Narrowing,
            (String, t) if t.is_numeric() || t == Date => ConversionClass::Narrowing,
            (s, String) if s.is_numeric() || s == Date => ConversionClass::Narrowing,
            _ => ConversionClass::Error,
        }
    };

    match class {
        ConversionClass::Identity => Conversion::IDENTITY,
        ConversionClass::Error => Conversion::ERROR,
        class => Conversion::new(class, ConversionKind::Primitive),
    }
}
