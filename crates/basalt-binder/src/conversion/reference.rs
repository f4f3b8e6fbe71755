//! Predefined conversions involving non-primitive types.
//!
//! Covers `Object`, nullable wrapping and lifting, enums, arrays, the class
//! and interface hierarchy, generic variance and generic parameters. Both
//! types are expected to be normalized.

use basalt_core::{DataType, PrimitiveKind};
use basalt_symbols::{SymbolTable, Variance};

use super::primitive::{classify_primitive, numeric_widens};
use super::{Conversion, ConversionClass, ConversionFlags, ConversionKind};

/// Classify a predefined (language-defined) conversion.
pub fn classify_predefined(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    if source == target {
        return Conversion::IDENTITY;
    }
    match (source, target) {
        (DataType::Void, _) | (_, DataType::Void) => Conversion::ERROR,
        (DataType::Error, _) | (_, DataType::Error) => Conversion::IDENTITY,
        (DataType::Primitive(s), DataType::Primitive(t)) => classify_primitive(*s, *t),
        (DataType::Array { .. }, DataType::Primitive(PrimitiveKind::String)) if is_char_array(source) => {
            Conversion::widening(ConversionKind::Primitive)
        }
        (DataType::Primitive(PrimitiveKind::String), DataType::Array { .. }) if is_char_array(target) => {
            Conversion::narrowing(ConversionKind::Primitive)
        }

        (_, DataType::Object) => Conversion::widening(boxing_or_reference(table, source)),
        (DataType::Object, _) => Conversion::narrowing(unboxing_or_reference(table, target)),

        (_, DataType::Nullable(_)) | (DataType::Nullable(_), _) => classify_nullable(table, source, target),

        _ if table.enum_underlying(source).is_some() || table.enum_underlying(target).is_some() => {
            classify_enum(table, source, target)
        }

        (DataType::Array { .. }, DataType::Array { .. }) => classify_array(table, source, target),

        (DataType::GenericParam { .. }, _) | (_, DataType::GenericParam { .. }) => {
            Conversion::narrowing(ConversionKind::Reference)
        }

        _ => classify_hierarchy(table, source, target),
    }
}

fn is_char_array(ty: &DataType) -> bool {
    matches!(ty.array_parts(), Some((DataType::Primitive(PrimitiveKind::Char), 1)))
}

fn boxing_or_reference(table: &SymbolTable, source: &DataType) -> ConversionKind {
    if table.is_value_type(source) || matches!(source, DataType::GenericParam { .. }) {
        ConversionKind::Boxing
    } else {
        ConversionKind::Reference
    }
}

fn unboxing_or_reference(table: &SymbolTable, target: &DataType) -> ConversionKind {
    if table.is_value_type(target) || matches!(target, DataType::GenericParam { .. }) {
        ConversionKind::Unboxing
    } else {
        ConversionKind::Reference
    }
}

// ============================================================================
// Nullable
// ============================================================================

fn classify_nullable(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    match (source.nullable_underlying(), target.nullable_underlying()) {
        // S? -> T?: lifted from S -> T.
        (Some(s), Some(t)) => {
            let inner = classify_predefined(table, s, t);
            if inner.is_error() {
                return Conversion::ERROR;
            }
            Conversion::new(inner.class.max(ConversionClass::Widening), ConversionKind::Nullable)
                .with_flags(ConversionFlags::LIFTED)
        }
        // S -> T?: wraps; as good as S -> T.
        (None, Some(t)) => {
            let inner = classify_predefined(table, source, t);
            if inner.is_error() {
                return Conversion::ERROR;
            }
            Conversion::new(inner.class.max(ConversionClass::Widening), ConversionKind::Nullable)
        }
        // S? -> T: unwrapping may fail, unless T is an interface the value boxes to.
        (Some(s), None) => {
            if table.is_interface(target) && classify_predefined(table, s, target).is_widening() {
                return Conversion::widening(ConversionKind::Boxing);
            }
            let inner = classify_predefined(table, s, target);
            if inner.is_error() {
                return Conversion::ERROR;
            }
            Conversion::narrowing(ConversionKind::Nullable)
        }
        (None, None) => Conversion::ERROR,
    }
}

// ============================================================================
// Enums
// ============================================================================

fn classify_enum(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    let source_enum = table.enum_underlying(source);
    let target_enum = table.enum_underlying(target);
    match (source_enum, target_enum) {
        // Enum -> numeric: widening to the underlying type or wider.
        (Some(under), None) => match target {
            DataType::Primitive(t) if *t == under => {
                Conversion::widening(ConversionKind::Enum).with_flags(ConversionFlags::ENUM_NOOP)
            }
            DataType::Primitive(t) if t.is_numeric() => {
                let class = if numeric_widens(under, *t) {
                    ConversionClass::Widening
                } else {
                    ConversionClass::Narrowing
                };
                Conversion::new(class, ConversionKind::Enum)
            }
            DataType::Primitive(t) => {
                let inner = classify_primitive(under, *t);
                if inner.is_error() {
                    Conversion::ERROR
                } else {
                    Conversion::narrowing(ConversionKind::Enum)
                }
            }
            _ => classify_hierarchy(table, source, target),
        },
        // Numeric -> enum: always narrowing.
        (None, Some(under)) => match source {
            DataType::Primitive(s) if s.is_numeric() => {
                let conversion = Conversion::narrowing(ConversionKind::Enum);
                if *s == under {
                    conversion.with_flags(ConversionFlags::ENUM_NOOP)
                } else {
                    conversion
                }
            }
            DataType::Primitive(s) if classify_primitive(*s, under).exists() => {
                Conversion::narrowing(ConversionKind::Enum)
            }
            DataType::Primitive(_) => Conversion::ERROR,
            _ => classify_hierarchy(table, source, target),
        },
        // Enum -> other enum.
        (Some(s), Some(t)) => {
            let conversion = Conversion::narrowing(ConversionKind::Enum);
            if s == t {
                conversion.with_flags(ConversionFlags::ENUM_NOOP)
            } else {
                conversion
            }
        }
        (None, None) => Conversion::ERROR,
    }
}

// ============================================================================
// Arrays
// ============================================================================

fn classify_array(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    let (Some((se, sr)), Some((te, tr))) = (source.array_parts(), target.array_parts()) else {
        return Conversion::ERROR;
    };
    if sr != tr {
        return Conversion::ERROR;
    }
    if se == te {
        return Conversion::IDENTITY;
    }

    // Covariance only reinterprets references; value elements must match,
    // except an enum and its underlying type which share a representation.
    if table.is_reference_type(se) && table.is_reference_type(te) {
        let element = classify_predefined(table, se, te);
        return match element.class {
            ConversionClass::Identity | ConversionClass::Widening => Conversion::widening(ConversionKind::Array),
            ConversionClass::Narrowing if element.kind == ConversionKind::Reference => {
                Conversion::narrowing(ConversionKind::Array)
            }
            _ => Conversion::ERROR,
        };
    }
    if matches!(se, DataType::GenericParam { .. }) || matches!(te, DataType::GenericParam { .. }) {
        return Conversion::narrowing(ConversionKind::Array);
    }
    let element = classify_predefined(table, se, te);
    if element.kind == ConversionKind::Enum && element.flags.contains(ConversionFlags::ENUM_NOOP) {
        return Conversion::new(element.class, ConversionKind::Array);
    }
    Conversion::ERROR
}

// ============================================================================
// Class and Interface Hierarchy
// ============================================================================

/// Whether `source` converts to `target` through generic variance: both are
/// instantiations of the same generic type, and each type argument is
/// identical, or reference-convertible in the direction its parameter's
/// declared variance allows.
pub(crate) fn variance_convertible(table: &SymbolTable, source: &DataType, target: &DataType) -> bool {
    let (
        DataType::Named { hash: sh, args: sa },
        DataType::Named { hash: th, args: ta },
    ) = (source, target)
    else {
        return false;
    };
    if sh != th || sa.len() != ta.len() || sa.is_empty() {
        return false;
    }
    let Some(entry) = table.get_type(*sh) else {
        return false;
    };
    if !entry.is_interface() && !entry.is_delegate() {
        return false;
    }
    sa.iter().zip(ta).enumerate().all(|(i, (s, t))| {
        s == t
            || match entry.variance(i) {
                Variance::Invariant => false,
                Variance::Out => reference_widens(table, s, t),
                Variance::In => reference_widens(table, t, s),
            }
    })
}

/// Widening that keeps the reference (no boxing, no representation change).
fn reference_widens(table: &SymbolTable, source: &DataType, target: &DataType) -> bool {
    if !table.is_reference_type(source) || !table.is_reference_type(target) {
        return false;
    }
    let conversion = classify_predefined(table, source, target);
    conversion.is_widening() && matches!(conversion.kind, ConversionKind::Reference | ConversionKind::Array)
}

fn classify_hierarchy(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    let source_value = table.is_value_type(source);
    let target_value = table.is_value_type(target);
    let up_kind = if source_value {
        ConversionKind::Boxing
    } else {
        ConversionKind::Reference
    };
    let down_kind = if target_value {
        ConversionKind::Unboxing
    } else {
        ConversionKind::Reference
    };

    // Up the hierarchy.
    if table.is_derived_from(source, target) {
        return Conversion::widening(up_kind);
    }
    if table.is_interface(target) {
        let implemented = table.interfaces_of(source);
        if implemented.contains(target) || implemented.iter().any(|i| variance_convertible(table, i, target)) {
            return Conversion::widening(up_kind);
        }
    }
    if variance_convertible(table, source, target) {
        return Conversion::widening(ConversionKind::Reference);
    }

    // Down the hierarchy.
    if table.is_derived_from(target, source) {
        return Conversion::narrowing(down_kind);
    }
    if table.is_interface(source) {
        // A value type converts from an interface only if it implements it.
        if target_value {
            return if table.implements_interface(target, source) {
                Conversion::narrowing(ConversionKind::Unboxing)
            } else {
                Conversion::ERROR
            };
        }
        if table.is_reference_type(target) {
            return Conversion::narrowing(ConversionKind::Reference);
        }
    }
    if table.is_interface(target) && table.is_reference_type(source) && !table.is_delegate(source) {
        // Some derived class may implement the interface.
        return Conversion::narrowing(ConversionKind::Reference);
    }
    Conversion::ERROR
}
