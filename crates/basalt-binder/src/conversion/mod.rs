//! Conversion classification.
//!
//! Determines whether a value of one type converts to another and how:
//!
//! 1. Identity (same type after normalization)
//! 2. Predefined conversions: primitive table, `Object`, nullable, enum,
//!    reference hierarchy, arrays and generic variance
//! 3. User-defined conversion operators, possibly lifted over nullables
//!
//! Classification is pure: it never reports. Callers decide what a
//! narrowing or failing conversion means in their context, and
//! [`explain`] produces the most specific message for a failure.

use basalt_core::{ConstantValue, DataType, TypeHash};
use basalt_symbols::SymbolTable;
use bitflags::bitflags;

mod diagnose;
mod primitive;
mod reference;
mod user_defined;

pub use diagnose::explain;
pub use primitive::{classify_primitive, numeric_widens};
pub use reference::classify_predefined;
pub use user_defined::classify_user_defined;

use crate::constant::fits_without_loss;

/// How a conversion relates its two types.
///
/// Ordered from best to worst, so `max` of two classes is the class of
/// their composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConversionClass {
    Identity,
    /// Never loses information; always implicit.
    Widening,
    /// May fail or lose information; implicit only under lenient typing.
    Narrowing,
    /// No conversion exists.
    Error,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConversionFlags: u8 {
        /// Applied to the underlying types of nullable operands.
        const LIFTED = 1 << 0;
        /// Several user-defined operators applied equally well.
        const AMBIGUOUS = 1 << 1;
        /// A narrowing conversion of a constant that fits its target.
        const FROM_LITERAL = 1 << 2;
        /// Enum to or from its underlying type: no run-time work.
        const ENUM_NOOP = 1 << 3;
    }
}

/// The mechanism a conversion uses at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Identity,
    /// Between primitive types (numeric, `Boolean`, `String`, `Char`, `Date`).
    Primitive,
    /// Reference reinterpretation: up or down the hierarchy, interfaces, variance.
    Reference,
    /// Value type to `Object` or an interface.
    Boxing,
    /// `Object` or an interface to a value type.
    Unboxing,
    /// Wrapping into, unwrapping from or between nullable types.
    Nullable,
    /// Enum to or from an integral type.
    Enum,
    /// Array to array, element by element reinterpretation.
    Array,
    /// Through a user-defined operator.
    UserDefined,
    None,
}

/// The result of classifying a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conversion {
    pub class: ConversionClass,
    pub kind: ConversionKind,
    /// The user-defined operator used, if any.
    pub operator: Option<TypeHash>,
    pub flags: ConversionFlags,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion::new(ConversionClass::Identity, ConversionKind::Identity);
    pub const ERROR: Conversion = Conversion::new(ConversionClass::Error, ConversionKind::None);

    pub const fn new(class: ConversionClass, kind: ConversionKind) -> Self {
        Self {
            class,
            kind,
            operator: None,
            flags: ConversionFlags::empty(),
        }
    }

    pub const fn widening(kind: ConversionKind) -> Self {
        Self::new(ConversionClass::Widening, kind)
    }

    pub const fn narrowing(kind: ConversionKind) -> Self {
        Self::new(ConversionClass::Narrowing, kind)
    }

    pub fn with_flags(mut self, flags: ConversionFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Same conversion with its class made no better than `class`.
    pub fn at_least(mut self, class: ConversionClass) -> Self {
        self.class = self.class.max(class);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.class == ConversionClass::Identity
    }

    /// Identity or widening.
    pub fn is_widening(&self) -> bool {
        self.class <= ConversionClass::Widening
    }

    pub fn is_narrowing(&self) -> bool {
        self.class == ConversionClass::Narrowing
    }

    pub fn is_error(&self) -> bool {
        self.class == ConversionClass::Error
    }

    /// Exists at all, implicitly or explicitly.
    pub fn exists(&self) -> bool {
        self.class != ConversionClass::Error
    }
}

/// Classify the conversion from `source` to `target`.
///
/// An `Error` type on either side classifies as identity so that an
/// earlier failure does not produce a second diagnostic.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn classify(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    let source = table.normalize(source.clone());
    let target = table.normalize(target.clone());
    if source.is_error() || target.is_error() || source == target {
        return Conversion::IDENTITY;
    }
    if source.is_void() || target.is_void() {
        return Conversion::ERROR;
    }

    let predefined = classify_predefined(table, &source, &target);
    if predefined.is_widening() {
        return predefined;
    }
    match classify_user_defined(table, &source, &target) {
        Some(user) if user.class < predefined.class => user,
        _ => predefined,
    }
}

/// Classify the conversion of a constant, which may narrow without loss.
///
/// A narrowing conversion of an integral constant (or a `Double` constant
/// to `Single`) whose value fits the target classifies as widening, with
/// [`ConversionFlags::FROM_LITERAL`] set.
pub fn classify_constant(
    table: &SymbolTable,
    value: &ConstantValue,
    source: &DataType,
    target: &DataType,
) -> Conversion {
    let conversion = classify(table, source, target);
    if !conversion.is_narrowing() || conversion.kind != ConversionKind::Primitive {
        return conversion;
    }
    let target = table.normalize(target.clone());
    match target.as_primitive() {
        Some(kind) if fits_without_loss(value, kind) => Conversion {
            class: ConversionClass::Widening,
            ..conversion
        }
        .with_flags(ConversionFlags::FROM_LITERAL),
        _ => conversion,
    }
}

/// Classify a `DirectCast`: identity, reference, boxing or unboxing only.
pub fn classify_direct_cast(table: &SymbolTable, source: &DataType, target: &DataType) -> Conversion {
    let conversion = classify(table, source, target);
    match conversion.kind {
        ConversionKind::Identity
        | ConversionKind::Reference
        | ConversionKind::Boxing
        | ConversionKind::Unboxing
        | ConversionKind::Array => conversion,
        ConversionKind::Enum if conversion.flags.contains(ConversionFlags::ENUM_NOOP) => conversion,
        _ => Conversion::ERROR,
    }
}

/// Classify a `TryCast`: like `DirectCast`, but only to reference types or
/// generic parameters. Returns `None` when the target is a value type.
pub fn classify_try_cast(table: &SymbolTable, source: &DataType, target: &DataType) -> Option<Conversion> {
    let target = table.normalize(target.clone());
    if !table.is_reference_type(&target) && !matches!(target, DataType::GenericParam { .. } | DataType::Error) {
        return None;
    }
    Some(classify_direct_cast(table, source, &target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::PrimitiveKind;
    use basalt_symbols::TypeEntry;

    fn table() -> SymbolTable {
        SymbolTable::with_runtime().unwrap()
    }

    #[test]
    fn error_types_are_silent() {
        let t = table();
        assert!(classify(&t, &DataType::Error, &DataType::integer()).is_identity());
        assert!(classify(&t, &DataType::string(), &DataType::Error).is_identity());
    }

    #[test]
    fn runtime_spelling_is_identity() {
        let t = table();
        let int32 = DataType::named(t.type_by_name("System.String", 0).unwrap().hash);
        assert!(classify(&t, &int32, &DataType::string()).is_identity());
    }

    #[test]
    fn constants_that_fit_are_widening() {
        let t = table();
        let byte = DataType::primitive(PrimitiveKind::Byte);
        let fits = classify_constant(&t, &ConstantValue::integer(10), &DataType::integer(), &byte);
        assert!(fits.is_widening());
        assert!(fits.flags.contains(ConversionFlags::FROM_LITERAL));
        let too_big = classify_constant(&t, &ConstantValue::integer(1000), &DataType::integer(), &byte);
        assert!(too_big.is_narrowing());
    }

    #[test]
    fn direct_cast_rejects_numeric_conversion() {
        let t = table();
        assert!(classify_direct_cast(&t, &DataType::integer(), &DataType::long()).is_error());
        assert!(classify_direct_cast(&t, &DataType::Object, &DataType::integer()).is_narrowing());
    }

    #[test]
    fn try_cast_needs_reference_target() {
        let mut t = table();
        let shape = t.register_type(TypeEntry::class("Shape")).unwrap();
        assert!(classify_try_cast(&t, &DataType::Object, &DataType::integer()).is_none());
        let c = classify_try_cast(&t, &DataType::Object, &DataType::named(shape)).unwrap();
        assert!(c.is_narrowing());
    }

    #[test]
    fn class_order() {
        assert!(ConversionClass::Identity < ConversionClass::Widening);
        assert_eq!(
            ConversionClass::Widening.max(ConversionClass::Narrowing),
            ConversionClass::Narrowing
        );
    }
}
