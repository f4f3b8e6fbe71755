//! Built-in value types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// The predefined primitive types of the language.
///
/// The discriminant order is significant only as a stable numeric code; it is
/// not a conversion ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PrimitiveKind {
    Boolean,
    SByte,
    Byte,
    Short,
    UShort,
    Integer,
    UInteger,
    Long,
    ULong,
    Decimal,
    Single,
    Double,
    Char,
    String,
    Date,
}

impl PrimitiveKind {
    /// All primitive kinds, in discriminant order.
    pub const ALL: [PrimitiveKind; 15] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::SByte,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::UShort,
        PrimitiveKind::Integer,
        PrimitiveKind::UInteger,
        PrimitiveKind::Long,
        PrimitiveKind::ULong,
        PrimitiveKind::Decimal,
        PrimitiveKind::Single,
        PrimitiveKind::Double,
        PrimitiveKind::Char,
        PrimitiveKind::String,
        PrimitiveKind::Date,
    ];

    /// The integral kinds, signed and unsigned.
    pub const INTEGRALS: [PrimitiveKind; 8] = [
        PrimitiveKind::SByte,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::UShort,
        PrimitiveKind::Integer,
        PrimitiveKind::UInteger,
        PrimitiveKind::Long,
        PrimitiveKind::ULong,
    ];

    /// Keyword spelling of the type.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::SByte => "SByte",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::UShort => "UShort",
            PrimitiveKind::Integer => "Integer",
            PrimitiveKind::UInteger => "UInteger",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::ULong => "ULong",
            PrimitiveKind::Decimal => "Decimal",
            PrimitiveKind::Single => "Single",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::String => "String",
            PrimitiveKind::Date => "Date",
        }
    }

    /// Runtime type name, used to look up helper members on the runtime type.
    pub fn runtime_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "System.Boolean",
            PrimitiveKind::SByte => "System.SByte",
            PrimitiveKind::Byte => "System.Byte",
            PrimitiveKind::Short => "System.Int16",
            PrimitiveKind::UShort => "System.UInt16",
            PrimitiveKind::Integer => "System.Int32",
            PrimitiveKind::UInteger => "System.UInt32",
            PrimitiveKind::Long => "System.Int64",
            PrimitiveKind::ULong => "System.UInt64",
            PrimitiveKind::Decimal => "System.Decimal",
            PrimitiveKind::Single => "System.Single",
            PrimitiveKind::Double => "System.Double",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::String => "System.String",
            PrimitiveKind::Date => "System.DateTime",
        }
    }

    /// Parse a type keyword (case-insensitive).
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(word))
    }

    #[inline]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::SByte
                | PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::UShort
                | PrimitiveKind::Integer
                | PrimitiveKind::UInteger
                | PrimitiveKind::Long
                | PrimitiveKind::ULong
        )
    }

    #[inline]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::UShort | PrimitiveKind::UInteger | PrimitiveKind::ULong
        )
    }

    #[inline]
    pub fn is_signed_integral(self) -> bool {
        self.is_integral() && !self.is_unsigned()
    }

    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
    }

    /// Integral, floating or decimal.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating() || self == PrimitiveKind::Decimal
    }

    /// Whether the type is a value type. Only `String` is not.
    #[inline]
    pub fn is_value_type(self) -> bool {
        self != PrimitiveKind::String
    }

    /// Storage width in bits for integral types.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            PrimitiveKind::SByte | PrimitiveKind::Byte => Some(8),
            PrimitiveKind::Short | PrimitiveKind::UShort => Some(16),
            PrimitiveKind::Integer | PrimitiveKind::UInteger => Some(32),
            PrimitiveKind::Long | PrimitiveKind::ULong => Some(64),
            _ => None,
        }
    }

    /// Inclusive value range of an integral type.
    pub fn integral_range(self) -> Option<(i128, i128)> {
        let bits = self.bit_width()?;
        if self.is_unsigned() {
            Some((0, (1i128 << bits) - 1))
        } else {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        }
    }

    /// The signed integral type of the given width.
    pub fn signed_of_width(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(PrimitiveKind::SByte),
            16 => Some(PrimitiveKind::Short),
            32 => Some(PrimitiveKind::Integer),
            64 => Some(PrimitiveKind::Long),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
