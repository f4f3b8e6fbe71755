//! Dominant-type inference.
//!
//! Given the types contributed by a set of expressions (array literal
//! elements, the branches of `If`, inference candidates for one generic
//! parameter), find the single type every candidate widens to:
//!
//! 1. Drop duplicates and `Error` types
//! 2. Keep the candidates that every other candidate widens to
//! 3. If several survive, keep the narrowest of them
//! 4. If none survives, `Object` is assumed (the caller decides whether that
//!    is acceptable)

use basalt_core::DataType;
use basalt_symbols::SymbolTable;

use crate::conversion::classify;

/// Outcome of dominant-type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum DominantType {
    /// Every candidate widens to this type.
    Unique(DataType),
    /// No candidate dominates; only `Object` covers them all.
    ObjectAssumed,
    /// No candidate contributed a type.
    Empty,
}

impl DominantType {
    /// The inferred type, with `Object` for an assumed one.
    pub fn into_type(self) -> Option<DataType> {
        match self {
            DominantType::Unique(ty) => Some(ty),
            DominantType::ObjectAssumed => Some(DataType::Object),
            DominantType::Empty => None,
        }
    }
}

/// Infer the dominant type of `candidates`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn dominant_type(table: &SymbolTable, candidates: &[DataType]) -> DominantType {
    let mut unique: Vec<DataType> = Vec::new();
    for ty in candidates {
        let ty = table.normalize(ty.clone());
        if ty.is_error() || ty.is_void() || unique.contains(&ty) {
            continue;
        }
        unique.push(ty);
    }

    match unique.len() {
        0 => return DominantType::Empty,
        1 => return unique.pop().map_or(DominantType::Empty, DominantType::Unique),
        _ => {}
    }

    let covering: Vec<&DataType> = unique
        .iter()
        .filter(|t| unique.iter().all(|u| classify(table, u, t).is_widening()))
        .collect();

    let narrowest: Vec<&DataType> = covering
        .iter()
        .copied()
        .filter(|t| covering.iter().all(|u| classify(table, t, u).is_widening()))
        .collect();

    match (narrowest.as_slice(), covering.as_slice()) {
        ([only], _) => DominantType::Unique((*only).clone()),
        ([], [only]) => DominantType::Unique((*only).clone()),
        _ if unique.iter().any(DataType::is_object) => DominantType::Unique(DataType::Object),
        _ => DominantType::ObjectAssumed,
    }
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
    fn same_types() {
        let t = table();
        assert_eq!(
            dominant_type(&t, &[DataType::integer(), DataType::integer()]),
            DominantType::Unique(DataType::integer())
        );
    }

    #[test]
    fn widest_numeric_wins() {
        let t = table();
        let byte = DataType::primitive(PrimitiveKind::Byte);
        assert_eq!(
            dominant_type(&t, &[byte, DataType::integer(), DataType::long()]),
            DominantType::Unique(DataType::long())
        );
        assert_eq!(
            dominant_type(&t, &[DataType::integer(), DataType::double()]),
            DominantType::Unique(DataType::double())
        );
    }

    #[test]
    fn unrelated_types_assume_object() {
        let t = table();
        assert_eq!(
            dominant_type(&t, &[DataType::integer(), DataType::string()]),
            DominantType::ObjectAssumed
        );
    }

    #[test]
    fn object_candidate_covers_everything() {
        let t = table();
        assert_eq!(
            dominant_type(&t, &[DataType::integer(), DataType::Object]),
            DominantType::Unique(DataType::Object)
        );
    }

    #[test]
    fn base_class_dominates_derived() {
        let mut t = table();
        let animal = DataType::named(t.register_type(TypeEntry::class("Animal")).unwrap());
        let cat = DataType::named(
            t.register_type(TypeEntry::class("Cat").with_base(animal.clone()))
                .unwrap(),
        );
        assert_eq!(dominant_type(&t, &[cat, animal.clone()]), DominantType::Unique(animal));
    }

    #[test]
    fn errors_and_nothing_contribute_nothing() {
        let t = table();
        assert_eq!(dominant_type(&t, &[]), DominantType::Empty);
        assert_eq!(dominant_type(&t, &[DataType::Error]), DominantType::Empty);
        assert_eq!(
            dominant_type(&t, &[DataType::Error, DataType::string()]),
            DominantType::Unique(DataType::string())
        );
    }
}
