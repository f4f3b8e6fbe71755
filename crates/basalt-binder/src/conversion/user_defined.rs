//! User-defined conversion operators.
//!
//! Operators declared on the source type, the target type, or their bases
//! are candidates. A candidate applies when predefined conversions connect
//! the source to the operator's parameter and the operator's result to the
//! target. Over nullable types, operators declared on the underlying value
//! types are lifted.

use basalt_core::{DataType, TypeHash};
use basalt_symbols::{ProcedureKind, SymbolTable};
use rustc_hash::FxHashSet;

use super::reference::classify_predefined;
use super::{Conversion, ConversionClass, ConversionFlags, ConversionKind};

#[derive(Debug, Clone)]
struct Candidate {
    operator: TypeHash,
    from: DataType,
    to: DataType,
    class: ConversionClass,
    lifted: bool,
}

/// Find the user-defined conversion from `source` to `target`, if any
/// operator applies.
///
/// When several operators apply equally well the conversion is reported as
/// narrowing with [`ConversionFlags::AMBIGUOUS`] and no operator.
pub fn classify_user_defined(table: &SymbolTable, source: &DataType, target: &DataType) -> Option<Conversion> {
    let mut seen = FxHashSet::default();
    let operators: Vec<_> = table
        .conversion_operators(source)
        .into_iter()
        .chain(table.conversion_operators(target))
        .filter(|op| seen.insert(op.hash))
        .collect();
    if operators.is_empty() {
        return None;
    }

    let mut candidates = Vec::new();
    for op in operators {
        let ProcedureKind::Conversion { widening } = op.kind else {
            continue;
        };
        let Some(param) = op.params.first() else {
            continue;
        };
        let from = table.normalize(param.ty.clone());
        let to = table.normalize(op.return_type.clone());

        let direct = through(table, source, &from, &to, target, widening);
        let lifted = lifted_class(table, source, &from, &to, target, widening);
        let (class, lifted) = match (direct, lifted) {
            (Some(d), Some(l)) if l < d => (l, true),
            (Some(d), _) => (d, false),
            (None, Some(l)) => (l, true),
            (None, None) => continue,
        };
        candidates.push(Candidate {
            operator: op.hash,
            from,
            to,
            class,
            lifted,
        });
    }

    let best = candidates.iter().map(|c| c.class).min()?;
    candidates.retain(|c| c.class == best);
    let candidates = most_specific(table, candidates, source.strip_nullable(), |c| &c.from);
    let candidates = most_specific(table, candidates, target.strip_nullable(), |c| &c.to);

    match candidates.as_slice() {
        [only] => {
            let mut conversion = Conversion::new(only.class, ConversionKind::UserDefined);
            conversion.operator = Some(only.operator);
            if only.lifted {
                conversion = conversion.with_flags(ConversionFlags::LIFTED);
            }
            Some(conversion)
        }
        _ => Some(Conversion::narrowing(ConversionKind::UserDefined).with_flags(ConversionFlags::AMBIGUOUS)),
    }
}

/// Class of `source -> from`, the operator, then `to -> target`.
fn through(
    table: &SymbolTable,
    source: &DataType,
    from: &DataType,
    to: &DataType,
    target: &DataType,
    widening: bool,
) -> Option<ConversionClass> {
    let pre = classify_predefined(table, source, from);
    let post = classify_predefined(table, to, target);
    if pre.is_error() || post.is_error() {
        return None;
    }
    if widening && pre.is_widening() && post.is_widening() {
        Some(ConversionClass::Widening)
    } else {
        Some(ConversionClass::Narrowing)
    }
}

/// Class of the lifted form, where the operator works on the underlying
/// value types of nullable operands.
fn lifted_class(
    table: &SymbolTable,
    source: &DataType,
    from: &DataType,
    to: &DataType,
    target: &DataType,
    widening: bool,
) -> Option<ConversionClass> {
    if !(source.is_nullable() || target.is_nullable()) || from.is_nullable() || to.is_nullable() {
        return None;
    }
    if !table.is_value_type(from) || !table.is_value_type(to) {
        return None;
    }
    let class = through(
        table,
        source.strip_nullable(),
        from,
        to,
        target.strip_nullable(),
        widening,
    )?;
    if source.is_nullable() && !target.is_nullable() {
        Some(class.max(ConversionClass::Narrowing))
    } else {
        Some(class)
    }
}

/// Keep the candidates whose `key` type matches `exact`; failing that, the
/// ones whose `key` widens to every other candidate's. Leaves the list
/// untouched when no single most specific type exists.
fn most_specific(
    table: &SymbolTable,
    candidates: Vec<Candidate>,
    exact: &DataType,
    key: impl Fn(&Candidate) -> &DataType,
) -> Vec<Candidate> {
    if candidates.len() < 2 {
        return candidates;
    }
    if candidates.iter().any(|c| key(c) == exact) {
        return candidates.into_iter().filter(|c| key(c) == exact).collect();
    }
    let narrowest: Vec<Candidate> = candidates
        .iter()
        .filter(|c| {
            candidates
                .iter()
                .all(|other| classify_predefined(table, key(c), key(other)).is_widening())
        })
        .cloned()
        .collect();
    if narrowest.is_empty() { candidates } else { narrowest }
}
