//! Ranking of applicable overloads.

use basalt_core::{DataType, Severity};

use super::Applicable;
use crate::binder::Binder;
use crate::conversion::{ConversionClass, classify};

/// What ranking decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ranked {
    /// Index of the winning candidate.
    Winner(usize),
    /// Several candidates are equally good.
    Ambiguous(Vec<usize>),
    /// Every candidate needs a narrowing conversion and strict typing forbids
    /// choosing between them.
    Narrowing(Vec<usize>),
    /// An `Object` argument leaves the choice to the run time.
    LateBound,
}

/// Find the best of `candidates`, all of which are applicable.
///
/// Candidates are ranked by:
/// 1. Instance members before extension methods
/// 2. No narrowing before narrowing
/// 3. Most specific parameter types
/// 4. Tie-breaks between equally specific candidates (see [`break_tie`])
pub(crate) fn find_best_match(b: &Binder<'_>, candidates: &[Applicable], object_argument: bool) -> Ranked {
    if let [_] = candidates {
        return Ranked::Winner(0);
    }

    let mut pool: Vec<usize> = (0..candidates.len()).collect();
    if pool.iter().any(|&i| !candidates[i].selected.candidate.is_extension) {
        pool.retain(|&i| !candidates[i].selected.candidate.is_extension);
    }

    let widening: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&i| !candidates[i].selected.narrowing)
        .collect();
    if !widening.is_empty() {
        pool = widening;
    } else if pool.len() > 1 {
        if b.options.narrowing_severity() == Severity::Error {
            return Ranked::Narrowing(pool);
        }
        if object_argument && b.options.allows_late_binding() {
            return Ranked::LateBound;
        }
    }

    if let [only] = pool.as_slice() {
        return Ranked::Winner(*only);
    }

    for &a in &pool {
        let beats_all = pool
            .iter()
            .filter(|&&other| other != a)
            .all(|&other| is_better(b, &candidates[a], &candidates[other]));
        if beats_all {
            return Ranked::Winner(a);
        }
    }

    if object_argument && b.options.allows_late_binding() {
        return Ranked::LateBound;
    }
    Ranked::Ambiguous(pool)
}

/// `a` is strictly better than `b`: more specific, or equally specific and
/// preferred by a tie-break.
fn is_better(binder: &Binder<'_>, a: &Applicable, b: &Applicable) -> bool {
    let a_over_b = at_least_as_specific(binder, a, b);
    let b_over_a = at_least_as_specific(binder, b, a);
    match (a_over_b, b_over_a) {
        (true, false) => true,
        (true, true) => break_tie(a, b),
        _ => false,
    }
}

/// Every argument's parameter type in `a` is the same as, or widens to, the
/// corresponding parameter type in `b`.
fn at_least_as_specific(binder: &Binder<'_>, a: &Applicable, b: &Applicable) -> bool {
    a.arg_params
        .iter()
        .zip(&b.arg_params)
        .all(|(pa, pb)| match (pa, pb) {
            (Some(pa), Some(pb)) => pa == pb || widens(binder, pa, pb),
            _ => true,
        })
}

fn widens(binder: &Binder<'_>, from: &DataType, to: &DataType) -> bool {
    classify(binder.table, from, to).class <= ConversionClass::Widening
}

/// Decide between two candidates with identical argument types.
///
/// Returns true if `a` wins, in order:
/// 1. Non-generic over generic
/// 2. Normal form over expanded `ParamArray` form
/// 3. Fewer parameters filled from defaults
fn break_tie(a: &Applicable, b: &Applicable) -> bool {
    let (sa, sb) = (&a.selected, &b.selected);
    let (generic_a, generic_b) = (sa.candidate.generic_count > 0, sb.candidate.generic_count > 0);
    if generic_a != generic_b {
        return !generic_a;
    }
    if sa.map.expanded != sb.map.expanded {
        return !sa.map.expanded;
    }
    sa.map.defaults < sb.map.defaults
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::{ArgumentMap, Candidate, ParamBinding, Selected};
    use basalt_core::{CompileOptions, DiagnosticSink, TypeHash};
    use basalt_symbols::{LocalScope, MemberRef, SymbolTable};

    fn applicable(param: DataType, narrowing: bool, generic: bool, defaults: usize) -> Applicable {
        let candidate = Candidate {
            member: MemberRef::Procedure(TypeHash::from_name("F")),
            name: "F".to_string(),
            params: Vec::new(),
            return_type: DataType::Void,
            generic_owner: TypeHash::EMPTY,
            generic_count: usize::from(generic),
            is_extension: false,
            is_default_extension: false,
            is_shared: true,
            owner: TypeHash::EMPTY,
            display: "F".to_string(),
        };
        Applicable {
            selected: Selected {
                candidate,
                type_args: Vec::new(),
                map: ArgumentMap {
                    bindings: vec![ParamBinding::Argument(0)],
                    expanded: false,
                    defaults,
                },
                params: Vec::new(),
                return_type: DataType::Void,
                narrowing,
                object_inferred: false,
                arguments_rejected: false,
            },
            classes: vec![Some(if narrowing {
                ConversionClass::Narrowing
            } else {
                ConversionClass::Widening
            })],
            arg_params: vec![Some(param)],
        }
    }

    fn rank(options: &CompileOptions, candidates: &[Applicable], object: bool) -> Ranked {
        let table = SymbolTable::with_runtime().unwrap();
        let mut scope = LocalScope::new();
        let mut sink = DiagnosticSink::new();
        let b = Binder::new(&table, &mut scope, &mut sink, options);
        find_best_match(&b, candidates, object)
    }

    #[test]
    fn widening_beats_narrowing() {
        let options = CompileOptions::lenient();
        let c = [
            applicable(DataType::integer(), true, false, 0),
            applicable(DataType::long(), false, false, 0),
        ];
        assert_eq!(rank(&options, &c, false), Ranked::Winner(1));
    }

    #[test]
    fn fewer_defaults_break_a_tie() {
        let options = CompileOptions::strict();
        let c = [
            applicable(DataType::integer(), false, false, 1),
            applicable(DataType::integer(), false, false, 0),
        ];
        assert_eq!(rank(&options, &c, false), Ranked::Winner(1));
    }

    #[test]
    fn unrelated_parameters_are_ambiguous() {
        let options = CompileOptions::strict();
        let c = [
            applicable(DataType::integer(), false, false, 0),
            applicable(DataType::string(), false, false, 0),
        ];
        assert_eq!(rank(&options, &c, false), Ranked::Ambiguous(vec![0, 1]));
    }

    #[test]
    fn generic_loses_to_non_generic() {
        let options = CompileOptions::strict();
        let c = [
            applicable(DataType::integer(), false, true, 0),
            applicable(DataType::integer(), false, false, 0),
        ];
        assert_eq!(rank(&options, &c, false), Ranked::Winner(1));
    }
}
