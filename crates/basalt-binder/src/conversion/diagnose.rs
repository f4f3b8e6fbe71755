//! Messages for conversions that do not exist.
//!
//! A plain "cannot be converted" is the fallback; arrays and variant
//! generic interfaces get a message naming the element or type argument
//! that blocks the conversion.

use basalt_core::{DataType, DiagnosticCode};
use basalt_symbols::{SymbolTable, TypeEntry, Variance};

use super::reference::{classify_predefined, variance_convertible};

/// The most specific diagnostic for a failed conversion from `source` to
/// `target`.
pub fn explain(table: &SymbolTable, source: &DataType, target: &DataType) -> (DiagnosticCode, String) {
    let source = table.normalize(source.clone());
    let target = table.normalize(target.clone());
    let s = table.display_type(&source);
    let t = table.display_type(&target);

    if let (Some((se, sr)), Some((te, tr))) = (source.array_parts(), target.array_parts()) {
        if sr != tr {
            return (
                DiagnosticCode::ArrayRankMismatch,
                format!("Value of type '{s}' cannot be converted to '{t}' because the array types have different numbers of dimensions."),
            );
        }
        let (se_name, te_name) = (table.display_type(se), table.display_type(te));
        if table.is_value_type(se) || table.is_value_type(te) {
            return (
                DiagnosticCode::ArrayNotCovariant,
                format!("Value of type '{s}' cannot be converted to '{t}' because '{se_name}' is not a reference type."),
            );
        }
        return (
            DiagnosticCode::ArrayElementMismatch,
            format!("Value of type '{s}' cannot be converted to '{t}' because '{se_name}' is not derived from '{te_name}'."),
        );
    }

    if let Some(found) = explain_variance(table, &source, &target, &s, &t) {
        return found;
    }

    (
        DiagnosticCode::NoConversion,
        format!("Value of type '{s}' cannot be converted to '{t}'."),
    )
}

fn explain_variance(
    table: &SymbolTable,
    source: &DataType,
    target: &DataType,
    s: &str,
    t: &str,
) -> Option<(DiagnosticCode, String)> {
    let target_hash = target.type_hash()?;
    let entry = table.get_type(target_hash)?;
    if entry.arity() == 0 {
        return None;
    }

    // Same generic definition: find the argument that blocks it.
    if source.type_hash() == Some(target_hash) {
        return blocking_argument(table, entry, source, target, s, t);
    }

    // The source implements another instantiation of the target interface.
    if entry.is_interface() {
        let implemented = table
            .interfaces_of(source)
            .into_iter()
            .find(|i| i.type_hash() == Some(target_hash) && !variance_convertible(table, i, target))?;
        let shown = table.display_type(&implemented);
        return Some((
            DiagnosticCode::VarianceTryInterface,
            format!("Value of type '{s}' cannot be converted to '{t}'. Consider using '{shown}' instead."),
        ));
    }
    None
}

fn blocking_argument(
    table: &SymbolTable,
    entry: &TypeEntry,
    source: &DataType,
    target: &DataType,
    s: &str,
    t: &str,
) -> Option<(DiagnosticCode, String)> {
    let definition = declared_form(entry);
    for (i, (sa, ta)) in source.type_args().iter().zip(target.type_args()).enumerate() {
        if sa == ta {
            continue;
        }
        let param = &entry.generic_params.get(i)?.name;
        let (sa_name, ta_name) = (table.display_type(sa), table.display_type(ta));
        return Some(match entry.variance(i) {
            Variance::Invariant => {
                let widens = classify_predefined(table, sa, ta).is_widening();
                if widens && table.is_reference_type(sa) && table.is_reference_type(ta) {
                    (
                        DiagnosticCode::VarianceNotDeclared,
                        format!(
                            "Value of type '{s}' cannot be converted to '{t}'. Consider changing the '{param}' in the definition of '{definition}' to an Out type parameter, 'Out {param}'."
                        ),
                    )
                } else {
                    (
                        DiagnosticCode::NoConversion,
                        format!("Value of type '{s}' cannot be converted to '{t}'."),
                    )
                }
            }
            Variance::Out => (
                DiagnosticCode::VarianceArgumentMismatch,
                format!(
                    "Value of type '{s}' cannot be converted to '{t}' because '{sa_name}' is not derived from '{ta_name}', as required for the 'Out' generic parameter '{param}' in '{definition}'."
                ),
            ),
            Variance::In => (
                DiagnosticCode::VarianceArgumentMismatch,
                format!(
                    "Value of type '{s}' cannot be converted to '{t}' because '{ta_name}' is not derived from '{sa_name}', as required for the 'In' generic parameter '{param}' in '{definition}'."
                ),
            ),
        });
    }
    None
}

/// `I(Of Out T)`: the generic definition with variance annotations.
fn declared_form(entry: &TypeEntry) -> String {
    let params: Vec<String> = entry
        .generic_params
        .iter()
        .map(|p| match p.variance {
            Variance::Invariant => p.name.clone(),
            Variance::Out => format!("Out {}", p.name),
            Variance::In => format!("In {}", p.name),
        })
        .collect();
    format!("{}(Of {})", entry.qualified_name, params.join(", "))
}
