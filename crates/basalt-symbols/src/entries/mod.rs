//! Declaration entries stored in the [`SymbolTable`](crate::SymbolTable).

mod common;
mod member;
mod procedure;
mod type_entry;

pub use common::{fold_name, Access, GenericParamEntry, MemberRef, Variance};
pub use member::{FieldEntry, PropertyEntry};
pub use procedure::{CallerInfo, ComDefault, ParamEntry, ProcedureEntry, ProcedureKind};
pub use type_entry::{TypeEntry, TypeKind};
