//! Immutable parse-tree model consumed by the Basalt binder.
//!
//! Trees are allocated in a `bumpalo::Bump` arena and borrowed for the
//! arena's lifetime `'ast`. The binder only ever reads them.
//!
//! ```
//! use basalt_syntax::{AstBuilder, Expr};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let call = b.call(b.name("Print"), &[b.string("hi")]);
//! assert!(matches!(call, Expr::Call(_)));
//! ```

pub mod ast;
mod builder;

pub use ast::*;
pub use builder::AstBuilder;
