//! Core types shared by every phase of the Basalt front end.
//!
//! - [`Span`]: source locations
//! - [`TypeHash`]: deterministic declaration identities
//! - [`DataType`] and [`PrimitiveKind`]: the semantic type model
//! - [`ConstantValue`]: compile-time values
//! - [`Diagnostic`] and [`DiagnosticSink`]: user-facing problems
//! - [`CompileOptions`]: compilation-mode switches
//! - [`BindError`]: internal failures

mod constant;
mod data_type;
mod diagnostics;
mod error;
mod options;
mod primitive;
mod span;
pub mod type_hash;

pub use constant::ConstantValue;
pub use data_type::DataType;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
pub use error::BindError;
pub use options::{CompileOptions, RuntimeFeatures};
pub use primitive::PrimitiveKind;
pub use span::Span;
pub use type_hash::TypeHash;

/// Re-exported so downstream crates name the same decimal type.
pub use rust_decimal::Decimal;
