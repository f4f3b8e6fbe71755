//! Internal binder failures.
//!
//! These are not user errors: they indicate a malformed symbol table or a
//! violated binder invariant. The public entry points convert them into an
//! internal-error diagnostic plus a bad expression, so one malformed input
//! never takes down a host that is analyzing many documents.

use thiserror::Error;

use crate::{Span, TypeHash};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// A declaration hash was referenced but is not in the symbol table.
    #[error("at {span}: unknown declaration {hash}")]
    UnknownDeclaration { hash: TypeHash, span: Span },

    /// A bound node had a shape the caller did not expect.
    #[error("at {span}: unexpected bound form: {message}")]
    UnexpectedForm { message: String, span: Span },

    /// An invariant was violated.
    #[error("at {span}: internal error: {message}")]
    Internal { message: String, span: Span },
}

impl BindError {
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        BindError::Internal {
            message: message.into(),
            span,
        }
    }

    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            BindError::UnknownDeclaration { span, .. } => *span,
            BindError::UnexpectedForm { span, .. } => *span,
            BindError::Internal { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_includes_location() {
        let err = BindError::internal("boom", Span::new(2, 7, 1));
        assert_eq!(err.to_string(), "at 2:7: internal error: boom");
        assert_eq!(err.span(), Span::new(2, 7, 1));
    }
}
