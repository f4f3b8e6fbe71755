//! Source locations attached to syntax, bound nodes and diagnostics.
//!
//! Every hard error must point at a precise source range, so spans are
//! carried from the parse tree through every bound node unchanged.

use std::cmp::Ordering;
use std::fmt;

/// A range of source text, represented by its starting position and length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this span starts strictly before `other` in the source text.
    ///
    /// Used by "use before declaration" checks on locals.
    #[inline]
    pub fn precedes(&self, other: Span) -> bool {
        self.start_cmp(&other) == Ordering::Less
    }

    /// Compare start positions only.
    #[inline]
    pub fn start_cmp(&self, other: &Span) -> Ordering {
        (self.line, self.col).cmp(&(other.line, other.col))
    }

    /// Extend this span so it covers `other` as well.
    ///
    /// Multi-line spans keep the earlier start and approximate the length.
    pub fn merge(self, other: Span) -> Span {
        let (first, second) = if self.start_cmp(&other) == Ordering::Greater {
            (other, self)
        } else {
            (self, other)
        };
        if first.line == second.line {
            let end = (second.col + second.len).max(first.col + first.len);
            Span::new(first.line, first.col, end - first.col)
        } else {
            Span::new(first.line, first.col, first.len + second.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        assert_eq!(format!("{}", Span::new(3, 15, 5)), "3:15");
    }

    #[test]
    fn precedes_orders_by_line_then_column() {
        assert!(Span::new(1, 9, 1).precedes(Span::new(2, 1, 1)));
        assert!(Span::new(2, 1, 1).precedes(Span::new(2, 4, 1)));
        assert!(!Span::new(2, 4, 1).precedes(Span::new(2, 4, 3)));
    }

    #[test]
    fn merge_is_order_independent_on_one_line() {
        let a = Span::new(1, 10, 3);
        let b = Span::new(1, 5, 3);
        assert_eq!(a.merge(b), Span::new(1, 5, 8));
        assert_eq!(b.merge(a), Span::new(1, 5, 8));
    }

    #[test]
    fn merge_across_lines_keeps_earliest_start() {
        let merged = Span::new(3, 10, 5).merge(Span::new(1, 5, 10));
        assert_eq!(merged.line, 1);
        assert_eq!(merged.col, 5);
        assert_eq!(merged.len, 15);
    }
}
