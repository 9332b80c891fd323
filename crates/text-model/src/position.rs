//! Document coordinates.
//!
//! Lines and columns are 1-based. Columns count UTF-16 code units, so a character outside the
//! Basic Multilingual Plane occupies two columns.

use std::cmp::Ordering;
use std::fmt;

/// A 1-based `(line, column)` position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, in UTF-16 code units.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Return a copy with the given column.
    pub fn with_column(self, column: usize) -> Self {
        Self { column, ..self }
    }

    /// `true` if `self` comes strictly before `other`.
    pub fn is_before(&self, other: &Position) -> bool {
        self < other
    }

    /// `true` if `self` comes before or equals `other`.
    pub fn is_before_or_equal(&self, other: &Position) -> bool {
        self <= other
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

/// A range between two positions. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Range {
    /// Create a range from raw coordinates. Reversed endpoints are swapped.
    pub fn new(
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Self {
        Self::from_positions(
            Position::new(start_line, start_column),
            Position::new(end_line, end_column),
        )
    }

    /// Create a range from two positions in either order.
    pub fn from_positions(a: Position, b: Position) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// A collapsed range at `pos`.
    pub fn collapsed(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Start line number.
    pub fn start_line(&self) -> usize {
        self.start.line
    }

    /// End line number.
    pub fn end_line(&self) -> usize {
        self.end.line
    }

    /// `true` if start and end coincide.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `true` if `pos` lies inside the range, edges included.
    pub fn contains_position(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// `true` if `other` lies inside the range, edges included.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// `true` if `other` lies inside the range without touching either edge.
    pub fn strictly_contains_range(&self, other: &Range) -> bool {
        self.start < other.start && other.end < self.end
    }

    /// `true` if the two ranges share at least one position (touching counts).
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The smallest range covering both.
    pub fn plus(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A collapsed range at the start position.
    pub fn collapse_to_start(&self) -> Range {
        Range::collapsed(self.start)
    }
}

impl Ord for Range {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl PartialOrd for Range {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} -> {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 5) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 3));
        assert!(Position::new(3, 3).is_before_or_equal(&Position::new(3, 3)));
        assert!(!Position::new(3, 3).is_before(&Position::new(3, 3)));
    }

    #[test]
    fn test_range_normalizes_reversed_endpoints() {
        let range = Range::new(4, 2, 1, 7);
        assert_eq!(range.start, Position::new(1, 7));
        assert_eq!(range.end, Position::new(4, 2));
    }

    #[test]
    fn test_range_predicates() {
        let outer = Range::new(1, 1, 3, 1);
        let inner = Range::new(1, 2, 2, 5);
        assert!(outer.contains_range(&inner));
        assert!(outer.strictly_contains_range(&inner));
        assert!(!outer.strictly_contains_range(&Range::new(1, 1, 2, 1)));
        assert!(outer.contains_position(Position::new(3, 1)));
        assert!(outer.intersects(&Range::new(3, 1, 4, 1)));
        assert!(!outer.intersects(&Range::new(3, 2, 4, 1)));
        assert!(Range::collapsed(Position::new(2, 2)).is_empty());
        assert_eq!(outer.plus(&Range::new(3, 4, 5, 1)), Range::new(1, 1, 5, 1));
    }
}
