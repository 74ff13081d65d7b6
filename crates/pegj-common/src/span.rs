use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A point in the grammar source, as reported by the front-end.
///
/// `offset` is a 0-based character offset; `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Source range of a grammar node. Start is inclusive, end is exclusive.
///
/// Nodes built programmatically (tests, synthesized nodes) carry the default
/// location, which points at the very start of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    /// Create a location from two offsets on the first line.
    pub fn from_offsets(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "location start ({start}) must be <= end ({end})");
        Self {
            start: Position {
                offset: start,
                line: 1,
                column: start + 1,
            },
            end: Position {
                offset: end,
                line: 1,
                column: end + 1,
            },
        }
    }

    /// Byte-ish range suitable for diagnostic labels.
    pub fn range(&self) -> Range<usize> {
        self.start.offset as usize..self.end.offset as usize
    }

    /// Whether the location covers no input.
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Merge two locations into one that covers both.
    pub fn merge(self, other: Location) -> Location {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Location { start, end }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}
