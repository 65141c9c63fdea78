//! Character-offset ranges over the original query text.

use serde::{Deserialize, Serialize};

/// A `[begin, end)` span measured in characters. A missing `end` marks a
/// single position, used by diagnostics that point at a gap (e.g. the end
/// of the text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub begin: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl TextRange {
    pub fn new(begin: usize, end: usize) -> Self {
        TextRange {
            begin,
            end: Some(end),
        }
    }

    pub fn point(begin: usize) -> Self {
        TextRange { begin, end: None }
    }

    /// The exclusive end, or `begin + 1` for a point.
    pub fn end_or_next(&self) -> usize {
        self.end.unwrap_or(self.begin + 1)
    }

    /// Whether `offset` touches this range, counting both edges. A cursor
    /// placed right after the last character still completes the item.
    pub fn touches(&self, offset: usize) -> bool {
        self.begin <= offset && offset <= self.end.unwrap_or(self.begin)
    }

    /// The smallest range covering both.
    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange::new(
            self.begin.min(other.begin),
            self.end_or_next().max(other.end_or_next()),
        )
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..{}", self.begin, end),
            None => write!(f, "{}", self.begin),
        }
    }
}
