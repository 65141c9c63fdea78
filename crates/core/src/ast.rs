//! Query AST, lowered from the parse tree.
//!
//! The shapes mirror the grammar one-to-one but drop punctuation. The
//! semantic analyzer is the only consumer.

use serde::{Deserialize, Serialize};

use crate::lexer::StrKind;
use crate::range::TextRange;

// ──────────────────────────────────────────────
// Sequence
// ──────────────────────────────────────────────

/// One intersected item: `[-][^]element`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceItem {
    pub exclude: bool,
    pub source: bool,
    pub element: Element,
    pub range: TextRange,
}

/// Unioned SFPs with an optional kind prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub prefix: Option<ElementPrefix>,
    pub items: Vec<Sfp>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementPrefix {
    /// `@` author
    At,
    /// `#` topic
    Hash,
    /// `$` tag
    Dollar,
}

impl ElementPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementPrefix::At => "@",
            ElementPrefix::Hash => "#",
            ElementPrefix::Dollar => "$",
        }
    }
}

// ──────────────────────────────────────────────
// Subject, family, predicative
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Sfp {
    pub subject: StrPath,
    pub relation: Option<Relation>,
    /// `~+` or `~-` after the subject. Never set together with `relation`.
    pub unary: Option<Unary>,
    pub range: TextRange,
}

impl Sfp {
    /// Whether anything follows the subject.
    pub fn has_relation(&self) -> bool {
        self.relation.is_some() || self.unary.is_some()
    }

    /// The relation symbol as written, if any.
    pub fn relation_symbol(&self) -> Option<&'static str> {
        match (&self.relation, &self.unary) {
            (Some(relation), _) => Some(relation.family.as_str()),
            (None, Some(unary)) => Some(unary.as_str()),
            (None, None) => None,
        }
    }

    /// Range of the relation and predicate, or of the unary symbol.
    pub fn relation_range(&self) -> Option<TextRange> {
        match (&self.relation, &self.unary) {
            (Some(relation), _) => Some(relation.range),
            (None, Some(unary)) => Some(unary.range),
            (None, None) => None,
        }
    }
}

/// A sequence member and the rest of its sequence in one direction:
/// `~+` towards the end, `~-` towards the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unary {
    pub direction: Direction,
    pub range: TextRange,
}

impl Unary {
    pub fn as_str(&self) -> &'static str {
        match self.direction {
            Direction::Ascending => "~+",
            Direction::Descending => "~-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub family: Family,
    pub predicate: Predicate,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `:`
    Equal,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `~`
    Match,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Equal => ":",
            Family::Gt => ">",
            Family::Gte => ">=",
            Family::Lt => "<",
            Family::Lte => "<=",
            Family::Match => "~",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Family::Gt | Family::Gte | Family::Lt | Family::Lte)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Values(Vec<Value>),
    Collection(Vec<StrPath>),
    Range(RangeLiteral),
}

/// `a..b`, or `[a,b]` with explicit bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeLiteral {
    pub begin: StrPath,
    pub end: StrPath,
    /// `(include_begin, include_end)` when brackets were written.
    pub bounds: Option<(bool, bool)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// `+`, `-`, `^` and their combinations in front of a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuePrefix {
    pub direction: Option<Direction>,
    pub source: bool,
}

impl ValuePrefix {
    pub fn is_empty(&self) -> bool {
        self.direction.is_none() && !self.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub prefix: ValuePrefix,
    pub path: StrPath,
    pub range: TextRange,
}

// ──────────────────────────────────────────────
// Strings
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrPart {
    pub value: String,
    pub kind: StrKind,
    pub range: TextRange,
}

/// A dotted path `a.b.c`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrPath {
    pub parts: Vec<StrPart>,
}

impl StrPath {
    pub fn range(&self) -> TextRange {
        match (self.parts.first(), self.parts.last()) {
            (Some(first), Some(last)) => first.range.cover(&last.range),
            _ => TextRange::point(0),
        }
    }

    /// The only part, when the path has exactly one.
    pub fn single(&self) -> Option<&StrPart> {
        match self.parts.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Parts joined with `.`, as typed minus quoting.
    pub fn joined(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn is_address(&self) -> bool {
        self.parts.len() > 1
    }
}
