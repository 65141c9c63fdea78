//! Stage errors. Codes are partitioned by stage: 1xxx lexical, 2xxx
//! grammar, 3xxx semantic, 4xxx translation.

use crate::range::TextRange;
use serde_json::{json, Value};

/// Anything that can be rendered as a [`crate::diagnostic::Diagnostic`].
pub trait Diagnose: std::error::Error {
    fn code(&self) -> u16;

    fn range(&self) -> Option<TextRange>;

    fn info(&self) -> Option<Value> {
        None
    }
}

// ── Lexical ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexicalError {
    #[error("unrecognized symbol '{text}'")]
    UnrecognizedSymbol { text: String, range: TextRange },

    #[error("expected closing {quote} before end of text")]
    UnterminatedString { quote: char, range: TextRange },

    #[error("expected an escaped character but reached end of text")]
    EscapeAtEnd { at: usize },

    #[error("normal character '{ch}' was escaped")]
    NormalCharacterEscaped { ch: char, at: usize },
}

impl Diagnose for LexicalError {
    fn code(&self) -> u16 {
        match self {
            LexicalError::UnrecognizedSymbol { .. } => 1001,
            LexicalError::UnterminatedString { .. } => 1002,
            LexicalError::EscapeAtEnd { .. } => 1003,
            LexicalError::NormalCharacterEscaped { .. } => 1004,
        }
    }

    fn range(&self) -> Option<TextRange> {
        match self {
            LexicalError::UnrecognizedSymbol { range, .. }
            | LexicalError::UnterminatedString { range, .. } => Some(*range),
            LexicalError::EscapeAtEnd { at } => Some(TextRange::point(*at)),
            LexicalError::NormalCharacterEscaped { at, .. } => Some(TextRange::new(*at, at + 1)),
        }
    }

    fn info(&self) -> Option<Value> {
        match self {
            LexicalError::UnrecognizedSymbol { text, .. } => Some(json!(text)),
            LexicalError::UnterminatedString { quote, .. } => Some(json!(quote.to_string())),
            LexicalError::NormalCharacterEscaped { ch, .. } => Some(json!(ch.to_string())),
            LexicalError::EscapeAtEnd { .. } => None,
        }
    }
}

// ── Grammar ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("unexpected token '{token}', expected one of: {}", .expected.join(" "))]
    UnexpectedToken {
        token: String,
        expected: Vec<String>,
        range: TextRange,
    },

    #[error("unexpected end of text, expected one of: {}", .expected.join(" "))]
    UnexpectedEnd { expected: Vec<String>, at: usize },
}

impl Diagnose for GrammarError {
    fn code(&self) -> u16 {
        match self {
            GrammarError::UnexpectedToken { .. } => 2001,
            GrammarError::UnexpectedEnd { .. } => 2002,
        }
    }

    fn range(&self) -> Option<TextRange> {
        match self {
            GrammarError::UnexpectedToken { range, .. } => Some(*range),
            GrammarError::UnexpectedEnd { at, .. } => Some(TextRange::point(*at)),
        }
    }

    fn info(&self) -> Option<Value> {
        match self {
            GrammarError::UnexpectedToken {
                token, expected, ..
            } => Some(json!({ "actual": token, "expected": expected })),
            GrammarError::UnexpectedEnd { expected, .. } => Some(json!({ "expected": expected })),
        }
    }
}

// ── Semantic ─────────────────────────────────────────────────────────

/// The shape of a predicate as written, used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Value,
    List,
    Collection,
    Range,
}

impl std::fmt::Display for ValueShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueShape::Value => "value",
            ValueShape::List => "list",
            ValueShape::Collection => "collection",
            ValueShape::Range => "range",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("filter {field}: relation and value are required")]
    FilterValueRequired { field: String, range: TextRange },

    #[error("filter {field}: relation and value are not allowed")]
    FilterValueNotRequired { field: String, range: TextRange },

    #[error("filter {field}: {shape} is unsupported")]
    UnsupportedValueShape {
        field: String,
        shape: ValueShape,
        range: TextRange,
    },

    #[error("filter {field}: {shape} is unsupported with relation '{relation}'")]
    UnsupportedValueShapeOfRelation {
        field: String,
        shape: ValueShape,
        relation: String,
        range: TextRange,
    },

    #[error("filter {field}: relation '{relation}' is unsupported")]
    UnsupportedRelation {
        field: String,
        relation: String,
        range: TextRange,
    },

    #[error("invalid element structure for prefix '{prefix}'")]
    InvalidPrefixStructure { prefix: String, range: TextRange },

    #[error("{name}: element prefix is not allowed")]
    ElementPrefixNotAllowed { name: String, range: TextRange },

    #[error("element {name}: relation and value are not allowed")]
    ElementValueNotAllowed { name: String, range: TextRange },

    #[error("element {item}: {shape} is unsupported")]
    UnsupportedElementValueShape {
        item: String,
        shape: ValueShape,
        range: TextRange,
    },

    #[error("element {item}: {shape} is unsupported with relation '{relation}'")]
    UnsupportedElementValueShapeOfRelation {
        item: String,
        shape: ValueShape,
        relation: String,
        range: TextRange,
    },

    #[error("element {item}: relation '{relation}' is unsupported")]
    UnsupportedElementRelation {
        item: String,
        relation: String,
        range: TextRange,
    },

    #[error("sort: relation and value are required")]
    SortValueRequired { range: TextRange },

    #[error("sort: value must be a sort list")]
    SortValueMustBeList { range: TextRange },

    #[error("sort: item '{item}' is invalid, expected one of: {}", .expected.join(", "))]
    InvalidSortItem {
        item: String,
        expected: Vec<String>,
        range: TextRange,
    },

    #[error("sort must stand alone: it cannot be excluded, source-qualified or joined with '|'")]
    SortIsIndependent { range: TextRange },

    #[error("sort: item '{item}' is duplicated")]
    DuplicatedSortItem { item: String, range: TextRange },

    #[error("value cannot be an address")]
    ValueCannotBeAddress { range: TextRange },

    #[error("a comparison or range value cannot be a pattern")]
    PatternInComparison { range: TextRange },

    #[error("'{value}' cannot be cast to {expected}")]
    TypeCast {
        value: String,
        expected: &'static str,
        range: TextRange,
    },

    #[error("'{value}' is not a {type_name}, expected one of: {}", .expected.join(", "))]
    EnumCast {
        value: String,
        type_name: &'static str,
        expected: Vec<String>,
        range: TextRange,
    },

    #[error("unsupported structure {production}")]
    UnsupportedStructure { production: String, range: TextRange },

    #[error("fields and elements cannot be mixed in one item")]
    FieldsAndElementsMixed { range: TextRange },

    #[error("{name} cannot have the source flag")]
    CannotHaveSourceFlag { name: String, range: TextRange },

    #[error("{name} must have the source flag")]
    MustHaveSourceFlag { name: String, range: TextRange },

    #[error("a value prefix is only allowed in sort lists")]
    ValuePrefixNotAllowed { range: TextRange },

    #[error("{kind} '{name}' not found")]
    Unresolved {
        kind: &'static str,
        name: String,
        range: TextRange,
    },

    #[error("{kind} '{name}' is ambiguous: {candidates} candidates match")]
    Ambiguous {
        kind: &'static str,
        name: String,
        candidates: usize,
        range: TextRange,
    },

    #[error("unknown field '{name}'")]
    UnknownField { name: String, range: TextRange },
}

impl Diagnose for SemanticError {
    fn code(&self) -> u16 {
        use SemanticError::*;
        match self {
            FilterValueRequired { .. } => 3001,
            FilterValueNotRequired { .. } => 3002,
            UnsupportedValueShape { .. } => 3003,
            UnsupportedValueShapeOfRelation { .. } => 3004,
            UnsupportedRelation { .. } => 3005,
            InvalidPrefixStructure { .. } => 3006,
            ElementPrefixNotAllowed { .. } => 3007,
            ElementValueNotAllowed { .. } => 3008,
            UnsupportedElementValueShape { .. } => 3009,
            UnsupportedElementValueShapeOfRelation { .. } => 3010,
            UnsupportedElementRelation { .. } => 3011,
            SortValueRequired { .. } => 3012,
            SortValueMustBeList { .. } => 3013,
            InvalidSortItem { .. } => 3014,
            SortIsIndependent { .. } => 3015,
            DuplicatedSortItem { .. } => 3016,
            ValueCannotBeAddress { .. } => 3017,
            PatternInComparison { .. } => 3018,
            TypeCast { .. } => 3019,
            EnumCast { .. } => 3020,
            UnsupportedStructure { .. } => 3021,
            FieldsAndElementsMixed { .. } => 3022,
            CannotHaveSourceFlag { .. } => 3023,
            MustHaveSourceFlag { .. } => 3024,
            ValuePrefixNotAllowed { .. } => 3025,
            Unresolved { .. } => 3026,
            Ambiguous { .. } => 3027,
            UnknownField { .. } => 3028,
        }
    }

    fn range(&self) -> Option<TextRange> {
        use SemanticError::*;
        let range = match self {
            FilterValueRequired { range, .. }
            | FilterValueNotRequired { range, .. }
            | UnsupportedValueShape { range, .. }
            | UnsupportedValueShapeOfRelation { range, .. }
            | UnsupportedRelation { range, .. }
            | InvalidPrefixStructure { range, .. }
            | ElementPrefixNotAllowed { range, .. }
            | ElementValueNotAllowed { range, .. }
            | UnsupportedElementValueShape { range, .. }
            | UnsupportedElementValueShapeOfRelation { range, .. }
            | UnsupportedElementRelation { range, .. }
            | SortValueRequired { range }
            | SortValueMustBeList { range }
            | InvalidSortItem { range, .. }
            | SortIsIndependent { range }
            | DuplicatedSortItem { range, .. }
            | ValueCannotBeAddress { range }
            | PatternInComparison { range }
            | TypeCast { range, .. }
            | EnumCast { range, .. }
            | UnsupportedStructure { range, .. }
            | FieldsAndElementsMixed { range }
            | CannotHaveSourceFlag { range, .. }
            | MustHaveSourceFlag { range, .. }
            | ValuePrefixNotAllowed { range }
            | Unresolved { range, .. }
            | Ambiguous { range, .. }
            | UnknownField { range, .. } => range,
        };
        Some(*range)
    }

    fn info(&self) -> Option<Value> {
        use SemanticError::*;
        match self {
            FilterValueRequired { field, .. }
            | FilterValueNotRequired { field, .. }
            | UnsupportedRelation { field, .. } => Some(json!({ "field": field })),
            UnsupportedValueShape { field, shape, .. } => {
                Some(json!({ "field": field, "shape": shape.to_string() }))
            }
            UnsupportedValueShapeOfRelation {
                field,
                shape,
                relation,
                ..
            } => Some(json!({ "field": field, "shape": shape.to_string(), "relation": relation })),
            UnsupportedElementValueShape { item, shape, .. } => {
                Some(json!({ "item": item, "shape": shape.to_string() }))
            }
            UnsupportedElementValueShapeOfRelation {
                item,
                shape,
                relation,
                ..
            } => Some(json!({ "item": item, "shape": shape.to_string(), "relation": relation })),
            UnsupportedElementRelation { item, relation, .. } => {
                Some(json!({ "item": item, "relation": relation }))
            }
            InvalidSortItem { item, expected, .. } => {
                Some(json!({ "item": item, "expected": expected }))
            }
            DuplicatedSortItem { item, .. } => Some(json!({ "item": item })),
            TypeCast {
                value, expected, ..
            } => Some(json!({ "value": value, "expected": expected })),
            EnumCast {
                value,
                type_name,
                expected,
                ..
            } => Some(json!({ "value": value, "type": type_name, "expected": expected })),
            Unresolved { kind, name, .. } => Some(json!({ "kind": kind, "name": name })),
            Ambiguous {
                kind,
                name,
                candidates,
                ..
            } => Some(json!({ "kind": kind, "name": name, "candidates": candidates })),
            UnknownField { name, .. }
            | ElementPrefixNotAllowed { name, .. }
            | ElementValueNotAllowed { name, .. }
            | CannotHaveSourceFlag { name, .. }
            | MustHaveSourceFlag { name, .. } => Some(json!({ "name": name })),
            _ => None,
        }
    }
}

// ── Translation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("element '{item}' unions {count} items, more than the limit of {limit}")]
    UnionItemsExceed {
        item: String,
        count: usize,
        limit: usize,
        range: TextRange,
    },

    #[error("query intersects {count} element items, more than the limit of {limit}")]
    IntersectItemsExceed { count: usize, limit: usize },
}

impl Diagnose for TranslationError {
    fn code(&self) -> u16 {
        match self {
            TranslationError::UnionItemsExceed { .. } => 4001,
            TranslationError::IntersectItemsExceed { .. } => 4002,
        }
    }

    fn range(&self) -> Option<TextRange> {
        match self {
            TranslationError::UnionItemsExceed { range, .. } => Some(*range),
            TranslationError::IntersectItemsExceed { .. } => None,
        }
    }

    fn info(&self) -> Option<Value> {
        match self {
            TranslationError::UnionItemsExceed { count, limit, .. }
            | TranslationError::IntersectItemsExceed { count, limit } => {
                Some(json!({ "count": count, "limit": limit }))
            }
        }
    }
}

// ── Whole pipeline ───────────────────────────────────────────────────

/// Any diagnostic raised while compiling one query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl Diagnose for CompileError {
    fn code(&self) -> u16 {
        match self {
            CompileError::Lexical(e) => e.code(),
            CompileError::Grammar(e) => e.code(),
            CompileError::Semantic(e) => e.code(),
            CompileError::Translation(e) => e.code(),
        }
    }

    fn range(&self) -> Option<TextRange> {
        match self {
            CompileError::Lexical(e) => e.range(),
            CompileError::Grammar(e) => e.range(),
            CompileError::Semantic(e) => e.range(),
            CompileError::Translation(e) => e.range(),
        }
    }

    fn info(&self) -> Option<Value> {
        match self {
            CompileError::Lexical(e) => e.info(),
            CompileError::Grammar(e) => e.info(),
            CompileError::Semantic(e) => e.info(),
            CompileError::Translation(e) => e.info(),
        }
    }
}
