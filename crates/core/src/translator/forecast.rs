//! Completion at a cursor position.
//!
//! The forecast works on lexical items rather than the parse tree so a
//! half-typed query that does not parse yet still completes.

use serde::{Deserialize, Serialize};

use crate::alias::find;
use crate::composition::{base_names, Tagme};
use crate::lexer::{LexicalItem, StrKind, Symbol};
use crate::lookup::{MetaEntity, MetaKind, MetadataLookup, NamePart};
use crate::options::CompilerOptions;
use crate::range::TextRange;
use crate::semantic::schema::{
    FieldKey, FieldType, ELEMENT_FIELDS, FIELD_ALIASES, ORDER_ALIASES, SORT_FIELD,
};
use crate::semantic::value::is_pattern;

/// What kind of name is expected at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ForecastContext {
    /// A bare name: tag, topic or author.
    Bare,
    /// A name of one metadata kind, from a prefix or an element field.
    Meta { kind: MetaKind },
    /// A sort key inside `order:`.
    OrderKey { source: bool },
    /// An enum value of a composition field.
    Enum { field: FieldKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MetaKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl From<MetaEntity> for Suggestion {
    fn from(entity: MetaEntity) -> Self {
        Suggestion {
            name: entity.name().to_string(),
            other_names: entity.other_names().to_vec(),
            kind: Some(entity.kind()),
            id: Some(entity.id()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub context: ForecastContext,
    /// The text to replace with the chosen suggestion.
    pub span: TextRange,
    pub suggestions: Vec<Suggestion>,
}

fn is_family(symbol: Symbol) -> bool {
    matches!(
        symbol,
        Symbol::Colon | Symbol::Gt | Symbol::Gte | Symbol::Lt | Symbol::Lte | Symbol::Tilde
    )
}

fn symbol_at(tokens: &[LexicalItem], index: usize) -> Option<Symbol> {
    tokens.get(index).and_then(LexicalItem::symbol)
}

fn is_str(tokens: &[LexicalItem], index: usize) -> bool {
    tokens.get(index).and_then(LexicalItem::as_str).is_some()
}

/// The string item under the cursor. A cursor on the boundary of two
/// items belongs to the one it ends.
fn target(tokens: &[LexicalItem], cursor: usize) -> Option<usize> {
    let touching = |i: &usize| tokens[*i].as_str().is_some() && tokens[*i].range.touches(cursor);
    let mut candidates = (0..tokens.len()).filter(touching);
    let first = candidates.next()?;
    Some(
        std::iter::once(first)
            .chain(candidates)
            .find(|i| tokens[*i].begin() < cursor)
            .unwrap_or(first),
    )
}

/// Field predicate context: `anchor` is a family symbol, or punctuation
/// inside a predicate. Walks back to the family and reads the subject.
fn field_context(tokens: &[LexicalItem], anchor: usize, value_source: bool) -> Option<ForecastContext> {
    let mut family = anchor;
    loop {
        match symbol_at(tokens, family) {
            Some(s) if is_family(s) => break,
            Some(
                Symbol::Comma
                | Symbol::LBrace
                | Symbol::LBracket
                | Symbol::LParen
                | Symbol::Dot
                | Symbol::DotDot
                | Symbol::Plus
                | Symbol::Minus
                | Symbol::Caret,
            ) => {}
            None if is_str(tokens, family) => {}
            _ => return None,
        }
        family = family.checked_sub(1)?;
    }
    let subject = family.checked_sub(1)?;
    let (word, kind) = tokens.get(subject)?.as_str()?;
    if kind != StrKind::Restricted || symbol_at(tokens, subject.wrapping_sub(1)) == Some(Symbol::Dot) {
        return None;
    }
    let source = symbol_at(tokens, subject.wrapping_sub(1)) == Some(Symbol::Caret);
    if !source && SORT_FIELD.matches(word, false) {
        return Some(ForecastContext::OrderKey {
            source: value_source,
        });
    }
    if let Some(kind) = find(ELEMENT_FIELDS, word, source) {
        return Some(ForecastContext::Meta { kind });
    }
    match find(FIELD_ALIASES, word, source) {
        Some(field) if field.field_type() == FieldType::Composition => {
            Some(ForecastContext::Enum { field })
        }
        _ => None,
    }
}

/// Element prefix of the item a union member belongs to.
fn union_context(tokens: &[LexicalItem], separator: usize) -> ForecastContext {
    let mut i = separator;
    while let Some(prev) = i.checked_sub(1) {
        match symbol_at(tokens, prev) {
            Some(Symbol::Pipe | Symbol::Slash | Symbol::Dot) => {}
            None if is_str(tokens, prev) => {}
            Some(Symbol::At) => return ForecastContext::Meta { kind: MetaKind::Author },
            Some(Symbol::Hash) => return ForecastContext::Meta { kind: MetaKind::Topic },
            Some(Symbol::Dollar) => return ForecastContext::Meta { kind: MetaKind::Tag },
            Some(Symbol::Caret) => {
                return ForecastContext::Meta {
                    kind: MetaKind::SourceTag,
                }
            }
            _ => break,
        }
        i = prev;
    }
    ForecastContext::Bare
}

/// Start of the dotted path the target belongs to.
fn path_start(tokens: &[LexicalItem], index: usize) -> usize {
    let mut start = index;
    while start >= 2 && symbol_at(tokens, start - 1) == Some(Symbol::Dot) && is_str(tokens, start - 2) {
        start -= 2;
    }
    start
}

/// The already typed parts of the dotted path ending at `index`.
fn address(tokens: &[LexicalItem], index: usize) -> Vec<NamePart> {
    (path_start(tokens, index)..index)
        .step_by(2)
        .filter_map(|i| tokens[i].as_str())
        .map(|(value, kind)| NamePart {
            name: value.to_string(),
            exact: kind.is_exact(),
            pattern: kind == StrKind::Restricted && is_pattern(value),
        })
        .collect()
}

fn context(tokens: &[LexicalItem], index: usize) -> Option<ForecastContext> {
    let start = path_start(tokens, index);
    // Value or item prefixes: `+`, `-`, `^`.
    let mut before = start;
    let mut source = false;
    while let Some(prev) = before.checked_sub(1) {
        match symbol_at(tokens, prev) {
            Some(Symbol::Caret) => source = true,
            Some(Symbol::Plus | Symbol::Minus) => {}
            _ => break,
        }
        before = prev;
    }
    let anchor = before.checked_sub(1);
    match anchor.and_then(|a| symbol_at(tokens, a)) {
        Some(s)
            if is_family(s)
                || matches!(s, Symbol::Comma | Symbol::LBrace | Symbol::LBracket | Symbol::LParen) =>
        {
            field_context(tokens, anchor?, source)
        }
        Some(Symbol::At) => Some(ForecastContext::Meta { kind: MetaKind::Author }),
        Some(Symbol::Hash) => Some(ForecastContext::Meta { kind: MetaKind::Topic }),
        Some(Symbol::Dollar) => Some(ForecastContext::Meta { kind: MetaKind::Tag }),
        Some(Symbol::Pipe | Symbol::Slash) if !source => Some(union_context(tokens, anchor?)),
        _ if source => Some(ForecastContext::Meta {
            kind: MetaKind::SourceTag,
        }),
        _ => Some(ForecastContext::Bare),
    }
}

/// 0 exact name, 1 name prefix, 2 other-name prefix, 3 anything else.
fn rank(suggestion: &Suggestion, prefix: &str) -> u8 {
    let name = suggestion.name.to_lowercase();
    if name == prefix {
        0
    } else if name.starts_with(prefix) {
        1
    } else if suggestion
        .other_names
        .iter()
        .any(|n| n.to_lowercase().starts_with(prefix))
    {
        2
    } else {
        3
    }
}

fn keyword_suggestions(names: impl IntoIterator<Item = String>, prefix: &str) -> Vec<Suggestion> {
    names
        .into_iter()
        .filter(|n| n.to_lowercase().contains(prefix))
        .map(|name| Suggestion {
            name,
            other_names: Vec::new(),
            kind: None,
            id: None,
        })
        .collect()
}

/// Suggestions for the string item under `cursor`, or `None` when the
/// cursor is not on a completable item.
pub fn forecast(
    tokens: &[LexicalItem],
    cursor: usize,
    lookup: &dyn MetadataLookup,
    options: &CompilerOptions,
) -> Option<Forecast> {
    let index = target(tokens, cursor)?;
    let item = &tokens[index];
    let (value, kind) = item.as_str()?;
    let context = context(tokens, index)?;
    if context == ForecastContext::Bare && kind.is_text() {
        return None;
    }
    let prefix = match kind {
        StrKind::Restricted => value
            .chars()
            .take(cursor.saturating_sub(item.begin()))
            .collect::<String>(),
        _ => value.to_string(),
    }
    .to_lowercase();
    let address = address(tokens, index);

    let mut suggestions: Vec<Suggestion> = match context {
        ForecastContext::Bare => [MetaKind::Tag, MetaKind::Topic, MetaKind::Author]
            .into_iter()
            .flat_map(|k| lookup.resolve_by_prefix(k, &address, &prefix))
            .map(Suggestion::from)
            .collect(),
        ForecastContext::Meta { kind } => lookup
            .resolve_by_prefix(kind, &address, &prefix)
            .into_iter()
            .map(Suggestion::from)
            .collect(),
        ForecastContext::OrderKey { source } => keyword_suggestions(
            ORDER_ALIASES
                .iter()
                .flat_map(|entry| entry.aliases.iter())
                .filter(|a| a.source == source)
                .map(|a| a.name.to_string()),
            &prefix,
        ),
        ForecastContext::Enum { .. } => keyword_suggestions(
            base_names::<Tagme>().into_iter().map(str::to_lowercase),
            &prefix,
        ),
    };
    suggestions.sort_by(|a, b| {
        rank(a, &prefix)
            .cmp(&rank(b, &prefix))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.id.cmp(&b.id))
    });
    suggestions.dedup();
    if let Some(limit) = options.forecast_limit {
        suggestions.truncate(limit);
    }
    tracing::debug!(
        cursor,
        context = ?context,
        suggestions = suggestions.len(),
        "forecast"
    );
    Some(Forecast {
        context,
        span: item.range,
        suggestions,
    })
}
