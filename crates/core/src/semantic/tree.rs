//! Semantic tree: the analyzed query, with every name resolved and every
//! value cast to its field's type.

use serde::{Deserialize, Serialize};
use time::Date;

use super::schema::{FieldKey, OrderKey};
use crate::ast::Direction;
use crate::composition::Tagme;
use crate::lookup::{MetaEntity, MetaKind};
use crate::range::TextRange;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticTree {
    pub sorts: Vec<SortItem>,
    pub elements: Vec<ElementClause>,
    pub filters: Vec<FilterClause>,
}

impl SemanticTree {
    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty() && self.elements.is_empty() && self.filters.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub key: OrderKey,
    pub direction: Direction,
}

// ── Elements ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Text,
    Tag,
    Topic,
    Author,
    SourceTag,
}

impl From<MetaKind> for ElementKind {
    fn from(kind: MetaKind) -> Self {
        match kind {
            MetaKind::Tag => ElementKind::Tag,
            MetaKind::Topic => ElementKind::Topic,
            MetaKind::Author => ElementKind::Author,
            MetaKind::SourceTag => ElementKind::SourceTag,
        }
    }
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Text => "text",
            ElementKind::Tag => "tag",
            ElementKind::Topic => "topic",
            ElementKind::Author => "author",
            ElementKind::SourceTag => "source-tag",
        }
    }
}

/// One intersected element item: the union of what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementClause {
    pub kind: ElementKind,
    pub exclude: bool,
    pub union: Vec<ElementValue>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementValue {
    /// Free text; `exact` when written in double quotes.
    Text { value: String, exact: bool },
    Meta(MetaEntity),
}

impl ElementValue {
    pub fn label(&self) -> &str {
        match self {
            ElementValue::Text { value, .. } => value,
            ElementValue::Meta(entity) => entity.name(),
        }
    }
}

// ── Filters ──────────────────────────────────────────────────────────

/// One intersected filter item: the union of its filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub exclude: bool,
    pub union: Vec<Filter>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Filter {
    Equal {
        field: FieldKey,
        values: Vec<FilterValue>,
    },
    /// `*`/`?` patterns, matched case-insensitively.
    Match {
        field: FieldKey,
        patterns: Vec<String>,
    },
    Range {
        field: FieldKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        begin: Option<Bound>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<Bound>,
    },
    Flag {
        field: FieldKey,
    },
    Composition {
        field: FieldKey,
        value: Tagme,
    },
}

impl Filter {
    pub fn field(&self) -> FieldKey {
        match self {
            Filter::Equal { field, .. }
            | Filter::Match { field, .. }
            | Filter::Range { field, .. }
            | Filter::Flag { field }
            | Filter::Composition { field, .. } => *field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: FilterValue,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum FilterValue {
    Number(i64),
    Size(u64),
    Date(#[serde(with = "iso_date")] Date),
    Text(String),
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Size(n) => write!(f, "{n}"),
            FilterValue::Date(d) => f.write_str(&super::value::format_date(d)),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Month;

    #[test]
    fn filters_serialize_with_type_tags() {
        let filter = Filter::Range {
            field: FieldKey::Partition,
            begin: Some(Bound {
                value: FilterValue::Date(Date::from_calendar_date(2024, Month::January, 2).unwrap()),
                inclusive: true,
            }),
            end: None,
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "type": "range",
                "field": "PARTITION",
                "begin": { "value": { "type": "date", "value": "2024-01-02" }, "inclusive": true }
            })
        );
        let back: Filter = serde_json::from_value(serde_json::to_value(&filter).unwrap()).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn sort_directions_are_short_names() {
        let item = SortItem {
            key: OrderKey::Score,
            direction: Direction::Descending,
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            json!({ "key": "SCORE", "direction": "desc" })
        );
    }

    #[test]
    fn composition_serializes_flag_names() {
        let filter = Filter::Composition {
            field: FieldKey::Tagme,
            value: Tagme::TAG | Tagme::AUTHOR,
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "type": "composition", "field": "TAGME", "value": "TAG | AUTHOR" })
        );
    }
}
