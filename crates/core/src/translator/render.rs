//! Query plan back to query text.
//!
//! The output re-compiles to the same plan: tags and topics are written
//! with their full address, source tags with their site.

use crate::alias::Alias;
use crate::ast::Direction;
use crate::composition::exported_names;
use crate::lexer::{quote, quote_if_needed};
use crate::lookup::MetaEntity;
use crate::semantic::schema::{FieldKey, FieldType, FIELD_ALIASES};
use crate::semantic::{Bound, ElementKind, ElementValue, Filter, FilterValue, SortItem};

use super::plan::{ElementItem, FilterGroup, QueryPlan};

/// Render `plan` as one query: sorts, then element items by group, then
/// filters, separated by spaces.
pub fn to_query_text(plan: &QueryPlan) -> String {
    let mut items = Vec::new();
    if !plan.sorts.is_empty() {
        items.push(sorts(&plan.sorts));
    }
    for group in &plan.elements {
        for item in &group.items {
            items.push(element_item(group.kind, item));
        }
    }
    for group in &plan.filters {
        items.push(filter_group(group));
    }
    items.join(" ")
}

fn sorts(sorts: &[SortItem]) -> String {
    let keys: Vec<String> = sorts
        .iter()
        .map(|s| match s.direction {
            Direction::Ascending => s.key.display_name(),
            Direction::Descending => format!("-{}", s.key.display_name()),
        })
        .collect();
    format!("order:{}", keys.join(","))
}

fn name(text: &str) -> String {
    quote_if_needed(text, '`')
}

fn element_item(kind: ElementKind, item: &ElementItem) -> String {
    let prefix = match kind {
        ElementKind::Text => "",
        ElementKind::Tag => "$",
        ElementKind::Topic => "#",
        ElementKind::Author => "@",
        ElementKind::SourceTag => "^",
    };
    let values: Vec<String> = item
        .union
        .iter()
        .map(|v| match v {
            ElementValue::Text { value, exact: true } => quote(value, '"'),
            ElementValue::Text { value, exact: false } => quote(value, '\''),
            ElementValue::Meta(MetaEntity::SourceTag(tag)) => {
                format!("{}.{}", name(&tag.site), name(&tag.name))
            }
            ElementValue::Meta(entity) => entity
                .address()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(entity.name()))
                .map(name)
                .collect::<Vec<_>>()
                .join("."),
        })
        .collect();
    let exclude = if item.exclude { "-" } else { "" };
    format!("{exclude}{prefix}{}", values.join("|"))
}

/// Fields are written with their plain alias so one union may mix
/// source and non-source fields.
fn field_name(key: FieldKey) -> String {
    FIELD_ALIASES
        .iter()
        .find(|entry| entry.key == key)
        .and_then(|entry| entry.aliases.iter().find(|a| !a.source))
        .map(|a: &Alias| a.name.to_string())
        .unwrap_or_else(|| key.display_name())
}

fn value(key: FieldKey, value: &FilterValue) -> String {
    match value {
        FilterValue::Text(text) if key.field_type() == FieldType::PatternString => quote(text, '`'),
        FilterValue::Text(text) => quote_if_needed(text, '`'),
        other => quote_if_needed(&other.to_string(), '\''),
    }
}

/// One value bare, several as a collection.
fn values(list: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = list.collect();
    match items.as_slice() {
        [only] => only.clone(),
        _ => format!("{{{}}}", items.join(", ")),
    }
}

fn filter(f: &Filter) -> String {
    match f {
        Filter::Equal { field, values: list } => format!(
            "{}:{}",
            field_name(*field),
            values(list.iter().map(|v| value(*field, v)))
        ),
        Filter::Match { field, patterns } => {
            let family = if field.field_type().is_matchable() { "~" } else { ":" };
            format!(
                "{}{family}{}",
                field_name(*field),
                values(patterns.iter().map(|p| quote_if_needed(p, '\'')))
            )
        }
        Filter::Range { field, begin, end } => {
            let bound = |b: &Bound| value(*field, &b.value);
            let name = field_name(*field);
            match (begin, end) {
                (Some(b), Some(e)) => format!(
                    "{name}:{}{},{}{}",
                    if b.inclusive { "[" } else { "(" },
                    bound(b),
                    bound(e),
                    if e.inclusive { "]" } else { ")" },
                ),
                (Some(b), None) => {
                    format!("{name}{}{}", if b.inclusive { ">=" } else { ">" }, bound(b))
                }
                (None, Some(e)) => {
                    format!("{name}{}{}", if e.inclusive { "<=" } else { "<" }, bound(e))
                }
                (None, None) => name,
            }
        }
        Filter::Flag { field } => field_name(*field),
        Filter::Composition { field, value } => {
            let names: Vec<String> = exported_names(*value)
                .into_iter()
                .map(str::to_lowercase)
                .collect();
            format!("{}:{{{}}}", field_name(*field), names.join(", "))
        }
    }
}

fn filter_group(group: &FilterGroup) -> String {
    let union: Vec<String> = group.union.iter().map(filter).collect();
    let exclude = if group.exclude { "-" } else { "" };
    format!("{exclude}{}", union.join("|"))
}
