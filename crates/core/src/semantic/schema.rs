//! Field, order-key and element-field tables of the image dialect.

use serde::{Deserialize, Serialize};

use crate::alias::{Alias, FieldAlias};
use crate::lookup::MetaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKey {
    Favorite,
    BookMember,
    Id,
    Score,
    Partition,
    Ordinal,
    CreateTime,
    UpdateTime,
    Description,
    Extension,
    Filesize,
    SourceId,
    SourcePage,
    SourcePageName,
    SourceSite,
    SourceDescription,
    Tagme,
}

/// How a field's values are read and which relations it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Present or not; takes no relation.
    Flag,
    Number,
    /// A number, or a `*`/`?` pattern matched against its digits.
    PatternNumber,
    Size,
    Date,
    DateTime,
    String,
    /// Matched by pattern unless written in backticks.
    PatternString,
    /// A set of enum flags.
    Composition,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Flag => "flag",
            FieldType::Number => "number",
            FieldType::PatternNumber => "pattern-number",
            FieldType::Size => "size",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::String => "string",
            FieldType::PatternString => "pattern-string",
            FieldType::Composition => "composition",
        }
    }

    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            FieldType::Number
                | FieldType::PatternNumber
                | FieldType::Size
                | FieldType::Date
                | FieldType::DateTime
        )
    }

    /// Whether `~` applies.
    pub fn is_matchable(&self) -> bool {
        matches!(self, FieldType::PatternString)
    }
}

impl FieldKey {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKey::Favorite | FieldKey::BookMember => FieldType::Flag,
            FieldKey::Id | FieldKey::SourceId | FieldKey::SourcePage => FieldType::PatternNumber,
            FieldKey::Score => FieldType::Number,
            FieldKey::Partition => FieldType::Date,
            FieldKey::Ordinal | FieldKey::CreateTime | FieldKey::UpdateTime => FieldType::DateTime,
            FieldKey::Description | FieldKey::SourceDescription => FieldType::PatternString,
            FieldKey::Extension | FieldKey::SourcePageName | FieldKey::SourceSite => FieldType::String,
            FieldKey::Filesize => FieldType::Size,
            FieldKey::Tagme => FieldType::Composition,
        }
    }

    /// Preferred spelling, with `^` for source fields.
    pub fn display_name(&self) -> String {
        crate::alias::preferred(FIELD_ALIASES, *self)
            .map(|a| a.display())
            .unwrap_or_default()
    }
}

const fn field(key: FieldKey, aliases: &'static [Alias]) -> FieldAlias<FieldKey> {
    FieldAlias { key, aliases }
}

pub const FIELD_ALIASES: &[FieldAlias<FieldKey>] = &[
    field(FieldKey::Favorite, &[Alias::plain("favorite"), Alias::plain("f")]),
    field(FieldKey::BookMember, &[Alias::plain("book-member"), Alias::plain("bm")]),
    field(FieldKey::Id, &[Alias::plain("id")]),
    field(FieldKey::Score, &[Alias::plain("score")]),
    field(FieldKey::Partition, &[Alias::plain("partition"), Alias::plain("pt")]),
    field(FieldKey::Ordinal, &[Alias::plain("ordinal"), Alias::plain("ord")]),
    field(
        FieldKey::CreateTime,
        &[Alias::plain("create"), Alias::plain("create-time"), Alias::plain("ct")],
    ),
    field(
        FieldKey::UpdateTime,
        &[Alias::plain("update"), Alias::plain("update-time"), Alias::plain("ut")],
    ),
    field(FieldKey::Description, &[Alias::plain("description"), Alias::plain("desc")]),
    field(FieldKey::Extension, &[Alias::plain("extension"), Alias::plain("ext")]),
    field(FieldKey::Filesize, &[Alias::plain("filesize"), Alias::plain("size")]),
    field(FieldKey::SourceId, &[Alias::source("id"), Alias::plain("source-id")]),
    field(FieldKey::SourcePage, &[Alias::source("page"), Alias::plain("source-page")]),
    field(
        FieldKey::SourcePageName,
        &[Alias::source("page-name"), Alias::source("pn"), Alias::plain("source-page-name")],
    ),
    field(FieldKey::SourceSite, &[Alias::source("site"), Alias::plain("source-site")]),
    field(
        FieldKey::SourceDescription,
        &[
            Alias::source("description"),
            Alias::source("desc"),
            Alias::plain("source-description"),
            Alias::plain("source-desc"),
        ],
    ),
    field(FieldKey::Tagme, &[Alias::plain("tagme")]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKey {
    Id,
    Score,
    Ordinal,
    Partition,
    CreateTime,
    UpdateTime,
    SourceId,
    SourceSite,
}

impl OrderKey {
    pub fn display_name(&self) -> String {
        crate::alias::preferred(ORDER_ALIASES, *self)
            .map(|a| a.display())
            .unwrap_or_default()
    }
}

const fn order(key: OrderKey, aliases: &'static [Alias]) -> FieldAlias<OrderKey> {
    FieldAlias { key, aliases }
}

pub const ORDER_ALIASES: &[FieldAlias<OrderKey>] = &[
    order(OrderKey::Id, &[Alias::plain("id")]),
    order(OrderKey::Score, &[Alias::plain("score"), Alias::plain("s")]),
    order(OrderKey::Ordinal, &[Alias::plain("ordinal"), Alias::plain("ord")]),
    order(OrderKey::Partition, &[Alias::plain("partition"), Alias::plain("pt")]),
    order(
        OrderKey::CreateTime,
        &[Alias::plain("create-time"), Alias::plain("create"), Alias::plain("ct")],
    ),
    order(
        OrderKey::UpdateTime,
        &[Alias::plain("update-time"), Alias::plain("update"), Alias::plain("ut")],
    ),
    order(OrderKey::SourceId, &[Alias::source("id"), Alias::plain("source-id")]),
    order(OrderKey::SourceSite, &[Alias::source("site"), Alias::plain("source-site")]),
];

/// The field whose value is a sort list.
pub const SORT_FIELD: Alias = Alias::plain("order");

/// Fields whose values are metadata names rather than filter values.
pub const ELEMENT_FIELDS: &[FieldAlias<MetaKind>] = &[
    FieldAlias {
        key: MetaKind::Tag,
        aliases: &[Alias::plain("tag"), Alias::plain("tags")],
    },
    FieldAlias {
        key: MetaKind::Topic,
        aliases: &[Alias::plain("topic"), Alias::plain("topics")],
    },
    FieldAlias {
        key: MetaKind::Author,
        aliases: &[Alias::plain("author"), Alias::plain("authors")],
    },
    FieldAlias {
        key: MetaKind::SourceTag,
        aliases: &[Alias::source("tag"), Alias::plain("source-tag")],
    },
];
