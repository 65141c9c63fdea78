//! Metadata the analyzer resolves names against.
//!
//! The compiler never owns metadata. Callers hand in a [`MetadataLookup`]
//! that answers name and prefix queries from a consistent snapshot for
//! the duration of one compilation.

pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::composition::{MetaTarget, TagFlags};

pub use snapshot::MetadataSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetaKind {
    Tag,
    Topic,
    Author,
    SourceTag,
}

impl MetaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKind::Tag => "tag",
            MetaKind::Topic => "topic",
            MetaKind::Author => "author",
            MetaKind::SourceTag => "source-tag",
        }
    }
}

impl std::fmt::Display for MetaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a name path as the analyzer understood it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePart {
    pub name: String,
    /// Case-sensitive equality against the canonical name only.
    pub exact: bool,
    /// `*` and `?` are wildcards.
    pub pattern: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub flags: TagFlags,
    /// Names of the ancestors, root first. Filled in by the lookup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub target: MetaTarget,
    /// Names of the ancestors, root first. Filled in by the lookup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(default)]
    pub target: MetaTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag {
    pub id: u64,
    pub site: String,
    pub name: String,
    #[serde(default)]
    pub other_names: Vec<String>,
}

/// A resolved metadata entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MetaEntity {
    Tag(Tag),
    Topic(Topic),
    Author(Author),
    SourceTag(SourceTag),
}

impl MetaEntity {
    pub fn kind(&self) -> MetaKind {
        match self {
            MetaEntity::Tag(_) => MetaKind::Tag,
            MetaEntity::Topic(_) => MetaKind::Topic,
            MetaEntity::Author(_) => MetaKind::Author,
            MetaEntity::SourceTag(_) => MetaKind::SourceTag,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            MetaEntity::Tag(e) => e.id,
            MetaEntity::Topic(e) => e.id,
            MetaEntity::Author(e) => e.id,
            MetaEntity::SourceTag(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MetaEntity::Tag(e) => &e.name,
            MetaEntity::Topic(e) => &e.name,
            MetaEntity::Author(e) => &e.name,
            MetaEntity::SourceTag(e) => &e.name,
        }
    }

    /// Ancestor names of a tag or topic, root first. Empty for authors
    /// and source tags.
    pub fn address(&self) -> &[String] {
        match self {
            MetaEntity::Tag(e) => &e.address,
            MetaEntity::Topic(e) => &e.address,
            MetaEntity::Author(_) | MetaEntity::SourceTag(_) => &[],
        }
    }

    pub fn other_names(&self) -> &[String] {
        match self {
            MetaEntity::Tag(e) => &e.other_names,
            MetaEntity::Topic(e) => &e.other_names,
            MetaEntity::Author(e) => &e.other_names,
            MetaEntity::SourceTag(e) => &e.other_names,
        }
    }
}

/// Synchronous, side-effect-free metadata oracle.
pub trait MetadataLookup {
    /// Entities of `kind` whose path matches `parts`. The last part names
    /// the entity; earlier parts name its ancestors (or the site, for
    /// source tags).
    fn resolve_by_name(&self, kind: MetaKind, parts: &[NamePart]) -> Vec<MetaEntity>;

    /// Completion candidates of `kind` for a partially typed name. The
    /// `address` parts narrow candidates the way the leading parts of a
    /// path do in [`MetadataLookup::resolve_by_name`]. Order is not
    /// significant; the forecast ranks and truncates them.
    fn resolve_by_prefix(&self, kind: MetaKind, address: &[NamePart], prefix: &str) -> Vec<MetaEntity>;

    /// One entity by id.
    fn resolve_by_id(&self, kind: MetaKind, id: u64) -> Option<MetaEntity> {
        let _ = (kind, id);
        None
    }

    /// Direct children of a tag or topic in their stored order. Sequence
    /// groups are ordered by this.
    fn children(&self, kind: MetaKind, parent: u64) -> Vec<MetaEntity> {
        let _ = (kind, parent);
        Vec::new()
    }
}

/// A lookup that knows nothing. Every name is unresolved.
pub struct EmptyLookup;

impl MetadataLookup for EmptyLookup {
    fn resolve_by_name(&self, _kind: MetaKind, _parts: &[NamePart]) -> Vec<MetaEntity> {
        Vec::new()
    }

    fn resolve_by_prefix(&self, _kind: MetaKind, _address: &[NamePart], _prefix: &str) -> Vec<MetaEntity> {
        Vec::new()
    }
}
