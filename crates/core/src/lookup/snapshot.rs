//! In-memory [`MetadataLookup`] over a JSON snapshot.
//!
//! ```json
//! { "tags": [{ "id": 1, "name": "animal", "flags": "ADDRESS" }],
//!   "topics": [], "authors": [], "source_tags": [] }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Author, MetaEntity, MetaKind, MetadataLookup, NamePart, SourceTag, Tag, Topic};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSnapshot {
    pub tags: Vec<Tag>,
    pub topics: Vec<Topic>,
    pub authors: Vec<Author>,
    pub source_tags: Vec<SourceTag>,
}

impl MetadataSnapshot {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A tag or topic: the two kinds that nest.
trait Node: Clone {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
    fn other_names(&self) -> &[String];
    fn parent(&self) -> Option<u64>;
    fn set_address(&mut self, address: Vec<String>);
}

impl Node for Tag {
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn other_names(&self) -> &[String] {
        &self.other_names
    }
    fn parent(&self) -> Option<u64> {
        self.parent
    }
    fn set_address(&mut self, address: Vec<String>) {
        self.address = address;
    }
}

impl Node for Topic {
    fn id(&self) -> u64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn other_names(&self) -> &[String] {
        &self.other_names
    }
    fn parent(&self) -> Option<u64> {
        self.parent
    }
    fn set_address(&mut self, address: Vec<String>) {
        self.address = address;
    }
}

/// Ancestors reached from `start`, nearest first. A parent cycle ends the
/// walk once every node has been visited.
fn ancestors<N: Node>(nodes: &[N], start: Option<u64>) -> Vec<&N> {
    let mut out: Vec<&N> = Vec::new();
    let mut current = start;
    while let Some(node) = current.and_then(|id| nodes.iter().find(|n| n.id() == id)) {
        if out.len() == nodes.len() {
            break;
        }
        out.push(node);
        current = node.parent();
    }
    out
}

/// Whether `address`, read right to left, is a subsequence of the
/// ancestors. Intermediate ancestors may be skipped.
fn address_matches<N: Node>(ancestors: &[&N], address: &[Matcher]) -> bool {
    let mut pending = address.iter().rev().peekable();
    for node in ancestors {
        match pending.peek() {
            Some(m) if m.matches(node.name(), node.other_names()) => {
                pending.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    pending.peek().is_none()
}

/// Clone of `node` carrying its ancestor names, root first.
fn addressed<N: Node>(nodes: &[N], node: &N) -> N {
    let mut node = node.clone();
    let address = ancestors(nodes, node.parent())
        .iter()
        .rev()
        .map(|a| a.name().to_owned())
        .collect();
    node.set_address(address);
    node
}

fn select<N: Node>(nodes: &[N], address: &[Matcher], keep: impl Fn(&N) -> bool) -> Vec<N> {
    nodes
        .iter()
        .filter(|n| keep(n))
        .filter(|n| address_matches(&ancestors(nodes, n.parent()), address))
        .map(|n| addressed(nodes, n))
        .collect()
}

fn children<N: Node>(nodes: &[N], parent: u64) -> Vec<N> {
    nodes
        .iter()
        .filter(|n| n.parent() == Some(parent))
        .map(|n| addressed(nodes, n))
        .collect()
}

enum Matcher {
    /// Case-sensitive, canonical name only.
    Exact(String),
    /// Case-insensitive, canonical or alternate names.
    Plain(String),
    Pattern(Option<Regex>),
}

impl Matcher {
    fn new(part: &NamePart) -> Matcher {
        if part.pattern {
            let regex = glob_to_regex(&part.name);
            if let Err(e) = &regex {
                tracing::warn!(pattern = %part.name, error = %e, "name pattern rejected");
            }
            Matcher::Pattern(regex.ok())
        } else if part.exact {
            Matcher::Exact(part.name.clone())
        } else {
            Matcher::Plain(part.name.to_lowercase())
        }
    }

    fn matches_one(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(s) => name == s,
            Matcher::Plain(s) => name.to_lowercase() == *s,
            Matcher::Pattern(Some(re)) => re.is_match(name),
            Matcher::Pattern(None) => false,
        }
    }

    fn matches(&self, name: &str, other_names: &[String]) -> bool {
        match self {
            Matcher::Exact(_) => self.matches_one(name),
            _ => self.matches_one(name) || other_names.iter().any(|n| self.matches_one(n)),
        }
    }
}

/// `*` is any run, `?` any one character; matching is case-insensitive
/// and anchored.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl MetadataSnapshot {
    fn sources(&self, address: &[Matcher], keep: impl Fn(&SourceTag) -> bool) -> Vec<MetaEntity> {
        let site = match address {
            [] => None,
            [site] => Some(site),
            _ => return Vec::new(),
        };
        self.source_tags
            .iter()
            .filter(|s| site.map_or(true, |m| m.matches_one(&s.site)) && keep(s))
            .cloned()
            .map(MetaEntity::SourceTag)
            .collect()
    }

    fn select(
        &self,
        kind: MetaKind,
        address: &[Matcher],
        hit: impl Fn(&str, &[String]) -> bool,
    ) -> Vec<MetaEntity> {
        match kind {
            MetaKind::Tag => select(&self.tags, address, |t| hit(&t.name, &t.other_names))
                .into_iter()
                .map(MetaEntity::Tag)
                .collect(),
            MetaKind::Topic => select(&self.topics, address, |t| hit(&t.name, &t.other_names))
                .into_iter()
                .map(MetaEntity::Topic)
                .collect(),
            MetaKind::Author if address.is_empty() => self
                .authors
                .iter()
                .filter(|a| hit(&a.name, &a.other_names))
                .cloned()
                .map(MetaEntity::Author)
                .collect(),
            MetaKind::Author => Vec::new(),
            MetaKind::SourceTag => self.sources(address, |s| hit(&s.name, &s.other_names)),
        }
    }
}

impl MetadataLookup for MetadataSnapshot {
    fn resolve_by_name(&self, kind: MetaKind, parts: &[NamePart]) -> Vec<MetaEntity> {
        let Some((last, address)) = parts.split_last() else {
            return Vec::new();
        };
        let target = Matcher::new(last);
        let address: Vec<Matcher> = address.iter().map(Matcher::new).collect();
        self.select(kind, &address, |name, other_names| target.matches(name, other_names))
    }

    fn resolve_by_prefix(&self, kind: MetaKind, address: &[NamePart], prefix: &str) -> Vec<MetaEntity> {
        let needle = prefix.to_lowercase();
        let address: Vec<Matcher> = address.iter().map(Matcher::new).collect();
        self.select(kind, &address, |name, other_names| {
            contains_ignore_case(name, &needle)
                || other_names.iter().any(|n| contains_ignore_case(n, &needle))
        })
    }

    fn resolve_by_id(&self, kind: MetaKind, id: u64) -> Option<MetaEntity> {
        match kind {
            MetaKind::Tag => self
                .tags
                .iter()
                .find(|t| t.id == id)
                .map(|t| MetaEntity::Tag(addressed(&self.tags, t))),
            MetaKind::Topic => self
                .topics
                .iter()
                .find(|t| t.id == id)
                .map(|t| MetaEntity::Topic(addressed(&self.topics, t))),
            MetaKind::Author => self
                .authors
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .map(MetaEntity::Author),
            MetaKind::SourceTag => self
                .source_tags
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .map(MetaEntity::SourceTag),
        }
    }

    fn children(&self, kind: MetaKind, parent: u64) -> Vec<MetaEntity> {
        match kind {
            MetaKind::Tag => children(&self.tags, parent).into_iter().map(MetaEntity::Tag).collect(),
            MetaKind::Topic => children(&self.topics, parent)
                .into_iter()
                .map(MetaEntity::Topic)
                .collect(),
            MetaKind::Author | MetaKind::SourceTag => Vec::new(),
        }
    }
}
