//! Tag relations inside groups.
//!
//! | written           | selects                                         |
//! |-------------------|-------------------------------------------------|
//! | `group:m`         | members of `group` named `m`                    |
//! | `group:{m, n}`    | members named `m` or `n`                        |
//! | `seq:a..b`        | members of a sequence group from `a` to `b`     |
//! | `seq>a`, `seq<=b` | the open end of a sequence from or up to a member |
//! | `m~n`             | the sequence members between `m` and `n`        |
//! | `m~+`, `m~-`      | `m` and every member after or before it         |
//!
//! Member order is the order [`MetadataLookup::children`] returns.

use crate::ast::{Direction, Family, Predicate, Sfp, StrPath, Value};
use crate::composition::TagFlags;
use crate::error::{SemanticError, ValueShape};
use crate::lookup::{MetaEntity, MetaKind, MetadataLookup};
use crate::options::RangeBounds;
use crate::range::TextRange;

use super::analyzer::name_parts;

type Scoped<T> = Result<T, SemanticError>;

const ITEM: &str = "tag";

/// One end of an ordinal range: a member and whether it is included.
type End<'a> = Option<(&'a StrPath, bool)>;

fn flags(entity: &MetaEntity) -> TagFlags {
    match entity {
        MetaEntity::Tag(tag) => tag.flags,
        _ => TagFlags::empty(),
    }
}

fn parent(entity: &MetaEntity) -> Option<u64> {
    match entity {
        MetaEntity::Tag(tag) => tag.parent,
        _ => None,
    }
}

fn shape(predicate: &Predicate) -> ValueShape {
    match predicate {
        Predicate::Values(values) if values.len() > 1 => ValueShape::List,
        Predicate::Values(_) => ValueShape::Value,
        Predicate::Collection(_) => ValueShape::Collection,
        Predicate::Range(_) => ValueShape::Range,
    }
}

/// The one member name a relation compares against.
fn single(values: &[Value]) -> Scoped<&StrPath> {
    let [value] = values else {
        return Err(SemanticError::UnsupportedElementValueShape {
            item: ITEM.to_string(),
            shape: ValueShape::List,
            range: values
                .first()
                .map(|v| v.range)
                .unwrap_or(TextRange::point(0)),
        });
    };
    if !value.prefix.is_empty() {
        return Err(SemanticError::ValuePrefixNotAllowed { range: value.range });
    }
    if value.path.parts.len() > 1 {
        return Err(SemanticError::ValueCannotBeAddress {
            range: value.path.range(),
        });
    }
    Ok(&value.path)
}

pub(super) struct Sequences<'a> {
    pub lookup: &'a dyn MetadataLookup,
    pub range_bounds: RangeBounds,
}

impl Sequences<'_> {
    /// Tags selected by a subject and its relation. An empty selection
    /// is an unresolved name.
    pub fn members(&self, sfp: &Sfp) -> Scoped<Vec<MetaEntity>> {
        let found = self.select(sfp)?;
        tracing::trace!(
            subject = %sfp.subject.joined(),
            relation = sfp.relation_symbol().unwrap_or(""),
            found = found.len(),
            "tag relation resolved"
        );
        if found.is_empty() {
            return Err(SemanticError::Unresolved {
                kind: ITEM,
                name: sfp.subject.joined(),
                range: sfp.range,
            });
        }
        Ok(found)
    }

    fn select(&self, sfp: &Sfp) -> Scoped<Vec<MetaEntity>> {
        let subject = &sfp.subject;
        if let Some(unary) = sfp.unary {
            let Some((members, at)) = self.sequence_member(subject) else {
                return Ok(Vec::new());
            };
            return Ok(match unary.direction {
                Direction::Ascending => members.into_iter().skip(at).collect(),
                Direction::Descending => members.into_iter().take(at + 1).collect(),
            });
        }
        let Some(relation) = &sfp.relation else {
            return Ok(self.tags(subject));
        };
        match (relation.family, &relation.predicate) {
            (Family::Equal, Predicate::Values(values)) => {
                Ok(self.group_members(subject, &[single(values)?]))
            }
            (Family::Equal, Predicate::Collection(paths)) => {
                Ok(self.group_members(subject, &paths.iter().collect::<Vec<_>>()))
            }
            (Family::Equal, Predicate::Range(literal)) => {
                let (include_begin, include_end) = literal
                    .bounds
                    .unwrap_or((self.range_bounds.include_begin, self.range_bounds.include_end));
                self.ordinal_range(
                    subject,
                    Some((&literal.begin, include_begin)),
                    Some((&literal.end, include_end)),
                )
            }
            (family, Predicate::Values(values)) if family.is_comparison() => {
                let member = single(values)?;
                let (begin, end) = match family {
                    Family::Gt => (Some((member, false)), None),
                    Family::Gte => (Some((member, true)), None),
                    Family::Lt => (None, Some((member, false))),
                    _ => (None, Some((member, true))),
                };
                self.ordinal_range(subject, begin, end)
            }
            (Family::Match, Predicate::Values(values)) => self.between(subject, single(values)?),
            (family, predicate) => Err(SemanticError::UnsupportedElementValueShapeOfRelation {
                item: ITEM.to_string(),
                shape: shape(predicate),
                relation: family.as_str().to_string(),
                range: relation.range,
            }),
        }
    }

    fn tags(&self, path: &StrPath) -> Vec<MetaEntity> {
        self.lookup.resolve_by_name(MetaKind::Tag, &name_parts(path))
    }

    fn ids(&self, path: &StrPath) -> Vec<u64> {
        self.tags(path).iter().map(MetaEntity::id).collect()
    }

    /// Children of every group `subject` names whose own name matches
    /// one of `names`.
    fn group_members(&self, subject: &StrPath, names: &[&StrPath]) -> Vec<MetaEntity> {
        let wanted: Vec<u64> = names.iter().flat_map(|n| self.ids(n)).collect();
        let mut out: Vec<MetaEntity> = Vec::new();
        for group in self.tags(subject).iter().filter(|t| flags(t).is_group()) {
            for child in self.lookup.children(MetaKind::Tag, group.id()) {
                if wanted.contains(&child.id()) && !out.iter().any(|o| o.id() == child.id()) {
                    out.push(child);
                }
            }
        }
        out
    }

    /// Position of the first member matching `name`.
    fn position(&self, members: &[MetaEntity], name: &StrPath) -> Scoped<usize> {
        let ids = self.ids(name);
        members
            .iter()
            .position(|m| ids.contains(&m.id()))
            .ok_or_else(|| SemanticError::Unresolved {
                kind: ITEM,
                name: name.joined(),
                range: name.range(),
            })
    }

    fn ordinal_range(
        &self,
        subject: &StrPath,
        begin: End<'_>,
        end: End<'_>,
    ) -> Scoped<Vec<MetaEntity>> {
        let mut out = Vec::new();
        for group in self.tags(subject).iter().filter(|t| flags(t).is_sequence_group()) {
            let members = self.lookup.children(MetaKind::Tag, group.id());
            let from = match begin {
                Some((name, inclusive)) => {
                    self.position(&members, name)? + usize::from(!inclusive)
                }
                None => 0,
            };
            let to = match end {
                Some((name, inclusive)) => self.position(&members, name)? + usize::from(inclusive),
                None => members.len(),
            };
            if to > from {
                out.extend(members.into_iter().take(to).skip(from));
            }
        }
        Ok(out)
    }

    /// The members of the first sequence group holding a tag `subject`
    /// names, and that tag's position among them.
    fn sequence_member(&self, subject: &StrPath) -> Option<(Vec<MetaEntity>, usize)> {
        self.tags(subject).into_iter().find_map(|tag| {
            let group = self.lookup.resolve_by_id(MetaKind::Tag, parent(&tag)?)?;
            if !flags(&group).is_sequence_group() {
                return None;
            }
            let members = self.lookup.children(MetaKind::Tag, group.id());
            let at = members.iter().position(|m| m.id() == tag.id())?;
            Some((members, at))
        })
    }

    fn between(&self, subject: &StrPath, other: &StrPath) -> Scoped<Vec<MetaEntity>> {
        let Some((members, at)) = self.sequence_member(subject) else {
            return Ok(Vec::new());
        };
        let other_at = self.position(&members, other)?;
        let (from, to) = if other_at > at { (at, other_at) } else { (other_at, at) };
        Ok(members.into_iter().take(to + 1).skip(from).collect())
    }
}
