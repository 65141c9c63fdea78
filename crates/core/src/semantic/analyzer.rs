//! Parse tree to semantic tree.
//!
//! Every sequence item is its own scope: it is lowered, classified and
//! resolved on its own, and the first error raised inside it is recorded
//! before analysis moves on to the next item. A query with two bad items
//! reports two errors.

use crate::alias::{all_names, find};
use crate::ast::{
    ElementPrefix, Family, Predicate, RangeLiteral, SequenceItem, Sfp, StrPath, Value,
};
use crate::diagnostic::{AnalysisResult, ErrorCollector};
use crate::error::{Diagnose, SemanticError, ValueShape};
use crate::grammar::parser::ParseNode;
use crate::lexer::StrKind;
use crate::lookup::{MetaEntity, MetaKind, MetadataLookup, NamePart};
use crate::options::CompilerOptions;
use crate::range::TextRange;

use super::lower;
use super::schema::{FieldKey, FieldType, ELEMENT_FIELDS, FIELD_ALIASES, ORDER_ALIASES, SORT_FIELD};
use super::sequence::Sequences;
use super::tree::{
    Bound, ElementClause, ElementKind, ElementValue, Filter, FilterClause, FilterValue, SemanticTree,
    SortItem,
};
use super::value::{self, Complex, PatternNumber};

type Scoped<T> = Result<T, SemanticError>;

/// Kinds a bare name is tried as, in order.
const BARE_KINDS: [MetaKind; 3] = [MetaKind::Tag, MetaKind::Topic, MetaKind::Author];

/// Resolve and type-check a parse tree.
pub fn analyze(
    root: &ParseNode,
    lookup: &dyn MetadataLookup,
    options: &CompilerOptions,
) -> AnalysisResult<SemanticTree, SemanticError> {
    let analyzer = Analyzer { lookup, options };
    let mut collector = ErrorCollector::new();
    let nodes = match lower::sequence_items(root) {
        Ok(nodes) => nodes,
        Err(e) => {
            collector.error(e);
            return collector.finish(None);
        }
    };
    let mut tree = SemanticTree::default();
    for node in nodes {
        let outcome = lower::sequence_item(node)
            .and_then(|item| analyzer.item(&item, &mut tree, &mut collector));
        if let Err(e) = outcome {
            tracing::warn!(code = e.code(), error = %e, "semantic scope rejected");
            collector.error(e);
        }
    }
    tracing::debug!(
        sorts = tree.sorts.len(),
        elements = tree.elements.len(),
        filters = tree.filters.len(),
        errors = collector.errors().len(),
        "semantic analysis finished"
    );
    collector.finish(Some(tree))
}

/// What one SFP's subject turned out to be.
enum Subject<'a> {
    Sort,
    Field(FieldKey),
    ElementField(MetaKind),
    Text { value: &'a str, exact: bool },
    Name(&'a StrPath),
    /// A tag with a group or sequence relation.
    Sequence,
}

impl Subject<'_> {
    fn is_field(&self) -> bool {
        matches!(self, Subject::Field(_) | Subject::ElementField(_))
    }
}

/// How many entities a name may resolve to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    One,
    Many,
}

fn default_cardinality(kind: MetaKind) -> Cardinality {
    match kind {
        MetaKind::Author => Cardinality::One,
        MetaKind::Tag | MetaKind::Topic | MetaKind::SourceTag => Cardinality::Many,
    }
}

pub(super) fn name_parts(path: &StrPath) -> Vec<NamePart> {
    path.parts
        .iter()
        .map(|p| NamePart {
            name: p.value.clone(),
            exact: p.kind.is_exact(),
            pattern: p.kind == StrKind::Restricted && value::is_pattern(&p.value),
        })
        .collect()
}

fn cardinality(kind: MetaKind, parts: &[NamePart]) -> Cardinality {
    match parts.last() {
        Some(last) if last.pattern => Cardinality::Many,
        Some(last) if last.exact => Cardinality::One,
        _ => default_cardinality(kind),
    }
}

fn push_unique(union: &mut Vec<ElementValue>, entities: Vec<MetaEntity>) {
    for entity in entities {
        let seen = union.iter().any(|v| match v {
            ElementValue::Meta(e) => e.kind() == entity.kind() && e.id() == entity.id(),
            ElementValue::Text { .. } => false,
        });
        if !seen {
            union.push(ElementValue::Meta(entity));
        }
    }
}

struct Analyzer<'a> {
    lookup: &'a dyn MetadataLookup,
    options: &'a CompilerOptions,
}

impl Analyzer<'_> {
    fn item(
        &self,
        item: &SequenceItem,
        tree: &mut SemanticTree,
        collector: &mut ErrorCollector<SemanticError>,
    ) -> Scoped<()> {
        if let Some(prefix) = item.element.prefix {
            let clause = self.prefixed(item, prefix)?;
            tree.elements.push(clause);
            return Ok(());
        }

        let subjects = item
            .element
            .items
            .iter()
            .map(|sfp| self.classify(sfp, item.source).map(|s| (s, sfp)))
            .collect::<Scoped<Vec<_>>>()?;

        if subjects.iter().any(|(s, _)| matches!(s, Subject::Sort)) {
            let [(Subject::Sort, sfp)] = subjects.as_slice() else {
                return Err(SemanticError::SortIsIndependent { range: item.range });
            };
            if item.exclude || item.source {
                return Err(SemanticError::SortIsIndependent { range: item.range });
            }
            let sorts = self.sort(sfp, &tree.sorts, collector)?;
            tree.sorts.extend(sorts);
            return Ok(());
        }

        let fields = subjects.iter().filter(|(s, _)| s.is_field()).count();
        if fields > 0 && fields < subjects.len() {
            return Err(SemanticError::FieldsAndElementsMixed { range: item.range });
        }
        if fields > 0 {
            return self.fields(item, &subjects, tree);
        }

        let texts = subjects
            .iter()
            .filter(|(s, _)| matches!(s, Subject::Text { .. }))
            .count();
        if texts > 0 && texts < subjects.len() {
            return Err(SemanticError::FieldsAndElementsMixed { range: item.range });
        }
        if texts > 0 {
            if item.source {
                return Err(SemanticError::InvalidPrefixStructure {
                    prefix: "^".into(),
                    range: item.range,
                });
            }
            let union = subjects
                .iter()
                .filter_map(|(s, _)| match s {
                    Subject::Text { value, exact } => Some(ElementValue::Text {
                        value: value.to_string(),
                        exact: *exact,
                    }),
                    _ => None,
                })
                .collect();
            tree.elements.push(ElementClause {
                kind: ElementKind::Text,
                exclude: item.exclude,
                union,
                range: item.range,
            });
            return Ok(());
        }

        if subjects.iter().any(|(s, _)| matches!(s, Subject::Sequence)) {
            let mut union = Vec::new();
            for (subject, sfp) in &subjects {
                let found = match subject {
                    Subject::Sequence => self.sequences().members(sfp)?,
                    _ => self.resolve(MetaKind::Tag, &sfp.subject)?,
                };
                push_unique(&mut union, found);
            }
            tree.elements.push(ElementClause {
                kind: ElementKind::Tag,
                exclude: item.exclude,
                union,
                range: item.range,
            });
            return Ok(());
        }

        let paths: Vec<&StrPath> = subjects
            .iter()
            .filter_map(|(s, _)| match s {
                Subject::Name(path) => Some(*path),
                _ => None,
            })
            .collect();
        let (kind, union) = if item.source {
            (MetaKind::SourceTag, self.resolve_all(MetaKind::SourceTag, &paths)?)
        } else {
            self.resolve_bare(&paths)?
        };
        tree.elements.push(ElementClause {
            kind: kind.into(),
            exclude: item.exclude,
            union,
            range: item.range,
        });
        Ok(())
    }

    fn classify<'s>(&self, sfp: &'s Sfp, source: bool) -> Scoped<Subject<'s>> {
        let word = sfp
            .subject
            .single()
            .filter(|p| p.kind == StrKind::Restricted)
            .map(|p| p.value.as_str());
        if let Some(word) = word {
            if !source && SORT_FIELD.matches(word, false) {
                return Ok(Subject::Sort);
            }
            if sfp.relation.is_some() {
                if let Some(kind) = find(ELEMENT_FIELDS, word, source) {
                    return Ok(Subject::ElementField(kind));
                }
            }
            if let Some(key) = find(FIELD_ALIASES, word, source) {
                return Ok(Subject::Field(key));
            }
            if sfp.relation.is_some() {
                let range = sfp.subject.range();
                let known_otherwise = find(FIELD_ALIASES, word, !source).is_some()
                    || find(ELEMENT_FIELDS, word, !source).is_some();
                return Err(match (known_otherwise, source) {
                    (true, true) => SemanticError::CannotHaveSourceFlag {
                        name: word.to_string(),
                        range,
                    },
                    (true, false) => SemanticError::MustHaveSourceFlag {
                        name: word.to_string(),
                        range,
                    },
                    (false, _) => SemanticError::UnknownField {
                        name: word.to_string(),
                        range,
                    },
                });
            }
        }
        if sfp.has_relation() {
            if !source && sfp.subject.parts.iter().all(|p| !p.kind.is_text()) {
                return Ok(Subject::Sequence);
            }
            return Err(SemanticError::ElementValueNotAllowed {
                name: sfp.subject.joined(),
                range: sfp.range,
            });
        }
        match sfp.subject.single() {
            Some(part) if part.kind.is_text() => Ok(Subject::Text {
                value: &part.value,
                exact: part.kind == StrKind::DoubleQuotes,
            }),
            _ => Ok(Subject::Name(&sfp.subject)),
        }
    }

    // ── Elements ─────────────────────────────────────────────────────

    fn prefixed(&self, item: &SequenceItem, prefix: ElementPrefix) -> Scoped<ElementClause> {
        if item.source {
            return Err(SemanticError::CannotHaveSourceFlag {
                name: prefix.as_str().to_string(),
                range: item.range,
            });
        }
        let kind = match prefix {
            ElementPrefix::At => MetaKind::Author,
            ElementPrefix::Hash => MetaKind::Topic,
            ElementPrefix::Dollar => MetaKind::Tag,
        };
        let mut union = Vec::new();
        for sfp in &item.element.items {
            if sfp.has_relation() && kind != MetaKind::Tag {
                return Err(SemanticError::UnsupportedElementRelation {
                    item: kind.as_str().to_string(),
                    relation: sfp.relation_symbol().unwrap_or_default().to_string(),
                    range: sfp.relation_range().unwrap_or(sfp.range),
                });
            }
            if sfp.subject.parts.iter().any(|p| p.kind.is_text()) {
                return Err(SemanticError::ElementPrefixNotAllowed {
                    name: sfp.subject.joined(),
                    range: sfp.range,
                });
            }
            let found = if sfp.has_relation() {
                self.sequences().members(sfp)?
            } else {
                self.resolve(kind, &sfp.subject)?
            };
            push_unique(&mut union, found);
        }
        Ok(ElementClause {
            kind: kind.into(),
            exclude: item.exclude,
            union,
            range: item.range,
        })
    }

    fn sequences(&self) -> Sequences<'_> {
        Sequences {
            lookup: self.lookup,
            range_bounds: self.options.range_bounds,
        }
    }

    fn resolve(&self, kind: MetaKind, path: &StrPath) -> Scoped<Vec<MetaEntity>> {
        let max_parts = match kind {
            MetaKind::Author => 1,
            MetaKind::SourceTag => 2,
            MetaKind::Tag | MetaKind::Topic => usize::MAX,
        };
        if path.parts.len() > max_parts {
            return Err(SemanticError::ValueCannotBeAddress {
                range: path.range(),
            });
        }
        let parts = name_parts(path);
        let found = self.lookup.resolve_by_name(kind, &parts);
        tracing::trace!(kind = %kind, name = %path.joined(), found = found.len(), "name resolved");
        if found.is_empty() {
            return Err(SemanticError::Unresolved {
                kind: kind.as_str(),
                name: path.joined(),
                range: path.range(),
            });
        }
        if cardinality(kind, &parts) == Cardinality::One && found.len() > 1 {
            return Err(SemanticError::Ambiguous {
                kind: kind.as_str(),
                name: path.joined(),
                candidates: found.len(),
                range: path.range(),
            });
        }
        Ok(found)
    }

    fn resolve_all(&self, kind: MetaKind, paths: &[&StrPath]) -> Scoped<Vec<ElementValue>> {
        let mut union = Vec::new();
        for path in paths {
            push_unique(&mut union, self.resolve(kind, path)?);
        }
        Ok(union)
    }

    /// Unprefixed names: the first kind under which every name resolves.
    fn resolve_bare(&self, paths: &[&StrPath]) -> Scoped<(MetaKind, Vec<ElementValue>)> {
        let mut first_error = None;
        for kind in BARE_KINDS {
            match self.resolve_all(kind, paths) {
                Ok(union) => return Ok((kind, union)),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        for path in paths {
            let parts = name_parts(path);
            let nowhere = BARE_KINDS
                .iter()
                .all(|kind| self.lookup.resolve_by_name(*kind, &parts).is_empty());
            if nowhere {
                return Err(SemanticError::Unresolved {
                    kind: "tag, topic or author",
                    name: path.joined(),
                    range: path.range(),
                });
            }
        }
        Err(first_error.unwrap_or(SemanticError::UnsupportedStructure {
            production: "ELEMENT_ITEM -> (empty)".into(),
            range: TextRange::point(0),
        }))
    }

    // ── Fields ───────────────────────────────────────────────────────

    fn fields(
        &self,
        item: &SequenceItem,
        subjects: &[(Subject<'_>, &Sfp)],
        tree: &mut SemanticTree,
    ) -> Scoped<()> {
        let element_kinds: Vec<MetaKind> = subjects
            .iter()
            .filter_map(|(s, _)| match s {
                Subject::ElementField(kind) => Some(*kind),
                _ => None,
            })
            .collect();

        if element_kinds.is_empty() {
            let mut union = Vec::new();
            for (subject, sfp) in subjects {
                if let Subject::Field(key) = subject {
                    union.extend(self.filter(*key, sfp)?);
                }
            }
            if !union.is_empty() {
                tree.filters.push(FilterClause {
                    exclude: item.exclude,
                    union,
                    range: item.range,
                });
            }
            return Ok(());
        }

        if element_kinds.len() < subjects.len() {
            return Err(SemanticError::FieldsAndElementsMixed { range: item.range });
        }
        let kind = element_kinds[0];
        if element_kinds.iter().any(|k| *k != kind) {
            return Err(SemanticError::InvalidPrefixStructure {
                prefix: kind.as_str().to_string(),
                range: item.range,
            });
        }
        let mut paths = Vec::new();
        for (_, sfp) in subjects {
            paths.extend(self.element_field_names(kind, sfp)?);
        }
        tree.elements.push(ElementClause {
            kind: kind.into(),
            exclude: item.exclude,
            union: self.resolve_all(kind, &paths)?,
            range: item.range,
        });
        Ok(())
    }

    fn element_field_names<'s>(&self, kind: MetaKind, sfp: &'s Sfp) -> Scoped<Vec<&'s StrPath>> {
        let Some(relation) = &sfp.relation else {
            return Err(SemanticError::FilterValueRequired {
                field: kind.as_str().to_string(),
                range: sfp.range,
            });
        };
        if relation.family != Family::Equal {
            return Err(SemanticError::UnsupportedRelation {
                field: kind.as_str().to_string(),
                relation: relation.family.as_str().to_string(),
                range: relation.range,
            });
        }
        match &relation.predicate {
            Predicate::Values(values) => values
                .iter()
                .map(|v| {
                    no_prefix(v)?;
                    Ok(&v.path)
                })
                .collect(),
            Predicate::Collection(paths) => Ok(paths.iter().collect()),
            Predicate::Range(_) => Err(SemanticError::UnsupportedValueShape {
                field: kind.as_str().to_string(),
                shape: ValueShape::Range,
                range: relation.range,
            }),
        }
    }

    fn filter(&self, key: FieldKey, sfp: &Sfp) -> Scoped<Vec<Filter>> {
        let ty = key.field_type();
        let field = key.display_name();
        if let Some(unary) = sfp.unary {
            return Err(SemanticError::UnsupportedRelation {
                field,
                relation: unary.as_str().to_string(),
                range: unary.range,
            });
        }
        let Some(relation) = &sfp.relation else {
            return match ty {
                FieldType::Flag | FieldType::Composition => Ok(vec![Filter::Flag { field: key }]),
                _ => Err(SemanticError::FilterValueRequired {
                    field,
                    range: sfp.range,
                }),
            };
        };
        if ty == FieldType::Flag {
            return Err(SemanticError::FilterValueNotRequired {
                field,
                range: relation.range,
            });
        }
        let shape = match &relation.predicate {
            Predicate::Values(values) if values.len() > 1 => ValueShape::List,
            Predicate::Values(_) => ValueShape::Value,
            Predicate::Collection(_) => ValueShape::Collection,
            Predicate::Range(_) => ValueShape::Range,
        };
        let unsupported_relation = || SemanticError::UnsupportedRelation {
            field: field.clone(),
            relation: relation.family.as_str().to_string(),
            range: relation.range,
        };
        let unsupported_shape = || SemanticError::UnsupportedValueShape {
            field: field.clone(),
            shape,
            range: relation.range,
        };

        match (relation.family, &relation.predicate) {
            (_, Predicate::Values(values)) if values.len() > 1 => Err(unsupported_shape()),
            (Family::Equal, Predicate::Values(values)) => {
                let path = single_value(&field, values)?;
                self.equal(key, ty, &[path])
            }
            (Family::Equal, Predicate::Collection(paths)) => {
                let paths: Vec<&StrPath> = paths.iter().collect();
                self.equal(key, ty, &paths)
            }
            (Family::Equal, Predicate::Range(literal)) => {
                if !ty.is_comparable() {
                    return Err(unsupported_shape());
                }
                Ok(vec![self.range(key, ty, literal)?])
            }
            (Family::Match, predicate) => {
                if !ty.is_matchable() {
                    return Err(unsupported_relation());
                }
                let paths: Vec<&StrPath> = match predicate {
                    Predicate::Values(values) => vec![single_value(&field, values)?],
                    Predicate::Collection(paths) => paths.iter().collect(),
                    Predicate::Range(_) => {
                        return Err(SemanticError::UnsupportedValueShapeOfRelation {
                            field: field.clone(),
                            shape,
                            relation: relation.family.as_str().to_string(),
                            range: relation.range,
                        })
                    }
                };
                let patterns = paths
                    .into_iter()
                    .map(scalar_text)
                    .collect::<Scoped<Vec<_>>>()?;
                if patterns.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![Filter::Match {
                    field: key,
                    patterns,
                }])
            }
            (family, Predicate::Values(values)) => {
                if !ty.is_comparable() {
                    return Err(unsupported_relation());
                }
                let value = self.comparable(ty, single_value(&field, values)?)?;
                let bound = |value, inclusive| Some(Bound { value, inclusive });
                // A span compares by the end that keeps all of it on the
                // requested side.
                let (begin, end) = match (family, value) {
                    (Family::Gt, Complex::One(v)) => (bound(v, false), None),
                    (Family::Gte, Complex::One(v)) => (bound(v, true), None),
                    (Family::Lt, Complex::One(v)) => (None, bound(v, false)),
                    (_, Complex::One(v)) => (None, bound(v, true)),
                    (Family::Gt, Complex::Span { end, .. }) => (bound(end, true), None),
                    (Family::Gte, Complex::Span { begin, .. }) => (bound(begin, true), None),
                    (Family::Lt, Complex::Span { begin, .. }) => (None, bound(begin, false)),
                    (_, Complex::Span { end, .. }) => (None, bound(end, false)),
                };
                Ok(vec![Filter::Range {
                    field: key,
                    begin,
                    end,
                }])
            }
            (family, _) => {
                if !ty.is_comparable() {
                    return Err(unsupported_relation());
                }
                Err(SemanticError::UnsupportedValueShapeOfRelation {
                    field: field.clone(),
                    shape,
                    relation: family.as_str().to_string(),
                    range: relation.range,
                })
            }
        }
    }

    /// `field:value` or `field:{a, b}`. An empty collection matches
    /// nothing extra and drops the filter.
    fn equal(&self, key: FieldKey, ty: FieldType, paths: &[&StrPath]) -> Scoped<Vec<Filter>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        match ty {
            FieldType::Number
            | FieldType::PatternNumber
            | FieldType::Size
            | FieldType::Date
            | FieldType::DateTime => {
                let mut values = Vec::new();
                let mut patterns = Vec::new();
                let mut spans = Vec::new();
                for path in paths {
                    match self.complex(ty, path)? {
                        Some(Complex::One(v)) => values.push(v),
                        Some(Complex::Span { begin, end }) => spans.push(Filter::Range {
                            field: key,
                            begin: Some(Bound {
                                value: begin,
                                inclusive: true,
                            }),
                            end: Some(Bound {
                                value: end,
                                inclusive: false,
                            }),
                        }),
                        None => patterns.push(scalar_text(path)?),
                    }
                }
                let mut filters = Vec::new();
                if !values.is_empty() {
                    filters.push(Filter::Equal { field: key, values });
                }
                if !patterns.is_empty() {
                    filters.push(Filter::Match {
                        field: key,
                        patterns,
                    });
                }
                filters.extend(spans);
                Ok(filters)
            }
            FieldType::String => {
                let values = paths
                    .iter()
                    .map(|p| scalar_text(p).map(FilterValue::Text))
                    .collect::<Scoped<Vec<_>>>()?;
                Ok(vec![Filter::Equal { field: key, values }])
            }
            FieldType::PatternString => {
                let mut values = Vec::new();
                let mut patterns = Vec::new();
                for path in paths {
                    let text = scalar_text(path)?;
                    match path.single().map(|p| p.kind) {
                        Some(StrKind::Backticks) => values.push(FilterValue::Text(text)),
                        _ => patterns.push(text),
                    }
                }
                let mut filters = Vec::new();
                if !values.is_empty() {
                    filters.push(Filter::Equal { field: key, values });
                }
                if !patterns.is_empty() {
                    filters.push(Filter::Match {
                        field: key,
                        patterns,
                    });
                }
                Ok(filters)
            }
            FieldType::Composition => {
                let mut flags = Vec::with_capacity(paths.len());
                for path in paths {
                    let text = scalar_text(path)?;
                    flags.push(value::tagme(&text, path.range())?);
                }
                Ok(vec![Filter::Composition {
                    field: key,
                    value: crate::composition::union_all(flags),
                }])
            }
            FieldType::Flag => Err(SemanticError::FilterValueNotRequired {
                field: key.display_name(),
                range: paths[0].range(),
            }),
        }
    }

    fn range(&self, key: FieldKey, ty: FieldType, literal: &RangeLiteral) -> Scoped<Filter> {
        let defaults = self.options.range_bounds;
        let (include_begin, include_end) = literal
            .bounds
            .unwrap_or((defaults.include_begin, defaults.include_end));
        // A span at either end widens to its outer edge when that end is
        // inclusive and narrows to its inner edge otherwise.
        let begin = match self.comparable(ty, &literal.begin)? {
            Complex::One(value) => Bound {
                value,
                inclusive: include_begin,
            },
            Complex::Span { begin, end } => Bound {
                value: if include_begin { begin } else { end },
                inclusive: true,
            },
        };
        let end = match self.comparable(ty, &literal.end)? {
            Complex::One(value) => Bound {
                value,
                inclusive: include_end,
            },
            Complex::Span { begin, end } => Bound {
                value: if include_end { end } else { begin },
                inclusive: false,
            },
        };
        Ok(Filter::Range {
            field: key,
            begin: Some(begin),
            end: Some(end),
        })
    }

    fn current_year(&self) -> i32 {
        self.options
            .current_year
            .unwrap_or_else(|| time::OffsetDateTime::now_utc().year())
    }

    /// Cast for `:` equality. Sizes and dates may be dotted (`1.5mb`,
    /// `2024.01.02`); numbers may not. `None` is a pattern-number
    /// pattern, matched as text.
    fn complex(&self, ty: FieldType, path: &StrPath) -> Scoped<Option<Complex<FilterValue>>> {
        let range = path.range();
        let one = |value| Ok(Some(Complex::One(value)));
        match ty {
            FieldType::Size => one(FilterValue::Size(value::size(&path.joined(), range)?)),
            FieldType::Date | FieldType::DateTime => {
                let date = value::date(&path.joined(), self.current_year(), range)?;
                Ok(Some(match date {
                    Complex::One(d) => Complex::One(FilterValue::Date(d)),
                    Complex::Span { begin, end } => Complex::Span {
                        begin: FilterValue::Date(begin),
                        end: FilterValue::Date(end),
                    },
                }))
            }
            FieldType::PatternNumber => match value::pattern_number(&scalar_text(path)?, range)? {
                PatternNumber::Number(Complex::One(n)) => one(FilterValue::Number(n)),
                PatternNumber::Number(Complex::Span { begin, end }) => Ok(Some(Complex::Span {
                    begin: FilterValue::Number(begin),
                    end: FilterValue::Number(end),
                })),
                PatternNumber::Pattern(_) => Ok(None),
            },
            _ => one(FilterValue::Number(value::number(&scalar_text(path)?, range)?)),
        }
    }

    /// Cast for comparisons and ranges, where patterns make no sense.
    fn comparable(&self, ty: FieldType, path: &StrPath) -> Scoped<Complex<FilterValue>> {
        let pattern = || SemanticError::PatternInComparison {
            range: path.range(),
        };
        if value::is_pattern(&path.joined()) {
            return Err(pattern());
        }
        self.complex(ty, path)?.ok_or_else(pattern)
    }

    // ── Sort ─────────────────────────────────────────────────────────

    fn sort(
        &self,
        sfp: &Sfp,
        existing: &[SortItem],
        collector: &mut ErrorCollector<SemanticError>,
    ) -> Scoped<Vec<SortItem>> {
        let Some(relation) = &sfp.relation else {
            return Err(SemanticError::SortValueRequired { range: sfp.range });
        };
        let Predicate::Values(values) = &relation.predicate else {
            return Err(SemanticError::SortValueMustBeList {
                range: relation.range,
            });
        };
        if relation.family != Family::Equal {
            return Err(SemanticError::SortValueMustBeList {
                range: relation.range,
            });
        }
        let mut sorts: Vec<SortItem> = Vec::with_capacity(values.len());
        for v in values {
            let written = if v.prefix.source {
                format!("^{}", v.path.joined())
            } else {
                v.path.joined()
            };
            let key = v
                .path
                .single()
                .filter(|p| !p.kind.is_text())
                .and_then(|p| find(ORDER_ALIASES, &p.value, v.prefix.source))
                .ok_or_else(|| SemanticError::InvalidSortItem {
                    item: written.clone(),
                    expected: all_names(ORDER_ALIASES),
                    range: v.range,
                })?;
            if existing.iter().chain(sorts.iter()).any(|s| s.key == key) {
                collector.warning(SemanticError::DuplicatedSortItem {
                    item: written,
                    range: v.range,
                });
                continue;
            }
            sorts.push(SortItem {
                key,
                direction: v.prefix.direction.unwrap_or_default(),
            });
        }
        Ok(sorts)
    }
}

// ── Values ───────────────────────────────────────────────────────────

fn no_prefix(v: &Value) -> Scoped<()> {
    if v.prefix.is_empty() {
        Ok(())
    } else {
        Err(SemanticError::ValuePrefixNotAllowed { range: v.range })
    }
}

fn single_value<'v>(field: &str, values: &'v [Value]) -> Scoped<&'v StrPath> {
    match values {
        [v] => {
            no_prefix(v)?;
            Ok(&v.path)
        }
        _ => Err(SemanticError::UnsupportedValueShape {
            field: field.to_string(),
            shape: ValueShape::List,
            range: values
                .first()
                .map(|v| v.range)
                .unwrap_or(TextRange::point(0)),
        }),
    }
}

/// A value that must be a single string, not a dotted path.
fn scalar_text(path: &StrPath) -> Scoped<String> {
    match path.single() {
        Some(part) => Ok(part.value.clone()),
        None => Err(SemanticError::ValueCannotBeAddress {
            range: path.range(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Direction;
    use crate::composition::Tagme;
    use crate::grammar::parser::SlrParser;
    use crate::grammar::Grammar;
    use crate::lexer::{self, LexicalOptions};
    use crate::lookup::MetadataSnapshot;
    use crate::semantic::schema::OrderKey;

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::from_json(
            r#"{
                "tags": [
                    { "id": 1, "name": "Animal", "flags": "ADDRESS" },
                    { "id": 2, "name": "cat", "other_names": ["neko"], "parent": 1 },
                    { "id": 3, "name": "Plant", "flags": "ADDRESS" },
                    { "id": 4, "name": "cat", "parent": 3 },
                    { "id": 40, "name": "season", "flags": "SEQUENCE_GROUP" },
                    { "id": 41, "name": "spring", "parent": 40 },
                    { "id": 42, "name": "summer", "parent": 40 },
                    { "id": 43, "name": "autumn", "parent": 40 },
                    { "id": 44, "name": "winter", "parent": 40 },
                    { "id": 45, "name": "color", "flags": "GROUP" },
                    { "id": 46, "name": "red", "parent": 45 },
                    { "id": 47, "name": "blue", "parent": 45 }
                ],
                "topics": [
                    { "id": 30, "name": "Touhou", "target": "COPYRIGHT" },
                    { "id": 31, "name": "Reimu", "parent": 30, "target": "CHARACTER" }
                ],
                "authors": [
                    { "id": 10, "name": "Mori", "target": "ARTIST" },
                    { "id": 11, "name": "Morikawa", "target": "ARTIST" }
                ],
                "source_tags": [
                    { "id": 20, "site": "pixiv", "name": "cat" },
                    { "id": 21, "site": "danbooru", "name": "cat" }
                ]
            }"#,
        )
        .unwrap()
    }

    fn run(text: &str) -> AnalysisResult<SemanticTree, SemanticError> {
        let grammar = Grammar::load().unwrap();
        let tokens = lexer::analyze(text, &LexicalOptions::default()).result.unwrap();
        let root = SlrParser::new(&grammar).parse(&tokens).result.unwrap();
        let options = CompilerOptions {
            current_year: Some(2021),
            ..CompilerOptions::default()
        };
        analyze(&root, &snapshot(), &options)
    }

    fn tree(text: &str) -> SemanticTree {
        let r = run(text);
        assert!(r.errors.is_empty(), "{text}: {:?}", r.errors);
        r.result.unwrap()
    }

    fn codes(text: &str) -> Vec<u16> {
        run(text).errors.iter().map(|e| e.code()).collect()
    }

    fn ids(clause: &ElementClause) -> Vec<u64> {
        clause
            .union
            .iter()
            .filter_map(|v| match v {
                ElementValue::Meta(e) => Some(e.id()),
                ElementValue::Text { .. } => None,
            })
            .collect()
    }

    #[test]
    fn prefixes_pick_the_kind() {
        let t = tree("$cat @mori #reimu");
        let kinds: Vec<_> = t.elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Tag, ElementKind::Author, ElementKind::Topic]);
        assert_eq!(ids(&t.elements[0]), vec![2, 4]);
        assert_eq!(ids(&t.elements[1]), vec![10]);
    }

    #[test]
    fn bare_names_take_the_first_resolving_kind() {
        let t = tree("cat reimu mori");
        assert_eq!(t.elements[0].kind, ElementKind::Tag);
        assert_eq!(t.elements[1].kind, ElementKind::Topic);
        assert_eq!(t.elements[2].kind, ElementKind::Author);
    }

    #[test]
    fn addresses_and_source_tags() {
        assert_eq!(ids(&tree("plant.cat").elements[0]), vec![4]);
        let t = tree("^pixiv.cat");
        assert_eq!(t.elements[0].kind, ElementKind::SourceTag);
        assert_eq!(ids(&t.elements[0]), vec![20]);
        assert_eq!(codes("@x.mori"), vec![3017]);
    }

    #[test]
    fn union_and_exclusion() {
        let t = tree("-tag:{cat, animal}");
        assert!(t.elements[0].exclude);
        assert_eq!(ids(&t.elements[0]), vec![2, 4, 1]);
        let t = tree("$cat|neko");
        assert_eq!(ids(&t.elements[0]), vec![2, 4]);
    }

    #[test]
    fn cardinality() {
        // Backticks force a single match; two tags are named `cat`.
        assert_eq!(codes("$`cat`"), vec![3027]);
        assert_eq!(codes("`Cat`"), vec![3026]);
        // Patterns may match several authors.
        assert_eq!(ids(&tree("@mori*").elements[0]), vec![10, 11]);
        assert!(tree("@mori").elements[0].union.len() == 1);
    }

    #[test]
    fn free_text() {
        let t = tree("'hello world' | \"exact\"");
        assert_eq!(t.elements[0].kind, ElementKind::Text);
        assert_eq!(
            t.elements[0].union,
            vec![
                ElementValue::Text {
                    value: "hello world".into(),
                    exact: false
                },
                ElementValue::Text {
                    value: "exact".into(),
                    exact: true
                },
            ]
        );
        assert_eq!(codes("'text'|cat"), vec![3022]);
        assert_eq!(codes("$'text'"), vec![3007]);
        assert_eq!(codes("^'text'"), vec![3006]);
    }

    #[test]
    fn independent_scopes_each_report() {
        assert_eq!(codes("topic:missing1 author:missing2"), vec![3026, 3026]);
        let r = run("missing score:5");
        assert_eq!(r.errors.len(), 1);
        assert!(r.result.is_none());
    }

    #[test]
    fn range_filters() {
        let t = tree("size:10..20");
        assert_eq!(
            t.filters[0].union,
            vec![Filter::Range {
                field: FieldKey::Filesize,
                begin: Some(Bound {
                    value: FilterValue::Size(10),
                    inclusive: true
                }),
                end: Some(Bound {
                    value: FilterValue::Size(20),
                    inclusive: true
                }),
            }]
        );
        let Filter::Range { begin, end, .. } = &tree("score:[1,5)").filters[0].union[0] else {
            panic!("expected a range");
        };
        assert!(begin.as_ref().unwrap().inclusive);
        assert!(!end.as_ref().unwrap().inclusive);
    }

    #[test]
    fn comparisons() {
        let t = tree("score>5 ct<=2024-01-31");
        assert_eq!(
            t.filters[0].union[0],
            Filter::Range {
                field: FieldKey::Score,
                begin: Some(Bound {
                    value: FilterValue::Number(5),
                    inclusive: false
                }),
                end: None,
            }
        );
        let Filter::Range { end: Some(end), .. } = &t.filters[1].union[0] else {
            panic!("expected an end bound");
        };
        assert!(end.inclusive);
        assert_eq!(end.value.to_string(), "2024-01-31");
        assert_eq!(codes("score>1*"), vec![3018]);
        assert_eq!(codes("ext>jpg"), vec![3005]);
        assert_eq!(codes("score>{1,2}"), vec![3004]);
    }

    #[test]
    fn pattern_fields() {
        let t = tree("id:12*|id:7");
        assert_eq!(
            t.filters[0].union,
            vec![
                Filter::Match {
                    field: FieldKey::Id,
                    patterns: vec!["12*".into()]
                },
                Filter::Equal {
                    field: FieldKey::Id,
                    values: vec![FilterValue::Number(7)]
                },
            ]
        );
        let t = tree("desc:sunset desc:`exact`");
        assert!(matches!(t.filters[0].union[0], Filter::Match { .. }));
        assert!(matches!(t.filters[1].union[0], Filter::Equal { .. }));
        assert_eq!(codes("ext~jp*"), vec![3005]);
        assert_eq!(codes("^site~pix*"), vec![3005]);
        assert!(matches!(tree("desc~*sun*").filters[0].union[0], Filter::Match { .. }));
    }

    fn bound(value: FilterValue, inclusive: bool) -> Option<Bound> {
        Some(Bound { value, inclusive })
    }

    #[test]
    fn trailing_question_marks_span_a_decade() {
        assert_eq!(
            tree("id:12??").filters[0].union,
            vec![Filter::Range {
                field: FieldKey::Id,
                begin: bound(FilterValue::Number(1200), true),
                end: bound(FilterValue::Number(1300), false),
            }]
        );
        let t = tree("id:{5, 1?, 1?3}");
        assert_eq!(
            t.filters[0].union,
            vec![
                Filter::Equal {
                    field: FieldKey::Id,
                    values: vec![FilterValue::Number(5)]
                },
                Filter::Match {
                    field: FieldKey::Id,
                    patterns: vec!["1?3".into()]
                },
                Filter::Range {
                    field: FieldKey::Id,
                    begin: bound(FilterValue::Number(10), true),
                    end: bound(FilterValue::Number(20), false),
                },
            ]
        );
        assert_eq!(codes("id>12??"), vec![3018]);
        assert_eq!(codes("id:1..2?"), vec![3018]);
        assert_eq!(codes("id:1x?"), vec![3019]);
    }

    fn date(text: &str) -> FilterValue {
        let (y, m, d) = (&text[0..4], &text[5..7], &text[8..10]);
        let month = time::Month::try_from(m.parse::<u8>().unwrap()).unwrap();
        FilterValue::Date(time::Date::from_calendar_date(y.parse().unwrap(), month, d.parse().unwrap()).unwrap())
    }

    #[test]
    fn partial_dates() {
        assert_eq!(
            tree("pt:2024-02").filters[0].union,
            vec![Filter::Range {
                field: FieldKey::Partition,
                begin: bound(date("2024-02-01"), true),
                end: bound(date("2024-03-01"), false),
            }]
        );
        let Filter::Equal { values, .. } = &tree("pt:03-07").filters[0].union[0] else {
            panic!("expected equality");
        };
        assert_eq!(values, &vec![date("2021-03-07")]);
        let t = tree("pt:{2024.01.02, 2023}");
        assert_eq!(t.filters[0].union.len(), 2);
        assert_eq!(
            t.filters[0].union[1],
            Filter::Range {
                field: FieldKey::Partition,
                begin: bound(date("2023-01-01"), true),
                end: bound(date("2024-01-01"), false),
            }
        );
    }

    #[test]
    fn partial_dates_in_comparisons_and_ranges() {
        let first = |text: &str| tree(text).filters[0].union[0].clone();
        assert_eq!(
            first("ct>2024"),
            Filter::Range {
                field: FieldKey::CreateTime,
                begin: bound(date("2025-01-01"), true),
                end: None,
            }
        );
        assert_eq!(
            first("ct>=2024"),
            Filter::Range {
                field: FieldKey::CreateTime,
                begin: bound(date("2024-01-01"), true),
                end: None,
            }
        );
        assert_eq!(
            first("ct<2024-05"),
            Filter::Range {
                field: FieldKey::CreateTime,
                begin: None,
                end: bound(date("2024-05-01"), false),
            }
        );
        assert_eq!(
            first("ct<=2024-05"),
            Filter::Range {
                field: FieldKey::CreateTime,
                begin: None,
                end: bound(date("2024-06-01"), false),
            }
        );
        assert_eq!(
            first("pt:2023..2024"),
            Filter::Range {
                field: FieldKey::Partition,
                begin: bound(date("2023-01-01"), true),
                end: bound(date("2025-01-01"), false),
            }
        );
        assert_eq!(
            first("pt:(2023,2024)"),
            Filter::Range {
                field: FieldKey::Partition,
                begin: bound(date("2024-01-01"), true),
                end: bound(date("2024-01-01"), false),
            }
        );
    }

    #[test]
    fn dates_and_casts() {
        let t = tree("pt:2024.01.02");
        let Filter::Equal { values, .. } = &t.filters[0].union[0] else {
            panic!("expected equality");
        };
        assert_eq!(values[0].to_string(), "2024-01-02");
        assert_eq!(codes("score:abc"), vec![3019]);
        assert_eq!(codes("pt:yesterday"), vec![3019]);
        assert_eq!(codes("score:a.b"), vec![3017]);
    }

    #[test]
    fn flags_and_compositions() {
        let t = tree("-f tagme:{author, tag} tagme");
        assert_eq!(t.filters[0].union, vec![Filter::Flag { field: FieldKey::Favorite }]);
        assert!(t.filters[0].exclude);
        assert_eq!(
            t.filters[1].union,
            vec![Filter::Composition {
                field: FieldKey::Tagme,
                value: Tagme::TAG | Tagme::AUTHOR
            }]
        );
        assert_eq!(codes("favorite:1"), vec![3002]);
        assert_eq!(tree("-bm").filters[0].union, vec![Filter::Flag { field: FieldKey::BookMember }]);
        assert_eq!(codes("book-member:1"), vec![3002]);
        assert_eq!(codes("score"), vec![3001]);
        assert_eq!(codes("tagme:nope"), vec![3020]);
    }

    #[test]
    fn field_names_and_source_flags() {
        assert_eq!(codes("foo:bar"), vec![3028]);
        assert_eq!(codes("^score:1"), vec![3023]);
        assert_eq!(codes("page:1"), vec![3024]);
        assert_eq!(codes("score:1|cat"), vec![3022]);
        assert_eq!(codes("cat.x:1"), vec![3026]);
        assert_eq!(codes("score:1,2"), vec![3003]);
        let SemanticError::UnsupportedValueShape { field, .. } = &run("score:1,2").errors[0] else {
            panic!("expected a shape error");
        };
        assert_eq!(field, "score");
        let Err(SemanticError::UnsupportedValueShape { field, .. }) = single_value("ext", &[]) else {
            panic!("expected a shape error");
        };
        assert_eq!(field, "ext");
        assert!(matches!(
            tree("^id:5").filters[0].union[0],
            Filter::Equal {
                field: FieldKey::SourceId,
                ..
            }
        ));
    }

    #[test]
    fn sorts() {
        let r = run("order:-score,+id,s");
        assert!(r.errors.is_empty());
        assert_eq!(r.warnings.iter().map(|w| w.code()).collect::<Vec<_>>(), vec![3016]);
        let t = r.result.unwrap();
        assert_eq!(
            t.sorts,
            vec![
                SortItem {
                    key: OrderKey::Score,
                    direction: Direction::Descending
                },
                SortItem {
                    key: OrderKey::Id,
                    direction: Direction::Ascending
                },
            ]
        );
        assert_eq!(codes("-order:id"), vec![3015]);
        assert_eq!(codes("order:id|cat"), vec![3015]);
        assert_eq!(codes("order"), vec![3012]);
        assert_eq!(codes("order>id"), vec![3013]);
        assert_eq!(codes("order:nope"), vec![3014]);
        assert_eq!(codes("order:^site"), Vec::<u16>::new());
    }

    #[test]
    fn value_prefixes_only_in_sorts() {
        assert_eq!(codes("score:-5"), vec![3025]);
        assert_eq!(codes("tag:+cat"), vec![3025]);
    }

    #[test]
    fn group_members_by_name() {
        assert_eq!(ids(&tree("$color:red").elements[0]), vec![46]);
        assert_eq!(ids(&tree("$color:{blue, red}").elements[0]), vec![46, 47]);
        assert_eq!(ids(&tree("$season:summer|red").elements[0]), vec![42, 46]);
        let t = tree("-`color`:blue");
        assert_eq!(t.elements[0].kind, ElementKind::Tag);
        assert!(t.elements[0].exclude);
        assert_eq!(ids(&t.elements[0]), vec![47]);
        assert_eq!(codes("$color:green"), vec![3026]);
    }

    #[test]
    fn sequence_ranges() {
        let members = |text: &str| ids(&tree(text).elements[0]);
        assert_eq!(members("$season:summer..autumn"), vec![42, 43]);
        assert_eq!(members("$season:[spring,autumn)"), vec![41, 42]);
        assert_eq!(members("$season:(spring,autumn)"), vec![42]);
        assert_eq!(members("$season>summer"), vec![43, 44]);
        assert_eq!(members("$season<=summer"), vec![41, 42]);
        assert_eq!(members("$season<summer"), vec![41]);
        assert_eq!(codes("$season:(spring,summer)"), vec![3026]);
        assert_eq!(codes("$season:x..autumn"), vec![3026]);
        // Plain groups have no order.
        assert_eq!(codes("$color:red..blue"), vec![3026]);
    }

    #[test]
    fn sequence_neighbours() {
        let members = |text: &str| ids(&tree(text).elements[0]);
        assert_eq!(members("$summer~winter"), vec![42, 43, 44]);
        assert_eq!(members("$winter~summer"), vec![42, 43, 44]);
        assert_eq!(members("summer~+"), vec![42, 43, 44]);
        assert_eq!(members("$summer~-"), vec![41, 42]);
        assert_eq!(members("season.autumn~-|red"), vec![41, 42, 43, 46]);
        assert_eq!(codes("red~+"), vec![3026]);
        assert_eq!(codes("$summer~nowhere"), vec![3026]);
        // An unprefixed word with a binary relation names a field.
        assert_eq!(codes("summer~winter"), vec![3028]);
    }

    #[test]
    fn relation_shapes_on_tags() {
        assert_eq!(codes("$season:spring,summer"), vec![3009]);
        assert_eq!(codes("$season>{spring}"), vec![3010]);
        assert_eq!(codes("$summer~{spring}"), vec![3010]);
        assert_eq!(codes("$summer~spring..autumn"), vec![3010]);
        assert_eq!(codes("$season:-spring"), vec![3025]);
        assert_eq!(codes("@mori~+"), vec![3011]);
        assert_eq!(codes("#touhou:reimu"), vec![3011]);
        assert_eq!(codes("'text'~+"), vec![3008]);
        assert_eq!(codes("^pixiv.cat~+"), vec![3008]);
        assert_eq!(codes("score~+"), vec![3005]);
        assert_eq!(codes("season:spring"), vec![3028]);
        assert_eq!(codes("summer~+ score:1"), Vec::<u16>::new());
        assert_eq!(codes("summer~+|score:1"), vec![3022]);
    }
}
