//! Semantic tree to query plan.

use serde::{Deserialize, Serialize};

use crate::diagnostic::{AnalysisResult, ErrorCollector};
use crate::error::TranslationError;
use crate::options::CompilerOptions;
use crate::semantic::{ElementKind, ElementValue, Filter, SemanticTree, SortItem};

/// What the storage layer executes. Element items are intersected;
/// values inside one item are unioned; `exclude` negates an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub sorts: Vec<SortItem>,
    pub elements: Vec<ElementGroup>,
    pub filters: Vec<FilterGroup>,
}

/// Element items of one kind, in query order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub kind: ElementKind,
    pub items: Vec<ElementItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementItem {
    pub exclude: bool,
    pub union: Vec<ElementValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub exclude: bool,
    pub union: Vec<Filter>,
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty() && self.elements.is_empty() && self.filters.is_empty()
    }

    /// Total number of intersected element items.
    pub fn element_item_count(&self) -> usize {
        self.elements.iter().map(|g| g.items.len()).sum()
    }
}

/// Flatten `tree` into a plan. Groups appear in the order their kind
/// first appears; never fails, but oversized unions and intersections
/// are reported as warnings.
pub fn to_query_plan(
    tree: SemanticTree,
    options: &CompilerOptions,
) -> AnalysisResult<QueryPlan, TranslationError> {
    let mut collector = ErrorCollector::new();
    let mut elements: Vec<ElementGroup> = Vec::new();
    for clause in tree.elements {
        if let Some(limit) = options.warning_limit_of_union_items {
            if clause.union.len() > limit {
                collector.warning(TranslationError::UnionItemsExceed {
                    item: clause
                        .union
                        .first()
                        .map(|v| v.label().to_string())
                        .unwrap_or_default(),
                    count: clause.union.len(),
                    limit,
                    range: clause.range,
                });
            }
        }
        let item = ElementItem {
            exclude: clause.exclude,
            union: clause.union,
        };
        match elements.iter_mut().find(|g| g.kind == clause.kind) {
            Some(group) => group.items.push(item),
            None => elements.push(ElementGroup {
                kind: clause.kind,
                items: vec![item],
            }),
        }
    }

    let plan = QueryPlan {
        sorts: tree.sorts,
        elements,
        filters: tree
            .filters
            .into_iter()
            .map(|f| FilterGroup {
                exclude: f.exclude,
                union: f.union,
            })
            .collect(),
    };
    if let Some(limit) = options.warning_limit_of_intersect_items {
        let count = plan.element_item_count();
        if count > limit {
            collector.warning(TranslationError::IntersectItemsExceed { count, limit });
        }
    }
    tracing::debug!(
        sorts = plan.sorts.len(),
        element_groups = plan.elements.len(),
        filters = plan.filters.len(),
        warnings = collector.warnings().len(),
        "query plan built"
    );
    collector.finish(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::TextRange;
    use crate::semantic::ElementClause;

    fn text(value: &str) -> ElementValue {
        ElementValue::Text {
            value: value.into(),
            exact: false,
        }
    }

    fn clause(kind: ElementKind, exclude: bool, values: &[&str]) -> ElementClause {
        ElementClause {
            kind,
            exclude,
            union: values.iter().map(|v| text(v)).collect(),
            range: TextRange::new(0, 1),
        }
    }

    #[test]
    fn groups_by_kind_in_first_appearance_order() {
        let tree = SemanticTree {
            elements: vec![
                clause(ElementKind::Topic, false, &["a"]),
                clause(ElementKind::Text, true, &["b", "c"]),
                clause(ElementKind::Topic, true, &["d"]),
            ],
            ..SemanticTree::default()
        };
        let plan = to_query_plan(tree, &CompilerOptions::default()).result.unwrap();
        let kinds: Vec<_> = plan.elements.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Topic, ElementKind::Text]);
        assert_eq!(plan.elements[0].items.len(), 2);
        assert!(plan.elements[0].items[1].exclude);
        assert_eq!(plan.elements[1].items[0].union, vec![text("b"), text("c")]);
    }

    #[test]
    fn oversized_union_and_intersection_warn() {
        let options = CompilerOptions {
            warning_limit_of_union_items: Some(1),
            warning_limit_of_intersect_items: Some(1),
            ..CompilerOptions::default()
        };
        let tree = SemanticTree {
            elements: vec![
                clause(ElementKind::Text, false, &["a", "b"]),
                clause(ElementKind::Text, false, &["c"]),
            ],
            ..SemanticTree::default()
        };
        let r = to_query_plan(tree, &options);
        assert!(r.is_success());
        let codes: Vec<_> = r
            .warnings
            .iter()
            .map(|w| crate::error::Diagnose::code(w))
            .collect();
        assert_eq!(codes, vec![4001, 4002]);
    }

    #[test]
    fn unlimited_when_limits_are_cleared() {
        let options = CompilerOptions {
            warning_limit_of_union_items: None,
            warning_limit_of_intersect_items: None,
            ..CompilerOptions::default()
        };
        let tree = SemanticTree {
            elements: vec![clause(ElementKind::Text, false, &["a"; 100])],
            ..SemanticTree::default()
        };
        assert!(to_query_plan(tree, &options).warnings.is_empty());
    }
}
