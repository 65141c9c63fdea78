//! Semantic analysis: lowering, field schema, value casting and name
//! resolution.

pub mod analyzer;
pub mod lower;
pub mod schema;
mod sequence;
pub mod tree;
pub mod value;

pub use analyzer::analyze;
pub use schema::{FieldKey, FieldType, OrderKey};
pub use tree::{
    Bound, ElementClause, ElementKind, ElementValue, Filter, FilterClause, FilterValue, SemanticTree,
    SortItem,
};
