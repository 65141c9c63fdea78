//! Grammar definition, SLR table and the table-driven parser.
//!
//! The table is built by `build.rs` from `syntax/syntax.txt` and embedded
//! in text form; [`Grammar::load`] reads both back at runtime.

pub mod builder;
pub mod definition;
pub mod parser;
pub mod table;
pub mod trace;

use definition::{parse_definition, DefinitionError, SyntaxExpression};
use table::{SyntaxTable, TableError};

/// The grammar definition source.
pub const SYNTAX_DEFINITION: &str = include_str!("../../syntax/syntax.txt");

/// The table generated from [`SYNTAX_DEFINITION`] at build time.
pub const SYNTAX_TABLE: &str = include_str!(concat!(env!("OUT_DIR"), "/syntax-table.txt"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarLoadError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Build(#[from] builder::BuildError),
    #[error("table does not match the definition: {0}")]
    Mismatch(String),
}

/// Productions plus their table.
#[derive(Debug, Clone)]
pub struct Grammar {
    expressions: Vec<SyntaxExpression>,
    table: SyntaxTable,
}

impl Grammar {
    /// The embedded query grammar.
    pub fn load() -> Result<Grammar, GrammarLoadError> {
        let expressions = parse_definition(SYNTAX_DEFINITION)?;
        let table = SyntaxTable::from_text(SYNTAX_TABLE)?;
        if table.terminals() != definition::terminals(&expressions).as_slice() {
            return Err(GrammarLoadError::Mismatch("terminal columns differ".into()));
        }
        if table.non_terminals() != definition::non_terminals(&expressions).as_slice() {
            return Err(GrammarLoadError::Mismatch("nonterminal columns differ".into()));
        }
        tracing::debug!(
            productions = expressions.len(),
            states = table.state_count(),
            "grammar loaded"
        );
        Ok(Grammar { expressions, table })
    }

    /// Build a grammar from definition text at runtime.
    pub fn from_definition(text: &str) -> Result<Grammar, GrammarLoadError> {
        let expressions = parse_definition(text)?;
        let table = builder::build(&expressions)?;
        Ok(Grammar { expressions, table })
    }

    /// Production by its 1-based index.
    pub fn expression(&self, index: usize) -> Option<&SyntaxExpression> {
        index.checked_sub(1).and_then(|i| self.expressions.get(i))
    }

    pub fn expressions(&self) -> &[SyntaxExpression] {
        &self.expressions
    }

    pub fn table(&self) -> &SyntaxTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_matches_a_fresh_build() {
        let loaded = Grammar::load().unwrap();
        let built = Grammar::from_definition(SYNTAX_DEFINITION).unwrap();
        assert_eq!(loaded.table(), built.table());
        assert_eq!(loaded.table().state_count(), 73);
        assert_eq!(loaded.expressions().len(), 51);
    }

    #[test]
    fn expressions_are_one_based() {
        let g = Grammar::load().unwrap();
        assert_eq!(g.expression(0), None);
        assert_eq!(g.expression(1).unwrap().to_string(), "SEQUENCE -> SEQUENCE_ITEM");
        assert_eq!(g.expression(48).unwrap().to_string(), "RANGE_END -> )");
        assert_eq!(g.expression(51).unwrap().to_string(), "UNARY_FAMILY -> ~-");
        assert_eq!(g.expression(52), None);
    }

    #[test]
    fn conflicting_definition_is_rejected() {
        let err = Grammar::from_definition("E -> E + E\nE -> id").unwrap_err();
        assert!(matches!(err, GrammarLoadError::Build(_)));
    }
}
