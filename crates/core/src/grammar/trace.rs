//! A [`ParseHook`] that records one readable line per transition.

use super::definition::SyntaxExpression;
use super::parser::{token_text, ParseHook};
use crate::error::GrammarError;
use crate::lexer::LexicalItem;

#[derive(Debug, Default)]
pub struct TracePrinter {
    lines: Vec<String>,
}

impl TracePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl ParseHook for TracePrinter {
    fn shift(&mut self, state: usize, item: &LexicalItem, next: usize) {
        self.lines.push(format!(
            "{state:>3}  shift  '{}' ({}) -> {next}",
            token_text(item),
            item.terminal()
        ));
    }

    fn reduce(&mut self, state: usize, expression: &SyntaxExpression, goto: usize) {
        self.lines.push(format!(
            "{state:>3}  reduce r{} {expression} -> {goto}",
            expression.index
        ));
    }

    fn error(&mut self, state: usize, error: &GrammarError) {
        self.lines.push(format!("{state:>3}  error  {error}"));
    }

    fn accept(&mut self) {
        self.lines.push("     accept".to_string());
    }
}
