//! Table-driven SLR parser with error recovery.
//!
//! On an error action the parser records a diagnostic, discards its
//! stacks, skips the offending token and then every token that cannot
//! start a sequence, and resumes from state 0. Reaching the end of input
//! stops parsing. Any recorded error makes the result `None`.

use serde::Serialize;

use super::definition::{SyntaxExpression, EOF};
use super::table::Action;
use super::Grammar;
use crate::diagnostic::{AnalysisResult, ErrorCollector};
use crate::error::GrammarError;
use crate::lexer::LexicalItem;
use crate::range::TextRange;

/// An interior node: one reduced production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseNode {
    pub production: usize,
    pub key: String,
    pub children: Vec<ParseChild>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParseChild {
    Node(ParseNode),
    Leaf(LexicalItem),
}

impl ParseChild {
    pub fn range(&self) -> TextRange {
        match self {
            ParseChild::Node(n) => n.range,
            ParseChild::Leaf(l) => l.range,
        }
    }

    pub fn as_node(&self) -> Option<&ParseNode> {
        match self {
            ParseChild::Node(n) => Some(n),
            ParseChild::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LexicalItem> {
        match self {
            ParseChild::Leaf(l) => Some(l),
            ParseChild::Node(_) => None,
        }
    }
}

impl ParseNode {
    /// Indented outline, one node or leaf per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} [{}]\n", self.key, self.range));
        for child in &self.children {
            match child {
                ParseChild::Node(n) => n.write_outline(depth + 1, out),
                ParseChild::Leaf(l) => {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&format!("{} [{}]\n", token_text(l), l.range));
                }
            }
        }
    }
}

/// Observer of parser transitions. Every method defaults to a no-op.
pub trait ParseHook {
    fn shift(&mut self, _state: usize, _item: &LexicalItem, _next: usize) {}

    fn reduce(&mut self, _state: usize, _expression: &SyntaxExpression, _goto: usize) {}

    fn error(&mut self, _state: usize, _error: &GrammarError) {}

    fn accept(&mut self) {}
}

/// A hook that observes nothing.
pub struct NoHook;

impl ParseHook for NoHook {}

/// Source text of a token as the user typed its content.
pub fn token_text(item: &LexicalItem) -> String {
    match item.as_str() {
        Some((value, _)) => value.to_string(),
        None => item.terminal().to_string(),
    }
}

pub struct SlrParser<'g> {
    grammar: &'g Grammar,
}

impl<'g> SlrParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        SlrParser { grammar }
    }

    pub fn parse(&self, tokens: &[LexicalItem]) -> AnalysisResult<ParseNode, GrammarError> {
        self.parse_with_hook(tokens, &mut NoHook)
    }

    pub fn parse_with_hook(
        &self,
        tokens: &[LexicalItem],
        hook: &mut dyn ParseHook,
    ) -> AnalysisResult<ParseNode, GrammarError> {
        let mut collector = ErrorCollector::new();
        if tokens.is_empty() {
            return collector.finish(None);
        }
        let table = self.grammar.table();
        let end_of_text = tokens.last().map(LexicalItem::end).unwrap_or(0);

        let mut states: Vec<usize> = vec![0];
        let mut nodes: Vec<ParseChild> = Vec::new();
        let mut pos = 0usize;
        let mut accepted = None;

        loop {
            let state = states.last().copied().unwrap_or(0);
            let item = tokens.get(pos);
            let terminal = item.map(LexicalItem::terminal).unwrap_or(EOF);

            match table.action(state, terminal) {
                Some(Action::Shift(next)) => {
                    let Some(item) = item else {
                        break;
                    };
                    tracing::trace!(state, next, token = terminal, "shift");
                    hook.shift(state, item, next);
                    states.push(next);
                    nodes.push(ParseChild::Leaf(item.clone()));
                    pos += 1;
                }
                Some(Action::Reduce(production)) => {
                    let Some(expression) = self.grammar.expression(production) else {
                        break;
                    };
                    let arity = expression.sequence.len();
                    let split = nodes.len().saturating_sub(arity);
                    let children = nodes.split_off(split);
                    states.truncate(states.len().saturating_sub(arity));
                    let top = states.last().copied().unwrap_or(0);
                    let range = match (children.first(), children.last()) {
                        (Some(first), Some(last)) => first.range().cover(&last.range()),
                        _ => TextRange::point(item.map(LexicalItem::begin).unwrap_or(end_of_text)),
                    };
                    let Some(goto) = table.goto(top, &expression.key) else {
                        let error = self.error_at(state, item, end_of_text);
                        hook.error(state, &error);
                        collector.error(error);
                        break;
                    };
                    tracing::trace!(state, production, goto, key = %expression.key, "reduce");
                    hook.reduce(state, expression, goto);
                    states.push(goto);
                    nodes.push(ParseChild::Node(ParseNode {
                        production,
                        key: expression.key.clone(),
                        children,
                        range,
                    }));
                }
                Some(Action::Accept) => {
                    tracing::trace!(state, "accept");
                    hook.accept();
                    if let Some(ParseChild::Node(root)) = nodes.pop() {
                        accepted = Some(root);
                    }
                    break;
                }
                None => {
                    let error = self.error_at(state, item, end_of_text);
                    tracing::trace!(state, token = terminal, "error");
                    hook.error(state, &error);
                    collector.error(error);
                    if item.is_none() {
                        break;
                    }
                    states.clear();
                    states.push(0);
                    nodes.clear();
                    pos += 1;
                    while pos < tokens.len()
                        && !matches!(table.action(0, tokens[pos].terminal()), Some(Action::Shift(_)))
                    {
                        pos += 1;
                    }
                    if pos >= tokens.len() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(
            tokens = tokens.len(),
            errors = collector.errors().len(),
            accepted = accepted.is_some(),
            "grammar analysis finished"
        );
        collector.finish(accepted)
    }

    fn error_at(&self, state: usize, item: Option<&LexicalItem>, end_of_text: usize) -> GrammarError {
        let expected = self.grammar.table().expected(state);
        match item {
            Some(item) => GrammarError::UnexpectedToken {
                token: token_text(item),
                expected,
                range: item.range,
            },
            None => GrammarError::UnexpectedEnd {
                expected,
                at: end_of_text,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{analyze, LexicalOptions};

    fn parse(text: &str) -> AnalysisResult<ParseNode, GrammarError> {
        let grammar = Grammar::load().unwrap();
        let tokens = analyze(text, &LexicalOptions::default()).result.unwrap();
        SlrParser::new(&grammar).parse(&tokens)
    }

    fn keys(node: &ParseNode, out: &mut Vec<String>) {
        out.push(node.key.clone());
        for c in &node.children {
            if let ParseChild::Node(n) = c {
                keys(n, out);
            }
        }
    }

    #[test]
    fn accepts_a_field_with_range() {
        let r = parse("size:10..20");
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        let root = r.result.unwrap();
        assert_eq!(root.key, "SEQUENCE");
        assert_eq!(root.range, TextRange::new(0, 11));
        let mut all = Vec::new();
        keys(&root, &mut all);
        assert!(all.contains(&"RANGE".to_string()));
        assert!(all.contains(&"FAMILY".to_string()));
    }

    #[test]
    fn accepts_every_operator() {
        for text in [
            "a b & c",
            "-^a",
            "$a|b/c",
            "x:{}",
            "x:{a, b.c}",
            "x:[1,2)",
            "order:+a,-^b",
            "x>=1 y<2 z~p*",
        ] {
            let r = parse(text);
            assert!(r.is_success(), "{text}: {:?}", r.errors);
        }
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let r = parse("   ");
        assert_eq!(r.result, None);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn end_of_text_is_reported() {
        let r = parse("tag:");
        assert_eq!(r.result, None);
        assert_eq!(r.errors.len(), 1);
        assert!(matches!(
            &r.errors[0],
            GrammarError::UnexpectedEnd { at: 4, expected } if expected.contains(&"str".to_string())
        ));
    }

    #[test]
    fn recovery_reports_each_bad_region() {
        // ')' fails and ']' is skipped; 'b :' restarts and the second ':'
        // fails; 'c' parses but the result is still dropped.
        let r = parse("a ) ] b : : c");
        assert_eq!(r.result, None);
        let tokens: Vec<_> = r
            .errors
            .iter()
            .map(|e| match e {
                GrammarError::UnexpectedToken { token, .. } => token.clone(),
                GrammarError::UnexpectedEnd { .. } => "<eof>".into(),
            })
            .collect();
        assert_eq!(tokens, vec![")", ":"]);
    }

    #[test]
    fn error_while_skipping_to_end_stops_quietly() {
        let r = parse("a ) ] ,");
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn hook_sees_every_transition() {
        #[derive(Default)]
        struct Count {
            shifts: usize,
            reduces: usize,
            accepted: bool,
        }
        impl ParseHook for Count {
            fn shift(&mut self, _: usize, _: &LexicalItem, _: usize) {
                self.shifts += 1;
            }
            fn reduce(&mut self, _: usize, _: &SyntaxExpression, _: usize) {
                self.reduces += 1;
            }
            fn accept(&mut self) {
                self.accepted = true;
            }
        }
        let grammar = Grammar::load().unwrap();
        let tokens = analyze("a", &LexicalOptions::default()).result.unwrap();
        let mut hook = Count::default();
        let r = SlrParser::new(&grammar).parse_with_hook(&tokens, &mut hook);
        assert!(r.is_success());
        assert_eq!(hook.shifts, 1);
        // STRING, SUBJECT, SFP, ELEMENT_ITEM, ELEMENT, SEQUENCE_ITEM, SEQUENCE
        assert_eq!(hook.reduces, 7);
        assert!(hook.accepted);
    }

    #[test]
    fn outline_lists_leaves() {
        let root = parse("a").result.unwrap();
        let outline = root.outline();
        assert!(outline.starts_with("SEQUENCE [0..1]\n"));
        assert!(outline.trim_end().ends_with("a [0..1]"));
    }
}
