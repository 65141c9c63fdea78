//! Grammar productions read from the textual definition.
//!
//! Shared with the build script, so this file only depends on `std` and
//! `thiserror`.

use std::collections::HashSet;

/// Terminal standing for the end of input.
pub const EOF: &str = "<eof>";

/// A grammar symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Notation {
    Terminal(String),
    NonTerminal(String),
}

impl Notation {
    pub fn name(&self) -> &str {
        match self {
            Notation::Terminal(s) | Notation::NonTerminal(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Notation::Terminal(_))
    }
}

/// One production `key -> sequence`. `index` starts at 1; 0 is reserved
/// for the augmented start production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxExpression {
    pub index: usize,
    pub key: String,
    pub sequence: Vec<Notation>,
}

impl std::fmt::Display for SyntaxExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ->", self.key)?;
        for n in &self.sequence {
            write!(f, " {}", n.name())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("line {line}: expected 'KEY -> symbols'")]
    Malformed { line: usize },
    #[error("line {line}: production of {key} is empty")]
    EmptyProduction { line: usize, key: String },
    #[error("line {line}: '{symbol}' is reserved")]
    ReservedSymbol { line: usize, symbol: String },
    #[error("grammar definition has no productions")]
    Empty,
}

/// Parse a grammar definition. Blank lines and lines starting with `//`
/// are ignored. Any symbol that appears as a key is a nonterminal; the
/// first key is the start symbol.
pub fn parse_definition(text: &str) -> Result<Vec<SyntaxExpression>, DefinitionError> {
    let mut raw = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let mut words = line.split_whitespace();
        let key = words.next().ok_or(DefinitionError::Malformed { line: line_no })?;
        if words.next() != Some("->") {
            return Err(DefinitionError::Malformed { line: line_no });
        }
        let sequence: Vec<&str> = words.collect();
        if sequence.is_empty() {
            return Err(DefinitionError::EmptyProduction {
                line: line_no,
                key: key.to_string(),
            });
        }
        if let Some(reserved) = std::iter::once(key).chain(sequence.iter().copied()).find(|s| *s == EOF) {
            return Err(DefinitionError::ReservedSymbol {
                line: line_no,
                symbol: reserved.to_string(),
            });
        }
        raw.push((key, sequence));
    }
    if raw.is_empty() {
        return Err(DefinitionError::Empty);
    }

    let keys: HashSet<&str> = raw.iter().map(|(k, _)| *k).collect();
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, (key, sequence))| SyntaxExpression {
            index: i + 1,
            key: key.to_string(),
            sequence: sequence
                .into_iter()
                .map(|s| {
                    if keys.contains(s) {
                        Notation::NonTerminal(s.to_string())
                    } else {
                        Notation::Terminal(s.to_string())
                    }
                })
                .collect(),
        })
        .collect())
}

/// Terminals in order of first appearance, then [`EOF`].
pub fn terminals(expressions: &[SyntaxExpression]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for n in expressions.iter().flat_map(|e| e.sequence.iter()) {
        if let Notation::Terminal(t) = n {
            if seen.insert(t.as_str()) {
                out.push(t.clone());
            }
        }
    }
    out.push(EOF.to_string());
    out
}

/// Nonterminals in order of first definition.
pub fn non_terminals(expressions: &[SyntaxExpression]) -> Vec<String> {
    let mut seen = HashSet::new();
    expressions
        .iter()
        .filter(|e| seen.insert(e.key.as_str()))
        .map(|e| e.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = "
        // comment
        E -> E + T
        E -> T
        T -> id
    ";

    #[test]
    fn keys_become_nonterminals() {
        let exprs = parse_definition(TOY).unwrap();
        assert_eq!(exprs.len(), 3);
        assert_eq!(exprs[0].index, 1);
        assert_eq!(
            exprs[0].sequence,
            vec![
                Notation::NonTerminal("E".into()),
                Notation::Terminal("+".into()),
                Notation::NonTerminal("T".into()),
            ]
        );
        assert_eq!(exprs[2].to_string(), "T -> id");
    }

    #[test]
    fn symbol_orders() {
        let exprs = parse_definition(TOY).unwrap();
        assert_eq!(terminals(&exprs), vec!["+", "id", EOF]);
        assert_eq!(non_terminals(&exprs), vec!["E", "T"]);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(
            parse_definition("E = x"),
            Err(DefinitionError::Malformed { line: 1 })
        );
        assert_eq!(
            parse_definition("E ->"),
            Err(DefinitionError::EmptyProduction {
                line: 1,
                key: "E".into()
            })
        );
        assert_eq!(parse_definition("// nothing"), Err(DefinitionError::Empty));
        assert!(matches!(
            parse_definition("E -> <eof>"),
            Err(DefinitionError::ReservedSymbol { .. })
        ));
    }
}
