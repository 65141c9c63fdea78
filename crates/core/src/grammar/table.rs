//! The SLR action/goto table and its text form.
//!
//! Text form: a header line `N t1 .. tN nt1 .. ntM` naming the terminal
//! columns (`N` of them) followed by the nonterminal columns, then one row
//! per state: the state number, `N` actions (`sK` shift, `rK` reduce,
//! `acc`, `_` error) and `M` gotos (a state number or `_`).
//!
//! Shared with the build script, so this file only depends on `std` and
//! `thiserror`.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift(s) => write!(f, "s{s}"),
            Action::Reduce(r) => write!(f, "r{r}"),
            Action::Accept => f.write_str("acc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("syntax table text is empty")]
    Empty,
    #[error("syntax table header is malformed")]
    BadHeader,
    #[error("row {row}: expected {expected} cells, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}: unknown cell '{cell}'")]
    UnknownCell { row: usize, cell: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTable {
    terminals: Vec<String>,
    non_terminals: Vec<String>,
    actions: Vec<Vec<Option<Action>>>,
    gotos: Vec<Vec<Option<usize>>>,
    terminal_index: HashMap<String, usize>,
    non_terminal_index: HashMap<String, usize>,
}

impl SyntaxTable {
    pub fn new(
        terminals: Vec<String>,
        non_terminals: Vec<String>,
        actions: Vec<Vec<Option<Action>>>,
        gotos: Vec<Vec<Option<usize>>>,
    ) -> Self {
        let terminal_index = terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let non_terminal_index = non_terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        SyntaxTable {
            terminals,
            non_terminals,
            actions,
            gotos,
            terminal_index,
            non_terminal_index,
        }
    }

    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    /// `None` is the error action. Unknown terminals are errors too.
    pub fn action(&self, state: usize, terminal: &str) -> Option<Action> {
        let column = *self.terminal_index.get(terminal)?;
        self.actions.get(state)?.get(column).copied().flatten()
    }

    pub fn goto(&self, state: usize, non_terminal: &str) -> Option<usize> {
        let column = *self.non_terminal_index.get(non_terminal)?;
        self.gotos.get(state)?.get(column).copied().flatten()
    }

    /// Terminals with a non-error action in `state`, in column order.
    pub fn expected(&self, state: usize) -> Vec<String> {
        self.actions
            .get(state)
            .map(|row| {
                row.iter()
                    .zip(&self.terminals)
                    .filter(|(a, _)| a.is_some())
                    .map(|(_, t)| t.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.terminals.len().to_string());
        for name in self.terminals.iter().chain(&self.non_terminals) {
            out.push(' ');
            out.push_str(name);
        }
        out.push('\n');
        for (state, (actions, gotos)) in self.actions.iter().zip(&self.gotos).enumerate() {
            out.push_str(&state.to_string());
            for a in actions {
                out.push(' ');
                match a {
                    Some(a) => out.push_str(&a.to_string()),
                    None => out.push('_'),
                }
            }
            for g in gotos {
                out.push(' ');
                match g {
                    Some(g) => out.push_str(&g.to_string()),
                    None => out.push('_'),
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn from_text(text: &str) -> Result<SyntaxTable, TableError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<&str> = lines.next().ok_or(TableError::Empty)?.split_whitespace().collect();
        let (count, names) = header.split_first().ok_or(TableError::BadHeader)?;
        let terminal_count: usize = count.parse().map_err(|_| TableError::BadHeader)?;
        if terminal_count > names.len() {
            return Err(TableError::BadHeader);
        }
        let terminals: Vec<String> = names[..terminal_count].iter().map(|s| s.to_string()).collect();
        let non_terminals: Vec<String> = names[terminal_count..].iter().map(|s| s.to_string()).collect();

        let mut actions = Vec::new();
        let mut gotos = Vec::new();
        for (row, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split_whitespace().collect();
            let expected = 1 + names.len();
            if cells.len() != expected {
                return Err(TableError::RowWidth {
                    row,
                    expected,
                    found: cells.len(),
                });
            }
            let unknown = |cell: &str| TableError::UnknownCell {
                row,
                cell: cell.to_string(),
            };
            let action_row = cells[1..=terminal_count]
                .iter()
                .map(|cell| parse_action(cell).ok_or_else(|| unknown(cell)))
                .collect::<Result<Vec<_>, _>>()?;
            let goto_row = cells[terminal_count + 1..]
                .iter()
                .map(|cell| match *cell {
                    "_" => Ok(None),
                    n => n.parse().map(Some).map_err(|_| unknown(cell)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            actions.push(action_row);
            gotos.push(goto_row);
        }
        Ok(SyntaxTable::new(terminals, non_terminals, actions, gotos))
    }
}

/// `Some(None)` is the error cell; `None` means the cell is unreadable.
fn parse_action(cell: &str) -> Option<Option<Action>> {
    match cell {
        "_" => Some(None),
        "acc" => Some(Some(Action::Accept)),
        _ => {
            if let Some(n) = cell.strip_prefix('s') {
                n.parse().ok().map(|n| Some(Action::Shift(n)))
            } else if let Some(n) = cell.strip_prefix('r') {
                n.parse().ok().map(|n| Some(Action::Reduce(n)))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxTable {
        SyntaxTable::new(
            vec!["id".into(), "<eof>".into()],
            vec!["E".into()],
            vec![
                vec![Some(Action::Shift(2)), None],
                vec![None, Some(Action::Accept)],
                vec![None, Some(Action::Reduce(1))],
            ],
            vec![vec![Some(1)], vec![None], vec![None]],
        )
    }

    #[test]
    fn text_round_trip() {
        let table = sample();
        let text = table.to_text();
        assert_eq!(text.lines().next(), Some("2 id <eof> E"));
        assert_eq!(text.lines().nth(1), Some("0 s2 _ 1"));
        assert_eq!(SyntaxTable::from_text(&text), Ok(table));
    }

    #[test]
    fn lookups() {
        let table = sample();
        assert_eq!(table.action(0, "id"), Some(Action::Shift(2)));
        assert_eq!(table.action(0, "<eof>"), None);
        assert_eq!(table.action(0, "nope"), None);
        assert_eq!(table.goto(0, "E"), Some(1));
        assert_eq!(table.expected(1), vec!["<eof>".to_string()]);
        assert_eq!(table.state_count(), 3);
    }

    #[test]
    fn malformed_text() {
        assert_eq!(SyntaxTable::from_text(""), Err(TableError::Empty));
        assert_eq!(SyntaxTable::from_text("x a b"), Err(TableError::BadHeader));
        assert!(matches!(
            SyntaxTable::from_text("1 a B\n0 s1"),
            Err(TableError::RowWidth { row: 0, .. })
        ));
        assert!(matches!(
            SyntaxTable::from_text("1 a B\n0 q1 _"),
            Err(TableError::UnknownCell { .. })
        ));
    }
}
