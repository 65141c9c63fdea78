//! SLR(1) table construction.
//!
//! Canonical LR(0) item sets and their transitions, with reduce actions
//! placed on the FOLLOW set of the production's key. Any cell that would
//! receive two actions is a conflict and fails the build: the grammar
//! definition has to be fixed, the builder never picks a winner.
//!
//! Shared with the build script, so this file only depends on `std` and
//! `thiserror`.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::definition::{non_terminals, terminals, Notation, SyntaxExpression, EOF};
use super::table::{Action, SyntaxTable};

/// Two actions competing for one table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: usize,
    pub lookahead: String,
    pub actions: Vec<Action>,
}

impl Conflict {
    pub fn is_shift_reduce(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Shift(_)))
            && self.actions.iter().any(|a| matches!(a, Action::Reduce(_)))
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_shift_reduce() {
            "shift/reduce"
        } else {
            "reduce/reduce"
        };
        let actions: Vec<String> = self.actions.iter().map(Action::to_string).collect();
        write!(
            f,
            "{kind} conflict in state {} on '{}': {}",
            self.state,
            self.lookahead,
            actions.join(" vs ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("grammar has no productions")]
    Empty,
    #[error("{} conflict(s); first: {}", .0.len(), .0[0])]
    Conflicts(Vec<Conflict>),
}

/// An LR(0) item: production index (0 is the augmented start) and dot.
type Item = (usize, usize);
type ItemSet = BTreeSet<Item>;

struct Augmented<'a> {
    start: &'a str,
    expressions: &'a [SyntaxExpression],
}

impl<'a> Augmented<'a> {
    fn len(&self, production: usize) -> usize {
        if production == 0 {
            1
        } else {
            self.expressions[production - 1].sequence.len()
        }
    }

    /// Symbol after the dot, if any.
    fn next(&self, (production, dot): Item) -> Option<Notation> {
        if production == 0 {
            return (dot == 0).then(|| Notation::NonTerminal(self.start.to_string()));
        }
        self.expressions[production - 1].sequence.get(dot).cloned()
    }

    fn key(&self, production: usize) -> &'a str {
        if production == 0 {
            ""
        } else {
            &self.expressions[production - 1].key
        }
    }

    fn closure(&self, items: ItemSet) -> ItemSet {
        let mut set = items;
        let mut pending: Vec<Item> = set.iter().copied().collect();
        while let Some(item) = pending.pop() {
            if let Some(Notation::NonTerminal(nt)) = self.next(item) {
                for e in self.expressions.iter().filter(|e| e.key == nt) {
                    if set.insert((e.index, 0)) {
                        pending.push((e.index, 0));
                    }
                }
            }
        }
        set
    }

    fn goto(&self, set: &ItemSet, symbol: &Notation) -> ItemSet {
        let moved = set
            .iter()
            .filter(|item| self.next(**item).as_ref() == Some(symbol))
            .map(|(p, d)| (*p, d + 1))
            .collect();
        self.closure(moved)
    }
}

/// FIRST sets of every nonterminal. Productions are never empty, so no
/// nullable handling is needed.
fn first_sets(expressions: &[SyntaxExpression]) -> HashMap<String, HashSet<String>> {
    let mut first: HashMap<String, HashSet<String>> = HashMap::new();
    let mut changed = true;
    while changed {
        changed = false;
        for e in expressions {
            let add: HashSet<String> = match &e.sequence[0] {
                Notation::Terminal(t) => HashSet::from([t.clone()]),
                Notation::NonTerminal(nt) => first.get(nt).cloned().unwrap_or_default(),
            };
            let entry = first.entry(e.key.clone()).or_default();
            for t in add {
                changed |= entry.insert(t);
            }
        }
    }
    first
}

fn follow_sets(
    expressions: &[SyntaxExpression],
    first: &HashMap<String, HashSet<String>>,
    start: &str,
) -> HashMap<String, HashSet<String>> {
    let mut follow: HashMap<String, HashSet<String>> = HashMap::new();
    follow.entry(start.to_string()).or_default().insert(EOF.to_string());
    let mut changed = true;
    while changed {
        changed = false;
        for e in expressions {
            for (i, n) in e.sequence.iter().enumerate() {
                let Notation::NonTerminal(nt) = n else {
                    continue;
                };
                let add: HashSet<String> = match e.sequence.get(i + 1) {
                    Some(Notation::Terminal(t)) => HashSet::from([t.clone()]),
                    Some(Notation::NonTerminal(next)) => first.get(next).cloned().unwrap_or_default(),
                    None => follow.get(&e.key).cloned().unwrap_or_default(),
                };
                let entry = follow.entry(nt.clone()).or_default();
                for t in add {
                    changed |= entry.insert(t);
                }
            }
        }
    }
    follow
}

/// Build the SLR table for `expressions`. The first production's key is
/// the start symbol.
pub fn build(expressions: &[SyntaxExpression]) -> Result<SyntaxTable, BuildError> {
    let start = expressions.first().ok_or(BuildError::Empty)?.key.as_str();
    let grammar = Augmented { start, expressions };
    let terminal_names = terminals(expressions);
    let non_terminal_names = non_terminals(expressions);

    // Canonical collection, numbered in discovery order.
    let mut states: Vec<ItemSet> = vec![grammar.closure(ItemSet::from([(0, 0)]))];
    let mut index: HashMap<ItemSet, usize> = HashMap::from([(states[0].clone(), 0)]);
    let mut transitions: Vec<Vec<(Notation, usize)>> = Vec::new();
    let mut cursor = 0;
    while cursor < states.len() {
        let mut symbols: Vec<Notation> = Vec::new();
        for item in &states[cursor] {
            if let Some(symbol) = grammar.next(*item) {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        let mut edges = Vec::new();
        for symbol in symbols {
            let target = grammar.goto(&states[cursor], &symbol);
            let id = match index.get(&target) {
                Some(id) => *id,
                None => {
                    states.push(target.clone());
                    index.insert(target, states.len() - 1);
                    states.len() - 1
                }
            };
            edges.push((symbol, id));
        }
        transitions.push(edges);
        cursor += 1;
    }

    let first = first_sets(expressions);
    let follow = follow_sets(expressions, &first, start);

    let column: HashMap<&str, usize> = terminal_names
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    let nt_column: HashMap<&str, usize> = non_terminal_names
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut cells: Vec<Vec<Vec<Action>>> = vec![vec![Vec::new(); terminal_names.len()]; states.len()];
    let mut gotos: Vec<Vec<Option<usize>>> = vec![vec![None; non_terminal_names.len()]; states.len()];

    for (state, edges) in transitions.iter().enumerate() {
        for (symbol, target) in edges {
            match symbol {
                Notation::Terminal(t) => cells[state][column[t.as_str()]].push(Action::Shift(*target)),
                Notation::NonTerminal(nt) => gotos[state][nt_column[nt.as_str()]] = Some(*target),
            }
        }
    }
    for (state, items) in states.iter().enumerate() {
        for &(production, dot) in items {
            if dot < grammar.len(production) {
                continue;
            }
            if production == 0 {
                cells[state][column[EOF]].push(Action::Accept);
                continue;
            }
            let lookaheads = follow.get(grammar.key(production)).cloned().unwrap_or_default();
            let mut lookaheads: Vec<String> = lookaheads.into_iter().collect();
            lookaheads.sort();
            for t in lookaheads {
                cells[state][column[t.as_str()]].push(Action::Reduce(production));
            }
        }
    }

    let mut conflicts = Vec::new();
    let mut actions = Vec::with_capacity(states.len());
    for (state, row) in cells.into_iter().enumerate() {
        let mut action_row = Vec::with_capacity(row.len());
        for (i, mut cell) in row.into_iter().enumerate() {
            cell.dedup();
            if cell.len() > 1 {
                conflicts.push(Conflict {
                    state,
                    lookahead: terminal_names[i].clone(),
                    actions: cell.clone(),
                });
            }
            action_row.push(cell.first().copied());
        }
        actions.push(action_row);
    }
    if !conflicts.is_empty() {
        return Err(BuildError::Conflicts(conflicts));
    }

    Ok(SyntaxTable::new(terminal_names, non_terminal_names, actions, gotos))
}

#[cfg(test)]
mod tests {
    use super::super::definition::parse_definition;
    use super::*;

    #[test]
    fn expression_grammar_builds() {
        let exprs = parse_definition(
            "E -> E + T
             E -> T
             T -> T * F
             T -> F
             F -> ( E )
             F -> id",
        )
        .unwrap();
        let table = build(&exprs).unwrap();
        assert_eq!(table.state_count(), 12);
        assert_eq!(table.action(0, "id"), Some(Action::Shift(5)));
        assert!(table.expected(0).contains(&"(".to_string()));
    }

    #[test]
    fn ambiguous_grammar_fails_with_shift_reduce() {
        let exprs = parse_definition(
            "E -> E + E
             E -> id",
        )
        .unwrap();
        let err = build(&exprs).unwrap_err();
        let BuildError::Conflicts(conflicts) = &err else {
            panic!("expected conflicts, got {err:?}");
        };
        assert!(conflicts.iter().any(|c| c.is_shift_reduce() && c.lookahead == "+"));
        assert!(err.to_string().contains("shift/reduce"));
    }

    #[test]
    fn reduce_reduce_is_reported() {
        let exprs = parse_definition(
            "S -> A
             S -> B
             A -> x
             B -> x",
        )
        .unwrap();
        let Err(BuildError::Conflicts(conflicts)) = build(&exprs) else {
            panic!("expected conflicts");
        };
        assert!(conflicts.iter().all(|c| !c.is_shift_reduce()));
        assert_eq!(conflicts[0].lookahead, EOF);
    }

    #[test]
    fn build_is_deterministic() {
        let exprs = parse_definition(
            "L -> L , x
             L -> x",
        )
        .unwrap();
        assert_eq!(build(&exprs).unwrap().to_text(), build(&exprs).unwrap().to_text());
    }
}
