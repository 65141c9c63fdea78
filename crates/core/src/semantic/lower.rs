//! Parse tree to AST. Shapes are checked against the grammar; anything
//! else is reported as an unsupported structure rather than trusted.

use crate::ast::{
    Direction, Element, ElementPrefix, Family, Predicate, RangeLiteral, Relation, SequenceItem, Sfp,
    StrPart, StrPath, Unary, Value, ValuePrefix,
};
use crate::error::SemanticError;
use crate::grammar::parser::{ParseChild, ParseNode};
use crate::lexer::{LexicalItem, Symbol};

type Lowered<T> = Result<T, SemanticError>;

fn unsupported(node: &ParseNode) -> SemanticError {
    let symbols: Vec<&str> = node
        .children
        .iter()
        .map(|c| match c {
            ParseChild::Node(n) => n.key.as_str(),
            ParseChild::Leaf(l) => l.terminal(),
        })
        .collect();
    SemanticError::UnsupportedStructure {
        production: format!("{} -> {}", node.key, symbols.join(" ")),
        range: node.range,
    }
}

fn expect<'a>(child: &'a ParseChild, key: &str, parent: &ParseNode) -> Lowered<&'a ParseNode> {
    match child {
        ParseChild::Node(n) if n.key == key => Ok(n),
        _ => Err(unsupported(parent)),
    }
}

fn symbol_of(child: &ParseChild) -> Option<Symbol> {
    child.as_leaf().and_then(LexicalItem::symbol)
}

/// Flatten a left-recursive list `L -> X | L sep X` into its `X`
/// children in source order.
fn left_list<'a>(node: &'a ParseNode, key: &str) -> Lowered<Vec<&'a ParseChild>> {
    let mut out = Vec::new();
    let mut current = node;
    loop {
        if current.key != key {
            return Err(unsupported(current));
        }
        match current.children.as_slice() {
            [only] => {
                out.push(only);
                break;
            }
            [ParseChild::Node(rest), .., last] if rest.key == key && current.children.len() <= 3 => {
                out.push(last);
                current = rest;
            }
            _ => return Err(unsupported(current)),
        }
    }
    out.reverse();
    Ok(out)
}

/// The `SEQUENCE_ITEM` nodes of a root `SEQUENCE`, in source order. Each
/// one is lowered on its own so a bad item does not hide its siblings.
pub fn sequence_items(root: &ParseNode) -> Lowered<Vec<&ParseNode>> {
    left_list(root, "SEQUENCE")?
        .into_iter()
        .map(|c| expect(c, "SEQUENCE_ITEM", root))
        .collect()
}

pub fn sequence_item(node: &ParseNode) -> Lowered<SequenceItem> {
    let Some((last, marks)) = node.children.split_last() else {
        return Err(unsupported(node));
    };
    let element = element(expect(last, "ELEMENT", node)?)?;
    let (exclude, source) = match marks.iter().map(symbol_of).collect::<Vec<_>>().as_slice() {
        [] => (false, false),
        [Some(Symbol::Caret)] => (false, true),
        [Some(Symbol::Minus)] => (true, false),
        [Some(Symbol::Minus), Some(Symbol::Caret)] => (true, true),
        _ => return Err(unsupported(node)),
    };
    Ok(SequenceItem {
        exclude,
        source,
        element,
        range: node.range,
    })
}

fn element(node: &ParseNode) -> Lowered<Element> {
    let (prefix, items) = match node.children.as_slice() {
        [items] => (None, items),
        [prefix, items] => {
            let prefix = expect(prefix, "ELEMENT_PREFIX", node)?;
            let symbol = match prefix.children.as_slice() {
                [leaf] => symbol_of(leaf),
                _ => None,
            };
            let prefix = match symbol {
                Some(Symbol::At) => ElementPrefix::At,
                Some(Symbol::Hash) => ElementPrefix::Hash,
                Some(Symbol::Dollar) => ElementPrefix::Dollar,
                _ => return Err(unsupported(prefix)),
            };
            (Some(prefix), items)
        }
        _ => return Err(unsupported(node)),
    };
    let items_node = expect(items, "ELEMENT_ITEM", node)?;
    let items = left_list(items_node, "ELEMENT_ITEM")?
        .into_iter()
        .map(|c| sfp(expect(c, "SFP", items_node)?))
        .collect::<Lowered<Vec<_>>>()?;
    Ok(Element {
        prefix,
        items,
        range: node.range,
    })
}

fn sfp(node: &ParseNode) -> Lowered<Sfp> {
    let (subject, tail) = match node.children.as_slice() {
        [subject] => (subject, None),
        [subject, unary] => (subject, Some((unary, None))),
        [subject, family, predicative] => (subject, Some((family, Some(predicative)))),
        _ => return Err(unsupported(node)),
    };
    let subject = expect(subject, "SUBJECT", node)?;
    let subject = match subject.children.as_slice() {
        [s] => string(expect(s, "STRING", subject)?)?,
        _ => return Err(unsupported(subject)),
    };
    let (relation, unary) = match tail {
        None => (None, None),
        Some((unary_child, None)) => {
            let unary = unary(expect(unary_child, "UNARY_FAMILY", node)?)?;
            (None, Some(unary))
        }
        Some((family_child, Some(predicative))) => {
            let family_node = expect(family_child, "FAMILY", node)?;
            let family = match family_node.children.as_slice() {
                [leaf] => match symbol_of(leaf) {
                    Some(Symbol::Colon) => Family::Equal,
                    Some(Symbol::Gt) => Family::Gt,
                    Some(Symbol::Gte) => Family::Gte,
                    Some(Symbol::Lt) => Family::Lt,
                    Some(Symbol::Lte) => Family::Lte,
                    Some(Symbol::Tilde) => Family::Match,
                    _ => return Err(unsupported(family_node)),
                },
                _ => return Err(unsupported(family_node)),
            };
            let predicative = expect(predicative, "PREDICATIVE", node)?;
            let relation = Relation {
                family,
                predicate: predicate(predicative)?,
                range: family_node.range.cover(&predicative.range),
            };
            (Some(relation), None)
        }
    };
    Ok(Sfp {
        subject,
        relation,
        unary,
        range: node.range,
    })
}

fn unary(node: &ParseNode) -> Lowered<Unary> {
    let direction = match node.children.as_slice() {
        [leaf] => match symbol_of(leaf) {
            Some(Symbol::TildePlus) => Direction::Ascending,
            Some(Symbol::TildeMinus) => Direction::Descending,
            _ => return Err(unsupported(node)),
        },
        _ => return Err(unsupported(node)),
    };
    Ok(Unary {
        direction,
        range: node.range,
    })
}

fn predicate(node: &ParseNode) -> Lowered<Predicate> {
    let [inner] = node.children.as_slice() else {
        return Err(unsupported(node));
    };
    let Some(inner) = inner.as_node() else {
        return Err(unsupported(node));
    };
    match inner.key.as_str() {
        "VALUE_LIST" => left_list(inner, "VALUE_LIST")?
            .into_iter()
            .map(|c| value(expect(c, "VALUE", inner)?))
            .collect::<Lowered<Vec<_>>>()
            .map(Predicate::Values),
        "COLLECTION" => collection(inner).map(Predicate::Collection),
        "RANGE" => range(inner).map(Predicate::Range),
        _ => Err(unsupported(node)),
    }
}

fn value(node: &ParseNode) -> Lowered<Value> {
    let (prefix, path) = match node.children.as_slice() {
        [path] => (ValuePrefix::default(), path),
        [prefix, path] => {
            let prefix_node = expect(prefix, "VALUE_PREFIX", node)?;
            let symbols: Vec<Option<Symbol>> = prefix_node.children.iter().map(symbol_of).collect();
            let prefix = match symbols.as_slice() {
                [Some(Symbol::Plus)] => (Some(Direction::Ascending), false),
                [Some(Symbol::Minus)] => (Some(Direction::Descending), false),
                [Some(Symbol::Caret)] => (None, true),
                [Some(Symbol::Plus), Some(Symbol::Caret)] => (Some(Direction::Ascending), true),
                [Some(Symbol::Minus), Some(Symbol::Caret)] => (Some(Direction::Descending), true),
                _ => return Err(unsupported(prefix_node)),
            };
            (
                ValuePrefix {
                    direction: prefix.0,
                    source: prefix.1,
                },
                path,
            )
        }
        _ => return Err(unsupported(node)),
    };
    Ok(Value {
        prefix,
        path: string(expect(path, "STRING", node)?)?,
        range: node.range,
    })
}

fn collection(node: &ParseNode) -> Lowered<Vec<StrPath>> {
    match node.children.as_slice() {
        [_, _] => Ok(Vec::new()),
        [_, items, _] => {
            let items_node = expect(items, "COLLECTION_ITEM", node)?;
            left_list(items_node, "COLLECTION_ITEM")?
                .into_iter()
                .map(|c| string(expect(c, "STRING", items_node)?))
                .collect()
        }
        _ => Err(unsupported(node)),
    }
}

fn range(node: &ParseNode) -> Lowered<RangeLiteral> {
    match node.children.as_slice() {
        [begin, _, end] => Ok(RangeLiteral {
            begin: string(expect(begin, "STRING", node)?)?,
            end: string(expect(end, "STRING", node)?)?,
            bounds: None,
        }),
        [open, begin, _, end, close] => {
            let bracket = |child: &ParseChild, key: &str| -> Lowered<Option<Symbol>> {
                let n = expect(child, key, node)?;
                Ok(n.children.first().and_then(symbol_of))
            };
            let include_begin = match bracket(open, "RANGE_BEGIN")? {
                Some(Symbol::LBracket) => true,
                Some(Symbol::LParen) => false,
                _ => return Err(unsupported(node)),
            };
            let include_end = match bracket(close, "RANGE_END")? {
                Some(Symbol::RBracket) => true,
                Some(Symbol::RParen) => false,
                _ => return Err(unsupported(node)),
            };
            Ok(RangeLiteral {
                begin: string(expect(begin, "STRING", node)?)?,
                end: string(expect(end, "STRING", node)?)?,
                bounds: Some((include_begin, include_end)),
            })
        }
        _ => Err(unsupported(node)),
    }
}

fn string(node: &ParseNode) -> Lowered<StrPath> {
    let parts = left_list(node, "STRING")?
        .into_iter()
        .map(|c| match c.as_leaf().and_then(|l| l.as_str().map(|s| (s, l.range))) {
            Some(((value, kind), range)) => Ok(StrPart {
                value: value.to_string(),
                kind,
                range,
            }),
            None => Err(unsupported(node)),
        })
        .collect::<Lowered<Vec<_>>>()?;
    Ok(StrPath { parts })
}
