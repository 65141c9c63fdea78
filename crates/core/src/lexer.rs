use crate::diagnostic::{AnalysisResult, ErrorCollector};
use crate::error::LexicalError;
use crate::range::TextRange;
use serde::{Deserialize, Serialize};

/// Whitespace separating items. Never emitted.
pub const SPACES: &[char] = &[' ', '\n', '\r', '\t'];

/// `\x` escapes recognised inside quoted strings.
pub const ESCAPES: &[(char, char)] = &[
    ('n', '\n'),
    ('t', '\t'),
    ('r', '\r'),
    ('"', '"'),
    ('`', '`'),
    ('\'', '\''),
    ('\\', '\\'),
];

/// Every ASCII character with a meaning in the query language. A name
/// containing any of these must be quoted to be typed as one item.
pub const SIGNIFICANT_SYMBOLS: &[char] = &[
    '~', '`', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '-', '=', '_', '+', '[', ']', '{',
    '}', ';', ':', '\'', '"', ',', '.', '/', '\\', '|', '?', '<', '>',
];

/// Significant symbols a bare word may contain after its first character.
pub const RESTRICTED_MIDDLE: &[char] = &['_', '?', '*', '+', '-', '!'];

/// Characters that cannot start any item.
pub const DISALLOWED_START: &[char] = &['!', '%', '=', ';', '\\'];

/// Full-width punctuation mapped to ASCII when `chinese_symbol_reflect` is on.
const FULL_WIDTH: &[(char, char)] = &[
    ('：', ':'),
    ('＞', '>'),
    ('＜', '<'),
    ('～', '~'),
    ('｜', '|'),
    ('／', '/'),
    ('＆', '&'),
    ('－', '-'),
    ('＋', '+'),
    ('＠', '@'),
    ('＃', '#'),
    ('＄', '$'),
    ('＾', '^'),
    ('。', '.'),
    ('，', ','),
    ('【', '['),
    ('】', ']'),
    ('（', '('),
    ('）', ')'),
    ('｛', '{'),
    ('｝', '}'),
];

/// Punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    Colon,
    Gt,
    Gte,
    Lt,
    Lte,
    Tilde,
    /// `~+`
    TildePlus,
    /// `~-`
    TildeMinus,
    Pipe,
    Slash,
    Amp,
    Minus,
    Plus,
    At,
    Hash,
    Dollar,
    Caret,
    Dot,
    DotDot,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
}

impl Symbol {
    pub fn from_char(c: char) -> Option<Symbol> {
        Some(match c {
            ':' => Symbol::Colon,
            '>' => Symbol::Gt,
            '<' => Symbol::Lt,
            '~' => Symbol::Tilde,
            '|' => Symbol::Pipe,
            '/' => Symbol::Slash,
            '&' => Symbol::Amp,
            '-' => Symbol::Minus,
            '+' => Symbol::Plus,
            '@' => Symbol::At,
            '#' => Symbol::Hash,
            '$' => Symbol::Dollar,
            '^' => Symbol::Caret,
            '.' => Symbol::Dot,
            ',' => Symbol::Comma,
            '[' => Symbol::LBracket,
            ']' => Symbol::RBracket,
            '(' => Symbol::LParen,
            ')' => Symbol::RParen,
            '{' => Symbol::LBrace,
            '}' => Symbol::RBrace,
            _ => return None,
        })
    }

    /// The two-character symbol starting with `self` and followed by `next`.
    fn extend(self, next: char) -> Option<Symbol> {
        match (self, next) {
            (Symbol::Gt, '=') => Some(Symbol::Gte),
            (Symbol::Lt, '=') => Some(Symbol::Lte),
            (Symbol::Dot, '.') => Some(Symbol::DotDot),
            (Symbol::Tilde, '+') => Some(Symbol::TildePlus),
            (Symbol::Tilde, '-') => Some(Symbol::TildeMinus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Colon => ":",
            Symbol::Gt => ">",
            Symbol::Gte => ">=",
            Symbol::Lt => "<",
            Symbol::Lte => "<=",
            Symbol::Tilde => "~",
            Symbol::TildePlus => "~+",
            Symbol::TildeMinus => "~-",
            Symbol::Pipe => "|",
            Symbol::Slash => "/",
            Symbol::Amp => "&",
            Symbol::Minus => "-",
            Symbol::Plus => "+",
            Symbol::At => "@",
            Symbol::Hash => "#",
            Symbol::Dollar => "$",
            Symbol::Caret => "^",
            Symbol::Dot => ".",
            Symbol::DotDot => "..",
            Symbol::Comma => ",",
            Symbol::LBracket => "[",
            Symbol::RBracket => "]",
            Symbol::LParen => "(",
            Symbol::RParen => ")",
            Symbol::LBrace => "{",
            Symbol::RBrace => "}",
        }
    }
}

/// How a string item was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrKind {
    /// A bare word.
    Restricted,
    /// `'...'`
    Apostrophe,
    /// `"..."`
    DoubleQuotes,
    /// `` `...` ``, a literal identifier matched exactly.
    Backticks,
}

impl StrKind {
    /// Quoted free text, as opposed to a name.
    pub fn is_text(&self) -> bool {
        matches!(self, StrKind::Apostrophe | StrKind::DoubleQuotes)
    }

    pub fn is_exact(&self) -> bool {
        !matches!(self, StrKind::Restricted)
    }

    pub fn quote(&self) -> Option<char> {
        match self {
            StrKind::Restricted => None,
            StrKind::Apostrophe => Some('\''),
            StrKind::DoubleQuotes => Some('"'),
            StrKind::Backticks => Some('`'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Morpheme {
    Str { value: String, kind: StrKind },
    Symbol { symbol: Symbol },
}

/// One token with its character range in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexicalItem {
    pub morpheme: Morpheme,
    pub range: TextRange,
}

impl LexicalItem {
    /// Grammar terminal this item is read as.
    pub fn terminal(&self) -> &'static str {
        match &self.morpheme {
            Morpheme::Str { .. } => "str",
            Morpheme::Symbol { symbol } => symbol.as_str(),
        }
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match &self.morpheme {
            Morpheme::Symbol { symbol } => Some(*symbol),
            Morpheme::Str { .. } => None,
        }
    }

    pub fn as_str(&self) -> Option<(&str, StrKind)> {
        match &self.morpheme {
            Morpheme::Str { value, kind } => Some((value, *kind)),
            Morpheme::Symbol { .. } => None,
        }
    }

    pub fn begin(&self) -> usize {
        self.range.begin
    }

    pub fn end(&self) -> usize {
        self.range.end_or_next()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalOptions {
    /// Read full-width punctuation and curly quotes as their ASCII forms.
    pub chinese_symbol_reflect: bool,
    /// Replace `_` with a space inside bare words.
    pub translate_underscore_to_space: bool,
}

/// Split `text` into lexical items. Errors never stop the scan: an
/// unrecognized span is skipped and reported, an unterminated string is
/// reported and still emitted.
pub fn analyze(text: &str, options: &LexicalOptions) -> AnalysisResult<Vec<LexicalItem>, LexicalError> {
    let mut lexer = Lexer {
        chars: text.chars().collect(),
        options,
        collector: ErrorCollector::new(),
        items: Vec::new(),
    };
    lexer.run();
    tracing::debug!(
        items = lexer.items.len(),
        warnings = lexer.collector.warnings().len(),
        errors = lexer.collector.errors().len(),
        "lexical analysis finished"
    );
    let Lexer {
        collector, items, ..
    } = lexer;
    AnalysisResult {
        result: Some(items),
        warnings: collector.warnings().to_vec(),
        errors: collector.errors().to_vec(),
    }
}

struct Lexer<'a> {
    chars: Vec<char>,
    options: &'a LexicalOptions,
    collector: ErrorCollector<LexicalError>,
    items: Vec<LexicalItem>,
}

impl Lexer<'_> {
    fn run(&mut self) {
        let mut pos = 0usize;
        while pos < self.chars.len() {
            let c = self.chars[pos];

            if SPACES.contains(&c) {
                pos += 1;
                continue;
            }

            if let Some(symbol) = self.symbol_of(c) {
                let (symbol, width) = match self.chars.get(pos + 1).and_then(|&n| {
                    self.reflect(n).and_then(|n| symbol.extend(n))
                }) {
                    Some(double) => (double, 2),
                    None => (symbol, 1),
                };
                self.push(Morpheme::Symbol { symbol }, pos, pos + width);
                pos += width;
                continue;
            }

            if let Some((kind, close)) = self.string_bound(c) {
                pos = self.quoted(pos, kind, close);
                continue;
            }

            if !DISALLOWED_START.contains(&c) {
                pos = self.restricted(pos);
                continue;
            }

            // Unrecognized: skip to the next separator or recognized symbol.
            let mut end = pos + 1;
            while end < self.chars.len() && !self.is_boundary(self.chars[end]) {
                end += 1;
            }
            let skipped: String = self.chars[pos..end].iter().collect();
            self.collector.error(LexicalError::UnrecognizedSymbol {
                text: skipped,
                range: TextRange::new(pos, end),
            });
            pos = end;
        }
    }

    fn push(&mut self, morpheme: Morpheme, begin: usize, end: usize) {
        self.items.push(LexicalItem {
            morpheme,
            range: TextRange::new(begin, end),
        });
    }

    /// `c` itself, or its ASCII form when full-width reflection is enabled.
    fn reflect(&self, c: char) -> Option<char> {
        if c.is_ascii() {
            return Some(c);
        }
        if self.options.chinese_symbol_reflect {
            FULL_WIDTH.iter().find(|(w, _)| *w == c).map(|(_, a)| *a)
        } else {
            Some(c)
        }
    }

    fn symbol_of(&self, c: char) -> Option<Symbol> {
        self.reflect(c).and_then(Symbol::from_char)
    }

    fn string_bound(&self, c: char) -> Option<(StrKind, char)> {
        match c {
            '\'' => Some((StrKind::Apostrophe, '\'')),
            '"' => Some((StrKind::DoubleQuotes, '"')),
            '`' => Some((StrKind::Backticks, '`')),
            '“' if self.options.chinese_symbol_reflect => Some((StrKind::DoubleQuotes, '”')),
            '‘' if self.options.chinese_symbol_reflect => Some((StrKind::Apostrophe, '’')),
            _ => None,
        }
    }

    fn is_boundary(&self, c: char) -> bool {
        SPACES.contains(&c) || self.symbol_of(c).is_some() || self.string_bound(c).is_some()
    }

    /// Whether `c` ends a bare word.
    fn ends_restricted(&self, c: char) -> bool {
        if SPACES.contains(&c) {
            return true;
        }
        let c = self.reflect(c).unwrap_or(c);
        SIGNIFICANT_SYMBOLS.contains(&c) && !RESTRICTED_MIDDLE.contains(&c)
    }

    fn restricted(&mut self, begin: usize) -> usize {
        let mut end = begin + 1;
        while end < self.chars.len() && !self.ends_restricted(self.chars[end]) {
            end += 1;
        }
        let mut value: String = self.chars[begin..end].iter().collect();
        if self.options.translate_underscore_to_space {
            value = value.replace('_', " ");
        }
        self.push(
            Morpheme::Str {
                value,
                kind: StrKind::Restricted,
            },
            begin,
            end,
        );
        end
    }

    fn quoted(&mut self, begin: usize, kind: StrKind, close: char) -> usize {
        let mut value = String::new();
        let mut pos = begin + 1;
        loop {
            if pos >= self.chars.len() {
                self.collector.error(LexicalError::UnterminatedString {
                    quote: self.chars[begin],
                    range: TextRange::new(begin, self.chars.len()),
                });
                self.push(Morpheme::Str { value, kind }, begin, self.chars.len());
                return self.chars.len();
            }
            let c = self.chars[pos];
            if c == close {
                self.push(Morpheme::Str { value, kind }, begin, pos + 1);
                return pos + 1;
            }
            if c == '\\' {
                pos += 1;
                match self.chars.get(pos) {
                    None => {
                        self.collector.warning(LexicalError::EscapeAtEnd { at: pos });
                        continue;
                    }
                    Some(&escaped) => match ESCAPES.iter().find(|(k, _)| *k == escaped) {
                        Some((_, resolved)) => value.push(*resolved),
                        None => {
                            self.collector.warning(LexicalError::NormalCharacterEscaped {
                                ch: escaped,
                                at: pos,
                            });
                            value.push(escaped);
                        }
                    },
                }
                pos += 1;
                continue;
            }
            value.push(c);
            pos += 1;
        }
    }
}

/// Quote `name` so it lexes back as a single string item, or return it
/// unchanged when it is already a valid bare word.
pub fn quote_if_needed(name: &str, quote_char: char) -> String {
    let bare = !name.is_empty()
        && name.chars().enumerate().all(|(i, c)| {
            if SPACES.contains(&c) {
                return false;
            }
            if i == 0 && (DISALLOWED_START.contains(&c) || Symbol::from_char(c).is_some()) {
                return false;
            }
            !SIGNIFICANT_SYMBOLS.contains(&c) || RESTRICTED_MIDDLE.contains(&c)
        });
    if bare {
        return name.to_string();
    }
    quote(name, quote_char)
}

/// Wrap `text` in `quote`, escaping what would end or break the string.
pub fn quote(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        if let Some((k, _)) = ESCAPES.iter().find(|(_, v)| *v == c) {
            if c == '\\' || c == quote || c.is_control() {
                out.push('\\');
                out.push(*k);
                continue;
            }
        }
        out.push(c);
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> AnalysisResult<Vec<LexicalItem>, LexicalError> {
        analyze(text, &LexicalOptions::default())
    }

    fn terminals(text: &str) -> Vec<&'static str> {
        lex(text)
            .result
            .unwrap()
            .iter()
            .map(LexicalItem::terminal)
            .collect()
    }

    fn strings(text: &str) -> Vec<(String, StrKind)> {
        lex(text)
            .result
            .unwrap()
            .iter()
            .filter_map(|i| i.as_str().map(|(v, k)| (v.to_string(), k)))
            .collect()
    }

    #[test]
    fn whitespace_is_not_emitted() {
        assert_eq!(terminals("  a \t b\n"), vec!["str", "str"]);
    }

    #[test]
    fn field_with_range() {
        assert_eq!(terminals("size:10..20"), vec!["str", ":", "str", "..", "str"]);
        assert_eq!(terminals("score>=5"), vec!["str", ">=", "str"]);
    }

    #[test]
    fn tilde_pairs_with_a_direction() {
        assert_eq!(terminals("ch.b~+"), vec!["str", ".", "str", "~+"]);
        assert_eq!(terminals("b~- desc~x"), vec!["str", "~-", "str", "~", "str"]);
    }

    #[test]
    fn bare_word_keeps_middle_symbols() {
        assert_eq!(
            strings("create-time a+b x!"),
            vec![
                ("create-time".to_string(), StrKind::Restricted),
                ("a+b".to_string(), StrKind::Restricted),
                ("x!".to_string(), StrKind::Restricted),
            ]
        );
        assert_eq!(terminals("-tag"), vec!["-", "str"]);
        assert_eq!(terminals("a.b"), vec!["str", ".", "str"]);
    }

    #[test]
    fn wildcard_can_start_a_word() {
        assert_eq!(strings("*cat?"), vec![("*cat?".to_string(), StrKind::Restricted)]);
    }

    #[test]
    fn ranges_are_character_offsets() {
        let items = lex("topic:fo").result.unwrap();
        assert_eq!(items[0].range, TextRange::new(0, 5));
        assert_eq!(items[1].range, TextRange::new(5, 6));
        assert_eq!(items[2].range, TextRange::new(6, 8));
    }

    #[test]
    fn quoted_strings_and_escapes() {
        assert_eq!(
            strings(r#""a b" 'c\'d' `e\`f`"#),
            vec![
                ("a b".to_string(), StrKind::DoubleQuotes),
                ("c'd".to_string(), StrKind::Apostrophe),
                ("e`f".to_string(), StrKind::Backticks),
            ]
        );
    }

    #[test]
    fn escaping_a_normal_char_warns() {
        let r = lex(r#""\q""#);
        assert!(r.errors.is_empty());
        assert_eq!(
            r.warnings,
            vec![LexicalError::NormalCharacterEscaped { ch: 'q', at: 2 }]
        );
        assert_eq!(strings(r#""\q""#)[0].0, "q");
    }

    #[test]
    fn unterminated_string_is_an_error_but_emitted() {
        let r = lex("tag:`abc");
        assert_eq!(
            r.errors,
            vec![LexicalError::UnterminatedString {
                quote: '`',
                range: TextRange::new(4, 8),
            }]
        );
        let items = r.result.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].as_str(), Some(("abc", StrKind::Backticks)));
    }

    #[test]
    fn escape_at_end_warns() {
        let r = lex("'ab\\");
        assert_eq!(r.warnings, vec![LexicalError::EscapeAtEnd { at: 4 }]);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn unrecognized_span_is_skipped_once() {
        let r = lex("a %%bad:c =x");
        assert_eq!(
            r.errors,
            vec![
                LexicalError::UnrecognizedSymbol {
                    text: "%%bad".into(),
                    range: TextRange::new(2, 7),
                },
                LexicalError::UnrecognizedSymbol {
                    text: "=x".into(),
                    range: TextRange::new(10, 12),
                },
            ]
        );
        let items = r.result.unwrap();
        let kept: Vec<_> = items.iter().map(LexicalItem::terminal).collect();
        assert_eq!(kept, vec!["str", ":", "str"]);
    }

    #[test]
    fn full_width_reflection() {
        let options = LexicalOptions {
            chinese_symbol_reflect: true,
            ..Default::default()
        };
        let r = analyze("tag：“猫 咪”", &options);
        let items = r.result.unwrap();
        assert_eq!(items[1].terminal(), ":");
        assert_eq!(items[2].as_str(), Some(("猫 咪", StrKind::DoubleQuotes)));
        assert!(r.errors.is_empty());
    }

    #[test]
    fn full_width_is_plain_text_without_reflection() {
        assert_eq!(strings("a：b").len(), 1);
    }

    #[test]
    fn underscore_translation() {
        let options = LexicalOptions {
            translate_underscore_to_space: true,
            ..Default::default()
        };
        let items = analyze("blue_sky", &options).result.unwrap();
        assert_eq!(items[0].as_str(), Some(("blue sky", StrKind::Restricted)));
    }

    #[test]
    fn quote_if_needed_round_trips() {
        for name in ["plain", "a-b", "has space", "a:b", "-lead", "we'ird", "x`y", "back\\slash"] {
            let quoted = quote_if_needed(name, '`');
            let items = lex(&quoted).result.unwrap();
            assert_eq!(items.len(), 1, "{quoted}");
            assert_eq!(items[0].as_str().map(|(v, _)| v), Some(name), "{quoted}");
        }
        assert_eq!(quote_if_needed("plain", '`'), "plain");
        assert_eq!(quote_if_needed("a:b", '`'), "`a:b`");
    }

    #[test]
    fn quote_always_wraps() {
        assert_eq!(quote("plain", '"'), "\"plain\"");
        assert_eq!(quote("say \"hi\"", '"'), r#""say \"hi\"""#);
        assert_eq!(quote("it's", '"'), "\"it's\"");
    }
}
