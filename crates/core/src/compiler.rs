//! The compiler: lexer, parser, analyzer and translator run in order
//! over one query text.
//!
//! Each stage collects its diagnostics and hands its output to the next.
//! A stage is skipped only when the previous one produced nothing; any
//! error anywhere withholds the plan, warnings never do.

use crate::diagnostic::{AnalysisResult, ErrorCollector};
use crate::error::{CompileError, LexicalError};
use crate::grammar::parser::{NoHook, ParseHook, ParseNode, SlrParser};
use crate::grammar::{Grammar, GrammarLoadError};
use crate::lexer::{self, LexicalItem};
use crate::lookup::MetadataLookup;
use crate::options::CompilerOptions;
use crate::semantic::{self, SemanticTree};
use crate::translator::{self, Forecast, QueryPlan};

/// Holds the immutable grammar and the options every compilation uses.
/// Shareable across threads; each call allocates its own state.
#[derive(Debug, Clone)]
pub struct Compiler {
    grammar: Grammar,
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(grammar: Grammar, options: CompilerOptions) -> Self {
        Compiler { grammar, options }
    }

    /// A compiler over the embedded query grammar.
    pub fn load(options: CompilerOptions) -> Result<Compiler, GrammarLoadError> {
        Ok(Compiler::new(Grammar::load()?, options))
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn lex(&self, text: &str) -> AnalysisResult<Vec<LexicalItem>, LexicalError> {
        lexer::analyze(text, &self.options.lexical)
    }

    pub fn parse(&self, text: &str) -> AnalysisResult<ParseNode, CompileError> {
        self.parse_with_hook(text, &mut NoHook)
    }

    /// Parse with `hook` observing every parser transition.
    pub fn parse_with_hook(
        &self,
        text: &str,
        hook: &mut dyn ParseHook,
    ) -> AnalysisResult<ParseNode, CompileError> {
        let mut collector = ErrorCollector::new();
        let root = self.front(text, hook, &mut collector);
        collector.finish(root)
    }

    /// Lex, parse and analyze. An empty query analyzes to an empty tree.
    pub fn analyze(
        &self,
        text: &str,
        lookup: &dyn MetadataLookup,
    ) -> AnalysisResult<SemanticTree, CompileError> {
        let mut collector = ErrorCollector::new();
        let tree = self.analyze_into(text, lookup, &mut collector);
        collector.finish(tree)
    }

    /// Compile `text` into a query plan.
    pub fn compile(
        &self,
        text: &str,
        lookup: &dyn MetadataLookup,
    ) -> AnalysisResult<QueryPlan, CompileError> {
        let mut collector = ErrorCollector::new();
        let plan = self
            .analyze_into(text, lookup, &mut collector)
            .and_then(|tree| collector.absorb(translator::to_query_plan(tree, &self.options)));
        tracing::debug!(
            warnings = collector.warnings().len(),
            errors = collector.errors().len(),
            "compilation finished"
        );
        collector.finish(plan)
    }

    /// Completion suggestions for the word under `cursor`, a character
    /// offset into `text`. Lexical errors do not prevent a forecast.
    pub fn forecast(
        &self,
        text: &str,
        cursor: usize,
        lookup: &dyn MetadataLookup,
    ) -> Option<Forecast> {
        let tokens = self.lex(text).result?;
        translator::forecast(&tokens, cursor, lookup, &self.options)
    }

    fn front(
        &self,
        text: &str,
        hook: &mut dyn ParseHook,
        collector: &mut ErrorCollector<CompileError>,
    ) -> Option<ParseNode> {
        let tokens = collector.absorb(self.lex(text))?;
        collector.absorb(SlrParser::new(&self.grammar).parse_with_hook(&tokens, hook))
    }

    fn analyze_into(
        &self,
        text: &str,
        lookup: &dyn MetadataLookup,
        collector: &mut ErrorCollector<CompileError>,
    ) -> Option<SemanticTree> {
        match self.front(text, &mut NoHook, collector) {
            Some(root) => collector.absorb(semantic::analyze(&root, lookup, &self.options)),
            None if collector.has_errors() => None,
            None => Some(SemanticTree::default()),
        }
    }
}
