//! pixql-core: the query-language compiler behind the image library's
//! search box.
//!
//! Query text goes through four stages: the lexer, the table-driven SLR
//! parser, the semantic analyzer (names resolved through a
//! [`MetadataLookup`]) and the translator, which yields a [`QueryPlan`]
//! for the storage layer or a [`Forecast`] for autocompletion.
//!
//! # Public API
//!
//! - [`Compiler`] -- runs the whole pipeline over one query
//! - [`Grammar`] -- the immutable grammar and its SLR table
//! - [`CompilerOptions`] / [`OptionsPatch`] -- configuration
//! - [`MetadataLookup`] -- the metadata oracle; [`MetadataSnapshot`] is an
//!   in-memory implementation
//! - [`AnalysisResult`] / [`Diagnostic`] -- stage results and diagnostics
//!
//! Each stage entry point is re-exported too, for running stages
//! selectively.

pub mod alias;
pub mod ast;
pub mod composition;
pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod lookup;
pub mod opt;
pub mod options;
pub mod range;
pub mod semantic;
pub mod translator;

// ── Convenience re-exports: key types ────────────────────────────────

pub use compiler::Compiler;
pub use diagnostic::{AnalysisResult, Diagnostic, ErrorCollector};
pub use error::{CompileError, Diagnose, GrammarError, LexicalError, SemanticError, TranslationError};
pub use grammar::{Grammar, GrammarLoadError};
pub use lexer::{LexicalItem, LexicalOptions};
pub use lookup::{MetaEntity, MetaKind, MetadataLookup, MetadataSnapshot};
pub use opt::Opt;
pub use options::{CompilerOptions, OptionsPatch, RangeBounds};
pub use range::TextRange;
pub use semantic::SemanticTree;
pub use translator::{Forecast, QueryPlan};

// ── Convenience re-exports: stage entry points ───────────────────────

pub use lexer::analyze as lex;
pub use semantic::analyze;
pub use translator::{forecast, to_query_plan, to_query_text};
