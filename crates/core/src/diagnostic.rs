//! Diagnostic collection and the per-stage result envelope.

use crate::error::Diagnose;
use crate::range::TextRange;
use serde::{Deserialize, Serialize};

/// A rendered diagnostic, detached from the stage error type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

impl<E: Diagnose> From<&E> for Diagnostic {
    fn from(e: &E) -> Self {
        Diagnostic {
            code: e.code(),
            message: e.to_string(),
            range: e.range(),
            info: e.info(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.range {
            Some(range) => write!(f, "[{}] {} (at {})", self.code, self.message, range),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Accumulates warnings and errors in insertion order. Recording never
/// aborts the caller.
#[derive(Debug, Clone)]
pub struct ErrorCollector<E> {
    warnings: Vec<E>,
    errors: Vec<E>,
}

impl<E> Default for ErrorCollector<E> {
    fn default() -> Self {
        ErrorCollector {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<E> ErrorCollector<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, e: E) {
        self.warnings.push(e);
    }

    pub fn error(&mut self, e: E) {
        self.errors.push(e);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warnings(&self) -> &[E] {
        &self.warnings
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Append everything `other` collected, converting into this
    /// collector's error type.
    pub fn merge<F: Into<E>>(&mut self, other: ErrorCollector<F>) {
        self.warnings.extend(other.warnings.into_iter().map(Into::into));
        self.errors.extend(other.errors.into_iter().map(Into::into));
    }

    /// Append a finished stage's diagnostics.
    pub fn absorb<T, F: Into<E>>(&mut self, result: AnalysisResult<T, F>) -> Option<T> {
        self.warnings.extend(result.warnings.into_iter().map(Into::into));
        self.errors.extend(result.errors.into_iter().map(Into::into));
        result.result
    }

    /// Finish: a stage with errors yields no result.
    pub fn finish<T>(self, result: Option<T>) -> AnalysisResult<T, E> {
        let result = if self.errors.is_empty() { result } else { None };
        AnalysisResult {
            result,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

/// A stage's output: a nullable result plus what was collected on the
/// way. `result.is_some()` with no errors is success; `None` means the
/// stage could not produce anything usable.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult<T, E> {
    pub result: Option<T>,
    pub warnings: Vec<E>,
    pub errors: Vec<E>,
}

impl<T, E> AnalysisResult<T, E> {
    pub fn ok(result: T, warnings: Vec<E>) -> Self {
        AnalysisResult {
            result: Some(result),
            warnings,
            errors: Vec::new(),
        }
    }

    pub fn failed(warnings: Vec<E>, errors: Vec<E>) -> Self {
        AnalysisResult {
            result: None,
            warnings,
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.errors.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AnalysisResult<U, E> {
        AnalysisResult {
            result: self.result.map(f),
            warnings: self.warnings,
            errors: self.errors,
        }
    }

    pub fn map_err<F>(self, f: impl Fn(E) -> F) -> AnalysisResult<T, F> {
        AnalysisResult {
            result: self.result,
            warnings: self.warnings.into_iter().map(&f).collect(),
            errors: self.errors.into_iter().map(&f).collect(),
        }
    }
}

impl<T, E: Diagnose> AnalysisResult<T, E> {
    pub fn warning_diagnostics(&self) -> Vec<Diagnostic> {
        self.warnings.iter().map(Diagnostic::from).collect()
    }

    pub fn error_diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.iter().map(Diagnostic::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, LexicalError};

    fn escape(at: usize) -> LexicalError {
        LexicalError::EscapeAtEnd { at }
    }

    #[test]
    fn collector_keeps_insertion_order() {
        let mut c = ErrorCollector::new();
        c.warning(escape(1));
        c.warning(escape(2));
        c.error(escape(3));
        assert!(c.has_warnings());
        assert!(c.has_errors());
        assert_eq!(c.warnings(), &[escape(1), escape(2)]);
    }

    #[test]
    fn merge_converts_error_type() {
        let mut lexical = ErrorCollector::new();
        lexical.error(escape(4));
        let mut all: ErrorCollector<CompileError> = ErrorCollector::new();
        all.merge(lexical);
        assert_eq!(all.errors(), &[CompileError::Lexical(escape(4))]);
    }

    #[test]
    fn finish_drops_result_on_errors() {
        let mut c: ErrorCollector<LexicalError> = ErrorCollector::new();
        assert!(c.clone().finish(Some(1)).is_success());
        c.error(escape(0));
        let r = c.finish(Some(1));
        assert_eq!(r.result, None);
        assert!(!r.is_success());
    }

    #[test]
    fn diagnostic_from_stage_error() {
        let d = Diagnostic::from(&escape(5));
        assert_eq!(d.code, 1003);
        assert_eq!(d.range, Some(TextRange::point(5)));
        assert_eq!(d.to_string(), format!("[1003] {} (at 5)", escape(5)));
    }
}
