//! Compiler options and their partial-update form.

use serde::{Deserialize, Serialize};

use crate::lexer::LexicalOptions;
use crate::opt::Opt;

/// Which ends of an `a..b` range are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBounds {
    pub include_begin: bool,
    pub include_end: bool,
}

impl RangeBounds {
    /// `a..b` includes both ends unless configured otherwise.
    pub const DEFAULT: RangeBounds = RangeBounds {
        include_begin: true,
        include_end: true,
    };
}

impl Default for RangeBounds {
    fn default() -> Self {
        RangeBounds::DEFAULT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub lexical: LexicalOptions,
    pub range_bounds: RangeBounds,
    /// Maximum number of forecast suggestions; `None` is unlimited.
    pub forecast_limit: Option<usize>,
    /// Warn when one element item unions more entities than this.
    pub warning_limit_of_union_items: Option<usize>,
    /// Warn when the query intersects more element items than this.
    pub warning_limit_of_intersect_items: Option<usize>,
    /// Year of dates written as `MM` or `MM-dd`; `None` reads the clock.
    pub current_year: Option<i32>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            lexical: LexicalOptions::default(),
            range_bounds: RangeBounds::DEFAULT,
            forecast_limit: Some(10),
            warning_limit_of_union_items: Some(32),
            warning_limit_of_intersect_items: Some(16),
            current_year: None,
        }
    }
}

/// A partial update of [`CompilerOptions`]. Missing keys keep the current
/// value, `null` clears a limit, a value replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsPatch {
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub chinese_symbol_reflect: Opt<bool>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub translate_underscore_to_space: Opt<bool>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub range_bounds: Opt<RangeBounds>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub forecast_limit: Opt<usize>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub warning_limit_of_union_items: Opt<usize>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub warning_limit_of_intersect_items: Opt<usize>,
    #[serde(default, skip_serializing_if = "Opt::is_unset")]
    pub current_year: Opt<i32>,
}

impl CompilerOptions {
    pub fn apply(&mut self, patch: OptionsPatch) {
        patch
            .chinese_symbol_reflect
            .assign_to(&mut self.lexical.chinese_symbol_reflect);
        patch
            .translate_underscore_to_space
            .assign_to(&mut self.lexical.translate_underscore_to_space);
        patch.range_bounds.assign_to(&mut self.range_bounds);
        patch.forecast_limit.merge_into(&mut self.forecast_limit);
        patch
            .warning_limit_of_union_items
            .merge_into(&mut self.warning_limit_of_union_items);
        patch
            .warning_limit_of_intersect_items
            .merge_into(&mut self.warning_limit_of_intersect_items);
        patch.current_year.merge_into(&mut self.current_year);
    }
}
