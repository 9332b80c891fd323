//! Model configuration.

use crate::line_ending::LineEnding;

/// Default for [`TextModelOptions::max_undo_depth`].
pub const DEFAULT_MAX_UNDO_DEPTH: usize = 1000;

/// Configuration of a [`crate::TextModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextModelOptions {
    /// Line ending used when the initial text has no line break.
    pub default_eol: LineEnding,
    /// Remove whitespace-only lines left behind by auto-indentation on the next edit.
    pub trim_auto_whitespace: bool,
    /// Maximum number of undo steps kept. `0` disables undo history.
    pub max_undo_depth: usize,
}

impl Default for TextModelOptions {
    fn default() -> Self {
        Self {
            default_eol: LineEnding::Lf,
            trim_auto_whitespace: true,
            max_undo_depth: DEFAULT_MAX_UNDO_DEPTH,
        }
    }
}

impl TextModelOptions {
    /// Set [`TextModelOptions::default_eol`].
    pub fn with_default_eol(mut self, eol: LineEnding) -> Self {
        self.default_eol = eol;
        self
    }

    /// Set [`TextModelOptions::trim_auto_whitespace`].
    pub fn with_trim_auto_whitespace(mut self, enabled: bool) -> Self {
        self.trim_auto_whitespace = enabled;
        self
    }

    /// Set [`TextModelOptions::max_undo_depth`].
    pub fn with_max_undo_depth(mut self, depth: usize) -> Self {
        self.max_undo_depth = depth;
        self
    }
}
