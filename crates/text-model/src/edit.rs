//! Edit operation types.

use crate::delta::ModelContentChange;
use crate::position::{Position, Range};

/// One replacement in an edit batch.
///
/// A collapsed range inserts, `text: None` (or an empty string) deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
    /// Range to replace, in pre-edit coordinates.
    pub range: Range,
    /// Replacement text; `None` deletes.
    pub text: Option<String>,
    /// Caller-supplied tag carried over to the reverse operation.
    pub identifier: Option<u64>,
    /// Push decoration edges at the edit location forward regardless of their stickiness.
    pub force_move_markers: bool,
    /// Whitespace the caller inserted automatically (e.g. indentation) and may be trimmed by
    /// the next edit if the line is left otherwise blank.
    pub is_auto_whitespace_edit: bool,
}

impl EditOperation {
    /// Replace `range` with `text`.
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: Some(text.into()),
            identifier: None,
            force_move_markers: false,
            is_auto_whitespace_edit: false,
        }
    }

    /// Insert `text` at `position`.
    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Self::replace(Range::collapsed(position), text)
    }

    /// Delete `range`.
    pub fn delete(range: Range) -> Self {
        Self {
            range,
            text: None,
            identifier: None,
            force_move_markers: false,
            is_auto_whitespace_edit: false,
        }
    }

    /// Set [`EditOperation::force_move_markers`].
    pub fn with_force_move_markers(mut self, force: bool) -> Self {
        self.force_move_markers = force;
        self
    }

    /// Set [`EditOperation::is_auto_whitespace_edit`].
    pub fn with_auto_whitespace(mut self, auto: bool) -> Self {
        self.is_auto_whitespace_edit = auto;
        self
    }

    /// Set [`EditOperation::identifier`].
    pub fn with_identifier(mut self, identifier: u64) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Replacement text, empty for deletions.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// An edit operation after validation against a buffer.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedEdit {
    pub sort_index: usize,
    pub identifier: Option<u64>,
    pub range: Range,
    pub range_offset: usize,
    pub range_length: usize,
    /// Replacement text with line breaks rewritten to the buffer's EOL.
    pub text: String,
    pub eol_count: usize,
    pub first_line_length: usize,
    pub last_line_length: usize,
    pub force_move_markers: bool,
    pub is_auto_whitespace_edit: bool,
}

impl ValidatedEdit {
    pub fn is_noop(&self) -> bool {
        self.range_length == 0 && self.text.is_empty()
    }
}

/// Outcome of [`crate::TextBuffer::apply_edits`].
#[derive(Debug, Clone, Default)]
pub struct ApplyEditsResult {
    /// Operations that undo the batch: in input order, or in ascending range order when two
    /// of the input ranges touch.
    pub reverse_edits: Vec<EditOperation>,
    /// Applied changes in the order they were applied (descending offsets).
    pub changes: Vec<ModelContentChange>,
    /// Lines left holding only auto-inserted whitespace, descending.
    pub trim_auto_whitespace_lines: Vec<usize>,
}
