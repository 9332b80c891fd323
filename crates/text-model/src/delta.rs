//! Content change events.
//!
//! Every committed mutation of a [`crate::TextModel`] produces one [`ModelContentChangedEvent`]
//! carrying two views of the same change:
//!
//! - **raw line deltas** ([`RawContentChange`]): the minimal set of line-level operations a
//!   line-oriented consumer (a view model, a line cache) needs to replay the edit;
//! - **flat content changes** ([`ModelContentChange`]): offset/range replacements, the shape
//!   incremental parsers and language servers consume.
//!
//! Events merge: when notifications are deferred, consecutive events collapse into one that
//! replays all of their changes in order.

use crate::line_ending::LineEnding;
use crate::position::Range;

/// One applied replacement, in the coordinates of the document right before it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContentChange {
    /// Replaced range.
    pub range: Range,
    /// UTF-16 offset of the range start.
    pub range_offset: usize,
    /// UTF-16 length of the replaced text.
    pub range_length: usize,
    /// Inserted text.
    pub text: String,
}

/// A line-level change. Line numbers are 1-based and refer to the document as it is when the
/// change is replayed (changes are replayed in order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContentChange {
    /// The whole content was replaced.
    Flush,
    /// The content of one line changed.
    LineChanged {
        /// Changed line.
        line_number: usize,
        /// New content of the line.
        detail: String,
    },
    /// Lines `from_line_number..=to_line_number` were removed.
    LinesDeleted {
        /// First removed line.
        from_line_number: usize,
        /// Last removed line.
        to_line_number: usize,
    },
    /// Lines were inserted so that they now occupy `from_line_number..=to_line_number`.
    LinesInserted {
        /// First inserted line.
        from_line_number: usize,
        /// Last inserted line.
        to_line_number: usize,
        /// Contents of the inserted lines, in order.
        detail: Vec<String>,
    },
    /// The line ending changed.
    EolChanged,
}

/// Notification of a committed content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContentChangedEvent {
    /// Line-level changes, in replay order.
    pub raw_changes: Vec<RawContentChange>,
    /// Flat replacements, in replay order.
    pub changes: Vec<ModelContentChange>,
    /// Line ending after the change.
    pub eol: LineEnding,
    /// Model version after the change.
    pub version_id: u64,
    /// Produced by an undo.
    pub is_undoing: bool,
    /// Produced by a redo.
    pub is_redoing: bool,
    /// The whole content was replaced.
    pub is_flush: bool,
    /// The line ending changed.
    pub is_eol_change: bool,
}

impl ModelContentChangedEvent {
    /// Combine two consecutive events. Changes concatenate, flags OR together, and the
    /// version and line ending come from `other`.
    pub fn merge(self, other: Self) -> Self {
        let mut raw_changes = self.raw_changes;
        raw_changes.extend(other.raw_changes);
        let mut changes = self.changes;
        changes.extend(other.changes);

        Self {
            raw_changes,
            changes,
            eol: other.eol,
            version_id: other.version_id,
            is_undoing: self.is_undoing || other.is_undoing,
            is_redoing: self.is_redoing || other.is_redoing,
            is_flush: self.is_flush || other.is_flush,
            is_eol_change: self.is_eol_change || other.is_eol_change,
        }
    }

    /// `true` if the event contains a change touching `line_number`.
    pub fn affects_line(&self, line_number: usize) -> bool {
        self.changes
            .iter()
            .any(|c| c.range.start.line <= line_number && line_number <= c.range.end.line)
    }
}

/// Signal that the set of decorations, or their ranges, changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecorationsChangedEvent;

/// Line-level deltas for changes applied in descending order.
///
/// `old_line_count` is the line count before the batch; `line_content` reads lines of the
/// document after the whole batch was applied.
pub(crate) fn raw_changes_for<F>(
    changes: &[ModelContentChange],
    old_line_count: usize,
    new_line_count: usize,
    mut line_content: F,
) -> Vec<RawContentChange>
where
    F: FnMut(usize) -> String,
{
    let mut raw = Vec::new();
    let mut line_count = old_line_count as isize;
    let new_line_count = new_line_count as isize;

    for change in changes {
        let start_line = change.range.start.line as isize;
        let end_line = change.range.end.line as isize;
        let deleting = end_line - start_line;
        let inserting = crate::text::count_eol(&change.text).eol_count as isize;
        let editing = deleting.min(inserting);
        let line_delta = inserting - deleting;

        // Where this change's first line sits in the final document.
        let edit_start_in_result = new_line_count - line_count - line_delta + start_line;

        for j in (0..=editing).rev() {
            raw.push(RawContentChange::LineChanged {
                line_number: (start_line + j) as usize,
                detail: line_content((edit_start_in_result + j) as usize),
            });
        }

        if editing < deleting {
            raw.push(RawContentChange::LinesDeleted {
                from_line_number: (start_line + editing + 1) as usize,
                to_line_number: end_line as usize,
            });
        }

        if editing < inserting {
            let splice_line = start_line + editing;
            let count = inserting - editing;
            let from_in_result = new_line_count - line_count - count + splice_line + 1;
            raw.push(RawContentChange::LinesInserted {
                from_line_number: (splice_line + 1) as usize,
                to_line_number: (start_line + inserting) as usize,
                detail: (0..count)
                    .map(|i| line_content((from_in_result + i) as usize))
                    .collect(),
            });
        }

        line_count += line_delta;
    }
    raw
}
