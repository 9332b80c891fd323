//! Line-addressable text buffer.
//!
//! [`TextBuffer`] owns the document text (in a [`LineIndex`]), its line ending and BOM flag. It
//! validates and converts coordinates and applies edit batches atomically. It knows nothing about
//! decorations or events: [`crate::TextModel`] layers those on top.

use crate::builder::TextBufferBuilder;
use crate::delta::ModelContentChange;
use crate::edit::{ApplyEditsResult, EditOperation, ValidatedEdit};
use crate::error::TextModelError;
use crate::line_ending::{EndOfLinePreference, LineEnding};
use crate::line_index::LineIndex;
use crate::position::{Position, Range};
use crate::snapshot::TextSnapshot;
use crate::text::{self, UTF8_BOM};

/// Editable document text with 1-based line access and UTF-16 columns.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    index: LineIndex,
    eol: LineEnding,
    bom: bool,
}

impl TextBuffer {
    /// Build a buffer from a complete string.
    ///
    /// `default_eol` is used when the text contains no line break at all.
    pub fn from_text(text: &str, default_eol: LineEnding) -> Self {
        let mut builder = TextBufferBuilder::new();
        builder.accept_chunk(text);
        builder.finish().create(default_eol)
    }

    /// `text` must already use `eol` for every line break and carry no BOM.
    pub(crate) fn from_normalized(text: &str, eol: LineEnding, bom: bool) -> Self {
        Self {
            index: LineIndex::from_text(text),
            eol,
            bom,
        }
    }

    /// The buffer's line ending.
    pub fn eol(&self) -> LineEnding {
        self.eol
    }

    /// Whether the source text started with a byte-order mark.
    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Number of lines (always at least one).
    pub fn line_count(&self) -> usize {
        self.index.line_count()
    }

    /// Document length in UTF-16 code units, line breaks included.
    pub fn length(&self) -> usize {
        self.index.len_utf16()
    }

    /// Text of `line` without its line break.
    pub fn line_content(&self, line: usize) -> Result<String, TextModelError> {
        let idx = self.checked_line(line)?;
        Ok(self.index.line_text(idx).unwrap_or_default())
    }

    /// Text of every line, without line breaks.
    pub fn lines_content(&self) -> Vec<String> {
        (0..self.line_count())
            .map(|idx| self.index.line_text(idx).unwrap_or_default())
            .collect()
    }

    /// Length of `line` in UTF-16 code units.
    pub fn line_length(&self, line: usize) -> Result<usize, TextModelError> {
        let idx = self.checked_line(line)?;
        Ok(self.index.line_len_utf16(idx))
    }

    /// Largest valid column on `line` (its length plus one).
    pub fn line_max_column(&self, line: usize) -> Result<usize, TextModelError> {
        Ok(self.line_length(line)? + 1)
    }

    /// Column of the first non-blank character on `line`, or 0 if the line is blank.
    pub fn line_first_non_whitespace_column(&self, line: usize) -> Result<usize, TextModelError> {
        let content = self.line_content(line)?;
        Ok(text::first_non_whitespace_index(&content).map_or(0, |idx| idx + 1))
    }

    /// Column just after the last non-blank character on `line`, or 0 if the line is blank.
    pub fn line_last_non_whitespace_column(&self, line: usize) -> Result<usize, TextModelError> {
        let content = self.line_content(line)?;
        Ok(text::last_non_whitespace_index(&content).map_or(0, |idx| idx + 2))
    }

    /// The whole document.
    pub fn value(&self, eol: EndOfLinePreference, preserve_bom: bool) -> String {
        let body = self.value_in_range(self.full_range(), eol);
        if preserve_bom && self.bom {
            let mut out = String::with_capacity(body.len() + UTF8_BOM.len_utf8());
            out.push(UTF8_BOM);
            out.push_str(&body);
            out
        } else {
            body
        }
    }

    /// Text inside `range` (validated first).
    pub fn value_in_range(&self, range: Range, eol: EndOfLinePreference) -> String {
        let range = self.validate_range(range);
        if range.is_empty() {
            return String::new();
        }
        let start = self.offset_of_valid(range.start);
        let end = self.offset_of_valid(range.end);
        let raw = self.index.slice_utf16(start, end);

        let target = eol.resolve(self.eol);
        if target == self.eol {
            raw
        } else {
            text::normalize_eol(&raw, target).into_owned()
        }
    }

    /// UTF-16 length of the text inside `range` (validated first).
    pub fn value_length_in_range(&self, range: Range, eol: EndOfLinePreference) -> usize {
        let range = self.validate_range(range);
        let len = self.offset_of_valid(range.end) - self.offset_of_valid(range.start);

        let target = eol.resolve(self.eol);
        let line_breaks = range.end.line - range.start.line;
        len - line_breaks * self.eol.len() + line_breaks * target.len()
    }

    /// Range spanning the whole document.
    pub fn full_range(&self) -> Range {
        let last = self.line_count();
        Range::new(1, 1, last, self.max_column_of(last - 1))
    }

    /// UTF-16 offset of `pos` (validated first).
    pub fn offset_at(&self, pos: Position) -> usize {
        self.offset_of_valid(self.validate_position(pos))
    }

    /// Position of a UTF-16 offset. Offsets past the end clamp to the end.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.length());
        let idx = self.index.line_of_utf16(offset);
        let column = offset - self.index.line_start_utf16(idx) + 1;
        Position::new(idx + 1, column.min(self.max_column_of(idx)))
    }

    /// Clamp `pos` into the document and move it off the middle of a surrogate pair.
    pub fn validate_position(&self, pos: Position) -> Position {
        let pos = self.clamp_position(pos);
        if self.splits_surrogate_pair(pos) {
            pos.with_column(pos.column - 1)
        } else {
            pos
        }
    }

    /// Clamp both ends of `range` and keep them off the middle of surrogate pairs.
    ///
    /// An end inside a pair is moved outward so the character stays whole; a collapsed range
    /// inside a pair moves back as a whole and stays collapsed.
    pub fn validate_range(&self, range: Range) -> Range {
        let start = self.clamp_position(range.start);
        let end = self.clamp_position(range.end);
        let start_inside = self.splits_surrogate_pair(start);
        let end_inside = self.splits_surrogate_pair(end);

        match (start_inside, end_inside) {
            (false, false) => Range::from_positions(start, end),
            _ if start == end => Range::collapsed(start.with_column(start.column - 1)),
            (true, true) => Range::from_positions(
                start.with_column(start.column - 1),
                end.with_column(end.column + 1),
            ),
            (true, false) => Range::from_positions(start.with_column(start.column - 1), end),
            (false, true) => Range::from_positions(start, end.with_column(end.column + 1)),
        }
    }

    /// `true` if `pos` needs no correction.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        self.clamp_position(pos) == pos && !self.splits_surrogate_pair(pos)
    }

    /// `true` if both ends of `range` need no correction.
    pub fn is_valid_range(&self, range: Range) -> bool {
        self.is_valid_position(range.start) && self.is_valid_position(range.end)
    }

    /// Content equality: same BOM flag, line ending and text.
    pub fn equals(&self, other: &TextBuffer) -> bool {
        self.bom == other.bom && self.eol == other.eol && self.index.rope() == other.index.rope()
    }

    /// Rewrite every line break to `eol`.
    pub fn set_eol(&mut self, eol: LineEnding) {
        if eol == self.eol {
            return;
        }
        let rewritten = text::normalize_eol(&self.index.text(), eol).into_owned();
        self.index = LineIndex::from_text(&rewritten);
        self.eol = eol;
    }

    /// Pull-based reader over the current content.
    ///
    /// The snapshot shares structure with the buffer and is unaffected by later edits.
    pub fn create_snapshot(&self, preserve_bom: bool) -> TextSnapshot {
        TextSnapshot::new(self.index.rope().clone(), preserve_bom && self.bom)
    }

    /// Apply a batch of non-overlapping edits atomically.
    ///
    /// Operations are validated against the current content, then applied from the highest
    /// offset down. `on_replace` sees every change (and its force-move flag) right before the
    /// text is mutated. Overlapping operations reject the whole batch before anything changes.
    pub fn apply_edits<F>(
        &mut self,
        operations: &[EditOperation],
        record_trim_auto_whitespace: bool,
        mut on_replace: F,
    ) -> Result<ApplyEditsResult, TextModelError>
    where
        F: FnMut(&ModelContentChange, bool),
    {
        let mut ops: Vec<ValidatedEdit> = operations
            .iter()
            .enumerate()
            .map(|(sort_index, op)| self.validate_edit(sort_index, op))
            .collect();
        ops.sort_by(|a, b| {
            a.range
                .cmp(&b.range)
                .then_with(|| a.sort_index.cmp(&b.sort_index))
        });
        if ops
            .windows(2)
            .any(|pair| pair[0].range_offset + pair[0].range_length > pair[1].range_offset)
        {
            return Err(TextModelError::OverlappingRanges);
        }

        let reverse_ranges = inverse_edit_ranges(&ops);

        let mut trim_candidates: Vec<(usize, String)> = Vec::new();
        if record_trim_auto_whitespace {
            for (op, reverse) in ops.iter().zip(&reverse_ranges) {
                if !op.is_auto_whitespace_edit || !op.range.is_empty() {
                    continue;
                }
                for line in reverse.start.line..=reverse.end.line {
                    let mut old_content = String::new();
                    if line == reverse.start.line {
                        old_content = self
                            .index
                            .line_text(op.range.start.line - 1)
                            .unwrap_or_default();
                        if text::first_non_whitespace_index(&old_content).is_some() {
                            continue;
                        }
                    }
                    trim_candidates.push((line, old_content));
                }
            }
        }

        let mut reverse_edits: Vec<(usize, EditOperation)> = ops
            .iter()
            .zip(&reverse_ranges)
            .map(|(op, reverse)| {
                let old_text = self
                    .index
                    .slice_utf16(op.range_offset, op.range_offset + op.range_length);
                (
                    op.sort_index,
                    EditOperation {
                        range: *reverse,
                        text: Some(old_text),
                        identifier: op.identifier,
                        force_move_markers: op.force_move_markers,
                        is_auto_whitespace_edit: false,
                    },
                )
            })
            .collect();
        // Touching ranges collapse onto shared reverse positions; keep those in range order.
        let has_touching_ranges = ops
            .windows(2)
            .any(|pair| pair[0].range_offset + pair[0].range_length == pair[1].range_offset);
        if !has_touching_ranges {
            reverse_edits.sort_by_key(|(sort_index, _)| *sort_index);
        }

        let mut changes = Vec::with_capacity(ops.len());
        for op in ops.iter().rev().filter(|op| !op.is_noop()) {
            let change = ModelContentChange {
                range: op.range,
                range_offset: op.range_offset,
                range_length: op.range_length,
                text: op.text.clone(),
            };
            on_replace(&change, op.force_move_markers);
            self.index
                .remove_utf16(op.range_offset, op.range_offset + op.range_length);
            self.index.insert_utf16(op.range_offset, &op.text);
            changes.push(change);
        }

        let mut trim_auto_whitespace_lines = Vec::new();
        if !trim_candidates.is_empty() {
            trim_candidates.sort_by(|a, b| b.0.cmp(&a.0));
            let mut previous = None;
            for (line, old_content) in &trim_candidates {
                if previous == Some(*line) {
                    continue;
                }
                previous = Some(*line);
                let content = self.index.line_text(line - 1).unwrap_or_default();
                if content.is_empty()
                    || content == *old_content
                    || text::first_non_whitespace_index(&content).is_some()
                {
                    continue;
                }
                trim_auto_whitespace_lines.push(*line);
            }
        }

        Ok(ApplyEditsResult {
            reverse_edits: reverse_edits.into_iter().map(|(_, op)| op).collect(),
            changes,
            trim_auto_whitespace_lines,
        })
    }

    fn validate_edit(&self, sort_index: usize, op: &EditOperation) -> ValidatedEdit {
        let range = self.validate_range(op.range);
        let range_offset = self.offset_of_valid(range.start);
        let range_length = self.offset_of_valid(range.end) - range_offset;
        let text = text::normalize_eol(op.text(), self.eol).into_owned();
        let counts = text::count_eol(&text);

        ValidatedEdit {
            sort_index,
            identifier: op.identifier,
            range,
            range_offset,
            range_length,
            text,
            eol_count: counts.eol_count,
            first_line_length: counts.first_line_length,
            last_line_length: counts.last_line_length,
            force_move_markers: op.force_move_markers,
            is_auto_whitespace_edit: op.is_auto_whitespace_edit,
        }
    }

    fn checked_line(&self, line: usize) -> Result<usize, TextModelError> {
        let line_count = self.line_count();
        if line == 0 || line > line_count {
            return Err(TextModelError::IllegalLineNumber { line, line_count });
        }
        Ok(line - 1)
    }

    fn max_column_of(&self, idx: usize) -> usize {
        self.index.line_len_utf16(idx) + 1
    }

    fn clamp_position(&self, pos: Position) -> Position {
        let line_count = self.line_count();
        if pos.line < 1 {
            return Position::new(1, 1);
        }
        if pos.line > line_count {
            return Position::new(line_count, self.max_column_of(line_count - 1));
        }
        let max_column = self.max_column_of(pos.line - 1);
        Position::new(pos.line, pos.column.clamp(1, max_column))
    }

    fn splits_surrogate_pair(&self, pos: Position) -> bool {
        pos.column > 1 && self.index.is_inside_surrogate_pair(self.offset_of_valid(pos))
    }

    /// `pos` must already be clamped into the document.
    fn offset_of_valid(&self, pos: Position) -> usize {
        self.index.line_start_utf16(pos.line - 1) + pos.column - 1
    }
}

/// Post-edit ranges covering the inserted text of each (ascending, non-overlapping) operation.
fn inverse_edit_ranges(ops: &[ValidatedEdit]) -> Vec<Range> {
    let mut result = Vec::with_capacity(ops.len());
    let mut previous: Option<(&ValidatedEdit, Position)> = None;

    for op in ops {
        let start = match previous {
            Some((prev_op, prev_end)) if prev_op.range.end.line == op.range.start.line => {
                Position::new(
                    prev_end.line,
                    prev_end.column + (op.range.start.column - prev_op.range.end.column),
                )
            }
            Some((prev_op, prev_end)) => Position::new(
                prev_end.line + (op.range.start.line - prev_op.range.end.line),
                op.range.start.column,
            ),
            None => op.range.start,
        };

        let end = if op.text.is_empty() {
            start
        } else if op.eol_count == 0 {
            Position::new(start.line, start.column + op.first_line_length)
        } else {
            Position::new(start.line + op.eol_count, op.last_line_length + 1)
        };

        result.push(Range::from_positions(start, end));
        previous = Some((op, end));
    }
    result
}
