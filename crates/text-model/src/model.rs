//! The text model: a [`TextBuffer`] plus decorations, change events and undo history.
//!
//! Every mutation goes through the same pipeline: validate against the current buffer, move
//! decorations right before each text replacement, derive line deltas, bump the version once,
//! and emit one [`ModelContentChangedEvent`]. Mutations run inside an [`EventScope`], so nested
//! calls batch into a single merged event delivered when the outermost scope closes.

use crate::buffer::TextBuffer;
use crate::builder::TextBufferBuilder;
use crate::decorations::{
    DecorationId, DecorationStore, ModelDecoration, ModelDecorationOptions, ModelDeltaDecoration,
};
use crate::delta::{
    self, DecorationsChangedEvent, ModelContentChange, ModelContentChangedEvent, RawContentChange,
};
use crate::edit::EditOperation;
use crate::error::TextModelError;
use crate::events::{DeferredEmitter, ListenerId};
use crate::line_ending::{EndOfLinePreference, LineEnding};
use crate::options::TextModelOptions;
use crate::position::{Position, Range};
use crate::registry::ModelId;
use crate::snapshot::TextSnapshot;
use crate::text;
use crate::undo::{UndoRedoStack, UndoStep};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

type Result<T> = std::result::Result<T, TextModelError>;

/// Handle of an open decoration transaction.
///
/// Obtained from [`TextModel::begin_decoration_transaction`]. Using it after
/// [`TextModel::end_decoration_transaction`] fails with
/// [`TextModelError::InvalidTransactionUse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationTransaction {
    serial: u64,
    owner_id: u32,
}

impl DecorationTransaction {
    /// Owner id stamped on decorations added through this transaction.
    pub fn owner_id(self) -> u32 {
        self.owner_id
    }
}

/// A mutable text document.
#[derive(Debug)]
pub struct TextModel {
    id: ModelId,
    options: TextModelOptions,
    buffer: Option<TextBuffer>,
    version_id: u64,
    decorations: DecorationStore,
    content_events: DeferredEmitter<ModelContentChangedEvent>,
    decoration_events: DeferredEmitter<DecorationsChangedEvent>,
    next_listener_id: u64,
    undo: UndoRedoStack,
    /// Lines (descending) holding only auto-inserted whitespace after the last edit batch.
    trim_auto_whitespace_lines: Vec<usize>,
    is_undoing: bool,
    is_redoing: bool,
    next_transaction_serial: u64,
    active_transaction: Option<u64>,
}

impl TextModel {
    /// Create a model holding `text`.
    pub fn new(id: ModelId, text: &str, options: TextModelOptions) -> Self {
        Self::with_buffer(id, TextBuffer::from_text(text, options.default_eol), options)
    }

    /// Create a model from chunks collected by a [`TextBufferBuilder`].
    pub fn from_builder(id: ModelId, builder: TextBufferBuilder, options: TextModelOptions) -> Self {
        let buffer = builder.finish().create(options.default_eol);
        Self::with_buffer(id, buffer, options)
    }

    fn with_buffer(id: ModelId, buffer: TextBuffer, options: TextModelOptions) -> Self {
        Self {
            id,
            options,
            buffer: Some(buffer),
            version_id: 1,
            decorations: DecorationStore::new(id),
            content_events: DeferredEmitter::new(),
            decoration_events: DeferredEmitter::new(),
            next_listener_id: 1,
            undo: UndoRedoStack::new(options.max_undo_depth),
            trim_auto_whitespace_lines: Vec::new(),
            is_undoing: false,
            is_redoing: false,
            next_transaction_serial: 1,
            active_transaction: None,
        }
    }

    /// The model's id.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Current options.
    pub fn options(&self) -> TextModelOptions {
        self.options
    }

    /// Replace the options. The default line ending only affects later `set_value` calls.
    pub fn update_options(&mut self, options: TextModelOptions) -> Result<()> {
        self.buffer()?;
        if !options.trim_auto_whitespace {
            self.trim_auto_whitespace_lines.clear();
        }
        if options.max_undo_depth != self.options.max_undo_depth {
            self.undo.set_max_undo(options.max_undo_depth);
        }
        self.options = options;
        Ok(())
    }

    /// Version id, increased once per committed edit batch, `set_value` or line ending change.
    pub fn version_id(&self) -> u64 {
        self.version_id
    }

    /// `true` after [`TextModel::dispose`].
    pub fn is_disposed(&self) -> bool {
        self.buffer.is_none()
    }

    /// Release the content, decorations, history and listeners.
    pub fn dispose(&mut self) {
        if self.buffer.take().is_none() {
            return;
        }
        self.decorations.clear();
        self.undo.clear();
        self.trim_auto_whitespace_lines.clear();
        self.content_events.clear();
        self.decoration_events.clear();
        self.active_transaction = None;
        tracing::debug!(model = self.id.get(), "disposed text model");
    }

    /// Open an event scope. Events fired while any scope is open are merged and delivered
    /// when the outermost scope is dropped.
    pub fn defer_events(&mut self) -> Result<EventScope<'_>> {
        self.buffer()?;
        self.content_events.begin_deferred();
        self.decoration_events.begin_deferred();
        Ok(EventScope { model: self })
    }

    fn buffer(&self) -> Result<&TextBuffer> {
        self.buffer.as_ref().ok_or(TextModelError::Disposed)
    }

    // ---- reads ----

    /// Number of lines.
    pub fn line_count(&self) -> Result<usize> {
        Ok(self.buffer()?.line_count())
    }

    /// Text of `line`, without its line break.
    pub fn line_content(&self, line: usize) -> Result<String> {
        self.buffer()?.line_content(line)
    }

    /// Text of every line.
    pub fn lines_content(&self) -> Result<Vec<String>> {
        Ok(self.buffer()?.lines_content())
    }

    /// Length of `line` in UTF-16 code units.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        self.buffer()?.line_length(line)
    }

    /// Largest valid column on `line`.
    pub fn line_max_column(&self, line: usize) -> Result<usize> {
        self.buffer()?.line_max_column(line)
    }

    /// Column of the first non-whitespace character, or 0 for a blank line.
    pub fn line_first_non_whitespace_column(&self, line: usize) -> Result<usize> {
        self.buffer()?.line_first_non_whitespace_column(line)
    }

    /// Column just past the last non-whitespace character, or 0 for a blank line.
    pub fn line_last_non_whitespace_column(&self, line: usize) -> Result<usize> {
        self.buffer()?.line_last_non_whitespace_column(line)
    }

    /// Whole text with the buffer's own line ending and no BOM.
    pub fn value(&self) -> Result<String> {
        self.value_with(EndOfLinePreference::TextDefined, false)
    }

    /// Whole text with the requested line ending, optionally with the BOM.
    pub fn value_with(&self, eol: EndOfLinePreference, preserve_bom: bool) -> Result<String> {
        Ok(self.buffer()?.value(eol, preserve_bom))
    }

    /// Text inside `range` (validated first).
    pub fn value_in_range(&self, range: Range, eol: EndOfLinePreference) -> Result<String> {
        Ok(self.buffer()?.value_in_range(range, eol))
    }

    /// UTF-16 length of the text inside `range`.
    pub fn value_length_in_range(&self, range: Range, eol: EndOfLinePreference) -> Result<usize> {
        Ok(self.buffer()?.value_length_in_range(range, eol))
    }

    /// Document length in UTF-16 code units.
    pub fn value_length(&self) -> Result<usize> {
        Ok(self.buffer()?.length())
    }

    /// Range covering the whole document.
    pub fn full_model_range(&self) -> Result<Range> {
        Ok(self.buffer()?.full_range())
    }

    /// The document's line ending.
    pub fn eol(&self) -> Result<LineEnding> {
        Ok(self.buffer()?.eol())
    }

    /// Offset of `position` (validated first).
    pub fn offset_at(&self, position: Position) -> Result<usize> {
        Ok(self.buffer()?.offset_at(position))
    }

    /// Position of `offset`, clamped to the document.
    pub fn position_at(&self, offset: usize) -> Result<Position> {
        Ok(self.buffer()?.position_at(offset))
    }

    /// Move `position` by `delta` UTF-16 code units, clamping at both document ends.
    pub fn modify_position(&self, position: Position, delta: isize) -> Result<Position> {
        let buffer = self.buffer()?;
        let offset = buffer.offset_at(position).saturating_add_signed(delta);
        Ok(buffer.position_at(offset))
    }

    /// Clamp `position` into the document.
    pub fn validate_position(&self, position: Position) -> Result<Position> {
        Ok(self.buffer()?.validate_position(position))
    }

    /// Clamp `range` into the document, never splitting a surrogate pair.
    pub fn validate_range(&self, range: Range) -> Result<Range> {
        Ok(self.buffer()?.validate_range(range))
    }

    /// `true` if `position` needs no correction.
    pub fn is_valid_position(&self, position: Position) -> Result<bool> {
        Ok(self.buffer()?.is_valid_position(position))
    }

    /// `true` if `range` needs no correction.
    pub fn is_valid_range(&self, range: Range) -> Result<bool> {
        Ok(self.buffer()?.is_valid_range(range))
    }

    /// Chunked reader over the current content.
    pub fn create_snapshot(&self, preserve_bom: bool) -> Result<TextSnapshot> {
        Ok(self.buffer()?.create_snapshot(preserve_bom))
    }

    /// `true` if both models hold the same text, line ending and BOM flag.
    pub fn equals(&self, other: &TextModel) -> Result<bool> {
        Ok(self.buffer()?.equals(other.buffer()?))
    }

    // ---- edits ----

    /// Apply a batch of edits atomically.
    ///
    /// Returns the reverse edits, one per input operation, when `compute_undo_edits` is set.
    /// They come back in input order, or in ascending range order when two input ranges
    /// touch, so that re-applying them restores the previous text. The undo stack is not touched; use
    /// [`TextModel::push_edit_operations`] for undoable edits.
    pub fn apply_edits(
        &mut self,
        operations: &[EditOperation],
        compute_undo_edits: bool,
    ) -> Result<Option<Vec<EditOperation>>> {
        let mut scope = self.defer_events()?;
        let reverse_edits = scope.do_apply_edits(operations)?.0;
        Ok(compute_undo_edits.then_some(reverse_edits))
    }

    /// Apply a batch of edits and record it on the undo stack.
    ///
    /// Lines the previous batch left holding only auto-inserted whitespace are trimmed in the
    /// same batch, unless one of `operations` touches them.
    pub fn push_edit_operations(&mut self, operations: &[EditOperation]) -> Result<()> {
        let buffer = self.buffer.as_ref().ok_or(TextModelError::Disposed)?;
        let mut operations = operations.to_vec();

        if self.options.trim_auto_whitespace {
            let incoming: Vec<(Range, &str)> = operations
                .iter()
                .map(|op| (buffer.validate_range(op.range), op.text()))
                .collect();
            let mut trims = Vec::new();
            for &line in &self.trim_auto_whitespace_lines {
                let Ok(max_column) = buffer.line_max_column(line) else {
                    continue;
                };
                if incoming
                    .iter()
                    .all(|(range, text)| allows_trim(line, max_column, *range, text))
                {
                    trims.push(EditOperation::delete(Range::new(line, 1, line, max_column)));
                }
            }
            operations.extend(trims);
        }

        let mut scope = self.defer_events()?;
        let (reverse_edits, changed) = scope.do_apply_edits(&operations)?;
        if changed {
            scope.undo.push(UndoStep::Edits(reverse_edits));
        }
        Ok(())
    }

    /// `true` if there is a step to undo.
    pub fn can_undo(&self) -> Result<bool> {
        self.buffer()?;
        Ok(self.undo.can_undo())
    }

    /// `true` if there is a step to redo.
    pub fn can_redo(&self) -> Result<bool> {
        self.buffer()?;
        Ok(self.undo.can_redo())
    }

    /// `true` if the content matches the last clean point.
    pub fn is_clean(&self) -> Result<bool> {
        self.buffer()?;
        Ok(self.undo.is_clean())
    }

    /// Mark the current state as clean (saved).
    pub fn mark_clean(&mut self) -> Result<()> {
        self.buffer()?;
        self.undo.mark_clean();
        Ok(())
    }

    /// Revert the latest undo step. Returns `false` when there was nothing to undo.
    ///
    /// A step that fails to apply stays on the undo stack.
    pub fn undo(&mut self) -> Result<bool> {
        let mut scope = self.defer_events()?;
        let Some(step) = scope.undo.pop_undo() else {
            return Ok(false);
        };

        scope.is_undoing = true;
        let replayed = scope.replay(step.clone());
        scope.is_undoing = false;
        match replayed {
            Ok(inverse) => {
                scope.trim_auto_whitespace_lines.clear();
                scope.undo.push_redo(inverse);
                Ok(true)
            }
            Err(err) => {
                scope.undo.push_undo_after_redo(step);
                Err(err)
            }
        }
    }

    /// Re-apply the latest undone step. Returns `false` when there was nothing to redo.
    ///
    /// A step that fails to apply stays on the redo stack.
    pub fn redo(&mut self) -> Result<bool> {
        let mut scope = self.defer_events()?;
        let Some(step) = scope.undo.pop_redo() else {
            return Ok(false);
        };

        scope.is_redoing = true;
        let replayed = scope.replay(step.clone());
        scope.is_redoing = false;
        match replayed {
            Ok(inverse) => {
                scope.trim_auto_whitespace_lines.clear();
                scope.undo.push_undo_after_redo(inverse);
                Ok(true)
            }
            Err(err) => {
                scope.undo.push_redo(step);
                Err(err)
            }
        }
    }

    /// Replace the whole content.
    ///
    /// Emits a single `Flush` change, drops every decoration and clears the undo history.
    pub fn set_value(&mut self, value: &str) -> Result<()> {
        let old = self.buffer()?;
        let old_range = old.full_range();
        let old_length = old.length();
        let new_buffer = TextBuffer::from_text(value, self.options.default_eol);
        let had_decorations = !self.decorations.is_empty();

        let mut scope = self.defer_events()?;
        let model = &mut *scope;
        let new_value = new_buffer.value(EndOfLinePreference::TextDefined, false);
        let eol = new_buffer.eol();
        model.buffer = Some(new_buffer);
        model.version_id += 1;
        model.decorations.clear();
        model.undo.clear();
        model.trim_auto_whitespace_lines.clear();

        tracing::debug!(
            model = model.id.get(),
            version = model.version_id,
            "replaced text model content"
        );
        model.content_events.fire(ModelContentChangedEvent {
            raw_changes: vec![RawContentChange::Flush],
            changes: vec![ModelContentChange {
                range: old_range,
                range_offset: 0,
                range_length: old_length,
                text: new_value,
            }],
            eol,
            version_id: model.version_id,
            is_undoing: false,
            is_redoing: false,
            is_flush: true,
            is_eol_change: false,
        });
        if had_decorations {
            model.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(())
    }

    /// Convert every line break to `eol`. Decorations keep their line/column ranges.
    pub fn set_eol(&mut self, eol: LineEnding) -> Result<()> {
        let previous = self.buffer()?.eol();
        if previous == eol {
            return Ok(());
        }
        let mut scope = self.defer_events()?;
        scope.do_set_eol(eol)?;
        scope.undo.push(UndoStep::Eol(previous));
        Ok(())
    }

    /// Apply `operations` without touching the undo stack. Returns the reverse edits and
    /// whether the text changed. Must run inside an event scope.
    fn do_apply_edits(&mut self, operations: &[EditOperation]) -> Result<(Vec<EditOperation>, bool)> {
        let buffer = self.buffer.as_mut().ok_or(TextModelError::Disposed)?;
        let decorations = &mut self.decorations;
        let old_line_count = buffer.line_count();

        let result = buffer.apply_edits(
            operations,
            self.options.trim_auto_whitespace,
            |change, force_move_markers| {
                decorations.accept_replace(
                    change.range_offset,
                    change.range_length,
                    text::utf16_len(&change.text),
                    force_move_markers,
                );
            },
        )?;
        self.trim_auto_whitespace_lines = result.trim_auto_whitespace_lines;

        if result.changes.is_empty() {
            return Ok((result.reverse_edits, false));
        }

        self.version_id += 1;
        let buffer: &TextBuffer = buffer;
        let raw_changes = delta::raw_changes_for(
            &result.changes,
            old_line_count,
            buffer.line_count(),
            |line| buffer.line_content(line).unwrap_or_default(),
        );
        tracing::debug!(
            model = self.id.get(),
            version = self.version_id,
            changes = result.changes.len(),
            undoing = self.is_undoing,
            redoing = self.is_redoing,
            "applied edit batch"
        );
        self.content_events.fire(ModelContentChangedEvent {
            raw_changes,
            changes: result.changes,
            eol: buffer.eol(),
            version_id: self.version_id,
            is_undoing: self.is_undoing,
            is_redoing: self.is_redoing,
            is_flush: false,
            is_eol_change: false,
        });
        if !self.decorations.is_empty() {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok((result.reverse_edits, true))
    }

    fn do_set_eol(&mut self, eol: LineEnding) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or(TextModelError::Disposed)?;
        if buffer.eol() == eol {
            return Ok(());
        }
        let old_range = buffer.full_range();
        let old_length = buffer.length();

        self.decorations.cache_all_ranges(buffer, self.version_id);
        buffer.set_eol(eol);
        self.version_id += 1;
        self.decorations.rebase_on_cached_ranges(buffer, self.version_id);

        tracing::debug!(
            model = self.id.get(),
            version = self.version_id,
            %eol,
            "changed line ending"
        );
        self.content_events.fire(ModelContentChangedEvent {
            raw_changes: vec![RawContentChange::EolChanged],
            changes: vec![ModelContentChange {
                range: old_range,
                range_offset: 0,
                range_length: old_length,
                text: buffer.value(EndOfLinePreference::TextDefined, false),
            }],
            eol,
            version_id: self.version_id,
            is_undoing: self.is_undoing,
            is_redoing: self.is_redoing,
            is_flush: false,
            is_eol_change: true,
        });
        if !self.decorations.is_empty() {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(())
    }

    /// Apply an undo step and return the step that reverts it.
    fn replay(&mut self, step: UndoStep) -> Result<UndoStep> {
        match step {
            UndoStep::Edits(operations) => {
                let (reverse_edits, _) = self.do_apply_edits(&operations)?;
                Ok(UndoStep::Edits(reverse_edits))
            }
            UndoStep::Eol(eol) => {
                let current = self.buffer()?.eol();
                self.do_set_eol(eol)?;
                Ok(UndoStep::Eol(current))
            }
        }
    }

    // ---- events ----

    /// Listen for content changes.
    pub fn on_did_change_content<F>(&mut self, listener: F) -> Result<ListenerId>
    where
        F: FnMut(&ModelContentChangedEvent) + Send + 'static,
    {
        self.buffer()?;
        let id = self.allocate_listener_id();
        self.content_events.subscribe_with_id(id, listener);
        Ok(id)
    }

    /// Listen for decoration changes.
    pub fn on_did_change_decorations<F>(&mut self, listener: F) -> Result<ListenerId>
    where
        F: FnMut(&DecorationsChangedEvent) + Send + 'static,
    {
        self.buffer()?;
        let id = self.allocate_listener_id();
        self.decoration_events.subscribe_with_id(id, listener);
        Ok(id)
    }

    /// Remove a listener of either kind. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> Result<bool> {
        self.buffer()?;
        Ok(self.content_events.unsubscribe(id) || self.decoration_events.unsubscribe(id))
    }

    fn allocate_listener_id(&mut self) -> ListenerId {
        let id = ListenerId::new(self.next_listener_id);
        self.next_listener_id += 1;
        id
    }

    // ---- decorations ----

    /// Open a decoration transaction for `owner_id`.
    ///
    /// Decoration events are held back until the matching
    /// [`TextModel::end_decoration_transaction`]. Only one transaction can be open at a time.
    pub fn begin_decoration_transaction(&mut self, owner_id: u32) -> Result<DecorationTransaction> {
        self.buffer()?;
        if self.active_transaction.is_some() {
            return Err(TextModelError::InvalidTransactionUse);
        }
        let serial = self.next_transaction_serial;
        self.next_transaction_serial += 1;
        self.active_transaction = Some(serial);
        self.decoration_events.begin_deferred();
        Ok(DecorationTransaction { serial, owner_id })
    }

    /// Close `transaction` and deliver the held back decoration event, if any.
    pub fn end_decoration_transaction(&mut self, transaction: DecorationTransaction) -> Result<()> {
        self.check_transaction(transaction)?;
        self.active_transaction = None;
        self.decoration_events.end_deferred();
        Ok(())
    }

    fn check_transaction(&self, transaction: DecorationTransaction) -> Result<()> {
        self.buffer()?;
        if self.active_transaction != Some(transaction.serial) {
            return Err(TextModelError::InvalidTransactionUse);
        }
        Ok(())
    }

    /// Add a decoration owned by the transaction's owner.
    pub fn add_decoration(
        &mut self,
        transaction: DecorationTransaction,
        range: Range,
        options: impl Into<Arc<ModelDecorationOptions>>,
    ) -> Result<DecorationId> {
        self.check_transaction(transaction)?;
        let buffer = self.buffer.as_ref().ok_or(TextModelError::Disposed)?;
        let id = self
            .decorations
            .add(buffer, transaction.owner_id, range, options.into());
        self.decoration_events.fire(DecorationsChangedEvent);
        Ok(id)
    }

    /// Move a decoration. Returns `false` for unknown ids.
    pub fn change_decoration(
        &mut self,
        transaction: DecorationTransaction,
        id: DecorationId,
        range: Range,
    ) -> Result<bool> {
        self.check_transaction(transaction)?;
        let buffer = self.buffer.as_ref().ok_or(TextModelError::Disposed)?;
        let changed = self.decorations.change_range(buffer, id, range);
        if changed {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(changed)
    }

    /// Replace a decoration's options. Returns `false` for unknown ids.
    pub fn change_decoration_options(
        &mut self,
        transaction: DecorationTransaction,
        id: DecorationId,
        options: impl Into<Arc<ModelDecorationOptions>>,
    ) -> Result<bool> {
        self.check_transaction(transaction)?;
        let changed = self.decorations.change_options(id, options.into());
        if changed {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(changed)
    }

    /// Remove a decoration. Returns `false` for unknown ids.
    pub fn remove_decoration(
        &mut self,
        transaction: DecorationTransaction,
        id: DecorationId,
    ) -> Result<bool> {
        self.check_transaction(transaction)?;
        let removed = self.decorations.remove(id);
        if removed {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(removed)
    }

    /// Remove `old_ids` and add `new_decorations` inside `transaction`.
    pub fn delta_decorations_in(
        &mut self,
        transaction: DecorationTransaction,
        old_ids: &[DecorationId],
        new_decorations: &[ModelDeltaDecoration],
    ) -> Result<Vec<DecorationId>> {
        self.check_transaction(transaction)?;
        Ok(self.replace_decorations(transaction.owner_id, old_ids, new_decorations))
    }

    /// Run `f` with an accessor bound to a fresh decoration transaction for `owner_id`.
    ///
    /// The transaction closes when `f` returns or unwinds.
    pub fn change_decorations<R, F>(&mut self, owner_id: u32, f: F) -> Result<R>
    where
        F: FnOnce(&mut DecorationAccessor<'_>) -> R,
    {
        let transaction = self.begin_decoration_transaction(owner_id)?;
        let mut accessor = DecorationAccessor {
            model: self,
            transaction,
        };
        Ok(f(&mut accessor))
    }

    /// Remove `old_ids` and add `new_decorations` owned by `owner_id`, as one change.
    ///
    /// Returns the new ids in the order of `new_decorations`.
    pub fn delta_decorations(
        &mut self,
        owner_id: u32,
        old_ids: &[DecorationId],
        new_decorations: &[ModelDeltaDecoration],
    ) -> Result<Vec<DecorationId>> {
        self.buffer()?;
        let mut scope = self.defer_events()?;
        Ok(scope.replace_decorations(owner_id, old_ids, new_decorations))
    }

    fn replace_decorations(
        &mut self,
        owner_id: u32,
        old_ids: &[DecorationId],
        new_decorations: &[ModelDeltaDecoration],
    ) -> Vec<DecorationId> {
        let Some(buffer) = self.buffer.as_ref() else {
            return Vec::new();
        };
        if old_ids.is_empty() && new_decorations.is_empty() {
            return Vec::new();
        }
        let ids = self
            .decorations
            .delta(buffer, owner_id, old_ids, new_decorations);
        self.decoration_events.fire(DecorationsChangedEvent);
        ids
    }

    /// Remove every decoration owned by `owner_id`. Returns how many were removed.
    pub fn remove_all_decorations_with_owner_id(&mut self, owner_id: u32) -> Result<usize> {
        self.buffer()?;
        let removed = self.decorations.remove_all_with_owner(owner_id);
        if removed > 0 {
            self.decoration_events.fire(DecorationsChangedEvent);
        }
        Ok(removed)
    }

    /// Current range of a decoration; whole-line decorations span their full lines.
    pub fn decoration_range(&self, id: DecorationId) -> Result<Option<Range>> {
        Ok(self.decorations.range(self.buffer()?, self.version_id, id))
    }

    /// Options of a decoration.
    pub fn decoration_options(&self, id: DecorationId) -> Result<Option<Arc<ModelDecorationOptions>>> {
        self.buffer()?;
        Ok(self.decorations.options(id))
    }

    /// Decorations touching `range`, in document order.
    ///
    /// `owner_filter` 0 matches every owner; decorations with owner 0 match every filter.
    pub fn decorations_in_range(
        &self,
        range: Range,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Result<Vec<ModelDecoration>> {
        Ok(self.decorations.in_range(
            self.buffer()?,
            self.version_id,
            range,
            owner_filter,
            filter_out_validation,
        ))
    }

    /// Decorations touching `line`. Empty for lines outside the document.
    pub fn line_decorations(
        &self,
        line: usize,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Result<Vec<ModelDecoration>> {
        self.lines_decorations(line, line, owner_filter, filter_out_validation)
    }

    /// Decorations touching any line in `start_line..=end_line` (clamped to the document).
    pub fn lines_decorations(
        &self,
        start_line: usize,
        end_line: usize,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Result<Vec<ModelDecoration>> {
        let buffer = self.buffer()?;
        let line_count = buffer.line_count();
        let start_line = start_line.max(1);
        let end_line = end_line.min(line_count);
        if start_line > end_line {
            return Ok(Vec::new());
        }
        let range = Range::new(start_line, 1, end_line, buffer.line_max_column(end_line)?);
        Ok(self.decorations.in_range(
            buffer,
            self.version_id,
            range,
            owner_filter,
            filter_out_validation,
        ))
    }

    /// Every decoration, in document order.
    pub fn all_decorations(
        &self,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Result<Vec<ModelDecoration>> {
        Ok(self.decorations.all(
            self.buffer()?,
            self.version_id,
            owner_filter,
            filter_out_validation,
        ))
    }
}

/// `false` if trimming `line` would interfere with an incoming edit.
fn allows_trim(line: usize, max_column: usize, range: Range, text: &str) -> bool {
    if line < range.start.line || line > range.end.line {
        return true;
    }
    if range.is_empty() && line == range.start.line {
        // A line break inserted right after or right before the trimmed line.
        if range.start.column == max_column && (text.starts_with('\n') || text.starts_with("\r\n"))
        {
            return true;
        }
        if range.start.column == 1 && text.ends_with('\n') {
            return true;
        }
    }
    false
}

/// Guard returned by [`TextModel::defer_events`].
///
/// Dereferences to the model. Dropping the outermost guard delivers the merged content event,
/// then the decorations signal.
#[derive(Debug)]
pub struct EventScope<'a> {
    model: &'a mut TextModel,
}

impl Deref for EventScope<'_> {
    type Target = TextModel;

    fn deref(&self) -> &TextModel {
        self.model
    }
}

impl DerefMut for EventScope<'_> {
    fn deref_mut(&mut self) -> &mut TextModel {
        self.model
    }
}

impl Drop for EventScope<'_> {
    fn drop(&mut self) {
        self.model.content_events.end_deferred();
        self.model.decoration_events.end_deferred();
    }
}

/// Decoration editing handle passed to [`TextModel::change_decorations`].
#[derive(Debug)]
pub struct DecorationAccessor<'a> {
    model: &'a mut TextModel,
    transaction: DecorationTransaction,
}

impl DecorationAccessor<'_> {
    /// Add a decoration.
    pub fn add_decoration(
        &mut self,
        range: Range,
        options: impl Into<Arc<ModelDecorationOptions>>,
    ) -> Result<DecorationId> {
        self.model.add_decoration(self.transaction, range, options)
    }

    /// Move a decoration.
    pub fn change_decoration(&mut self, id: DecorationId, range: Range) -> Result<bool> {
        self.model.change_decoration(self.transaction, id, range)
    }

    /// Replace a decoration's options.
    pub fn change_decoration_options(
        &mut self,
        id: DecorationId,
        options: impl Into<Arc<ModelDecorationOptions>>,
    ) -> Result<bool> {
        self.model
            .change_decoration_options(self.transaction, id, options)
    }

    /// Remove a decoration.
    pub fn remove_decoration(&mut self, id: DecorationId) -> Result<bool> {
        self.model.remove_decoration(self.transaction, id)
    }

    /// Remove `old_ids` and add `new_decorations`.
    pub fn delta_decorations(
        &mut self,
        old_ids: &[DecorationId],
        new_decorations: &[ModelDeltaDecoration],
    ) -> Result<Vec<DecorationId>> {
        self.model
            .delta_decorations_in(self.transaction, old_ids, new_decorations)
    }

    /// Read access to the model.
    pub fn model(&self) -> &TextModel {
        self.model
    }
}

impl Drop for DecorationAccessor<'_> {
    fn drop(&mut self) {
        self.model.end_decoration_transaction(self.transaction).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::TrackedRangeStickiness;
    use std::sync::Mutex;

    fn model(text: &str) -> TextModel {
        TextModel::new(ModelId::new(1), text, TextModelOptions::default())
    }

    fn record_content(model: &mut TextModel) -> Arc<Mutex<Vec<ModelContentChangedEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        model
            .on_did_change_content(move |e| sink.lock().unwrap().push(e.clone()))
            .unwrap();
        seen
    }

    #[test]
    fn test_insert_emits_single_line_change() {
        let mut m = model("ab\ncd");
        let seen = record_content(&mut m);
        m.apply_edits(&[EditOperation::insert(Position::new(1, 2), "X")], false)
            .unwrap();

        assert_eq!(m.value().unwrap(), "aXb\ncd");
        assert_eq!(m.version_id(), 2);
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].raw_changes,
            vec![RawContentChange::LineChanged {
                line_number: 1,
                detail: "aXb".to_string()
            }]
        );
    }

    #[test]
    fn test_nested_scopes_emit_once() {
        let mut m = model("abc");
        let seen = record_content(&mut m);
        {
            let mut outer = m.defer_events().unwrap();
            outer
                .apply_edits(&[EditOperation::insert(Position::new(1, 1), "1")], false)
                .unwrap();
            {
                let mut inner = outer.defer_events().unwrap();
                inner
                    .apply_edits(&[EditOperation::insert(Position::new(1, 1), "2")], false)
                    .unwrap();
            }
            assert!(seen.lock().unwrap().is_empty());
        }
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changes.len(), 2);
        assert_eq!(events[0].version_id, 3);
    }

    #[test]
    fn test_noop_batch_keeps_version() {
        let mut m = model("abc");
        let reverse = m
            .apply_edits(&[EditOperation::insert(Position::new(1, 1), "")], true)
            .unwrap()
            .unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(m.version_id(), 1);
    }

    #[test]
    fn test_overlapping_batch_is_rejected_untouched() {
        let mut m = model("abcdef");
        let err = m.apply_edits(
            &[
                EditOperation::replace(Range::new(1, 1, 1, 4), "x"),
                EditOperation::replace(Range::new(1, 3, 1, 5), "y"),
            ],
            false,
        );
        assert_eq!(err, Err(TextModelError::OverlappingRanges));
        assert_eq!(m.value().unwrap(), "abcdef");
        assert_eq!(m.version_id(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut m = model("hello world");
        m.push_edit_operations(&[EditOperation::replace(Range::new(1, 1, 1, 6), "goodbye")])
            .unwrap();
        assert_eq!(m.value().unwrap(), "goodbye world");
        assert!(m.undo().unwrap());
        assert_eq!(m.value().unwrap(), "hello world");
        assert!(m.redo().unwrap());
        assert_eq!(m.value().unwrap(), "goodbye world");
        assert!(!m.redo().unwrap());
    }

    #[test]
    fn test_undo_flags_on_event() {
        let mut m = model("abc");
        m.push_edit_operations(&[EditOperation::insert(Position::new(1, 4), "d")])
            .unwrap();
        let seen = record_content(&mut m);
        m.undo().unwrap();
        m.redo().unwrap();
        let events = seen.lock().unwrap();
        assert!(events[0].is_undoing && !events[0].is_redoing);
        assert!(events[1].is_redoing && !events[1].is_undoing);
    }

    #[test]
    fn test_trim_auto_whitespace_on_next_push() {
        let mut m = model("a");
        m.push_edit_operations(&[
            EditOperation::insert(Position::new(1, 2), "\n    ").with_auto_whitespace(true)
        ])
        .unwrap();
        assert_eq!(m.value().unwrap(), "a\n    ");

        // Typing elsewhere trims the auto-indented line.
        m.push_edit_operations(&[EditOperation::insert(Position::new(1, 1), "x")])
            .unwrap();
        assert_eq!(m.value().unwrap(), "xa\n");
    }

    #[test]
    fn test_trim_skipped_when_edit_touches_line() {
        let mut m = model("a");
        m.push_edit_operations(&[
            EditOperation::insert(Position::new(1, 2), "\n    ").with_auto_whitespace(true)
        ])
        .unwrap();
        m.push_edit_operations(&[EditOperation::insert(Position::new(2, 5), "b")])
            .unwrap();
        assert_eq!(m.value().unwrap(), "a\n    b");
    }

    #[test]
    fn test_set_value_flushes() {
        let mut m = model("one\ntwo");
        let seen = record_content(&mut m);
        let tx = m.begin_decoration_transaction(0).unwrap();
        m.add_decoration(tx, Range::new(1, 1, 1, 2), ModelDecorationOptions::new("d"))
            .unwrap();
        m.end_decoration_transaction(tx).unwrap();
        m.push_edit_operations(&[EditOperation::insert(Position::new(1, 1), "x")])
            .unwrap();

        m.set_value("fresh").unwrap();
        assert_eq!(m.value().unwrap(), "fresh");
        assert!(m.all_decorations(0, false).unwrap().is_empty());
        assert!(!m.can_undo().unwrap());
        let events = seen.lock().unwrap();
        let last = events.last().unwrap();
        assert!(last.is_flush);
        assert_eq!(last.raw_changes, vec![RawContentChange::Flush]);
        assert_eq!(last.changes[0].range, Range::new(1, 1, 2, 4));
        assert_eq!(last.changes[0].range_length, 8);
    }

    #[test]
    fn test_set_eol_keeps_decoration_positions() {
        let mut m = model("ab\ncd\nef");
        let ids = m
            .delta_decorations(
                0,
                &[],
                &[ModelDeltaDecoration::new(
                    Range::new(3, 1, 3, 3),
                    ModelDecorationOptions::new("d"),
                )],
            )
            .unwrap();
        let seen = record_content(&mut m);
        m.set_eol(LineEnding::Crlf).unwrap();
        assert_eq!(m.value().unwrap(), "ab\r\ncd\r\nef");
        assert_eq!(
            m.decoration_range(ids[0]).unwrap(),
            Some(Range::new(3, 1, 3, 3))
        );
        assert!(seen.lock().unwrap()[0].is_eol_change);

        m.undo().unwrap();
        assert_eq!(m.eol().unwrap(), LineEnding::Lf);
        assert_eq!(
            m.decoration_range(ids[0]).unwrap(),
            Some(Range::new(3, 1, 3, 3))
        );
    }

    #[test]
    fn test_transaction_use_after_end() {
        let mut m = model("abc");
        let tx = m.begin_decoration_transaction(1).unwrap();
        assert_eq!(
            m.begin_decoration_transaction(2),
            Err(TextModelError::InvalidTransactionUse)
        );
        m.end_decoration_transaction(tx).unwrap();
        assert_eq!(
            m.add_decoration(tx, Range::new(1, 1, 1, 2), ModelDecorationOptions::new("late")),
            Err(TextModelError::InvalidTransactionUse)
        );
    }

    #[test]
    fn test_change_decorations_batches_signal() {
        let mut m = model("abc");
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        m.on_did_change_decorations(move |_| *sink.lock().unwrap() += 1)
            .unwrap();

        let options = Arc::new(
            ModelDecorationOptions::new("x")
                .with_stickiness(TrackedRangeStickiness::NeverGrowsWhenTypingAtEdges),
        );
        let ids = m
            .change_decorations(7, |accessor| {
                let a = accessor.add_decoration(Range::new(1, 1, 1, 2), Arc::clone(&options))?;
                let b = accessor.add_decoration(Range::new(1, 2, 1, 3), Arc::clone(&options))?;
                Ok::<_, TextModelError>(vec![a, b])
            })
            .unwrap()
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(m.all_decorations(7, false).unwrap().iter().all(|d| d.owner_id == 7));

        // The transaction closed with the closure.
        assert!(m.begin_decoration_transaction(1).is_ok());
    }

    #[test]
    fn test_disposed_model_fails_fast() {
        let mut m = model("abc");
        m.dispose();
        assert!(m.is_disposed());
        assert_eq!(m.line_count(), Err(TextModelError::Disposed));
        assert_eq!(
            m.apply_edits(&[EditOperation::insert(Position::new(1, 1), "x")], false),
            Err(TextModelError::Disposed)
        );
        assert_eq!(m.undo(), Err(TextModelError::Disposed));
        assert_eq!(m.can_undo(), Err(TextModelError::Disposed));
        assert_eq!(m.can_redo(), Err(TextModelError::Disposed));
        assert_eq!(m.is_clean(), Err(TextModelError::Disposed));
        assert_eq!(m.mark_clean(), Err(TextModelError::Disposed));
        assert_eq!(
            m.update_options(TextModelOptions::default()),
            Err(TextModelError::Disposed)
        );
        assert_eq!(
            m.remove_listener(ListenerId::new(1)),
            Err(TextModelError::Disposed)
        );
        assert!(matches!(m.defer_events(), Err(TextModelError::Disposed)));
    }

    #[test]
    fn test_rejected_batch_keeps_pending_trim() {
        let mut m = model("a");
        m.push_edit_operations(&[
            EditOperation::insert(Position::new(1, 2), "\n    ").with_auto_whitespace(true)
        ])
        .unwrap();

        let overlapping = [
            EditOperation::delete(Range::new(1, 1, 1, 2)),
            EditOperation::delete(Range::new(1, 1, 1, 2)),
        ];
        assert_eq!(
            m.push_edit_operations(&overlapping),
            Err(TextModelError::OverlappingRanges)
        );
        assert_eq!(m.value().unwrap(), "a\n    ");

        m.push_edit_operations(&[EditOperation::insert(Position::new(1, 1), "x")])
            .unwrap();
        assert_eq!(m.value().unwrap(), "xa\n");
    }

    #[test]
    fn test_failed_replay_keeps_step() {
        let broken = || {
            UndoStep::Edits(vec![
                EditOperation::delete(Range::new(1, 1, 1, 3)),
                EditOperation::delete(Range::new(1, 2, 1, 4)),
            ])
        };
        let mut m = model("abcd");

        m.undo.push(broken());
        assert_eq!(m.undo(), Err(TextModelError::OverlappingRanges));
        assert!(m.can_undo().unwrap());
        assert!(!m.can_redo().unwrap());
        assert_eq!(m.value().unwrap(), "abcd");

        m.undo.clear();
        m.undo.push_redo(broken());
        assert_eq!(m.redo(), Err(TextModelError::OverlappingRanges));
        assert!(m.can_redo().unwrap());
        assert!(!m.can_undo().unwrap());
        assert_eq!(m.value().unwrap(), "abcd");
    }

    #[test]
    fn test_touching_deletions_out_of_order_reverse() {
        let mut m = model("abc");
        let reverse = m
            .apply_edits(
                &[
                    EditOperation::delete(Range::new(1, 2, 1, 3)),
                    EditOperation::delete(Range::new(1, 1, 1, 2)),
                ],
                true,
            )
            .unwrap()
            .unwrap();
        assert_eq!(m.value().unwrap(), "c");
        assert_eq!(reverse[0].text(), "a");
        assert_eq!(reverse[1].text(), "b");
        m.apply_edits(&reverse, false).unwrap();
        assert_eq!(m.value().unwrap(), "abc");
    }

    #[test]
    fn test_modify_position_clamps() {
        let m = model("ab\ncd");
        assert_eq!(
            m.modify_position(Position::new(1, 3), 1).unwrap(),
            Position::new(2, 1)
        );
        assert_eq!(
            m.modify_position(Position::new(1, 2), -10).unwrap(),
            Position::new(1, 1)
        );
        assert_eq!(
            m.modify_position(Position::new(2, 1), 100).unwrap(),
            Position::new(2, 3)
        );
    }

    #[test]
    fn test_listener_ids_are_distinct_across_kinds() {
        let mut m = model("abc");
        let content = m.on_did_change_content(|_| {}).unwrap();
        let decorations = m.on_did_change_decorations(|_| {}).unwrap();
        assert_ne!(content, decorations);
        assert!(m.remove_listener(decorations).unwrap());
        assert!(!m.remove_listener(decorations).unwrap());
        assert!(m.remove_listener(content).unwrap());
    }
}
