//! Linear undo/redo history.

use crate::edit::EditOperation;
use crate::line_ending::LineEnding;

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UndoStep {
    /// Operations that revert (or, on the redo stack, re-apply) an edit batch.
    Edits(Vec<EditOperation>),
    /// Switch the document to this line ending.
    Eol(LineEnding),
}

#[derive(Debug)]
pub(crate) struct UndoRedoStack {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    /// Clean point tracking. Uses `undo_stack.len()` as the saved position in the linear history.
    /// When `redo_stack` is non-empty, `clean_index` may be greater than `undo_stack.len()`.
    clean_index: Option<usize>,
}

impl UndoRedoStack {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            clean_index: Some(0),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    pub fn mark_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
    }

    pub fn set_max_undo(&mut self, max_undo: usize) {
        self.max_undo = max_undo;
        while self.undo_stack.len() > max_undo {
            self.drop_oldest();
        }
    }

    /// Forget everything; the current state becomes the clean point.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clean_index = Some(0);
    }

    /// Record a new step. Invalidates the redo history.
    pub fn push(&mut self, step: UndoStep) {
        if !self.redo_stack.is_empty() {
            // If the clean point is in the redo area it becomes unreachable.
            if let Some(clean_index) = self.clean_index
                && clean_index > self.undo_stack.len()
            {
                self.clean_index = None;
            }
            self.redo_stack.clear();
        }

        if self.max_undo == 0 {
            return;
        }
        if self.undo_stack.len() >= self.max_undo {
            self.drop_oldest();
        }
        self.undo_stack.push(step);
    }

    pub fn pop_undo(&mut self) -> Option<UndoStep> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<UndoStep> {
        self.redo_stack.pop()
    }

    /// Record the inverse of a step that was just undone.
    pub fn push_redo(&mut self, step: UndoStep) {
        self.redo_stack.push(step);
    }

    /// Record the inverse of a step that was just redone. Keeps the redo history.
    pub fn push_undo_after_redo(&mut self, step: UndoStep) {
        self.undo_stack.push(step);
    }

    fn drop_oldest(&mut self) {
        if self.undo_stack.is_empty() {
            return;
        }
        self.undo_stack.remove(0);
        self.clean_index = match self.clean_index {
            Some(0) | None => None,
            Some(clean_index) => Some(clean_index - 1),
        };
    }
}
