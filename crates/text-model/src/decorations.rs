//! Tracked decorations.
//!
//! A decoration is a range of the document tagged with options (a description, CSS-like class
//! name, hover text, rendering hints). Decorations are stored by UTF-16 offset in an
//! [`IntervalTree`] so they follow the text through edits according to their
//! [`TrackedRangeStickiness`]. Line/column ranges are derived lazily and cached per model version.
//!
//! Decorations are grouped by an **owner id** (`u32`). Owner `0` means "no owner": such
//! decorations match every owner filter, and a filter of `0` matches every decoration.

use crate::buffer::TextBuffer;
use crate::intervals::{IntervalHit, IntervalTree, NodeIdx, TrackedRangeStickiness};
use crate::position::Range;
use crate::registry::ModelId;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Identifier of a decoration, unique across all models of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationId {
    model: ModelId,
    seq: u64,
}

impl DecorationId {
    /// Model the decoration belongs to.
    pub fn model(self) -> ModelId {
        self.model
    }

    /// Per-model sequence number.
    pub fn seq(self) -> u64 {
        self.seq
    }
}

impl fmt::Display for DecorationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.model.get(), self.seq)
    }
}

/// Options attached to a decoration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelDecorationOptions {
    /// Human-readable purpose, for debugging.
    pub description: String,
    /// How the range reacts to typing at its edges.
    pub stickiness: TrackedRangeStickiness,
    /// The decoration covers whole lines.
    pub is_whole_line: bool,
    /// Collapse the range to the edit start when an edit replaces all of it.
    pub collapse_on_replace_edit: bool,
    /// Marks diagnostics-style decorations, which readers may filter out.
    pub is_for_validation: bool,
    /// Stacking order among overlapping decorations.
    pub z_index: i32,
    /// Class name for the decorated text.
    pub class_name: Option<String>,
    /// Text shown on hover.
    pub hover_message: Option<String>,
    /// Free-form rendering hints.
    pub hints: BTreeMap<String, String>,
}

impl ModelDecorationOptions {
    /// Options with a description and defaults for everything else.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Set [`ModelDecorationOptions::stickiness`].
    pub fn with_stickiness(mut self, stickiness: TrackedRangeStickiness) -> Self {
        self.stickiness = stickiness;
        self
    }

    /// Set [`ModelDecorationOptions::is_whole_line`].
    pub fn whole_line(mut self, value: bool) -> Self {
        self.is_whole_line = value;
        self
    }

    /// Set [`ModelDecorationOptions::collapse_on_replace_edit`].
    pub fn collapse_on_replace_edit(mut self, value: bool) -> Self {
        self.collapse_on_replace_edit = value;
        self
    }

    /// Set [`ModelDecorationOptions::is_for_validation`].
    pub fn for_validation(mut self, value: bool) -> Self {
        self.is_for_validation = value;
        self
    }

    /// Set [`ModelDecorationOptions::class_name`].
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Set [`ModelDecorationOptions::hover_message`].
    pub fn with_hover_message(mut self, message: impl Into<String>) -> Self {
        self.hover_message = Some(message.into());
        self
    }

    /// Set [`ModelDecorationOptions::z_index`].
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Add a rendering hint.
    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }
}

/// A decoration to add: its range and (shared) options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDeltaDecoration {
    /// Range to decorate.
    pub range: Range,
    /// Decoration options.
    pub options: Arc<ModelDecorationOptions>,
}

impl ModelDeltaDecoration {
    /// Create a descriptor.
    pub fn new(range: Range, options: impl Into<Arc<ModelDecorationOptions>>) -> Self {
        Self {
            range,
            options: options.into(),
        }
    }
}

/// A decoration as read back from a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDecoration {
    /// Identifier.
    pub id: DecorationId,
    /// Owner id (0 = none).
    pub owner_id: u32,
    /// Current range.
    pub range: Range,
    /// Options.
    pub options: Arc<ModelDecorationOptions>,
}

#[derive(Debug)]
struct DecorationEntry {
    id: DecorationId,
    owner_id: u32,
    options: Arc<ModelDecorationOptions>,
    range_cache: Cell<Option<(u64, Range)>>,
}

impl DecorationEntry {
    fn passes(&self, owner_filter: u32, filter_out_validation: bool) -> bool {
        if owner_filter != 0 && self.owner_id != 0 && self.owner_id != owner_filter {
            return false;
        }
        !(filter_out_validation && self.options.is_for_validation)
    }
}

/// All decorations of one model.
#[derive(Debug)]
pub struct DecorationStore {
    model_id: ModelId,
    next_seq: u64,
    tree: IntervalTree<DecorationEntry>,
    nodes: HashMap<DecorationId, NodeIdx>,
}

impl DecorationStore {
    /// Create an empty store for `model_id`.
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            next_seq: 1,
            tree: IntervalTree::new(),
            nodes: HashMap::new(),
        }
    }

    /// Number of decorations.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if there are no decorations.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` if `id` is a live decoration.
    pub fn contains(&self, id: DecorationId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Add a decoration over `range` (validated against `buffer`).
    pub fn add(
        &mut self,
        buffer: &TextBuffer,
        owner_id: u32,
        range: Range,
        options: Arc<ModelDecorationOptions>,
    ) -> DecorationId {
        let range = buffer.validate_range(range);
        let start = buffer.offset_at(range.start) as i64;
        let end = buffer.offset_at(range.end) as i64;

        let id = DecorationId {
            model: self.model_id,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let node = self.tree.insert(
            start,
            end,
            options.stickiness,
            options.collapse_on_replace_edit,
            DecorationEntry {
                id,
                owner_id,
                options,
                range_cache: Cell::new(None),
            },
        );
        self.nodes.insert(id, node);
        id
    }

    /// Remove a decoration. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: DecorationId) -> bool {
        match self.nodes.remove(&id) {
            Some(node) => self.tree.remove(node).is_some(),
            None => false,
        }
    }

    /// Move a decoration to `range` (validated against `buffer`).
    pub fn change_range(&mut self, buffer: &TextBuffer, id: DecorationId, range: Range) -> bool {
        let Some(&node) = self.nodes.get(&id) else {
            return false;
        };
        let range = buffer.validate_range(range);
        let start = buffer.offset_at(range.start) as i64;
        let end = buffer.offset_at(range.end) as i64;
        if let Some(entry) = self.tree.get(node) {
            entry.range_cache.set(None);
        }
        self.tree.set_offsets(node, start, end)
    }

    /// Replace a decoration's options.
    pub fn change_options(&mut self, id: DecorationId, options: Arc<ModelDecorationOptions>) -> bool {
        let Some(&node) = self.nodes.get(&id) else {
            return false;
        };
        self.tree
            .set_edit_behavior(node, options.stickiness, options.collapse_on_replace_edit);
        match self.tree.get_mut(node) {
            Some(entry) => {
                entry.options = options;
                true
            }
            None => false,
        }
    }

    /// Remove `old_ids` and add `new_decorations`; returns the new ids in order.
    pub fn delta(
        &mut self,
        buffer: &TextBuffer,
        owner_id: u32,
        old_ids: &[DecorationId],
        new_decorations: &[ModelDeltaDecoration],
    ) -> Vec<DecorationId> {
        for id in old_ids {
            self.remove(*id);
        }
        new_decorations
            .iter()
            .map(|d| self.add(buffer, owner_id, d.range, Arc::clone(&d.options)))
            .collect()
    }

    /// Remove every decoration owned by `owner_id`. Returns how many were removed.
    pub fn remove_all_with_owner(&mut self, owner_id: u32) -> usize {
        let doomed: Vec<NodeIdx> = self
            .tree
            .collect(|entry| entry.owner_id == owner_id)
            .into_iter()
            .map(|hit| hit.node)
            .collect();
        for node in &doomed {
            if let Some(entry) = self.tree.remove(*node) {
                self.nodes.remove(&entry.id);
            }
        }
        doomed.len()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.nodes.clear();
    }

    /// Current range of a decoration. Whole-line decorations span their full lines.
    pub fn range(&self, buffer: &TextBuffer, version: u64, id: DecorationId) -> Option<Range> {
        let node = *self.nodes.get(&id)?;
        let entry = self.tree.get(node)?;
        let range = match entry.range_cache.get() {
            Some((cached_version, range)) if cached_version == version => range,
            _ => {
                let (start, end) = self.tree.offsets(node)?;
                resolve(entry, start, end, buffer, version)
            }
        };
        if entry.options.is_whole_line {
            let max_column = buffer.line_max_column(range.end.line).unwrap_or(1);
            Some(Range::new(range.start.line, 1, range.end.line, max_column))
        } else {
            Some(range)
        }
    }

    /// Options of a decoration.
    pub fn options(&self, id: DecorationId) -> Option<Arc<ModelDecorationOptions>> {
        let node = *self.nodes.get(&id)?;
        self.tree.get(node).map(|entry| Arc::clone(&entry.options))
    }

    /// Decorations touching `range`, in document order.
    pub fn in_range(
        &self,
        buffer: &TextBuffer,
        version: u64,
        range: Range,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Vec<ModelDecoration> {
        let range = buffer.validate_range(range);
        let start = buffer.offset_at(range.start) as i64;
        let end = buffer.offset_at(range.end) as i64;
        let hits = self.tree.search(start, end, |entry| {
            entry.passes(owner_filter, filter_out_validation)
        });
        self.materialize(buffer, version, hits)
    }

    /// Every decoration, in document order.
    pub fn all(
        &self,
        buffer: &TextBuffer,
        version: u64,
        owner_filter: u32,
        filter_out_validation: bool,
    ) -> Vec<ModelDecoration> {
        let hits = self
            .tree
            .collect(|entry| entry.passes(owner_filter, filter_out_validation));
        self.materialize(buffer, version, hits)
    }

    /// Track a replacement of the text at `offset`.
    pub fn accept_replace(
        &mut self,
        offset: usize,
        length: usize,
        text_length: usize,
        force_move_markers: bool,
    ) {
        if self.tree.is_empty() {
            return;
        }
        self.tree.accept_replace(
            offset as i64,
            length as i64,
            text_length as i64,
            force_move_markers,
        );
    }

    /// Cache the line/column range of every decoration for `version`.
    ///
    /// Call before a change that rewrites offsets without moving text (a line ending change),
    /// then [`DecorationStore::rebase_on_cached_ranges`] after it.
    pub fn cache_all_ranges(&self, buffer: &TextBuffer, version: u64) {
        for hit in self.tree.iter_all() {
            if let Some(entry) = self.tree.get(hit.node) {
                resolve(entry, hit.start, hit.end, buffer, version);
            }
        }
    }

    /// Recompute offsets from the cached ranges against the rewritten `buffer`, and re-key the
    /// caches to `version`.
    pub fn rebase_on_cached_ranges(&mut self, buffer: &TextBuffer, version: u64) {
        self.tree.remap_offsets(|_, entry, start, end| match entry.range_cache.get() {
            Some((_, range)) => {
                entry.range_cache.set(Some((version, range)));
                (
                    buffer.offset_at(range.start) as i64,
                    buffer.offset_at(range.end) as i64,
                )
            }
            None => (start, end),
        });
    }

    fn materialize(
        &self,
        buffer: &TextBuffer,
        version: u64,
        hits: Vec<IntervalHit>,
    ) -> Vec<ModelDecoration> {
        hits.into_iter()
            .filter_map(|hit| {
                let entry = self.tree.get(hit.node)?;
                Some(ModelDecoration {
                    id: entry.id,
                    owner_id: entry.owner_id,
                    range: resolve(entry, hit.start, hit.end, buffer, version),
                    options: Arc::clone(&entry.options),
                })
            })
            .collect()
    }
}

fn resolve(
    entry: &DecorationEntry,
    start: i64,
    end: i64,
    buffer: &TextBuffer,
    version: u64,
) -> Range {
    if let Some((cached_version, range)) = entry.range_cache.get()
        && cached_version == version
    {
        return range;
    }
    let range = Range::from_positions(
        buffer.position_at(start.max(0) as usize),
        buffer.position_at(end.max(0) as usize),
    );
    entry.range_cache.set(Some((version, range)));
    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_ending::LineEnding;
    use crate::position::Position;

    fn options(description: &str) -> Arc<ModelDecorationOptions> {
        Arc::new(ModelDecorationOptions::new(description))
    }

    #[test]
    fn test_decoration_id_display() {
        let mut store = DecorationStore::new(ModelId::new(7));
        let buffer = TextBuffer::from_text("abc", LineEnding::Lf);
        let id = store.add(&buffer, 0, Range::new(1, 1, 1, 2), options("x"));
        assert_eq!(id.to_string(), "7;1");
        let second = store.add(&buffer, 0, Range::new(1, 1, 1, 2), options("x"));
        assert_eq!(second.seq(), 2);
        assert_eq!(second.model(), ModelId::new(7));
    }

    #[test]
    fn test_owner_filter() {
        let mut store = DecorationStore::new(ModelId::new(1));
        let buffer = TextBuffer::from_text("hello world", LineEnding::Lf);
        let unowned = store.add(&buffer, 0, Range::new(1, 1, 1, 3), options("none"));
        let mine = store.add(&buffer, 5, Range::new(1, 2, 1, 4), options("mine"));
        let theirs = store.add(&buffer, 6, Range::new(1, 3, 1, 5), options("theirs"));

        let ids = |owner| -> Vec<DecorationId> {
            store
                .all(&buffer, 1, owner, false)
                .into_iter()
                .map(|d| d.id)
                .collect()
        };
        assert_eq!(ids(0), vec![unowned, mine, theirs]);
        assert_eq!(ids(5), vec![unowned, mine]);

        assert_eq!(store.remove_all_with_owner(6), 1);
        assert!(!store.contains(theirs));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_validation_filter() {
        let mut store = DecorationStore::new(ModelId::new(1));
        let buffer = TextBuffer::from_text("hello", LineEnding::Lf);
        store.add(
            &buffer,
            0,
            Range::new(1, 1, 1, 3),
            Arc::new(ModelDecorationOptions::new("error").for_validation(true)),
        );
        store.add(&buffer, 0, Range::new(1, 1, 1, 3), options("plain"));
        assert_eq!(store.all(&buffer, 1, 0, false).len(), 2);
        assert_eq!(store.all(&buffer, 1, 0, true).len(), 1);
    }

    #[test]
    fn test_whole_line_range() {
        let mut store = DecorationStore::new(ModelId::new(1));
        let buffer = TextBuffer::from_text("first\nsecond line", LineEnding::Lf);
        let id = store.add(
            &buffer,
            0,
            Range::new(1, 3, 2, 2),
            Arc::new(ModelDecorationOptions::new("block").whole_line(true)),
        );
        assert_eq!(store.range(&buffer, 1, id), Some(Range::new(1, 1, 2, 12)));
    }

    #[test]
    fn test_range_cache_follows_version() {
        let mut store = DecorationStore::new(ModelId::new(1));
        let mut buffer = TextBuffer::from_text("abcdef", LineEnding::Lf);
        let id = store.add(&buffer, 0, Range::new(1, 3, 1, 5), options("x"));
        assert_eq!(store.range(&buffer, 1, id), Some(Range::new(1, 3, 1, 5)));

        buffer
            .apply_edits(
                &[crate::EditOperation::insert(Position::new(1, 1), "\n")],
                false,
                |change, force| {
                    store.accept_replace(
                        change.range_offset,
                        change.range_length,
                        crate::text::utf16_len(&change.text),
                        force,
                    )
                },
            )
            .unwrap();
        assert_eq!(store.range(&buffer, 2, id), Some(Range::new(2, 3, 2, 5)));
    }

    #[test]
    fn test_delta_replaces_old_ids() {
        let mut store = DecorationStore::new(ModelId::new(1));
        let buffer = TextBuffer::from_text("abc\ndef", LineEnding::Lf);
        let first = store.delta(
            &buffer,
            3,
            &[],
            &[
                ModelDeltaDecoration::new(Range::new(1, 1, 1, 2), options("a")),
                ModelDeltaDecoration::new(Range::new(2, 1, 2, 2), options("b")),
            ],
        );
        assert_eq!(first.len(), 2);

        let second = store.delta(
            &buffer,
            3,
            &first,
            &[ModelDeltaDecoration::new(Range::new(1, 2, 1, 3), options("c"))],
        );
        assert_eq!(store.len(), 1);
        assert!(second[0] > first[1]);
        assert_eq!(
            store.options(second[0]).map(|o| o.description.clone()),
            Some("c".to_string())
        );
    }
}
