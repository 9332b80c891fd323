//! Interval tree for tracked ranges.
//!
//! A red-black tree of `[start, end]` offset intervals, ordered by start then end. Nodes live in
//! an arena (`Vec`) and link to each other by index; index 0 is a shared sentinel.
//!
//! Offsets are **delta encoded**: every node carries a `delta` that applies to its whole right
//! subtree, so an edit shifts everything after it by touching O(log N) nodes instead of all of
//! them. A node's absolute offsets are its own `start`/`end` plus the deltas of every ancestor
//! whose right subtree contains it. `max_end` (the largest end in the subtree, in the node's own
//! frame) lets overlap searches prune whole subtrees.
//!
//! # Complexity
//!
//! - insert / remove / re-range: O(log N)
//! - overlap search: O(log N + K)
//! - [`IntervalTree::accept_replace`]: O(log N + K) where K is the number of intervals touching
//!   the edited region

/// How a tracked range's edges react to text typed exactly at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackedRangeStickiness {
    /// Typing at either edge extends the range.
    #[default]
    AlwaysGrowsWhenTypingAtEdges,
    /// Typing at either edge leaves the range as is.
    NeverGrowsWhenTypingAtEdges,
    /// Only typing at the start edge extends the range.
    GrowsOnlyWhenTypingBefore,
    /// Only typing at the end edge extends the range.
    GrowsOnlyWhenTypingAfter,
}

impl TrackedRangeStickiness {
    /// The start edge stays attached to the character before it.
    fn start_sticks_to_previous(self) -> bool {
        matches!(
            self,
            Self::AlwaysGrowsWhenTypingAtEdges | Self::GrowsOnlyWhenTypingBefore
        )
    }

    /// The end edge stays attached to the character before it.
    fn end_sticks_to_previous(self) -> bool {
        matches!(
            self,
            Self::NeverGrowsWhenTypingAtEdges | Self::GrowsOnlyWhenTypingBefore
        )
    }
}

/// Arena index of a tree node. Stable for the lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

/// A node found by a search, with its absolute offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalHit {
    /// The node.
    pub node: NodeIdx,
    /// Absolute start offset.
    pub start: i64,
    /// Absolute end offset.
    pub end: i64,
}

const SENTINEL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<T> {
    parent: usize,
    left: usize,
    right: usize,
    color: Color,
    start: i64,
    end: i64,
    delta: i64,
    max_end: i64,
    stickiness: TrackedRangeStickiness,
    collapse_on_replace_edit: bool,
    value: Option<T>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            color: Color::Black,
            start: 0,
            end: 0,
            delta: 0,
            max_end: 0,
            stickiness: TrackedRangeStickiness::default(),
            collapse_on_replace_edit: false,
            value: None,
        }
    }
}

/// Delta-encoded red-black interval tree.
#[derive(Debug)]
pub struct IntervalTree<T> {
    nodes: Vec<Node<T>>,
    root: usize,
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel()],
            root: SENTINEL,
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the tree holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every interval.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[SENTINEL] = Node::sentinel();
        self.root = SENTINEL;
        self.free.clear();
        self.len = 0;
    }

    /// Insert `[start, end]` carrying `value`.
    pub fn insert(
        &mut self,
        start: i64,
        end: i64,
        stickiness: TrackedRangeStickiness,
        collapse_on_replace_edit: bool,
        value: T,
    ) -> NodeIdx {
        let node = Node {
            start,
            end: end.max(start),
            stickiness,
            collapse_on_replace_edit,
            value: Some(value),
            ..Node::sentinel()
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.rb_insert(idx);
        self.len += 1;
        NodeIdx(idx)
    }

    /// Remove a node and return its value.
    pub fn remove(&mut self, node: NodeIdx) -> Option<T> {
        let idx = self.live(node)?;
        self.rb_delete(idx);
        let value = self.nodes[idx].value.take();
        self.free.push(idx);
        self.len -= 1;
        value
    }

    /// Value stored at `node`.
    pub fn get(&self, node: NodeIdx) -> Option<&T> {
        self.nodes.get(node.0)?.value.as_ref()
    }

    /// Mutable value stored at `node`.
    pub fn get_mut(&mut self, node: NodeIdx) -> Option<&mut T> {
        self.nodes.get_mut(node.0)?.value.as_mut()
    }

    /// Absolute `(start, end)` of `node`, resolved through its ancestors' deltas.
    pub fn offsets(&self, node: NodeIdx) -> Option<(i64, i64)> {
        let mut idx = self.live(node)?;
        let mut start = self.nodes[idx].start;
        let mut end = self.nodes[idx].end;
        while idx != self.root {
            let parent = self.nodes[idx].parent;
            if self.nodes[parent].right == idx {
                start += self.nodes[parent].delta;
                end += self.nodes[parent].delta;
            }
            idx = parent;
        }
        Some((start, end))
    }

    /// Move `node` to new absolute offsets.
    pub fn set_offsets(&mut self, node: NodeIdx, start: i64, end: i64) -> bool {
        let Some(idx) = self.live(node) else {
            return false;
        };
        self.rb_delete(idx);
        self.nodes[idx].start = start;
        self.nodes[idx].end = end.max(start);
        self.rb_insert(idx);
        true
    }

    /// Change how `node` reacts to edits.
    pub fn set_edit_behavior(
        &mut self,
        node: NodeIdx,
        stickiness: TrackedRangeStickiness,
        collapse_on_replace_edit: bool,
    ) {
        if let Some(idx) = self.live(node) {
            self.nodes[idx].stickiness = stickiness;
            self.nodes[idx].collapse_on_replace_edit = collapse_on_replace_edit;
        }
    }

    /// Every node touching `[start, end]` (edges included) whose value passes `filter`, in
    /// ascending order.
    pub fn search<F>(&self, start: i64, end: i64, filter: F) -> Vec<IntervalHit>
    where
        F: Fn(&T) -> bool,
    {
        let mut hits = Vec::new();
        self.search_in(self.root, 0, start, end, &filter, &mut hits);
        hits
    }

    /// Every node in ascending order.
    pub fn iter_all(&self) -> Vec<IntervalHit> {
        self.search(i64::MIN, i64::MAX, |_| true)
    }

    /// Nodes whose value passes `filter`, in ascending order.
    pub fn collect<F>(&self, filter: F) -> Vec<IntervalHit>
    where
        F: Fn(&T) -> bool,
    {
        self.search(i64::MIN, i64::MAX, filter)
    }

    /// Track the replacement of `length` units at `offset` by `text_length` new units.
    ///
    /// Intervals touching the replaced region are taken out, adjusted by their stickiness and
    /// put back; every interval starting after the region shifts by the length difference.
    pub fn accept_replace(
        &mut self,
        offset: i64,
        length: i64,
        text_length: i64,
        force_move_markers: bool,
    ) {
        let end = offset + length;
        let touched = self.search(offset, end, |_| true);
        for hit in &touched {
            self.rb_delete(hit.node.0);
        }

        self.shift_after(self.root, 0, offset, end, text_length - length);

        for hit in touched {
            let idx = hit.node.0;
            let (start, new_end) = adjust_for_edit(
                hit.start,
                hit.end,
                self.nodes[idx].stickiness,
                self.nodes[idx].collapse_on_replace_edit,
                offset,
                end,
                text_length,
                force_move_markers,
            );
            self.nodes[idx].start = start;
            self.nodes[idx].end = new_end;
            self.rb_insert(idx);
        }
        tracing::trace!(offset, length, text_length, "interval tree accepted replace");
    }

    /// Recompute every node's absolute offsets with `remap`.
    ///
    /// `remap` must preserve the relative order of intervals.
    pub fn remap_offsets<F>(&mut self, mut remap: F)
    where
        F: FnMut(NodeIdx, &T, i64, i64) -> (i64, i64),
    {
        let root = self.root;
        self.remap_in(root, 0, &mut remap);
    }

    fn live(&self, node: NodeIdx) -> Option<usize> {
        let idx = node.0;
        (idx != SENTINEL && self.nodes.get(idx)?.value.is_some()).then_some(idx)
    }

    fn search_in<F>(
        &self,
        idx: usize,
        delta: i64,
        start: i64,
        end: i64,
        filter: &F,
        hits: &mut Vec<IntervalHit>,
    ) where
        F: Fn(&T) -> bool,
    {
        if idx == SENTINEL {
            return;
        }
        let node = &self.nodes[idx];
        if node.max_end.saturating_add(delta) < start {
            return;
        }
        self.search_in(node.left, delta, start, end, filter, hits);

        let node_start = node.start + delta;
        if node_start > end {
            return;
        }
        let node_end = node.end + delta;
        if node_end >= start && node.value.as_ref().is_some_and(filter) {
            hits.push(IntervalHit {
                node: NodeIdx(idx),
                start: node_start,
                end: node_end,
            });
        }
        self.search_in(node.right, delta + node.delta, start, end, filter, hits);
    }

    /// Shift every node starting after `end` by `edit_delta`. No node may overlap
    /// `[start, end]` when this runs.
    fn shift_after(&mut self, idx: usize, delta: i64, start: i64, end: i64, edit_delta: i64) {
        if idx == SENTINEL || self.nodes[idx].max_end + delta < start {
            return;
        }
        let left = self.nodes[idx].left;
        self.shift_after(left, delta, start, end, edit_delta);

        if self.nodes[idx].start + delta > end {
            // The right subtree follows through `delta`.
            let node = &mut self.nodes[idx];
            node.start += edit_delta;
            node.end += edit_delta;
            node.delta += edit_delta;
        } else {
            let right = self.nodes[idx].right;
            let right_delta = delta + self.nodes[idx].delta;
            self.shift_after(right, right_delta, start, end, edit_delta);
        }
        self.recompute_max_end(idx);
    }

    fn remap_in<F>(&mut self, idx: usize, delta: i64, remap: &mut F)
    where
        F: FnMut(NodeIdx, &T, i64, i64) -> (i64, i64),
    {
        if idx == SENTINEL {
            return;
        }
        let (left, right, node_delta) = {
            let node = &self.nodes[idx];
            (node.left, node.right, node.delta)
        };
        self.remap_in(left, delta, remap);
        self.remap_in(right, delta + node_delta, remap);

        let node = &self.nodes[idx];
        let Some(value) = node.value.as_ref() else {
            return;
        };
        let (start, end) = remap(NodeIdx(idx), value, node.start + delta, node.end + delta);
        let node = &mut self.nodes[idx];
        node.start = start - delta;
        node.end = end.max(start) - delta;
        self.recompute_max_end(idx);
    }

    // ---- red-black machinery ------------------------------------------------------------

    fn compute_max_end(&self, idx: usize) -> i64 {
        let node = &self.nodes[idx];
        let mut max_end = node.end;
        if node.left != SENTINEL {
            max_end = max_end.max(self.nodes[node.left].max_end);
        }
        if node.right != SENTINEL {
            max_end = max_end.max(self.nodes[node.right].max_end + node.delta);
        }
        max_end
    }

    fn recompute_max_end(&mut self, idx: usize) {
        self.nodes[idx].max_end = self.compute_max_end(idx);
    }

    fn recompute_max_end_to_root(&mut self, mut idx: usize) {
        while idx != SENTINEL {
            let max_end = self.compute_max_end(idx);
            if self.nodes[idx].max_end == max_end {
                return;
            }
            self.nodes[idx].max_end = max_end;
            idx = self.nodes[idx].parent;
        }
    }

    fn color(&self, idx: usize) -> Color {
        self.nodes[idx].color
    }

    fn set_color(&mut self, idx: usize, color: Color) {
        self.nodes[idx].color = color;
    }

    fn leftmost(&self, mut idx: usize) -> usize {
        while self.nodes[idx].left != SENTINEL {
            idx = self.nodes[idx].left;
        }
        idx
    }

    fn reset_sentinel(&mut self) {
        let sentinel = &mut self.nodes[SENTINEL];
        sentinel.parent = SENTINEL;
        sentinel.left = SENTINEL;
        sentinel.right = SENTINEL;
        sentinel.delta = 0;
        sentinel.start = 0;
        sentinel.end = 0;
        sentinel.max_end = 0;
        sentinel.color = Color::Black;
    }

    fn detach(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.parent = SENTINEL;
        node.left = SENTINEL;
        node.right = SENTINEL;
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if parent == SENTINEL {
            self.root = new;
        } else if self.nodes[parent].left == old {
            self.nodes[parent].left = new;
        } else {
            self.nodes[parent].right = new;
        }
    }

    fn left_rotate(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let x_delta = self.nodes[x].delta;
        {
            let y_node = &mut self.nodes[y];
            y_node.delta += x_delta;
            y_node.start += x_delta;
            y_node.end += x_delta;
        }

        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if y_left != SENTINEL {
            self.nodes[y_left].parent = x;
        }
        let x_parent = self.nodes[x].parent;
        self.nodes[y].parent = x_parent;
        self.replace_child(x_parent, x, y);

        self.nodes[y].left = x;
        self.nodes[x].parent = y;

        self.recompute_max_end(x);
        self.recompute_max_end(y);
    }

    fn right_rotate(&mut self, y: usize) {
        let x = self.nodes[y].left;
        let x_delta = self.nodes[x].delta;
        {
            let y_node = &mut self.nodes[y];
            y_node.delta -= x_delta;
            y_node.start -= x_delta;
            y_node.end -= x_delta;
        }

        let x_right = self.nodes[x].right;
        self.nodes[y].left = x_right;
        if x_right != SENTINEL {
            self.nodes[x_right].parent = y;
        }
        let y_parent = self.nodes[y].parent;
        self.nodes[x].parent = y_parent;
        self.replace_child(y_parent, y, x);

        self.nodes[x].right = y;
        self.nodes[y].parent = x;

        self.recompute_max_end(y);
        self.recompute_max_end(x);
    }

    /// Plain BST insert of a detached node whose `start`/`end` are absolute.
    fn tree_insert(&mut self, z: usize) {
        let z_start = self.nodes[z].start;
        let z_end = self.nodes[z].end;
        let mut delta = 0;
        let mut x = self.root;

        loop {
            let x_start = self.nodes[x].start + delta;
            let x_end = self.nodes[x].end + delta;
            if (z_start, z_end) < (x_start, x_end) {
                if self.nodes[x].left == SENTINEL {
                    self.rebase(z, delta);
                    self.nodes[x].left = z;
                    break;
                }
                x = self.nodes[x].left;
            } else {
                if self.nodes[x].right == SENTINEL {
                    let frame = delta + self.nodes[x].delta;
                    self.rebase(z, frame);
                    self.nodes[x].right = z;
                    break;
                }
                delta += self.nodes[x].delta;
                x = self.nodes[x].right;
            }
        }

        let node = &mut self.nodes[z];
        node.parent = x;
        node.left = SENTINEL;
        node.right = SENTINEL;
        node.color = Color::Red;
    }

    fn rebase(&mut self, idx: usize, frame: i64) {
        let node = &mut self.nodes[idx];
        node.start -= frame;
        node.end -= frame;
        node.max_end -= frame;
    }

    fn rb_insert(&mut self, z: usize) {
        {
            let node = &mut self.nodes[z];
            node.parent = SENTINEL;
            node.left = SENTINEL;
            node.right = SENTINEL;
            node.delta = 0;
            node.max_end = node.end;
        }

        if self.root == SENTINEL {
            self.nodes[z].color = Color::Black;
            self.root = z;
            return;
        }

        self.tree_insert(z);
        self.recompute_max_end_to_root(self.nodes[z].parent);

        let mut x = z;
        while x != self.root && self.color(self.nodes[x].parent) == Color::Red {
            let parent = self.nodes[x].parent;
            let grand = self.nodes[parent].parent;
            if parent == self.nodes[grand].left {
                let uncle = self.nodes[grand].right;
                if self.color(uncle) == Color::Red {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grand, Color::Red);
                    x = grand;
                } else {
                    if x == self.nodes[parent].right {
                        x = parent;
                        self.left_rotate(x);
                    }
                    let parent = self.nodes[x].parent;
                    let grand = self.nodes[parent].parent;
                    self.set_color(parent, Color::Black);
                    self.set_color(grand, Color::Red);
                    self.right_rotate(grand);
                }
            } else {
                let uncle = self.nodes[grand].left;
                if self.color(uncle) == Color::Red {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grand, Color::Red);
                    x = grand;
                } else {
                    if x == self.nodes[parent].left {
                        x = parent;
                        self.right_rotate(x);
                    }
                    let parent = self.nodes[x].parent;
                    let grand = self.nodes[parent].parent;
                    self.set_color(parent, Color::Black);
                    self.set_color(grand, Color::Red);
                    self.left_rotate(grand);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Unlink `z` from the tree. Its value and offsets stay in the arena slot; its offsets are
    /// left in an unspecified frame.
    fn rb_delete(&mut self, z: usize) {
        let x;
        let y;

        if self.nodes[z].left == SENTINEL {
            x = self.nodes[z].right;
            y = z;
            // x takes z's place and so loses z's frame.
            let z_delta = self.nodes[z].delta;
            let x_node = &mut self.nodes[x];
            x_node.delta += z_delta;
            x_node.start += z_delta;
            x_node.end += z_delta;
        } else if self.nodes[z].right == SENTINEL {
            x = self.nodes[z].left;
            y = z;
        } else {
            y = self.leftmost(self.nodes[z].right);
            x = self.nodes[y].right;

            let y_delta = self.nodes[y].delta;
            let x_node = &mut self.nodes[x];
            x_node.start += y_delta;
            x_node.end += y_delta;
            x_node.delta += y_delta;

            let z_delta = self.nodes[z].delta;
            let y_node = &mut self.nodes[y];
            y_node.start += z_delta;
            y_node.end += z_delta;
            y_node.delta = z_delta;
        }

        if y == self.root {
            self.root = x;
            self.set_color(x, Color::Black);
            self.detach(z);
            self.reset_sentinel();
            self.recompute_max_end(x);
            let root = self.root;
            self.nodes[root].parent = SENTINEL;
            return;
        }

        let y_was_red = self.color(y) == Color::Red;
        let y_parent = self.nodes[y].parent;
        if y == self.nodes[y_parent].left {
            self.nodes[y_parent].left = x;
        } else {
            self.nodes[y_parent].right = x;
        }

        if y == z {
            self.nodes[x].parent = y_parent;
        } else {
            self.nodes[x].parent = if y_parent == z { y } else { y_parent };

            let (z_left, z_right, z_parent, z_color) = {
                let node = &self.nodes[z];
                (node.left, node.right, node.parent, node.color)
            };
            {
                let y_node = &mut self.nodes[y];
                y_node.left = z_left;
                y_node.right = z_right;
                y_node.parent = z_parent;
                y_node.color = z_color;
            }
            self.replace_child(z_parent, z, y);
            if z_left != SENTINEL {
                self.nodes[z_left].parent = y;
            }
            if z_right != SENTINEL {
                self.nodes[z_right].parent = y;
            }
        }

        self.detach(z);

        if y_was_red {
            self.recompute_max_end_to_root(self.nodes[x].parent);
            if y != z {
                self.recompute_max_end_to_root(y);
                self.recompute_max_end_to_root(self.nodes[y].parent);
            }
            self.reset_sentinel();
            return;
        }

        self.recompute_max_end_to_root(x);
        self.recompute_max_end_to_root(self.nodes[x].parent);
        if y != z {
            self.recompute_max_end_to_root(y);
            self.recompute_max_end_to_root(self.nodes[y].parent);
        }

        let mut x = x;
        while x != self.root && self.color(x) == Color::Black {
            let parent = self.nodes[x].parent;
            if x == self.nodes[parent].left {
                let mut w = self.nodes[parent].right;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.left_rotate(parent);
                    w = self.nodes[self.nodes[x].parent].right;
                }
                let (w_left, w_right) = (self.nodes[w].left, self.nodes[w].right);
                if self.color(w_left) == Color::Black && self.color(w_right) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.nodes[x].parent;
                } else {
                    if self.color(w_right) == Color::Black {
                        self.set_color(w_left, Color::Black);
                        self.set_color(w, Color::Red);
                        self.right_rotate(w);
                        w = self.nodes[self.nodes[x].parent].right;
                    }
                    let parent = self.nodes[x].parent;
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, Color::Black);
                    let w_right = self.nodes[w].right;
                    self.set_color(w_right, Color::Black);
                    self.left_rotate(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.nodes[parent].left;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.right_rotate(parent);
                    w = self.nodes[self.nodes[x].parent].left;
                }
                let (w_left, w_right) = (self.nodes[w].left, self.nodes[w].right);
                if self.color(w_left) == Color::Black && self.color(w_right) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.nodes[x].parent;
                } else {
                    if self.color(w_left) == Color::Black {
                        self.set_color(w_right, Color::Black);
                        self.set_color(w, Color::Red);
                        self.left_rotate(w);
                        w = self.nodes[self.nodes[x].parent].left;
                    }
                    let parent = self.nodes[x].parent;
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, Color::Black);
                    let w_left = self.nodes[w].left;
                    self.set_color(w_left, Color::Black);
                    self.right_rotate(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
        self.reset_sentinel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerMove {
    /// Markers at the check offset move past the inserted text.
    ForceMove,
    /// Markers at the check offset stay put.
    ForceStay,
    /// The marker's own stickiness decides.
    MarkerDefined,
}

/// `true` if a marker at `marker` stays before `check` (and so is not moved).
fn stays_before(marker: i64, sticks_to_previous: bool, check: i64, semantics: MarkerMove) -> bool {
    if marker < check {
        return true;
    }
    if marker > check {
        return false;
    }
    match semantics {
        MarkerMove::ForceMove => false,
        MarkerMove::ForceStay => true,
        MarkerMove::MarkerDefined => sticks_to_previous,
    }
}

/// New `[start, end]` of an interval touching the replacement of `[edit_start, edit_end]` by
/// `text_length` units.
#[allow(clippy::too_many_arguments)]
pub fn adjust_for_edit(
    start: i64,
    end: i64,
    stickiness: TrackedRangeStickiness,
    collapse_on_replace_edit: bool,
    edit_start: i64,
    edit_end: i64,
    text_length: i64,
    force_move_markers: bool,
) -> (i64, i64) {
    let start_sticks = stickiness.start_sticks_to_previous();
    let end_sticks = stickiness.end_sticks_to_previous();

    let deleting = edit_end - edit_start;
    let inserting = text_length;
    let common = deleting.min(inserting);

    let mut new_start = start;
    let mut new_end = end;
    let mut start_done = false;
    let mut end_done = false;

    if edit_start <= start && end <= edit_end && collapse_on_replace_edit {
        new_start = edit_start;
        new_end = edit_start;
        start_done = true;
        end_done = true;
    }

    // Markers at the edit start.
    let semantics = if force_move_markers {
        MarkerMove::ForceMove
    } else if deleting > 0 {
        MarkerMove::ForceStay
    } else {
        MarkerMove::MarkerDefined
    };
    if !start_done && stays_before(start, start_sticks, edit_start, semantics) {
        start_done = true;
    }
    if !end_done && stays_before(end, end_sticks, edit_start, semantics) {
        end_done = true;
    }

    // Markers inside the part that is overwritten in place.
    if common > 0 && !force_move_markers {
        let semantics = if deleting > inserting {
            MarkerMove::ForceStay
        } else {
            MarkerMove::MarkerDefined
        };
        if !start_done && stays_before(start, start_sticks, edit_start + common, semantics) {
            start_done = true;
        }
        if !end_done && stays_before(end, end_sticks, edit_start + common, semantics) {
            end_done = true;
        }
    }

    // Markers inside the deleted tail snap to the end of the inserted text.
    let semantics = if force_move_markers {
        MarkerMove::ForceMove
    } else {
        MarkerMove::MarkerDefined
    };
    if !start_done && stays_before(start, start_sticks, edit_end, semantics) {
        new_start = edit_start + inserting;
        start_done = true;
    }
    if !end_done && stays_before(end, end_sticks, edit_end, semantics) {
        new_end = edit_start + inserting;
        end_done = true;
    }

    // Everything else is after the edit and shifts.
    let shift = inserting - deleting;
    if !start_done {
        new_start = (start + shift).max(0);
    }
    if !end_done {
        new_end = (end + shift).max(0);
    }
    if new_start > new_end {
        new_end = new_start;
    }
    (new_start, new_end)
}
