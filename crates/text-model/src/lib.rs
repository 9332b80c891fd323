#![warn(missing_docs)]
//! Text Model - Headless Text Document Engine
//!
//! # Overview
//!
//! `text-model` holds editable text for an editor front end. It converts exactly between
//! positions and offsets, applies batches of edits atomically, reports what changed line by
//! line, and keeps tagged ranges (decorations) anchored while the text moves under them.
//! Rendering, layout, cursors and tokenization live elsewhere and only consume the read and
//! event interfaces.
//!
//! # Coordinates
//!
//! - Positions are 1-based `(line, column)`.
//! - Columns and offsets count UTF-16 code units; offsets are 0-based and include line breaks.
//! - Out-of-range coordinates are clamped, never rejected, and a column is never left between
//!   the two halves of a surrogate pair.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ModelRegistry / TextModel                  │  ← Public API, undo/redo
//! ├─────────────────────────────────────────────┤
//! │  Change events (deferred, merged)           │  ← Notifications
//! ├─────────────────────────────────────────────┤
//! │  Decorations (interval tree)                │  ← Tracked ranges
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (validation, batch edits)       │  ← Document
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use text_model::{
//!     EditOperation, ModelDecorationOptions, ModelDeltaDecoration, ModelRegistry, Position,
//!     Range, TrackedRangeStickiness,
//! };
//!
//! let mut registry = ModelRegistry::default();
//! let id = registry.create_model("fn main() {}\n");
//! let model = registry.get_mut(id).unwrap();
//!
//! let options = ModelDecorationOptions::new("highlight")
//!     .with_stickiness(TrackedRangeStickiness::NeverGrowsWhenTypingAtEdges);
//! let ids = model
//!     .delta_decorations(0, &[], &[ModelDeltaDecoration::new(Range::new(1, 4, 1, 8), options)])
//!     .unwrap();
//!
//! model
//!     .push_edit_operations(&[EditOperation::insert(Position::new(1, 1), "pub ")])
//!     .unwrap();
//!
//! assert_eq!(model.line_content(1).unwrap(), "pub fn main() {}");
//! assert_eq!(model.decoration_range(ids[0]).unwrap(), Some(Range::new(1, 8, 1, 12)));
//!
//! model.undo().unwrap();
//! assert_eq!(model.line_content(1).unwrap(), "fn main() {}");
//! ```
//!
//! # Module Description
//!
//! - [`position`] - Positions and ranges
//! - [`line_index`] - Rope based line index with UTF-16 offsets
//! - [`buffer`] - Line-addressable text buffer and batch edits
//! - [`builder`] - Chunked buffer construction with BOM and line ending detection
//! - [`intervals`] - Interval tree with edge stickiness
//! - [`decorations`] - Decoration store on top of the interval tree
//! - [`delta`] / [`events`] - Change events and deferred delivery
//! - [`model`] - The text model
//! - [`registry`] - Model ownership and ids
//!
//! Logging goes through `tracing`; install a subscriber in the host application to see it.

pub mod buffer;
pub mod builder;
pub mod decorations;
pub mod delta;
pub mod edit;
pub mod error;
pub mod events;
pub mod intervals;
pub mod line_ending;
pub mod line_index;
pub mod model;
pub mod options;
pub mod position;
pub mod registry;
pub mod snapshot;
mod text;
mod undo;

pub use buffer::TextBuffer;
pub use builder::{TextBufferBuilder, TextBufferFactory};
pub use decorations::{
    DecorationId, DecorationStore, ModelDecoration, ModelDecorationOptions, ModelDeltaDecoration,
};
pub use delta::{
    DecorationsChangedEvent, ModelContentChange, ModelContentChangedEvent, RawContentChange,
};
pub use edit::{ApplyEditsResult, EditOperation};
pub use error::TextModelError;
pub use events::{DeferredEmitter, ListenerId, MergeEvent};
pub use intervals::{IntervalTree, TrackedRangeStickiness};
pub use line_ending::{EndOfLinePreference, LineEnding};
pub use line_index::LineIndex;
pub use model::{DecorationAccessor, DecorationTransaction, EventScope, TextModel};
pub use options::{DEFAULT_MAX_UNDO_DEPTH, TextModelOptions};
pub use position::{Position, Range};
pub use registry::{ModelId, ModelRegistry};
pub use snapshot::{SNAPSHOT_CHUNK_SIZE, TextSnapshot};
