//! Pull-based content snapshots.

use crate::text::UTF8_BOM;
use ropey::Rope;

/// Upper bound for one chunk returned by [`TextSnapshot`], in bytes.
///
/// A single rope leaf larger than the remaining room is still returned whole, so a chunk may
/// exceed the bound only when it holds exactly one leaf.
pub const SNAPSHOT_CHUNK_SIZE: usize = 64 * 1024;

/// Frozen view of a buffer's text, read in bounded chunks.
///
/// Cloning a rope is O(1) and shares nodes, so creating a snapshot is cheap and later edits to
/// the buffer do not show through.
#[derive(Debug, Clone)]
pub struct TextSnapshot {
    rope: Rope,
    byte_pos: usize,
    pending_bom: bool,
}

impl TextSnapshot {
    pub(crate) fn new(rope: Rope, with_bom: bool) -> Self {
        Self {
            rope,
            byte_pos: 0,
            pending_bom: with_bom,
        }
    }

    /// Read everything that is left into one string.
    pub fn read_to_string(self) -> String {
        self.collect()
    }
}

impl Iterator for TextSnapshot {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut out = String::new();
        if self.pending_bom {
            self.pending_bom = false;
            out.push(UTF8_BOM);
        }

        let total = self.rope.len_bytes();
        let mut pos = self.byte_pos;
        if pos < total {
            let (chunks, chunk_start, _, _) = self.rope.chunks_at_byte(pos);
            let mut skip = pos - chunk_start;
            for chunk in chunks {
                let piece = &chunk[skip..];
                skip = 0;
                if !out.is_empty() && out.len() + piece.len() > SNAPSHOT_CHUNK_SIZE {
                    break;
                }
                out.push_str(piece);
                pos += piece.len();
            }
        }
        self.byte_pos = pos;

        (!out.is_empty()).then_some(out)
    }
}
