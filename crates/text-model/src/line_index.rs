//! Logical line index.
//!
//! Wraps a [`Rope`] and exposes it in the UTF-16 offset space used by positions. The rope keeps
//! per-node line and UTF-16 counts, so line lookup and offset conversion are O(log N) in both
//! directions. Line numbers here are 0-based; [`crate::TextBuffer`] adds the 1-based layer.

use ropey::{Rope, RopeSlice};

/// Rope-backed line index addressed by UTF-16 offsets.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Create an empty index (one empty line).
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build the index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of lines. A trailing line break opens one more (empty) line.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total length in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    /// UTF-16 offset of the first code unit of `line`.
    pub fn line_start_utf16(&self, line: usize) -> usize {
        let line = line.min(self.line_count());
        self.rope.char_to_utf16_cu(self.rope.line_to_char(line))
    }

    /// Length of `line` in UTF-16 code units, excluding its line break.
    pub fn line_len_utf16(&self, line: usize) -> usize {
        match self.line_slice(line) {
            Some(slice) => slice.len_utf16_cu() - line_break_len(&slice),
            None => 0,
        }
    }

    /// Text of `line` without its line break.
    pub fn line_text(&self, line: usize) -> Option<String> {
        let slice = self.line_slice(line)?;
        let content_chars = slice.len_chars() - line_break_len(&slice);
        Some(slice.slice(..content_chars).to_string())
    }

    /// 0-based line containing the UTF-16 `offset` (clamped to the document).
    pub fn line_of_utf16(&self, offset: usize) -> usize {
        let offset = offset.min(self.len_utf16());
        let char_idx = self.rope.utf16_cu_to_char(offset);
        self.rope.char_to_line(char_idx)
    }

    /// `true` if `offset` falls between the high and low surrogate of one character.
    pub fn is_inside_surrogate_pair(&self, offset: usize) -> bool {
        if offset == 0 || offset >= self.len_utf16() {
            return false;
        }
        let char_idx = self.rope.utf16_cu_to_char(offset);
        self.rope.char_to_utf16_cu(char_idx) != offset
    }

    /// Text between two UTF-16 offsets.
    pub fn slice_utf16(&self, start: usize, end: usize) -> String {
        let (start, end) = self.char_range(start, end);
        self.rope.slice(start..end).to_string()
    }

    /// Insert `text` at a UTF-16 offset.
    pub fn insert_utf16(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let (char_idx, _) = self.char_range(offset, offset);
        self.rope.insert(char_idx, text);
    }

    /// Remove the text between two UTF-16 offsets.
    pub fn remove_utf16(&mut self, start: usize, end: usize) {
        let (start, end) = self.char_range(start, end);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Complete text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    fn line_slice(&self, line: usize) -> Option<RopeSlice<'_>> {
        (line < self.line_count()).then(|| self.rope.line(line))
    }

    fn char_range(&self, start: usize, end: usize) -> (usize, usize) {
        let len = self.len_utf16();
        let start = start.min(len);
        let end = end.clamp(start, len);
        (
            self.rope.utf16_cu_to_char(start),
            self.rope.utf16_cu_to_char(end),
        )
    }
}

/// Number of chars the line break at the end of `line` occupies.
fn line_break_len(line: &RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    if len == 0 {
        return 0;
    }
    match line.char(len - 1) {
        '\n' if len >= 2 && line.char(len - 2) == '\r' => 2,
        '\n' | '\r' => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_index() {
        let index = LineIndex::new();
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.len_utf16(), 0);
        assert_eq!(index.line_text(0).as_deref(), Some(""));
    }

    #[test]
    fn test_from_text() {
        let text = "Line 1\nLine 2\nLine 3";
        let index = LineIndex::from_text(text);

        assert_eq!(index.line_count(), 3);
        assert_eq!(index.len_utf16(), text.len());
    }

    #[test]
    fn test_trailing_break_opens_empty_line() {
        let index = LineIndex::from_text("a\r\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_text(1).as_deref(), Some(""));
        assert_eq!(index.line_len_utf16(0), 1);
    }

    #[test]
    fn test_only_ascii_breaks_split_lines() {
        // U+2028 is a Unicode line separator but not a break for the index.
        let index = LineIndex::from_text("a\u{2028}b\rc\r\nd");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_text(0).as_deref(), Some("a\u{2028}b"));
        assert_eq!(index.line_text(1).as_deref(), Some("c"));
    }

    #[test]
    fn test_line_start_utf16() {
        let index = LineIndex::from_text("First line\r\nSecond line\nThird");
        assert_eq!(index.line_start_utf16(0), 0);
        assert_eq!(index.line_start_utf16(1), 12);
        assert_eq!(index.line_start_utf16(2), 24);
        assert_eq!(index.line_of_utf16(11), 0);
        assert_eq!(index.line_of_utf16(12), 1);
        assert_eq!(index.line_of_utf16(1000), 2);
    }

    #[test]
    fn test_surrogate_pairs() {
        let index = LineIndex::from_text("a😀b\n你好");
        assert_eq!(index.line_len_utf16(0), 4);
        assert_eq!(index.line_len_utf16(1), 2);
        assert!(!index.is_inside_surrogate_pair(1));
        assert!(index.is_inside_surrogate_pair(2));
        assert!(!index.is_inside_surrogate_pair(3));
        assert_eq!(index.slice_utf16(1, 3), "😀");
    }

    #[test]
    fn test_large_document() {
        let text = (0..10000)
            .map(|i| format!("Line {}", i))
            .collect::<Vec<_>>()
            .join("\n");

        let index = LineIndex::from_text(&text);
        assert_eq!(index.line_count(), 10000);
        assert_eq!(index.line_text(5000).as_deref(), Some("Line 5000"));
        assert_eq!(index.line_text(10000), None);
    }

    #[test]
    fn test_insert_and_remove_text() {
        let mut index = LineIndex::from_text("Hello World");

        index.insert_utf16(6, "Beautiful ");
        assert_eq!(index.text(), "Hello Beautiful World");

        index.remove_utf16(6, 16);
        assert_eq!(index.text(), "Hello World");

        index.insert_utf16(5, "\n");
        assert_eq!(index.line_count(), 2);
    }
}
