//! Chunked buffer construction.
//!
//! Large documents arrive in pieces (file reads, network frames). [`TextBufferBuilder`] accepts
//! them one at a time, strips a leading BOM, counts line breaks to pick the dominant line ending
//! and never splits a `"\r\n"` that straddles two chunks.

use crate::buffer::TextBuffer;
use crate::line_ending::LineEnding;
use crate::text::{self, UTF8_BOM};

/// Accumulates text chunks for a [`TextBuffer`].
#[derive(Debug, Default)]
pub struct TextBufferBuilder {
    text: String,
    started: bool,
    pending_cr: bool,
    bom: bool,
    cr: usize,
    lf: usize,
    crlf: usize,
}

impl TextBufferBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next chunk of the document.
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let mut chunk = chunk;
        if !self.started {
            self.started = true;
            if let Some(rest) = chunk.strip_prefix(UTF8_BOM) {
                self.bom = true;
                chunk = rest;
            }
        }

        let start = self.text.len();
        if self.pending_cr {
            self.text.push('\r');
            self.pending_cr = false;
        }
        self.text.push_str(chunk);

        // A trailing '\r' may be the first half of a "\r\n" split across chunks.
        if self.text.ends_with('\r') {
            self.text.pop();
            self.pending_cr = true;
        }

        let end = self.text.len();
        self.count_breaks(start, end);
    }

    /// Stop accepting chunks.
    pub fn finish(mut self) -> TextBufferFactory {
        if self.pending_cr {
            self.text.push('\r');
            self.cr += 1;
        }
        tracing::trace!(
            bytes = self.text.len(),
            cr = self.cr,
            lf = self.lf,
            crlf = self.crlf,
            "text buffer builder finished"
        );
        TextBufferFactory {
            text: self.text,
            bom: self.bom,
            cr: self.cr,
            lf: self.lf,
            crlf: self.crlf,
        }
    }

    fn count_breaks(&mut self, start: usize, end: usize) {
        let bytes = &self.text.as_bytes()[start..end];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    self.crlf += 1;
                    i += 1;
                }
                b'\r' => self.cr += 1,
                b'\n' => self.lf += 1,
                _ => {}
            }
            i += 1;
        }
    }
}

/// The collected text of a finished [`TextBufferBuilder`].
#[derive(Debug, Clone)]
pub struct TextBufferFactory {
    text: String,
    bom: bool,
    cr: usize,
    lf: usize,
    crlf: usize,
}

impl TextBufferFactory {
    /// Line ending a buffer created with `default_eol` would use.
    pub fn eol(&self, default_eol: LineEnding) -> LineEnding {
        LineEnding::choose(self.cr, self.lf, self.crlf, default_eol)
    }

    /// Whether the first chunk started with a byte-order mark.
    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Up to `limit` UTF-16 code units of the first line, without its line break.
    pub fn first_line_text(&self, limit: usize) -> String {
        let mut taken = 0;
        self.text
            .chars()
            .take_while(|&ch| ch != '\r' && ch != '\n')
            .take_while(|ch| {
                taken += ch.len_utf16();
                taken <= limit
            })
            .collect()
    }

    /// Create a buffer, rewriting every line break to the chosen line ending.
    pub fn create(&self, default_eol: LineEnding) -> TextBuffer {
        let eol = self.eol(default_eol);
        let mixed = match eol {
            LineEnding::Lf => self.cr > 0 || self.crlf > 0,
            LineEnding::Crlf => self.cr > 0 || self.lf > 0,
        };
        if mixed {
            let normalized = text::normalize_eol(&self.text, eol);
            TextBuffer::from_normalized(&normalized, eol, self.bom)
        } else {
            TextBuffer::from_normalized(&self.text, eol, self.bom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EndOfLinePreference;

    fn build(chunks: &[&str], default_eol: LineEnding) -> TextBuffer {
        let mut builder = TextBufferBuilder::new();
        for chunk in chunks {
            builder.accept_chunk(chunk);
        }
        builder.finish().create(default_eol)
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let buffer = build(&["a\r", "\nb\r", "\nc"], LineEnding::Lf);
        assert_eq!(buffer.eol(), LineEnding::Crlf);
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(
            buffer.value(EndOfLinePreference::TextDefined, false),
            "a\r\nb\r\nc"
        );
    }

    #[test]
    fn test_bom_only_stripped_from_first_chunk() {
        let buffer = build(&["\u{FEFF}ab", "\u{FEFF}cd"], LineEnding::Lf);
        assert!(buffer.has_bom());
        assert_eq!(
            buffer.value(EndOfLinePreference::TextDefined, false),
            "ab\u{FEFF}cd"
        );
    }

    #[test]
    fn test_mixed_breaks_normalized_to_majority() {
        let buffer = build(&["a\nb\nc\r\nd\re"], LineEnding::Crlf);
        // 2 LF against 1 CRLF + 1 CR is a tie, so LF wins.
        assert_eq!(buffer.eol(), LineEnding::Lf);
        assert_eq!(
            buffer.value(EndOfLinePreference::TextDefined, false),
            "a\nb\nc\nd\ne"
        );
    }

    #[test]
    fn test_trailing_cr_counts_at_finish() {
        let mut builder = TextBufferBuilder::new();
        builder.accept_chunk("x\r");
        let factory = builder.finish();
        assert_eq!(factory.eol(LineEnding::Lf), LineEnding::Crlf);
        let buffer = factory.create(LineEnding::Lf);
        assert_eq!(buffer.line_count(), 2);
    }

    #[test]
    fn test_first_line_text() {
        let mut builder = TextBufferBuilder::new();
        builder.accept_chunk("#!/bin/sh\necho");
        let factory = builder.finish();
        assert_eq!(factory.first_line_text(100), "#!/bin/sh");
        assert_eq!(factory.first_line_text(3), "#!/");
    }

    #[test]
    fn test_empty_input_uses_default_eol() {
        let buffer = TextBufferBuilder::new().finish().create(LineEnding::Crlf);
        assert_eq!(buffer.eol(), LineEnding::Crlf);
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.length(), 0);
    }
}
