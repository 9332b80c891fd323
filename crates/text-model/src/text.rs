//! Text measurement helpers.
//!
//! All lengths and indices returned here are in UTF-16 code units, matching the column and offset
//! space used everywhere else in the crate.

use crate::line_ending::LineEnding;
use std::borrow::Cow;

/// Byte-order mark as a `char`.
pub const UTF8_BOM: char = '\u{FEFF}';

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Line-break statistics of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EolCount {
    /// Number of line breaks (`\r\n`, `\r` and `\n` each count once).
    pub eol_count: usize,
    /// UTF-16 length of the text before the first break.
    pub first_line_length: usize,
    /// UTF-16 length of the text after the last break.
    pub last_line_length: usize,
}

/// Count line breaks in `text`.
pub fn count_eol(text: &str) -> EolCount {
    let mut count = EolCount::default();
    let mut current = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if count.eol_count == 0 {
                    count.first_line_length = current;
                }
                count.eol_count += 1;
                current = 0;
            }
            _ => current += ch.len_utf16(),
        }
    }

    if count.eol_count == 0 {
        count.first_line_length = current;
    }
    count.last_line_length = current;
    count
}

/// Rewrite every line break in `text` to `eol`. Borrows when nothing needs to change.
pub fn normalize_eol(text: &str, eol: LineEnding) -> Cow<'_, str> {
    let needs_rewrite = match eol {
        LineEnding::Lf => text.contains('\r'),
        LineEnding::Crlf => {
            let bytes = text.as_bytes();
            bytes.iter().enumerate().any(|(i, &b)| match b {
                b'\r' => bytes.get(i + 1) != Some(&b'\n'),
                b'\n' => i == 0 || bytes[i - 1] != b'\r',
                _ => false,
            })
        }
    };
    if !needs_rewrite {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(eol.as_str());
            }
            '\n' => out.push_str(eol.as_str()),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// UTF-16 index of the first character that is neither a space nor a tab.
pub fn first_non_whitespace_index(line: &str) -> Option<usize> {
    let mut index = 0;
    for ch in line.chars() {
        if !is_blank(ch) {
            return Some(index);
        }
        index += ch.len_utf16();
    }
    None
}

/// UTF-16 index of the last code unit that is neither a space nor a tab.
pub fn last_non_whitespace_index(line: &str) -> Option<usize> {
    let mut end = utf16_len(line);
    for ch in line.chars().rev() {
        if !is_blank(ch) {
            return Some(end - 1);
        }
        end -= ch.len_utf16();
    }
    None
}
