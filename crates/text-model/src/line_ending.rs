//! Line ending helpers.
//!
//! A buffer stores every line break with one sequence, chosen when the buffer is built.
//! Readers may ask for a different sequence through [`EndOfLinePreference`].

use std::fmt;

/// The newline sequence a buffer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// The newline sequence as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }

    /// Length of the sequence in UTF-16 code units (equal to its byte length).
    pub fn len(self) -> usize {
        self.as_str().len()
    }

    /// Pick the dominant line ending from break counts.
    ///
    /// Policy: no breaks at all keeps `default`; otherwise CRLF wins when lone CR plus CRLF
    /// breaks make up more than half of all breaks.
    pub fn choose(cr: usize, lf: usize, crlf: usize, default: LineEnding) -> Self {
        let total = cr + lf + crlf;
        if total == 0 {
            default
        } else if 2 * (cr + crlf) > total {
            Self::Crlf
        } else {
            Self::Lf
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => f.write_str("LF"),
            Self::Crlf => f.write_str("CRLF"),
        }
    }
}

/// Which newline sequence text reads should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfLinePreference {
    /// Whatever the buffer stores.
    #[default]
    TextDefined,
    /// Always `'\n'`.
    Lf,
    /// Always `"\r\n"`.
    Crlf,
}

impl EndOfLinePreference {
    /// Resolve the preference against the buffer's own line ending.
    pub fn resolve(self, buffer_eol: LineEnding) -> LineEnding {
        match self {
            Self::TextDefined => buffer_eol,
            Self::Lf => LineEnding::Lf,
            Self::Crlf => LineEnding::Crlf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_keeps_default_without_breaks() {
        assert_eq!(LineEnding::choose(0, 0, 0, LineEnding::Crlf), LineEnding::Crlf);
        assert_eq!(LineEnding::choose(0, 0, 0, LineEnding::Lf), LineEnding::Lf);
    }

    #[test]
    fn test_choose_majority() {
        assert_eq!(LineEnding::choose(0, 3, 1, LineEnding::Lf), LineEnding::Lf);
        assert_eq!(LineEnding::choose(0, 1, 3, LineEnding::Lf), LineEnding::Crlf);
        assert_eq!(LineEnding::choose(2, 1, 0, LineEnding::Lf), LineEnding::Crlf);
        // A tie is not a majority.
        assert_eq!(LineEnding::choose(0, 1, 1, LineEnding::Crlf), LineEnding::Lf);
    }

    #[test]
    fn test_preference_resolution() {
        assert_eq!(
            EndOfLinePreference::TextDefined.resolve(LineEnding::Crlf),
            LineEnding::Crlf
        );
        assert_eq!(EndOfLinePreference::Lf.resolve(LineEnding::Crlf), LineEnding::Lf);
        assert_eq!(LineEnding::Crlf.len(), 2);
    }
}
