//! Error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by text models, buffers and their decoration APIs.
///
/// Out-of-range coordinates are not errors: they are clamped by the validation routines.
pub enum TextModelError {
    #[error("illegal line number {line} (document has {line_count} lines)")]
    /// A strict line read named a line outside `1..=line_count`.
    IllegalLineNumber {
        /// The requested 1-based line number.
        line: usize,
        /// Number of lines in the document.
        line_count: usize,
    },

    #[error("text model has been disposed")]
    /// The model was used after [`crate::TextModel::dispose`].
    Disposed,

    #[error("decoration transaction is not active")]
    /// A decoration transaction handle was used after its scope closed, or a second transaction
    /// was opened while one was active.
    InvalidTransactionUse,

    #[error("edit operations in one batch must not overlap")]
    /// Two operations in one edit batch overlap.
    OverlappingRanges,
}
