use editor_tokens::{MetadataError, TokenStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while turning language-server payloads into semantic token overlays.
pub enum LspSemanticTokensError {
    #[error("semantic tokens data length must be a multiple of 5 (got {0})")]
    /// `data` is not a whole number of `(deltaLine, deltaStart, length, tokenType,
    /// tokenModifiers)` groups.
    InvalidDataLength(usize),

    #[error("semantic token line out of range: {0}")]
    /// A token points at a line the document does not have.
    InvalidLine(u32),

    #[error("semantic token UTF-16 range overflow")]
    /// `start + length` does not fit in a `u32`.
    Utf16Overflow,

    #[error("semantic tokens data value at index {0} is not a u32")]
    /// A `data` entry is negative, fractional or too large.
    InvalidDataValue(usize),

    #[error("missing required field: {0}")]
    /// A payload lacks a field the conversion needs.
    MissingField(&'static str),

    #[error("styling config parse error: {0}")]
    /// The styling config is not valid JSON for [`SemanticStylingConfig`](crate::SemanticStylingConfig).
    Config(#[from] serde_json::Error),

    #[error("styling rule '{selector}' cannot be encoded: {source}")]
    /// A styling rule holds a value that does not fit the token metadata.
    InvalidRule {
        /// Selector of the offending rule.
        selector: String,
        /// Why encoding failed.
        source: MetadataError,
    },

    #[error(transparent)]
    /// Decoded tokens were rejected by the token store.
    Store(#[from] TokenStoreError),
}
