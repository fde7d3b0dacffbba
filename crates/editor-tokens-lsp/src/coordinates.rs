//! LSP positions and ranges, and their conversion to character coordinates.
//!
//! The language server counts columns in UTF-16 code units; `editor-tokens` counts `char`s.
//! Conversion needs the text of the line, which is why most helpers take a [`LineText`].

use editor_tokens::{LineText, TokenPosition, TokenRange};
use serde_json::Value;

/// LSP Position (based on UTF-16 code units)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LspPosition {
    /// Line number (0-based)
    pub line: u32,
    /// Character offset (UTF-16 code units, 0-based)
    pub character: u32,
}

impl LspPosition {
    /// Create a new LSP position (UTF-16 based).
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// LSP Range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LspRange {
    /// Range start position (inclusive).
    pub start: LspPosition,
    /// Range end position (exclusive).
    pub end: LspPosition,
}

impl LspRange {
    /// Create a new LSP range.
    pub fn new(start: LspPosition, end: LspPosition) -> Self {
        Self { start, end }
    }
}

/// LSP coordinate converter
///
/// Handles conversions between character offsets and UTF-16 code unit offsets.
pub struct LspCoordinateConverter;

impl LspCoordinateConverter {
    /// Number of UTF-16 code units in `text`.
    pub fn utf16_len(text: &str) -> usize {
        text.encode_utf16().count()
    }

    /// Convert character offset to UTF-16 code unit offset
    pub fn char_offset_to_utf16(text: &str, char_offset: usize) -> usize {
        text.chars().take(char_offset).map(char::len_utf16).sum()
    }

    /// Convert UTF-16 code unit offset to character offset
    ///
    /// An offset pointing inside a surrogate pair rounds up to the next character. Offsets past
    /// the end clamp to the line length.
    pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
        let mut current_utf16 = 0;
        let mut char_count = 0;

        for ch in text.chars() {
            if current_utf16 >= utf16_offset {
                break;
            }
            current_utf16 += ch.len_utf16();
            char_count += 1;
        }

        char_count
    }

    /// Convert a character position to an LSP position.
    pub fn position_to_lsp(line_text: &LineText, position: TokenPosition) -> LspPosition {
        let text = line_text.line_text(position.line).unwrap_or_default();
        let utf16 = Self::char_offset_to_utf16(&text, position.character as usize);
        LspPosition::new(position.line, to_u32(utf16))
    }

    /// Convert an LSP position to a character position.
    ///
    /// Positions on lines past the end of the document keep their line and get column 0.
    pub fn lsp_to_position(line_text: &LineText, position: LspPosition) -> TokenPosition {
        let text = line_text.line_text(position.line).unwrap_or_default();
        let character = Self::utf16_to_char_offset(&text, position.character as usize);
        TokenPosition::new(position.line, to_u32(character))
    }
}

pub(crate) fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Convert an LSP range to a character range.
pub fn lsp_range_to_token_range(line_text: &LineText, range: &LspRange) -> TokenRange {
    TokenRange {
        start: LspCoordinateConverter::lsp_to_position(line_text, range.start),
        end: LspCoordinateConverter::lsp_to_position(line_text, range.end),
    }
}

/// Parse an LSP `Position` object.
pub fn parse_lsp_position(value: &Value) -> Option<LspPosition> {
    Some(LspPosition {
        line: u32::try_from(value.get("line")?.as_u64()?).ok()?,
        character: u32::try_from(value.get("character")?.as_u64()?).ok()?,
    })
}

/// Parse an LSP `Range` object.
pub fn parse_lsp_range(value: &Value) -> Option<LspRange> {
    let start = parse_lsp_position(value.get("start")?)?;
    let end = parse_lsp_position(value.get("end")?)?;
    Some(LspRange::new(start, end))
}
