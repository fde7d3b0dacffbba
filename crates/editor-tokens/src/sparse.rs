//! Flat, line-sorted token storage.
//!
//! A [`SparseTokenBuffer`] holds `(line, start, end, metadata)` quadruples relative to a base
//! line owned by someone else (usually a [`TokenRangeOverlay`](crate::TokenRangeOverlay)).
//! Tokens are kept in one contiguous vector sorted by line and then start character, so a
//! line lookup is a binary search and edits are a single compaction pass.

use crate::edit::TokenPosition;
use crate::error::TokenStoreError;
use crate::metadata::TokenMetadata;

/// Number of `u32`s per token in the flat raw encoding.
pub const RAW_TOKEN_STRIDE: usize = 4;

/// A single token inside a [`SparseTokenBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SparseToken {
    /// Line relative to the buffer's base line.
    pub delta_line: u32,
    /// Start character (inclusive).
    pub start_char: u32,
    /// End character (exclusive).
    pub end_char: u32,
    /// Style metadata.
    pub metadata: TokenMetadata,
}

impl SparseToken {
    /// Create a token.
    pub const fn new(
        delta_line: u32,
        start_char: u32,
        end_char: u32,
        metadata: TokenMetadata,
    ) -> Self {
        Self {
            delta_line,
            start_char,
            end_char,
            metadata,
        }
    }

    fn start(&self) -> (u32, u32) {
        (self.delta_line, self.start_char)
    }

    fn end(&self) -> (u32, u32) {
        (self.delta_line, self.end_char)
    }
}

/// An edit expressed in a buffer's relative coordinates.
///
/// `start..end` is the replaced span. The text that followed `end` continues at the *seam*:
/// `inserted_lines` lines below `start`, at column `inserted_last_line_len` (offset by
/// `start_char` when nothing but same-line text was inserted).
///
/// `glues_start` / `glues_end` say whether inserted characters sit directly against the
/// edit's start / end on the same line. A token touching a glued side is dropped, since the
/// inserted text may have extended it and only a later push can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEdit {
    /// Relative line of the edit start.
    pub start_line: u32,
    /// Character of the edit start.
    pub start_char: u32,
    /// Relative line of the edit end.
    pub end_line: u32,
    /// Character of the edit end.
    pub end_char: u32,
    /// Line breaks inserted.
    pub inserted_lines: u32,
    /// Characters inserted on the last inserted line.
    pub inserted_last_line_len: u32,
    /// Inserted characters touch the edit start.
    pub glues_start: bool,
    /// Inserted characters touch the edit end.
    pub glues_end: bool,
}

impl LineEdit {
    /// Relative position where the text after the edit resumes.
    pub fn seam(&self) -> TokenPosition {
        TokenPosition::new(self.start_line, self.start_char)
            .advanced_by(self.inserted_lines, self.inserted_last_line_len)
    }
}

/// Line-sorted token quadruples relative to a base line.
///
/// Invariants (checked on construction, preserved by every mutation):
/// - every token has `start_char < end_char`
/// - tokens are sorted by `(delta_line, start_char)`
/// - tokens on the same line do not overlap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseTokenBuffer {
    tokens: Vec<SparseToken>,
}

impl SparseTokenBuffer {
    /// Create an empty buffer.
    pub fn new_empty() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Build a buffer from tokens, validating the buffer invariants.
    pub fn new(tokens: Vec<SparseToken>) -> Result<Self, TokenStoreError> {
        validate_tokens(&tokens)?;
        Ok(Self { tokens })
    }

    /// Build a buffer from the flat encoding `[deltaLine, startChar, endChar, metadata]*`.
    pub fn from_raw(data: &[u32]) -> Result<Self, TokenStoreError> {
        if !data.len().is_multiple_of(RAW_TOKEN_STRIDE) {
            return Err(TokenStoreError::InvalidRawLength {
                stride: RAW_TOKEN_STRIDE,
                len: data.len(),
            });
        }

        let tokens = data
            .chunks_exact(RAW_TOKEN_STRIDE)
            .map(|chunk| {
                SparseToken::new(chunk[0], chunk[1], chunk[2], TokenMetadata::from_raw(chunk[3]))
            })
            .collect();
        Self::new(tokens)
    }

    /// Flatten back into the raw quadruple encoding.
    pub fn to_raw(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.tokens.len() * RAW_TOKEN_STRIDE);
        for token in &self.tokens {
            out.extend_from_slice(&[
                token.delta_line,
                token.start_char,
                token.end_char,
                token.metadata.raw(),
            ]);
        }
        out
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the buffer holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens, sorted.
    pub fn as_slice(&self) -> &[SparseToken] {
        &self.tokens
    }

    /// Iterate over all tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, SparseToken> {
        self.tokens.iter()
    }

    /// Relative line of the last token.
    pub fn max_delta_line(&self) -> Option<u32> {
        self.tokens.last().map(|token| token.delta_line)
    }

    /// Tokens on relative line `line` (empty if there are none).
    pub fn for_line(&self, line: u32) -> &[SparseToken] {
        let start = self.tokens.partition_point(|token| token.delta_line < line);
        let len = self.tokens[start..].partition_point(|token| token.delta_line == line);
        &self.tokens[start..start + len]
    }

    /// Copy of the tokens on relative lines `first..=last`, rebased so `first` becomes line 0.
    pub fn slice_lines(&self, first: u32, last: u32) -> SparseTokenBuffer {
        if first > last {
            return Self::new_empty();
        }
        let start = self.tokens.partition_point(|token| token.delta_line < first);
        let end = self.tokens.partition_point(|token| token.delta_line <= last);
        let tokens = self.tokens[start..end]
            .iter()
            .map(|token| SparseToken {
                delta_line: token.delta_line - first,
                ..*token
            })
            .collect();
        Self { tokens }
    }

    /// Append `other`'s tokens, shifted down by `line_offset` lines.
    ///
    /// The caller guarantees that the shifted tokens sort after (and do not overlap) the tokens
    /// already in `self`.
    pub fn append_shifted(&mut self, other: SparseTokenBuffer, line_offset: u32) {
        self.tokens.reserve(other.tokens.len());
        for token in other.tokens {
            self.tokens.push(SparseToken {
                delta_line: token.delta_line + line_offset,
                ..token
            });
        }
        debug_assert!(validate_tokens(&self.tokens).is_ok());
    }

    /// Drop all tokens.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Adjust tokens for a text edit. Returns the number of tokens dropped.
    ///
    /// - tokens ending before the edit start are unchanged
    /// - tokens starting after the edit end move to the seam (same-line tokens) or down by the
    ///   net line delta (tokens on later lines)
    /// - tokens intersecting the replaced span are dropped, as are tokens touching a side the
    ///   inserted text is glued to
    pub fn apply_edit(&mut self, edit: &LineEdit) -> usize {
        let start = (edit.start_line, edit.start_char);
        let end = (edit.end_line, edit.end_char);
        let seam = edit.seam();
        let removed_lines = edit.end_line - edit.start_line;
        let before = self.tokens.len();

        self.tokens.retain_mut(|token| {
            if token.end() < start || (token.end() == start && !edit.glues_start) {
                return true;
            }

            if token.start() > end || (token.start() == end && !edit.glues_end) {
                if token.delta_line == edit.end_line {
                    token.delta_line = seam.line;
                    token.start_char = token.start_char - edit.end_char + seam.character;
                    token.end_char = token.end_char - edit.end_char + seam.character;
                } else {
                    token.delta_line = token.delta_line - removed_lines + edit.inserted_lines;
                }
                return true;
            }

            false
        });

        debug_assert!(validate_tokens(&self.tokens).is_ok());
        before - self.tokens.len()
    }
}

impl<'a> IntoIterator for &'a SparseTokenBuffer {
    type Item = &'a SparseToken;
    type IntoIter = std::slice::Iter<'a, SparseToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

fn validate_tokens(tokens: &[SparseToken]) -> Result<(), TokenStoreError> {
    let mut prev: Option<&SparseToken> = None;
    for (index, token) in tokens.iter().enumerate() {
        if token.start_char >= token.end_char {
            return Err(TokenStoreError::EmptyToken {
                index,
                line: token.delta_line,
                start: token.start_char,
                end: token.end_char,
            });
        }
        if let Some(prev) = prev {
            if token.start() < prev.start() {
                return Err(TokenStoreError::UnsortedTokens { index });
            }
            if token.delta_line == prev.delta_line && token.start_char < prev.end_char {
                return Err(TokenStoreError::OverlappingTokens {
                    index,
                    line: token.delta_line,
                });
            }
        }
        prev = Some(token);
    }
    Ok(())
}
