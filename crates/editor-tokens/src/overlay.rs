//! Range-bounded semantic token overlays.

use crate::edit::{EditDelta, LineSpan};
use crate::error::TokenStoreError;
use crate::sparse::{LineEdit, SparseToken, SparseTokenBuffer};

/// What [`TokenRangeOverlay::shift_for_edit`] did to an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayShift {
    /// The edit lies after the overlay.
    Untouched,
    /// The edit lies before the overlay; only the base line moved.
    Translated,
    /// The edit touched the overlay's lines; tokens were adjusted (`dropped` of them removed).
    Adjusted {
        /// Number of tokens removed by the edit.
        dropped: usize,
    },
    /// The overlay lost all of its lines or tokens and must be discarded.
    Removed,
}

/// The parts of an overlay left after clipping out a line span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClippedOverlay {
    /// Residual above the clipped span.
    pub before: Option<TokenRangeOverlay>,
    /// Residual below the clipped span.
    pub after: Option<TokenRangeOverlay>,
}

impl ClippedOverlay {
    /// Iterate over the surviving residuals in line order.
    pub fn into_residuals(self) -> impl Iterator<Item = TokenRangeOverlay> {
        self.before.into_iter().chain(self.after)
    }
}

/// Authoritative semantic tokens for the lines `base_line..=base_line + span_lines`.
///
/// Token lines are stored relative to `base_line`, so moving the whole overlay is O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRangeOverlay {
    base_line: u32,
    span_lines: u32,
    tokens: SparseTokenBuffer,
}

impl TokenRangeOverlay {
    /// Create an overlay whose span ends at its last token's line.
    pub fn new(base_line: u32, tokens: SparseTokenBuffer) -> Result<Self, TokenStoreError> {
        let span_lines = tokens.max_delta_line().unwrap_or(0);
        Self::with_span(base_line, span_lines, tokens)
    }

    /// Create an overlay claiming an explicit span; every token must lie inside it.
    pub fn with_span(
        base_line: u32,
        span_lines: u32,
        tokens: SparseTokenBuffer,
    ) -> Result<Self, TokenStoreError> {
        if let Some(line) = tokens.max_delta_line()
            && line > span_lines
        {
            return Err(TokenStoreError::TokenOutsideSpan { line, span_lines });
        }
        if base_line.checked_add(span_lines).is_none() {
            return Err(TokenStoreError::LineOverflow {
                base_line,
                span_lines,
            });
        }
        Ok(Self {
            base_line,
            span_lines,
            tokens,
        })
    }

    /// Create an overlay from the flat `[deltaLine, startChar, endChar, metadata]*` encoding.
    pub fn from_raw(base_line: u32, data: &[u32]) -> Result<Self, TokenStoreError> {
        Self::new(base_line, SparseTokenBuffer::from_raw(data)?)
    }

    /// First line claimed by the overlay.
    pub fn base_line(&self) -> u32 {
        self.base_line
    }

    /// Number of lines claimed after the base line.
    pub fn span_lines(&self) -> u32 {
        self.span_lines
    }

    /// Last line claimed by the overlay (inclusive).
    pub fn end_line(&self) -> u32 {
        self.base_line + self.span_lines
    }

    /// The claimed lines.
    pub fn line_span(&self) -> LineSpan {
        LineSpan::new(self.base_line, self.end_line())
    }

    /// The overlay's tokens (relative to [`Self::base_line`]).
    pub fn tokens(&self) -> &SparseTokenBuffer {
        &self.tokens
    }

    /// Check if the overlay holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check if `line` is inside the claimed span.
    pub fn covers_line(&self, line: u32) -> bool {
        self.base_line <= line && line <= self.end_line()
    }

    /// Check if the claimed span shares a line with `span`.
    pub fn intersects(&self, span: &LineSpan) -> bool {
        self.line_span().intersects(span)
    }

    /// Tokens on absolute line `line`.
    pub fn tokens_for_line(&self, line: u32) -> &[SparseToken] {
        if !self.covers_line(line) {
            return &[];
        }
        self.tokens.for_line(line - self.base_line)
    }

    /// Split off the parts of this overlay that lie outside `span`.
    ///
    /// Residuals keep their token data and the clipped part of the original span. Residuals
    /// without any tokens are dropped.
    pub fn clip_to_exclude(&self, span: &LineSpan) -> ClippedOverlay {
        if !self.intersects(span) {
            return ClippedOverlay {
                before: Some(self.clone()),
                after: None,
            };
        }

        let end_line = self.end_line();
        let mut clipped = ClippedOverlay::default();

        if self.base_line < span.start {
            let last = span.start - 1 - self.base_line;
            let tokens = self.tokens.slice_lines(0, last);
            if !tokens.is_empty() {
                clipped.before = Some(Self {
                    base_line: self.base_line,
                    span_lines: last,
                    tokens,
                });
            }
        }

        if end_line > span.end {
            let first = span.end + 1 - self.base_line;
            let tokens = self.tokens.slice_lines(first, self.span_lines);
            if !tokens.is_empty() {
                clipped.after = Some(Self {
                    base_line: span.end + 1,
                    span_lines: end_line - (span.end + 1),
                    tokens,
                });
            }
        }

        clipped
    }

    /// Adjust the overlay for a text edit.
    ///
    /// Edits after the overlay leave it alone, edits before it only move the base line, and
    /// edits that touch its lines are applied to the token buffer with the span recomputed.
    pub fn shift_for_edit(&mut self, delta: &EditDelta) -> OverlayShift {
        let start_line = delta.start.line;
        let end_line = delta.end.line;
        let base = self.base_line;
        let last = self.end_line();

        if start_line > last {
            return OverlayShift::Untouched;
        }

        if end_line < base {
            self.base_line = delta.shift_line(base);
            return OverlayShift::Translated;
        }

        let glues_start = delta.first_line_len > 0;
        let glues_end = delta.last_line_len > 0;

        let (edit, new_base, new_last) = if base <= start_line {
            let edit = LineEdit {
                start_line: start_line - base,
                start_char: delta.start.character,
                end_line: end_line - base,
                end_char: delta.end.character,
                inserted_lines: delta.inserted_lines,
                inserted_last_line_len: delta.last_line_len,
                glues_start,
                glues_end,
            };
            let new_last = if last >= end_line {
                (i64::from(last) + delta.line_delta()) as u32
            } else {
                start_line
            };
            (edit, base, new_last)
        } else {
            // The edit starts above the overlay and ends inside (or below) it.
            if last < end_line {
                return OverlayShift::Removed;
            }
            let seam = delta.seam();
            let edit = LineEdit {
                start_line: 0,
                start_char: 0,
                end_line: end_line - base,
                end_char: delta.end.character,
                inserted_lines: 0,
                inserted_last_line_len: seam.character,
                glues_start: false,
                glues_end,
            };
            let new_last = (i64::from(last) + delta.line_delta()) as u32;
            (edit, seam.line, new_last)
        };

        let dropped = self.tokens.apply_edit(&edit);
        if self.tokens.is_empty() || new_last < new_base {
            return OverlayShift::Removed;
        }

        self.base_line = new_base;
        self.span_lines = new_last - new_base;
        debug_assert!(
            self.tokens
                .max_delta_line()
                .is_none_or(|line| line <= self.span_lines)
        );
        OverlayShift::Adjusted { dropped }
    }

    /// Append an overlay that starts on (or right after) this overlay's last line.
    pub(crate) fn absorb(&mut self, other: TokenRangeOverlay) {
        debug_assert!(other.base_line >= self.base_line);
        debug_assert!(other.base_line <= self.end_line() + 1);
        let offset = other.base_line - self.base_line;
        let new_last = self.end_line().max(other.end_line());
        self.tokens.append_shifted(other.tokens, offset);
        self.span_lines = new_last - self.base_line;
    }
}
