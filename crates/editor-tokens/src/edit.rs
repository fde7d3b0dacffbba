//! Line/character coordinates, push ranges and text edit notifications.
//!
//! All coordinates are 0-based. Characters are counted in Unicode scalar values (`char`).

use crate::error::TokenStoreError;

/// A position inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenPosition {
    /// Line number.
    pub line: u32,
    /// Character offset inside the line.
    pub character: u32,
}

impl TokenPosition {
    /// Create a new position.
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Where text resumes after `inserted_lines` line breaks and `last_line_len` characters are
    /// typed at this position.
    pub(crate) fn advanced_by(self, inserted_lines: u32, last_line_len: u32) -> Self {
        if inserted_lines == 0 {
            Self::new(self.line, self.character + last_line_len)
        } else {
            Self::new(self.line + inserted_lines, last_line_len)
        }
    }
}

/// An inclusive span of whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSpan {
    /// First line of the span.
    pub start: u32,
    /// Last line of the span (inclusive).
    pub end: u32,
}

impl LineSpan {
    /// Create a span. `start` and `end` are swapped if given in the wrong order.
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Check if the span contains `line`.
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Check if two spans share at least one line.
    pub fn intersects(&self, other: &LineSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest span covering both spans.
    pub fn union(&self, other: &LineSpan) -> LineSpan {
        LineSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Number of lines in the span.
    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// A half-open character range (`start..end`) in line/character coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenRange {
    /// Range start (inclusive).
    pub start: TokenPosition,
    /// Range end (exclusive).
    pub end: TokenPosition,
}

impl TokenRange {
    /// Create a range from its four coordinates.
    pub const fn new(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start: TokenPosition::new(start_line, start_char),
            end: TokenPosition::new(end_line, end_char),
        }
    }

    /// Returns `true` if the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Reject ranges whose end precedes their start.
    pub fn validate(&self) -> Result<(), TokenStoreError> {
        if self.end < self.start {
            return Err(TokenStoreError::InvertedRange {
                start_line: self.start.line,
                start_char: self.start.character,
                end_line: self.end.line,
                end_char: self.end.character,
            });
        }
        Ok(())
    }

    /// Lines this range claims.
    ///
    /// A multi-line range ending at character 0 covers nothing on its last line, so that line
    /// is not claimed.
    pub fn line_span(&self) -> LineSpan {
        let end = if self.end.character == 0 && self.end.line > self.start.line {
            self.end.line - 1
        } else {
            self.end.line
        };
        LineSpan::new(self.start.line, end)
    }
}

/// A text buffer edit notification: `range` (pre-edit coordinates) was replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Replaced range.
    pub range: TokenRange,
    /// Inserted text (may be empty).
    pub text: String,
}

impl TextEdit {
    /// Create a replacement edit.
    pub fn new(range: TokenRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// Create a pure insertion at `position`.
    pub fn insert(position: TokenPosition, text: impl Into<String>) -> Self {
        Self::new(
            TokenRange {
                start: position,
                end: position,
            },
            text,
        )
    }

    /// Create a pure deletion of `range`.
    pub fn delete(range: TokenRange) -> Self {
        Self::new(range, String::new())
    }
}

/// The shape of a [`TextEdit`] reduced to what the token store needs: coordinates and the
/// line/character extent of the inserted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDelta {
    /// Start of the replaced range.
    pub start: TokenPosition,
    /// End of the replaced range.
    pub end: TokenPosition,
    /// Number of line breaks in the inserted text.
    pub inserted_lines: u32,
    /// Characters of inserted text before its first line break.
    pub first_line_len: u32,
    /// Characters of inserted text after its last line break (the whole text if it has none).
    pub last_line_len: u32,
}

impl EditDelta {
    /// Measure an edit. Fails if the replaced range is inverted.
    pub fn from_edit(edit: &TextEdit) -> Result<Self, TokenStoreError> {
        let range = edit.range;
        if range.end < range.start {
            return Err(TokenStoreError::InvertedEdit {
                start_line: range.start.line,
                start_char: range.start.character,
                end_line: range.end.line,
                end_char: range.end.character,
            });
        }

        let mut inserted_lines = 0u32;
        let mut first_line_len = 0u32;
        let mut current_len = 0u32;
        let mut chars = edit.text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    if inserted_lines == 0 {
                        first_line_len = current_len;
                    }
                    inserted_lines += 1;
                    current_len = 0;
                }
                _ => current_len += 1,
            }
        }
        if inserted_lines == 0 {
            first_line_len = current_len;
        }

        Ok(Self {
            start: range.start,
            end: range.end,
            inserted_lines,
            first_line_len,
            last_line_len: current_len,
        })
    }

    /// Returns `true` if the edit neither removes nor inserts anything.
    pub fn is_noop(&self) -> bool {
        self.start == self.end && self.inserted_lines == 0 && self.first_line_len == 0
    }

    /// Net change in line count.
    pub fn line_delta(&self) -> i64 {
        i64::from(self.inserted_lines) - i64::from(self.end.line - self.start.line)
    }

    /// Where the text that followed the replaced range starts after the edit.
    pub fn seam(&self) -> TokenPosition {
        self.start.advanced_by(self.inserted_lines, self.last_line_len)
    }

    /// Map a line that lies strictly after the replaced range to its post-edit number.
    pub fn shift_line(&self, line: u32) -> u32 {
        debug_assert!(line > self.end.line || self.start.line == self.end.line);
        (i64::from(line) + self.line_delta()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span_of_range() {
        assert_eq!(TokenRange::new(0, 0, 30, 1).line_span(), LineSpan::new(0, 30));
        // Ending at character 0 does not claim the last line.
        assert_eq!(TokenRange::new(17, 0, 41, 0).line_span(), LineSpan::new(17, 40));
        assert_eq!(TokenRange::new(3, 0, 3, 0).line_span(), LineSpan::new(3, 3));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(TokenRange::new(4, 0, 2, 0).validate().is_err());
        assert!(TokenRange::new(4, 5, 4, 2).validate().is_err());
        assert!(TokenRange::new(4, 2, 4, 2).validate().is_ok());
    }

    #[test]
    fn test_edit_delta_measurement() {
        let delta =
            EditDelta::from_edit(&TextEdit::new(TokenRange::new(1, 4, 3, 2), "ab\ncde\nf"))
                .unwrap();
        assert_eq!(delta.inserted_lines, 2);
        assert_eq!(delta.first_line_len, 2);
        assert_eq!(delta.last_line_len, 1);
        assert_eq!(delta.line_delta(), 0);
        assert_eq!(delta.seam(), TokenPosition::new(3, 1));

        let delta = EditDelta::from_edit(&TextEdit::insert(TokenPosition::new(0, 5), "xyz"))
            .unwrap();
        assert_eq!(delta.first_line_len, 3);
        assert_eq!(delta.last_line_len, 3);
        assert_eq!(delta.seam(), TokenPosition::new(0, 8));
    }

    #[test]
    fn test_crlf_counts_as_one_line_break() {
        let delta =
            EditDelta::from_edit(&TextEdit::insert(TokenPosition::new(2, 0), "a\r\nb")).unwrap();
        assert_eq!(delta.inserted_lines, 1);
        assert_eq!(delta.first_line_len, 1);
        assert_eq!(delta.last_line_len, 1);

        let delta =
            EditDelta::from_edit(&TextEdit::insert(TokenPosition::new(0, 3), "\r\n")).unwrap();
        assert_eq!(delta.first_line_len, 0);
        assert_eq!(delta.seam(), TokenPosition::new(1, 0));

        // A lone carriage return is an ordinary character.
        let delta =
            EditDelta::from_edit(&TextEdit::insert(TokenPosition::new(0, 3), "\r")).unwrap();
        assert_eq!(delta.inserted_lines, 0);
        assert_eq!(delta.first_line_len, 1);
    }

    #[test]
    fn test_inverted_edit_is_rejected() {
        let err = EditDelta::from_edit(&TextEdit::delete(TokenRange::new(5, 0, 4, 0)));
        assert!(matches!(err, Err(TokenStoreError::InvertedEdit { .. })));
    }

    #[test]
    fn test_noop_edit() {
        let delta = EditDelta::from_edit(&TextEdit::insert(TokenPosition::new(2, 3), "")).unwrap();
        assert!(delta.is_noop());
    }
}
