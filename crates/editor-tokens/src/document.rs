//! A text document paired with its lexical tokenizer and semantic token store.
//!
//! [`TokenizedDocument`] is the host side of the store: it forwards every edit to the store
//! before touching the text, so stored tokens and line contents never disagree, and it answers
//! per-line render queries by merging semantic tokens onto a freshly computed lexical baseline.

use ropey::Rope;

use crate::edit::{EditDelta, LineSpan, TextEdit, TokenPosition, TokenRange};
use crate::error::TokenStoreError;
use crate::line_tokens::LineTokens;
use crate::metadata::TokenMetadata;
use crate::overlay::TokenRangeOverlay;
use crate::store::SemanticTokenStore;

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Rope-backed line storage.
///
/// Text is kept with LF (`'\n'`) line breaks; CRLF input is normalized on load and on insert.
#[derive(Debug, Clone, Default)]
pub struct LineText {
    rope: Rope,
}

impl LineText {
    /// Create an empty text (one empty line).
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build line storage from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize_line_endings(text)),
        }
    }

    /// Number of lines. An empty text has one line.
    pub fn line_count(&self) -> u32 {
        to_u32(self.rope.len_lines())
    }

    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Text of `line` without its line break.
    pub fn line_text(&self, line: u32) -> Option<String> {
        let line = line as usize;
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Character length of `line` without its line break.
    pub fn line_len(&self, line: u32) -> Option<u32> {
        let line = line as usize;
        if line >= self.rope.len_lines() {
            return None;
        }
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
        }
        Some(to_u32(len))
    }

    /// Character offset of `position`, clamped to the document and the line length.
    pub fn position_to_char_offset(&self, position: TokenPosition) -> usize {
        let line = position.line as usize;
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(line);
        let line_len = self.line_len(position.line).unwrap_or(0) as usize;
        line_start + (position.character as usize).min(line_len)
    }

    /// Position of character offset `offset` (clamped to the document end).
    pub fn char_offset_to_position(&self, offset: usize) -> TokenPosition {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let line_start = self.rope.line_to_char(line);
        TokenPosition::new(to_u32(line), to_u32(offset - line_start))
    }

    /// `position` moved onto the text: columns past a line end go to the line end, lines past
    /// the end go to the end of the document.
    pub fn clamp_position(&self, position: TokenPosition) -> TokenPosition {
        self.char_offset_to_position(self.position_to_char_offset(position))
    }

    /// `range` with both ends clamped by [`Self::clamp_position`].
    pub fn clamp_range(&self, range: TokenRange) -> TokenRange {
        TokenRange {
            start: self.clamp_position(range.start),
            end: self.clamp_position(range.end),
        }
    }

    /// Insert text at a character offset.
    pub fn insert(&mut self, char_offset: usize, text: &str) {
        let char_offset = char_offset.min(self.rope.len_chars());
        self.rope.insert(char_offset, &normalize_line_endings(text));
    }

    /// Delete `len_chars` characters starting at `start_char`.
    pub fn delete(&mut self, start_char: usize, len_chars: usize) {
        let start_char = start_char.min(self.rope.len_chars());
        let end_char = (start_char + len_chars).min(self.rope.len_chars());
        if start_char < end_char {
            self.rope.remove(start_char..end_char);
        }
    }

    /// Replace `range` with `text`.
    pub fn replace(&mut self, range: TokenRange, text: &str) {
        let start = self.position_to_char_offset(range.start);
        let end = self.position_to_char_offset(range.end).max(start);
        self.delete(start, end - start);
        self.insert(start, text);
    }

    /// The whole text.
    pub fn get_text(&self) -> String {
        self.rope.to_string()
    }
}

/// Produces the lexical baseline tokens of a line.
pub trait LexicalTokenizer {
    /// Tokenize one line. `text` excludes the line break.
    fn tokenize_line(&self, line: u32, text: &str) -> LineTokens;
}

/// Tokenizer that renders each line as a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainTokenizer {
    /// Metadata of every line token.
    pub metadata: TokenMetadata,
}

impl Default for PlainTokenizer {
    fn default() -> Self {
        Self {
            metadata: TokenMetadata::DEFAULT_BASELINE,
        }
    }
}

impl LexicalTokenizer for PlainTokenizer {
    fn tokenize_line(&self, _line: u32, text: &str) -> LineTokens {
        LineTokens::single(to_u32(text.chars().count()), self.metadata)
    }
}

/// A document whose lines render as lexical tokens with semantic overlays merged on top.
#[derive(Debug, Clone)]
pub struct TokenizedDocument<T> {
    text: LineText,
    tokenizer: T,
    store: SemanticTokenStore,
}

impl<T: LexicalTokenizer> TokenizedDocument<T> {
    /// Create a document without semantic tokens.
    pub fn new(text: &str, tokenizer: T) -> Self {
        Self {
            text: LineText::from_text(text),
            tokenizer,
            store: SemanticTokenStore::new(),
        }
    }

    /// Line storage.
    pub fn text(&self) -> &LineText {
        &self.text
    }

    /// The lexical tokenizer.
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// The semantic token store.
    pub fn semantic_tokens(&self) -> &SemanticTokenStore {
        &self.store
    }

    /// Number of lines.
    pub fn line_count(&self) -> u32 {
        self.text.line_count()
    }

    /// Text of `line`.
    pub fn line_text(&self, line: u32) -> Option<String> {
        self.text.line_text(line)
    }

    /// Replace all semantic tokens.
    pub fn set_semantic_tokens(
        &mut self,
        overlays: Vec<TokenRangeOverlay>,
    ) -> Result<(), TokenStoreError> {
        self.store.set(overlays)
    }

    /// Ingest a partial semantic token push for `range`.
    pub fn set_partial_semantic_tokens(
        &mut self,
        range: TokenRange,
        overlays: Vec<TokenRangeOverlay>,
    ) -> Result<LineSpan, TokenStoreError> {
        self.store.set_partial(range, overlays)
    }

    /// Apply a text edit to the token store and the text.
    ///
    /// Positions past the end of a line or of the document are clamped to the text before the
    /// store sees them.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), TokenStoreError> {
        EditDelta::from_edit(edit)?;
        self.apply_validated(edit)
    }

    /// Apply edits in order. Nothing changes if any of them is invalid.
    pub fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<(), TokenStoreError> {
        for edit in edits {
            EditDelta::from_edit(edit)?;
        }
        for edit in edits {
            self.apply_validated(edit)?;
        }
        Ok(())
    }

    /// Clamping keeps the order of the range ends, so an edit that passed validation still
    /// does after it.
    fn apply_validated(&mut self, edit: &TextEdit) -> Result<(), TokenStoreError> {
        let range = self.text.clamp_range(edit.range);
        if range != edit.range {
            log::debug!(
                "semantic tokens: clamped edit range {:?} to {:?}",
                edit.range,
                range
            );
        }
        let edit = TextEdit::new(range, normalize_line_endings(&edit.text));
        self.store.accept_edit(&edit)?;
        self.text.replace(edit.range, &edit.text);
        Ok(())
    }

    /// Rendered tokens of `line`: the lexical baseline with semantic tokens merged in.
    ///
    /// Lines past the end of the document have no tokens.
    pub fn line_tokens(&self, line: u32) -> LineTokens {
        let Some(text) = self.text.line_text(line) else {
            return LineTokens::default();
        };
        let baseline = self.tokenizer.tokenize_line(line, &text);
        self.store.merge_line_tokens(line, &baseline)
    }
}
