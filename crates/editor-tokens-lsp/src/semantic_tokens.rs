//! Decoding of `textDocument/semanticTokens/*` results into token overlays.

use editor_tokens::{
    LineSpan, LineText, SemanticTokenStore, SparseToken, SparseTokenBuffer, TokenRange,
    TokenRangeOverlay, TokenStoreError,
};
use serde_json::Value;

use crate::coordinates::{LspCoordinateConverter, lsp_range_to_token_range, parse_lsp_range};
use crate::error::LspSemanticTokensError;
use crate::styling::SemanticTokensStyling;

/// Overlay size used when splitting large results. Small overlays keep edits cheap.
pub const DESIRED_TOKENS_PER_OVERLAY: usize = 400;

const LSP_TOKEN_STRIDE: usize = 5;

/// A decoded token in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecodedToken {
    line: u32,
    start_char: u32,
    end_char: u32,
    metadata: editor_tokens::TokenMetadata,
}

/// Convert LSP `semanticTokens` data to overlays.
///
/// - `data` uses the LSP delta encoding, five `u32`s per token:
///   `(deltaLine, deltaStart, length, tokenType, tokenModifiers)`
/// - `deltaStart`/`length` count UTF-16 code units and are converted to characters through
///   `line_text`
/// - tokens without a style, empty tokens and tokens overlapping the previous one are skipped
///
/// A new overlay is started at the first line boundary after `tokens_per_overlay` tokens.
pub fn semantic_tokens_to_overlays(
    data: &[u32],
    line_text: &LineText,
    styling: &mut SemanticTokensStyling,
    tokens_per_overlay: usize,
) -> Result<Vec<TokenRangeOverlay>, LspSemanticTokensError> {
    let decoded = decode_tokens(data, line_text, styling)?;
    let tokens_per_overlay = tokens_per_overlay.max(1);

    let mut overlays = Vec::new();
    let mut chunk: Vec<DecodedToken> = Vec::with_capacity(tokens_per_overlay.min(decoded.len()));
    for token in decoded {
        if chunk.len() >= tokens_per_overlay
            && chunk.last().is_some_and(|last| last.line != token.line)
        {
            overlays.push(build_overlay(&chunk)?);
            chunk.clear();
        }
        chunk.push(token);
    }
    if !chunk.is_empty() {
        overlays.push(build_overlay(&chunk)?);
    }
    Ok(overlays)
}

/// Convert LSP `semanticTokens` data to a single overlay, or `None` if nothing is styled.
pub fn semantic_tokens_to_overlay(
    data: &[u32],
    line_text: &LineText,
    styling: &mut SemanticTokensStyling,
) -> Result<Option<TokenRangeOverlay>, LspSemanticTokensError> {
    let decoded = decode_tokens(data, line_text, styling)?;
    if decoded.is_empty() {
        return Ok(None);
    }
    Ok(Some(build_overlay(&decoded)?))
}

fn decode_tokens(
    data: &[u32],
    line_text: &LineText,
    styling: &mut SemanticTokensStyling,
) -> Result<Vec<DecodedToken>, LspSemanticTokensError> {
    if !data.len().is_multiple_of(LSP_TOKEN_STRIDE) {
        return Err(LspSemanticTokensError::InvalidDataLength(data.len()));
    }

    let mut tokens: Vec<DecodedToken> = Vec::with_capacity(data.len() / LSP_TOKEN_STRIDE);
    let mut current_line: u32 = 0;
    let mut current_start_utf16: u32 = 0;
    let mut cached_line: Option<u32> = None;
    let mut cached_line_text = String::new();
    let line_count = line_text.line_count();

    for chunk in data.chunks_exact(LSP_TOKEN_STRIDE) {
        let [delta_line, delta_start, length, token_type, token_modifiers] = chunk else {
            continue;
        };

        if *delta_line > 0 {
            current_line = current_line.saturating_add(*delta_line);
            current_start_utf16 = *delta_start;
        } else {
            current_start_utf16 = current_start_utf16.saturating_add(*delta_start);
        }

        let end_utf16 = current_start_utf16
            .checked_add(*length)
            .ok_or(LspSemanticTokensError::Utf16Overflow)?;

        if current_line >= line_count {
            return Err(LspSemanticTokensError::InvalidLine(current_line));
        }

        let Some(metadata) = styling.metadata_for(*token_type, *token_modifiers) else {
            continue;
        };

        if cached_line != Some(current_line) {
            cached_line_text = line_text.line_text(current_line).unwrap_or_default();
            cached_line = Some(current_line);
        }

        let text = cached_line_text.as_str();
        let start_char =
            LspCoordinateConverter::utf16_to_char_offset(text, current_start_utf16 as usize);
        let end_char = LspCoordinateConverter::utf16_to_char_offset(text, end_utf16 as usize);
        if start_char >= end_char {
            continue;
        }

        let token = DecodedToken {
            line: current_line,
            start_char: crate::coordinates::to_u32(start_char),
            end_char: crate::coordinates::to_u32(end_char),
            metadata,
        };
        if let Some(previous) = tokens.last()
            && previous.line == token.line
            && previous.end_char > token.start_char
        {
            log::debug!(
                "semantic tokens: dropping token {}:{}..{} overlapping the previous token",
                token.line,
                token.start_char,
                token.end_char
            );
            continue;
        }
        tokens.push(token);
    }

    Ok(tokens)
}

fn build_overlay(tokens: &[DecodedToken]) -> Result<TokenRangeOverlay, TokenStoreError> {
    let base_line = tokens.first().map_or(0, |token| token.line);
    let sparse = tokens
        .iter()
        .map(|token| {
            SparseToken::new(
                token.line - base_line,
                token.start_char,
                token.end_char,
                token.metadata,
            )
        })
        .collect();
    TokenRangeOverlay::new(base_line, SparseTokenBuffer::new(sparse)?)
}

/// Extract the `data` array of a `SemanticTokens` result.
///
/// A `null` result (the server has nothing to report) yields no data.
pub fn parse_semantic_tokens_data(result: &Value) -> Result<Vec<u32>, LspSemanticTokensError> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    let data = result
        .get("data")
        .and_then(Value::as_array)
        .ok_or(LspSemanticTokensError::MissingField("data"))?;

    data.iter()
        .enumerate()
        .map(|(index, value)| {
            value
                .as_u64()
                .and_then(|value| u32::try_from(value).ok())
                .ok_or(LspSemanticTokensError::InvalidDataValue(index))
        })
        .collect()
}

/// Overlays decoded from a `semanticTokens/range` response, ready to replace `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticTokensPush {
    /// The requested range, in characters.
    pub range: TokenRange,
    /// Decoded overlays, sorted and disjoint.
    pub overlays: Vec<TokenRangeOverlay>,
}

impl SemanticTokensPush {
    /// Replace the pushed range in `store`, returning the lines whose tokens changed.
    pub fn apply(self, store: &mut SemanticTokenStore) -> Result<LineSpan, TokenStoreError> {
        store.set_partial(self.range, self.overlays)
    }
}

/// Decode a `textDocument/semanticTokens/range` exchange.
///
/// `range` is the `range` param of the request and `result` the response.
pub fn semantic_tokens_range_push(
    line_text: &LineText,
    styling: &mut SemanticTokensStyling,
    range: &Value,
    result: &Value,
) -> Result<SemanticTokensPush, LspSemanticTokensError> {
    let lsp_range = parse_lsp_range(range).ok_or(LspSemanticTokensError::MissingField("range"))?;
    let range = lsp_range_to_token_range(line_text, &lsp_range);
    range.validate()?;

    let data = parse_semantic_tokens_data(result)?;
    let overlays =
        semantic_tokens_to_overlays(&data, line_text, styling, DESIRED_TOKENS_PER_OVERLAY)?;
    Ok(SemanticTokensPush { range, overlays })
}

/// Decode a `textDocument/semanticTokens/full` response into overlays for
/// [`SemanticTokenStore::set`].
pub fn semantic_tokens_full(
    line_text: &LineText,
    styling: &mut SemanticTokensStyling,
    result: &Value,
) -> Result<Vec<TokenRangeOverlay>, LspSemanticTokensError> {
    let data = parse_semantic_tokens_data(result)?;
    semantic_tokens_to_overlays(&data, line_text, styling, DESIRED_TOKENS_PER_OVERLAY)
}
