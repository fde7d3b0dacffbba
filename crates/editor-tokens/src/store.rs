//! The semantic token overlay store.
//!
//! [`SemanticTokenStore`] keeps a line-sorted list of [`TokenRangeOverlay`]s that never claim
//! the same line. Language-server pushes are ingested with
//! [`set_partial`](SemanticTokenStore::set_partial) (the newest push owns its lines), text
//! edits are absorbed with [`accept_edit`](SemanticTokenStore::accept_edit), and renderers
//! read merged per-line tokens through
//! [`merge_line_tokens`](SemanticTokenStore::merge_line_tokens).

use crate::edit::{EditDelta, LineSpan, TextEdit, TokenRange};
use crate::error::TokenStoreError;
use crate::line_tokens::{LineToken, LineTokens};
use crate::metadata::TokenMetadata;
use crate::overlay::{OverlayShift, TokenRangeOverlay};

/// Semantic token overlays for one document.
#[derive(Debug, Clone, Default)]
pub struct SemanticTokenStore {
    /// Sorted by base line; spans are pairwise disjoint.
    overlays: Vec<TokenRangeOverlay>,
}

impl SemanticTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            overlays: Vec::new(),
        }
    }

    /// Number of stored overlays.
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    /// Check if the store holds no overlays.
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Stored overlays, sorted by base line.
    pub fn overlays(&self) -> &[TokenRangeOverlay] {
        &self.overlays
    }

    /// Drop all overlays.
    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    /// Replace the whole store with a complete set of overlays.
    pub fn set(&mut self, overlays: Vec<TokenRangeOverlay>) -> Result<(), TokenStoreError> {
        let overlays = normalize_push(overlays)?;
        log::trace!("semantic tokens: full update with {} overlays", overlays.len());
        self.overlays = overlays;
        Ok(())
    }

    /// Ingest a partial push that is authoritative for `range`.
    ///
    /// Every line of `range` (and of the pushed overlays' spans, should they reach beyond it)
    /// is cleared of older data, then `overlays` are inserted. Returns the span that was
    /// claimed.
    pub fn set_partial(
        &mut self,
        range: TokenRange,
        overlays: Vec<TokenRangeOverlay>,
    ) -> Result<LineSpan, TokenStoreError> {
        range.validate()?;
        let incoming = normalize_push(overlays)?;

        let span = incoming
            .iter()
            .fold(range.line_span(), |span, overlay| {
                span.union(&overlay.line_span())
            });

        let first = self
            .overlays
            .partition_point(|overlay| overlay.end_line() < span.start);
        let last = self
            .overlays
            .partition_point(|overlay| overlay.base_line() <= span.end);

        let mut replacement = Vec::with_capacity(incoming.len() + 2);
        let mut residual_after = None;
        for (index, overlay) in self.overlays[first..last].iter().enumerate() {
            let clipped = overlay.clip_to_exclude(&span);
            // Only the first intersecting overlay can leave something above the span and only
            // the last one something below it.
            if index == 0 {
                replacement.extend(clipped.before);
            }
            if first + index + 1 == last {
                residual_after = clipped.after;
            }
        }

        let inserted = incoming.len();
        replacement.extend(incoming);
        replacement.extend(residual_after);

        log::trace!(
            "semantic tokens: push {:?} replaced {} overlays with {} ({} new)",
            span,
            last - first,
            replacement.len(),
            inserted
        );

        self.overlays.splice(first..last, replacement);
        debug_assert!(self.is_well_formed());
        Ok(span)
    }

    /// Shift stored tokens for a text edit.
    pub fn accept_edit(&mut self, edit: &TextEdit) -> Result<(), TokenStoreError> {
        let delta = EditDelta::from_edit(edit)?;
        self.apply_delta(&delta);
        Ok(())
    }

    /// Shift stored tokens for a sequence of edits, applied in order.
    ///
    /// Each edit's coordinates refer to the document as left by the previous one. All edits
    /// are validated before the store is touched.
    pub fn accept_edits(&mut self, edits: &[TextEdit]) -> Result<(), TokenStoreError> {
        let deltas = edits
            .iter()
            .map(EditDelta::from_edit)
            .collect::<Result<Vec<_>, _>>()?;
        for delta in &deltas {
            self.apply_delta(delta);
        }
        Ok(())
    }

    fn apply_delta(&mut self, delta: &EditDelta) {
        if delta.is_noop() || self.overlays.is_empty() {
            return;
        }

        // Overlays ending above the edit start are unaffected.
        let first = self
            .overlays
            .partition_point(|overlay| overlay.end_line() < delta.start.line);

        // Survivors are compacted towards `kept`; removed overlays collect at the tail.
        let mut kept = first;
        for index in first..self.overlays.len() {
            match self.overlays[index].shift_for_edit(delta) {
                OverlayShift::Removed => continue,
                OverlayShift::Adjusted { dropped } if dropped > 0 => {
                    log::trace!(
                        "semantic tokens: edit dropped {} tokens from overlay at line {}",
                        dropped,
                        self.overlays[index].base_line()
                    );
                }
                _ => {}
            }
            self.overlays.swap(kept, index);
            kept += 1;
        }
        let removed = self.overlays.len() - kept;
        self.overlays.truncate(kept);

        if removed > 0 {
            log::debug!("semantic tokens: edit removed {} overlays", removed);
        }

        self.fuse_shared_lines(first);
        debug_assert!(self.is_well_formed());
    }

    /// Joining lines can leave two neighbours claiming the same line. Their tokens on that line
    /// sit on opposite sides of the join point, so the later overlay is folded into the
    /// earlier one.
    fn fuse_shared_lines(&mut self, from: usize) {
        let mut index = from.max(1);
        while index < self.overlays.len() {
            if self.overlays[index].base_line() <= self.overlays[index - 1].end_line() {
                let next = self.overlays.remove(index);
                log::debug!(
                    "semantic tokens: fusing overlay at line {} into overlay at line {}",
                    next.base_line(),
                    self.overlays[index - 1].base_line()
                );
                self.overlays[index - 1].absorb(next);
            } else {
                index += 1;
            }
        }
    }

    /// The overlay claiming `line`, if any.
    pub fn overlay_for_line(&self, line: u32) -> Option<&TokenRangeOverlay> {
        let index = self
            .overlays
            .partition_point(|overlay| overlay.end_line() < line);
        self.overlays
            .get(index)
            .filter(|overlay| overlay.covers_line(line))
    }

    /// Merge semantic tokens for `line` onto its lexical `baseline`.
    ///
    /// Without a covering overlay the baseline is returned unchanged. Otherwise the output has
    /// a boundary at every lexical boundary and every semantic token edge, and each piece
    /// carries the lexical metadata repainted with the overriding fields of the semantic token
    /// on top of it.
    pub fn merge_line_tokens(&self, line: u32, baseline: &LineTokens) -> LineTokens {
        let Some(overlay) = self.overlay_for_line(line) else {
            return baseline.clone();
        };
        let semantic = overlay.tokens_for_line(line);
        if semantic.is_empty() {
            return baseline.clone();
        }

        let lexical = baseline.as_slice();
        let mut merged = LineTokenEmitter::with_capacity(lexical.len() + 2 * semantic.len());
        let mut a = 0usize;

        for token in semantic {
            // Emit lexical tokens that end before the semantic token starts.
            while a < lexical.len() && lexical[a].end_offset <= token.start_char {
                merged.emit(lexical[a].end_offset, lexical[a].metadata);
                a += 1;
            }

            // A lexical token straddling the semantic start is cut there.
            if a < lexical.len() && baseline.start_offset(a) < token.start_char {
                merged.emit(token.start_char, lexical[a].metadata);
            }

            // Lexical tokens ending inside the semantic token are repainted.
            while a < lexical.len() && lexical[a].end_offset < token.end_char {
                merged.emit(
                    lexical[a].end_offset,
                    lexical[a].metadata.overlay(token.metadata),
                );
                a += 1;
            }

            if a < lexical.len() {
                merged.emit(token.end_char, lexical[a].metadata.overlay(token.metadata));
                if lexical[a].end_offset == token.end_char {
                    a += 1;
                }
            } else {
                // The semantic token runs past the last lexical token.
                let base = lexical
                    .last()
                    .map_or(TokenMetadata::default(), |last| last.metadata);
                merged.emit(token.end_char, base.overlay(token.metadata));
            }
        }

        while a < lexical.len() {
            merged.emit(lexical[a].end_offset, lexical[a].metadata);
            a += 1;
        }

        merged.finish()
    }

    /// Check the coverage-exclusivity invariant: overlays sorted, non-empty and disjoint.
    pub fn is_well_formed(&self) -> bool {
        self.overlays.iter().all(|overlay| !overlay.is_empty())
            && self
                .overlays
                .windows(2)
                .all(|pair| pair[0].end_line() < pair[1].base_line())
    }
}

/// Sort a push by base line and reject overlapping or empty members.
fn normalize_push(
    mut overlays: Vec<TokenRangeOverlay>,
) -> Result<Vec<TokenRangeOverlay>, TokenStoreError> {
    overlays.retain(|overlay| !overlay.is_empty());
    overlays.sort_by_key(|overlay| overlay.base_line());
    for pair in overlays.windows(2) {
        if pair[1].base_line() <= pair[0].end_line() {
            log::debug!(
                "semantic tokens: rejecting push with overlapping overlays at lines {} and {}",
                pair[0].base_line(),
                pair[1].base_line()
            );
            return Err(TokenStoreError::OverlappingOverlays {
                first: pair[0].base_line(),
                second: pair[1].base_line(),
            });
        }
    }
    Ok(overlays)
}

struct LineTokenEmitter {
    tokens: Vec<LineToken>,
    last_end: u32,
}

impl LineTokenEmitter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
            last_end: 0,
        }
    }

    fn emit(&mut self, end_offset: u32, metadata: TokenMetadata) {
        if end_offset == self.last_end {
            return;
        }
        self.last_end = end_offset;
        self.tokens.push(LineToken::new(end_offset, metadata));
    }

    fn finish(self) -> LineTokens {
        LineTokens::from_merged(self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::TokenPosition;
    use crate::metadata::SemanticStyle;
    use pretty_assertions::assert_eq;

    fn overlay(base_line: u32, raw: &[u32]) -> TokenRangeOverlay {
        TokenRangeOverlay::from_raw(base_line, raw).unwrap()
    }

    fn spans(store: &SemanticTokenStore) -> Vec<(u32, u32)> {
        store
            .overlays()
            .iter()
            .map(|overlay| (overlay.base_line(), overlay.end_line()))
            .collect()
    }

    #[test]
    fn test_set_partial_into_empty_store() {
        let mut store = SemanticTokenStore::new();
        let span = store
            .set_partial(
                TokenRange::new(0, 0, 10, 0),
                vec![overlay(2, &[0, 0, 3, 1, 4, 1, 2, 1])],
            )
            .unwrap();
        assert_eq!(span, LineSpan::new(0, 9));
        assert_eq!(spans(&store), vec![(2, 6)]);
        assert!(store.overlay_for_line(4).is_some());
        assert!(store.overlay_for_line(7).is_none());
    }

    #[test]
    fn test_set_partial_clips_wider_older_overlay() {
        let mut store = SemanticTokenStore::new();
        store
            .set_partial(
                TokenRange::new(0, 0, 20, 0),
                vec![overlay(0, &[0, 0, 1, 1, 5, 0, 1, 1, 10, 0, 1, 1, 15, 0, 1, 1])],
            )
            .unwrap();
        store
            .set_partial(
                TokenRange::new(6, 0, 11, 1),
                vec![overlay(8, &[0, 0, 1, 2])],
            )
            .unwrap();

        assert_eq!(spans(&store), vec![(0, 5), (8, 8), (12, 15)]);
        assert!(store.overlay_for_line(10).is_none());
        assert_eq!(
            store.overlay_for_line(15).unwrap().tokens_for_line(15)[0]
                .metadata
                .raw(),
            1
        );
        assert_eq!(
            store.overlay_for_line(8).unwrap().tokens_for_line(8)[0]
                .metadata
                .raw(),
            2
        );
    }

    #[test]
    fn test_set_partial_with_empty_push_clears_range() {
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(0, &[0, 0, 1, 1, 3, 0, 1, 1, 6, 0, 1, 1])])
            .unwrap();
        store
            .set_partial(TokenRange::new(2, 0, 4, 0), Vec::new())
            .unwrap();
        // The range ends at character 0 of line 4, so line 4 keeps its claim.
        assert_eq!(spans(&store), vec![(0, 1), (4, 6)]);
    }

    #[test]
    fn test_set_partial_rejects_inverted_range_without_mutation() {
        let mut store = SemanticTokenStore::new();
        store.set(vec![overlay(0, &[0, 0, 1, 1])]).unwrap();
        let err = store.set_partial(TokenRange::new(5, 0, 1, 0), Vec::new());
        assert!(matches!(err, Err(TokenStoreError::InvertedRange { .. })));
        assert_eq!(spans(&store), vec![(0, 0)]);
    }

    #[test]
    fn test_set_rejects_overlapping_overlays() {
        let mut store = SemanticTokenStore::new();
        let err = store.set(vec![
            overlay(0, &[0, 0, 1, 1, 4, 0, 1, 1]),
            overlay(3, &[0, 0, 1, 1]),
        ]);
        assert_eq!(
            err,
            Err(TokenStoreError::OverlappingOverlays {
                first: 0,
                second: 3
            })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_sorts_overlays() {
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(9, &[0, 0, 1, 1]), overlay(2, &[0, 0, 1, 1])])
            .unwrap();
        assert_eq!(spans(&store), vec![(2, 2), (9, 9)]);
    }

    #[test]
    fn test_accept_edit_translates_later_overlays() {
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(1, &[0, 0, 2, 1]), overlay(5, &[0, 3, 6, 2])])
            .unwrap();
        store
            .accept_edit(&TextEdit::insert(TokenPosition::new(3, 0), "a\nb\nc"))
            .unwrap();
        assert_eq!(spans(&store), vec![(1, 1), (7, 7)]);
    }

    #[test]
    fn test_joining_lines_fuses_neighbouring_overlays() {
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(0, &[0, 0, 3, 1]), overlay(1, &[0, 2, 5, 2])])
            .unwrap();
        // Delete the line break at the end of "abc".
        store
            .accept_edit(&TextEdit::delete(TokenRange::new(0, 3, 1, 0)))
            .unwrap();

        assert_eq!(spans(&store), vec![(0, 0)]);
        assert_eq!(
            store.overlays()[0].tokens().to_raw(),
            vec![0, 0, 3, 1, 0, 5, 8, 2]
        );
    }

    #[test]
    fn test_crlf_insert_matches_lf_insert() {
        let mut lf = SemanticTokenStore::new();
        lf.set(vec![overlay(0, &[0, 0, 3, 1])]).unwrap();
        let mut crlf = lf.clone();

        lf.accept_edit(&TextEdit::insert(TokenPosition::new(0, 3), "\n"))
            .unwrap();
        crlf.accept_edit(&TextEdit::insert(TokenPosition::new(0, 3), "\r\n"))
            .unwrap();

        assert_eq!(crlf.len(), 1);
        assert_eq!(crlf.overlays(), lf.overlays());
        assert_eq!(crlf.overlays()[0].tokens().to_raw(), vec![0, 0, 3, 1]);
    }

    #[test]
    fn test_edit_removing_many_overlays_keeps_order() {
        let mut store = SemanticTokenStore::new();
        store
            .set(
                (0..6)
                    .map(|index| overlay(1 + 2 * index, &[0, 0, 2, index + 1]))
                    .collect(),
            )
            .unwrap();
        // Lines 2..=7 go away, taking the overlays at 3, 5 and 7 with them.
        store
            .accept_edit(&TextEdit::delete(TokenRange::new(2, 0, 8, 0)))
            .unwrap();

        assert_eq!(spans(&store), vec![(1, 1), (3, 3), (5, 5)]);
        let metadata: Vec<u32> = store
            .overlays()
            .iter()
            .map(|overlay| overlay.tokens().as_slice()[0].metadata.raw())
            .collect();
        assert_eq!(metadata, vec![1, 5, 6]);
    }

    #[test]
    fn test_accept_edits_validates_everything_first() {
        let mut store = SemanticTokenStore::new();
        store.set(vec![overlay(4, &[0, 0, 3, 1])]).unwrap();
        let result = store.accept_edits(&[
            TextEdit::insert(TokenPosition::new(0, 0), "\n"),
            TextEdit::delete(TokenRange::new(3, 0, 2, 0)),
        ]);
        assert!(result.is_err());
        assert_eq!(spans(&store), vec![(4, 4)]);
    }

    #[test]
    fn test_merge_without_overlay_returns_baseline() {
        let store = SemanticTokenStore::new();
        let baseline = LineTokens::from_raw(&[12, 1]).unwrap();
        assert_eq!(store.merge_line_tokens(3, &baseline), baseline);
    }

    #[test]
    fn test_merge_splits_and_repaints() {
        let semantic = SemanticStyle::foreground(5).encode().unwrap();
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(0, &[0, 2, 6, semantic.raw()])])
            .unwrap();

        let lexical = TokenMetadata::DEFAULT_BASELINE;
        let baseline = LineTokens::from_raw(&[4, lexical.raw(), 10, lexical.raw()]).unwrap();
        let merged = store.merge_line_tokens(0, &baseline);

        let painted = lexical.overlay(semantic);
        assert_eq!(
            merged.to_raw(),
            vec![
                2,
                lexical.raw(),
                4,
                painted.raw(),
                6,
                painted.raw(),
                10,
                lexical.raw()
            ]
        );
    }

    #[test]
    fn test_merge_with_coinciding_boundaries_adds_no_split() {
        let semantic = SemanticStyle::foreground(5).encode().unwrap();
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(0, &[0, 4, 9, semantic.raw()])])
            .unwrap();

        let baseline = LineTokens::from_raw(&[4, 1, 9, 1, 12, 1]).unwrap();
        let merged = store.merge_line_tokens(0, &baseline);
        assert_eq!(merged.boundaries(), vec![4, 9, 12]);
    }

    #[test]
    fn test_merge_past_end_of_baseline() {
        let semantic = SemanticStyle::foreground(5).encode().unwrap();
        let mut store = SemanticTokenStore::new();
        store
            .set(vec![overlay(0, &[0, 3, 8, semantic.raw()])])
            .unwrap();

        let baseline = LineTokens::from_raw(&[5, TokenMetadata::DEFAULT_BASELINE.raw()]).unwrap();
        let merged = store.merge_line_tokens(0, &baseline);
        assert_eq!(merged.boundaries(), vec![3, 5, 8]);
        assert_eq!(merged.metadata(2).foreground(), 5);

        let merged = store.merge_line_tokens(0, &LineTokens::default());
        assert_eq!(merged.boundaries(), vec![8]);
    }
}
