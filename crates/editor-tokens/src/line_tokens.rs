//! Per-line token sequences as consumed by renderers.

use crate::error::TokenStoreError;
use crate::metadata::TokenMetadata;

/// One token of a [`LineTokens`] sequence. It starts where the previous token ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineToken {
    /// End character (exclusive).
    pub end_offset: u32,
    /// Style metadata.
    pub metadata: TokenMetadata,
}

impl LineToken {
    /// Create a line token.
    pub const fn new(end_offset: u32, metadata: TokenMetadata) -> Self {
        Self {
            end_offset,
            metadata,
        }
    }
}

/// The tokens of one line as `(end_offset, metadata)` pairs with strictly increasing ends.
///
/// The first token starts at character 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTokens {
    tokens: Vec<LineToken>,
}

impl LineTokens {
    /// Build a sequence, rejecting non-increasing end offsets.
    pub fn new(tokens: Vec<LineToken>) -> Result<Self, TokenStoreError> {
        for (index, pair) in tokens.windows(2).enumerate() {
            if pair[1].end_offset <= pair[0].end_offset {
                return Err(TokenStoreError::NonIncreasingLineTokens { index: index + 1 });
            }
        }
        if tokens.first().is_some_and(|token| token.end_offset == 0) {
            return Err(TokenStoreError::NonIncreasingLineTokens { index: 0 });
        }
        Ok(Self { tokens })
    }

    /// Build a sequence from the flat encoding `[endOffset, metadata]*`.
    pub fn from_raw(data: &[u32]) -> Result<Self, TokenStoreError> {
        if !data.len().is_multiple_of(2) {
            return Err(TokenStoreError::InvalidRawLength {
                stride: 2,
                len: data.len(),
            });
        }
        Self::new(
            data.chunks_exact(2)
                .map(|chunk| LineToken::new(chunk[0], TokenMetadata::from_raw(chunk[1])))
                .collect(),
        )
    }

    /// A single token covering `len` characters (nothing for an empty line).
    pub fn single(len: u32, metadata: TokenMetadata) -> Self {
        if len == 0 {
            return Self::default();
        }
        Self {
            tokens: vec![LineToken::new(len, metadata)],
        }
    }

    pub(crate) fn from_merged(tokens: Vec<LineToken>) -> Self {
        debug_assert!(Self::new(tokens.clone()).is_ok());
        Self { tokens }
    }

    /// Flatten back into `[endOffset, metadata]*`.
    pub fn to_raw(&self) -> Vec<u32> {
        self.tokens
            .iter()
            .flat_map(|token| [token.end_offset, token.metadata.raw()])
            .collect()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Start character of token `index`.
    pub fn start_offset(&self, index: usize) -> u32 {
        if index == 0 {
            0
        } else {
            self.tokens[index - 1].end_offset
        }
    }

    /// End character of token `index`.
    pub fn end_offset(&self, index: usize) -> u32 {
        self.tokens[index].end_offset
    }

    /// Metadata of token `index`.
    pub fn metadata(&self, index: usize) -> TokenMetadata {
        self.tokens[index].metadata
    }

    /// All tokens.
    pub fn as_slice(&self) -> &[LineToken] {
        &self.tokens
    }

    /// Iterate over `(start, end, metadata)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, TokenMetadata)> + '_ {
        self.tokens
            .iter()
            .scan(0u32, |start, token| {
                let item = (*start, token.end_offset, token.metadata);
                *start = token.end_offset;
                Some(item)
            })
    }

    /// End offsets of all tokens.
    pub fn boundaries(&self) -> Vec<u32> {
        self.tokens.iter().map(|token| token.end_offset).collect()
    }

    /// Index of the token containing character `offset`, clamped to the last token.
    pub fn find_token_index(&self, offset: u32) -> Option<usize> {
        if self.tokens.is_empty() {
            return None;
        }
        let index = self.tokens.partition_point(|token| token.end_offset <= offset);
        Some(index.min(self.tokens.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        let tokens = LineTokens::from_raw(&[4, 1, 9, 2, 12, 3]).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.start_offset(0), 0);
        assert_eq!(tokens.start_offset(2), 9);
        assert_eq!(tokens.end_offset(1), 9);
        assert_eq!(tokens.metadata(2).raw(), 3);
        assert_eq!(
            tokens.iter().map(|(s, e, _)| (s, e)).collect::<Vec<_>>(),
            vec![(0, 4), (4, 9), (9, 12)]
        );
        assert_eq!(tokens.boundaries(), vec![4, 9, 12]);
    }

    #[test]
    fn test_non_increasing_offsets_are_rejected() {
        assert!(matches!(
            LineTokens::from_raw(&[4, 1, 4, 2]),
            Err(TokenStoreError::NonIncreasingLineTokens { index: 1 })
        ));
        assert!(LineTokens::from_raw(&[0, 1]).is_err());
        assert!(LineTokens::from_raw(&[3]).is_err());
    }

    #[test]
    fn test_find_token_index() {
        let tokens = LineTokens::from_raw(&[4, 1, 9, 2]).unwrap();
        assert_eq!(tokens.find_token_index(0), Some(0));
        assert_eq!(tokens.find_token_index(4), Some(1));
        assert_eq!(tokens.find_token_index(20), Some(1));
        assert_eq!(LineTokens::default().find_token_index(0), None);
    }

    #[test]
    fn test_single() {
        assert!(LineTokens::single(0, TokenMetadata::DEFAULT_BASELINE).is_empty());
        assert_eq!(
            LineTokens::single(7, TokenMetadata::DEFAULT_BASELINE).to_raw(),
            vec![7, TokenMetadata::DEFAULT_BASELINE.raw()]
        );
    }
}
