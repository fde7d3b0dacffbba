use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced when packing style attributes into [`TokenMetadata`](crate::TokenMetadata).
pub enum MetadataError {
    #[error("metadata field '{field}' value {value} exceeds its maximum of {max}")]
    /// A field value does not fit the bit width reserved for it.
    FieldOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u32,
        /// Largest value the field can hold.
        max: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the token store and its building blocks.
///
/// All of these describe malformed input from the caller. Operations that return them leave
/// the store untouched.
pub enum TokenStoreError {
    #[error("raw token data length must be a multiple of {stride} (got {len})")]
    /// A flat `u32` token array had a length that is not a whole number of records.
    InvalidRawLength {
        /// Number of `u32` values per record.
        stride: usize,
        /// The length that was supplied.
        len: usize,
    },

    #[error("token {index} on relative line {line} is empty or inverted ({start}..{end})")]
    /// A token with `start >= end`.
    EmptyToken {
        /// Index of the token inside its buffer.
        index: usize,
        /// Relative line of the token.
        line: u32,
        /// Start character.
        start: u32,
        /// End character.
        end: u32,
    },

    #[error("token {index} is not sorted by line and start character")]
    /// Tokens were supplied out of order.
    UnsortedTokens {
        /// Index of the first out-of-order token.
        index: usize,
    },

    #[error("token {index} overlaps the previous token on relative line {line}")]
    /// Two tokens of one buffer overlap on the same line.
    OverlappingTokens {
        /// Index of the second token of the overlapping pair.
        index: usize,
        /// Relative line where the overlap happens.
        line: u32,
    },

    #[error("token on relative line {line} lies outside the overlay span of {span_lines} lines")]
    /// An overlay was given an explicit span that does not contain all of its tokens.
    TokenOutsideSpan {
        /// Relative line of the offending token.
        line: u32,
        /// The declared span (`end_line - base_line`).
        span_lines: u32,
    },

    #[error("inverted range: {start_line}:{start_char} is after {end_line}:{end_char}")]
    /// A push range whose end precedes its start.
    InvertedRange {
        /// Start line.
        start_line: u32,
        /// Start character.
        start_char: u32,
        /// End line.
        end_line: u32,
        /// End character.
        end_char: u32,
    },

    #[error("inverted edit: {start_line}:{start_char} is after {end_line}:{end_char}")]
    /// An edit whose replaced range ends before it starts.
    InvertedEdit {
        /// Start line.
        start_line: u32,
        /// Start character.
        start_char: u32,
        /// End line.
        end_line: u32,
        /// End character.
        end_char: u32,
    },

    #[error("overlays starting at lines {first} and {second} claim the same lines")]
    /// Overlays handed over in a single push overlap each other.
    OverlappingOverlays {
        /// Base line of the first overlay.
        first: u32,
        /// Base line of the second overlay.
        second: u32,
    },

    #[error("overlay at line {base_line} spanning {span_lines} more lines runs past the last line")]
    /// An overlay whose last line does not fit in a `u32`.
    LineOverflow {
        /// Requested base line.
        base_line: u32,
        /// Requested span.
        span_lines: u32,
    },

    #[error("line token end offsets must be strictly increasing (index {index})")]
    /// A [`LineTokens`](crate::LineTokens) sequence with a non-increasing end offset.
    NonIncreasingLineTokens {
        /// Index of the offending token.
        index: usize,
    },

    #[error(transparent)]
    /// Style attributes could not be encoded.
    Metadata(#[from] MetadataError),
}
