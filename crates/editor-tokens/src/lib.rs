#![warn(missing_docs)]
//! Editor Tokens - Semantic Token Overlay Store
//!
//! # Overview
//!
//! `editor-tokens` keeps language-server semantic tokens aligned with a document and merges them
//! onto the lexical (syntax) tokens a renderer draws. Servers push tokens for arbitrary line
//! ranges in arbitrary order; the store guarantees that every line is owned by at most one push
//! (the most recent one covering it) and shifts stored tokens through text edits so they keep
//! pointing at the same text.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TokenizedDocument (text + tokenizer)       │  ← Host harness
//! ├─────────────────────────────────────────────┤
//! │  SemanticTokenStore                         │  ← Push / edit / merge
//! ├─────────────────────────────────────────────┤
//! │  TokenRangeOverlay                          │  ← One push, one line span
//! ├─────────────────────────────────────────────┤
//! │  SparseTokenBuffer                          │  ← Line-relative quadruples
//! ├─────────────────────────────────────────────┤
//! │  TokenMetadata                              │  ← 32-bit style codec
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_tokens::{
//!     PlainTokenizer, SemanticStyle, TextEdit, TokenPosition, TokenRange, TokenRangeOverlay,
//!     TokenizedDocument,
//! };
//!
//! let mut doc = TokenizedDocument::new("let uri = 1;\nprint(uri)", PlainTokenizer::default());
//!
//! // The server colors `uri` on both lines.
//! let variable = SemanticStyle::foreground(5).encode().unwrap().raw();
//! let overlay = TokenRangeOverlay::from_raw(0, &[0, 4, 7, variable, 1, 6, 9, variable]).unwrap();
//! doc.set_partial_semantic_tokens(TokenRange::new(0, 0, 1, 10), vec![overlay])
//!     .unwrap();
//!
//! // Edits shift the tokens with the text.
//! doc.apply_edit(&TextEdit::insert(TokenPosition::new(1, 0), "  ")).unwrap();
//!
//! let tokens = doc.line_tokens(1);
//! assert_eq!(tokens.boundaries(), vec![8, 11, 12]);
//! assert_eq!(tokens.metadata(1).foreground(), 5);
//! ```
//!
//! # Module Description
//!
//! - [`metadata`] - token metadata bit layout and style encoding
//! - [`sparse`] - sparse semantic token buffer
//! - [`overlay`] - range-bounded overlays
//! - [`store`] - the overlay store: partial pushes, edits, merging
//! - [`line_tokens`] - per-line rendered tokens
//! - [`edit`] - positions, ranges and edit notifications
//! - [`document`] - text, tokenizer and store bundled together

pub mod document;
pub mod edit;
mod error;
pub mod line_tokens;
pub mod metadata;
pub mod overlay;
pub mod sparse;
pub mod store;

pub use document::{LexicalTokenizer, LineText, PlainTokenizer, TokenizedDocument};
pub use edit::{EditDelta, LineSpan, TextEdit, TokenPosition, TokenRange};
pub use error::{MetadataError, TokenStoreError};
pub use line_tokens::{LineToken, LineTokens};
pub use metadata::{
    FontStyle, SemanticOverrides, SemanticStyle, StandardTokenType, TokenMetadata, TokenStyle,
};
pub use overlay::{ClippedOverlay, OverlayShift, TokenRangeOverlay};
pub use sparse::{LineEdit, SparseToken, SparseTokenBuffer};
pub use store::SemanticTokenStore;
