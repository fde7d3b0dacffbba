#![warn(missing_docs)]
//! `editor-tokens-lsp` - Language-server boundary for `editor-tokens`.
//!
//! Language servers describe semantic tokens in UTF-16 columns with a server-specific legend.
//! This crate converts those payloads into [`TokenRangeOverlay`](editor_tokens::TokenRangeOverlay)s
//! in character coordinates, styled through a user theme, ready for a
//! [`SemanticTokenStore`](editor_tokens::SemanticTokenStore).
//!
//! It does not speak JSON-RPC itself: the client hands over the `serde_json` values of the
//! request params and responses.
//!
//! ```
//! use editor_tokens::{LineText, SemanticTokenStore};
//! use editor_tokens_lsp::{
//!     SemanticStylingConfig, SemanticTokensLegend, SemanticTokensStyling,
//!     semantic_tokens_range_push,
//! };
//! use serde_json::json;
//!
//! let text = LineText::from_text("let answer = 42;");
//! let legend = SemanticTokensLegend::from_json(&json!({
//!     "tokenTypes": ["variable"],
//!     "tokenModifiers": []
//! }))
//! .unwrap();
//! let config =
//!     SemanticStylingConfig::from_json_str(r#"{ "rules": { "variable": { "foreground": 5 } } }"#)
//!         .unwrap();
//! let mut styling = SemanticTokensStyling::new(legend, config);
//!
//! let push = semantic_tokens_range_push(
//!     &text,
//!     &mut styling,
//!     &json!({ "start": { "line": 0, "character": 0 }, "end": { "line": 1, "character": 0 } }),
//!     &json!({ "data": [0, 4, 6, 0, 0] }),
//! )
//! .unwrap();
//!
//! let mut store = SemanticTokenStore::new();
//! push.apply(&mut store).unwrap();
//! assert_eq!(store.len(), 1);
//! ```

pub mod coordinates;
mod error;
pub mod semantic_tokens;
pub mod styling;

pub use coordinates::{
    LspCoordinateConverter, LspPosition, LspRange, lsp_range_to_token_range, parse_lsp_position,
    parse_lsp_range,
};
pub use error::LspSemanticTokensError;
pub use semantic_tokens::{
    DESIRED_TOKENS_PER_OVERLAY, SemanticTokensPush, parse_semantic_tokens_data,
    semantic_tokens_full, semantic_tokens_range_push, semantic_tokens_to_overlay,
    semantic_tokens_to_overlays,
};
pub use styling::{
    SemanticStyleRule, SemanticStylingConfig, SemanticTokensLegend, SemanticTokensStyling,
};
