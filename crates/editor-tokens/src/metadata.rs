//! Packed token style metadata.
//!
//! Every token carries one `u32` describing how it should be painted:
//!
//! ```text
//!  3                   2                   1                   0
//!  1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0
//! ├─────────────────┼─────────────────┼─────┼─────┼───────────────┤
//! │   background    │   foreground    │font │type │  language id  │
//! └─────────────────┴─────────────────┴─────┴─────┴───────────────┘
//! ```
//!
//! Semantic (overlay) metadata has no language id. Its low five bits instead hold
//! [`SemanticOverrides`] flags that say which fields the overlay is allowed to repaint when it
//! is merged onto lexical metadata.

use crate::error::MetadataError;
use bitflags::bitflags;

/// Bit offset of the language id field.
pub const LANGUAGE_ID_OFFSET: u32 = 0;
/// Bit offset of the standard token type field.
pub const TOKEN_TYPE_OFFSET: u32 = 8;
/// Bit offset of the font style field.
pub const FONT_STYLE_OFFSET: u32 = 11;
/// Bit offset of the foreground color index.
pub const FOREGROUND_OFFSET: u32 = 14;
/// Bit offset of the background color index.
pub const BACKGROUND_OFFSET: u32 = 23;

/// Mask of the language id field.
pub const LANGUAGE_ID_MASK: u32 = 0x0000_00FF;
/// Mask of the standard token type field.
pub const TOKEN_TYPE_MASK: u32 = 0x0000_0700;
/// Mask of the font style field.
pub const FONT_STYLE_MASK: u32 = 0x0000_3800;
/// Mask of the foreground color index.
pub const FOREGROUND_MASK: u32 = 0x007F_C000;
/// Mask of the background color index.
pub const BACKGROUND_MASK: u32 = 0xFF80_0000;

const ITALIC_MASK: u32 = FontStyle::ITALIC.bits() << FONT_STYLE_OFFSET;
const BOLD_MASK: u32 = FontStyle::BOLD.bits() << FONT_STYLE_OFFSET;
const UNDERLINE_MASK: u32 = FontStyle::UNDERLINE.bits() << FONT_STYLE_OFFSET;

/// Largest language id that fits in the metadata.
pub const MAX_LANGUAGE_ID: u32 = LANGUAGE_ID_MASK >> LANGUAGE_ID_OFFSET;
/// Largest color index that fits in the foreground or background field.
pub const MAX_COLOR_INDEX: u32 = FOREGROUND_MASK >> FOREGROUND_OFFSET;

bitflags! {
    /// Font style bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u32 {
        /// Italic text.
        const ITALIC = 0b001;
        /// Bold text.
        const BOLD = 0b010;
        /// Underlined text.
        const UNDERLINE = 0b100;
    }
}

bitflags! {
    /// Per-field "use this layer's value" flags carried by overlay metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SemanticOverrides: u32 {
        /// Replace the italic bit.
        const ITALIC = 0b0_0001;
        /// Replace the bold bit.
        const BOLD = 0b0_0010;
        /// Replace the underline bit.
        const UNDERLINE = 0b0_0100;
        /// Replace the foreground color.
        const FOREGROUND = 0b0_1000;
        /// Replace the background color.
        const BACKGROUND = 0b1_0000;
    }
}

/// Coarse lexical classification used by bracket matching, comment toggling, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StandardTokenType {
    /// Anything else.
    #[default]
    Other = 0,
    /// Comments.
    Comment = 1,
    /// String literals.
    String = 2,
    /// Regular expression literals.
    RegEx = 3,
}

impl StandardTokenType {
    /// Decode a raw token type field value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Other),
            1 => Some(Self::Comment),
            2 => Some(Self::String),
            3 => Some(Self::RegEx),
            _ => None,
        }
    }
}

/// A packed token style (see the [module docs](self) for the layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenMetadata(u32);

impl TokenMetadata {
    /// Metadata of an untokenized line: foreground color 1 on background color 2.
    pub const DEFAULT_BASELINE: Self =
        Self((1 << FOREGROUND_OFFSET) | (2 << BACKGROUND_OFFSET));

    /// Wrap an already packed value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The packed value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Language id (lexical metadata only).
    pub fn language_id(self) -> u32 {
        (self.0 & LANGUAGE_ID_MASK) >> LANGUAGE_ID_OFFSET
    }

    /// Raw standard token type field.
    pub fn token_type(self) -> u32 {
        (self.0 & TOKEN_TYPE_MASK) >> TOKEN_TYPE_OFFSET
    }

    /// Standard token type, if the field holds a known value.
    pub fn standard_token_type(self) -> Option<StandardTokenType> {
        StandardTokenType::from_raw(self.token_type())
    }

    /// Font style bits.
    pub fn font_style(self) -> FontStyle {
        FontStyle::from_bits_truncate((self.0 & FONT_STYLE_MASK) >> FONT_STYLE_OFFSET)
    }

    /// Foreground color index.
    pub fn foreground(self) -> u32 {
        (self.0 & FOREGROUND_MASK) >> FOREGROUND_OFFSET
    }

    /// Background color index.
    pub fn background(self) -> u32 {
        (self.0 & BACKGROUND_MASK) >> BACKGROUND_OFFSET
    }

    /// Override flags (overlay metadata only).
    pub fn semantic_overrides(self) -> SemanticOverrides {
        SemanticOverrides::from_bits_truncate(self.0)
    }

    /// Bit mask of the fields this overlay metadata replaces.
    pub fn override_mask(self) -> u32 {
        let overrides = self.semantic_overrides();
        let mut mask = 0;
        if overrides.contains(SemanticOverrides::ITALIC) {
            mask |= ITALIC_MASK;
        }
        if overrides.contains(SemanticOverrides::BOLD) {
            mask |= BOLD_MASK;
        }
        if overrides.contains(SemanticOverrides::UNDERLINE) {
            mask |= UNDERLINE_MASK;
        }
        if overrides.contains(SemanticOverrides::FOREGROUND) {
            mask |= FOREGROUND_MASK;
        }
        if overrides.contains(SemanticOverrides::BACKGROUND) {
            mask |= BACKGROUND_MASK;
        }
        mask
    }

    /// Repaint `self` (lexical metadata) with the fields `semantic` overrides.
    ///
    /// Language id and token type always come from `self`; the override flags themselves are
    /// never copied.
    pub fn overlay(self, semantic: TokenMetadata) -> TokenMetadata {
        let mask = semantic.override_mask();
        Self((self.0 & !mask) | (semantic.0 & mask))
    }
}

impl From<TokenMetadata> for u32 {
    fn from(metadata: TokenMetadata) -> Self {
        metadata.0
    }
}

fn check_field(field: &'static str, value: u32, max: u32) -> Result<u32, MetadataError> {
    if value > max {
        return Err(MetadataError::FieldOverflow { field, value, max });
    }
    Ok(value)
}

/// Style attributes of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenStyle {
    /// Language id (at most [`MAX_LANGUAGE_ID`]).
    pub language_id: u32,
    /// Standard token type.
    pub token_type: StandardTokenType,
    /// Font style.
    pub font_style: FontStyle,
    /// Foreground color index (at most [`MAX_COLOR_INDEX`]).
    pub foreground: u32,
    /// Background color index (at most [`MAX_COLOR_INDEX`]).
    pub background: u32,
}

impl TokenStyle {
    /// Pack the style. Values wider than their field are rejected rather than truncated.
    pub fn encode(&self) -> Result<TokenMetadata, MetadataError> {
        let language_id = check_field("language_id", self.language_id, MAX_LANGUAGE_ID)?;
        let foreground = check_field("foreground", self.foreground, MAX_COLOR_INDEX)?;
        let background = check_field("background", self.background, MAX_COLOR_INDEX)?;

        Ok(TokenMetadata(
            (language_id << LANGUAGE_ID_OFFSET)
                | ((self.token_type as u32) << TOKEN_TYPE_OFFSET)
                | (self.font_style.bits() << FONT_STYLE_OFFSET)
                | (foreground << FOREGROUND_OFFSET)
                | (background << BACKGROUND_OFFSET),
        ))
    }
}

/// Style attributes of a semantic (overlay) token.
///
/// Every `Some` field is written into the metadata together with its override flag; `None`
/// fields leave the lexical value in place when merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SemanticStyle {
    /// Foreground color index.
    pub foreground: Option<u32>,
    /// Background color index.
    pub background: Option<u32>,
    /// Italic on/off.
    pub italic: Option<bool>,
    /// Bold on/off.
    pub bold: Option<bool>,
    /// Underline on/off.
    pub underline: Option<bool>,
}

impl SemanticStyle {
    /// A style that only repaints the foreground.
    pub fn foreground(color: u32) -> Self {
        Self {
            foreground: Some(color),
            ..Self::default()
        }
    }

    /// Returns `true` if the style overrides nothing.
    pub fn is_empty(&self) -> bool {
        self.foreground.is_none()
            && self.background.is_none()
            && self.italic.is_none()
            && self.bold.is_none()
            && self.underline.is_none()
    }

    /// Pack the style into overlay metadata.
    pub fn encode(&self) -> Result<TokenMetadata, MetadataError> {
        let mut overrides = SemanticOverrides::empty();
        let mut raw = 0u32;

        if let Some(foreground) = self.foreground {
            raw |= check_field("foreground", foreground, MAX_COLOR_INDEX)? << FOREGROUND_OFFSET;
            overrides |= SemanticOverrides::FOREGROUND;
        }
        if let Some(background) = self.background {
            raw |= check_field("background", background, MAX_COLOR_INDEX)? << BACKGROUND_OFFSET;
            overrides |= SemanticOverrides::BACKGROUND;
        }

        for (value, flag, bit) in [
            (self.italic, SemanticOverrides::ITALIC, ITALIC_MASK),
            (self.bold, SemanticOverrides::BOLD, BOLD_MASK),
            (self.underline, SemanticOverrides::UNDERLINE, UNDERLINE_MASK),
        ] {
            if let Some(on) = value {
                overrides |= flag;
                if on {
                    raw |= bit;
                }
            }
        }

        Ok(TokenMetadata(raw | overrides.bits()))
    }
}
