//! `editor-tokens-lexer` - Simple (regex-based) lexical tokenizer for `editor-tokens`.
//!
//! This crate produces the baseline line tokens that semantic tokens are merged onto. It is
//! intended for documents where a full grammar is unavailable or unnecessary; a language server
//! is expected to paint the precise meaning on top.

use editor_tokens::metadata::{BACKGROUND_OFFSET, FOREGROUND_OFFSET, TOKEN_TYPE_OFFSET};
use editor_tokens::{LexicalTokenizer, LineToken, LineTokens, StandardTokenType, TokenMetadata};
use regex::Regex;

/// A single regex tokenizing rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    metadata: TokenMetadata,
    capture_group: Option<usize>,
}

impl RegexRule {
    pub fn new(pattern: &str, metadata: TokenMetadata) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            metadata,
            capture_group: None,
        })
    }

    /// Tokenize only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    pub fn metadata(&self) -> TokenMetadata {
        self.metadata
    }

    /// Byte span of the first non-empty token this rule finds at or after `from`.
    fn next_match(&self, text: &str, mut from: usize) -> Option<(usize, usize)> {
        while from <= text.len() {
            match self.capture_group {
                Some(group) => {
                    let caps = self.regex.captures_at(text, from)?;
                    let whole = caps.get(0)?;
                    if let Some(m) = caps.get(group)
                        && m.start() < m.end()
                    {
                        return Some((m.start(), m.end()));
                    }
                    from = advance(text, whole.start());
                }
                None => {
                    let m = self.regex.find_at(text, from)?;
                    if m.start() < m.end() {
                        return Some((m.start(), m.end()));
                    }
                    from = advance(text, m.start());
                }
            }
        }
        None
    }
}

fn advance(text: &str, at: usize) -> usize {
    at + text[at..].chars().next().map_or(1, char::len_utf8)
}

/// A simple regex-based tokenizer.
///
/// The line is scanned left to right. At each step the match starting earliest wins; among
/// matches starting at the same character the rule listed first wins. Text no rule claims is
/// covered by the default metadata.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    rules: Vec<RegexRule>,
    default: TokenMetadata,
}

impl RegexTokenizer {
    pub fn new(rules: Vec<RegexRule>, default: TokenMetadata) -> Self {
        Self { rules, default }
    }

    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Metadata of text no rule matches.
    pub fn default_metadata(&self) -> TokenMetadata {
        self.default
    }

    /// A small C-family grammar (comments, strings, numbers, keywords).
    pub fn c_like_default(styles: LexicalStyles) -> Result<Self, regex::Error> {
        Ok(Self::new(
            vec![
                // Line comment
                RegexRule::new(r#"//.*$"#, styles.comment)?,
                // Block comment closed on the same line
                RegexRule::new(r#"/\*.*?\*/"#, styles.comment)?,
                // String / char literal (single-line, handles escapes)
                RegexRule::new(r#""(?:\\.|[^"\\])*""#, styles.string)?,
                RegexRule::new(r#"'(?:\\.|[^'\\])'"#, styles.string)?,
                // Number
                RegexRule::new(
                    r#"\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b"#,
                    styles.number,
                )?,
                RegexRule::new(
                    r#"\b(?:if|else|for|while|do|return|break|continue|switch|case|default|struct|enum|union|typedef|const|static|void|int|char|float|double|long|short|unsigned|signed|sizeof|fn|let|mut|match|impl|trait|pub|use|mod)\b"#,
                    styles.keyword,
                )?,
            ],
            styles.default,
        ))
    }

    /// A small JSON grammar (strings, numbers, booleans, null).
    pub fn json_default(styles: LexicalStyles) -> Result<Self, regex::Error> {
        Ok(Self::new(
            vec![
                RegexRule::new(r#""(?:\\.|[^"\\])*""#, styles.string)?,
                RegexRule::new(
                    r#"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"#,
                    styles.number,
                )?,
                RegexRule::new(r#"\b(?:true|false|null)\b"#, styles.keyword)?,
            ],
            styles.default,
        ))
    }

    /// Token spans of `text` as `(start_char, end_char, metadata)`, gaps included.
    pub fn tokenize(&self, text: &str) -> Vec<(u32, u32, TokenMetadata)> {
        let mut spans = Vec::new();
        let mut pos = 0usize;
        let mut pos_char = 0u32;

        while pos < text.len() {
            let best = self
                .rules
                .iter()
                .enumerate()
                .filter_map(|(index, rule)| {
                    rule.next_match(text, pos)
                        .map(|(start, end)| (start, end, index))
                })
                .min_by_key(|(start, _, index)| (*start, *index));
            let Some((start, end, index)) = best else {
                break;
            };

            let start_char = pos_char + char_len(&text[pos..start]);
            let end_char = start_char + char_len(&text[start..end]);
            if start_char > pos_char {
                spans.push((pos_char, start_char, self.default));
            }
            spans.push((start_char, end_char, self.rules[index].metadata));
            pos = end;
            pos_char = end_char;
        }

        let len = pos_char + char_len(&text[pos..]);
        if len > pos_char {
            spans.push((pos_char, len, self.default));
        }
        spans
    }
}

impl LexicalTokenizer for RegexTokenizer {
    fn tokenize_line(&self, _line: u32, text: &str) -> LineTokens {
        let spans = self.tokenize(text);
        let len = spans.last().map_or(0, |(_, end, _)| *end);
        let tokens = spans
            .into_iter()
            .map(|(_, end, metadata)| LineToken::new(end, metadata))
            .collect();
        LineTokens::new(tokens).unwrap_or_else(|_| LineTokens::single(len, self.default))
    }
}

fn char_len(text: &str) -> u32 {
    u32::try_from(text.chars().count()).unwrap_or(u32::MAX)
}

/// Metadata used by the built-in grammars.
///
/// The color indices are only identifiers. The theme layer is expected to map them to actual
/// colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalStyles {
    pub default: TokenMetadata,
    pub comment: TokenMetadata,
    pub string: TokenMetadata,
    pub number: TokenMetadata,
    pub keyword: TokenMetadata,
}

const fn lexical(token_type: StandardTokenType, foreground: u32) -> TokenMetadata {
    TokenMetadata::from_raw(
        ((token_type as u32) << TOKEN_TYPE_OFFSET)
            | (foreground << FOREGROUND_OFFSET)
            | (2 << BACKGROUND_OFFSET),
    )
}

/// Default foreground color indices of the built-in grammars.
pub const LEXICAL_COLOR_COMMENT: u32 = 3;
pub const LEXICAL_COLOR_STRING: u32 = 4;
pub const LEXICAL_COLOR_NUMBER: u32 = 5;
pub const LEXICAL_COLOR_KEYWORD: u32 = 6;

impl Default for LexicalStyles {
    fn default() -> Self {
        Self {
            default: TokenMetadata::DEFAULT_BASELINE,
            comment: lexical(StandardTokenType::Comment, LEXICAL_COLOR_COMMENT),
            string: lexical(StandardTokenType::String, LEXICAL_COLOR_STRING),
            number: lexical(StandardTokenType::Other, LEXICAL_COLOR_NUMBER),
            keyword: lexical(StandardTokenType::Other, LEXICAL_COLOR_KEYWORD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editor_tokens::{PlainTokenizer, SemanticStyle, TokenRangeOverlay, TokenizedDocument};
    use pretty_assertions::assert_eq;

    fn c_like() -> RegexTokenizer {
        RegexTokenizer::c_like_default(LexicalStyles::default()).unwrap()
    }

    #[test]
    fn test_c_like_line() {
        let tokens = c_like().tokenize_line(0, "let x = 42; // done");
        assert_eq!(tokens.boundaries(), vec![3, 8, 10, 12, 19]);

        let styles = LexicalStyles::default();
        assert_eq!(tokens.metadata(0), styles.keyword);
        assert_eq!(tokens.metadata(1), styles.default);
        assert_eq!(tokens.metadata(2), styles.number);
        assert_eq!(tokens.metadata(4), styles.comment);
        assert_eq!(
            tokens.metadata(4).standard_token_type(),
            Some(StandardTokenType::Comment)
        );
    }

    #[test]
    fn test_earliest_match_wins() {
        let tokenizer = c_like();
        let styles = LexicalStyles::default();

        let tokens = tokenizer.tokenize_line(0, r#""a//b" x"#);
        assert_eq!(tokens.boundaries(), vec![6, 8]);
        assert_eq!(tokens.metadata(0), styles.string);

        let tokens = tokenizer.tokenize_line(0, r#"// "quoted""#);
        assert_eq!(tokens.boundaries(), vec![11]);
        assert_eq!(tokens.metadata(0), styles.comment);
    }

    #[test]
    fn test_rule_order_breaks_ties() {
        let word = TokenMetadata::from_raw(1);
        let abc = TokenMetadata::from_raw(2);
        let tokenizer = RegexTokenizer::new(
            vec![
                RegexRule::new(r"\w+", word).unwrap(),
                RegexRule::new(r"abc", abc).unwrap(),
            ],
            TokenMetadata::DEFAULT_BASELINE,
        );
        assert_eq!(tokenizer.tokenize("abcd"), vec![(0, 4, word)]);
    }

    #[test]
    fn test_offsets_are_characters() {
        let tokens = c_like().tokenize_line(0, "值 = 1");
        assert_eq!(tokens.boundaries(), vec![4, 5]);
    }

    #[test]
    fn test_capture_group_rule() {
        let key = TokenMetadata::from_raw(7);
        let tokenizer = RegexTokenizer::new(
            vec![RegexRule::new(r"^\s*([^=\s]+)\s*=", key).unwrap().with_capture_group(1)],
            TokenMetadata::DEFAULT_BASELINE,
        );
        let tokens = tokenizer.tokenize_line(0, "  name = x");
        assert_eq!(tokens.boundaries(), vec![2, 6, 10]);
        assert_eq!(tokens.metadata(1), key);
        assert!(tokenizer.tokenize_line(0, "").is_empty());
    }

    #[test]
    fn test_json_default() {
        let styles = LexicalStyles::default();
        let tokenizer = RegexTokenizer::json_default(styles).unwrap();
        let spans = tokenizer.tokenize(r#"{"n": 12, "ok": true}"#);
        assert!(spans.contains(&(1, 4, styles.string)));
        assert!(spans.contains(&(6, 8, styles.number)));
        assert!(spans.contains(&(16, 20, styles.keyword)));
    }

    #[test]
    fn test_semantic_tokens_merge_onto_lexical_tokens() {
        let mut doc = TokenizedDocument::new("int value = 3;", c_like());
        let semantic = SemanticStyle::foreground(9).encode().unwrap();
        doc.set_semantic_tokens(vec![
            TokenRangeOverlay::from_raw(0, &[0, 4, 9, semantic.raw()]).unwrap(),
        ])
        .unwrap();

        let tokens = doc.line_tokens(0);
        assert_eq!(tokens.boundaries(), vec![3, 4, 9, 12, 13, 14]);
        assert_eq!(tokens.metadata(2).foreground(), 9);
        assert_eq!(tokens.metadata(4), LexicalStyles::default().number);

        let plain = TokenizedDocument::new("int value = 3;", PlainTokenizer::default());
        assert_eq!(plain.line_tokens(0).boundaries(), vec![14]);
    }
}
