//! Semantic token legend and styling.
//!
//! A server reports semantic tokens as `(tokenType, tokenModifiers)` indices into the legend it
//! announced during `initialize`. [`SemanticTokensStyling`] resolves those indices to overlay
//! metadata through a [`SemanticStylingConfig`] theme.

use std::collections::{BTreeMap, HashMap};

use editor_tokens::{SemanticStyle, TokenMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LspSemanticTokensError;

/// Semantic tokens legend returned by the server during `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokensLegend {
    /// Token type names, indexed by `token_type` in `semanticTokens` data.
    pub token_types: Vec<String>,
    /// Token modifier names, indexed by bit position in `token_modifiers`.
    pub token_modifiers: Vec<String>,
}

impl SemanticTokensLegend {
    /// Parse a `SemanticTokensLegend` JSON object.
    pub fn from_json(value: &Value) -> Result<Self, LspSemanticTokensError> {
        Ok(Self::deserialize(value)?)
    }

    /// Read the legend from the `capabilities` object of an `initialize` result.
    ///
    /// Returns `None` when the server does not provide semantic tokens.
    pub fn from_capabilities(capabilities: &Value) -> Option<Self> {
        let legend = capabilities.get("semanticTokensProvider")?.get("legend")?;
        match Self::from_json(legend) {
            Ok(legend) => Some(legend),
            Err(err) => {
                log::debug!("semantic tokens: ignoring malformed legend: {err}");
                None
            }
        }
    }
}

/// How tokens matching one selector are painted. Unset fields leave the lexical value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemanticStyleRule {
    /// Foreground color index.
    pub foreground: Option<u32>,
    /// Background color index.
    pub background: Option<u32>,
    /// Bold on/off.
    pub bold: Option<bool>,
    /// Italic on/off.
    pub italic: Option<bool>,
    /// Underline on/off.
    pub underline: Option<bool>,
}

impl SemanticStyleRule {
    /// `other` layered on top of `self`.
    pub fn merged(self, other: &SemanticStyleRule) -> SemanticStyleRule {
        SemanticStyleRule {
            foreground: other.foreground.or(self.foreground),
            background: other.background.or(self.background),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
        }
    }

    /// The rule as a [`SemanticStyle`].
    pub fn to_style(self) -> SemanticStyle {
        SemanticStyle {
            foreground: self.foreground,
            background: self.background,
            italic: self.italic,
            bold: self.bold,
            underline: self.underline,
        }
    }
}

/// Theme for semantic tokens.
///
/// Selectors are `"type"`, `"type.modifier"` or `"*.modifier"`. A token starts from its type
/// rule; every modifier it carries then layers `"*.modifier"` and `"type.modifier"` on top, in
/// legend order.
///
/// ```json
/// {
///   "rules": {
///     "variable": { "foreground": 5 },
///     "variable.readonly": { "foreground": 6 },
///     "*.deprecated": { "underline": true }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticStylingConfig {
    /// Rules by selector.
    #[serde(default)]
    pub rules: BTreeMap<String, SemanticStyleRule>,
}

impl SemanticStylingConfig {
    /// Parse and validate a config.
    pub fn from_json_str(json: &str) -> Result<Self, LspSemanticTokensError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every rule fits the token metadata.
    pub fn validate(&self) -> Result<(), LspSemanticTokensError> {
        for (selector, rule) in &self.rules {
            rule.to_style()
                .encode()
                .map_err(|source| LspSemanticTokensError::InvalidRule {
                    selector: selector.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Add or replace a rule.
    pub fn with_rule(mut self, selector: impl Into<String>, rule: SemanticStyleRule) -> Self {
        self.rules.insert(selector.into(), rule);
        self
    }
}

/// Resolves `(tokenType, tokenModifiers)` pairs to overlay metadata.
#[derive(Debug, Clone)]
pub struct SemanticTokensStyling {
    legend: SemanticTokensLegend,
    config: SemanticStylingConfig,
    cache: HashMap<(u32, u32), Option<TokenMetadata>>,
}

impl SemanticTokensStyling {
    /// Create a resolver for one server legend.
    pub fn new(legend: SemanticTokensLegend, config: SemanticStylingConfig) -> Self {
        Self {
            legend,
            config,
            cache: HashMap::new(),
        }
    }

    /// The legend.
    pub fn legend(&self) -> &SemanticTokensLegend {
        &self.legend
    }

    /// The theme.
    pub fn config(&self) -> &SemanticStylingConfig {
        &self.config
    }

    /// Swap the theme, dropping cached resolutions.
    pub fn set_config(&mut self, config: SemanticStylingConfig) {
        self.config = config;
        self.cache.clear();
    }

    /// Overlay metadata for a token, or `None` if the token should not be painted (unknown type
    /// or no matching rule).
    pub fn metadata_for(&mut self, token_type: u32, token_modifiers: u32) -> Option<TokenMetadata> {
        if let Some(cached) = self.cache.get(&(token_type, token_modifiers)) {
            return *cached;
        }
        let resolved = self.resolve(token_type, token_modifiers);
        self.cache.insert((token_type, token_modifiers), resolved);
        resolved
    }

    fn resolve(&self, token_type: u32, token_modifiers: u32) -> Option<TokenMetadata> {
        let Some(type_name) = self.legend.token_types.get(token_type as usize) else {
            log::debug!("semantic tokens: token type {token_type} is not in the legend");
            return None;
        };

        let mut matched = false;
        let mut rule = SemanticStyleRule::default();
        if let Some(type_rule) = self.config.rules.get(type_name) {
            rule = rule.merged(type_rule);
            matched = true;
        }

        for (bit, modifier) in self.legend.token_modifiers.iter().enumerate().take(32) {
            if token_modifiers & (1u32 << bit) == 0 {
                continue;
            }
            for selector in [format!("*.{modifier}"), format!("{type_name}.{modifier}")] {
                if let Some(modifier_rule) = self.config.rules.get(&selector) {
                    rule = rule.merged(modifier_rule);
                    matched = true;
                }
            }
        }

        let style = rule.to_style();
        if !matched || style.is_empty() {
            return None;
        }
        match style.encode() {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                log::debug!("semantic tokens: cannot encode style for '{type_name}': {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn legend() -> SemanticTokensLegend {
        SemanticTokensLegend {
            token_types: vec!["variable".into(), "function".into(), "comment".into()],
            token_modifiers: vec!["readonly".into(), "deprecated".into()],
        }
    }

    fn config() -> SemanticStylingConfig {
        SemanticStylingConfig::from_json_str(
            r#"{
                "rules": {
                    "variable": { "foreground": 5 },
                    "function": { "foreground": 7, "bold": true },
                    "variable.readonly": { "foreground": 6 },
                    "*.deprecated": { "underline": true }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_legend_from_capabilities() {
        let capabilities = json!({
            "semanticTokensProvider": {
                "legend": {
                    "tokenTypes": ["variable", "function"],
                    "tokenModifiers": ["readonly"]
                },
                "range": true
            }
        });
        let legend = SemanticTokensLegend::from_capabilities(&capabilities).unwrap();
        assert_eq!(legend.token_types, vec!["variable", "function"]);
        assert_eq!(legend.token_modifiers, vec!["readonly"]);

        assert!(SemanticTokensLegend::from_capabilities(&json!({})).is_none());
        assert!(
            SemanticTokensLegend::from_capabilities(
                &json!({ "semanticTokensProvider": { "legend": { "tokenTypes": 3 } } })
            )
            .is_none()
        );
    }

    #[test]
    fn test_type_rule() {
        let mut styling = SemanticTokensStyling::new(legend(), config());
        let metadata = styling.metadata_for(0, 0).unwrap();
        assert_eq!(metadata, SemanticStyle::foreground(5).encode().unwrap());

        let function = styling.metadata_for(1, 0).unwrap();
        assert_eq!(function.foreground(), 7);
        assert!(function.font_style().contains(editor_tokens::FontStyle::BOLD));
    }

    #[test]
    fn test_modifier_rules_layer_on_type_rule() {
        let mut styling = SemanticTokensStyling::new(legend(), config());

        let readonly = styling.metadata_for(0, 0b01).unwrap();
        assert_eq!(readonly.foreground(), 6);

        let both = styling.metadata_for(0, 0b11).unwrap();
        assert_eq!(both.foreground(), 6);
        assert!(
            both.semantic_overrides()
                .contains(editor_tokens::SemanticOverrides::UNDERLINE)
        );

        // Only the wildcard modifier rule matches.
        let deprecated_comment = styling.metadata_for(2, 0b10).unwrap();
        assert_eq!(
            deprecated_comment.semantic_overrides(),
            editor_tokens::SemanticOverrides::UNDERLINE
        );
    }

    #[test]
    fn test_unmatched_tokens_are_not_painted() {
        let mut styling = SemanticTokensStyling::new(legend(), config());
        assert_eq!(styling.metadata_for(2, 0), None);
        assert_eq!(styling.metadata_for(9, 0), None);
        // Modifier bits past the legend are ignored.
        assert_eq!(
            styling.metadata_for(0, 0b100),
            styling.metadata_for(0, 0)
        );
    }

    #[test]
    fn test_set_config_drops_cache() {
        let mut styling = SemanticTokensStyling::new(legend(), config());
        assert_eq!(styling.metadata_for(0, 0).unwrap().foreground(), 5);
        styling.set_config(SemanticStylingConfig::default().with_rule(
            "variable",
            SemanticStyleRule {
                foreground: Some(9),
                ..SemanticStyleRule::default()
            },
        ));
        assert_eq!(styling.metadata_for(0, 0).unwrap().foreground(), 9);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            SemanticStylingConfig::from_json_str(r#"{ "rules": { "x": { "colour": 1 } } }"#),
            Err(LspSemanticTokensError::Config(_))
        ));
        assert!(matches!(
            SemanticStylingConfig::from_json_str(r#"{ "rules": { "x": { "foreground": 4096 } } }"#),
            Err(LspSemanticTokensError::InvalidRule { ref selector, .. }) if selector == "x"
        ));
    }
}
