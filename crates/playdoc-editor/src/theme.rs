//! Editor themes: ordered selector maps, override merging and CSS output.

use indexmap::IndexMap;
use playdoc_config::ThemeOverrides;

/// The value stored under a top-level theme selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    /// A single leaf value
    Value(String),
    /// Nested property → value rules
    Rules(IndexMap<String, String>),
}

/// Ordered selector → style map, in the spirit of `EditorView.theme`.
///
/// `&` stands for the editor root; other selectors are scoped beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    selectors: IndexMap<String, StyleValue>,
}

/// Light or dark colour scheme appended after the theme layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Light,
    Dark,
}

impl ThemeVariant {
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            ThemeVariant::Dark
        } else {
            ThemeVariant::Light
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            ThemeVariant::Light => "cm-light",
            ThemeVariant::Dark => "cm-dark",
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// The baseline look of every live editor.
    pub fn editor_default() -> Self {
        Self::new()
            .with_rules(
                "&",
                [("fontSize", "14px"), ("border", "none"), ("outline", "none")],
            )
            .with_rules(".cm-focused", [("outline", "none")])
            .with_rules(".cm-editor", [("borderRadius", "0")])
            .with_rules(
                ".cm-scroller",
                [
                    ("fontFamily", "var(--vp-font-family-mono)"),
                    ("lineHeight", "1.4"),
                    ("overflow", "auto"),
                ],
            )
            .with_rules(".cm-content", [("padding", "16px"), ("minHeight", "100px")])
            .with_rules(".cm-gutters", [("display", "none")])
    }

    /// Set nested rules for a selector, replacing whatever was there.
    pub fn with_rules<'a>(
        mut self,
        selector: &str,
        rules: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let rules = rules
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.selectors
            .insert(selector.to_string(), StyleValue::Rules(rules));
        self
    }

    /// Set a leaf value for a selector, replacing whatever was there.
    pub fn with_value(mut self, selector: &str, value: &str) -> Self {
        self.selectors
            .insert(selector.to_string(), StyleValue::Value(value.to_string()));
        self
    }

    pub fn get(&self, selector: &str) -> Option<&StyleValue> {
        self.selectors.get(selector)
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn selectors(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.selectors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Layer `overrides` onto this theme.
    ///
    /// When both sides hold nested rules for a selector they are merged
    /// property by property with the override winning. Any other pairing
    /// replaces the default value wholesale. Selectors only in the override
    /// are appended in override order.
    pub fn merged(&self, overrides: &Theme) -> Theme {
        let mut result = self.clone();

        for (selector, value) in &overrides.selectors {
            let merged = match (result.selectors.get(selector), value) {
                (Some(StyleValue::Rules(base)), StyleValue::Rules(over)) => {
                    let mut rules = base.clone();
                    for (property, v) in over {
                        rules.insert(property.clone(), v.clone());
                    }
                    StyleValue::Rules(rules)
                }
                _ => value.clone(),
            };
            result.selectors.insert(selector.clone(), merged);
        }

        result
    }

    /// Render the theme as CSS scoped under `scope` (e.g. `#snippet-0`).
    ///
    /// The result is safe to embed in a `<style>` element: `<` is emitted as
    /// the CSS escape `\3c `, so no value can close the element.
    pub fn to_css(&self, scope: &str) -> String {
        let mut css = String::new();

        for (selector, value) in &self.selectors {
            let scoped = scope_selector(selector, scope);
            match value {
                StyleValue::Rules(rules) => {
                    css.push_str(&escape_markup(&scoped));
                    css.push_str(" {");
                    for (property, v) in rules {
                        css.push_str(&format!(
                            " {}: {};",
                            escape_markup(&kebab_case(property)),
                            escape_markup(v)
                        ));
                    }
                    css.push_str(" }\n");
                }
                StyleValue::Value(v) => {
                    css.push_str(&format!(
                        "{} {{ {}: {}; }}\n",
                        escape_markup(scope),
                        escape_markup(&kebab_case(selector)),
                        escape_markup(v)
                    ));
                }
            }
        }

        css
    }
}

impl From<&ThemeOverrides> for Theme {
    fn from(overrides: &ThemeOverrides) -> Self {
        let selectors = overrides
            .iter()
            .map(|(selector, rules)| {
                let rules = rules
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (selector.clone(), StyleValue::Rules(rules))
            })
            .collect();
        Self { selectors }
    }
}

fn scope_selector(selector: &str, scope: &str) -> String {
    if selector.contains('&') {
        selector.replace('&', scope)
    } else {
        format!("{} {}", scope, selector)
    }
}

fn escape_markup(text: &str) -> String {
    text.replace('<', "\\3c ")
}

/// `minHeight` → `min-height`
fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(theme: &Theme, selector: &str) -> IndexMap<String, String> {
        match theme.get(selector) {
            Some(StyleValue::Rules(r)) => r.clone(),
            other => panic!("expected rules for {selector}, got {other:?}"),
        }
    }

    #[test]
    fn test_default_has_six_selectors() {
        let theme = Theme::editor_default();
        let selectors: Vec<_> = theme.selectors().map(|(s, _)| s).collect();
        assert_eq!(
            selectors,
            ["&", ".cm-focused", ".cm-editor", ".cm-scroller", ".cm-content", ".cm-gutters"]
        );
        assert_eq!(rules(&theme, ".cm-content")["padding"], "16px");
    }

    #[test]
    fn test_nested_override_merges_per_property() {
        let over = Theme::new().with_rules(".cm-content", [("padding", "8px"), ("color", "red")]);
        let merged = Theme::editor_default().merged(&over);

        let content = rules(&merged, ".cm-content");
        assert_eq!(content["padding"], "8px");
        assert_eq!(content["minHeight"], "100px");
        assert_eq!(content["color"], "red");
        // Untouched selectors keep their defaults
        assert_eq!(rules(&merged, "&"), rules(&Theme::editor_default(), "&"));
    }

    #[test]
    fn test_leaf_override_replaces_wholesale() {
        let over = Theme::new().with_value(".cm-gutters", "hidden");
        let merged = Theme::editor_default().merged(&over);

        assert_eq!(
            merged.get(".cm-gutters"),
            Some(&StyleValue::Value("hidden".to_string()))
        );
        assert_eq!(rules(&merged, ".cm-content")["padding"], "16px");
    }

    #[test]
    fn test_rules_replace_default_leaf() {
        let base = Theme::new().with_value("&", "plain");
        let over = Theme::new().with_rules("&", [("color", "blue")]);
        assert_eq!(rules(&base.merged(&over), "&")["color"], "blue");
    }

    #[test]
    fn test_new_selectors_are_appended() {
        let over = Theme::new().with_rules(".cm-cursor", [("borderLeftColor", "white")]);
        let merged = Theme::editor_default().merged(&over);
        assert_eq!(merged.selectors().last().map(|(s, _)| s), Some(".cm-cursor"));
    }

    #[test]
    fn test_to_css_scopes_and_kebabs() {
        let theme = Theme::new()
            .with_rules("&", [("fontSize", "14px")])
            .with_rules("&.cm-focused", [("outline", "none")])
            .with_rules(".cm-content", [("minHeight", "100px")]);

        let css = theme.to_css("#snippet-0");
        assert_eq!(
            css,
            "#snippet-0 { font-size: 14px; }\n\
             #snippet-0.cm-focused { outline: none; }\n\
             #snippet-0 .cm-content { min-height: 100px; }\n"
        );
    }

    #[test]
    fn test_to_css_cannot_close_style_element() {
        let theme = Theme::new()
            .with_rules(".cm-content", [("color", "red</style><script>alert(1)</script>")])
            .with_value("<b>", "x");

        let css = theme.to_css("#snippet-0");
        assert!(!css.contains('<'));
        assert!(css.contains("color: red\\3c /style>\\3c script>"));
    }

    #[test]
    fn test_from_config_overrides() {
        let mut overrides = ThemeOverrides::new();
        overrides.insert(
            ".cm-content".to_string(),
            [("padding".to_string(), "0".to_string())].into_iter().collect(),
        );
        let theme = Theme::from(&overrides);
        assert_eq!(rules(&theme, ".cm-content")["padding"], "0");
    }
}
