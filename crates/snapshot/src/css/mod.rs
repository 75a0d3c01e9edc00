//! Stylesheet helpers

pub mod hover;
pub mod parser;
pub mod url;

pub use self::hover::add_hover_class;
pub use self::url::{absolute_to_doc, absolutize, transform_attribute};

use dom::{CssRule, StyleSheet};

/// Rule text of a loaded sheet with `@import`s replaced by the imported
/// sheet's text. `None` when the rules are not readable.
pub fn stylesheet_text(sheet: &StyleSheet) -> Option<String> {
    let rules = sheet.rules.as_ref()?;
    Some(
        rules
            .iter()
            .map(|rule| match rule {
                CssRule::Style(text) => text.clone(),
                CssRule::Import(imported) => stylesheet_text(imported).unwrap_or_default(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_are_flattened() {
        let imported = StyleSheet::new(None, vec![CssRule::style("b { }")]);
        let blocked = StyleSheet::inaccessible(Some("https://other.com/x.css".to_string()));
        let sheet = StyleSheet::new(
            None,
            vec![
                CssRule::Import(imported),
                CssRule::Import(blocked.clone()),
                CssRule::style("a { }"),
            ],
        );
        assert_eq!(stylesheet_text(&sheet).as_deref(), Some("b { }a { }"));
        assert_eq!(stylesheet_text(&blocked), None);
    }
}
