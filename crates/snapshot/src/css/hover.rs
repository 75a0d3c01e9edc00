//! `:hover` → `.\:hover` selector duplication for replay
//!
//! Replay cannot synthesize pointer hover, so every selector using `:hover`
//! gets a twin matching a `:hover` class the player toggles instead.

use super::parser::{parse_rule_list, CssNode};
use regex::Regex;
use std::sync::OnceLock;

fn hover_selector() -> Option<&'static Regex> {
    static HOVER_SELECTOR: OnceLock<Option<Regex>> = OnceLock::new();
    HOVER_SELECTOR
        .get_or_init(|| Regex::new(r"([^\\]):hover").ok())
        .as_ref()
}

/// `a:hover { }` → `a:hover, a.\:hover { }`
///
/// Text that does not parse is returned unchanged.
pub fn add_hover_class(css_text: &str) -> String {
    let Some(hover) = hover_selector() else {
        return css_text.to_string();
    };
    let rules = match parse_rule_list(css_text) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::debug!("[Rebuild] Skipping :hover rewrite: {}", e);
            return css_text.to_string();
        }
    };

    let mut insertions = Vec::new();
    collect_insertions(&rules, css_text, hover, &mut insertions);
    if insertions.is_empty() {
        return css_text.to_string();
    }

    insertions.sort_by_key(|(at, _)| *at);
    let extra: usize = insertions.iter().map(|(_, text)| text.len()).sum();
    let mut out = String::with_capacity(css_text.len() + extra);
    let mut last = 0;
    for (at, text) in insertions {
        out.push_str(&css_text[last..at]);
        out.push_str(&text);
        last = at;
    }
    out.push_str(&css_text[last..]);
    out
}

fn collect_insertions(
    rules: &[CssNode],
    css_text: &str,
    hover: &Regex,
    insertions: &mut Vec<(usize, String)>,
) {
    for rule in rules {
        match rule {
            CssNode::Style(style) => {
                for span in &style.selectors {
                    let selector = &css_text[span.clone()];
                    if hover.is_match(selector) {
                        let twin = hover.replace_all(selector, r"${1}.\:hover");
                        insertions.push((span.end, format!(", {twin}")));
                    }
                }
            }
            CssNode::At(at) => {
                if let Some(nested) = &at.rules {
                    collect_insertions(nested, css_text, hover, insertions);
                }
            }
        }
    }
}
