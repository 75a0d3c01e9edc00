//! Pruning, blocking and masking predicates

use crate::host::{LiveKind, LiveTree};
use crate::options::{SerializeOptions, SlimDomOptions};
use crate::types::{Attributes, SerializedNode};

fn lower(attributes: &Attributes, name: &str) -> String {
    attributes
        .get_str(name)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Is the serialized node noise under the given slim-DOM switches?
pub fn slim_dom_excluded(sn: &SerializedNode, options: &SlimDomOptions) -> bool {
    match sn {
        SerializedNode::Comment { .. } => options.comment,
        SerializedNode::Element {
            tag_name,
            attributes,
            ..
        } => element_excluded(tag_name, attributes, options),
        _ => false,
    }
}

fn element_excluded(tag: &str, attributes: &Attributes, options: &SlimDomOptions) -> bool {
    if options.script && is_script(tag, attributes) {
        return true;
    }
    if options.head_favicon && is_favicon(tag, attributes) {
        return true;
    }
    if tag != "meta" {
        return false;
    }

    let name = lower(attributes, "name");
    let property = lower(attributes, "property");
    (options.head_meta_desc_keywords && is_desc_keywords_meta(&name))
        || (options.head_meta_social && is_social_meta(&name, &property))
        || (options.head_meta_robots && matches!(name.as_str(), "robots" | "googlebot" | "bingbot"))
        || (options.head_meta_http_equiv && attributes.contains("http-equiv"))
        || (options.head_meta_authorship && is_authorship_meta(&name, &property))
        || (options.head_meta_verification && is_verification_meta(&name))
}

fn is_script(tag: &str, attributes: &Attributes) -> bool {
    tag == "script"
        || (tag == "link"
            && attributes.get_str("rel") == Some("preload")
            && attributes.get_str("as") == Some("script"))
}

fn is_favicon(tag: &str, attributes: &Attributes) -> bool {
    match tag {
        "link" => attributes.get_str("rel") == Some("shortcut icon"),
        "meta" => {
            let name = lower(attributes, "name");
            let rel = lower(attributes, "rel");
            matches!(
                name.as_str(),
                "msapplication-tileimage" | "msapplication-tilecolor" | "application-name"
            ) || matches!(rel.as_str(), "icon" | "apple-touch-icon" | "shortcut icon")
        }
        _ => false,
    }
}

/// Prefix match on "description", suffix match on "keywords"
/// (`description-long`, `news_keywords` and the like)
fn is_desc_keywords_meta(name: &str) -> bool {
    name.starts_with("description") || name.ends_with("keywords")
}

fn is_social_meta(name: &str, property: &str) -> bool {
    ["og:", "twitter:", "fb:"].iter().any(|p| property.starts_with(p))
        || ["og:", "twitter:"].iter().any(|p| name.starts_with(p))
        || name == "pinterest"
}

fn is_authorship_meta(name: &str, property: &str) -> bool {
    matches!(
        name,
        "author" | "generator" | "framework" | "publisher" | "progid"
    ) || property.starts_with("article:")
        || property.starts_with("product:")
}

fn is_verification_meta(name: &str) -> bool {
    matches!(
        name,
        "google-site-verification"
            | "yandex-verification"
            | "csrf-token"
            | "p:domain_verify"
            | "verify-v1"
            | "verification"
            | "shopify-checkout-api-token"
    )
}

/// Should the element's content be redacted?
pub fn is_blocked<T: LiveTree>(tree: &T, node: T::Node, options: &SerializeOptions) -> bool {
    let by_class = tree
        .attribute(node, "class")
        .is_some_and(|classes| options.block_class.matches_class_list(classes));
    by_class
        || options
            .block_selector
            .as_deref()
            .is_some_and(|selector| tree.matches_selector(node, selector))
}

/// Does the text node sit inside an element marked for text masking?
pub fn needs_text_mask<T: LiveTree>(tree: &T, text: T::Node, options: &SerializeOptions) -> bool {
    let mut current = tree.parent(text);
    while let Some(node) = current {
        if let Some(LiveKind::Element { .. }) = tree.kind(node) {
            let by_class = tree
                .attribute(node, "class")
                .is_some_and(|classes| options.mask_text_class.matches_class_list(classes));
            let by_selector = options
                .mask_text_selector
                .as_deref()
                .is_some_and(|selector| tree.matches_selector(node, selector));
            if by_class || by_selector {
                return true;
            }
        }
        current = tree.parent(node);
    }
    false
}

pub fn mask_text(text: &str, options: &SerializeOptions) -> String {
    match &options.mask_text_fn {
        Some(mask) => mask(text),
        None => text
            .chars()
            .map(|c| if c.is_whitespace() { c } else { '*' })
            .collect(),
    }
}
