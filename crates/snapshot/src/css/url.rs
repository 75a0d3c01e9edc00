//! URL rewriting for attributes and stylesheet text

use regex::{Captures, Regex};
use std::sync::OnceLock;
use url::Url;

fn url_in_css() -> Option<&'static Regex> {
    static URL_IN_CSS_REF: OnceLock<Option<Regex>> = OnceLock::new();
    URL_IN_CSS_REF
        .get_or_init(|| Regex::new(r#"url\((?:(')([^']*)'|(")([^"]*)"|([^)]*))\)"#).ok())
        .as_ref()
}

/// Absolute URLs, data URIs and anything else carrying a scheme stay as they are
fn is_absolute(path: &str) -> bool {
    const PREFIXES: [&str; 6] = ["www.", "http://", "https://", "ftp://", "ftps://", "//"];
    if PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }
    // `scheme:` covers data:, blob:, about: and drive letters (`C:\`)
    match path.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn strip_query(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

// input: "http://ex.com/a/b.html?x=1"
// output: Some("http://ex.com")
fn extract_origin(href: &str) -> Option<String> {
    let href = strip_query(href);
    if !href.contains("//") {
        return None;
    }
    Some(href.split('/').take(3).collect::<Vec<_>>().join("/"))
}

fn resolve(path: &str, href: &str) -> Option<String> {
    let origin = extract_origin(href)?;
    if path.starts_with('/') {
        return Some(format!("{origin}{path}"));
    }

    let mut stack: Vec<&str> = strip_query(href).split('/').collect();
    // `scheme:`, ``, `host` are never popped
    if stack.len() > 3 {
        stack.pop();
    }
    for part in path.split('/') {
        match part {
            "." => {}
            ".." => {
                if stack.len() > 3 {
                    stack.pop();
                }
            }
            _ => stack.push(part),
        }
    }
    Some(stack.join("/"))
}

fn quote_for(path: &str) -> &'static str {
    match (path.contains('\''), path.contains('"')) {
        (false, _) => "'",
        (true, false) => "\"",
        (true, true) => "",
    }
}

/// Rewrite every `url(...)` in `css_text` to an absolute URL resolved
/// against `href`.
///
/// Quoted arguments keep their quote character, bare relative ones are
/// emitted single-quoted. Empty arguments and a base that is not itself
/// absolute leave the text untouched. Applying the function twice gives
/// the same result as applying it once.
pub fn absolutize(css_text: &str, href: &str) -> String {
    let Some(re) = url_in_css() else {
        return css_text.to_string();
    };
    re.replace_all(css_text, |caps: &Captures| {
        let original = &caps[0];
        let (quote, path) = if let Some(path) = caps.get(2) {
            ("'", path.as_str())
        } else if let Some(path) = caps.get(4) {
            ("\"", path.as_str())
        } else {
            let bare = caps.get(5).map_or("", |m| m.as_str().trim());
            match unwrap_quotes(bare) {
                Some((quote, inner)) => (quote, inner),
                None => ("", bare),
            }
        };

        if path.is_empty() {
            return original.to_string();
        }
        if is_absolute(path) {
            return format!("url({quote}{path}{quote})");
        }
        match resolve(path, href) {
            Some(resolved) => {
                let quote = if quote.is_empty() { quote_for(&resolved) } else { quote };
                format!("url({quote}{resolved}{quote})")
            }
            None => original.to_string(),
        }
    })
    .into_owned()
}

fn unwrap_quotes(value: &str) -> Option<(&'static str, &str)> {
    for quote in ["'", "\""] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return Some((quote, &value[1..value.len() - 1]));
        }
    }
    None
}

/// Resolve an attribute URL against the document URL
pub fn absolute_to_doc(doc_url: &str, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    Url::parse(doc_url)
        .and_then(|base| base.join(value))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| value.to_string())
}

// input: "a.png 1x, /b.png 2x"
// output: "http://ex.com/a.png 1x, http://ex.com/b.png 2x"
fn absolute_srcset(doc_url: &str, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    value
        .split(',')
        .map(|item| {
            let parts: Vec<&str> = item.trim().split(' ').collect();
            match parts.as_slice() {
                [url, size] => format!("{} {}", absolute_to_doc(doc_url, url), size),
                [url] => absolute_to_doc(doc_url, url),
                _ => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attribute value as it should appear in a snapshot
pub fn transform_attribute(doc_url: &str, name: &str, value: &str) -> String {
    match name {
        "src" => absolute_to_doc(doc_url, value),
        "href" if !value.is_empty() => absolute_to_doc(doc_url, value),
        "srcset" if !value.is_empty() => absolute_srcset(doc_url, value),
        "style" if !value.is_empty() => absolutize(value, doc_url),
        _ => value.to_string(),
    }
}
