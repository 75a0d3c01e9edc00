//! Minimal selector matching
//!
//! Supports selector lists of compound selectors: `tag`, `*`, `#id`,
//! `.class`, `[attr]` and `[attr=value]`. Combinators are not supported;
//! a selector using one never matches.

use crate::arena::DomArena;
use crate::types::{ElementData, NodeId};

#[derive(Debug, PartialEq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attr(String, Option<String>),
}

/// Does the element match any selector of the comma-separated list?
pub fn matches(arena: &DomArena, node_id: NodeId, selector_list: &str) -> bool {
    let Some(element) = arena.get(node_id).ok().and_then(|node| node.element()) else {
        return false;
    };
    selector_list
        .split(',')
        .filter_map(parse_compound)
        .any(|compound| compound.iter().all(|simple| matches_simple(element, simple)))
}

fn matches_simple(element: &ElementData, simple: &Simple) -> bool {
    match simple {
        Simple::Universal => true,
        Simple::Type(tag) => element.tag_name.eq_ignore_ascii_case(tag),
        Simple::Id(id) => element.attr("id") == Some(id.as_str()),
        Simple::Class(class) => element
            .attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
        Simple::Attr(name, None) => element.attr(name).is_some(),
        Simple::Attr(name, Some(value)) => element.attr(name) == Some(value.as_str()),
    }
}

// input: "input.secret[type=password]"
// output: [Type("input"), Class("secret"), Attr("type", Some("password"))]
fn parse_compound(input: &str) -> Option<Vec<Simple>> {
    let s = input.trim();
    if s.is_empty() || s.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~')) {
        return None;
    }

    let mut parts = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let (simple, tail) = match rest.as_bytes()[0] {
            b'*' => (Simple::Universal, &rest[1..]),
            b'#' => {
                let (name, tail) = take_ident(&rest[1..]);
                (Simple::Id(name.to_string()), tail)
            }
            b'.' => {
                let (name, tail) = take_ident(&rest[1..]);
                (Simple::Class(name.to_string()), tail)
            }
            b'[' => {
                let end = rest.find(']')?;
                let inner = &rest[1..end];
                let simple = match inner.split_once('=') {
                    Some((name, value)) => Simple::Attr(
                        name.trim().to_string(),
                        Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                    ),
                    None => Simple::Attr(inner.trim().to_string(), None),
                };
                (simple, &rest[end + 1..])
            }
            _ => {
                let (name, tail) = take_ident(rest);
                (Simple::Type(name.to_string()), tail)
            }
        };
        // An empty identifier means an unsupported construct (e.g. `:hover`)
        if tail.len() == rest.len()
            || matches!(&simple, Simple::Type(n) | Simple::Id(n) | Simple::Class(n) if n.is_empty())
        {
            return None;
        }
        parts.push(simple);
        rest = tail;
    }
    Some(parts)
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(input.len());
    input.split_at(end)
}
