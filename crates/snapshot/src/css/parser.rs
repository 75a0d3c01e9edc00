//! Minimal CSS rule-list parser
//!
//! Produces the rule structure of a stylesheet with byte spans into the
//! source, so rewrites can be applied to the original text without
//! reformatting it. Declarations are not parsed.

use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),

    #[error("unbalanced braces at byte {0}")]
    UnbalancedBraces(usize),

    #[error("rule without a block at byte {0}")]
    MissingBlock(usize),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// `a, b:hover { color: red }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// One trimmed span per comma-separated selector
    pub selectors: Vec<Range<usize>>,
    /// Between the braces
    pub block: Range<usize>,
}

/// `@media screen { ... }`, `@import "x.css";`, `@font-face { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Lowercased, without the `@`
    pub name: String,
    pub prelude: Range<usize>,
    /// Nested rules of grouping rules (`@media`, `@supports`, ...)
    pub rules: Option<Vec<CssNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssNode {
    Style(StyleRule),
    At(AtRule),
}

// input: "a:hover, b { x: y } @media print { c { } }"
// output: [Style{selectors: [0..7, 9..10]}, At{name: "media", rules: [Style{..}]}]
pub fn parse_rule_list(css: &str) -> Result<Vec<CssNode>> {
    Parser { src: css, pos: 0 }.parse_rules(None)
}

fn is_grouping_rule(name: &str) -> bool {
    matches!(
        name,
        "media" | "supports" | "document" | "-moz-document" | "layer" | "container"
    )
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    /// `open` is the position of the `{` enclosing this list, if any
    fn parse_rules(&mut self, open: Option<usize>) -> Result<Vec<CssNode>> {
        let mut rules = Vec::new();
        loop {
            self.skip_trivia()?;
            match (self.peek(), open) {
                (None, None) => return Ok(rules),
                (None, Some(at)) => return Err(ParseError::UnbalancedBraces(at)),
                (Some(b'}'), Some(_)) => {
                    self.pos += 1;
                    return Ok(rules);
                }
                (Some(b'}'), None) => return Err(ParseError::UnbalancedBraces(self.pos)),
                (Some(b'@'), _) => rules.push(CssNode::At(self.parse_at_rule()?)),
                _ => rules.push(CssNode::Style(self.parse_style_rule()?)),
            }
        }
    }

    fn parse_style_rule(&mut self) -> Result<StyleRule> {
        let start = self.pos;
        let (prelude, terminator) = self.scan_prelude()?;
        if terminator != Some(b'{') {
            return Err(ParseError::MissingBlock(start));
        }
        let selectors = self.split_selectors(prelude);
        let block = self.consume_block()?;
        Ok(StyleRule { selectors, block })
    }

    fn parse_at_rule(&mut self) -> Result<AtRule> {
        self.pos += 1;
        let name_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_ascii_lowercase();
        let (prelude, terminator) = self.scan_prelude()?;
        let prelude = self.trim(prelude);

        let rules = match terminator {
            Some(b';') => {
                self.pos += 1;
                None
            }
            Some(b'{') if is_grouping_rule(&name) => {
                let open = self.pos;
                self.pos += 1;
                Some(self.parse_rules(Some(open))?)
            }
            Some(b'{') => {
                self.consume_block()?;
                None
            }
            // Statement closed by the enclosing block or the end of input
            _ => None,
        };
        Ok(AtRule {
            name,
            prelude,
            rules,
        })
    }

    /// Scan up to a top-level `{`, `;` or `}` (not consumed)
    fn scan_prelude(&mut self) -> Result<(Range<usize>, Option<u8>)> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => self.skip_string(b)?,
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_comment()?,
                b'\\' => self.pos = (self.pos + 2).min(self.src.len()),
                b'(' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'{' | b';' | b'}' if depth == 0 => return Ok((start..self.pos, Some(b))),
                _ => self.pos += 1,
            }
        }
        Ok((start..self.pos, None))
    }

    /// At `{`: consume through the matching `}` and return the inner span
    fn consume_block(&mut self) -> Result<Range<usize>> {
        let open = self.pos;
        self.pos += 1;
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => self.skip_string(b)?,
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_comment()?,
                b'\\' => self.pos = (self.pos + 2).min(self.src.len()),
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(inner_start..self.pos - 1);
                    }
                }
                _ => self.pos += 1,
            }
        }
        Err(ParseError::UnbalancedBraces(open))
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_comment()?,
                // HTML comment markers are allowed between rules
                Some(b'<') if self.src[self.pos..].starts_with("<!--") => self.pos += 4,
                Some(b'-') if self.src[self.pos..].starts_with("-->") => self.pos += 3,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.pos;
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(ParseError::UnterminatedComment(start)),
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(ParseError::UnterminatedString(start))
    }

    fn split_selectors(&self, prelude: Range<usize>) -> Vec<Range<usize>> {
        let bytes = self.src.as_bytes();
        let mut selectors = Vec::new();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut segment_start = prelude.start;
        let mut i = prelude.start;
        while i < prelude.end {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) if b == b'\\' => i += 1,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'\\' => i += 1,
                    b'(' | b'[' => depth += 1,
                    b')' | b']' => depth = depth.saturating_sub(1),
                    b',' if depth == 0 => {
                        selectors.push(self.trim(segment_start..i));
                        segment_start = i + 1;
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        selectors.push(self.trim(segment_start..prelude.end));
        selectors.retain(|span| !span.is_empty());
        selectors
    }

    fn trim(&self, span: Range<usize>) -> Range<usize> {
        let text = &self.src[span.clone()];
        let leading = text.len() - text.trim_start().len();
        let trailing = text.len() - text.trim_end().len();
        if leading == text.len() {
            return span.start..span.start;
        }
        span.start + leading..span.end - trailing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors<'s>(css: &'s str, rule: &CssNode) -> Vec<&'s str> {
        match rule {
            CssNode::Style(style) => style.selectors.iter().map(|s| &css[s.clone()]).collect(),
            CssNode::At(_) => Vec::new(),
        }
    }

    #[test]
    fn test_style_rules() {
        let css = "a:hover , b[title='x,y'] { color: red; }\n.c{}";
        let rules = parse_rule_list(css).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(selectors(css, &rules[0]), vec!["a:hover", "b[title='x,y']"]);
        assert_eq!(selectors(css, &rules[1]), vec![".c"]);
        match &rules[0] {
            CssNode::Style(style) => assert_eq!(&css[style.block.clone()], " color: red; "),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_at_rules() {
        let css = "@import url(x.css);\n@media (max-width: 10px) { a:hover { } }\n@font-face { src: url(f.woff) }";
        let rules = parse_rule_list(css).unwrap();
        assert_eq!(rules.len(), 3);
        match &rules[1] {
            CssNode::At(at) => {
                assert_eq!(at.name, "media");
                assert_eq!(&css[at.prelude.clone()], "(max-width: 10px)");
                let nested = at.rules.as_ref().unwrap();
                assert_eq!(selectors(css, &nested[0]), vec!["a:hover"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&rules[2], CssNode::At(at) if at.name == "font-face" && at.rules.is_none()));
    }

    #[test]
    fn test_comments_and_strings() {
        let css = "/* a { */ b { content: \"}\" } /* c */";
        let rules = parse_rule_list(css).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(selectors(css, &rules[0]), vec!["b"]);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            parse_rule_list("a { color: red"),
            Err(ParseError::UnbalancedBraces(2))
        );
        assert_eq!(parse_rule_list("a {} }"), Err(ParseError::UnbalancedBraces(5)));
        assert_eq!(
            parse_rule_list("/* open"),
            Err(ParseError::UnterminatedComment(0))
        );
        assert!(matches!(
            parse_rule_list("a { content: 'x }"),
            Err(ParseError::UnterminatedString(_))
        ));
        assert_eq!(parse_rule_list("a"), Err(ParseError::MissingBlock(0)));
        assert_eq!(parse_rule_list("@media x { a {}"), Err(ParseError::UnbalancedBraces(9)));
    }
}
