//! Serializer and rebuilder configuration

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Class-based element matcher used for blocking and text masking
#[derive(Debug, Clone)]
pub enum BlockClass {
    /// Exact class name
    Name(String),
    /// Pattern tested against every class of the element
    Pattern(Regex),
}

impl BlockClass {
    /// Does any class of a `class` attribute value match?
    pub fn matches_class_list(&self, class_attr: &str) -> bool {
        let mut classes = class_attr.split_whitespace();
        match self {
            BlockClass::Name(name) => classes.any(|class| class == name),
            BlockClass::Pattern(pattern) => classes.any(|class| pattern.is_match(class)),
        }
    }
}

impl From<&str> for BlockClass {
    fn from(name: &str) -> Self {
        BlockClass::Name(name.to_string())
    }
}

impl From<Regex> for BlockClass {
    fn from(pattern: Regex) -> Self {
        BlockClass::Pattern(pattern)
    }
}

/// Which form control values get masked, keyed by input `type` or tag name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaskInputOptions {
    pub color: bool,
    pub date: bool,
    #[serde(rename = "datetime-local")]
    pub datetime_local: bool,
    pub email: bool,
    pub month: bool,
    pub number: bool,
    pub range: bool,
    pub search: bool,
    pub tel: bool,
    pub text: bool,
    pub time: bool,
    pub url: bool,
    pub week: bool,
    pub textarea: bool,
    pub select: bool,
    pub password: bool,
}

impl MaskInputOptions {
    /// Every value-bearing control except `password`, which must be opted into
    pub fn all() -> Self {
        Self {
            color: true,
            date: true,
            datetime_local: true,
            email: true,
            month: true,
            number: true,
            range: true,
            search: true,
            tel: true,
            text: true,
            time: true,
            url: true,
            week: true,
            textarea: true,
            select: true,
            password: false,
        }
    }

    pub fn should_mask(&self, key: &str) -> bool {
        match key {
            "color" => self.color,
            "date" => self.date,
            "datetime-local" => self.datetime_local,
            "email" => self.email,
            "month" => self.month,
            "number" => self.number,
            "range" => self.range,
            "search" => self.search,
            "tel" => self.tel,
            "text" => self.text,
            "time" => self.time,
            "url" => self.url,
            "week" => self.week,
            "textarea" => self.textarea,
            "select" => self.select,
            "password" => self.password,
            _ => false,
        }
    }
}

/// Independent pruning switches for "slim" snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlimDomOptions {
    pub script: bool,
    pub comment: bool,
    pub head_favicon: bool,
    pub head_whitespace: bool,
    pub head_meta_desc_keywords: bool,
    pub head_meta_social: bool,
    pub head_meta_robots: bool,
    pub head_meta_http_equiv: bool,
    pub head_meta_authorship: bool,
    pub head_meta_verification: bool,
}

impl SlimDomOptions {
    /// Drops noise only; description/keywords meta tags are kept
    pub fn sensible() -> Self {
        Self {
            head_meta_desc_keywords: false,
            ..Self::all()
        }
    }

    pub fn all() -> Self {
        Self {
            script: true,
            comment: true,
            head_favicon: true,
            head_whitespace: true,
            head_meta_desc_keywords: true,
            head_meta_social: true,
            head_meta_robots: true,
            head_meta_http_equiv: true,
            head_meta_authorship: true,
            head_meta_verification: true,
        }
    }
}

/// Replacement for masked text content
pub type MaskTextFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
pub struct SerializeOptions {
    pub block_class: BlockClass,
    pub block_selector: Option<String>,
    pub mask_text_class: BlockClass,
    pub mask_text_selector: Option<String>,
    /// Defaults to replacing every non-whitespace character with `*`
    pub mask_text_fn: Option<MaskTextFn>,
    /// Capture linked and script-built stylesheets as `_cssText`
    pub inline_stylesheet: bool,
    pub mask_input: MaskInputOptions,
    pub slim_dom: SlimDomOptions,
    pub record_canvas: bool,
    /// `false` drops whitespace-only text everywhere
    pub preserve_white_space: bool,
    /// Serialize the start node only
    pub skip_child: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            block_class: BlockClass::from("rr-block"),
            block_selector: None,
            mask_text_class: BlockClass::from("rr-mask"),
            mask_text_selector: None,
            mask_text_fn: None,
            inline_stylesheet: true,
            mask_input: MaskInputOptions::default(),
            slim_dom: SlimDomOptions::default(),
            record_canvas: false,
            preserve_white_space: true,
            skip_child: false,
        }
    }
}

impl fmt::Debug for SerializeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeOptions")
            .field("block_class", &self.block_class)
            .field("block_selector", &self.block_selector)
            .field("mask_text_class", &self.mask_text_class)
            .field("mask_text_selector", &self.mask_text_selector)
            .field("mask_text_fn", &self.mask_text_fn.as_ref().map(|_| "Fn"))
            .field("inline_stylesheet", &self.inline_stylesheet)
            .field("mask_input", &self.mask_input)
            .field("slim_dom", &self.slim_dom)
            .field("record_canvas", &self.record_canvas)
            .field("preserve_white_space", &self.preserve_white_space)
            .field("skip_child", &self.skip_child)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RebuildOptions {
    /// Build the start node only
    pub skip_child: bool,
    /// Duplicate `:hover` selectors as `.\:hover` class selectors
    pub hack_css: bool,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            skip_child: false,
            hack_css: true,
        }
    }
}
