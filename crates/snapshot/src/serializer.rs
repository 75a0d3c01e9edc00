//! Serializer - live tree → snapshot
//!
//! Walks a live tree depth-first and produces one [`SerializedNodeWithId`]
//! per kept node:
//!
//! ```text
//! live node → serialize_node (kind, attributes, captured state)
//!           → id: reuse binding | IGNORED (pruned) | fresh
//!           → children (unless blocked), iframe document appended last
//! ```

use crate::css::{self, absolutize, transform_attribute};
use crate::filter;
use crate::host::{LiveKind, LiveTree};
use crate::options::SerializeOptions;
use crate::session::{IdNodeMap, Session};
use crate::types::{
    Attributes, Id, SerializedNode, SerializedNodeWithId, CSS_TEXT_ATTR, IGNORED_NODE,
};
use dom::DomRect;

/// Replaces the text of every `<script>` element
pub const SCRIPT_PLACEHOLDER: &str = "SCRIPT_PLACEHOLDER";

/// Per-subtree walk state
#[derive(Debug, Clone, Copy)]
struct WalkContext<N> {
    /// Document the node belongs to; URLs resolve against it
    doc: N,
    preserve_white_space: bool,
    /// Id of the enclosing nested document
    root_id: Option<Id>,
}

pub struct Serializer<'a, T: LiveTree> {
    tree: &'a T,
    session: &'a mut Session<T::Node>,
    options: &'a SerializeOptions,
    map: IdNodeMap<T::Node>,
    on_visit: Option<Box<dyn FnMut(T::Node) + 'a>>,
}

impl<'a, T: LiveTree> Serializer<'a, T> {
    pub fn new(
        tree: &'a T,
        session: &'a mut Session<T::Node>,
        options: &'a SerializeOptions,
    ) -> Self {
        Self {
            tree,
            session,
            options,
            map: IdNodeMap::default(),
            on_visit: None,
        }
    }

    /// Called once for every node that receives a (non-ignored) id
    pub fn on_visit(mut self, callback: impl FnMut(T::Node) + 'a) -> Self {
        self.on_visit = Some(Box::new(callback));
        self
    }

    /// Serialize `node` and its subtree. `doc` is the document `node`
    /// belongs to. `None` when the node was pruned or is not serializable.
    pub fn serialize(&mut self, node: T::Node, doc: T::Node) -> Option<SerializedNodeWithId> {
        let ctx = WalkContext {
            doc,
            preserve_white_space: self.options.preserve_white_space,
            root_id: None,
        };
        self.serialize_with_id(node, ctx)
    }

    /// Id → live node index of everything serialized so far
    pub fn finish(self) -> IdNodeMap<T::Node> {
        self.map
    }

    fn serialize_with_id(
        &mut self,
        node: T::Node,
        ctx: WalkContext<T::Node>,
    ) -> Option<SerializedNodeWithId> {
        let Some(mut serialized) = self.serialize_node(node, &ctx) else {
            tracing::warn!("[Serializer] Node {:?} not serialized", node);
            return None;
        };

        let id = match self.session.id_of(self.tree, node) {
            Some(id) => id,
            None if self.is_excluded(&serialized, &ctx) => IGNORED_NODE,
            None => self.session.next_id(),
        };
        self.session.bind(self.tree, node, id);
        if id == IGNORED_NODE {
            return None;
        }
        self.map.insert(id, node);
        if let Some(callback) = self.on_visit.as_mut() {
            callback(node);
        }

        let record_child = !self.options.skip_child && !serialized.needs_blocking();
        if record_child {
            let children = self.serialize_children(node, id, &serialized, ctx);
            if let Some(child_nodes) = serialized.child_nodes_mut() {
                *child_nodes = children;
            }
        }

        Some(SerializedNodeWithId {
            node: serialized,
            id,
            root_id: ctx.root_id,
        })
    }

    fn serialize_children(
        &mut self,
        node: T::Node,
        id: Id,
        serialized: &SerializedNode,
        ctx: WalkContext<T::Node>,
    ) -> Vec<SerializedNodeWithId> {
        let mut child_ctx = ctx;
        match serialized {
            SerializedNode::Document { .. } if node != ctx.doc => {
                // nested document: everything below belongs to it
                child_ctx.doc = node;
                child_ctx.root_id = Some(id);
            }
            SerializedNode::Element { tag_name, .. }
                if tag_name == "head" && self.options.slim_dom.head_whitespace =>
            {
                child_ctx.preserve_white_space = false;
            }
            _ => {}
        }

        let mut children: Vec<SerializedNodeWithId> = self
            .tree
            .children(node)
            .into_iter()
            .filter_map(|child| self.serialize_with_id(child, child_ctx))
            .collect();

        if serialized.tag_name() == Some("iframe") {
            if let Some(content) = self.tree.content_document(node) {
                let nested_ctx = WalkContext {
                    preserve_white_space: self.options.preserve_white_space,
                    ..ctx
                };
                children.extend(self.serialize_with_id(content, nested_ctx));
            }
        }
        children
    }

    fn is_excluded(&self, serialized: &SerializedNode, ctx: &WalkContext<T::Node>) -> bool {
        filter::slim_dom_excluded(serialized, &self.options.slim_dom)
            || (!ctx.preserve_white_space && serialized.is_blank_text())
    }

    fn serialize_node(&self, node: T::Node, ctx: &WalkContext<T::Node>) -> Option<SerializedNode> {
        let serialized = match self.tree.kind(node)? {
            LiveKind::Document => SerializedNode::Document {
                child_nodes: Vec::new(),
            },
            LiveKind::DocumentType {
                name,
                public_id,
                system_id,
            } => SerializedNode::DocumentType {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            LiveKind::Element { tag_name, is_svg } => {
                self.serialize_element(node, tag_name, is_svg, ctx)
            }
            LiveKind::Text(text) => self.serialize_text(node, text, ctx),
            LiveKind::Cdata(_) => SerializedNode::Cdata {
                text_content: String::new(),
            },
            LiveKind::Comment(text) => SerializedNode::Comment {
                text_content: text.to_string(),
            },
            LiveKind::Other => return None,
        };
        Some(serialized)
    }

    fn serialize_element(
        &self,
        node: T::Node,
        raw_tag: &str,
        is_svg: bool,
        ctx: &WalkContext<T::Node>,
    ) -> SerializedNode {
        let tree = self.tree;
        let options = self.options;
        let tag_name = valid_tag_name(raw_tag);
        let doc_url = tree.document_url(ctx.doc).unwrap_or_default();
        let need_block = filter::is_blocked(tree, node, options);

        let mut attributes: Attributes = tree
            .attributes(node)
            .into_iter()
            .map(|(name, value)| (name, transform_attribute(doc_url, name, value)))
            .collect();

        match tag_name.as_str() {
            "link" if options.inline_stylesheet && is_stylesheet_link(&attributes) => {
                let href = attributes.get_str("href").unwrap_or_default();
                let captured = tree
                    .style_sheets(ctx.doc)
                    .iter()
                    .find(|sheet| sheet.href.as_deref() == Some(href))
                    .and_then(|sheet| {
                        let text = css::stylesheet_text(sheet).filter(|t| !t.is_empty())?;
                        Some(absolutize(&text, sheet.href.as_deref().unwrap_or(doc_url)))
                    });
                if let Some(css_text) = captured {
                    attributes.remove("rel");
                    attributes.remove("href");
                    attributes.insert(CSS_TEXT_ATTR, css_text);
                }
            }
            "style" if options.inline_stylesheet => {
                let captured = tree
                    .element_sheet(node)
                    .filter(|_| tree.text_content(node).trim().is_empty())
                    .and_then(css::stylesheet_text)
                    .filter(|t| !t.is_empty());
                if let Some(css_text) = captured {
                    attributes.insert(CSS_TEXT_ATTR, absolutize(&css_text, doc_url));
                }
            }
            "input" | "textarea" | "select" => self.capture_form_value(node, &tag_name, &mut attributes),
            "option" => {
                let parent_value = tree.parent(node).and_then(|p| tree.form_value(p));
                let matches_parent = parent_value.is_some()
                    && attributes.get_str("value") == parent_value;
                if matches_parent {
                    attributes.insert("selected", true);
                }
            }
            "canvas" if options.record_canvas => {
                if let Some(data_url) = tree.canvas_data_url(node) {
                    attributes.insert("rr_dataURL", data_url);
                }
            }
            "audio" | "video" => {
                let state = if tree.media_paused(node) { "paused" } else { "played" };
                attributes.insert("rr_mediaState", state);
            }
            "iframe" => {
                attributes.remove("src");
            }
            _ => {}
        }

        let (scroll_left, scroll_top) = tree.scroll_offsets(node);
        if scroll_left != 0.0 {
            attributes.insert("rr_scrollLeft", scroll_left);
        }
        if scroll_top != 0.0 {
            attributes.insert("rr_scrollTop", scroll_top);
        }
        if need_block {
            let rect = tree.bounding_rect(node).unwrap_or_else(DomRect::zero);
            attributes.insert("rr_width", format!("{}px", rect.width));
            attributes.insert("rr_height", format!("{}px", rect.height));
        }

        SerializedNode::Element {
            is_svg: is_svg || tag_name == "svg",
            tag_name,
            attributes,
            child_nodes: Vec::new(),
            need_block,
        }
    }

    fn capture_form_value(&self, node: T::Node, tag_name: &str, attributes: &mut Attributes) {
        let input_type = attributes.get_str("type").map(str::to_string);
        let checkable = matches!(
            input_type.as_deref(),
            Some("radio" | "checkbox" | "submit" | "button")
        );
        let value = self.tree.form_value(node).unwrap_or_default();

        if !checkable && !value.is_empty() {
            let mask = &self.options.mask_input;
            let masked = input_type.as_deref().is_some_and(|t| mask.should_mask(t))
                || mask.should_mask(tag_name);
            let value = if masked {
                "*".repeat(value.chars().count())
            } else {
                value.to_string()
            };
            attributes.insert("value", value);
        } else if self.tree.is_checked(node) {
            attributes.insert("checked", true);
        }
    }

    fn serialize_text(&self, node: T::Node, text: &str, ctx: &WalkContext<T::Node>) -> SerializedNode {
        let parent_tag = self
            .tree
            .parent(node)
            .and_then(|parent| self.tree.tag_name(parent));
        let is_style = parent_tag.is_some_and(|tag| tag.eq_ignore_ascii_case("style"));
        let is_script = parent_tag.is_some_and(|tag| tag.eq_ignore_ascii_case("script"));

        let text_content = if is_style {
            absolutize(text, self.tree.document_url(ctx.doc).unwrap_or_default())
        } else if is_script {
            SCRIPT_PLACEHOLDER.to_string()
        } else if filter::needs_text_mask(self.tree, node, self.options) {
            filter::mask_text(text, self.options)
        } else {
            text.to_string()
        };
        SerializedNode::Text {
            text_content,
            is_style,
        }
    }
}

fn is_stylesheet_link(attributes: &Attributes) -> bool {
    attributes
        .get_str("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case("stylesheet")))
}

/// Lowercased tag, or `div` when it contains anything outside `[a-z1-6_-]`
fn valid_tag_name(tag_name: &str) -> String {
    let processed = tag_name.trim().to_ascii_lowercase();
    let valid = processed
        .chars()
        .all(|c| c.is_ascii_lowercase() || matches!(c, '1'..='6' | '_' | '-'));
    if valid {
        processed
    } else {
        "div".to_string()
    }
}

/// Serialize a whole document with a fresh id index
pub fn snapshot<T: LiveTree>(
    tree: &T,
    document: T::Node,
    session: &mut Session<T::Node>,
    options: &SerializeOptions,
) -> (Option<SerializedNodeWithId>, IdNodeMap<T::Node>) {
    let mut serializer = Serializer::new(tree, session, options);
    let root = serializer.serialize(document, document);
    (root, serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;
    use dom::{CssRule, DomArena, StyleSheet};

    fn page() -> (DomArena, u32, u32) {
        let mut arena = DomArena::new();
        let doc = arena.create_document("https://example.com/app/index.html");
        let html = arena.create_element("html");
        let body = arena.create_element("body");
        arena.append_child(doc, html).unwrap();
        arena.append_child(html, body).unwrap();
        (arena, doc, body)
    }

    fn element_attrs(sn: &SerializedNodeWithId) -> &Attributes {
        sn.node.attributes().unwrap()
    }

    #[test]
    fn test_valid_tag_name() {
        assert_eq!(valid_tag_name(" DIV "), "div");
        assert_eq!(valid_tag_name("h1"), "h1");
        assert_eq!(valid_tag_name("my-widget"), "my-widget");
        assert_eq!(valid_tag_name("h7"), "div");
        assert_eq!(valid_tag_name("ns:tag"), "div");
    }

    #[test]
    fn test_attribute_urls_resolved() {
        let (mut arena, doc, body) = page();
        let img = arena.create_element("img");
        arena.append_child(body, img).unwrap();
        arena.set_attribute(img, "src", "../img/a.png").unwrap();
        arena.set_attribute(img, "style", "background:url(bg.png)").unwrap();
        arena.set_attribute(img, "alt", "a.png").unwrap();

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let mut serializer = Serializer::new(&arena, &mut session, &options);
        let sn = serializer.serialize(img, doc).unwrap();
        let attrs = element_attrs(&sn);
        assert_eq!(attrs.get_str("src"), Some("https://example.com/img/a.png"));
        assert_eq!(
            attrs.get_str("style"),
            Some("background:url('https://example.com/app/bg.png')")
        );
        assert_eq!(attrs.get_str("alt"), Some("a.png"));
    }

    #[test]
    fn test_linked_stylesheet_inlined() {
        let (mut arena, doc, body) = page();
        let link = arena.create_element("link");
        arena.append_child(body, link).unwrap();
        arena.set_attribute(link, "rel", "stylesheet").unwrap();
        arena.set_attribute(link, "href", "css/site.css").unwrap();
        arena
            .add_style_sheet(
                doc,
                StyleSheet::new(
                    Some("https://example.com/app/css/site.css".to_string()),
                    vec![CssRule::style("a { background: url(x.png); }")],
                ),
            )
            .unwrap();

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let sn = Serializer::new(&arena, &mut session, &options)
            .serialize(link, doc)
            .unwrap();
        let attrs = element_attrs(&sn);
        assert!(!attrs.contains("rel") && !attrs.contains("href"));
        assert_eq!(
            attrs.get_str(CSS_TEXT_ATTR),
            Some("a { background: url('https://example.com/app/css/x.png'); }")
        );

        let options = SerializeOptions {
            inline_stylesheet: false,
            ..Default::default()
        };
        let sn = Serializer::new(&arena, &mut session, &options)
            .serialize(link, doc)
            .unwrap();
        assert_eq!(element_attrs(&sn).get_str("rel"), Some("stylesheet"));
    }

    #[test]
    fn test_inaccessible_stylesheet_not_inlined() {
        let (mut arena, doc, body) = page();
        let link = arena.create_element("link");
        arena.append_child(body, link).unwrap();
        arena.set_attribute(link, "rel", "stylesheet").unwrap();
        arena.set_attribute(link, "href", "https://cdn.other.com/x.css").unwrap();
        arena
            .add_style_sheet(
                doc,
                StyleSheet::inaccessible(Some("https://cdn.other.com/x.css".to_string())),
            )
            .unwrap();

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let sn = Serializer::new(&arena, &mut session, &options)
            .serialize(link, doc)
            .unwrap();
        let attrs = element_attrs(&sn);
        assert!(!attrs.contains(CSS_TEXT_ATTR));
        assert_eq!(attrs.get_str("href"), Some("https://cdn.other.com/x.css"));
    }

    #[test]
    fn test_dynamic_style_element_captured() {
        let (mut arena, doc, body) = page();
        let style = arena.create_element("style");
        arena.append_child(body, style).unwrap();
        arena.element_state_mut(style).unwrap().sheet =
            Some(StyleSheet::new(None, vec![CssRule::style("p { color: red; }")]));

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let sn = Serializer::new(&arena, &mut session, &options)
            .serialize(style, doc)
            .unwrap();
        assert_eq!(
            element_attrs(&sn).get_str(CSS_TEXT_ATTR),
            Some("p { color: red; }")
        );
    }

    #[test]
    fn test_form_values_and_masking() {
        let (mut arena, doc, body) = page();
        let text = arena.create_element("input");
        let password = arena.create_element("input");
        let checkbox = arena.create_element("input");
        for input in [text, password, checkbox] {
            arena.append_child(body, input).unwrap();
        }
        arena.set_attribute(text, "type", "text").unwrap();
        arena.set_attribute(password, "type", "password").unwrap();
        arena.set_attribute(checkbox, "type", "checkbox").unwrap();
        arena.element_state_mut(text).unwrap().value = Some("héllo".to_string());
        arena.element_state_mut(password).unwrap().value = Some("hunter2".to_string());
        let state = arena.element_state_mut(checkbox).unwrap();
        state.value = Some("on".to_string());
        state.checked = true;

        let mut session = Session::new();
        let options = SerializeOptions {
            mask_input: crate::options::MaskInputOptions::all(),
            ..Default::default()
        };
        let mut serializer = Serializer::new(&arena, &mut session, &options);
        let text_sn = serializer.serialize(text, doc).unwrap();
        let password_sn = serializer.serialize(password, doc).unwrap();
        let checkbox_sn = serializer.serialize(checkbox, doc).unwrap();

        assert_eq!(element_attrs(&text_sn).get_str("value"), Some("*****"));
        assert_eq!(element_attrs(&password_sn).get_str("value"), Some("hunter2"));
        assert_eq!(
            element_attrs(&checkbox_sn).get("checked"),
            Some(&AttributeValue::Bool(true))
        );
        assert!(!element_attrs(&checkbox_sn).contains("value"));
    }

    #[test]
    fn test_option_selected_follows_select_value() {
        let (mut arena, doc, body) = page();
        let select = arena.create_element("select");
        let a = arena.create_element("option");
        let b = arena.create_element("option");
        arena.append_child(body, select).unwrap();
        arena.append_child(select, a).unwrap();
        arena.append_child(select, b).unwrap();
        arena.set_attribute(a, "value", "a").unwrap();
        arena.set_attribute(b, "value", "b").unwrap();
        arena.element_state_mut(select).unwrap().value = Some("b".to_string());

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let sn = Serializer::new(&arena, &mut session, &options)
            .serialize(select, doc)
            .unwrap();
        let options_sn = sn.node.child_nodes();
        assert!(!element_attrs(&options_sn[0]).contains("selected"));
        assert_eq!(
            element_attrs(&options_sn[1]).get("selected"),
            Some(&AttributeValue::Bool(true))
        );
        assert_eq!(element_attrs(&sn).get_str("value"), Some("b"));
    }

    #[test]
    fn test_runtime_state_attributes() {
        let (mut arena, doc, body) = page();
        let canvas = arena.create_element("canvas");
        let video = arena.create_element("video");
        let scroller = arena.create_element("div");
        for el in [canvas, video, scroller] {
            arena.append_child(body, el).unwrap();
        }
        arena.element_state_mut(canvas).unwrap().canvas_data_url =
            Some("data:image/png;base64,AAAA".to_string());
        arena.element_state_mut(video).unwrap().media_paused = Some(false);
        arena.element_state_mut(scroller).unwrap().scroll_top = 120.0;

        let mut session = Session::new();
        let options = SerializeOptions::default();
        let mut serializer = Serializer::new(&arena, &mut session, &options);
        let canvas_sn = serializer.serialize(canvas, doc).unwrap();
        let video_sn = serializer.serialize(video, doc).unwrap();
        let scroller_sn = serializer.serialize(scroller, doc).unwrap();
        assert!(!element_attrs(&canvas_sn).contains("rr_dataURL"));
        assert_eq!(element_attrs(&video_sn).get_str("rr_mediaState"), Some("played"));
        assert_eq!(
            element_attrs(&scroller_sn).get("rr_scrollTop"),
            Some(&AttributeValue::Number(120.0))
        );
        assert!(!element_attrs(&scroller_sn).contains("rr_scrollLeft"));

        let options = SerializeOptions {
            record_canvas: true,
            ..Default::default()
        };
        let mut session = Session::new();
        let canvas_sn = Serializer::new(&arena, &mut session, &options)
            .serialize(canvas, doc)
            .unwrap();
        assert_eq!(
            element_attrs(&canvas_sn).get_str("rr_dataURL"),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn test_on_visit_sees_every_kept_node() {
        let (mut arena, doc, body) = page();
        let comment = arena.create_comment("x");
        arena.append_child(body, comment).unwrap();

        let mut visited = Vec::new();
        let mut session = Session::new();
        let options = SerializeOptions {
            slim_dom: crate::options::SlimDomOptions::sensible(),
            ..Default::default()
        };
        let map = {
            let mut serializer =
                Serializer::new(&arena, &mut session, &options).on_visit(|n| visited.push(n));
            serializer.serialize(doc, doc);
            serializer.finish()
        };
        assert_eq!(visited.len(), 3);
        assert_eq!(map.len(), 3);
        assert!(!visited.contains(&comment));
    }

    #[test]
    fn test_other_nodes_are_skipped() {
        let (mut arena, doc, body) = page();
        let pi = arena.create_processing_instruction("xml-stylesheet", "href=a.css");
        let p = arena.create_element("p");
        arena.append_child(body, pi).unwrap();
        arena.append_child(body, p).unwrap();

        let mut session = Session::new();
        let (sn, _) = snapshot(&arena, doc, &mut session, &SerializeOptions::default());
        let sn = sn.unwrap();
        let html = &sn.node.child_nodes()[0];
        let body_sn = &html.node.child_nodes()[0];
        assert_eq!(body_sn.node.child_nodes().len(), 1);
        assert_eq!(body_sn.node.child_nodes()[0].node.tag_name(), Some("p"));
    }
}
