//! Rebuilder - snapshot → live tree

use crate::css::add_hover_class;
use crate::error::{Result, SnapshotError};
use crate::host::{LiveKind, TreeBuilder};
use crate::options::RebuildOptions;
use crate::session::{IdNodeMap, Session};
use crate::types::{
    is_synthetic_attribute, Attributes, SerializedNode, SerializedNodeWithId, CSS_TEXT_ATTR,
    IGNORED_NODE,
};
use dom::{SVG_NAMESPACE, XLINK_NAMESPACE};

/// DOM spelling of a serialized (lowercased) tag
fn restore_tag_name<'t>(tag_name: &'t str, attributes: &Attributes) -> &'t str {
    let tag = match tag_name {
        "script" => "noscript",
        "altglyph" => "altGlyph",
        "altglyphdef" => "altGlyphDef",
        "altglyphitem" => "altGlyphItem",
        "animatecolor" => "animateColor",
        "animatemotion" => "animateMotion",
        "animatetransform" => "animateTransform",
        "clippath" => "clipPath",
        "feblend" => "feBlend",
        "fecolormatrix" => "feColorMatrix",
        "fecomponenttransfer" => "feComponentTransfer",
        "fecomposite" => "feComposite",
        "feconvolvematrix" => "feConvolveMatrix",
        "fediffuselighting" => "feDiffuseLighting",
        "fedisplacementmap" => "feDisplacementMap",
        "fedistantlight" => "feDistantLight",
        "fedropshadow" => "feDropShadow",
        "feflood" => "feFlood",
        "fefunca" => "feFuncA",
        "fefuncb" => "feFuncB",
        "fefuncg" => "feFuncG",
        "fefuncr" => "feFuncR",
        "fegaussianblur" => "feGaussianBlur",
        "feimage" => "feImage",
        "femerge" => "feMerge",
        "femergenode" => "feMergeNode",
        "femorphology" => "feMorphology",
        "feoffset" => "feOffset",
        "fepointlight" => "fePointLight",
        "fespecularlighting" => "feSpecularLighting",
        "fespotlight" => "feSpotLight",
        "fetile" => "feTile",
        "feturbulence" => "feTurbulence",
        "foreignobject" => "foreignObject",
        "glyphref" => "glyphRef",
        "lineargradient" => "linearGradient",
        "radialgradient" => "radialGradient",
        other => other,
    };
    if tag == "link" && attributes.contains(CSS_TEXT_ATTR) {
        return "style";
    }
    tag
}

pub struct Rebuilder<'a, B: TreeBuilder> {
    tree: &'a mut B,
    session: &'a mut Session<B::Node>,
    options: RebuildOptions,
    map: IdNodeMap<B::Node>,
    on_visit: Option<Box<dyn FnMut(B::Node) + 'a>>,
}

impl<'a, B: TreeBuilder> Rebuilder<'a, B> {
    pub fn new(tree: &'a mut B, session: &'a mut Session<B::Node>, options: RebuildOptions) -> Self {
        Self {
            tree,
            session,
            options,
            map: IdNodeMap::default(),
            on_visit: None,
        }
    }

    /// Called once per constructed node, after its children are attached
    pub fn on_visit(mut self, callback: impl FnMut(B::Node) + 'a) -> Self {
        self.on_visit = Some(Box::new(callback));
        self
    }

    /// Build `sn` into `doc`. A serialized Document reuses `doc` itself.
    ///
    /// Fails only when `doc` is not a document node.
    pub fn build(&mut self, sn: &SerializedNodeWithId, doc: B::Node) -> Result<Option<B::Node>> {
        if self.tree.kind(doc) != Some(LiveKind::Document) {
            return Err(SnapshotError::NotADocument);
        }
        Ok(self.build_with_sn(sn, doc, true))
    }

    pub fn finish(self) -> IdNodeMap<B::Node> {
        self.map
    }

    fn build_with_sn(&mut self, sn: &SerializedNodeWithId, doc: B::Node, is_root: bool) -> Option<B::Node> {
        let node = match &sn.node {
            SerializedNode::Document { .. } if is_root => {
                if let Err(e) = self.tree.open_document(doc) {
                    tracing::warn!("[Rebuild] Failed to open document: {}", e);
                    return None;
                }
                doc
            }
            _ => self.build_node(sn),
        };

        self.session.bind(&*self.tree, node, sn.id);
        self.session.observe(sn.id);
        self.map.insert(sn.id, node);

        if !self.options.skip_child {
            let child_doc = match sn.node {
                SerializedNode::Document { .. } => node,
                _ => doc,
            };
            for child in sn.node.child_nodes() {
                if child.id == IGNORED_NODE {
                    continue;
                }
                let Some(child_node) = self.build_with_sn(child, child_doc, false) else {
                    tracing::warn!("[Rebuild] Failed to rebuild node {}", child.id);
                    continue;
                };
                if let Err(e) = self.tree.append_child(node, child_node) {
                    tracing::warn!("[Rebuild] Failed to attach node {}: {}", child.id, e);
                }
            }
        }

        if let Some(callback) = self.on_visit.as_mut() {
            callback(node);
        }
        Some(node)
    }

    fn build_node(&mut self, sn: &SerializedNodeWithId) -> B::Node {
        let hack_css = self.options.hack_css;
        match &sn.node {
            SerializedNode::Document { .. } => self.tree.create_document(),
            SerializedNode::DocumentType {
                name,
                public_id,
                system_id,
            } => self.tree.create_doctype(name, public_id, system_id),
            SerializedNode::Element {
                tag_name,
                attributes,
                is_svg,
                ..
            } => self.build_element(tag_name, attributes, *is_svg),
            SerializedNode::Text {
                text_content,
                is_style,
            } => {
                if *is_style && hack_css {
                    self.tree.create_text(&add_hover_class(text_content))
                } else {
                    self.tree.create_text(text_content)
                }
            }
            SerializedNode::Cdata { text_content } => self.tree.create_cdata(text_content),
            SerializedNode::Comment { text_content } => self.tree.create_comment(text_content),
        }
    }

    fn build_element(&mut self, tag_name: &str, attributes: &Attributes, is_svg: bool) -> B::Node {
        let tag = restore_tag_name(tag_name, attributes);
        let node = if is_svg {
            self.tree.create_element_ns(SVG_NAMESPACE, tag)
        } else {
            self.tree.create_element(tag)
        };

        for (name, value) in attributes.iter() {
            let is_textarea = tag == "textarea" && name == "value";
            let is_css_text = tag == "style" && name == CSS_TEXT_ATTR;
            if is_textarea || is_css_text {
                let mut text = value.to_attribute_string();
                if is_css_text && self.options.hack_css {
                    text = add_hover_class(&text);
                }
                self.replace_text(node, &text);
                continue;
            }
            if is_synthetic_attribute(name) || (tag == "iframe" && name == "src") {
                continue;
            }

            let value = value.to_attribute_string();
            let applied = if is_svg && name == "xlink:href" {
                self.tree.set_attribute_ns(node, XLINK_NAMESPACE, name, &value)
            } else {
                self.tree.set_attribute(node, name, &value)
            };
            if let Err(e) = applied {
                tracing::debug!("[Rebuild] Skipping attribute {:?} on <{}>: {}", name, tag, e);
            }
        }

        for (hint, property) in [("rr_width", "width"), ("rr_height", "height")] {
            if let Some(value) = attributes.get_str(hint) {
                if let Err(e) = self.tree.set_style_property(node, property, value) {
                    tracing::debug!("[Rebuild] Failed to restyle <{}>: {}", tag, e);
                }
            }
        }
        node
    }

    fn replace_text(&mut self, node: B::Node, text: &str) {
        let child = self.tree.create_text(text);
        let result = self
            .tree
            .remove_text_children(node)
            .and_then(|()| self.tree.append_child(node, child));
        if let Err(e) = result {
            tracing::debug!("[Rebuild] Failed to set text content: {}", e);
        }
    }
}

/// Rebuild a snapshot into `doc` with a fresh id index
pub fn rebuild<B: TreeBuilder>(
    sn: &SerializedNodeWithId,
    doc: B::Node,
    tree: &mut B,
    session: &mut Session<B::Node>,
    options: RebuildOptions,
) -> Result<(Option<B::Node>, IdNodeMap<B::Node>)> {
    let mut rebuilder = Rebuilder::new(tree, session, options);
    let root = rebuilder.build(sn, doc)?;
    Ok((root, rebuilder.finish()))
}
