//! Host tree seam
//!
//! The codec reads live trees through [`LiveTree`] and builds them through
//! [`TreeBuilder`]. `dom::DomArena` implements both.

use dom::{DomArena, DomRect, NodeData, NodeId, StyleSheet};
use std::fmt::Debug;
use std::hash::Hash;

/// What a live node is, borrowed from the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveKind<'a> {
    Document,
    DocumentType {
        name: &'a str,
        public_id: &'a str,
        system_id: &'a str,
    },
    Element {
        tag_name: &'a str,
        is_svg: bool,
    },
    Text(&'a str),
    Cdata(&'a str),
    Comment(&'a str),
    /// Anything the snapshot format has no case for
    Other,
}

/// Read access to a live document tree
pub trait LiveTree {
    /// Stable node handle
    type Node: Copy + Eq + Hash + Debug;

    /// Identity of this tree, distinct from every other live tree in the process
    fn tree_id(&self) -> u64;

    /// `None` when the handle does not name a node
    fn kind(&self, node: Self::Node) -> Option<LiveKind<'_>>;
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn attributes(&self, node: Self::Node) -> Vec<(&str, &str)>;

    fn document_url(&self, doc: Self::Node) -> Option<&str>;
    /// Stylesheets loaded by a document
    fn style_sheets(&self, doc: Self::Node) -> &[StyleSheet];
    /// Sheet attached to a `<style>` element
    fn element_sheet(&self, node: Self::Node) -> Option<&StyleSheet>;

    /// Current value of a form control
    fn form_value(&self, node: Self::Node) -> Option<&str>;
    fn is_checked(&self, node: Self::Node) -> bool;
    /// `(scroll_left, scroll_top)`
    fn scroll_offsets(&self, node: Self::Node) -> (f64, f64);
    fn bounding_rect(&self, node: Self::Node) -> Option<DomRect>;
    fn canvas_data_url(&self, node: Self::Node) -> Option<&str>;
    fn media_paused(&self, node: Self::Node) -> bool;
    /// Nested document of an iframe, if reachable
    fn content_document(&self, node: Self::Node) -> Option<Self::Node>;
    fn matches_selector(&self, node: Self::Node, selector: &str) -> bool;

    fn tag_name(&self, node: Self::Node) -> Option<&str> {
        match self.kind(node)? {
            LiveKind::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str> {
        self.attributes(node)
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Concatenated descendant text
    fn text_content(&self, node: Self::Node) -> String {
        let mut text = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match self.kind(current) {
                Some(LiveKind::Text(value)) | Some(LiveKind::Cdata(value)) => text.push_str(value),
                _ => stack.extend(self.children(current).into_iter().rev()),
            }
        }
        text
    }
}

/// Construction access to a live document tree
pub trait TreeBuilder: LiveTree {
    /// Reset a document to empty before rebuilding into it
    fn open_document(&mut self, doc: Self::Node) -> dom::Result<()>;

    fn create_document(&mut self) -> Self::Node;
    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> Self::Node;
    fn create_element(&mut self, tag_name: &str) -> Self::Node;
    fn create_element_ns(&mut self, namespace: &str, tag_name: &str) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn create_cdata(&mut self, text: &str) -> Self::Node;
    fn create_comment(&mut self, text: &str) -> Self::Node;

    fn append_child(&mut self, parent: Self::Node, child: Self::Node) -> dom::Result<()>;
    fn remove_text_children(&mut self, node: Self::Node) -> dom::Result<()>;
    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> dom::Result<()>;
    fn set_attribute_ns(
        &mut self,
        node: Self::Node,
        namespace: &str,
        name: &str,
        value: &str,
    ) -> dom::Result<()>;
    fn set_style_property(&mut self, node: Self::Node, property: &str, value: &str) -> dom::Result<()>;
}

impl LiveTree for DomArena {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> Option<LiveKind<'_>> {
        let kind = match &self.get(node).ok()?.data {
            NodeData::Document(_) => LiveKind::Document,
            NodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => LiveKind::DocumentType {
                name,
                public_id,
                system_id,
            },
            NodeData::Element(el) => LiveKind::Element {
                tag_name: &el.tag_name,
                is_svg: el.is_svg(),
            },
            NodeData::Text(text) => LiveKind::Text(text),
            NodeData::CdataSection(text) => LiveKind::Cdata(text),
            NodeData::Comment(text) => LiveKind::Comment(text),
            NodeData::Other { .. } => LiveKind::Other,
        };
        Some(kind)
    }

    fn tree_id(&self) -> u64 {
        self.arena_id()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.child_ids(node).to_vec()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).ok()?.parent_id
    }

    fn attributes(&self, node: NodeId) -> Vec<(&str, &str)> {
        self.get(node)
            .ok()
            .and_then(|n| n.element())
            .map(|el| {
                el.attributes
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn document_url(&self, doc: NodeId) -> Option<&str> {
        self.get(doc).ok()?.document().map(|d| d.url.as_str())
    }

    fn style_sheets(&self, doc: NodeId) -> &[StyleSheet] {
        self.get(doc)
            .ok()
            .and_then(|n| n.document())
            .map(|d| d.style_sheets.as_slice())
            .unwrap_or(&[])
    }

    fn element_sheet(&self, node: NodeId) -> Option<&StyleSheet> {
        self.element_state(node)?.sheet.as_ref()
    }

    fn form_value(&self, node: NodeId) -> Option<&str> {
        self.element_state(node)?.value.as_deref()
    }

    fn is_checked(&self, node: NodeId) -> bool {
        self.element_state(node).is_some_and(|s| s.checked)
    }

    fn scroll_offsets(&self, node: NodeId) -> (f64, f64) {
        self.element_state(node)
            .map(|s| (s.scroll_left, s.scroll_top))
            .unwrap_or((0.0, 0.0))
    }

    fn bounding_rect(&self, node: NodeId) -> Option<DomRect> {
        self.element_state(node)?.bounds
    }

    fn canvas_data_url(&self, node: NodeId) -> Option<&str> {
        self.element_state(node)?.canvas_data_url.as_deref()
    }

    fn media_paused(&self, node: NodeId) -> bool {
        self.element_state(node)
            .and_then(|s| s.media_paused)
            .unwrap_or(true)
    }

    fn content_document(&self, node: NodeId) -> Option<NodeId> {
        self.element_state(node)?.content_document
    }

    fn matches_selector(&self, node: NodeId, selector: &str) -> bool {
        dom::selector::matches(self, node, selector)
    }
}

impl TreeBuilder for DomArena {
    fn open_document(&mut self, doc: NodeId) -> dom::Result<()> {
        DomArena::open_document(self, doc)
    }

    fn create_document(&mut self) -> NodeId {
        DomArena::create_document(self, "about:blank")
    }

    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        DomArena::create_doctype(self, name, public_id, system_id)
    }

    fn create_element(&mut self, tag_name: &str) -> NodeId {
        DomArena::create_element(self, tag_name)
    }

    fn create_element_ns(&mut self, namespace: &str, tag_name: &str) -> NodeId {
        DomArena::create_element_ns(self, namespace, tag_name)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        DomArena::create_text(self, text)
    }

    fn create_cdata(&mut self, text: &str) -> NodeId {
        DomArena::create_cdata(self, text)
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        DomArena::create_comment(self, text)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<()> {
        DomArena::append_child(self, parent, child)
    }

    fn remove_text_children(&mut self, node: NodeId) -> dom::Result<()> {
        let texts: Vec<NodeId> = self
            .child_ids(node)
            .iter()
            .copied()
            .filter(|&child| self.get(child).is_ok_and(|c| c.is_text()))
            .collect();
        for child in texts {
            self.remove_child(node, child)?;
        }
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> dom::Result<()> {
        DomArena::set_attribute(self, node, name, value)
    }

    fn set_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: &str,
        name: &str,
        value: &str,
    ) -> dom::Result<()> {
        DomArena::set_attribute_ns(self, node, namespace, name, value)
    }

    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) -> dom::Result<()> {
        DomArena::set_style_property(self, node, property, value)
    }
}
