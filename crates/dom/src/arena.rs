//! Arena-backed live document
//!
//! ```text
//! nodes: Vec<DomNode>      [doc][html][head][body]...
//!                            0     1     2     3     ← NodeId
//! backend ids: AHashMap<u32, NodeId>   (CDP backendNodeId → slot)
//! ```
//!
//! Slots are never reused: a removed node only loses its parent link and
//! stays addressable, like a detached node in a browser.

use crate::error::{DomError, Result};
use crate::types::{
    DocumentData, DomNode, ElementData, ElementState, NodeData, NodeId, NodeType,
    StyleSheet,
};
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

fn next_arena_id() -> u64 {
    NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct DomArena {
    /// Process-unique, renewed by [`DomArena::clear`]
    arena_id: u64,
    nodes: Vec<DomNode>,
    /// CDP backendNodeId → slot
    backend_id_map: AHashMap<u32, NodeId>,
    root_id: Option<NodeId>,
}

impl DomArena {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena_id: next_arena_id(),
            nodes: Vec::with_capacity(capacity),
            backend_id_map: AHashMap::default(),
            root_id: None,
        }
    }

    pub fn arena_id(&self) -> u64 {
        self.arena_id
    }

    /// Store a node built elsewhere (CDP parsing); its `node_id` is overwritten
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let slot = self.nodes.len() as NodeId;
        node.node_id = slot;
        if let Some(backend_id) = node.backend_node_id {
            self.backend_id_map.insert(backend_id, slot);
        }
        self.nodes.push(node);
        slot
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.add_node(DomNode::new(0, data))
    }

    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_by_backend_id(&self, backend_id: u32) -> Result<&DomNode> {
        match self.backend_id_map.get(&backend_id) {
            Some(&slot) => self.get(slot),
            None => Err(DomError::NodeNotFound(backend_id)),
        }
    }

    /// Mark the top-level document
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children in document order; empty for unknown ids
    pub fn child_ids(&self, node_id: NodeId) -> &[NodeId] {
        match self.nodes.get(node_id as usize) {
            Some(node) => &node.children_ids,
            None => &[],
        }
    }

    /// Pre-order walk of `start` and everything below it. Content documents
    /// of iframes are not entered.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        Descendants {
            arena: self,
            stack: vec![start],
        }
    }

    /// Text of every descendant text and CDATA node, in order
    pub fn text_content(&self, node_id: NodeId) -> String {
        self.descendants(node_id)
            .filter_map(|id| match &self.get(id).ok()?.data {
                NodeData::Text(value) | NodeData::CdataSection(value) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    // ---- creation -------------------------------------------------------

    pub fn create_document(&mut self, url: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Document(DocumentData {
            url: url.into(),
            style_sheets: Vec::new(),
        }))
    }

    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.alloc(NodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    /// HTML element; the tag is stored lowercase
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(
            tag_name.to_ascii_lowercase(),
            None,
        )))
    }

    /// Namespaced element; the tag keeps its spelling
    pub fn create_element_ns(&mut self, namespace: &str, tag_name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(
            tag_name.to_string(),
            Some(namespace.to_string()),
        )))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_cdata(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::CdataSection(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.alloc(NodeData::Other {
            node_type: NodeType::ProcessingInstruction,
            name: target.to_string(),
            value: data.to_string(),
        })
    }

    // ---- mutation -------------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it first.
    ///
    /// A Document appended to an element becomes that element's content
    /// document (iframe) instead of a regular child.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let hierarchy_error = || DomError::HierarchyRequest { parent, child };
        let parent_node = self.get(parent)?;
        let child_node = self.get(child)?;

        if child_node.is_document() {
            if !parent_node.is_element() {
                return Err(hierarchy_error());
            }
            return self.set_content_document(parent, child);
        }
        if !matches!(
            parent_node.data,
            NodeData::Document(_) | NodeData::Element(_)
        ) {
            return Err(hierarchy_error());
        }
        if self.is_inclusive_ancestor(child, parent)? {
            return Err(hierarchy_error());
        }

        self.detach(child)?;
        self.get_mut(parent)?.children_ids.push(child);
        self.get_mut(child)?.parent_id = Some(parent);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.get(child)?.parent_id != Some(parent) {
            return Err(DomError::NodeNotFound(child));
        }
        self.detach(child)
    }

    /// Walks parent links upward, through iframe hosts into outer documents
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.get(id)?.parent_id;
        }
        Ok(false)
    }

    fn detach(&mut self, node_id: NodeId) -> Result<()> {
        if let Some(parent_id) = self.get_mut(node_id)?.parent_id.take() {
            let parent = self.get_mut(parent_id)?;
            parent.children_ids.retain(|id| *id != node_id);
            if let Some(state) = parent.element_mut().and_then(|el| el.state.as_mut()) {
                if state.content_document == Some(node_id) {
                    state.content_document = None;
                }
            }
        }
        Ok(())
    }

    /// Reset a document to an empty state (document.open())
    pub fn open_document(&mut self, doc: NodeId) -> Result<()> {
        let node = self.get_mut(doc)?;
        match &mut node.data {
            NodeData::Document(data) => data.style_sheets.clear(),
            other => {
                return Err(DomError::InvalidNodeType {
                    expected: "Document".to_string(),
                    actual: format!("{:?}", other.node_type()),
                });
            }
        }
        let children = std::mem::take(&mut node.children_ids);
        for child in children {
            self.get_mut(child)?.parent_id = None;
        }
        Ok(())
    }

    pub fn set_content_document(&mut self, iframe: NodeId, doc: NodeId) -> Result<()> {
        // a document may not end up framed inside itself
        if !self.get(doc)?.is_document() || self.is_inclusive_ancestor(doc, iframe)? {
            return Err(DomError::HierarchyRequest {
                parent: iframe,
                child: doc,
            });
        }
        self.detach(doc)?;
        self.element_state_mut(iframe)?.content_document = Some(doc);
        self.get_mut(doc)?.parent_id = Some(iframe);
        Ok(())
    }

    /// Set (or replace) an attribute. Names must be valid XML names.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<()> {
        if !is_valid_attribute_name(name) {
            return Err(DomError::InvalidAttributeName(name.to_string()));
        }
        let el = self.element_mut(element)?;
        match el.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Namespaced attribute. The arena keeps only the qualified name.
    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        _namespace: &str,
        name: &str,
        value: &str,
    ) -> Result<()> {
        self.set_attribute(element, name, value)
    }

    pub fn set_style_property(&mut self, element: NodeId, property: &str, value: &str) -> Result<()> {
        let style = &mut self.element_state_mut(element)?.style;
        match style.iter_mut().find(|(key, _)| key == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => style.push((property.to_string(), value.to_string())),
        }
        Ok(())
    }

    // ---- live state -----------------------------------------------------

    fn element_mut(&mut self, element: NodeId) -> Result<&mut ElementData> {
        let node = self.get_mut(element)?;
        let actual = node.node_type();
        node.element_mut().ok_or_else(|| DomError::InvalidNodeType {
            expected: "Element".to_string(),
            actual: format!("{actual:?}"),
        })
    }

    /// Runtime state of an element (form values, scroll, geometry...)
    pub fn element_state(&self, element: NodeId) -> Option<&ElementState> {
        self.nodes.get(element as usize)?.state()
    }

    pub fn element_state_mut(&mut self, element: NodeId) -> Result<&mut ElementState> {
        Ok(self.element_mut(element)?.state_mut())
    }

    /// Register a loaded stylesheet on a document
    pub fn add_style_sheet(&mut self, doc: NodeId, sheet: StyleSheet) -> Result<()> {
        let node = self.get_mut(doc)?;
        match &mut node.data {
            NodeData::Document(data) => {
                data.style_sheets.push(sheet);
                Ok(())
            }
            other => Err(DomError::InvalidNodeType {
                expected: "Document".to_string(),
                actual: format!("{:?}", other.node_type()),
            }),
        }
    }

    /// Clear arena (reuse allocation). Slots restart at 0, so the arena
    /// takes a fresh identity.
    pub fn clear(&mut self) {
        self.arena_id = next_arena_id();
        self.nodes.clear();
        self.backend_id_map.clear();
        self.root_id = None;
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

/// XML `Name` production, restricted to what attribute setters accept
fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_alphabetic() || first == '_' || first == ':';
    start_ok
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | ':' | '\u{B7}'))
}

pub struct Descendants<'a> {
    arena: &'a DomArena,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.arena.child_ids(id).iter().rev().copied());
        Some(id)
    }
}
