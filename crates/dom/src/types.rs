//! Node payloads and the runtime state attached to them
//!
//! Markup lives in `NodeData`; everything a page changes after parsing
//! (form values, scroll, geometry, attached sheets) lives in `ElementState`,
//! allocated only for elements that have any.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Slot in the arena
pub type NodeId = u32;

/// Ordered attribute list. Most elements carry fewer than four.
pub type AttributeList = SmallVec<[(String, String); 4]>;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Node type numbering of the DOM standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            2 => Some(NodeType::Attribute),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CdataSection),
            5 => Some(NodeType::EntityReference),
            6 => Some(NodeType::Entity),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            12 => Some(NodeType::Notation),
            _ => None,
        }
    }
}

/// Border box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// A rule inside a loaded stylesheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CssRule {
    /// Any non-import rule, as its serialized `cssText`
    Style(String),
    /// `@import` pointing at another loaded sheet
    Import(StyleSheet),
}

impl CssRule {
    /// Shorthand for a plain rule
    pub fn style(text: impl Into<String>) -> Self {
        CssRule::Style(text.into())
    }
}

/// A loaded stylesheet as the page sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub href: Option<String>,
    /// `None` when the rules cannot be read (cross-origin sheet)
    pub rules: Option<Vec<CssRule>>,
}

impl StyleSheet {
    pub fn new(href: Option<String>, rules: Vec<CssRule>) -> Self {
        Self {
            href,
            rules: Some(rules),
        }
    }

    /// Sheet whose rules are not readable from script
    pub fn inaccessible(href: Option<String>) -> Self {
        Self { href, rules: None }
    }
}

/// Runtime state of an element that is not reflected in its attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    /// Current value of a form control
    pub value: Option<String>,
    pub checked: bool,
    pub selected: bool,
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub bounds: Option<DomRect>,
    /// Raster snapshot of a canvas element
    pub canvas_data_url: Option<String>,
    /// Play state of audio/video elements
    pub media_paused: Option<bool>,
    /// Sheet attached to a `<style>` element
    pub sheet: Option<StyleSheet>,
    /// Inline style properties set through the style API
    pub style: SmallVec<[(String, String); 2]>,
    /// Nested document of an iframe
    pub content_document: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    pub url: String,
    pub style_sheets: Vec<StyleSheet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    pub tag_name: String,
    pub namespace: Option<String>,
    pub attributes: AttributeList,
    pub state: Option<Box<ElementState>>,
}

impl ElementData {
    pub fn new(tag_name: String, namespace: Option<String>) -> Self {
        Self {
            tag_name,
            namespace,
            attributes: SmallVec::new(),
            state: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_svg(&self) -> bool {
        self.namespace.as_deref() == Some(SVG_NAMESPACE)
    }

    /// Lazily allocated runtime state
    pub fn state_mut(&mut self) -> &mut ElementState {
        self.state.get_or_insert_with(Default::default)
    }
}

/// Per-kind node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Document(DocumentData),
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(ElementData),
    Text(String),
    CdataSection(String),
    Comment(String),
    /// Processing instructions, fragments and anything else the tree can hold
    Other {
        node_type: NodeType,
        name: String,
        value: String,
    },
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Document(_) => NodeType::Document,
            NodeData::DocumentType { .. } => NodeType::DocumentType,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::CdataSection(_) => NodeType::CdataSection,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::Other { node_type, .. } => *node_type,
        }
    }
}

/// The main DOM tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    /// CDP backend id when the node came from a browser
    pub backend_node_id: Option<u32>,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>, // Most nodes have <4 children

    pub data: NodeData,
}

impl DomNode {
    pub fn new(node_id: NodeId, data: NodeData) -> Self {
        Self {
            node_id,
            backend_node_id: None,
            parent_id: None,
            children_ids: SmallVec::new(),
            data,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        self.element().map(|el| el.tag_name.as_str())
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentData> {
        match &self.data {
            NodeData::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if node is text
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self.data, NodeData::Document(_))
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element().and_then(|el| el.attr(name))
    }

    /// Runtime element state, if any was ever recorded
    pub fn state(&self) -> Option<&ElementState> {
        self.element().and_then(|el| el.state.as_deref())
    }
}
