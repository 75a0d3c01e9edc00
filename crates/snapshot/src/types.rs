//! Snapshot data model
//!
//! The serialized tree is plain data: every value is a string, number,
//! boolean or nested structure, so it round-trips through JSON unchanged.
//! Wire shape: a numeric `type`, camelCase fields, optional flags omitted
//! when unset.

use crate::error::SnapshotError;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// Snapshot node identifier
pub type Id = i32;

/// Id given to nodes that were visited but deliberately left out
pub const IGNORED_NODE: Id = -2;

/// Prefix of host-only hint attributes (`rr_width`, `rr_scrollTop`, ...)
pub const SYNTHETIC_PREFIX: &str = "rr_";

/// Attribute carrying captured stylesheet text
pub const CSS_TEXT_ATTR: &str = "_cssText";

/// Is this attribute a snapshot-only annotation?
pub fn is_synthetic_attribute(name: &str) -> bool {
    name.starts_with(SYNTHETIC_PREFIX) || name == CSS_TEXT_ATTR
}

/// Serialized node kind, encoded as its number on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    Document = 0,
    DocumentType = 1,
    Element = 2,
    Text = 3,
    Cdata = 4,
    Comment = 5,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NodeType::Document),
            1 => Some(NodeType::DocumentType),
            2 => Some(NodeType::Element),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::Cdata),
            5 => Some(NodeType::Comment),
            _ => None,
        }
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        NodeType::from_u8(value)
            .ok_or_else(|| de::Error::custom(format!("unknown node type {value}")))
    }
}

/// Attribute value: captured markup is a string, runtime state may be a
/// flag (`checked`) or a number (`rr_scrollTop`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Number(f64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value as a DOM attribute would take it; flags become empty strings
    pub fn to_attribute_string(&self) -> String {
        match self {
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Bool(_) => String::new(),
            AttributeValue::Number(n) => n.to_string(),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

/// Insertion-ordered attribute map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(SmallVec<[(String, AttributeValue); 4]>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// String value of an attribute; flags and numbers yield `None`
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite in place (position of an existing key is kept)
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Attributes, A::Error> {
                let mut attributes = Attributes::new();
                while let Some((name, value)) = map.next_entry::<String, AttributeValue>()? {
                    attributes.insert(name, value);
                }
                Ok(attributes)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// One serialized node. Closed set: every kind is handled by exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedNode {
    Document {
        child_nodes: Vec<SerializedNodeWithId>,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag_name: String,
        attributes: Attributes,
        child_nodes: Vec<SerializedNodeWithId>,
        is_svg: bool,
        /// Content redacted; layout kept through `rr_width`/`rr_height`
        need_block: bool,
    },
    Text {
        text_content: String,
        /// Text of a `<style>` element
        is_style: bool,
    },
    Cdata {
        text_content: String,
    },
    Comment {
        text_content: String,
    },
}

impl SerializedNode {
    pub fn node_type(&self) -> NodeType {
        match self {
            SerializedNode::Document { .. } => NodeType::Document,
            SerializedNode::DocumentType { .. } => NodeType::DocumentType,
            SerializedNode::Element { .. } => NodeType::Element,
            SerializedNode::Text { .. } => NodeType::Text,
            SerializedNode::Cdata { .. } => NodeType::Cdata,
            SerializedNode::Comment { .. } => NodeType::Comment,
        }
    }

    pub fn child_nodes(&self) -> &[SerializedNodeWithId] {
        match self {
            SerializedNode::Document { child_nodes } | SerializedNode::Element { child_nodes, .. } => {
                child_nodes
            }
            _ => &[],
        }
    }

    /// `None` for leaf kinds
    pub fn child_nodes_mut(&mut self) -> Option<&mut Vec<SerializedNodeWithId>> {
        match self {
            SerializedNode::Document { child_nodes } | SerializedNode::Element { child_nodes, .. } => {
                Some(child_nodes)
            }
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        match self {
            SerializedNode::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            SerializedNode::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            SerializedNode::Text { text_content, .. }
            | SerializedNode::Cdata { text_content }
            | SerializedNode::Comment { text_content } => Some(text_content),
            _ => None,
        }
    }

    pub fn needs_blocking(&self) -> bool {
        matches!(self, SerializedNode::Element { need_block: true, .. })
    }

    /// Whitespace-only text that is not stylesheet text
    pub fn is_blank_text(&self) -> bool {
        matches!(
            self,
            SerializedNode::Text { text_content, is_style: false } if text_content.trim().is_empty()
        )
    }
}

/// A serialized node with its snapshot id
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub struct SerializedNodeWithId {
    pub node: SerializedNode,
    pub id: Id,
    /// Id of the nested (iframe) document this node belongs to
    pub root_id: Option<Id>,
}

impl SerializedNodeWithId {
    pub fn new(node: SerializedNode, id: Id) -> Self {
        Self {
            node,
            id,
            root_id: None,
        }
    }

    /// Walk the snapshot depth-first, parents before children
    pub fn visit<F>(&self, mut on_visit: F)
    where
        F: FnMut(&SerializedNodeWithId),
    {
        self.walk(&mut on_visit);
    }

    fn walk(&self, on_visit: &mut dyn FnMut(&SerializedNodeWithId)) {
        on_visit(self);
        for child in self.node.child_nodes() {
            child.walk(on_visit);
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---- wire format ----------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNode {
    #[serde(rename = "type")]
    node_type: NodeType,
    id: Id,
    root_id: Option<Id>,
    child_nodes: Option<Vec<SerializedNodeWithId>>,
    name: Option<String>,
    public_id: Option<String>,
    system_id: Option<String>,
    tag_name: Option<String>,
    attributes: Option<Attributes>,
    #[serde(rename = "isSVG")]
    is_svg: Option<bool>,
    need_block: Option<bool>,
    text_content: Option<String>,
    is_style: Option<bool>,
}

impl TryFrom<WireNode> for SerializedNodeWithId {
    type Error = SnapshotError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let kind = wire.node_type;
        let missing =
            |field: &str| SnapshotError::InvalidSnapshot(format!("{kind:?} node without {field}"));

        let node = match kind {
            NodeType::Document => SerializedNode::Document {
                child_nodes: wire.child_nodes.unwrap_or_default(),
            },
            NodeType::DocumentType => SerializedNode::DocumentType {
                name: wire.name.ok_or_else(|| missing("name"))?,
                public_id: wire.public_id.unwrap_or_default(),
                system_id: wire.system_id.unwrap_or_default(),
            },
            NodeType::Element => SerializedNode::Element {
                tag_name: wire.tag_name.ok_or_else(|| missing("tagName"))?,
                attributes: wire.attributes.unwrap_or_default(),
                child_nodes: wire.child_nodes.unwrap_or_default(),
                is_svg: wire.is_svg.unwrap_or(false),
                need_block: wire.need_block.unwrap_or(false),
            },
            NodeType::Text => SerializedNode::Text {
                text_content: wire.text_content.ok_or_else(|| missing("textContent"))?,
                is_style: wire.is_style.unwrap_or(false),
            },
            NodeType::Cdata => SerializedNode::Cdata {
                text_content: wire.text_content.unwrap_or_default(),
            },
            NodeType::Comment => SerializedNode::Comment {
                text_content: wire.text_content.ok_or_else(|| missing("textContent"))?,
            },
        };

        Ok(Self {
            node,
            id: wire.id,
            root_id: wire.root_id,
        })
    }
}

/// Borrowed view used for serialization, so no subtree is cloned
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRef<'a> {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<&'a Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    child_nodes: Option<&'a [SerializedNodeWithId]>,
    #[serde(rename = "isSVG", skip_serializing_if = "Option::is_none")]
    is_svg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    need_block: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_style: Option<bool>,
    id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    root_id: Option<Id>,
}

impl<'a> From<&'a SerializedNodeWithId> for WireRef<'a> {
    fn from(sn: &'a SerializedNodeWithId) -> Self {
        let base = WireRef {
            node_type: sn.node.node_type(),
            name: None,
            public_id: None,
            system_id: None,
            tag_name: None,
            attributes: None,
            child_nodes: None,
            is_svg: None,
            need_block: None,
            text_content: None,
            is_style: None,
            id: sn.id,
            root_id: sn.root_id,
        };
        match &sn.node {
            SerializedNode::Document { child_nodes } => WireRef {
                child_nodes: Some(child_nodes),
                ..base
            },
            SerializedNode::DocumentType {
                name,
                public_id,
                system_id,
            } => WireRef {
                name: Some(name),
                public_id: Some(public_id),
                system_id: Some(system_id),
                ..base
            },
            SerializedNode::Element {
                tag_name,
                attributes,
                child_nodes,
                is_svg,
                need_block,
            } => WireRef {
                tag_name: Some(tag_name),
                attributes: Some(attributes),
                child_nodes: Some(child_nodes),
                is_svg: is_svg.then_some(true),
                need_block: need_block.then_some(true),
                ..base
            },
            SerializedNode::Text {
                text_content,
                is_style,
            } => WireRef {
                text_content: Some(text_content),
                is_style: is_style.then_some(true),
                ..base
            },
            SerializedNode::Cdata { text_content } | SerializedNode::Comment { text_content } => {
                WireRef {
                    text_content: Some(text_content),
                    ..base
                }
            }
        }
    }
}

impl Serialize for SerializedNodeWithId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRef::from(self).serialize(serializer)
    }
}
