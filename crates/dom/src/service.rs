//! Build a live tree from a CDP `DOM.getDocument` response (`depth: -1`,
//! `pierce: true`), including iframe documents and the form state the
//! initial markup implies.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;
use serde_json::Value;

/// Limits on nested documents; exceeding either aborts the parse
#[derive(Debug, Clone)]
pub struct DomServiceConfig {
    /// Total iframe documents across the page
    pub max_iframes: usize,
    pub max_iframe_depth: usize,
}

impl Default for DomServiceConfig {
    fn default() -> Self {
        Self {
            max_iframes: 100,
            max_iframe_depth: 5,
        }
    }
}

pub struct DomService {
    config: DomServiceConfig,
    arena: DomArena,
    iframe_count: usize,
}

impl DomService {
    pub fn new() -> Self {
        Self::with_config(DomServiceConfig::default())
    }

    pub fn with_config(config: DomServiceConfig) -> Self {
        Self {
            config,
            arena: DomArena::new(),
            iframe_count: 0,
        }
    }

    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    /// Hand the parsed tree over to the caller
    pub fn into_arena(self) -> DomArena {
        self.arena
    }

    /// Replace the arena's contents with the tree in `cdp_response` and
    /// return the root document's id.
    ///
    /// ```json
    /// {
    ///   "root": {
    ///     "nodeId": 1,
    ///     "backendNodeId": 1,
    ///     "nodeType": 9,
    ///     "nodeName": "#document",
    ///     "documentURL": "https://example.com/",
    ///     "children": [...]
    ///   }
    /// }
    /// ```
    pub fn parse_cdp_dom_tree(&mut self, cdp_response: &Value) -> Result<NodeId> {
        let root = cdp_response
            .get("root")
            .ok_or_else(|| DomError::CdpError("Missing 'root' in CDP response".to_string()))?;

        self.arena.clear();
        self.iframe_count = 0;
        let root_id = self.parse_node(root, false, 0)?;
        self.arena.set_root(root_id)?;

        Ok(root_id)
    }

    /// Recursively parse a CDP node
    fn parse_node(&mut self, cdp_node: &Value, in_svg: bool, iframe_depth: usize) -> Result<NodeId> {
        let backend_node_id = cdp_node["backendNodeId"]
            .as_u64()
            .ok_or_else(|| DomError::CdpError("Missing backendNodeId".to_string()))?
            as u32;

        let node_type_val = cdp_node["nodeType"]
            .as_u64()
            .ok_or_else(|| DomError::CdpError("Missing nodeType".to_string()))?
            as u8;

        let node_type =
            NodeType::from_u8(node_type_val).ok_or_else(|| DomError::InvalidNodeType {
                expected: "valid NodeType".to_string(),
                actual: format!("{}", node_type_val),
            })?;

        let node_name = cdp_node["nodeName"].as_str().unwrap_or("");
        let node_value = cdp_node["nodeValue"].as_str().unwrap_or("").to_string();

        let mut child_in_svg = in_svg;
        let data = match node_type {
            NodeType::Document => NodeData::Document(DocumentData {
                url: cdp_node["documentURL"].as_str().unwrap_or("").to_string(),
                style_sheets: Vec::new(),
            }),
            NodeType::DocumentType => NodeData::DocumentType {
                name: node_name.to_string(),
                public_id: cdp_node["publicId"].as_str().unwrap_or("").to_string(),
                system_id: cdp_node["systemId"].as_str().unwrap_or("").to_string(),
            },
            NodeType::Element => {
                let local_name = cdp_node["localName"].as_str().unwrap_or(node_name);
                let is_svg = in_svg || local_name == "svg";
                child_in_svg = is_svg && local_name != "foreignObject";
                let mut element = if is_svg {
                    ElementData::new(local_name.to_string(), Some(SVG_NAMESPACE.to_string()))
                } else {
                    ElementData::new(local_name.to_ascii_lowercase(), None)
                };
                element.attributes = parse_attributes(&cdp_node["attributes"]);
                seed_form_state(&mut element);
                NodeData::Element(element)
            }
            NodeType::Text => NodeData::Text(node_value),
            NodeType::CdataSection => NodeData::CdataSection(node_value),
            NodeType::Comment => NodeData::Comment(node_value),
            other => NodeData::Other {
                node_type: other,
                name: node_name.to_string(),
                value: node_value,
            },
        };

        let mut node = DomNode::new(0, data);
        node.backend_node_id = Some(backend_node_id);
        let current_node_id = self.arena.add_node(node);

        // Parse children
        if let Some(children) = cdp_node["children"].as_array() {
            for child in children {
                let child_id = self.parse_node(child, child_in_svg, iframe_depth)?;
                self.arena.append_child(current_node_id, child_id)?;
            }
        }

        // Parse content document (iframe)
        if let Some(content_doc) = cdp_node.get("contentDocument") {
            self.iframe_count += 1;
            if self.iframe_count > self.config.max_iframes {
                return Err(DomError::MaxIframeCountExceeded {
                    current: self.iframe_count,
                    max: self.config.max_iframes,
                });
            }
            if iframe_depth + 1 > self.config.max_iframe_depth {
                return Err(DomError::MaxIframeDepthExceeded {
                    current: iframe_depth + 1,
                    max: self.config.max_iframe_depth,
                });
            }
            let doc_id = self.parse_node(content_doc, false, iframe_depth + 1)?;
            self.arena.set_content_document(current_node_id, doc_id)?;
        }

        if self.arena.get(current_node_id)?.tag_name() == Some("textarea") {
            let text = self.arena.text_content(current_node_id);
            self.arena.element_state_mut(current_node_id)?.value = Some(text);
        }

        Ok(current_node_id)
    }
}

impl Default for DomService {
    fn default() -> Self {
        Self::new()
    }
}

/// CDP sends attributes as a flat `[name, value, name, value, ...]` array
fn parse_attributes(value: &Value) -> AttributeList {
    let mut attributes = AttributeList::new();
    if let Some(attrs) = value.as_array() {
        for pair in attrs.chunks_exact(2) {
            if let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                attributes.push((key.to_string(), value.to_string()));
            }
        }
    }
    attributes
}

/// Initial control state, as a freshly parsed page would have it
fn seed_form_state(element: &mut ElementData) {
    let value = element.attr("value").map(str::to_string);
    let checked = element.attr("checked").is_some();
    let selected = element.attr("selected").is_some();
    match element.tag_name.as_str() {
        "input" => {
            let state = element.state_mut();
            state.value = value;
            state.checked = checked;
        }
        "option" => element.state_mut().selected = selected,
        _ => {}
    }
}
