//! Error types for DOM operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    #[error("Hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: u32, child: u32 },

    #[error("CDP protocol error: {0}")]
    CdpError(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Maximum iframe depth exceeded: {current} > {max}")]
    MaxIframeDepthExceeded { current: usize, max: usize },

    #[error("Maximum iframe count exceeded: {current} > {max}")]
    MaxIframeCountExceeded { current: usize, max: usize },
}
