//! Error types for snapshot and rebuild
//!
//! Almost everything in the codec degrades instead of failing; only caller
//! errors and malformed snapshot input surface here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Rebuild target is not a document node")]
    NotADocument,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Host tree error: {0}")]
    Host(#[from] dom::DomError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
