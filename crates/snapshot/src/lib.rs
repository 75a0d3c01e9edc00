//! DOM snapshot codec
//!
//! Converts a live document tree into a JSON-ready snapshot for session
//! replay, and rebuilds live trees from snapshots.
//!
//! ## Core Design
//!
//! ```text
//! LiveTree ──snapshot()──→ SerializedNodeWithId ──serde_json──→ wire
//!    ↑                            │
//!    └────────rebuild()───────────┘  (TreeBuilder)
//!
//! Session: IdRegistry + mirror (live node → id), shared by both directions
//! ```
//!
//! The host tree is reached only through the [`LiveTree`] and
//! [`TreeBuilder`] traits; `dom::DomArena` implements both.

pub mod css;
pub mod error;
pub mod filter;
pub mod host;
pub mod ids;
pub mod options;
pub mod rebuild;
pub mod serializer;
pub mod session;
pub mod types;

pub use error::{Result, SnapshotError};
pub use host::{LiveKind, LiveTree, TreeBuilder};
pub use ids::IdRegistry;
pub use options::{BlockClass, MaskInputOptions, RebuildOptions, SerializeOptions, SlimDomOptions};
pub use rebuild::{rebuild, Rebuilder};
pub use serializer::{snapshot, Serializer, SCRIPT_PLACEHOLDER};
pub use session::{IdNodeMap, Session};
pub use types::*;
