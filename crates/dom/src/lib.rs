//! Live DOM tree
//!
//! Arena-allocated document tree with the runtime state a recorder needs:
//! form values, scroll offsets, geometry, loaded stylesheets and iframe
//! documents.
//!
//! ## Core Design
//!
//! ```text
//! CDP JSON → DomService → DomArena (owned) ← create_* / append_child
//!                              ↓
//!                        NodeId (u32)
//! ```

pub mod arena;
pub mod error;
pub mod selector;
pub mod service;
pub mod types;

pub use arena::{Descendants, DomArena};
pub use error::{DomError, Result};
pub use service::{DomService, DomServiceConfig};
pub use types::*;
