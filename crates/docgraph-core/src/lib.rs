//! Content-addressed document graph
//!
//! Immutable documents identified by the hash of their typed content, joined
//! by directed labeled edges, with graph surgery that keeps every reference
//! valid when a document is replaced.
//!
//! # Core Concepts
//!
//! - [`Document`]: immutable node; identity = [`ContentHash`] of its [`ContentGroups`]
//! - [`Edge`]: `(from, to, label)` relation stored apart from the documents
//! - [`DocumentGraph`]: write path with `replace_node` and `erase_document`
//! - [`MemoryStore`]: transactional tables; every unit of work is all-or-nothing
//!
//! # Example
//!
//! ```rust,ignore
//! use docgraph_core::{ContentGroup, ContentGroups, DocumentGraph, MemoryStore, Name, DETAILS};
//!
//! let store = MemoryStore::new();
//! store.transaction(|tx| {
//!     let mut graph = DocumentGraph::new(tx);
//!     let old = graph.create_document(creator.clone(), v1)?;
//!     let new = graph.create_document(creator, v2)?;
//!     graph.replace_node(old.hash(), new.hash())?;
//!     graph.erase_document(old.hash(), true)
//! })?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod asset;
mod content;
mod document;
mod edge;
mod error;
mod graph;
mod hash;
mod name;
mod store;

pub use asset::{Asset, AssetError};
pub use content::{
    ContentGroup, ContentGroups, ContentItem, ContentValue, FromContentValue, CONTENT_GROUP_LABEL,
    DETAILS, NODE_LABEL, SYSTEM, TITLE, TYPE,
};
pub use document::Document;
pub use edge::{Edge, EdgeKey};
pub use error::GraphError;
pub use graph::DocumentGraph;
pub use hash::{ContentHash, HashError};
pub use name::{Name, NameError, MAX_NAME_LEN};
pub use store::{Clock, ManualClock, MemoryStore, Snapshot, SystemClock, Tables, Transaction};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
