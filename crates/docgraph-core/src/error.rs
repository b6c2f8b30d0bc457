//! Error types for the document graph
//!
//! Every failure aborts the enclosing transaction; nothing here is recovered
//! locally.

use crate::hash::{ContentHash, HashError};
use crate::name::{Name, NameError};

/// Main graph error type
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A structurally required content group is absent
    #[error("missing content group `{group}`")]
    MissingGroup { group: String },

    /// A structurally required key is absent from its group
    #[error("missing content `{group}.{key}`")]
    MissingContent { group: String, key: String },

    /// Stored value has a different type discriminant than requested
    #[error("type mismatch for `{key}`: expected {expected}, found {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Referenced document does not exist
    #[error("document not found: {0}")]
    NotFound(ContentHash),

    /// Referenced edge does not exist
    #[error("edge not found: {from} --{label}--> {to}")]
    EdgeNotFound {
        from: ContentHash,
        to: ContentHash,
        label: Name,
    },

    /// Non-forced erase blocked by live edges
    #[error("document {hash} still has {edges} incident edge(s)")]
    HasReferences { hash: ContentHash, edges: usize },

    /// A document with identical content already exists
    #[error("document already exists: {0}")]
    DocumentExists(ContentHash),

    /// The (from, to, label) triple is already present
    #[error("edge already exists: {from} --{label}--> {to}")]
    EdgeExists {
        from: ContentHash,
        to: ContentHash,
        label: Name,
    },

    /// Stored identity does not match its content
    #[error("hash mismatch: stored {expected}, computed {actual}")]
    HashMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Content violates a structural rule
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Missing group or missing key
    #[inline]
    #[must_use]
    pub fn is_missing_content(&self) -> bool {
        matches!(self, Self::MissingGroup { .. } | Self::MissingContent { .. })
    }

    /// Missing document or missing edge
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::EdgeNotFound { .. })
    }
}
