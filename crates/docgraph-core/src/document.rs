//! Content-addressed graph nodes
//!
//! A [`Document`] is immutable: its identity is the hash of its content, so
//! any semantic change yields a new document with a new identity. The old
//! identity is retired through [`crate::DocumentGraph::replace_node`] and
//! [`crate::DocumentGraph::erase_document`].

use crate::content::{ContentGroups, SYSTEM, TYPE};
use crate::error::GraphError;
use crate::hash::ContentHash;
use crate::name::Name;
use crate::store::Tables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable, content-addressed graph node
///
/// # Invariants
/// - `hash == Document::hash_of(&content)`
/// - `content` passes [`ContentGroups::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    hash: ContentHash,
    creator: Name,
    created_date: DateTime<Utc>,
    content: ContentGroups,
}

impl Document {
    /// Build a document (validates and hashes the content)
    ///
    /// The timestamp normally comes from the enclosing transaction; see
    /// [`crate::DocumentGraph::create_document`].
    ///
    /// # Errors
    /// Returns `Validation` for malformed content
    pub fn new(
        creator: Name,
        content: ContentGroups,
        created_date: DateTime<Utc>,
    ) -> Result<Self, GraphError> {
        content.validate()?;
        let hash = Self::hash_of(&content)?;
        Ok(Self {
            hash,
            creator,
            created_date,
            content,
        })
    }

    /// Identity the given content would have
    ///
    /// # Errors
    /// Returns error if the content cannot be serialized
    pub fn hash_of(content: &ContentGroups) -> Result<ContentHash, GraphError> {
        Ok(ContentHash::compute_serializable(content)?)
    }

    /// Load a stored document by identity
    ///
    /// # Errors
    /// Returns `NotFound` if no document has this identity
    pub fn load(tables: &Tables, hash: &ContentHash) -> Result<Self, GraphError> {
        tables
            .document(hash)
            .cloned()
            .ok_or(GraphError::NotFound(*hash))
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn creator(&self) -> &Name {
        &self.creator
    }

    #[inline]
    #[must_use]
    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &ContentGroups {
        &self.content
    }

    /// `system.type`
    ///
    /// # Errors
    /// Missing system group/type, or a type that is not a name
    pub fn document_type(&self) -> Result<Name, GraphError> {
        self.content.get_as(SYSTEM, TYPE)
    }

    /// Recompute the identity (after deserialization)
    #[must_use]
    pub fn verify(&self) -> bool {
        Self::hash_of(&self.content).is_ok_and(|h| h == self.hash)
    }
}
