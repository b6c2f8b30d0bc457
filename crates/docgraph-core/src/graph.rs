//! Graph mutations with referential integrity
//!
//! [`DocumentGraph`] is the only write path into a [`Transaction`]. It keeps
//! the edge table consistent with the document table: edges are written only
//! between existing documents, and a document leaves the table together with
//! every edge that touches it.

use crate::content::ContentGroups;
use crate::document::Document;
use crate::edge::{Edge, EdgeKey};
use crate::error::GraphError;
use crate::hash::ContentHash;
use crate::name::Name;
use crate::store::{Tables, Transaction};
use std::ops::Deref;
use tracing::debug;

/// Mutable view of the graph inside one transaction
#[derive(Debug)]
pub struct DocumentGraph<'t> {
    tx: &'t mut Transaction,
}

impl<'t> DocumentGraph<'t> {
    pub fn new(tx: &'t mut Transaction) -> Self {
        Self { tx }
    }

    /// Persist a new document stamped with the transaction time
    ///
    /// # Errors
    /// - `Validation` for malformed content
    /// - `DocumentExists` if identical content is already stored
    pub fn create_document(
        &mut self,
        creator: Name,
        content: ContentGroups,
    ) -> Result<Document, GraphError> {
        let document = Document::new(creator, content, self.tx.now())?;
        if self.tx.contains_document(document.hash()) {
            return Err(GraphError::DocumentExists(*document.hash()));
        }
        debug!(hash = %document.hash().short(), creator = %document.creator(), "create document");
        self.tx.tables_mut().put_document(document.clone());
        Ok(document)
    }

    /// Return the stored document with this content, creating it if needed
    ///
    /// An existing document keeps its original creator and timestamp.
    ///
    /// # Errors
    /// `Validation` for malformed content
    pub fn get_or_create_document(
        &mut self,
        creator: Name,
        content: ContentGroups,
    ) -> Result<Document, GraphError> {
        let hash = Document::hash_of(&content)?;
        match self.tx.document(&hash) {
            Some(existing) => Ok(existing.clone()),
            None => self.create_document(creator, content),
        }
    }

    /// # Errors
    /// Returns `NotFound` if absent
    pub fn document(&self, hash: &ContentHash) -> Result<Document, GraphError> {
        Document::load(&self.tx, hash)
    }

    /// Write one directed edge
    ///
    /// # Errors
    /// - `NotFound` if either endpoint is missing
    /// - `EdgeExists` if the triple is already present
    pub fn write_edge(
        &mut self,
        from: ContentHash,
        to: ContentHash,
        label: Name,
    ) -> Result<Edge, GraphError> {
        for end in [&from, &to] {
            if !self.tx.contains_document(end) {
                return Err(GraphError::NotFound(*end));
            }
        }
        if self.tx.edge_exists(&from, &to, &label) {
            return Err(GraphError::EdgeExists { from, to, label });
        }
        let edge = Edge::new(from, to, label, self.tx.now());
        debug!(from = %from.short(), to = %to.short(), label = %edge.label(), "write edge");
        self.tx.tables_mut().put_edge(edge.clone());
        Ok(edge)
    }

    /// # Errors
    /// Returns `EdgeNotFound` if the triple is absent
    pub fn remove_edge(
        &mut self,
        from: ContentHash,
        to: ContentHash,
        label: Name,
    ) -> Result<Edge, GraphError> {
        let key = EdgeKey::new(from, to, label);
        match self.tx.tables_mut().delete_edge(&key) {
            Some(edge) => {
                debug!(
                    from = %from.short(),
                    to = %to.short(),
                    label = %edge.label(),
                    "remove edge"
                );
                Ok(edge)
            }
            None => Err(GraphError::EdgeNotFound {
                from,
                to,
                label: key.label,
            }),
        }
    }

    /// See [`Tables::edge_if_exists`]
    #[must_use]
    pub fn get_edge_if_exists(&self, from: &ContentHash, label: &Name) -> Option<Edge> {
        self.tx.edge_if_exists(from, label)
    }

    /// Redirect every edge touching `old` to `new`
    ///
    /// Outgoing edges of `old` leave from `new`, incoming edges arrive at
    /// `new`, and a self-edge on `old` becomes a self-edge on `new`. A
    /// rewired edge that matches an edge `new` already has is merged into
    /// it. The `old` document itself is left in place.
    ///
    /// Returns the number of edges rewired.
    ///
    /// # Errors
    /// Returns `NotFound` if `new` does not exist
    pub fn replace_node(
        &mut self,
        old: &ContentHash,
        new: &ContentHash,
    ) -> Result<usize, GraphError> {
        if !self.tx.contains_document(new) {
            return Err(GraphError::NotFound(*new));
        }
        if old == new {
            return Ok(0);
        }
        let incident = self.tx.incident_edges(old);
        let tables = self.tx.tables_mut();
        for edge in &incident {
            tables.delete_edge(&edge.key());
            let moved = edge.rewired(old, new);
            if tables.edge(&moved.key()).is_none() {
                tables.put_edge(moved);
            }
        }
        debug!(old = %old.short(), new = %new.short(), edges = incident.len(), "replace node");
        Ok(incident.len())
    }

    /// Delete a document and its incident edges
    ///
    /// Without `force`, a document that still has edges is kept and
    /// `HasReferences` is returned. Returns the number of edges removed.
    ///
    /// # Errors
    /// - `NotFound` if the document does not exist
    /// - `HasReferences` if `force` is false and edges remain
    pub fn erase_document(&mut self, hash: &ContentHash, force: bool) -> Result<usize, GraphError> {
        if !self.tx.contains_document(hash) {
            return Err(GraphError::NotFound(*hash));
        }
        let incident = self.tx.incident_edges(hash);
        if !force && !incident.is_empty() {
            return Err(GraphError::HasReferences {
                hash: *hash,
                edges: incident.len(),
            });
        }
        let tables = self.tx.tables_mut();
        for edge in &incident {
            tables.delete_edge(&edge.key());
        }
        tables.delete_document(hash);
        debug!(hash = %hash.short(), edges = incident.len(), force, "erase document");
        Ok(incident.len())
    }
}

impl Deref for DocumentGraph<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tx
    }
}
