//! Transactional table storage
//!
//! [`Tables`] holds the document table (keyed by identity), the edge table
//! (keyed by `from`/`label`/`to`) and a reverse index keyed by `to`. Tables are
//! persistent maps, so cloning them is O(1) and a [`Transaction`] can work on
//! its own copy: [`MemoryStore::transaction`] commits that copy only when the
//! closure returns `Ok`, which makes every multi-row mutation all-or-nothing.

use crate::document::Document;
use crate::edge::{Edge, EdgeKey};
use crate::error::GraphError;
use crate::hash::ContentHash;
use crate::name::Name;
use chrono::{DateTime, Duration, Utc};
use im::{OrdMap, OrdSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// Source of transaction timestamps
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Document and edge tables
#[derive(Debug, Clone, Default)]
pub struct Tables {
    documents: OrdMap<ContentHash, Document>,
    edges: OrdMap<EdgeKey, Edge>,
    /// (to, from, label)
    incoming: OrdSet<(ContentHash, ContentHash, Name)>,
}

impl Tables {
    #[must_use]
    pub fn document(&self, hash: &ContentHash) -> Option<&Document> {
        self.documents.get(hash)
    }

    #[must_use]
    pub fn contains_document(&self, hash: &ContentHash) -> bool {
        self.documents.contains_key(hash)
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    #[must_use]
    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    #[must_use]
    pub fn edge_exists(&self, from: &ContentHash, to: &ContentHash, label: &Name) -> bool {
        self.edges
            .contains_key(&EdgeKey::new(*from, *to, label.clone()))
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Outgoing edges, ordered by label then target
    #[must_use]
    pub fn edges_from(&self, from: &ContentHash) -> Vec<Edge> {
        self.edges
            .range(EdgeKey::lower_bound(*from)..)
            .take_while(|(key, _)| key.from == *from)
            .map(|(_, edge)| edge.clone())
            .collect()
    }

    /// Outgoing edges with one label
    #[must_use]
    pub fn edges_from_with_label(&self, from: &ContentHash, label: &Name) -> Vec<Edge> {
        self.edges
            .range(EdgeKey::lower_bound_labeled(*from, label.clone())..)
            .take_while(|(key, _)| key.from == *from && key.label == *label)
            .map(|(_, edge)| edge.clone())
            .collect()
    }

    /// Single-edge lookup for structural labels
    ///
    /// When several edges share the pair, the one with the lowest target
    /// identity is returned.
    #[must_use]
    pub fn edge_if_exists(&self, from: &ContentHash, label: &Name) -> Option<Edge> {
        self.edges
            .range(EdgeKey::lower_bound_labeled(*from, label.clone())..)
            .next()
            .filter(|(key, _)| key.from == *from && key.label == *label)
            .map(|(_, edge)| edge.clone())
    }

    /// Incoming edges, ordered by source then label
    #[must_use]
    pub fn edges_to(&self, to: &ContentHash) -> Vec<Edge> {
        self.incoming
            .range((*to, ContentHash::default(), Name::MIN)..)
            .take_while(|(target, _, _)| target == to)
            .filter_map(|(target, from, label)| {
                self.edges
                    .get(&EdgeKey::new(*from, *target, label.clone()))
                    .cloned()
            })
            .collect()
    }

    /// Every edge touching `node`, each once (self-edges included once)
    #[must_use]
    pub fn incident_edges(&self, node: &ContentHash) -> Vec<Edge> {
        let mut edges = self.edges_from(node);
        edges.extend(
            self.edges_to(node)
                .into_iter()
                .filter(|edge| edge.from_node() != node),
        );
        edges
    }

    pub(crate) fn put_document(&mut self, document: Document) {
        self.documents.insert(*document.hash(), document);
    }

    pub(crate) fn delete_document(&mut self, hash: &ContentHash) -> Option<Document> {
        self.documents.remove(hash)
    }

    pub(crate) fn put_edge(&mut self, edge: Edge) {
        self.incoming
            .insert((*edge.to_node(), *edge.from_node(), edge.label().clone()));
        self.edges.insert(edge.key(), edge);
    }

    pub(crate) fn delete_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        self.incoming.remove(&(key.to, key.from, key.label.clone()));
        Some(edge)
    }

    /// Flat copy for persistence
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self.documents.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Rebuild tables (and the reverse index) from a snapshot
    ///
    /// # Errors
    /// - `HashMismatch` if a document's identity does not match its content
    /// - `NotFound` if an edge references a missing document
    /// - `EdgeExists` on a repeated edge
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, GraphError> {
        let mut tables = Self::default();
        for document in snapshot.documents {
            document.content().validate()?;
            let actual = Document::hash_of(document.content())?;
            if actual != *document.hash() {
                return Err(GraphError::HashMismatch {
                    expected: *document.hash(),
                    actual,
                });
            }
            tables.put_document(document);
        }
        for edge in snapshot.edges {
            for end in [edge.from_node(), edge.to_node()] {
                if !tables.contains_document(end) {
                    return Err(GraphError::NotFound(*end));
                }
            }
            if tables.edges.contains_key(&edge.key()) {
                return Err(GraphError::EdgeExists {
                    from: *edge.from_node(),
                    to: *edge.to_node(),
                    label: edge.label().clone(),
                });
            }
            tables.put_edge(edge);
        }
        Ok(tables)
    }
}

/// Serializable form of [`Tables`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    pub edges: Vec<Edge>,
}

/// Working copy of the tables for one unit of work
///
/// Reads go through `Deref<Target = Tables>`. Writes are only reachable
/// through [`crate::DocumentGraph`], which enforces the graph invariants.
#[derive(Debug)]
pub struct Transaction {
    tables: Tables,
    now: DateTime<Utc>,
}

impl Transaction {
    fn begin(tables: Tables, now: DateTime<Utc>) -> Self {
        Self { tables, now }
    }

    /// Timestamp shared by every row written in this transaction
    #[inline]
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub(crate) fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    fn into_tables(self) -> Tables {
        self.tables
    }
}

impl Deref for Transaction {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tables
    }
}

/// In-process table store with all-or-nothing transactions
///
/// Opened once per process and injected wherever graph operations run.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock,
        }
    }

    /// # Errors
    /// See [`Tables::from_snapshot`]
    pub fn from_snapshot(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Result<Self, GraphError> {
        Ok(Self {
            tables: Mutex::new(Tables::from_snapshot(snapshot)?),
            clock,
        })
    }

    /// Open a store saved with [`MemoryStore::save`]
    ///
    /// # Errors
    /// IO, JSON, or snapshot integrity errors
    pub fn load(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, GraphError> {
        let bytes = std::fs::read(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            documents = snapshot.documents.len(),
            edges = snapshot.edges.len(),
            "loading snapshot"
        );
        Self::from_snapshot(snapshot, clock)
    }

    /// Write the committed state as pretty JSON
    ///
    /// # Errors
    /// IO or JSON errors
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.tables.lock().snapshot()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` against the committed tables
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&*self.tables.lock())
    }

    /// Run `f` as one atomic unit of work
    ///
    /// Transactions are serialized. `f` must not call back into this store.
    /// If `f` returns `Err`, none of its writes become visible.
    ///
    /// # Errors
    /// Whatever `f` returns
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: Display,
    {
        let mut committed = self.tables.lock();
        let mut tx = Transaction::begin(committed.clone(), self.clock.now());
        match f(&mut tx) {
            Ok(out) => {
                *committed = tx.into_tables();
                tracing::debug!(
                    documents = committed.document_count(),
                    edges = committed.edge_count(),
                    "transaction committed"
                );
                Ok(out)
            }
            Err(err) => {
                tracing::warn!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentGroup, ContentGroups, DETAILS};

    fn doc(n: i64) -> Document {
        Document::new(
            Name::from_static("alice"),
            ContentGroups::from(vec![ContentGroup::labeled(DETAILS).with("n", n)]),
            Utc::now(),
        )
        .unwrap()
    }

    fn label(s: &'static str) -> Name {
        Name::from_static(s)
    }

    fn populated() -> (Tables, Vec<ContentHash>) {
        let mut tables = Tables::default();
        let docs: Vec<Document> = (0..3).map(doc).collect();
        let ids: Vec<ContentHash> = docs.iter().map(|d| *d.hash()).collect();
        for d in docs {
            tables.put_document(d);
        }
        let now = Utc::now();
        tables.put_edge(Edge::new(ids[0], ids[1], label("a"), now));
        tables.put_edge(Edge::new(ids[0], ids[2], label("a"), now));
        tables.put_edge(Edge::new(ids[0], ids[2], label("b"), now));
        tables.put_edge(Edge::new(ids[1], ids[2], label("a"), now));
        tables.put_edge(Edge::new(ids[2], ids[2], label("self"), now));
        (tables, ids)
    }

    #[test]
    fn range_queries_stay_within_source() {
        let (tables, ids) = populated();
        assert_eq!(tables.edges_from(&ids[0]).len(), 3);
        assert_eq!(tables.edges_from_with_label(&ids[0], &label("a")).len(), 2);
        assert_eq!(tables.edges_from_with_label(&ids[0], &label("c")).len(), 0);
        assert_eq!(tables.edges_from(&ids[1]).len(), 1);
    }

    #[test]
    fn edge_if_exists_respects_label() {
        let (tables, ids) = populated();
        let edge = tables.edge_if_exists(&ids[0], &label("b")).unwrap();
        assert_eq!(edge.to_node(), &ids[2]);
        assert!(tables.edge_if_exists(&ids[1], &label("b")).is_none());
    }

    #[test]
    fn reverse_index_tracks_incoming_edges() {
        let (mut tables, ids) = populated();
        assert_eq!(tables.edges_to(&ids[2]).len(), 4);
        assert_eq!(tables.incident_edges(&ids[2]).len(), 4);

        tables.delete_edge(&EdgeKey::new(ids[0], ids[2], label("b")));
        assert_eq!(tables.edges_to(&ids[2]).len(), 3);
        assert!(!tables.edge_exists(&ids[0], &ids[2], &label("b")));
    }

    #[test]
    fn snapshot_rebuilds_indexes() {
        let (tables, ids) = populated();
        let rebuilt = Tables::from_snapshot(tables.snapshot()).unwrap();
        assert_eq!(rebuilt.document_count(), 3);
        assert_eq!(rebuilt.edge_count(), 5);
        assert_eq!(rebuilt.edges_to(&ids[2]).len(), 4);
    }

    #[test]
    fn snapshot_rejects_dangling_edges() {
        let (tables, ids) = populated();
        let mut snapshot = tables.snapshot();
        snapshot.documents.retain(|d| d.hash() != &ids[1]);
        assert!(matches!(
            Tables::from_snapshot(snapshot),
            Err(GraphError::NotFound(h)) if h == ids[1]
        ));
    }

    #[test]
    fn failed_transaction_leaves_tables_untouched() {
        let store = MemoryStore::new();
        let result: Result<(), GraphError> = store.transaction(|tx| {
            tx.tables_mut().put_document(doc(7));
            Err(GraphError::Validation("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.read(Tables::document_count), 0);

        store
            .transaction(|tx| {
                tx.tables_mut().put_document(doc(7));
                Ok::<_, GraphError>(())
            })
            .unwrap();
        assert_eq!(store.read(Tables::document_count), 1);
    }

    #[test]
    fn manual_clock_stamps_transactions() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let clock = Arc::new(ManualClock::new(start));
        let store = MemoryStore::with_clock(clock.clone());
        clock.advance(Duration::hours(1));
        let now = store
            .transaction(|tx| Ok::<_, GraphError>(tx.now()))
            .unwrap();
        assert_eq!(now, start + Duration::hours(1));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let store = MemoryStore::new();
        store
            .transaction(|tx| {
                tx.tables_mut().put_document(doc(1));
                Ok::<_, GraphError>(())
            })
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path, Arc::new(SystemClock)).unwrap();
        assert_eq!(loaded.snapshot(), store.snapshot());
    }
}
