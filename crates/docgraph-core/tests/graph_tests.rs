use docgraph_core::{
    ContentGroup, ContentGroups, ContentHash, Document, DocumentGraph, EdgeKey, GraphError,
    MemoryStore, Name, Tables, DETAILS, SYSTEM, TYPE,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const ALICE: Name = Name::from_static("alice");

fn numbered(n: usize) -> ContentGroups {
    ContentGroups::from(vec![
        ContentGroup::labeled(DETAILS).with("n", i64::try_from(n).unwrap()),
        ContentGroup::labeled(SYSTEM).with(TYPE, Name::from_static("node")),
    ])
}

fn label(i: usize) -> Name {
    [
        Name::from_static("a"),
        Name::from_static("b"),
        Name::from_static("c"),
    ][i % 3]
        .clone()
}

/// Create `count` documents and the given edges; returns their identities
fn populate(
    store: &MemoryStore,
    count: usize,
    edges: &[(usize, usize, usize)],
) -> Vec<ContentHash> {
    store
        .transaction(|tx| {
            let mut graph = DocumentGraph::new(tx);
            let ids = (0..count)
                .map(|n| graph.create_document(ALICE, numbered(n)).map(|d| *d.hash()))
                .collect::<Result<Vec<_>, _>>()?;
            let mut seen = BTreeSet::new();
            for &(from, to, l) in edges {
                let (from, to) = (ids[from % count], ids[to % count]);
                if seen.insert((from, to, l % 3)) {
                    graph.write_edge(from, to, label(l))?;
                }
            }
            Ok::<_, GraphError>(ids)
        })
        .unwrap()
}

fn edge_keys(store: &MemoryStore) -> BTreeSet<EdgeKey> {
    store.read(|t| t.edges().map(docgraph_core::Edge::key).collect())
}

#[test]
fn replace_node_rewires_all_incident_edges() {
    let store = MemoryStore::new();
    // 0 -> 1, 1 -> 2, 1 -> 1, 3 unrelated
    let ids = populate(&store, 4, &[(0, 1, 0), (1, 2, 1), (1, 1, 2)]);
    let (x, old, y) = (ids[0], ids[1], ids[2]);
    let new = ids[3];

    let moved = store
        .transaction(|tx| DocumentGraph::new(tx).replace_node(&old, &new))
        .unwrap();
    assert_eq!(moved, 3);

    store.read(|t| {
        assert!(t.incident_edges(&old).is_empty());
        assert!(t.edge_exists(&x, &new, &label(0)));
        assert!(t.edge_exists(&new, &y, &label(1)));
        assert!(t.edge_exists(&new, &new, &label(2)));
        assert_eq!(t.edge_count(), 3);
        // the old document itself survives until erased
        assert!(t.contains_document(&old));
    });
}

#[test]
fn forced_erase_removes_document_and_edges() {
    let store = MemoryStore::new();
    let ids = populate(&store, 3, &[(0, 1, 0), (1, 2, 0), (2, 0, 0)]);

    let err = store
        .transaction(|tx| DocumentGraph::new(tx).erase_document(&ids[1], false))
        .unwrap_err();
    assert!(matches!(err, GraphError::HasReferences { edges: 2, .. }));
    assert_eq!(store.read(Tables::edge_count), 3);

    let removed = store
        .transaction(|tx| DocumentGraph::new(tx).erase_document(&ids[1], true))
        .unwrap();
    assert_eq!(removed, 2);
    store.read(|t| {
        assert!(!t.contains_document(&ids[1]));
        assert_eq!(t.edge_count(), 1);
        assert!(t.edge_exists(&ids[2], &ids[0], &label(0)));
    });
}

#[test]
fn unreferenced_document_erases_without_force() {
    let store = MemoryStore::new();
    let ids = populate(&store, 2, &[]);
    let removed = store
        .transaction(|tx| DocumentGraph::new(tx).erase_document(&ids[0], false))
        .unwrap();
    assert_eq!(removed, 0);
    assert_eq!(store.read(Tables::document_count), 1);
}

#[test]
fn failed_transaction_discards_every_write() {
    let store = MemoryStore::new();
    let ids = populate(&store, 2, &[(0, 1, 0)]);
    let before = store.snapshot();

    let result = store.transaction(|tx| {
        let mut graph = DocumentGraph::new(tx);
        let extra = graph.create_document(ALICE, numbered(99))?;
        graph.write_edge(ids[0], *extra.hash(), label(1))?;
        graph.erase_document(&ids[1], true)?;
        graph.write_edge(ids[0], ContentHash::compute(b"missing"), label(0))
    });
    assert!(result.is_err());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn populated_store_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let store = MemoryStore::new();
    let ids = populate(&store, 5, &[(0, 1, 0), (1, 2, 1), (2, 3, 2), (3, 3, 0), (4, 0, 1)]);
    store.save(&path).unwrap();

    let loaded = MemoryStore::load(&path, std::sync::Arc::new(docgraph_core::SystemClock)).unwrap();
    assert_eq!(loaded.snapshot(), store.snapshot());
    loaded.read(|t| {
        assert_eq!(t.edges_to(&ids[3]).len(), 2);
        assert!(t.documents().all(Document::verify));
    });
}

#[test]
fn tampered_snapshot_is_rejected() {
    let store = MemoryStore::new();
    populate(&store, 2, &[]);
    let mut json = serde_json::to_value(store.snapshot()).unwrap();
    json["documents"][0]["content"][0][1]["value"]["value"] = serde_json::json!(12345);

    let snapshot = serde_json::from_value(json).unwrap();
    let err = docgraph_core::Tables::from_snapshot(snapshot).unwrap_err();
    assert!(matches!(err, GraphError::HashMismatch { .. }));
}

proptest! {
    #[test]
    fn prop_identity_tracks_content(
        a in proptest::collection::vec(any::<i64>(), 1..6),
        b in proptest::collection::vec(any::<i64>(), 1..6),
        title in "[a-zA-Z ]{0,12}",
    ) {
        let build = |values: &[i64]| {
            let mut group = ContentGroup::labeled(DETAILS).with("title", title.as_str());
            for (i, v) in values.iter().enumerate() {
                group = group.with(&format!("k{i}"), *v);
            }
            ContentGroups::from(vec![group])
        };
        let ha = Document::hash_of(&build(&a)).unwrap();
        let hb = Document::hash_of(&build(&b)).unwrap();
        prop_assert_eq!(ha == hb, a == b);
        prop_assert_eq!(ha, Document::hash_of(&build(&a)).unwrap());
    }

    #[test]
    fn prop_replace_node_postconditions(
        count in 2..8usize,
        edges in proptest::collection::vec((0..8usize, 0..8usize, 0..3usize), 0..24),
        old_idx in 0..8usize,
        new_idx in 0..8usize,
    ) {
        let store = MemoryStore::new();
        let ids = populate(&store, count, &edges);
        let (old, new) = (ids[old_idx % count], ids[new_idx % count]);
        prop_assume!(old != new);

        let swap = |h: ContentHash| if h == old { new } else { h };
        let expected: BTreeSet<EdgeKey> = edge_keys(&store)
            .into_iter()
            .map(|k| EdgeKey::new(swap(k.from), swap(k.to), k.label))
            .collect();

        store
            .transaction(|tx| DocumentGraph::new(tx).replace_node(&old, &new))
            .unwrap();

        prop_assert_eq!(edge_keys(&store), expected);
        prop_assert!(store.read(|t| t.incident_edges(&old).is_empty()));
        prop_assert_eq!(store.read(Tables::document_count), count);
    }
}
