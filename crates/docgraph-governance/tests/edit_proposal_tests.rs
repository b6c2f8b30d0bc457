use docgraph_core::{
    ContentGroup, ContentGroups, ContentHash, Document, DocumentGraph, GraphError, Name, DETAILS,
    TITLE,
};
use docgraph_governance::labels::{
    EDIT_TYPE, FAILED_PROPS, ORIGINAL, ORIGINAL_DOCUMENT_KEY, PASSED_PROPS, PROPOSAL,
    TIME_SHARE_KEY,
};
use docgraph_governance::{Ballot, DaoConfig, ProposalError, ProposalState, TimeShare, Vote};
use docgraph_test_utils::{
    day, edit_content, pass, record_content, seed_record, test_dao, test_dao_with, TestDao, ALICE,
    BOB, VOTING_PERIOD_SECS,
};

const ASSIGNED: Name = Name::from_static("assigned");
const ASSIGNED_TO: Name = Name::from_static("assignedto");

/// A document that points at `target` and is pointed at by it
fn link_holder(dao: &TestDao, target: ContentHash) -> ContentHash {
    dao.store()
        .transaction(|tx| {
            let mut graph = DocumentGraph::new(tx);
            let holder = graph.create_document(ALICE, record_content("holder", 0))?;
            graph.write_edge(*holder.hash(), target, ASSIGNED)?;
            graph.write_edge(target, *holder.hash(), ASSIGNED_TO)?;
            Ok::<_, GraphError>(*holder.hash())
        })
        .unwrap()
}

fn title_and_value(original: ContentHash, title: &str, value: i64) -> ContentGroups {
    ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
        .with(TITLE, title)
        .with("value", value)
        .with(ORIGINAL_DOCUMENT_KEY, original)])
}

#[test]
fn passing_edit_merges_and_retires_the_original() {
    let (dao, clock) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let holder = link_holder(&dao, original);

    let proposal = dao
        .propose(&ALICE, &EDIT_TYPE, title_and_value(original, "Y", 20))
        .unwrap();
    assert!(dao
        .store()
        .read(|t| t.edge_exists(&proposal, &original, &ORIGINAL)));

    assert_eq!(pass(&dao, &clock, &proposal), ProposalState::Passed);

    let merged = Document::hash_of(&record_content("Y", 20)).unwrap();
    dao.store().read(|t| {
        assert!(!t.contains_document(&original));
        assert!(t.incident_edges(&original).is_empty());

        let doc = t.document(&merged).expect("merged document stored");
        assert_eq!(doc.creator(), &BOB);
        assert_eq!(doc.content().get_as::<String>(DETAILS, TITLE).unwrap(), "Y");
        assert_eq!(doc.content().get_as::<i64>(DETAILS, "value").unwrap(), 20);

        assert!(t.edge_exists(&holder, &merged, &ASSIGNED));
        assert!(t.edge_exists(&merged, &holder, &ASSIGNED_TO));
        assert!(t.edge_exists(&proposal, &merged, &ORIGINAL));
        assert!(t.edge_exists(dao.root(), &proposal, &PASSED_PROPS));
        assert!(!t.edge_exists(dao.root(), &proposal, &PROPOSAL));
    });
}

#[test]
fn keys_the_edit_leaves_out_survive() {
    let (dao, clock) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let proposal = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(original, "Z"))
        .unwrap();
    pass(&dao, &clock, &proposal);

    let merged = Document::hash_of(&record_content("Z", 10)).unwrap();
    assert!(dao.store().read(|t| t.contains_document(&merged)));
}

#[test]
fn failed_post_propose_leaves_nothing_behind() {
    let (dao, _) = test_dao();
    let before = dao.store().snapshot();
    let missing = ContentHash::compute(b"no such document");

    let err = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(missing, "Y"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_fatal());

    assert_eq!(dao.store().snapshot(), before);
    assert!(dao.ballots().is_empty());
    assert!(dao.proposals().is_empty());
}

#[test]
fn second_active_edit_of_the_same_document_conflicts() {
    let (dao, clock) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let first = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(original, "Y"))
        .unwrap();

    let err = dao
        .propose(&BOB, &EDIT_TYPE, edit_content(original, "Z"))
        .unwrap_err();
    assert!(matches!(
        err,
        ProposalError::Conflict { original: o, holder } if o == original && holder == first
    ));

    // once the first closes, the document is free again
    clock.advance(chrono::Duration::seconds(i64::try_from(VOTING_PERIOD_SECS).unwrap()));
    assert_eq!(dao.close(&ALICE, &first).unwrap(), ProposalState::Failed);
    assert!(dao.store().read(|t| t.edge_exists(dao.root(), &first, &FAILED_PROPS)));
    dao.propose(&BOB, &EDIT_TYPE, edit_content(original, "Z"))
        .unwrap();
}

#[test]
fn stale_edit_passes_into_state_inconsistency() {
    let config = DaoConfig::new()
        .with_voting_period_secs(VOTING_PERIOD_SECS)
        .with_exclusive_edits(false);
    let (dao, clock) = test_dao_with(config);
    let original = seed_record(&dao, &BOB, "X", 10);
    let first = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(original, "Y"))
        .unwrap();
    let second = dao
        .propose(&BOB, &EDIT_TYPE, edit_content(original, "Z"))
        .unwrap();

    assert_eq!(pass(&dao, &clock, &first), ProposalState::Passed);

    dao.vote(&ALICE, &second, Vote::Pass, 1).unwrap();
    let before = dao.store().snapshot();
    let err = dao.close(&ALICE, &second).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.is_not_found());
    assert_eq!(dao.store().snapshot(), before);
    assert_eq!(dao.state(&second).unwrap(), ProposalState::Active);
}

#[test]
fn no_op_edit_keeps_the_original() {
    let (dao, clock) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let proposal = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(original, "X"))
        .unwrap();

    assert_eq!(pass(&dao, &clock, &proposal), ProposalState::Passed);
    dao.store().read(|t| {
        assert!(t.contains_document(&original));
        assert!(t.edge_exists(&proposal, &original, &ORIGINAL));
    });
}

#[test]
fn edit_converging_on_an_existing_document_reuses_it() {
    let (dao, clock) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let existing = seed_record(&dao, &ALICE, "Y", 20);
    let holder = link_holder(&dao, original);

    let proposal = dao
        .propose(&ALICE, &EDIT_TYPE, title_and_value(original, "Y", 20))
        .unwrap();
    pass(&dao, &clock, &proposal);

    dao.store().read(|t| {
        assert!(!t.contains_document(&original));
        let doc = t.document(&existing).unwrap();
        assert_eq!(doc.creator(), &ALICE);
        assert!(t.edge_exists(&holder, &existing, &ASSIGNED));
    });
}

#[test]
fn editing_the_root_is_rejected() {
    let (dao, _) = test_dao();
    let root = *dao.root();
    let err = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(root, "Y"))
        .unwrap_err();
    assert!(matches!(err, ProposalError::Validation(_)));
}

#[test]
fn ballot_opens_with_the_proposal_title() {
    let (dao, _) = test_dao();
    let original = seed_record(&dao, &BOB, "X", 10);
    let proposal = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(original, "Rename"))
        .unwrap();
    assert_eq!(dao.ballots().title(&proposal).as_deref(), Some("Rename"));
    assert_eq!(dao.ballots().tally(&proposal).unwrap().pass, 0);
}

#[test]
fn proposals_cannot_be_edited() {
    let (dao, clock) = test_dao();
    let record = seed_record(&dao, &BOB, "X", 10);
    let active = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(record, "Y"))
        .unwrap();

    let err = dao
        .propose(&BOB, &EDIT_TYPE, edit_content(active, "Hijack"))
        .unwrap_err();
    assert!(matches!(err, ProposalError::Validation(_)));
    assert_eq!(dao.proposals().len(), 1);

    // the targeted proposal still runs its course
    assert_eq!(pass(&dao, &clock, &active), ProposalState::Passed);
    let closed = dao
        .propose(&BOB, &EDIT_TYPE, edit_content(active, "Rewrite history"))
        .unwrap_err();
    assert!(matches!(closed, ProposalError::Validation(_)));
}

#[test]
fn member_documents_cannot_be_edited() {
    let (dao, _) = test_dao();
    let bob = dao.member(&BOB).unwrap().expect("bob enrolled");

    let err = dao
        .propose(&ALICE, &EDIT_TYPE, edit_content(bob, "Robert"))
        .unwrap_err();
    assert!(matches!(err, ProposalError::Validation(_)));

    assert_eq!(dao.member(&BOB).unwrap(), Some(bob));
    assert!(dao.enroll(&BOB).is_err());
    let record = seed_record(&dao, &ALICE, "X", 1);
    dao.propose(&BOB, &EDIT_TYPE, edit_content(record, "Y"))
        .unwrap();
}

#[test]
fn edited_time_share_stays_in_its_chain() {
    let (dao, clock) = test_dao();
    let (head, middle, tail) = dao
        .store()
        .transaction(|tx| {
            let mut graph = DocumentGraph::new(tx);
            let head = TimeShare::new(&mut graph, BOB, 100, day(0))?;
            let middle = TimeShare::new(&mut graph, BOB, 50, day(10))?;
            let tail = TimeShare::new(&mut graph, BOB, 25, day(20))?;
            head.link_next(&mut graph, &middle)?;
            middle.link_next(&mut graph, &tail)?;
            Ok::<_, GraphError>((head, middle, tail))
        })
        .unwrap();

    let content = ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
        .with(TITLE, "Less time")
        .with(TIME_SHARE_KEY, 40i64)
        .with(ORIGINAL_DOCUMENT_KEY, *middle.hash())]);
    let proposal = dao.propose(&ALICE, &EDIT_TYPE, content).unwrap();
    assert_eq!(pass(&dao, &clock, &proposal), ProposalState::Passed);

    dao.store().read(|t| {
        assert!(!t.contains_document(middle.hash()));
        let merged = head.next(t).unwrap().expect("head still has a successor");
        assert_ne!(merged.hash(), middle.hash());
        assert_eq!((merged.share(), merged.start_date()), (40, day(10)));
        assert_eq!(merged.document().creator(), &BOB);
        assert_eq!(merged.next(t).unwrap(), Some(tail.clone()));

        let shares: Vec<i64> = head.chain(t).unwrap().iter().map(TimeShare::share).collect();
        assert_eq!(shares, vec![100, 40, 25]);
        assert_eq!(head.end_date(t).unwrap(), Some(day(10)));
    });
}
