//! Testing utilities for the docgraph workspace
//!
//! Shared fixtures: a DAO on a manual clock, record documents to edit, and
//! content builders for the built-in proposal types.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use docgraph_core::{
    ContentGroup, ContentGroups, ContentHash, DocumentGraph, GraphError, ManualClock, MemoryStore,
    Name, DETAILS, SYSTEM, TITLE, TYPE,
};
use docgraph_governance::labels::{
    ORIGINAL_DOCUMENT_KEY, SCHEDULE_KEY, TIME_SHARE_KEY, TIME_SHARE_START_DATE_KEY,
};
use docgraph_governance::{Dao, DaoConfig, MemoryBallotBox, ProposalState, Vote};
use std::sync::Arc;

pub const ALICE: Name = Name::from_static("alice");
pub const BOB: Name = Name::from_static("bob");
pub const RECORD_TYPE: Name = Name::from_static("record");

/// Voting period used by [`test_dao`]
pub const VOTING_PERIOD_SECS: u64 = 60;

pub type TestDao = Dao<MemoryBallotBox>;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
    start_time() + Duration::days(n)
}

/// DAO with `alice` and `bob` enrolled, on a clock the test controls
pub fn test_dao_with(config: DaoConfig) -> (TestDao, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let store = MemoryStore::with_clock(clock.clone());
    let dao = Dao::open(store, MemoryBallotBox::new(), config).unwrap();
    dao.enroll(&ALICE).unwrap();
    dao.enroll(&BOB).unwrap();
    (dao, clock)
}

pub fn test_dao() -> (TestDao, Arc<ManualClock>) {
    test_dao_with(DaoConfig::new().with_voting_period_secs(VOTING_PERIOD_SECS))
}

/// `{title, value}` plus a `record` type tag
pub fn record_content(title: &str, value: i64) -> ContentGroups {
    ContentGroups::from(vec![
        ContentGroup::labeled(DETAILS)
            .with(TITLE, title)
            .with("value", value),
        ContentGroup::labeled(SYSTEM).with(TYPE, RECORD_TYPE),
    ])
}

/// Store a record document owned by `creator`
pub fn seed_record(dao: &TestDao, creator: &Name, title: &str, value: i64) -> ContentHash {
    dao.store()
        .transaction(|tx| {
            let doc = DocumentGraph::new(tx)
                .create_document(creator.clone(), record_content(title, value))?;
            Ok::<_, GraphError>(*doc.hash())
        })
        .unwrap()
}

/// Edit proposal content changing `original`'s title
pub fn edit_content(original: ContentHash, title: &str) -> ContentGroups {
    ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
        .with(TITLE, title)
        .with(ORIGINAL_DOCUMENT_KEY, original)])
}

pub fn time_share_content(
    title: &str,
    share: i64,
    start: DateTime<Utc>,
    schedule: Option<ContentHash>,
) -> ContentGroups {
    let mut details = ContentGroup::labeled(DETAILS)
        .with(TITLE, title)
        .with(TIME_SHARE_KEY, share)
        .with(TIME_SHARE_START_DATE_KEY, start);
    if let Some(schedule) = schedule {
        details = details.with(SCHEDULE_KEY, schedule);
    }
    ContentGroups::from(vec![details])
}

/// Vote `alice` in favour, wait out the voting period, close
pub fn pass(dao: &TestDao, clock: &ManualClock, proposal: &ContentHash) -> ProposalState {
    dao.vote(&ALICE, proposal, Vote::Pass, 1).unwrap();
    clock.advance(dao.config().voting_period());
    dao.close(&ALICE, proposal).unwrap()
}
