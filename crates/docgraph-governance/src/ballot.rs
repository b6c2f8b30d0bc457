//! Ballot collaborator
//!
//! The lifecycle needs a voting system to open a ballot for a new proposal,
//! record votes, report the outcome at close time and release the ballot
//! once the proposal has left the active state.

use crate::error::BallotError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docgraph_core::{ContentHash, Name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Pass,
    Fail,
}

/// Accumulated voting power per option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub pass: u64,
    pub fail: u64,
}

impl Tally {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.pass > self.fail {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Voting system seam
pub trait Ballot: Send + Sync {
    /// Start collecting votes for `proposal`
    ///
    /// # Errors
    /// `AlreadyOpen` if the proposal already has a ballot
    fn open(&self, proposal: ContentHash, title: &str) -> Result<(), BallotError>;

    /// Record `voter`'s choice, replacing any earlier vote by the same voter
    ///
    /// # Errors
    /// `UnknownBallot` if no ballot was opened
    fn cast(
        &self,
        proposal: &ContentHash,
        voter: &Name,
        vote: Vote,
        power: u64,
    ) -> Result<Tally, BallotError>;

    /// # Errors
    /// `UnknownBallot` if no ballot was opened
    fn tally(&self, proposal: &ContentHash) -> Result<Tally, BallotError>;

    /// # Errors
    /// `UnknownBallot` if no ballot was opened
    fn outcome(&self, proposal: &ContentHash) -> Result<Outcome, BallotError> {
        Ok(self.tally(proposal)?.outcome())
    }

    /// Stop collecting votes and drop the ballot, returning its final tally
    ///
    /// # Errors
    /// `UnknownBallot` if no ballot is open
    fn close(&self, proposal: &ContentHash) -> Result<Tally, BallotError>;
}

#[derive(Debug, Default)]
struct BallotSheet {
    title: String,
    votes: HashMap<Name, (Vote, u64)>,
}

impl BallotSheet {
    fn tally(&self) -> Tally {
        self.votes
            .values()
            .fold(Tally::default(), |mut tally, (vote, power)| {
                match vote {
                    Vote::Pass => tally.pass = tally.pass.saturating_add(*power),
                    Vote::Fail => tally.fail = tally.fail.saturating_add(*power),
                }
                tally
            })
    }
}

/// In-memory ballots, one per proposal
#[derive(Debug, Default)]
pub struct MemoryBallotBox {
    ballots: DashMap<ContentHash, BallotSheet>,
}

impl MemoryBallotBox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Title the ballot was opened with
    #[must_use]
    pub fn title(&self, proposal: &ContentHash) -> Option<String> {
        self.ballots.get(proposal).map(|sheet| sheet.title.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }
}

impl Ballot for MemoryBallotBox {
    fn open(&self, proposal: ContentHash, title: &str) -> Result<(), BallotError> {
        match self.ballots.entry(proposal) {
            Entry::Occupied(_) => Err(BallotError::AlreadyOpen(proposal)),
            Entry::Vacant(slot) => {
                slot.insert(BallotSheet {
                    title: title.to_string(),
                    votes: HashMap::new(),
                });
                tracing::debug!(proposal = %proposal.short(), title, "ballot opened");
                Ok(())
            }
        }
    }

    fn cast(
        &self,
        proposal: &ContentHash,
        voter: &Name,
        vote: Vote,
        power: u64,
    ) -> Result<Tally, BallotError> {
        let mut sheet = self
            .ballots
            .get_mut(proposal)
            .ok_or(BallotError::UnknownBallot(*proposal))?;
        sheet.votes.insert(voter.clone(), (vote, power));
        Ok(sheet.tally())
    }

    fn tally(&self, proposal: &ContentHash) -> Result<Tally, BallotError> {
        self.ballots
            .get(proposal)
            .map(|sheet| sheet.tally())
            .ok_or(BallotError::UnknownBallot(*proposal))
    }

    fn close(&self, proposal: &ContentHash) -> Result<Tally, BallotError> {
        let (_, sheet) = self
            .ballots
            .remove(proposal)
            .ok_or(BallotError::UnknownBallot(*proposal))?;
        tracing::debug!(proposal = %proposal.short(), title = %sheet.title, "ballot closed");
        Ok(sheet.tally())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> ContentHash {
        ContentHash::compute(b"proposal")
    }

    #[test]
    fn later_vote_replaces_earlier_one() {
        let ballots = MemoryBallotBox::new();
        ballots.open(proposal(), "Raise").unwrap();
        let alice = Name::from_static("alice");

        ballots.cast(&proposal(), &alice, Vote::Fail, 10).unwrap();
        let tally = ballots.cast(&proposal(), &alice, Vote::Pass, 10).unwrap();
        assert_eq!(tally, Tally { pass: 10, fail: 0 });
        assert_eq!(ballots.outcome(&proposal()).unwrap(), Outcome::Pass);
    }

    #[test]
    fn ties_fail() {
        let ballots = MemoryBallotBox::new();
        ballots.open(proposal(), "Raise").unwrap();
        ballots
            .cast(&proposal(), &Name::from_static("alice"), Vote::Pass, 5)
            .unwrap();
        ballots
            .cast(&proposal(), &Name::from_static("bob"), Vote::Fail, 5)
            .unwrap();
        assert_eq!(ballots.outcome(&proposal()).unwrap(), Outcome::Fail);
        assert_eq!(Tally::default().outcome(), Outcome::Fail);
    }

    #[test]
    fn unknown_and_duplicate_ballots() {
        let ballots = MemoryBallotBox::new();
        assert_eq!(
            ballots.tally(&proposal()),
            Err(BallotError::UnknownBallot(proposal()))
        );
        ballots.open(proposal(), "Raise").unwrap();
        assert_eq!(
            ballots.open(proposal(), "Again"),
            Err(BallotError::AlreadyOpen(proposal()))
        );
        assert_eq!(ballots.title(&proposal()).as_deref(), Some("Raise"));
    }

    #[test]
    fn close_returns_final_tally_and_drops_the_sheet() {
        let ballots = MemoryBallotBox::new();
        ballots.open(proposal(), "Raise").unwrap();
        ballots
            .cast(&proposal(), &Name::from_static("alice"), Vote::Pass, 3)
            .unwrap();

        assert_eq!(ballots.close(&proposal()), Ok(Tally { pass: 3, fail: 0 }));
        assert!(ballots.is_empty());
        assert_eq!(
            ballots.close(&proposal()),
            Err(BallotError::UnknownBallot(proposal()))
        );
        assert!(ballots
            .cast(&proposal(), &Name::from_static("alice"), Vote::Fail, 1)
            .is_err());
    }
}
