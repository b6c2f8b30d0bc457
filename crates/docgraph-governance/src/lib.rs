//! Governance proposals over the document graph
//!
//! A proposal is a document; its lifecycle (propose, post-propose, vote,
//! pass or fail) is fixed, and what it does to the graph when it passes is
//! supplied by a [`ProposalKind`] registered under its type tag.
//!
//! # Core Concepts
//!
//! - [`Dao`]: root document, members, and the lifecycle entry points
//! - [`ProposalKind`]: variant hooks; built in are [`EditProposal`] and [`TimeShareProposal`]
//! - [`Ballot`]: voting seam, with [`MemoryBallotBox`] as the in-process implementation
//! - [`TimeShare`]: linked schedule of time-boxed allocations
//!
//! # Example
//!
//! ```rust,ignore
//! use docgraph_governance::{Dao, DaoConfig, MemoryBallotBox, Vote, labels::EDIT_TYPE};
//!
//! let dao = Dao::open(MemoryStore::new(), MemoryBallotBox::new(), DaoConfig::default())?;
//! dao.enroll(&alice)?;
//! let proposal = dao.propose(&alice, &EDIT_TYPE, edit_content)?;
//! dao.vote(&alice, &proposal, Vote::Pass, 1)?;
//! // after the voting period
//! dao.close(&alice, &proposal)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod ballot;
mod config;
mod dao;
mod error;
mod proposal;
mod state;
mod time_share;

pub mod labels;

pub use ballot::{Ballot, MemoryBallotBox, Outcome, Tally, Vote};
pub use config::{DaoConfig, MAX_VOTING_PERIOD_SECS};
pub use dao::Dao;
pub use error::{BallotError, ConfigError, ProposalError};
pub use proposal::{
    EditProposal, ProposalContext, ProposalKind, ProposalRegistry, TimeShareProposal,
};
pub use state::{allowed_transitions, validate_transition, ProposalState};
pub use time_share::TimeShare;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
