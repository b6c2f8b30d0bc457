//! Error types for the proposal lifecycle
//!
//! Every error aborts the enclosing transaction. [`ProposalError::StateInconsistency`]
//! additionally signals that an accepted proposal could not be applied.

use crate::state::ProposalState;
use chrono::{DateTime, Utc};
use docgraph_core::{ContentHash, GraphError, Name};

/// Main proposal error type
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    /// Graph-level failure (missing document, missing content, ...)
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Proposal content is structurally unacceptable
    #[error("validation failed: {0}")]
    Validation(String),

    /// No variant registered for the type tag
    #[error("unknown proposal type `{0}`")]
    UnknownProposalType(Name),

    #[error("illegal proposal transition {from} -> {to}")]
    IllegalTransition {
        from: ProposalState,
        to: ProposalState,
    },

    /// Operation requires an active proposal
    #[error("proposal {proposal} is {state}, not active")]
    NotActive {
        proposal: ContentHash,
        state: ProposalState,
    },

    /// Close attempted before the voting period elapsed
    #[error("voting on {proposal} is open until {closes_at}")]
    VotingOpen {
        proposal: ContentHash,
        closes_at: DateTime<Utc>,
    },

    /// Another active edit proposal already targets the document
    #[error("document {original} is already targeted by active proposal {holder}")]
    Conflict {
        original: ContentHash,
        holder: ContentHash,
    },

    #[error("ballot error: {0}")]
    Ballot(#[from] BallotError),

    /// An accepted proposal failed to apply; the pass was discarded
    #[error("state inconsistency while passing {proposal}: {source}")]
    StateInconsistency {
        proposal: ContentHash,
        source: Box<ProposalError>,
    },
}

impl ProposalError {
    /// Accepted proposal could not be applied
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StateInconsistency { .. })
    }

    /// Missing document or edge, including behind a fatal wrapper
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Graph(err) => err.is_not_found(),
            Self::StateInconsistency { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub(crate) fn inconsistency(proposal: ContentHash, source: Self) -> Self {
        Self::StateInconsistency {
            proposal,
            source: Box::new(source),
        }
    }
}

/// Ballot collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BallotError {
    #[error("no ballot for proposal {0}")]
    UnknownBallot(ContentHash),

    #[error("ballot for proposal {0} is already open")]
    AlreadyOpen(ContentHash),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
