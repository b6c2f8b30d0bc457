//! Proposal lifecycle states and their transition table

use crate::error::ProposalError;
use crate::labels::{FAILED_PROPS, PASSED_PROPS, PROPOSAL};
use docgraph_core::Name;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Lifecycle state of a proposal
///
/// `Drafted`, `Proposed` and `PostProposed` only exist inside the
/// transaction that creates the proposal. Once committed, the state is
/// encoded by the label of the root edge pointing at the proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Drafted,
    Proposed,
    PostProposed,
    Active,
    Passed,
    Failed,
}

impl ProposalState {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    /// Root edge label for a persisted state
    #[must_use]
    pub fn root_label(self) -> Option<Name> {
        match self {
            Self::Active => Some(PROPOSAL),
            Self::Passed => Some(PASSED_PROPS),
            Self::Failed => Some(FAILED_PROPS),
            Self::Drafted | Self::Proposed | Self::PostProposed => None,
        }
    }

    /// Persisted state from a root edge label
    #[must_use]
    pub fn from_root_label(label: &Name) -> Option<Self> {
        [Self::Active, Self::Passed, Self::Failed]
            .into_iter()
            .find(|state| state.root_label().as_ref() == Some(label))
    }
}

impl Display for ProposalState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Drafted => "drafted",
            Self::Proposed => "proposed",
            Self::PostProposed => "post_proposed",
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[must_use]
pub fn allowed_transitions(from: ProposalState) -> &'static [ProposalState] {
    use ProposalState::{Active, Drafted, Failed, Passed, PostProposed, Proposed};
    match from {
        Drafted => &[Proposed],
        Proposed => &[PostProposed],
        PostProposed => &[Active],
        Active => &[Passed, Failed],
        Passed | Failed => &[],
    }
}

/// # Errors
/// Returns `IllegalTransition` if `to` is not reachable from `from` in one step
pub fn validate_transition(from: ProposalState, to: ProposalState) -> Result<(), ProposalError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ProposalError::IllegalTransition { from, to })
    }
}
