//! Proposal variants and the registry that dispatches to them
//!
//! The lifecycle in [`crate::Dao`] is fixed; everything type specific lives
//! behind [`ProposalKind`]. Variants are looked up by the `system.type` tag
//! stored in the proposal document.

mod edit;
mod time_share;

pub use edit::EditProposal;
pub use time_share::TimeShareProposal;

use crate::config::DaoConfig;
use crate::error::ProposalError;
use chrono::{DateTime, Utc};
use docgraph_core::{
    ContentGroups, ContentHash, Document, DocumentGraph, Name, Tables, Transaction, DETAILS, TITLE,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Everything a variant hook may touch
#[derive(Debug)]
pub struct ProposalContext<'a> {
    tx: &'a mut Transaction,
    config: &'a DaoConfig,
    root: ContentHash,
}

impl<'a> ProposalContext<'a> {
    pub fn new(tx: &'a mut Transaction, config: &'a DaoConfig, root: ContentHash) -> Self {
        Self { tx, config, root }
    }

    /// Write access for the duration of the borrow
    pub fn graph(&mut self) -> DocumentGraph<'_> {
        DocumentGraph::new(self.tx)
    }

    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.tx
    }

    #[must_use]
    pub fn config(&self) -> &DaoConfig {
        self.config
    }

    #[must_use]
    pub fn root(&self) -> &ContentHash {
        &self.root
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.tx.now()
    }
}

/// Type-specific proposal behavior
///
/// All hooks run inside the transaction that creates or closes the proposal,
/// so an error from any of them leaves no trace in the store.
pub trait ProposalKind: Send + Sync + Debug {
    /// Type tag written to `system.type`
    fn proposal_type(&self) -> Name;

    /// Validate or enrich the content before the document exists
    ///
    /// # Errors
    /// Variant-specific validation errors
    fn propose_impl(
        &self,
        _ctx: &mut ProposalContext<'_>,
        _proposer: &Name,
        _content: &mut ContentGroups,
    ) -> Result<(), ProposalError> {
        Ok(())
    }

    /// Wire supporting edges once the proposal document exists
    ///
    /// # Errors
    /// Variant-specific errors; they undo the whole proposal
    fn post_propose_impl(
        &self,
        _ctx: &mut ProposalContext<'_>,
        _proposal: &Document,
    ) -> Result<(), ProposalError> {
        Ok(())
    }

    /// Ballot title, `details.title` by default
    ///
    /// # Errors
    /// `Validation` if the title is missing
    fn ballot_content(&self, content: &ContentGroups) -> Result<String, ProposalError> {
        match content.get_as::<String>(DETAILS, TITLE) {
            Err(err) if err.is_missing_content() => Err(ProposalError::Validation(
                "proposal has no details.title".into(),
            )),
            other => Ok(other?),
        }
    }

    /// Apply an accepted proposal to the graph
    ///
    /// # Errors
    /// Any error here is reported as a state inconsistency
    fn pass_impl(&self, ctx: &mut ProposalContext<'_>, proposal: &Document)
        -> Result<(), ProposalError>;

    /// React to a rejected proposal
    ///
    /// # Errors
    /// Variant-specific errors
    fn fail_impl(
        &self,
        _ctx: &mut ProposalContext<'_>,
        _proposal: &Document,
    ) -> Result<(), ProposalError> {
        Ok(())
    }
}

/// Type tag -> variant
#[derive(Debug, Clone, Default)]
pub struct ProposalRegistry {
    kinds: HashMap<Name, Arc<dyn ProposalKind>>,
}

impl ProposalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `edit` and `timeshare`
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EditProposal));
        registry.register(Arc::new(TimeShareProposal));
        registry
    }

    /// Add a variant, returning the one it replaces
    pub fn register(&mut self, kind: Arc<dyn ProposalKind>) -> Option<Arc<dyn ProposalKind>> {
        self.kinds.insert(kind.proposal_type(), kind)
    }

    /// # Errors
    /// `UnknownProposalType` if nothing is registered under `proposal_type`
    pub fn get(&self, proposal_type: &Name) -> Result<Arc<dyn ProposalKind>, ProposalError> {
        self.kinds
            .get(proposal_type)
            .cloned()
            .ok_or_else(|| ProposalError::UnknownProposalType(proposal_type.clone()))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, proposal_type: &Name) -> bool {
        self.kinds.contains_key(proposal_type)
    }

    /// Registered type tags, sorted
    #[must_use]
    pub fn types(&self) -> Vec<&Name> {
        let mut types: Vec<&Name> = self.kinds.keys().collect();
        types.sort();
        types
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
