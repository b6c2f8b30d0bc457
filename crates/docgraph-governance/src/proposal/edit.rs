//! Edit proposals: merge edited fields into an existing document
//!
//! Passing an edit produces the merged document, moves every edge of the
//! original onto it and erases the original, all in the closing transaction.
//! The root, member documents and proposals are never valid targets.

use super::{ProposalContext, ProposalKind};
use crate::error::ProposalError;
use crate::labels::{EDIT_TYPE, MEMBER, ORIGINAL, ORIGINAL_DOCUMENT_KEY, PROPOSAL};
use crate::state::ProposalState;
use docgraph_core::{ContentGroups, ContentHash, Document, Name, DETAILS, SYSTEM};
use tracing::{debug, info};

/// `edit` variant
#[derive(Debug, Clone, Copy, Default)]
pub struct EditProposal;

impl EditProposal {
    fn original_id(content: &ContentGroups) -> Result<ContentHash, ProposalError> {
        Ok(content.get_as(DETAILS, ORIGINAL_DOCUMENT_KEY)?)
    }

    /// Proposal content minus bookkeeping: the fields to write over the original
    #[must_use]
    pub fn edits(proposal: &ContentGroups) -> ContentGroups {
        let mut edits = proposal.clone();
        edits.remove_group(SYSTEM);
        edits.remove(DETAILS, ORIGINAL_DOCUMENT_KEY);
        edits
    }

    /// Refuse the root and anything hanging off it by a member or lifecycle edge
    fn check_target(
        ctx: &ProposalContext<'_>,
        original: &ContentHash,
    ) -> Result<(), ProposalError> {
        let root = ctx.root();
        if original == root {
            return Err(ProposalError::Validation(
                "the root document cannot be edited".into(),
            ));
        }
        for edge in ctx.tables().edges_to(original) {
            if edge.from_node() != root {
                continue;
            }
            if edge.label() == &MEMBER {
                return Err(ProposalError::Validation(format!(
                    "{} is a member document and cannot be edited",
                    original.short()
                )));
            }
            if let Some(state) = ProposalState::from_root_label(edge.label()) {
                return Err(ProposalError::Validation(format!(
                    "{} is a {state} proposal and cannot be edited",
                    original.short()
                )));
            }
        }
        Ok(())
    }

    /// Active proposal, other than `proposal`, already editing `original`
    fn competing_proposal(
        ctx: &ProposalContext<'_>,
        original: &ContentHash,
        proposal: &ContentHash,
    ) -> Option<ContentHash> {
        let tables = ctx.tables();
        tables
            .edges_to(original)
            .into_iter()
            .filter(|edge| edge.label() == &ORIGINAL && edge.from_node() != proposal)
            .map(|edge| *edge.from_node())
            .find(|holder| tables.edge_exists(ctx.root(), holder, &PROPOSAL))
    }
}

impl ProposalKind for EditProposal {
    fn proposal_type(&self) -> Name {
        EDIT_TYPE
    }

    /// Shape check only; the original is resolved after creation
    fn propose_impl(
        &self,
        _ctx: &mut ProposalContext<'_>,
        _proposer: &Name,
        content: &mut ContentGroups,
    ) -> Result<(), ProposalError> {
        Self::original_id(content).map(drop)
    }

    fn post_propose_impl(
        &self,
        ctx: &mut ProposalContext<'_>,
        proposal: &Document,
    ) -> Result<(), ProposalError> {
        let original = Self::original_id(proposal.content())?;
        Document::load(ctx.tables(), &original)?;
        Self::check_target(ctx, &original)?;
        if ctx.config().exclusive_edits {
            if let Some(holder) = Self::competing_proposal(ctx, &original, proposal.hash()) {
                return Err(ProposalError::Conflict { original, holder });
            }
        }
        ctx.graph()
            .write_edge(*proposal.hash(), original, ORIGINAL)?;
        Ok(())
    }

    fn pass_impl(
        &self,
        ctx: &mut ProposalContext<'_>,
        proposal: &Document,
    ) -> Result<(), ProposalError> {
        let original_id = Self::original_id(proposal.content())?;
        let original = Document::load(ctx.tables(), &original_id)?;
        Self::check_target(ctx, &original_id)?;

        let merged = original
            .content()
            .overlay(&Self::edits(proposal.content()));
        if Document::hash_of(&merged)? == original_id {
            info!(original = %original_id.short(), "edit changes nothing; original kept");
            return Ok(());
        }

        let mut graph = ctx.graph();
        let merged = graph.get_or_create_document(original.creator().clone(), merged)?;
        let moved = graph.replace_node(&original_id, merged.hash())?;
        graph.erase_document(&original_id, true)?;
        debug!(
            original = %original_id.short(),
            merged = %merged.hash().short(),
            edges = moved,
            "edit applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{ContentGroup, TITLE, TYPE};

    #[test]
    fn edits_strip_bookkeeping() {
        let proposal = ContentGroups::from(vec![
            ContentGroup::labeled(DETAILS)
                .with(TITLE, "Y")
                .with(ORIGINAL_DOCUMENT_KEY, ContentHash::compute(b"o")),
            ContentGroup::labeled(SYSTEM).with(TYPE, EDIT_TYPE),
        ]);
        let edits = EditProposal::edits(&proposal);
        assert_eq!(edits.len(), 1);
        assert!(edits.get(DETAILS, ORIGINAL_DOCUMENT_KEY).is_none());
        assert_eq!(edits.get_as::<String>(DETAILS, TITLE).unwrap(), "Y");
    }

    #[test]
    fn propose_requires_original_reference() {
        let mut content =
            ContentGroups::from(vec![ContentGroup::labeled(DETAILS).with(TITLE, "Y")]);
        let err = EditProposal::original_id(&content).unwrap_err();
        assert!(matches!(err, ProposalError::Graph(e) if e.is_missing_content()));

        content.insert_or_replace(
            DETAILS,
            docgraph_core::ContentItem::new(ORIGINAL_DOCUMENT_KEY, "not a hash"),
        );
        assert!(EditProposal::original_id(&content).is_err());
    }
}
