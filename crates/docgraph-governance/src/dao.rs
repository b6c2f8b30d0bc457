//! DAO facade: the proposal lifecycle over one document graph
//!
//! [`Dao`] owns the store, the ballot collaborator, the variant registry and
//! the configuration. All state lives in the graph and hangs off a single
//! root document: members via `member`, proposals via `proposal`,
//! `passedprops` or `failedprops` depending on where they are in their
//! lifecycle.

use crate::ballot::{Ballot, Outcome, Tally, Vote};
use crate::config::DaoConfig;
use crate::error::ProposalError;
use crate::labels::{
    DAO_TYPE, MEMBER, MEMBER_KEY, MEMBER_OF, MEMBER_TYPE, OWNED_BY, OWNS, PROPOSAL, ROOT_NODE_KEY,
};
use crate::proposal::{ProposalContext, ProposalKind, ProposalRegistry};
use crate::state::{validate_transition, ProposalState};
use docgraph_core::{
    ContentGroup, ContentGroups, ContentHash, ContentItem, Document, DocumentGraph, GraphError,
    MemoryStore, Name, Tables, DETAILS, NODE_LABEL, SYSTEM, TYPE,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Governance over a [`MemoryStore`]
pub struct Dao<B: Ballot> {
    store: MemoryStore,
    ballots: B,
    config: DaoConfig,
    registry: ProposalRegistry,
    root: ContentHash,
}

impl<B: Ballot> Dao<B> {
    /// Attach to `store`, creating the root document on first use
    ///
    /// # Errors
    /// Storage errors while creating the root
    pub fn open(store: MemoryStore, ballots: B, config: DaoConfig) -> Result<Self, ProposalError> {
        let content = root_content(&config.root_name);
        let root = store.transaction(|tx| {
            let root = DocumentGraph::new(tx)
                .get_or_create_document(config.root_name.clone(), content)?;
            Ok::<_, GraphError>(*root.hash())
        })?;
        info!(root = %root.short(), name = %config.root_name, "dao opened");
        Ok(Self {
            store,
            ballots,
            config,
            registry: ProposalRegistry::with_defaults(),
            root,
        })
    }

    /// Add or replace a proposal variant
    pub fn register(&mut self, kind: Arc<dyn ProposalKind>) {
        info!(kind = %kind.proposal_type(), "proposal type registered");
        self.registry.register(kind);
    }

    /// Create a member document linked to the root
    ///
    /// # Errors
    /// `DocumentExists` if `member` is already enrolled
    pub fn enroll(&self, member: &Name) -> Result<ContentHash, ProposalError> {
        let root = self.root;
        let hash = self.store.transaction(|tx| {
            let mut graph = DocumentGraph::new(tx);
            let doc = graph.create_document(member.clone(), member_content(member))?;
            graph.write_edge(root, *doc.hash(), MEMBER)?;
            graph.write_edge(*doc.hash(), root, MEMBER_OF)?;
            Ok::<_, GraphError>(*doc.hash())
        })?;
        info!(member = %member, hash = %hash.short(), "member enrolled");
        Ok(hash)
    }

    /// Member document of `name`, if enrolled
    ///
    /// # Errors
    /// Only if the member content cannot be hashed
    pub fn member(&self, name: &Name) -> Result<Option<ContentHash>, ProposalError> {
        let hash = member_hash(name)?;
        Ok(self
            .store
            .read(|t| t.edge_exists(&self.root, &hash, &MEMBER))
            .then_some(hash))
    }

    /// Create a proposal and open its ballot
    ///
    /// The document, its root and ownership edges, whatever the variant
    /// writes in `post_propose_impl`, and the ballot all appear together or
    /// not at all.
    ///
    /// # Errors
    /// - `UnknownProposalType` for an unregistered type tag
    /// - `NotFound` if `proposer` is not enrolled
    /// - `Validation`/`MissingContent`/`TypeMismatch` for malformed content
    /// - any error from the variant hooks or the ballot collaborator
    pub fn propose(
        &self,
        proposer: &Name,
        proposal_type: &Name,
        mut content: ContentGroups,
    ) -> Result<ContentHash, ProposalError> {
        let kind = self.registry.get(proposal_type)?;
        let member = member_hash(proposer)?;
        let root = self.root;

        let hash = self.store.transaction(|tx| -> Result<ContentHash, ProposalError> {
            let mut state = ProposalState::Drafted;
            if !tx.edge_exists(&root, &member, &MEMBER) {
                return Err(GraphError::NotFound(member).into());
            }
            if content.group(DETAILS).is_none() {
                return Err(ProposalError::Validation(
                    "proposal has no details group".into(),
                ));
            }

            let mut ctx = ProposalContext::new(tx, &self.config, root);
            kind.propose_impl(&mut ctx, proposer, &mut content)?;
            let title = kind.ballot_content(&content)?;
            content.insert_or_replace(SYSTEM, ContentItem::new(TYPE, kind.proposal_type()));
            content.insert_or_replace(SYSTEM, ContentItem::new(NODE_LABEL, title.as_str()));

            let proposal = {
                let mut graph = ctx.graph();
                let proposal = graph.create_document(proposer.clone(), content)?;
                let hash = *proposal.hash();
                graph.write_edge(root, hash, PROPOSAL)?;
                graph.write_edge(member, hash, OWNS)?;
                graph.write_edge(hash, member, OWNED_BY)?;
                proposal
            };
            state = advance(state, ProposalState::Proposed)?;

            kind.post_propose_impl(&mut ctx, &proposal)?;
            state = advance(state, ProposalState::PostProposed)?;

            self.ballots.open(*proposal.hash(), &title)?;
            advance(state, ProposalState::Active)?;
            Ok(*proposal.hash())
        })?;
        info!(
            proposer = %proposer,
            kind = %proposal_type,
            proposal = %hash.short(),
            "proposal active"
        );
        Ok(hash)
    }

    /// Record a vote on an active proposal
    ///
    /// # Errors
    /// - `NotActive` once the proposal is closed
    /// - `NotFound` if the voter is not enrolled or the proposal is unknown
    pub fn vote(
        &self,
        voter: &Name,
        proposal: &ContentHash,
        vote: Vote,
        power: u64,
    ) -> Result<Tally, ProposalError> {
        let state = self.state(proposal)?;
        if state != ProposalState::Active {
            warn!(voter = %voter, proposal = %proposal.short(), %state, "vote refused");
            return Err(ProposalError::NotActive {
                proposal: *proposal,
                state,
            });
        }
        let member = member_hash(voter)?;
        if !self.store.read(|t| t.edge_exists(&self.root, &member, &MEMBER)) {
            return Err(GraphError::NotFound(member).into());
        }
        Ok(self.ballots.cast(proposal, voter, vote, power)?)
    }

    /// Close voting and apply the outcome
    ///
    /// On a pass the variant mutates the graph; if that fails the whole
    /// close is discarded and `StateInconsistency` is returned. The ballot is
    /// released once the new state is committed.
    ///
    /// # Errors
    /// - `NotActive` if already closed
    /// - `VotingOpen` before the voting period has elapsed
    /// - `StateInconsistency` if a passing proposal cannot be applied
    pub fn close(
        &self,
        closer: &Name,
        proposal: &ContentHash,
    ) -> Result<ProposalState, ProposalError> {
        let root = self.root;
        let state = self.store.transaction(|tx| -> Result<ProposalState, ProposalError> {
            let state = state_in(tx, &root, proposal)?;
            if state != ProposalState::Active {
                return Err(ProposalError::NotActive {
                    proposal: *proposal,
                    state,
                });
            }
            let document = Document::load(tx, proposal)?;
            let closes_at = document.created_date() + self.config.voting_period();
            if tx.now() < closes_at {
                return Err(ProposalError::VotingOpen {
                    proposal: *proposal,
                    closes_at,
                });
            }

            let kind = self.registry.get(&document.document_type()?)?;
            let outcome = self.ballots.outcome(proposal)?;
            let mut ctx = ProposalContext::new(tx, &self.config, root);
            let next = match outcome {
                Outcome::Pass => {
                    kind.pass_impl(&mut ctx, &document)
                        .map_err(|err| ProposalError::inconsistency(*proposal, err))?;
                    ProposalState::Passed
                }
                Outcome::Fail => {
                    kind.fail_impl(&mut ctx, &document)?;
                    ProposalState::Failed
                }
            };
            validate_transition(state, next)?;

            let label = next.root_label().ok_or(ProposalError::IllegalTransition {
                from: state,
                to: next,
            })?;
            let mut graph = ctx.graph();
            graph.remove_edge(root, *proposal, PROPOSAL)?;
            graph.write_edge(root, *proposal, label)?;
            Ok(next)
        })?;
        info!(closer = %closer, proposal = %proposal.short(), %state, "proposal closed");
        if let Err(err) = self.ballots.close(proposal) {
            warn!(proposal = %proposal.short(), error = %err, "ballot not released");
        }
        Ok(state)
    }

    /// Persisted lifecycle state of `proposal`
    ///
    /// # Errors
    /// `NotFound` if the document does not exist, `Validation` if it is not
    /// a proposal of this DAO
    pub fn state(&self, proposal: &ContentHash) -> Result<ProposalState, ProposalError> {
        self.store.read(|t| state_in(t, &self.root, proposal))
    }

    /// Every proposal with its state, in root edge order
    #[must_use]
    pub fn proposals(&self) -> Vec<(ContentHash, ProposalState)> {
        self.store.read(|t| {
            t.edges_from(&self.root)
                .into_iter()
                .filter_map(|edge| {
                    ProposalState::from_root_label(edge.label()).map(|s| (*edge.to_node(), s))
                })
                .collect()
        })
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &ContentHash {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn ballots(&self) -> &B {
        &self.ballots
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DaoConfig {
        &self.config
    }
}

impl<B: Ballot + std::fmt::Debug> std::fmt::Debug for Dao<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("ballots", &self.ballots)
            .finish_non_exhaustive()
    }
}

fn advance(from: ProposalState, to: ProposalState) -> Result<ProposalState, ProposalError> {
    validate_transition(from, to)?;
    Ok(to)
}

fn state_in(
    tables: &Tables,
    root: &ContentHash,
    proposal: &ContentHash,
) -> Result<ProposalState, ProposalError> {
    if !tables.contains_document(proposal) {
        return Err(GraphError::NotFound(*proposal).into());
    }
    tables
        .edges_to(proposal)
        .iter()
        .filter(|edge| edge.from_node() == root)
        .find_map(|edge| ProposalState::from_root_label(edge.label()))
        .ok_or_else(|| {
            ProposalError::Validation(format!("{} is not a proposal", proposal.short()))
        })
}

fn root_content(name: &Name) -> ContentGroups {
    ContentGroups::from(vec![
        ContentGroup::labeled(DETAILS).with(ROOT_NODE_KEY, name.clone()),
        ContentGroup::labeled(SYSTEM)
            .with(TYPE, DAO_TYPE)
            .with(NODE_LABEL, name.as_str()),
    ])
}

fn member_content(name: &Name) -> ContentGroups {
    ContentGroups::from(vec![
        ContentGroup::labeled(DETAILS).with(MEMBER_KEY, name.clone()),
        ContentGroup::labeled(SYSTEM)
            .with(TYPE, MEMBER_TYPE)
            .with(NODE_LABEL, name.as_str()),
    ])
}

fn member_hash(name: &Name) -> Result<ContentHash, GraphError> {
    Document::hash_of(&member_content(name))
}
