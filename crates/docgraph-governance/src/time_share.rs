//! Time-share schedules
//!
//! A schedule is a singly linked chain of time-share documents. Each one
//! holds an allocation (`time_share`) starting at `time_share_start_date`;
//! it lasts until the next link's start, and the last link is open ended.

use crate::labels::{NEXT_TIME_SHARE, TIMESHARE_TYPE, TIME_SHARE_KEY, TIME_SHARE_START_DATE_KEY};
use chrono::{DateTime, Utc};
use docgraph_core::{
    ContentGroup, ContentGroups, ContentHash, Document, DocumentGraph, Edge, GraphError, Name,
    Tables, DETAILS, NODE_LABEL, SYSTEM, TYPE,
};
use std::collections::HashSet;

/// One link of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeShare {
    document: Document,
    share: i64,
    start_date: DateTime<Utc>,
}

impl TimeShare {
    /// Content of a time share with this allocation and start
    #[must_use]
    pub fn content(share: i64, start_date: DateTime<Utc>) -> ContentGroups {
        ContentGroups::from(vec![
            ContentGroup::labeled(DETAILS)
                .with(TIME_SHARE_KEY, share)
                .with(TIME_SHARE_START_DATE_KEY, start_date),
            ContentGroup::labeled(SYSTEM)
                .with(TYPE, TIMESHARE_TYPE)
                .with(NODE_LABEL, TIMESHARE_TYPE.as_str()),
        ])
    }

    /// Persist a new, unlinked time share
    ///
    /// # Errors
    /// `DocumentExists` if an identical time share is already stored
    pub fn new(
        graph: &mut DocumentGraph<'_>,
        creator: Name,
        share: i64,
        start_date: DateTime<Utc>,
    ) -> Result<Self, GraphError> {
        let document = graph.create_document(creator, Self::content(share, start_date))?;
        Ok(Self {
            document,
            share,
            start_date,
        })
    }

    /// # Errors
    /// - `NotFound` if absent
    /// - `Validation` if the document is not a time share
    /// - `MissingContent`/`TypeMismatch` if its details are malformed
    pub fn load(tables: &Tables, hash: &ContentHash) -> Result<Self, GraphError> {
        let document = Document::load(tables, hash)?;
        let kind = document.document_type()?;
        if kind != TIMESHARE_TYPE {
            return Err(GraphError::Validation(format!(
                "{} is a `{kind}` document, not a time share",
                hash.short()
            )));
        }
        let share = document.content().get_as(DETAILS, TIME_SHARE_KEY)?;
        let start_date = document.content().get_as(DETAILS, TIME_SHARE_START_DATE_KEY)?;
        Ok(Self {
            document,
            share,
            start_date,
        })
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        self.document.hash()
    }

    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    #[must_use]
    pub fn share(&self) -> i64 {
        self.share
    }

    #[inline]
    #[must_use]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Successor in the chain, `None` at the end
    ///
    /// # Errors
    /// Propagates load errors for the successor
    pub fn next(&self, tables: &Tables) -> Result<Option<Self>, GraphError> {
        tables
            .edge_if_exists(self.hash(), &NEXT_TIME_SHARE)
            .map(|edge| Self::load(tables, edge.to_node()))
            .transpose()
    }

    /// Start of the successor; `None` while this is the last link
    ///
    /// # Errors
    /// Propagates load errors for the successor
    pub fn end_date(&self, tables: &Tables) -> Result<Option<DateTime<Utc>>, GraphError> {
        Ok(self.next(tables)?.map(|next| next.start_date))
    }

    /// Make `next` the successor of this link
    ///
    /// # Errors
    /// `Validation` if this link already has a successor
    pub fn link_next(
        &self,
        graph: &mut DocumentGraph<'_>,
        next: &Self,
    ) -> Result<Edge, GraphError> {
        if let Some(existing) = graph.get_edge_if_exists(self.hash(), &NEXT_TIME_SHARE) {
            return Err(GraphError::Validation(format!(
                "time share {} is already followed by {}",
                self.hash().short(),
                existing.to_node().short()
            )));
        }
        graph.write_edge(*self.hash(), *next.hash(), NEXT_TIME_SHARE)
    }

    /// This link and every successor, in order
    ///
    /// # Errors
    /// Load errors, or `Validation` if the chain loops back on itself
    pub fn chain(&self, tables: &Tables) -> Result<Vec<Self>, GraphError> {
        let mut seen = HashSet::from([*self.hash()]);
        let mut links = vec![self.clone()];
        let mut current = self.clone();
        while let Some(next) = current.next(tables)? {
            if !seen.insert(*next.hash()) {
                return Err(GraphError::Validation(format!(
                    "time-share chain revisits {}",
                    next.hash().short()
                )));
            }
            links.push(next.clone());
            current = next;
        }
        Ok(links)
    }

    /// Last link of the chain starting here
    ///
    /// # Errors
    /// See [`TimeShare::chain`]
    pub fn tail(&self, tables: &Tables) -> Result<Self, GraphError> {
        let mut links = self.chain(tables)?;
        Ok(links.pop().unwrap_or_else(|| self.clone()))
    }
}
