//! Directed, labeled relations between document identities

use crate::hash::ContentHash;
use crate::name::Name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary key of the edge table
///
/// Ordered by `from`, then `label`, then `to`, so every outgoing edge of a
/// node (and every outgoing edge with a given label) is one contiguous range.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub from: ContentHash,
    pub label: Name,
    pub to: ContentHash,
}

impl EdgeKey {
    #[must_use]
    pub fn new(from: ContentHash, to: ContentHash, label: Name) -> Self {
        Self { from, label, to }
    }

    /// Smallest key with this `from`
    pub(crate) fn lower_bound(from: ContentHash) -> Self {
        Self {
            from,
            label: Name::MIN,
            to: ContentHash::default(),
        }
    }

    /// Smallest key with this `from` and `label`
    pub(crate) fn lower_bound_labeled(from: ContentHash, label: Name) -> Self {
        Self {
            from,
            label,
            to: ContentHash::default(),
        }
    }
}

/// Directed edge
///
/// Stored independently of the documents it connects; endpoints are
/// identities, never pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    from: ContentHash,
    to: ContentHash,
    label: Name,
    created_date: DateTime<Utc>,
}

impl Edge {
    #[must_use]
    pub fn new(
        from: ContentHash,
        to: ContentHash,
        label: Name,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            label,
            created_date,
        }
    }

    #[inline]
    #[must_use]
    pub fn from_node(&self) -> &ContentHash {
        &self.from
    }

    #[inline]
    #[must_use]
    pub fn to_node(&self) -> &ContentHash {
        &self.to
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &Name {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from, self.to, self.label.clone())
    }

    /// Same edge with every occurrence of `old` replaced by `new`
    ///
    /// Keeps the original creation time.
    #[must_use]
    pub fn rewired(&self, old: &ContentHash, new: &ContentHash) -> Self {
        let swap = |h: &ContentHash| if h == old { *new } else { *h };
        Self {
            from: swap(&self.from),
            to: swap(&self.to),
            label: self.label.clone(),
            created_date: self.created_date,
        }
    }
}
