//! Typed, labeled document content
//!
//! A document's payload is an ordered list of [`ContentGroup`]s. Each group is
//! an ordered list of [`ContentItem`]s whose first item, by convention, is
//! `content_group_label` naming the group (`details`, `system`, ...).
//!
//! # Example
//!
//! ```rust,ignore
//! let content = ContentGroups::from(vec![
//!     ContentGroup::labeled(DETAILS).with(TITLE, "Treasurer").with("value", 10i64),
//!     ContentGroup::labeled(SYSTEM).with(TYPE, Name::from_static("role")),
//! ]);
//! let title: String = content.get_as(DETAILS, TITLE)?;
//! ```

use crate::asset::Asset;
use crate::error::GraphError;
use crate::hash::ContentHash;
use crate::name::Name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key of the first item in every group
pub const CONTENT_GROUP_LABEL: &str = "content_group_label";
/// Domain payload group
pub const DETAILS: &str = "details";
/// Bookkeeping group (type tag, display label)
pub const SYSTEM: &str = "system";
/// Document type tag, a [`Name`] in the system group
pub const TYPE: &str = "type";
/// Display label in the system group
pub const NODE_LABEL: &str = "node_label";
/// Human-readable title in the details group
pub const TITLE: &str = "title";

/// Typed content value with an explicit discriminant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentValue {
    String(String),
    Int64(i64),
    Asset(Asset),
    TimePoint(DateTime<Utc>),
    Checksum256(ContentHash),
    Name(Name),
}

impl ContentValue {
    /// Discriminant name, as used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => String::KIND,
            Self::Int64(_) => i64::KIND,
            Self::Asset(_) => Asset::KIND,
            Self::TimePoint(_) => <DateTime<Utc>>::KIND,
            Self::Checksum256(_) => ContentHash::KIND,
            Self::Name(_) => Name::KIND,
        }
    }
}

impl From<&str> for ContentValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ContentValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ContentValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<Asset> for ContentValue {
    fn from(value: Asset) -> Self {
        Self::Asset(value)
    }
}

impl From<DateTime<Utc>> for ContentValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::TimePoint(value)
    }
}

impl From<ContentHash> for ContentValue {
    fn from(value: ContentHash) -> Self {
        Self::Checksum256(value)
    }
}

impl From<Name> for ContentValue {
    fn from(value: Name) -> Self {
        Self::Name(value)
    }
}

/// Types a [`ContentValue`] can be read back as
pub trait FromContentValue: Sized {
    /// Discriminant this type corresponds to
    const KIND: &'static str;

    /// `None` if the discriminant differs
    fn from_content_value(value: &ContentValue) -> Option<Self>;
}

macro_rules! from_content_value {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl FromContentValue for $ty {
            const KIND: &'static str = $kind;

            fn from_content_value(value: &ContentValue) -> Option<Self> {
                match value {
                    ContentValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

from_content_value!(String, String, "string");
from_content_value!(i64, Int64, "int64");
from_content_value!(Asset, Asset, "asset");
from_content_value!(DateTime<Utc>, TimePoint, "time_point");
from_content_value!(ContentHash, Checksum256, "checksum256");
from_content_value!(Name, Name, "name");

/// One labeled value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub label: String,
    pub value: ContentValue,
}

impl ContentItem {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<ContentValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Read the value as `T`
    ///
    /// # Errors
    /// Returns `TypeMismatch` if the stored discriminant is not `T`'s
    pub fn get_as<T: FromContentValue>(&self) -> Result<T, GraphError> {
        T::from_content_value(&self.value).ok_or_else(|| GraphError::TypeMismatch {
            key: self.label.clone(),
            expected: T::KIND,
            actual: self.value.kind(),
        })
    }
}

/// Ordered items, first one naming the group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentGroup(Vec<ContentItem>);

impl ContentGroup {
    /// Start a group with its `content_group_label` item
    #[must_use]
    pub fn labeled(label: &str) -> Self {
        Self(vec![ContentItem::new(CONTENT_GROUP_LABEL, label)])
    }

    /// Builder: append or replace `key`
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<ContentValue>) -> Self {
        self.insert_or_replace(ContentItem::new(key, value));
        self
    }

    /// Group label, if the first item carries one
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self.0.first() {
            Some(ContentItem {
                label,
                value: ContentValue::String(name),
            }) if label == CONTENT_GROUP_LABEL => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContentItem> {
        self.0.iter().find(|item| item.label == key)
    }

    /// Replace the value of an existing key in place, append otherwise
    pub fn insert_or_replace(&mut self, item: ContentItem) {
        match self.0.iter_mut().find(|existing| existing.label == item.label) {
            Some(existing) => existing.value = item.value,
            None => self.0.push(item),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ContentItem> {
        let pos = self.0.iter().position(|item| item.label == key)?;
        Some(self.0.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ContentItem>> for ContentGroup {
    fn from(items: Vec<ContentItem>) -> Self {
        Self(items)
    }
}

/// A document's complete payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentGroups(Vec<ContentGroup>);

impl ContentGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: ContentGroup) {
        self.0.push(group);
    }

    #[must_use]
    pub fn group(&self, label: &str) -> Option<&ContentGroup> {
        self.0.iter().find(|g| g.label() == Some(label))
    }

    pub fn group_mut(&mut self, label: &str) -> Option<&mut ContentGroup> {
        self.0.iter_mut().find(|g| g.label() == Some(label))
    }

    /// # Errors
    /// Returns `MissingGroup` if no group carries `label`
    pub fn group_or_fail(&self, label: &str) -> Result<&ContentGroup, GraphError> {
        self.group(label).ok_or_else(|| GraphError::MissingGroup {
            group: label.to_string(),
        })
    }

    #[must_use]
    pub fn get(&self, group: &str, key: &str) -> Option<&ContentItem> {
        self.group(group)?.get(key)
    }

    /// # Errors
    /// Returns `MissingGroup`/`MissingContent` if the group or key is absent
    pub fn get_or_fail(&self, group: &str, key: &str) -> Result<&ContentItem, GraphError> {
        self.group_or_fail(group)?
            .get(key)
            .ok_or_else(|| GraphError::MissingContent {
                group: group.to_string(),
                key: key.to_string(),
            })
    }

    /// `get_or_fail` followed by `get_as`
    ///
    /// # Errors
    /// Missing content or type mismatch
    pub fn get_as<T: FromContentValue>(&self, group: &str, key: &str) -> Result<T, GraphError> {
        self.get_or_fail(group, key)?.get_as()
    }

    /// Set `key` in `group`, creating the group at the end if needed
    pub fn insert_or_replace(&mut self, group: &str, item: ContentItem) {
        match self.group_mut(group) {
            Some(g) => g.insert_or_replace(item),
            None => {
                let mut g = ContentGroup::labeled(group);
                g.insert_or_replace(item);
                self.0.push(g);
            }
        }
    }

    pub fn remove(&mut self, group: &str, key: &str) -> Option<ContentItem> {
        self.group_mut(group)?.remove(key)
    }

    pub fn remove_group(&mut self, label: &str) -> Option<ContentGroup> {
        let pos = self.0.iter().position(|g| g.label() == Some(label))?;
        Some(self.0.remove(pos))
    }

    /// Merge `edits` over `self`
    ///
    /// Groups are matched by label. Within a matched group, edited keys
    /// replace the original value in place and new keys are appended; keys
    /// the edit does not mention are kept. Groups only present in `edits`
    /// are appended in their order.
    #[must_use]
    pub fn overlay(&self, edits: &ContentGroups) -> ContentGroups {
        let mut merged = self.clone();
        for edit in &edits.0 {
            let Some(label) = edit.label() else { continue };
            match merged.group_mut(label) {
                Some(group) => {
                    for item in edit.iter() {
                        group.insert_or_replace(item.clone());
                    }
                }
                None => merged.0.push(edit.clone()),
            }
        }
        merged
    }

    /// Structural rules every stored document obeys
    ///
    /// # Errors
    /// Returns `Validation` if the content is empty, a group is unlabeled, or
    /// a group label or key repeats
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.0.is_empty() {
            return Err(GraphError::Validation("content has no groups".into()));
        }
        let mut labels = HashSet::new();
        for (idx, group) in self.0.iter().enumerate() {
            let label = group.label().ok_or_else(|| {
                GraphError::Validation(format!(
                    "group {idx} does not start with a string `{CONTENT_GROUP_LABEL}`"
                ))
            })?;
            if !labels.insert(label) {
                return Err(GraphError::Validation(format!(
                    "duplicate content group `{label}`"
                )));
            }
            let mut keys = HashSet::new();
            if let Some(dup) = group.iter().find(|item| !keys.insert(item.label.as_str())) {
                return Err(GraphError::Validation(format!(
                    "duplicate key `{}` in group `{label}`",
                    dup.label
                )));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentGroup> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ContentGroup>> for ContentGroups {
    fn from(groups: Vec<ContentGroup>) -> Self {
        Self(groups)
    }
}

impl<'a> IntoIterator for &'a ContentGroups {
    type Item = &'a ContentGroup;
    type IntoIter = std::slice::Iter<'a, ContentGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
